//! Command line handling shared by the tools.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};

use crate::capture::CaptureOptions;
use crate::config::{CameraSettings, TransportConfig, TriggerConfig};
use crate::live::LiveOptions;
use crate::roi::Roi;

/// Parse command line arguments, accepting the DOS style `/h` for help.
///
/// Help yields an error whose exit code is 0, a usage error one whose exit
/// code is 2; `clap::Error::exit` prints and exits accordingly.
pub fn parse_args<P, I, T>(args: I) -> Result<P, clap::Error>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let program = args.next();
    let rest: Vec<OsString> = args.collect();
    // help is honoured before the argument count is checked
    if rest.iter().any(|arg| arg == "-h" || arg == "/h") {
        return P::try_parse_from(program.into_iter().chain([OsString::from("--help")]));
    }
    P::try_parse_from(program.into_iter().chain(rest))
}

/// Non-negative, finite number of seconds.
fn parse_period(arg: &str) -> Result<Duration, String> {
    let seconds: f64 = arg.parse().map_err(|_| format!("`{}` is not a number of seconds", arg))?;
    Duration::try_from_secs_f64(seconds).map_err(|_| format!("`{}` is not a usable period", arg))
}

/// Camera selection common to both tools.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct CameraArg {
    /// ID of the camera to use (using first camera if not specified)
    pub camera_id: Option<String>,
}

/// Show the centre row and column intensity profiles of a live camera.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct LiveCli {
    #[command(flatten)]
    pub camera: CameraArg,

    /// Stop after this many frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// Fixed upper limit of the profile plots (auto scaled if not given)
    #[arg(long)]
    pub y_max: Option<u8>,

    /// File that receives the latest panel when no window is available
    #[arg(long, default_value = "live_profile.png")]
    pub preview: PathBuf,

    /// Do not show or write panels
    #[arg(long)]
    pub no_display: bool,
}

impl LiveCli {
    pub fn options(&self) -> LiveOptions {
        LiveOptions { frames: self.frames, y_max: self.y_max, ..LiveOptions::default() }
    }
}

/// Capture a fixed number of frames at a fixed rate and save them as PNG.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CaptureCli {
    #[command(flatten)]
    pub camera: CameraArg,

    /// Number of frames to capture
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: u32,

    /// Seconds between two captures
    #[arg(short, long, default_value = "1", value_parser = parse_period)]
    pub period: Duration,

    /// Directory the images are written to
    #[arg(short, long, default_value = "captures")]
    pub output: PathBuf,

    /// Frame timeout in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,

    /// Also save every frame as CSV
    #[arg(long)]
    pub csv: bool,

    /// Do not show captured frames
    #[arg(long)]
    pub no_display: bool,

    #[arg(long, default_value = "Mono8")]
    pub pixel_format: String,

    /// Acquisition mode, `keep` leaves the camera's setting
    #[arg(long, default_value = "SingleFrame")]
    pub acquisition_mode: String,

    /// Exposure time in microseconds
    #[arg(short, long, default_value_t = 5000.0)]
    pub exposure: f64,

    /// Gain in dB
    #[arg(short, long, default_value_t = 0.0)]
    pub gain: f64,

    #[arg(long, default_value_t = 640)]
    pub width: u32,

    #[arg(long, default_value_t = 480)]
    pub height: u32,

    #[arg(long, default_value_t = 0)]
    pub offset_x: u32,

    #[arg(long, default_value_t = 0)]
    pub offset_y: u32,

    /// Wait for a hardware trigger instead of free running
    #[arg(long)]
    pub external_trigger: bool,

    #[arg(long, default_value = "Line1")]
    pub trigger_source: String,

    #[arg(long, default_value = "RisingEdge")]
    pub trigger_activation: String,

    /// GigE packet size in bytes (needs jumbo frames above 1500)
    #[arg(long, default_value_t = 9000)]
    pub packet_size: i64,

    /// GigE inter-packet delay; raise it if frames are dropped
    #[arg(long, default_value_t = 0)]
    pub packet_delay: i64,

    /// Leave GigE transport settings alone
    #[arg(long)]
    pub no_transport_tuning: bool,
}

impl CaptureCli {
    pub fn settings(&self) -> CameraSettings {
        CameraSettings {
            pixel_format: self.pixel_format.clone(),
            acquisition_mode: match self.acquisition_mode.as_str() {
                "keep" => None,
                mode => Some(mode.to_string()),
            },
            exposure_us: self.exposure,
            gain_db: self.gain,
            roi: Roi {
                offset_x: self.offset_x,
                offset_y: self.offset_y,
                width: self.width,
                height: self.height,
            },
            trigger: if self.external_trigger {
                TriggerConfig::External {
                    source: self.trigger_source.clone(),
                    activation: self.trigger_activation.clone(),
                }
            } else {
                TriggerConfig::Off
            },
            transport: if self.no_transport_tuning {
                None
            } else {
                Some(TransportConfig { packet_size: self.packet_size, packet_delay: self.packet_delay })
            },
        }
    }

    pub fn options(&self) -> CaptureOptions {
        CaptureOptions {
            count: self.count,
            period: self.period,
            output_dir: self.output.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            csv: self.csv,
        }
    }
}
