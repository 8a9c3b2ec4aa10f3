use std::process::ExitCode;

use log::{error, info};
use xicapture::capture::run_timed_capture;
use xicapture::cli::{parse_args, CaptureCli};
use xicapture::config::configure_camera;
use xicapture::display::{FrameView, NullView};
use xicapture::schedule::MonotonicClock;
use xicapture::{open_device, Camera, DefaultProvider};

fn main() -> ExitCode {
    xicapture::init_logging();
    let cli: CaptureCli = parse_args(std::env::args_os()).unwrap_or_else(|err| err.exit());
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{} Abort.", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &CaptureCli) -> xicapture::Result<()> {
    let provider = DefaultProvider::default();
    let mut camera = open_device(&provider, cli.camera.camera_id.as_deref())?;
    configure_camera(&mut camera, &cli.settings());

    let mut view: Box<dyn FrameView> = if cli.no_display { Box::new(NullView) } else { window()? };
    let options = cli.options();
    let mut acquisition = camera.start_acquisition()?;
    let saved = run_timed_capture(&mut acquisition, &options, &mut MonotonicClock, view.as_mut());
    let saved = acquisition.finish(saved)?;
    info!("Saved {} images to {}", saved.len(), options.output_dir.display());
    Ok(())
}

#[cfg(feature = "highgui")]
fn window() -> xicapture::Result<Box<dyn FrameView>> {
    Ok(Box::new(xicapture::display::HighGuiWindow::new("Capture")?))
}

// captures are on disk already, nothing else to show them in
#[cfg(not(feature = "highgui"))]
fn window() -> xicapture::Result<Box<dyn FrameView>> {
    Ok(Box::new(NullView))
}
