//! Fixed count, fixed rate capture to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use log::info;

use crate::camera::{AcquisitionBuffer, DEFAULT_FRAME_TIMEOUT};
use crate::display::{to_rgb, FrameView};
use crate::schedule::{Clock, Pacer};
use crate::{Camera, Error, Result};

/// Refresh given to the view after each capture.
const VIEW_REFRESH: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Number of frames to save.
    pub count: u32,
    /// Time between the starts of two captures.
    pub period: Duration,
    /// Created on demand.
    pub output_dir: PathBuf,
    pub timeout: Duration,
    /// Also write every frame as CSV next to the PNG.
    pub csv: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            count: 10,
            period: Duration::from_secs(1),
            output_dir: PathBuf::from("captures"),
            timeout: DEFAULT_FRAME_TIMEOUT,
            csv: false,
        }
    }
}

/// Second resolution local time stamp used in file names.
pub fn timestamp(time: &DateTime<Local>) -> String {
    time.format("%Y%m%d_%H%M%S").to_string()
}

/// `img_<timestamp>_<index>.<extension>`, index zero padded to three digits.
pub fn frame_file_name(timestamp: &str, index: u32, extension: &str) -> String {
    format!("img_{}_{:03}.{}", timestamp, index, extension)
}

/// Capture `options.count` frames paced at `options.period`, saving each as
/// PNG and showing it in `view`.
///
/// The first frame is taken immediately. A failed write ends the run.
///
/// returns: the paths of the saved PNG files
pub fn run_timed_capture<C, K, V>(
    acquisition: &mut AcquisitionBuffer<C>,
    options: &CaptureOptions,
    clock: &mut K,
    view: &mut V,
) -> Result<Vec<PathBuf>>
where
    C: Camera,
    K: Clock + ?Sized,
    V: FrameView + ?Sized,
{
    std::fs::create_dir_all(&options.output_dir)
        .map_err(|source| Error::FileWrite { path: options.output_dir.clone(), source })?;
    let mut saved = Vec::with_capacity(options.count as usize);
    let mut pacer = Pacer::new(options.period, clock.now());

    for index in 0..options.count {
        pacer.wait(clock);

        let frame = acquisition.next_image(Some(options.timeout))?;
        let stamp = timestamp(&Local::now());
        let path = options.output_dir.join(frame_file_name(&stamp, index, "png"));
        frame.save_png(&path)?;
        if options.csv {
            frame.save_csv(&path.with_extension("csv"))?;
        }

        view.show(&format!("Captured {}", path.display()), &to_rgb(frame.image()))?;
        view.pause(VIEW_REFRESH)?;
        info!("Captured & saved: {}", path.display());
        saved.push(path);

        pacer.advance();
    }
    Ok(saved)
}

/// True if `path` looks like a file written by [run_timed_capture].
pub fn is_capture_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(stem) = name.strip_prefix("img_").and_then(|s| s.strip_suffix(".png")) else {
        return false;
    };
    let parts: Vec<&str> = stem.split('_').collect();
    matches!(parts.as_slice(), [date, time, index]
        if date.len() == 8 && time.len() == 6 && index.len() >= 3
            && [date, time, index].iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::{configure_camera, CameraSettings};
    use crate::display::NullView;
    use crate::feature::FeatureExt;
    use crate::roi::Roi;
    use crate::schedule::tests::FakeClock;
    use crate::sim::SimulatedCamera;

    fn small_camera() -> AcquisitionBuffer<SimulatedCamera> {
        let mut cam = SimulatedCamera::new("SIM-0");
        cam.set_width(32).unwrap();
        cam.set_height(24).unwrap();
        cam.start_acquisition().unwrap()
    }

    #[test]
    fn file_names_carry_timestamp_and_index() {
        let time = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        let stamp = timestamp(&time);
        assert_eq!(stamp, "20260307_090501");
        assert_eq!(frame_file_name(&stamp, 7, "png"), "img_20260307_090501_007.png");
        assert_eq!(frame_file_name(&stamp, 1234, "csv"), "img_20260307_090501_1234.csv");
        assert!(is_capture_file(Path::new("captures/img_20260307_090501_007.png")));
        assert!(!is_capture_file(Path::new("captures/img_2026_007.png")));
    }

    #[test]
    fn captures_count_frames_one_period_apart() {
        let dir = tempfile::tempdir().unwrap();
        let options = CaptureOptions {
            count: 4,
            output_dir: dir.path().join("captures"),
            ..CaptureOptions::default()
        };
        let mut clock = FakeClock::new();
        let start = clock.now;
        let mut acq = small_camera();

        let saved = run_timed_capture(&mut acq, &options, &mut clock, &mut NullView).unwrap();

        assert_eq!(saved.len(), 4);
        for (i, path) in saved.iter().enumerate() {
            assert!(path.exists());
            assert!(is_capture_file(path));
            assert!(path.to_string_lossy().ends_with(&format!("_{:03}.png", i)));
        }
        // first frame immediately, then one sleep per period
        assert_eq!(clock.sleeps, vec![Duration::from_secs(1); 3]);
        assert_eq!(clock.now - start, Duration::from_secs(3));
    }

    #[test]
    fn single_frame_camera_captures_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut cam = SimulatedCamera::new("SIM-0");
        let settings = CameraSettings {
            roi: Roi { offset_x: 0, offset_y: 0, width: 32, height: 24 },
            ..CameraSettings::default()
        };
        configure_camera(&mut cam, &settings);
        assert_eq!(cam.acquisition_mode().unwrap(), "SingleFrame");
        let options = CaptureOptions { output_dir: dir.path().to_path_buf(), ..CaptureOptions::default() };
        let mut acq = cam.start_acquisition().unwrap();
        let saved = run_timed_capture(&mut acq, &options, &mut FakeClock::new(), &mut NullView).unwrap();
        assert_eq!(saved.len(), 10);
    }

    #[test]
    fn writes_csv_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let options = CaptureOptions {
            count: 1,
            output_dir: dir.path().to_path_buf(),
            csv: true,
            ..CaptureOptions::default()
        };
        let saved = run_timed_capture(&mut small_camera(), &options, &mut FakeClock::new(), &mut NullView)
            .unwrap();
        let csv = std::fs::read_to_string(saved[0].with_extension("csv")).unwrap();
        assert_eq!(csv.lines().count(), 24);
        assert_eq!(csv.lines().next().unwrap().split(',').count(), 32);
    }

    #[test]
    fn acquisition_error_ends_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let options = CaptureOptions { output_dir: dir.path().to_path_buf(), ..CaptureOptions::default() };
        let mut cam = SimulatedCamera::new("SIM-0");
        cam.set_trigger_mode("On".to_string()).unwrap();
        cam.set_trigger_source("Line1".to_string()).unwrap();
        let mut acq = cam.start_acquisition().unwrap();
        let result = run_timed_capture(&mut acq, &options, &mut FakeClock::new(), &mut NullView);
        assert!(matches!(result, Err(crate::Error::Timeout(3000))));
    }
}
