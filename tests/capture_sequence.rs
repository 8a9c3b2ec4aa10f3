use std::time::{Duration, Instant};

use xicapture::capture::{is_capture_file, run_timed_capture, CaptureOptions};
use xicapture::config::{configure_camera, CameraSettings};
use xicapture::display::NullView;
use xicapture::roi::Roi;
use xicapture::schedule::Clock;
use xicapture::sim::SimulatedSystem;
use xicapture::{open_device, Camera, Error};

struct StepClock {
    now: Instant,
    slept: Duration,
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
        self.now += duration;
    }
}

fn settings() -> CameraSettings {
    CameraSettings {
        roi: Roi { offset_x: 16, offset_y: 8, width: 48, height: 32 },
        ..CameraSettings::default()
    }
}

#[test]
fn configured_camera_saves_paced_pngs() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = open_device(&SimulatedSystem::default(), None).unwrap();
    let report = configure_camera(&mut camera, &settings());
    assert!(report.skipped.is_empty());

    let options = CaptureOptions {
        count: 3,
        period: Duration::from_millis(250),
        output_dir: dir.path().join("nested").join("captures"),
        ..CaptureOptions::default()
    };
    let mut clock = StepClock { now: Instant::now(), slept: Duration::ZERO };
    let mut acquisition = camera.start_acquisition().unwrap();
    let saved = run_timed_capture(&mut acquisition, &options, &mut clock, &mut NullView).unwrap();
    acquisition.stop_acquisition().unwrap();

    assert_eq!(clock.slept, Duration::from_millis(500));
    let mut on_disk: Vec<_> = std::fs::read_dir(&options.output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    on_disk.sort();
    assert_eq!(on_disk, saved);
    for path in &saved {
        assert!(is_capture_file(path));
        let image = image::open(path).unwrap();
        assert_eq!((image.width(), image.height()), (48, 32));
        assert_eq!(image.color(), image::ColorType::L8);
    }
}

#[test]
fn unusable_output_directory_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("captures");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let camera = open_device(&SimulatedSystem::default(), None).unwrap();
    let mut acquisition = camera.start_acquisition().unwrap();
    let options = CaptureOptions { count: 1, output_dir: blocker.clone(), ..CaptureOptions::default() };
    let mut clock = StepClock { now: Instant::now(), slept: Duration::ZERO };
    match run_timed_capture(&mut acquisition, &options, &mut clock, &mut NullView) {
        Err(Error::FileWrite { path, .. }) => assert_eq!(path, blocker),
        Err(err) => panic!("unexpected error {}", err),
        Ok(saved) => panic!("saved {:?} into a file", saved),
    }
}

#[test]
fn missing_camera_is_reported() {
    let system = SimulatedSystem::with_cameras(&["SIM-0"]);
    let err = open_device(&system, Some("DEV_1AB22C00041D")).err().unwrap();
    assert_eq!(err.to_string(), "Failed to access Camera 'DEV_1AB22C00041D'.");
    let err = open_device(&SimulatedSystem::with_cameras(&[]), None).err().unwrap();
    assert_eq!(err.to_string(), "No Cameras accessible.");
}
