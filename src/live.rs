//! Continuous acquisition with a live profile view.

use std::time::Duration;

use log::debug;

use crate::camera::{AcquisitionBuffer, DEFAULT_FRAME_TIMEOUT};
use crate::display::{render_panel, FrameView};
use crate::profile::Profile;
use crate::{Camera, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LiveOptions {
    /// Stop after this many frames, run until the view closes otherwise.
    pub frames: Option<u64>,
    /// Fixed upper limit of the profile plots.
    pub y_max: Option<u8>,
    /// Pause between two refreshes of the view.
    pub refresh: Duration,
    pub timeout: Duration,
}

impl Default for LiveOptions {
    fn default() -> Self {
        LiveOptions {
            frames: None,
            y_max: None,
            refresh: Duration::from_millis(10),
            timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }
}

/// Grab, profile and show frames until the view is closed or the frame limit
/// is reached.
///
/// returns: the number of frames shown
pub fn run_live<C, V>(acquisition: &mut AcquisitionBuffer<C>, options: &LiveOptions, view: &mut V) -> Result<u64>
where
    C: Camera,
    V: FrameView + ?Sized,
{
    let mut shown = 0;
    while options.frames.map_or(true, |limit| shown < limit) {
        let frame = acquisition.next_image(Some(options.timeout))?;
        let profile = Profile::center(&frame)?;
        debug!(
            "frame {}: row {} peak {}, column {} peak {}",
            frame.nframe(),
            profile.row_index,
            profile.row.iter().max().copied().unwrap_or(0),
            profile.column_index,
            profile.column.iter().max().copied().unwrap_or(0),
        );
        let title = format!("Live profile, frame {}", frame.nframe());
        view.show(&title, &render_panel(frame.image(), &profile, options.y_max))?;
        shown += 1;
        if !view.pause(options.refresh)? {
            debug!("view closed after {} frames", shown);
            break;
        }
    }
    Ok(shown)
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;
    use crate::display::{NullView, TILE_HEIGHT, TILE_WIDTH};
    use crate::feature::FeatureExt;
    use crate::sim::SimulatedCamera;

    /// Records titles and panel sizes, closes itself after `open_for` refreshes.
    struct RecordingView {
        titles: Vec<String>,
        sizes: Vec<(u32, u32)>,
        open_for: usize,
    }

    impl FrameView for RecordingView {
        fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
            self.titles.push(title.to_string());
            self.sizes.push(image.dimensions());
            Ok(())
        }

        fn pause(&mut self, _duration: Duration) -> Result<bool> {
            Ok(self.sizes.len() < self.open_for)
        }
    }

    fn acquisition() -> AcquisitionBuffer<SimulatedCamera> {
        let mut cam = SimulatedCamera::new("SIM-0");
        cam.set_width(40).unwrap();
        cam.set_height(30).unwrap();
        cam.start_acquisition().unwrap()
    }

    #[test]
    fn stops_at_frame_limit() {
        let options = LiveOptions { frames: Some(5), ..LiveOptions::default() };
        assert_eq!(run_live(&mut acquisition(), &options, &mut NullView).unwrap(), 5);
    }

    #[test]
    fn stops_when_view_closes() {
        let mut view = RecordingView { titles: Vec::new(), sizes: Vec::new(), open_for: 3 };
        let shown = run_live(&mut acquisition(), &LiveOptions::default(), &mut view).unwrap();
        assert_eq!(shown, 3);
        assert!(view.sizes.iter().all(|s| *s == (3 * TILE_WIDTH, TILE_HEIGHT)));
        assert_eq!(view.titles, ["Live profile, frame 0", "Live profile, frame 1", "Live profile, frame 2"]);
    }
}
