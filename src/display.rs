//! Diagnostic panels and the windows they are shown in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{imageops, DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use log::debug;

use crate::profile::Profile;
use crate::Result;

/// Size of one tile of the diagnostic panel.
pub const TILE_WIDTH: u32 = 400;
pub const TILE_HEIGHT: u32 = 300;
const MARGIN: u32 = 20;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXES: Rgb<u8> = Rgb([40, 40, 40]);
const CENTRE: Rgb<u8> = Rgb([220, 40, 40]);
const ROW_TRACE: Rgb<u8> = Rgb([31, 119, 180]);
const COLUMN_TRACE: Rgb<u8> = Rgb([255, 127, 14]);

/// Somewhere frames can be shown.
pub trait FrameView {
    /// Show `image` under `title`.
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()>;

    /// Give the view `duration` to refresh and handle input.
    ///
    /// returns: bool `false` once the user closed the view
    fn pause(&mut self, duration: Duration) -> Result<bool>;
}

/// Discards everything. Used with `--no-display`.
#[derive(Debug, Default)]
pub struct NullView;

impl FrameView for NullView {
    fn show(&mut self, _title: &str, _image: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self, _duration: Duration) -> Result<bool> {
        Ok(true)
    }
}

/// Overwrites one PNG with the latest image; any image viewer that reloads
/// on change turns it into a live view.
#[derive(Debug)]
pub struct PreviewFile {
    path: PathBuf,
}

impl PreviewFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PreviewFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameView for PreviewFile {
    /// The file name stays fixed, the title only goes to the log.
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        debug!("{} -> {}", title, self.path.display());
        image
            .save_with_format(&self.path, image::ImageFormat::Png)
            .map_err(|source| crate::Error::ImageWrite { path: self.path.clone(), source })
    }

    fn pause(&mut self, duration: Duration) -> Result<bool> {
        std::thread::sleep(duration);
        Ok(true)
    }
}

#[cfg(feature = "highgui")]
pub use highgui::HighGuiWindow;

#[cfg(feature = "highgui")]
mod highgui {
    use std::time::Duration;

    use image::RgbImage;
    use opencv::core::{Mat, Scalar, CV_8UC3};
    use opencv::prelude::*;
    use opencv::{highgui, imgproc};

    use super::FrameView;
    use crate::{Error, Result};

    fn display_error(err: opencv::Error) -> Error {
        Error::Display(err.to_string())
    }

    /// An OpenCV HighGUI window, renamed to the title of whatever it shows.
    /// `q` or Esc closes it.
    pub struct HighGuiWindow {
        name: String,
    }

    impl HighGuiWindow {
        pub fn new(title: &str) -> Result<Self> {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE).map_err(display_error)?;
            Ok(HighGuiWindow { name: title.to_string() })
        }
    }

    impl FrameView for HighGuiWindow {
        fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
            highgui::set_window_title(&self.name, title).map_err(display_error)?;
            let mut rgb = Mat::new_rows_cols_with_default(
                image.height() as i32,
                image.width() as i32,
                CV_8UC3,
                Scalar::all(0.0),
            )
            .map_err(display_error)?;
            rgb.data_bytes_mut().map_err(display_error)?.copy_from_slice(image.as_raw());
            let mut bgr = Mat::default();
            imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0).map_err(display_error)?;
            highgui::imshow(&self.name, &bgr).map_err(display_error)
        }

        fn pause(&mut self, duration: Duration) -> Result<bool> {
            let key = highgui::wait_key(duration.as_millis().max(1) as i32).map_err(display_error)?;
            if key == 'q' as i32 || key == 27 {
                return Ok(false);
            }
            let visible = highgui::get_window_property(&self.name, highgui::WND_PROP_VISIBLE)
                .map_err(display_error)?;
            Ok(visible >= 1.0)
        }
    }

    impl Drop for HighGuiWindow {
        fn drop(&mut self) {
            let _ = highgui::destroy_window(&self.name);
        }
    }
}

/// Grey frame as an RGB image, for views that show raw captures.
pub fn to_rgb(image: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(image.clone()).to_rgb8()
}

/// Compose the live diagnostic panel: image | centre row | centre column.
///
/// The image tile marks the sampled lines. The plots share the intensity
/// axis `0..=y_max`; `None` scales it to the profile peak.
pub fn render_panel(image: &GrayImage, profile: &Profile, y_max: Option<u8>) -> RgbImage {
    let mut panel = RgbImage::from_pixel(TILE_WIDTH * 3, TILE_HEIGHT, BACKGROUND);
    let y_max = y_max.unwrap_or_else(|| profile.peak()).max(1);

    let tile = image_tile(image, profile);
    imageops::overlay(&mut panel, &tile, 0, 0);
    let row = plot_tile(&profile.row, y_max, ROW_TRACE);
    imageops::overlay(&mut panel, &row, TILE_WIDTH as i64, 0);
    let column = plot_tile(&profile.column, y_max, COLUMN_TRACE);
    imageops::overlay(&mut panel, &column, 2 * TILE_WIDTH as i64, 0);
    panel
}

fn image_tile(image: &GrayImage, profile: &Profile) -> RgbImage {
    let mut tile = RgbImage::from_pixel(TILE_WIDTH, TILE_HEIGHT, BACKGROUND);
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return tile;
    }
    let scale = f64::min(TILE_WIDTH as f64 / width as f64, TILE_HEIGHT as f64 / height as f64);
    let w = ((width as f64 * scale) as u32).max(1);
    let h = ((height as f64 * scale) as u32).max(1);
    let scaled = imageops::resize(&to_rgb(image), w, h, imageops::FilterType::Nearest);
    let x0 = (TILE_WIDTH - w) / 2;
    let y0 = (TILE_HEIGHT - h) / 2;
    imageops::overlay(&mut tile, &scaled, x0 as i64, y0 as i64);

    // sampled lines
    let row_y = y0 as f32 + (profile.row_index as f64 * scale) as f32;
    let col_x = x0 as f32 + (profile.column_index as f64 * scale) as f32;
    draw_line_segment_mut(&mut tile, (x0 as f32, row_y), ((x0 + w - 1) as f32, row_y), CENTRE);
    draw_line_segment_mut(&mut tile, (col_x, y0 as f32), (col_x, (y0 + h - 1) as f32), CENTRE);
    tile
}

fn plot_tile(samples: &[u8], y_max: u8, colour: Rgb<u8>) -> RgbImage {
    let mut tile = RgbImage::from_pixel(TILE_WIDTH, TILE_HEIGHT, BACKGROUND);
    let plot_w = TILE_WIDTH - 2 * MARGIN;
    let plot_h = TILE_HEIGHT - 2 * MARGIN;
    draw_hollow_rect_mut(&mut tile, Rect::at(MARGIN as i32, MARGIN as i32).of_size(plot_w, plot_h), AXES);

    let points = trace(samples, y_max, plot_w, plot_h);
    match points.as_slice() {
        [] => {}
        [single] => {
            draw_filled_rect_mut(&mut tile, Rect::at(single.0 as i32 - 1, single.1 as i32 - 1).of_size(3, 3), colour)
        }
        _ => {
            for pair in points.windows(2) {
                draw_line_segment_mut(&mut tile, pair[0], pair[1], colour);
            }
        }
    }
    tile
}

/// Tile coordinates of a profile. Samples above `y_max` are clipped to the
/// top of the plot, like a fixed y-limit would.
pub(crate) fn trace(samples: &[u8], y_max: u8, plot_w: u32, plot_h: u32) -> Vec<(f32, f32)> {
    let last = samples.len().saturating_sub(1).max(1) as f32;
    let bottom = (MARGIN + plot_h - 1) as f32;
    let span = (plot_h - 1) as f32;
    samples
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = MARGIN as f32 + i as f32 / last * (plot_w - 1) as f32;
            let level = v.min(y_max) as f32 / y_max as f32;
            (x, bottom - level * span)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use image::Luma;

    use super::*;
    use crate::image::Frame;

    fn profile_of(width: u32, height: u32) -> (GrayImage, Profile) {
        let image = GrayImage::from_fn(width, height, |x, _| Luma([(x * 10) as u8]));
        let profile = Profile::center(&Frame::new(image.clone())).unwrap();
        (image, profile)
    }

    #[test]
    fn panel_has_three_tiles() {
        let (image, profile) = profile_of(64, 48);
        let panel = render_panel(&image, &profile, Some(12));
        assert_eq!(panel.dimensions(), (3 * TILE_WIDTH, TILE_HEIGHT));
    }

    #[test]
    fn trace_spans_plot_and_clips() {
        let points = trace(&[0, 6, 12, 200], 12, 101, 51);
        assert_eq!(points.len(), 4);
        let bottom = (MARGIN + 50) as f32;
        let top = MARGIN as f32;
        assert_relative_eq!(points[0].0, MARGIN as f32);
        assert_relative_eq!(points[3].0, (MARGIN + 100) as f32);
        assert_relative_eq!(points[0].1, bottom);
        assert_relative_eq!(points[1].1, (bottom + top) / 2.0);
        assert_relative_eq!(points[2].1, top);
        // clipped like a fixed y-limit
        assert_relative_eq!(points[3].1, top);
    }

    #[test]
    fn single_pixel_frame_renders() {
        let (image, profile) = profile_of(1, 1);
        let panel = render_panel(&image, &profile, None);
        assert_eq!(panel.width(), 3 * TILE_WIDTH);
    }

    #[test]
    fn preview_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut view = PreviewFile::new(dir.path().join("preview.png"));
        let (image, _) = profile_of(8, 8);
        view.show("first", &to_rgb(&image)).unwrap();
        view.show("second", &RgbImage::new(4, 2)).unwrap();
        let loaded = image::open(view.path()).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (4, 2));
        assert!(view.pause(Duration::ZERO).unwrap());
    }
}
