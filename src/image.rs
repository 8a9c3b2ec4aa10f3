/*
 * Copyright (c) 2026. XIMEA GmbH - All Rights Reserved
 */

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb};

use crate::{Error, Result};

/// Pixel formats a backend may deliver. Frames are always stored as Mono8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Mono8,
    Mono16,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Mono16 => 2,
            PixelFormat::Rgb8 => 3,
        }
    }

    /// GenICam name of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Mono8 => "Mono8",
            PixelFormat::Mono16 => "Mono16",
            PixelFormat::Rgb8 => "RGB8",
        }
    }
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Mono8" => Ok(PixelFormat::Mono8),
            "Mono16" => Ok(PixelFormat::Mono16),
            "RGB8" | "RGB8Packed" => Ok(PixelFormat::Rgb8),
            other => Err(Error::PixelFormat(other.to_string())),
        }
    }
}

/// One frame as it is captured by the camera, converted to 8-bit intensities.
#[derive(Debug, Clone)]
pub struct Frame {
    image: GrayImage,
    source_format: PixelFormat,
    nframe: u32,
    timestamp_raw: u64,
    exposure_time_us: u32,
}

impl Frame {
    pub fn new(image: GrayImage) -> Self {
        Frame {
            image,
            source_format: PixelFormat::Mono8,
            nframe: 0,
            timestamp_raw: 0,
            exposure_time_us: 0,
        }
    }

    /// Build a frame from an SDK buffer.
    ///
    /// # Arguments
    ///
    /// * `width`, `height`: Image size in pixels.
    /// * `format`: Layout of `data`. Mono16 is little endian.
    /// * `padding_x`: Extra bytes at the end of each line.
    /// * `data`: The raw buffer, at least `height` lines long.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        padding_x: u32,
        data: &[u8],
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyFrame { width, height });
        }
        let line = width as usize * format.bytes_per_pixel();
        // stride is the total length of a row in bytes
        let stride = line + padding_x as usize;
        let needed = stride * (height as usize - 1) + line;
        if data.len() < needed {
            return Err(Error::FrameSize { width, height, len: data.len() });
        }
        let mut packed = Vec::with_capacity(line * height as usize);
        for y in 0..height as usize {
            packed.extend_from_slice(&data[y * stride..y * stride + line]);
        }
        let size_error = || Error::FrameSize { width, height, len: data.len() };
        let image = match format {
            PixelFormat::Mono8 => GrayImage::from_raw(width, height, packed).ok_or_else(size_error)?,
            PixelFormat::Mono16 => {
                let samples = packed
                    .chunks_exact(2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                    .collect();
                let wide = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, samples)
                    .ok_or_else(size_error)?;
                DynamicImage::ImageLuma16(wide).to_luma8()
            }
            PixelFormat::Rgb8 => {
                let rgb = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, packed)
                    .ok_or_else(size_error)?;
                DynamicImage::ImageRgb8(rgb).to_luma8()
            }
        };
        Ok(Frame { source_format: format, ..Frame::new(image) })
    }

    /// Attach the SDK metadata delivered with the buffer.
    pub fn with_metadata(mut self, nframe: u32, timestamp_raw: u64, exposure_time_us: u32) -> Self {
        self.nframe = nframe;
        self.timestamp_raw = timestamp_raw;
        self.exposure_time_us = exposure_time_us;
        self
    }

    /// Get a Pixel from the image, `None` outside of it.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        self.image.get_pixel_checked(x, y).map(|p| p.0[0])
    }

    /// Get the width of this image in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Get the height of this image
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Line `y` of the image.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height() {
            return None;
        }
        let width = self.width() as usize;
        let start = y as usize * width;
        Some(&self.image.as_raw()[start..start + width])
    }

    /// Column `x` of the image, top to bottom.
    pub fn column(&self, x: u32) -> Option<Vec<u8>> {
        if x >= self.width() {
            return None;
        }
        Some((0..self.height()).map(|y| self.image.get_pixel(x, y).0[0]).collect())
    }

    /// Format the SDK delivered before conversion to Mono8.
    pub fn source_format(&self) -> PixelFormat {
        self.source_format
    }

    /// Frame number
    pub fn nframe(&self) -> u32 {
        self.nframe
    }

    /// Raw 64-bit timestamp from the camera. Units depend on the backend.
    pub fn timestamp_raw(&self) -> u64 {
        self.timestamp_raw
    }

    /// Exposure time for this image in us
    pub fn exposure_time_us(&self) -> u32 {
        self.exposure_time_us
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// Write the frame as a single channel PNG.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| Error::ImageWrite { path: path.to_path_buf(), source })
    }

    /// Write the frame as integers, comma delimited, one image line per record.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyFrame { width, height });
        }
        let file_error = |source| Error::FileWrite { path: path.to_path_buf(), source };
        let csv_error = |source| Error::CsvWrite { path: path.to_path_buf(), source };
        let file = File::create(path).map_err(file_error)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        for line in self.image.as_raw().chunks(width as usize) {
            writer
                .write_record(line.iter().map(|v| v.to_string()))
                .map_err(csv_error)?;
        }
        writer.flush().map_err(file_error)?;
        Ok(())
    }
}

impl From<Frame> for GrayImage {
    fn from(frame: Frame) -> Self {
        frame.into_image()
    }
}
