//! Centre line intensity profiles.

use crate::image::Frame;
use crate::{Error, Result};

/// Intensities along the centre row and centre column of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Index of the sampled row, `height / 2`.
    pub row_index: u32,
    /// Index of the sampled column, `width / 2`.
    pub column_index: u32,
    /// `width` samples, left to right.
    pub row: Vec<u8>,
    /// `height` samples, top to bottom.
    pub column: Vec<u8>,
}

impl Profile {
    pub fn center(frame: &Frame) -> Result<Profile> {
        let (width, height) = (frame.width(), frame.height());
        let empty = || Error::EmptyFrame { width, height };
        let row_index = height / 2;
        let column_index = width / 2;
        let row = frame.row(row_index).ok_or_else(empty)?.to_vec();
        let column = frame.column(column_index).ok_or_else(empty)?;
        Ok(Profile { row_index, column_index, row, column })
    }

    /// Largest sample of either profile.
    pub fn peak(&self) -> u8 {
        self.row.iter().chain(self.column.iter()).copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn frame(width: u32, height: u32) -> Frame {
        // encode coordinates so the origin of every sample is visible
        Frame::new(GrayImage::from_fn(width, height, |x, y| Luma([(x * 16 + y) as u8])))
    }

    #[test]
    fn lengths_follow_frame_size() {
        for (w, h) in [(1, 1), (4, 3), (7, 10), (16, 2)] {
            let profile = Profile::center(&frame(w, h)).unwrap();
            assert_eq!(profile.row.len(), w as usize);
            assert_eq!(profile.column.len(), h as usize);
            assert_eq!(profile.row_index, h / 2);
            assert_eq!(profile.column_index, w / 2);
        }
    }

    #[test]
    fn samples_come_from_centre_lines() {
        let profile = Profile::center(&frame(5, 4)).unwrap();
        // row 2, every column
        assert_eq!(profile.row, vec![2, 18, 34, 50, 66]);
        // column 2, every row
        assert_eq!(profile.column, vec![32, 33, 34, 35]);
        assert_eq!(profile.peak(), 66);
    }

    #[test]
    fn empty_frame_is_an_error() {
        let empty = Frame::new(GrayImage::new(0, 0));
        assert!(matches!(Profile::center(&empty), Err(Error::EmptyFrame { .. })));
    }
}
