use std::fmt::{Display, Formatter};

use crate::feature::FeatureExt;
use crate::{Camera, Result};

/// Roi represents a region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {

    /// Offset from the left in the horizontal direction
    pub offset_x: u32,

    /// Offset from the top in the vertical direction
    pub offset_y: u32,

    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32
}

impl Default for Roi {
    fn default() -> Self {
        Roi { offset_x: 0, offset_y: 0, width: 640, height: 480 }
    }
}

impl Roi {
    /// Features and values in the order they have to be written.
    ///
    /// Size goes first so that the offsets fit inside the sensor when the
    /// previous ROI was larger.
    pub fn features(&self) -> [(&'static str, i64); 4] {
        [
            ("Width", self.width as i64),
            ("Height", self.height as i64),
            ("OffsetX", self.offset_x as i64),
            ("OffsetY", self.offset_y as i64),
        ]
    }

    /// Read the ROI currently configured on the camera.
    pub fn read<C: Camera + ?Sized>(camera: &C) -> Result<Roi> {
        Ok(Roi {
            offset_x: camera.offset_x()? as u32,
            offset_y: camera.offset_y()? as u32,
            width: camera.width()? as u32,
            height: camera.height()? as u32,
        })
    }
}

impl Display for Roi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.offset_x, self.offset_y)
    }
}
