/*
 * Copyright (c) 2026. XIMEA GmbH - All Rights Reserved
 */

use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // discovery
    #[error("No Cameras accessible.")]
    NoCameras,
    #[error("Failed to access Camera '{0}'.")]
    CameraNotFound(String),

    // features
    #[error("Feature {0} is not available on this camera")]
    FeatureNotFound(String),
    #[error("Feature {0} is not writable")]
    FeatureNotWritable(String),
    #[error("Feature {name} expects a {expected} value")]
    FeatureType { name: String, expected: &'static str },
    #[error("Value {value} is out of range for feature {name}")]
    FeatureRange { name: String, value: String },

    // acquisition
    #[error("Acquisition has not been started")]
    NotAcquiring,
    #[error("Timed out after {0} ms waiting for a frame")]
    Timeout(u32),
    #[error("Frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("Frame buffer of {len} bytes does not match {width}x{height}")]
    FrameSize { width: u32, height: u32, len: usize },
    #[error("Pixel format {0} is not supported")]
    PixelFormat(String),

    // sdk
    #[error("Camera SDK returned error code {0}")]
    Sdk(i32),

    // storage
    #[error("Failed to write image: {path:?}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to write CSV: {path:?}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to write {path:?}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // display
    #[error("Display error: {0}")]
    Display(String),
}
