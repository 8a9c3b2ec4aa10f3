/*
 * Copyright (c) 2026. XIMEA GmbH - All Rights Reserved
 */

use std::fmt::{Display, Formatter};

use log::{debug, warn};
use paste::paste;

use crate::{Camera, Error, Result};

/// Value of a named camera feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    /// Symbolic entry of an enumeration feature, e.g. `"Mono8"` or `"Off"`.
    Enum(String),
    Bool(bool),
}

impl FeatureValue {
    /// Integer content. Floats are not truncated implicitly.
    pub fn int(&self) -> Option<i64> {
        match self {
            FeatureValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float content. Integer features are widened.
    pub fn float(&self) -> Option<f64> {
        match self {
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<String> {
        match self {
            FeatureValue::Enum(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Int(_) => "integer",
            FeatureValue::Float(_) => "float",
            FeatureValue::Enum(_) => "enumeration",
            FeatureValue::Bool(_) => "boolean",
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Float(v) => write!(f, "{}", v),
            FeatureValue::Enum(v) => write!(f, "{}", v),
            FeatureValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Int(value)
    }
}

impl From<u32> for FeatureValue {
    fn from(value: u32) -> Self {
        FeatureValue::Int(value as i64)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Float(value)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Enum(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Enum(value)
    }
}

/// Access mode reported by the SDK for a feature that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub fn is_writable(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// Set a feature if it exists and is writable.
///
/// Absent and read-only features are skipped silently. A write the SDK
/// rejects is logged as a warning. Never fails.
///
/// returns: bool `true` only when the value was written
pub fn set_if_writable<C, V>(camera: &mut C, name: &str, value: V) -> bool
where
    C: Camera + ?Sized,
    V: Into<FeatureValue>,
{
    let value = value.into();
    match camera.feature_access(name) {
        None => {
            debug!("{} not present, skipped", name);
            false
        }
        Some(access) if !access.is_writable() => {
            debug!("{} is not writable, skipped", name);
            false
        }
        Some(_) => match camera.set_feature(name, value.clone()) {
            Ok(()) => {
                debug!("{} = {}", name, value);
                true
            }
            Err(err) => {
                warn!("Failed to set {}: {}", name, err);
                false
            }
        },
    }
}

macro_rules! feature_accessors {
    ($($name:ident: $feature:literal => $ty:ty, $conv:ident;)*) => {
        paste! {
            /// Typed access to the standard GenICam features.
            pub trait FeatureExt: Camera {
                $(
                    #[doc = concat!("Read the `", $feature, "` feature.")]
                    fn $name(&self) -> Result<$ty> {
                        self.feature($feature)?.$conv().ok_or_else(|| Error::FeatureType {
                            name: $feature.to_string(),
                            expected: stringify!($ty),
                        })
                    }

                    #[doc = concat!("Write the `", $feature, "` feature.")]
                    fn [<set_ $name>](&mut self, value: $ty) -> Result<()> {
                        self.set_feature($feature, FeatureValue::from(value))
                    }
                )*
            }
        }
    };
}

feature_accessors! {
    exposure_time: "ExposureTime" => f64, float;
    gain: "Gain" => f64, float;
    width: "Width" => i64, int;
    height: "Height" => i64, int;
    offset_x: "OffsetX" => i64, int;
    offset_y: "OffsetY" => i64, int;
    pixel_format: "PixelFormat" => String, text;
    acquisition_mode: "AcquisitionMode" => String, text;
    trigger_mode: "TriggerMode" => String, text;
    trigger_source: "TriggerSource" => String, text;
}

impl<C: Camera + ?Sized> FeatureExt for C {}
