/*
 * Copyright (c) 2026. XIMEA GmbH - All Rights Reserved
 */

//! XIMEA xiAPI backend.
//!
//! GenICam feature names are translated to xiAPI parameters. Names without
//! an xiAPI counterpart (GigE transport, acquisition mode) are reported as
//! absent, so the feature guard skips them.

use std::ffi::{CStr, CString};
use std::mem::size_of;
use std::slice::from_raw_parts;
use std::time::Duration;

use libc::{c_char, c_int};
use log::debug;
use xiapi_sys::*;

use crate::camera::{Camera, CameraProvider};
use crate::feature::{Access, FeatureValue};
use crate::image::{Frame, PixelFormat};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
enum ParamKind {
    Int,
    Float,
    /// GenICam entry names and the xiAPI values they stand for.
    Enum(&'static [(&'static str, c_int)]),
    /// Write only trigger, executed by writing 1.
    Command,
}

#[derive(Debug, Clone, Copy)]
struct Param {
    feature: &'static str,
    xi_name: &'static str,
    kind: ParamKind,
}

const PARAMS: &[Param] = &[
    Param { feature: "Width", xi_name: "width", kind: ParamKind::Int },
    Param { feature: "Height", xi_name: "height", kind: ParamKind::Int },
    Param { feature: "OffsetX", xi_name: "offsetX", kind: ParamKind::Int },
    Param { feature: "OffsetY", xi_name: "offsetY", kind: ParamKind::Int },
    Param { feature: "WidthMax", xi_name: "width:max", kind: ParamKind::Int },
    Param { feature: "HeightMax", xi_name: "height:max", kind: ParamKind::Int },
    Param { feature: "ExposureTime", xi_name: "exposure", kind: ParamKind::Float },
    Param { feature: "Gain", xi_name: "gain", kind: ParamKind::Float },
    Param {
        feature: "PixelFormat",
        xi_name: "imgdataformat",
        kind: ParamKind::Enum(&[("Mono8", 0), ("Mono16", 1)]),
    },
    // xiAPI has one switch for auto exposure and auto gain
    Param {
        feature: "ExposureAuto",
        xi_name: "aeag",
        kind: ParamKind::Enum(&[("Off", 0), ("Continuous", 1)]),
    },
    Param {
        feature: "GainAuto",
        xi_name: "aeag",
        kind: ParamKind::Enum(&[("Off", 0), ("Continuous", 1)]),
    },
    // trigger_source carries both the mode and the edge
    Param {
        feature: "TriggerMode",
        xi_name: "trigger_source",
        kind: ParamKind::Enum(&[("Off", 0), ("On", 1)]),
    },
    Param {
        feature: "TriggerActivation",
        xi_name: "trigger_source",
        kind: ParamKind::Enum(&[("RisingEdge", 1), ("FallingEdge", 2)]),
    },
    Param {
        feature: "TriggerSource",
        xi_name: "gpi_selector",
        kind: ParamKind::Enum(&[("Line1", 1), ("Line2", 2), ("Line3", 3), ("Line4", 4)]),
    },
    Param { feature: "TriggerSoftware", xi_name: "trg_software", kind: ParamKind::Command },
];

fn lookup(feature: &str) -> Option<&'static Param> {
    PARAMS.iter().find(|p| p.feature == feature)
}

fn check(err: XI_RETURN) -> Result<()> {
    match err as u32 {
        XI_RET::XI_OK => Ok(()),
        _ => Err(Error::Sdk(err)),
    }
}

fn param_name(xi_name: &str, modifier: &str) -> CString {
    // parameter names are compile time constants without NUL bytes
    CString::new(format!("{}{}", xi_name, modifier)).unwrap_or_default()
}

/// All cameras the xiAPI driver sees, addressed by serial number.
#[derive(Debug, Default)]
pub struct XiapiSystem;

impl CameraProvider for XiapiSystem {
    type Camera = XiapiCamera;

    fn camera_ids(&self) -> Result<Vec<String>> {
        let mut count: DWORD = 0;
        check(unsafe { xiGetNumberDevices(&mut count) })?;
        let prm = param_name("device_sn", "");
        let mut ids = Vec::with_capacity(count as usize);
        for dev_id in 0..count {
            let mut buffer = [0 as c_char; 256];
            check(unsafe {
                xiGetDeviceInfoString(dev_id, prm.as_ptr(), buffer.as_mut_ptr(), buffer.len() as DWORD)
            })?;
            let serial = unsafe { CStr::from_ptr(buffer.as_ptr()) };
            ids.push(serial.to_string_lossy().into_owned());
        }
        Ok(ids)
    }

    fn open(&self, id: &str) -> Result<XiapiCamera> {
        let serial = CString::new(id).map_err(|_| Error::CameraNotFound(id.to_string()))?;
        let mut device_handle: HANDLE = std::ptr::null_mut();
        let err = unsafe { xiOpenDeviceBy(XI_OPEN_BY::XI_OPEN_BY_SN, serial.as_ptr(), &mut device_handle) };
        match err as u32 {
            XI_RET::XI_OK => Ok(XiapiCamera { device_handle, id: id.to_string() }),
            _ => Err(Error::Sdk(err)),
        }
    }
}

pub struct XiapiCamera {
    device_handle: HANDLE,
    id: String,
}

impl Drop for XiapiCamera {
    fn drop(&mut self) {
        unsafe { xiCloseDevice(self.device_handle); }
    }
}

impl XiapiCamera {
    fn get_int(&self, prm: &CStr) -> Result<c_int> {
        let mut value: c_int = 0;
        check(unsafe { xiGetParamInt(self.device_handle, prm.as_ptr(), &mut value) })?;
        Ok(value)
    }

    fn get_float(&self, prm: &CStr) -> Result<f32> {
        let mut value: f32 = 0.0;
        check(unsafe { xiGetParamFloat(self.device_handle, prm.as_ptr(), &mut value) })?;
        Ok(value)
    }

    fn set_int(&mut self, prm: &CStr, value: c_int) -> Result<()> {
        check(unsafe { xiSetParamInt(self.device_handle, prm.as_ptr(), value) })
    }

    fn set_float(&mut self, prm: &CStr, value: f32) -> Result<()> {
        check(unsafe { xiSetParamFloat(self.device_handle, prm.as_ptr(), value) })
    }

    fn param(&self, feature: &str) -> Result<&'static Param> {
        lookup(feature).ok_or_else(|| Error::FeatureNotFound(feature.to_string()))
    }
}

impl Camera for XiapiCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn feature_access(&self, name: &str) -> Option<Access> {
        let param = lookup(name)?;
        let present = match param.kind {
            ParamKind::Float => self.get_float(&param_name(param.xi_name, "")).is_ok(),
            ParamKind::Command => true,
            _ => self.get_int(&param_name(param.xi_name, "")).is_ok(),
        };
        if !present {
            return None;
        }
        if param.xi_name.contains(':') {
            return Some(Access::ReadOnly);
        }
        match self.get_int(&param_name(param.xi_name, ":settable")) {
            Ok(0) => Some(Access::ReadOnly),
            _ => Some(Access::ReadWrite),
        }
    }

    fn feature(&self, name: &str) -> Result<FeatureValue> {
        let param = self.param(name)?;
        let prm = param_name(param.xi_name, "");
        match param.kind {
            ParamKind::Int => Ok(FeatureValue::Int(self.get_int(&prm)? as i64)),
            ParamKind::Float => Ok(FeatureValue::Float(self.get_float(&prm)? as f64)),
            ParamKind::Enum(entries) => {
                let raw = self.get_int(&prm)?;
                entries
                    .iter()
                    .find(|(_, v)| *v == raw)
                    .map(|(entry, _)| FeatureValue::from(*entry))
                    .ok_or_else(|| Error::FeatureRange { name: name.to_string(), value: raw.to_string() })
            }
            ParamKind::Command => Err(Error::FeatureType { name: name.to_string(), expected: "value" }),
        }
    }

    fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<()> {
        let param = self.param(name)?;
        let prm = param_name(param.xi_name, "");
        let type_error = |expected| Error::FeatureType { name: name.to_string(), expected };
        match param.kind {
            ParamKind::Int => {
                let v = value.int().ok_or_else(|| type_error("integer"))?;
                let v = c_int::try_from(v)
                    .map_err(|_| Error::FeatureRange { name: name.to_string(), value: v.to_string() })?;
                self.set_int(&prm, v)
            }
            ParamKind::Float => {
                let v = value.float().ok_or_else(|| type_error("float"))?;
                self.set_float(&prm, v as f32)
            }
            ParamKind::Enum(entries) => {
                let entry = value.text().ok_or_else(|| type_error("enumeration"))?;
                let raw = entries
                    .iter()
                    .find(|(e, _)| *e == entry)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| Error::FeatureRange { name: name.to_string(), value: entry.clone() })?;
                self.set_int(&prm, raw)?;
                if name == "TriggerSource" {
                    // route the selected input to the trigger
                    self.set_int(&param_name("gpi_mode", ""), XI_GPI_MODE::XI_GPI_TRIGGER as c_int)?;
                }
                Ok(())
            }
            ParamKind::Command => Err(type_error("command")),
        }
    }

    fn run_command(&mut self, name: &str) -> Result<()> {
        let param = self.param(name)?;
        match param.kind {
            ParamKind::Command => self.set_int(&param_name(param.xi_name, ""), 1),
            _ => Err(Error::FeatureType { name: name.to_string(), expected: "command" }),
        }
    }

    fn is_command_done(&self, name: &str) -> Result<bool> {
        self.param(name)?;
        Ok(true)
    }

    fn acquisition_start(&mut self) -> Result<()> {
        check(unsafe { xiStartAcquisition(self.device_handle) })
    }

    fn acquisition_stop(&mut self) -> Result<()> {
        check(unsafe { xiStopAcquisition(self.device_handle) })
    }

    fn grab(&mut self, timeout: Duration) -> Result<Frame> {
        let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        let mut xi_img: XI_IMG = unsafe { std::mem::zeroed() };
        xi_img.size = size_of::<XI_IMG>() as DWORD;
        let err = unsafe { xiGetImage(self.device_handle, timeout_ms, &mut xi_img) };
        match err as u32 {
            XI_RET::XI_OK => {}
            XI_RET::XI_TIMEOUT => return Err(Error::Timeout(timeout_ms)),
            _ => return Err(Error::Sdk(err)),
        }
        let format = match xi_img.frm {
            XI_IMG_FORMAT::XI_MONO8 | XI_IMG_FORMAT::XI_RAW8 => PixelFormat::Mono8,
            XI_IMG_FORMAT::XI_MONO16 | XI_IMG_FORMAT::XI_RAW16 => PixelFormat::Mono16,
            other => return Err(Error::PixelFormat(format!("xiAPI format {}", other))),
        };
        if xi_img.bp.is_null() {
            return Err(Error::EmptyFrame { width: xi_img.width, height: xi_img.height });
        }
        let stride = xi_img.width as usize * format.bytes_per_pixel() + xi_img.padding_x as usize;
        let length = if xi_img.bp_size != 0 {
            xi_img.bp_size as usize
        } else {
            stride * xi_img.height as usize
        };
        // the buffer stays valid until the next xiGetImage on this handle
        let data = unsafe { from_raw_parts(xi_img.bp as *const u8, length) };
        let frame = Frame::from_raw(xi_img.width, xi_img.height, format, xi_img.padding_x, data)?;
        let timestamp_raw = ((xi_img.tsSec as u64) << 32) | xi_img.tsUSec as u64;
        debug!("{}: frame {} ({}x{})", self.id, xi_img.nframe, xi_img.width, xi_img.height);
        Ok(frame.with_metadata(xi_img.nframe, timestamp_raw, xi_img.exposure_time_us))
    }
}

#[cfg(test)]
mod tests {
    use serial_test::file_serial;

    use super::*;
    use crate::camera::open_device;
    use crate::feature::{set_if_writable, FeatureExt};

    #[test]
    fn unknown_features_are_absent() {
        assert!(lookup("GevSCPSPacketSize").is_none());
        assert!(lookup("AcquisitionMode").is_none());
        assert_eq!(lookup("ExposureTime").map(|p| p.xi_name), Some("exposure"));
    }

    #[test]
    #[file_serial]
    fn start_stop_acquisition() -> Result<()> {
        let cam = open_device(&XiapiSystem, None)?;
        let mut acq = cam.start_acquisition()?;
        let frame = acq.next_image(None)?;
        assert!(frame.width() > 0);
        acq.stop_acquisition()?;
        Ok(())
    }

    #[test]
    #[file_serial]
    fn exposure_round_trips() -> Result<()> {
        let mut cam = open_device(&XiapiSystem, None)?;
        assert!(set_if_writable(&mut cam, "ExposureTime", 10000.0));
        approx::assert_abs_diff_eq!(cam.exposure_time()?, 10000.0, epsilon = 100.0);
        assert!(!set_if_writable(&mut cam, "GevSCPD", 0i64));
        Ok(())
    }
}
