//! Simulated GenICam camera.
//!
//! Behaves like a small GigE camera: the usual feature set with ranges,
//! access modes and auto/manual interlocks, software and hardware
//! triggering, and synthetic frames (a bright spot on a background whose
//! level follows exposure and gain). Used when no camera SDK is compiled in
//! and by the tests.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::debug;

use crate::camera::{Camera, CameraProvider};
use crate::feature::{Access, FeatureValue};
use crate::image::{Frame, PixelFormat};
use crate::{Error, Result};

const WIDTH_MAX: i64 = 1280;
const HEIGHT_MAX: i64 = 1024;
/// Number of status polls before a packet size adjustment completes.
const ADJUST_POLLS: u32 = 3;

#[derive(Debug, Clone)]
enum Kind {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Enum(&'static [&'static str]),
    Text,
    Command,
}

#[derive(Debug, Clone)]
struct Node {
    kind: Kind,
    value: FeatureValue,
    access: Access,
}

impl Node {
    fn int(value: i64, min: i64, max: i64) -> Self {
        Node { kind: Kind::Int { min, max }, value: FeatureValue::Int(value), access: Access::ReadWrite }
    }

    fn float(value: f64, min: f64, max: f64) -> Self {
        Node { kind: Kind::Float { min, max }, value: FeatureValue::Float(value), access: Access::ReadWrite }
    }

    fn entry(value: &str, entries: &'static [&'static str]) -> Self {
        Node { kind: Kind::Enum(entries), value: FeatureValue::from(value), access: Access::ReadWrite }
    }

    fn text(value: &str) -> Self {
        Node { kind: Kind::Text, value: FeatureValue::from(value), access: Access::ReadOnly }
    }

    fn command() -> Self {
        Node { kind: Kind::Command, value: FeatureValue::Bool(true), access: Access::ReadWrite }
    }

    fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }
}

/// A set of simulated cameras addressed by id.
#[derive(Debug, Clone)]
pub struct SimulatedSystem {
    ids: Vec<String>,
}

impl Default for SimulatedSystem {
    fn default() -> Self {
        SimulatedSystem::with_cameras(&["SIM-0"])
    }
}

impl SimulatedSystem {
    pub fn with_cameras(ids: &[&str]) -> Self {
        SimulatedSystem { ids: ids.iter().map(|id| id.to_string()).collect() }
    }
}

impl CameraProvider for SimulatedSystem {
    type Camera = SimulatedCamera;

    fn camera_ids(&self) -> Result<Vec<String>> {
        Ok(self.ids.clone())
    }

    fn open(&self, id: &str) -> Result<SimulatedCamera> {
        if self.ids.iter().any(|known| known == id) {
            Ok(SimulatedCamera::new(id))
        } else {
            Err(Error::CameraNotFound(id.to_string()))
        }
    }
}

#[derive(Debug)]
pub struct SimulatedCamera {
    id: String,
    nodes: BTreeMap<String, Node>,
    acquiring: bool,
    /// Frames left in this acquisition, `None` when free running.
    frames_left: Option<i64>,
    nframe: u32,
    pending_triggers: u32,
    adjust_polls: Cell<u32>,
    opened: Instant,
}

impl SimulatedCamera {
    pub fn new(id: &str) -> Self {
        let mut nodes = BTreeMap::new();
        let mut add = |name: &str, node: Node| {
            nodes.insert(name.to_string(), node);
        };
        add("DeviceID", Node::text(id));
        add("DeviceModelName", Node::text("Simulated GigE Mono"));
        add("WidthMax", Node::int(WIDTH_MAX, WIDTH_MAX, WIDTH_MAX).read_only());
        add("HeightMax", Node::int(HEIGHT_MAX, HEIGHT_MAX, HEIGHT_MAX).read_only());
        add("Width", Node::int(WIDTH_MAX, 1, WIDTH_MAX));
        add("Height", Node::int(HEIGHT_MAX, 1, HEIGHT_MAX));
        add("OffsetX", Node::int(0, 0, WIDTH_MAX - 1));
        add("OffsetY", Node::int(0, 0, HEIGHT_MAX - 1));
        add("PixelFormat", Node::entry("Mono8", &["Mono8", "Mono16"]));
        add("AcquisitionMode", Node::entry("Continuous", &["Continuous", "SingleFrame", "MultiFrame"]));
        add("AcquisitionFrameCount", Node::int(1, 1, 65535));
        add("ExposureAuto", Node::entry("Off", &["Off", "Once", "Continuous"]));
        add("ExposureTime", Node::float(10000.0, 20.0, 1_000_000.0));
        add("GainAuto", Node::entry("Off", &["Off", "Once", "Continuous"]));
        add("Gain", Node::float(0.0, 0.0, 24.0));
        add("TriggerMode", Node::entry("Off", &["Off", "On"]));
        add("TriggerSource", Node::entry("Software", &["Software", "Line1", "Line2"]));
        add("TriggerActivation", Node::entry("RisingEdge", &["RisingEdge", "FallingEdge"]));
        add("TriggerSoftware", Node::command());
        add("GevSCPSPacketSize", Node::int(1500, 576, 9000));
        add("GevSCPD", Node::int(0, 0, 100_000));
        add("GVSPAdjustPacketSize", Node::command());
        SimulatedCamera {
            id: id.to_string(),
            nodes,
            acquiring: false,
            frames_left: None,
            nframe: 0,
            pending_triggers: 0,
            adjust_polls: Cell::new(0),
            opened: Instant::now(),
        }
    }

    /// Drop a feature, as on a camera model that lacks it.
    pub fn without_feature(mut self, name: &str) -> Self {
        self.nodes.remove(name);
        self
    }

    /// Lock a feature, as a camera does while another setting owns it.
    pub fn read_only(mut self, name: &str) -> Self {
        if let Some(node) = self.nodes.get_mut(name) {
            node.access = Access::ReadOnly;
        }
        self
    }

    fn node(&self, name: &str) -> Result<&Node> {
        self.nodes.get(name).ok_or_else(|| Error::FeatureNotFound(name.to_string()))
    }

    fn int_value(&self, name: &str) -> i64 {
        self.nodes.get(name).and_then(|n| n.value.int()).unwrap_or(0)
    }

    fn float_value(&self, name: &str) -> f64 {
        self.nodes.get(name).and_then(|n| n.value.float()).unwrap_or(0.0)
    }

    fn text_value(&self, name: &str) -> String {
        self.nodes.get(name).and_then(|n| n.value.text()).unwrap_or_default()
    }

    /// Upper bound of an integer feature given the rest of the ROI.
    fn int_max(&self, name: &str, max: i64) -> i64 {
        match name {
            "Width" => WIDTH_MAX - self.int_value("OffsetX"),
            "Height" => HEIGHT_MAX - self.int_value("OffsetY"),
            "OffsetX" => WIDTH_MAX - self.int_value("Width"),
            "OffsetY" => HEIGHT_MAX - self.int_value("Height"),
            _ => max,
        }
    }

    fn validate(&self, name: &str, node: &Node, value: FeatureValue) -> Result<FeatureValue> {
        let type_error = |expected| Error::FeatureType { name: name.to_string(), expected };
        let range_error = |value: String| Error::FeatureRange { name: name.to_string(), value };
        match &node.kind {
            Kind::Int { min, max } => {
                let v = value.int().ok_or_else(|| type_error("integer"))?;
                if v < *min || v > self.int_max(name, *max) {
                    return Err(range_error(v.to_string()));
                }
                Ok(FeatureValue::Int(v))
            }
            Kind::Float { min, max } => {
                let v = value.float().ok_or_else(|| type_error("float"))?;
                if v < *min || v > *max {
                    return Err(range_error(v.to_string()));
                }
                Ok(FeatureValue::Float(v))
            }
            Kind::Enum(entries) => {
                let v = value.text().ok_or_else(|| type_error("enumeration"))?;
                if !entries.iter().any(|entry| *entry == v) {
                    return Err(range_error(v.to_string()));
                }
                Ok(FeatureValue::Enum(v))
            }
            Kind::Text => Err(Error::FeatureNotWritable(name.to_string())),
            Kind::Command => Err(type_error("command")),
        }
    }

    fn render(&self) -> Result<Frame> {
        let width = self.int_value("Width") as u32;
        let height = self.int_value("Height") as u32;
        let format: PixelFormat = self.text_value("PixelFormat").parse()?;
        // 5 ms at 0 dB puts the spot just below saturation
        let scale = self.float_value("ExposureTime") / 5000.0
            * 10f64.powf(self.float_value("Gain") / 20.0);
        let sigma = (width.min(height) as f64 / 8.0).max(1.0);
        // drift the spot so consecutive frames differ
        let phase = self.nframe as f64 * 0.3;
        let cx = width as f64 / 2.0 + phase.cos() * width as f64 / 8.0;
        let cy = height as f64 / 2.0 + phase.sin() * height as f64 / 8.0;

        let mut data = Vec::with_capacity(width as usize * height as usize * format.bytes_per_pixel());
        for y in 0..height {
            for x in 0..width {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let spot = 200.0 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
                let level = ((8.0 + spot) * scale).clamp(0.0, 255.0) / 255.0;
                match format {
                    PixelFormat::Mono8 => data.push((level * 255.0).round() as u8),
                    PixelFormat::Mono16 => {
                        data.extend_from_slice(&((level * 65535.0).round() as u16).to_le_bytes())
                    }
                    PixelFormat::Rgb8 => return Err(Error::PixelFormat(format.to_string())),
                }
            }
        }
        let frame = Frame::from_raw(width, height, format, 0, &data)?;
        Ok(frame.with_metadata(
            self.nframe,
            self.opened.elapsed().as_micros() as u64,
            self.float_value("ExposureTime") as u32,
        ))
    }
}

impl Camera for SimulatedCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn feature_access(&self, name: &str) -> Option<Access> {
        let node = self.nodes.get(name)?;
        let locked_by_auto = match name {
            "ExposureTime" => self.text_value("ExposureAuto") == "Continuous",
            "Gain" => self.text_value("GainAuto") == "Continuous",
            _ => false,
        };
        // ROI, format and mode are fixed while streaming
        let locked_by_stream = self.acquiring
            && matches!(
                name,
                "Width" | "Height" | "PixelFormat" | "GevSCPSPacketSize" | "AcquisitionMode" | "AcquisitionFrameCount"
            );
        if locked_by_auto || locked_by_stream {
            Some(Access::ReadOnly)
        } else {
            Some(node.access)
        }
    }

    fn feature(&self, name: &str) -> Result<FeatureValue> {
        let node = self.node(name)?;
        match node.kind {
            Kind::Command => Err(Error::FeatureType { name: name.to_string(), expected: "value" }),
            _ => Ok(node.value.clone()),
        }
    }

    fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<()> {
        let node = self.node(name)?;
        if !self.feature_access(name).map_or(false, Access::is_writable) {
            return Err(Error::FeatureNotWritable(name.to_string()));
        }
        let value = self.validate(name, node, value)?;
        if let Some(node) = self.nodes.get_mut(name) {
            node.value = value;
        }
        Ok(())
    }

    fn run_command(&mut self, name: &str) -> Result<()> {
        let node = self.node(name)?;
        if !matches!(node.kind, Kind::Command) {
            return Err(Error::FeatureType { name: name.to_string(), expected: "command" });
        }
        match name {
            "GVSPAdjustPacketSize" => {
                self.adjust_polls.set(ADJUST_POLLS);
                if let Some(node) = self.nodes.get_mut("GevSCPSPacketSize") {
                    node.value = FeatureValue::Int(8228);
                }
            }
            "TriggerSoftware" => self.pending_triggers += 1,
            _ => {}
        }
        debug!("{}: ran {}", self.id, name);
        Ok(())
    }

    fn is_command_done(&self, name: &str) -> Result<bool> {
        self.node(name)?;
        if name != "GVSPAdjustPacketSize" {
            return Ok(true);
        }
        let left = self.adjust_polls.get();
        if left == 0 {
            return Ok(true);
        }
        self.adjust_polls.set(left - 1);
        Ok(false)
    }

    fn acquisition_start(&mut self) -> Result<()> {
        self.frames_left = match self.text_value("AcquisitionMode").as_str() {
            "SingleFrame" => Some(1),
            "MultiFrame" => Some(self.int_value("AcquisitionFrameCount")),
            _ => None,
        };
        self.acquiring = true;
        Ok(())
    }

    fn acquisition_stop(&mut self) -> Result<()> {
        self.acquiring = false;
        self.pending_triggers = 0;
        Ok(())
    }

    fn grab(&mut self, timeout: Duration) -> Result<Frame> {
        if !self.acquiring {
            return Err(Error::NotAcquiring);
        }
        // a finished SingleFrame or MultiFrame acquisition delivers nothing more
        if self.frames_left == Some(0) {
            return Err(Error::Timeout(timeout.as_millis() as u32));
        }
        if self.text_value("TriggerMode") == "On" {
            // only software triggers ever arrive on a simulated camera
            if self.text_value("TriggerSource") != "Software" || self.pending_triggers == 0 {
                return Err(Error::Timeout(timeout.as_millis() as u32));
            }
            self.pending_triggers -= 1;
        }
        let frame = self.render()?;
        self.nframe += 1;
        if let Some(left) = self.frames_left.as_mut() {
            *left -= 1;
        }
        Ok(frame)
    }
}
