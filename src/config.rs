//! Camera feature configuration applied before acquisition.

use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::feature::{set_if_writable, FeatureValue};
use crate::roi::Roi;
use crate::Camera;

/// Command that negotiates the largest GVSP packet the link carries.
pub const ADJUST_PACKET_SIZE: &str = "GVSPAdjustPacketSize";

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerConfig {
    /// Free running.
    Off,
    /// Hardware trigger on an input line.
    External { source: String, activation: String },
}

impl TriggerConfig {
    /// Rising edge on `Line1`.
    pub fn line1() -> Self {
        TriggerConfig::External { source: "Line1".to_string(), activation: "RisingEdge".to_string() }
    }
}

/// GigE Vision stream channel tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// `GevSCPSPacketSize` in bytes. Above 1500 only helps with jumbo frames on the NIC.
    pub packet_size: i64,
    /// `GevSCPD` inter-packet delay in ticks. Raise it when frames get dropped.
    pub packet_delay: i64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig { packet_size: 9000, packet_delay: 0 }
    }
}

/// Feature values applied by [configure_camera].
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub pixel_format: String,
    /// `None` leaves the camera's acquisition mode alone.
    pub acquisition_mode: Option<String>,
    pub exposure_us: f64,
    pub gain_db: f64,
    pub roi: Roi,
    pub trigger: TriggerConfig,
    /// `None` skips GigE transport tuning.
    pub transport: Option<TransportConfig>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            pixel_format: "Mono8".to_string(),
            acquisition_mode: Some("SingleFrame".to_string()),
            exposure_us: 5000.0,
            gain_db: 0.0,
            roi: Roi::default(),
            trigger: TriggerConfig::Off,
            transport: Some(TransportConfig::default()),
        }
    }
}

/// Which features [configure_camera] wrote and which it skipped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    /// ROI read back after configuration, `None` if the camera could not report it.
    pub roi: Option<Roi>,
}

impl ConfigReport {
    fn set<C, V>(&mut self, camera: &mut C, name: &str, value: V)
    where
        C: Camera + ?Sized,
        V: Into<FeatureValue>,
    {
        if set_if_writable(camera, name, value) {
            self.applied.push(name.to_string());
        } else {
            self.skipped.push(name.to_string());
        }
    }

    pub fn was_applied(&self, name: &str) -> bool {
        self.applied.iter().any(|n| n == name)
    }
}

impl Display for ConfigReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "applied [{}]", self.applied.join(", "))?;
        if !self.skipped.is_empty() {
            write!(f, ", skipped [{}]", self.skipped.join(", "))?;
        }
        if let Some(roi) = &self.roi {
            write!(f, ", roi {}", roi)?;
        }
        Ok(())
    }
}

/// Apply `settings` feature by feature. Nothing here fails: features the
/// camera lacks or refuses end up in [ConfigReport::skipped].
pub fn configure_camera<C: Camera + ?Sized>(camera: &mut C, settings: &CameraSettings) -> ConfigReport {
    let mut report = ConfigReport::default();

    report.set(camera, "PixelFormat", settings.pixel_format.as_str());
    if let Some(mode) = &settings.acquisition_mode {
        report.set(camera, "AcquisitionMode", mode.as_str());
    }

    // auto modes first, they lock the manual values
    report.set(camera, "ExposureAuto", "Off");
    report.set(camera, "ExposureTime", settings.exposure_us);
    report.set(camera, "GainAuto", "Off");
    report.set(camera, "Gain", settings.gain_db);

    for (name, value) in settings.roi.features() {
        report.set(camera, name, value);
    }
    report.roi = match Roi::read(camera) {
        Ok(roi) => Some(roi),
        Err(err) => {
            debug!("ROI not readable: {}", err);
            None
        }
    };

    if camera.feature_access("TriggerMode").is_some() {
        match &settings.trigger {
            TriggerConfig::External { source, activation } => {
                report.set(camera, "TriggerMode", "On");
                report.set(camera, "TriggerSource", source.as_str());
                report.set(camera, "TriggerActivation", activation.as_str());
            }
            TriggerConfig::Off => report.set(camera, "TriggerMode", "Off"),
        }
    } else {
        report.skipped.push("TriggerMode".to_string());
    }

    if let Some(transport) = settings.transport {
        configure_gige_transport(camera, &transport, &mut report);
    }

    info!("Camera {} configured: {}", camera.id(), report);
    report
}

fn configure_gige_transport<C: Camera + ?Sized>(
    camera: &mut C,
    transport: &TransportConfig,
    report: &mut ConfigReport,
) {
    report.set(camera, "GevSCPSPacketSize", transport.packet_size);
    report.set(camera, "GevSCPD", transport.packet_delay);
}

/// Run the packet size negotiation of GigE cameras and wait for it.
///
/// Other transports lack the command; that and any failure are ignored.
///
/// returns: bool `true` when the adjustment ran to completion within `timeout`
pub fn adjust_packet_size<C: Camera + ?Sized>(camera: &mut C, timeout: Duration) -> bool {
    if camera.feature_access(ADJUST_PACKET_SIZE).is_none() {
        debug!("{} not available", ADJUST_PACKET_SIZE);
        return false;
    }
    if let Err(err) = camera.run_command(ADJUST_PACKET_SIZE) {
        debug!("{} failed: {}", ADJUST_PACKET_SIZE, err);
        return false;
    }
    let started = Instant::now();
    loop {
        match camera.is_command_done(ADJUST_PACKET_SIZE) {
            Ok(true) => {
                debug!("{} done after {:?}", ADJUST_PACKET_SIZE, started.elapsed());
                return true;
            }
            Ok(false) if started.elapsed() < timeout => std::thread::yield_now(),
            Ok(false) => {
                debug!("{} still running after {:?}", ADJUST_PACKET_SIZE, timeout);
                return false;
            }
            Err(err) => {
                debug!("{} status unavailable: {}", ADJUST_PACKET_SIZE, err);
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::feature::FeatureExt;
    use crate::sim::SimulatedCamera;

    #[test]
    fn defaults_match_capture_script() {
        let settings = CameraSettings::default();
        assert_eq!(settings.pixel_format, "Mono8");
        assert_relative_eq!(settings.exposure_us, 5000.0);
        assert_eq!(settings.roi, Roi { offset_x: 0, offset_y: 0, width: 640, height: 480 });
        assert_eq!(settings.transport, Some(TransportConfig { packet_size: 9000, packet_delay: 0 }));
    }

    #[test]
    fn applies_all_writable_features() {
        let mut cam = SimulatedCamera::new("SIM-0");
        let report = configure_camera(&mut cam, &CameraSettings::default());
        assert!(report.skipped.is_empty(), "skipped {:?}", report.skipped);
        assert_relative_eq!(cam.exposure_time().unwrap(), 5000.0);
        assert_eq!(cam.width().unwrap(), 640);
        assert_eq!(cam.height().unwrap(), 480);
        assert_eq!(report.roi, Some(Roi::default()));
        assert_eq!(cam.acquisition_mode().unwrap(), "SingleFrame");
        assert_eq!(cam.trigger_mode().unwrap(), "Off");
        assert_eq!(cam.feature("GevSCPSPacketSize").unwrap(), FeatureValue::Int(9000));
    }

    #[test]
    fn auto_modes_are_switched_off_before_manual_values() {
        let mut cam = SimulatedCamera::new("SIM-0");
        cam.set_feature("ExposureAuto", "Continuous".into()).unwrap();
        cam.set_feature("GainAuto", "Continuous".into()).unwrap();
        let settings = CameraSettings { gain_db: 6.0, ..CameraSettings::default() };
        let report = configure_camera(&mut cam, &settings);
        assert!(report.was_applied("ExposureTime"));
        assert_relative_eq!(cam.gain().unwrap(), 6.0);
    }

    #[test]
    fn missing_and_locked_features_are_skipped() {
        let mut cam = SimulatedCamera::new("SIM-0")
            .without_feature("GevSCPD")
            .without_feature("AcquisitionMode")
            .read_only("Gain");
        let report = configure_camera(&mut cam, &CameraSettings::default());
        assert_eq!(report.skipped, ["AcquisitionMode", "Gain", "GevSCPD"]);
        assert!(report.was_applied("GevSCPSPacketSize"));
    }

    #[test]
    fn report_carries_roi_the_camera_applied() {
        // OffsetX is rejected, the camera keeps its previous one
        let mut cam = SimulatedCamera::new("SIM-0").read_only("OffsetX");
        let requested = Roi { offset_x: 8, offset_y: 4, width: 64, height: 48 };
        let report = configure_camera(&mut cam, &CameraSettings { roi: requested, ..CameraSettings::default() });
        assert_eq!(report.roi, Some(Roi { offset_x: 0, ..requested }));
        assert!(report.to_string().ends_with("roi 64x48+0+4"));

        let mut blind = SimulatedCamera::new("SIM-1").without_feature("OffsetY");
        assert_eq!(configure_camera(&mut blind, &CameraSettings::default()).roi, None);
    }

    #[test]
    fn external_trigger_sets_source_and_activation() {
        let mut cam = SimulatedCamera::new("SIM-0");
        let settings = CameraSettings { trigger: TriggerConfig::line1(), ..CameraSettings::default() };
        configure_camera(&mut cam, &settings);
        assert_eq!(cam.trigger_mode().unwrap(), "On");
        assert_eq!(cam.trigger_source().unwrap(), "Line1");
        assert_eq!(cam.feature("TriggerActivation").unwrap(), FeatureValue::from("RisingEdge"));
    }

    #[test]
    fn camera_without_trigger_skips_it() {
        let mut cam = SimulatedCamera::new("SIM-0").without_feature("TriggerMode");
        let settings = CameraSettings { trigger: TriggerConfig::line1(), ..CameraSettings::default() };
        let report = configure_camera(&mut cam, &settings);
        assert!(report.skipped.contains(&"TriggerMode".to_string()));
        assert!(!report.was_applied("TriggerSource"));
    }

    #[test]
    fn packet_size_adjustment() {
        let mut cam = SimulatedCamera::new("SIM-0");
        assert!(adjust_packet_size(&mut cam, Duration::from_secs(1)));

        let mut usb = SimulatedCamera::new("SIM-1").without_feature(ADJUST_PACKET_SIZE);
        assert!(!adjust_packet_size(&mut usb, Duration::from_secs(1)));
    }
}
