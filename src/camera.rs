use std::time::Duration;

use log::{debug, info, warn};

use crate::feature::{Access, FeatureValue};
use crate::image::Frame;
use crate::{Error, Result};

/// Timeout used when the caller does not pass one to [AcquisitionBuffer::next_image].
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(3000);

/// An open camera session.
///
/// Features are addressed by their GenICam names (`ExposureTime`,
/// `TriggerMode`, ...). Backends report names they do not support as absent.
pub trait Camera {
    /// Identifier the camera was opened with.
    fn id(&self) -> &str;

    /// Access mode of a feature, `None` if the camera does not have it.
    fn feature_access(&self, name: &str) -> Option<Access>;

    fn feature(&self, name: &str) -> Result<FeatureValue>;

    fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<()>;

    /// Execute a command feature such as `GVSPAdjustPacketSize`.
    fn run_command(&mut self, name: &str) -> Result<()>;

    fn is_command_done(&self, name: &str) -> Result<bool>;

    fn acquisition_start(&mut self) -> Result<()>;

    fn acquisition_stop(&mut self) -> Result<()>;

    /// Block until the next frame arrives or `timeout` elapses.
    fn grab(&mut self, timeout: Duration) -> Result<Frame>;

    /// Start acquisition, handing the camera over to an [AcquisitionBuffer].
    fn start_acquisition(mut self) -> Result<AcquisitionBuffer<Self>>
    where
        Self: Sized,
    {
        let mode = self.feature("AcquisitionMode").ok().and_then(|mode| mode.text());
        let single_frame = mode.as_deref() == Some("SingleFrame");
        self.acquisition_start()?;
        debug!("acquisition started on {}", self.id());
        Ok(AcquisitionBuffer { camera: self, single_frame, delivered: false })
    }
}

/// Entry point of a camera SDK: enumerates and opens cameras.
pub trait CameraProvider {
    type Camera: Camera;

    fn camera_ids(&self) -> Result<Vec<String>>;

    fn open(&self, id: &str) -> Result<Self::Camera>;
}

/// Open the camera with the given id, or the first one available.
///
/// Any failure to open a named camera is reported as
/// [Error::CameraNotFound]; an empty system as [Error::NoCameras].
pub fn open_device<P: CameraProvider>(provider: &P, camera_id: Option<&str>) -> Result<P::Camera> {
    let camera = match camera_id {
        Some(id) => provider.open(id).map_err(|err| {
            debug!("opening {} failed: {}", id, err);
            Error::CameraNotFound(id.to_string())
        })?,
        None => {
            let ids = provider.camera_ids()?;
            let first = ids.first().ok_or(Error::NoCameras)?;
            provider.open(first)?
        }
    };
    info!("Opened camera {}", camera.id());
    Ok(camera)
}

/// A camera with acquisition running.
///
/// A camera in `SingleFrame` mode delivers one frame per acquisition start;
/// [AcquisitionBuffer::next_image] restarts acquisition for every further
/// frame.
pub struct AcquisitionBuffer<C: Camera> {
    camera: C,
    single_frame: bool,
    delivered: bool,
}

impl<C: Camera> AcquisitionBuffer<C> {
    /// Get the next frame, waiting at most `timeout` (default 3 s).
    pub fn next_image(&mut self, timeout: Option<Duration>) -> Result<Frame> {
        if self.single_frame && self.delivered {
            self.camera.acquisition_stop()?;
            self.camera.acquisition_start()?;
        }
        let frame = self.camera.grab(timeout.unwrap_or(DEFAULT_FRAME_TIMEOUT))?;
        self.delivered = true;
        Ok(frame)
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Features that are writable while streaming can still be changed.
    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn stop_acquisition(mut self) -> Result<C> {
        self.camera.acquisition_stop()?;
        debug!("acquisition stopped on {}", self.camera.id());
        Ok(self.camera)
    }

    /// Stop acquisition after a run that produced `outcome`.
    ///
    /// A failed run is reported ahead of a failed stop; the stop error is
    /// then only logged.
    pub fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        let stopped = self.stop_acquisition();
        match (outcome, stopped) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(stop_err)) => {
                warn!("Stopping acquisition failed as well: {}", stop_err);
                Err(err)
            }
        }
    }
}
