pub use camera::*;
pub use error::{Error, Result};
pub use feature::{set_if_writable, Access, FeatureExt, FeatureValue};
pub use self::image::{Frame, PixelFormat};
pub use profile::Profile;
pub use roi::Roi;

pub mod camera;
pub mod capture;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod feature;
pub mod image;
pub mod live;
pub mod profile;
pub mod roi;
pub mod schedule;
pub mod sim;
#[cfg(feature = "xiapi")]
pub mod xiapi;

/// Camera SDK the tools are built against.
#[cfg(feature = "xiapi")]
pub type DefaultProvider = xiapi::XiapiSystem;
#[cfg(not(feature = "xiapi"))]
pub type DefaultProvider = sim::SimulatedSystem;

/// Set up `env_logger` with `info` as the default level; `RUST_LOG` overrides.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
