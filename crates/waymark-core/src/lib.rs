pub mod cache;
pub mod camera;
pub mod driver;
pub mod geocode;
pub mod markers;
pub mod place;
pub mod session;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

pub use camera::{
    AnimationError, AnimationState, Camera, CameraEvent, CameraState, CameraTarget,
    MapAnimationController, RecordingCamera, Step,
};
pub use driver::AnimationDriver;
pub use geocode::{GeocodeResponse, Geocoder, GoogleGeocoder, LocationResolver, ResolutionFailure};
pub use markers::{reconcile, MarkerDelta, MarkerSet, MarkerSetManager};
pub use place::{PrimaryDestination, ResolvedPlace};
pub use session::{BatchOutcome, MapSession};
pub use settings::{AnimationConfig, Settings};

#[derive(Error, Debug)]
pub enum WaymarkError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Invalid geocoding endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("No geocoding API key configured")]
    MissingApiKey,
    #[error("No async runtime available to drive the camera")]
    NoRuntime,
    #[error("Session has been disposed")]
    Disposed,
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-user configuration directory (`settings.json`, `extractor.json`).
pub fn get_config_root() -> PathBuf {
    directories::ProjectDirs::from("org", "waymark", "waymark")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".waymark"))
}
