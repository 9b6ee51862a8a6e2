use crate::place::{is_valid_coordinate, PrimaryDestination};
use crate::settings::AnimationConfig;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// The map widget's camera. Only [`MapAnimationController`] writes to it.
pub trait Camera: Send {
    fn zoom(&self) -> u8;
    fn set_zoom(&mut self, zoom: u8);
    fn pan_to(&mut self, lat: f64, lng: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraState {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
}

impl Default for CameraState {
    fn default() -> Self {
        // Whole-world view
        Self {
            lat: 0.0,
            lng: 0.0,
            zoom: 2,
        }
    }
}

impl Camera for CameraState {
    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    fn pan_to(&mut self, lat: f64, lng: f64) {
        self.lat = lat;
        self.lng = lng;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CameraEvent {
    Zoom(u8),
    Pan { lat: f64, lng: f64 },
}

/// A [`CameraState`] that also keeps every mutation, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingCamera {
    pub state: CameraState,
    pub events: Vec<CameraEvent>,
}

impl RecordingCamera {
    pub fn at(state: CameraState) -> Self {
        Self {
            state,
            events: Vec::new(),
        }
    }

    pub fn zoom_levels(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                CameraEvent::Zoom(z) => Some(*z),
                CameraEvent::Pan { .. } => None,
            })
            .collect()
    }

    pub fn pans(&self) -> Vec<(f64, f64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                CameraEvent::Pan { lat, lng } => Some((*lat, *lng)),
                CameraEvent::Zoom(_) => None,
            })
            .collect()
    }
}

impl Camera for RecordingCamera {
    fn zoom(&self) -> u8 {
        self.state.zoom
    }

    fn set_zoom(&mut self, zoom: u8) {
        self.state.set_zoom(zoom);
        self.events.push(CameraEvent::Zoom(zoom));
    }

    fn pan_to(&mut self, lat: f64, lng: f64) {
        self.state.pan_to(lat, lng);
        self.events.push(CameraEvent::Pan { lat, lng });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnimationState {
    Idle,
    ZoomingOut,
    Panning,
    ZoomingIn,
}

/// What the timer should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Schedule the next tick of the same generation after this delay.
    Continue(Duration),
    /// The run reached Idle.
    Finished,
    /// The tick belonged to a superseded run and did nothing.
    Stale,
}

/// Instruction for the map widget: where the camera ends up and every zoom
/// level it passes through on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraTarget {
    pub lat: f64,
    pub lng: f64,
    pub zoom_sequence: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    #[error("camera target ({lat}, {lng}) is not a valid coordinate")]
    InvalidTarget { lat: f64, lng: f64 },
}

/// Zoom-out, pan, zoom-in state machine driven by discrete ticks.
///
/// Every run gets a new generation. A tick carries the generation it was
/// scheduled under and does nothing once that generation is no longer current.
pub struct MapAnimationController<C: Camera> {
    camera: C,
    config: AnimationConfig,
    state: AnimationState,
    generation: u64,
    target: Option<PrimaryDestination>,
    planned: Option<CameraTarget>,
}

impl<C: Camera> MapAnimationController<C> {
    pub fn new(camera: C, config: AnimationConfig) -> Self {
        Self {
            camera,
            config,
            state: AnimationState::Idle,
            generation: 0,
            target: None,
            planned: None,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn target(&self) -> Option<&PrimaryDestination> {
        self.target.as_ref()
    }

    pub fn planned_target(&self) -> Option<&CameraTarget> {
        self.planned.as_ref()
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn into_camera(self) -> C {
        self.camera
    }

    /// Starts a run towards `destination`, cancelling any run in flight.
    /// Returns the generation the caller must pass to [`Self::step`].
    pub fn fly_to(&mut self, destination: PrimaryDestination) -> Result<u64, AnimationError> {
        if !is_valid_coordinate(destination.lat, destination.lng) {
            warn!(
                "Dropping camera target — name={} lat={} lng={}",
                destination.name, destination.lat, destination.lng
            );
            return Err(AnimationError::InvalidTarget {
                lat: destination.lat,
                lng: destination.lng,
            });
        }

        if self.state != AnimationState::Idle {
            info!(
                "Cancelling camera run — generation={} state={:?} next={}",
                self.generation, self.state, destination.name
            );
        }

        let zoom = self.camera.zoom();
        let clamped = self.config.clamp_zoom(zoom);
        if clamped != zoom {
            self.camera.set_zoom(clamped);
        }

        self.generation += 1;
        self.state = AnimationState::ZoomingOut;
        self.planned = Some(self.plan(clamped, &destination));
        self.target = Some(destination);
        debug!(
            "Camera run started — generation={} from_zoom={}",
            self.generation, clamped
        );
        Ok(self.generation)
    }

    /// Abandons any run in flight; pending ticks become no-ops.
    pub fn cancel(&mut self) {
        if self.state != AnimationState::Idle {
            info!("Camera run cancelled — generation={}", self.generation);
        }
        self.generation += 1;
        self.state = AnimationState::Idle;
    }

    /// Advances the run of `generation` by one tick.
    pub fn step(&mut self, generation: u64) -> Step {
        if generation != self.generation {
            debug!(
                "Stale camera tick ignored — tick_generation={} current={}",
                generation, self.generation
            );
            return Step::Stale;
        }

        let tick = self.config.tick_interval();
        match self.state {
            AnimationState::Idle => Step::Finished,
            AnimationState::ZoomingOut => {
                let zoom = self.camera.zoom();
                if zoom > self.config.wide_zoom {
                    self.camera.set_zoom(zoom - 1);
                }
                if self.camera.zoom() <= self.config.wide_zoom {
                    self.state = AnimationState::Panning;
                }
                Step::Continue(tick)
            }
            AnimationState::Panning => {
                let Some(target) = &self.target else {
                    self.state = AnimationState::Idle;
                    return Step::Finished;
                };
                self.camera.pan_to(target.lat, target.lng);
                self.state = AnimationState::ZoomingIn;
                Step::Continue(self.config.settle_delay())
            }
            AnimationState::ZoomingIn => {
                let zoom = self.camera.zoom();
                if zoom < self.config.close_zoom {
                    self.camera.set_zoom(zoom + 1);
                }
                if self.camera.zoom() >= self.config.close_zoom {
                    self.state = AnimationState::Idle;
                    debug!("Camera run finished — generation={}", self.generation);
                    Step::Finished
                } else {
                    Step::Continue(tick)
                }
            }
        }
    }

    /// The zoom levels a run starting at `from_zoom` will apply, without
    /// touching the camera.
    pub fn plan(&self, from_zoom: u8, destination: &PrimaryDestination) -> CameraTarget {
        let mut zoom = self.config.clamp_zoom(from_zoom);
        let mut zoom_sequence = Vec::new();
        while zoom > self.config.wide_zoom {
            zoom -= 1;
            zoom_sequence.push(zoom);
        }
        while zoom < self.config.close_zoom {
            zoom += 1;
            zoom_sequence.push(zoom);
        }
        CameraTarget {
            lat: destination.lat,
            lng: destination.lng,
            zoom_sequence,
        }
    }
}
