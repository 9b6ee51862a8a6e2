use crate::cache::GeocodeCache;
use crate::camera::{Camera, CameraTarget};
use crate::driver::AnimationDriver;
use crate::geocode::{Geocoder, GoogleGeocoder, LocationResolver};
use crate::markers::{MarkerDelta, MarkerSet, MarkerSetManager};
use crate::place::PrimaryDestination;
use crate::settings::Settings;
use crate::WaymarkError;
use log::{info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use waymark_extract::{parse_heading, EntityExtractor, ExtractorConfig};

/// What happened to one ingested block of itinerary text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BatchOutcome {
    Applied {
        sequence: u64,
        delta: MarkerDelta,
        markers: MarkerSet,
    },
    /// A newer block started while this one was resolving; its result was dropped.
    Superseded { sequence: u64 },
}

impl BatchOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            BatchOutcome::Applied { sequence, .. } | BatchOutcome::Superseded { sequence } => {
                *sequence
            }
        }
    }
}

/// Text in, markers and camera movement out.
///
/// Only the most recently started batch may commit markers or retarget the
/// camera.
pub struct MapSession<C: Camera + 'static> {
    settings: Settings,
    extractor: EntityExtractor,
    resolver: LocationResolver,
    markers: Mutex<MarkerSetManager>,
    destination: Mutex<Option<PrimaryDestination>>,
    sequence: AtomicU64,
    camera: Option<C>,
    driver: Option<AnimationDriver<C>>,
    disposed: bool,
}

impl<C: Camera + 'static> MapSession<C> {
    /// Starts with the shipped extractor defaults; nothing is read from disk.
    /// Use [`Self::with_extractor`] for a user-configured one.
    pub fn new(settings: Settings, geocoder: Arc<dyn Geocoder>, camera: C) -> Self {
        let cache = GeocodeCache::new(settings.cache_capacity, settings.cache_ttl());
        Self {
            extractor: EntityExtractor::with_config(
                ExtractorConfig::default(),
                crate::get_config_root().join("extractor.json"),
            ),
            resolver: LocationResolver::new(geocoder, cache),
            markers: Mutex::new(MarkerSetManager::new()),
            destination: Mutex::new(None),
            sequence: AtomicU64::new(0),
            camera: Some(camera),
            driver: None,
            disposed: false,
            settings,
        }
    }

    /// Session backed by the HTTP geocoder described in `settings`.
    pub fn from_settings(
        settings: Settings,
        api_key: Option<&str>,
        camera: C,
    ) -> Result<Self, WaymarkError> {
        settings.validate()?;
        let key = settings.api_key(api_key).ok_or(WaymarkError::MissingApiKey)?;
        let geocoder =
            GoogleGeocoder::new(&settings.endpoint, &key, settings.request_timeout())?;
        Ok(Self::new(settings, Arc::new(geocoder), camera))
    }

    pub fn with_extractor(mut self, extractor: EntityExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    /// Starts the camera driver on the current tokio runtime. Until then the
    /// destination is tracked but the camera does not move. Fails on
    /// inconsistent animation settings.
    pub fn init(&mut self) -> Result<(), WaymarkError> {
        if self.disposed {
            return Err(WaymarkError::Disposed);
        }
        if self.driver.is_some() {
            return Ok(());
        }
        self.settings.animation.validate()?;
        let runtime = Handle::try_current().map_err(|_| WaymarkError::NoRuntime)?;
        let Some(camera) = self.camera.take() else {
            return Err(WaymarkError::Disposed);
        };
        let config = self.settings.animation.clone();
        info!("Map session ready — close_zoom={}", config.close_zoom);
        self.driver = Some(AnimationDriver::new(camera, config, runtime));
        Ok(())
    }

    /// Stops the camera and clears the overlay. Later batches are ignored.
    pub fn dispose(&mut self) -> MarkerDelta {
        self.disposed = true;
        // Anything still resolving is now stale
        self.sequence.fetch_add(1, Ordering::SeqCst);
        if let Some(driver) = self.driver.take() {
            driver.dispose();
        }
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == sequence
    }

    pub async fn ingest(&self, text: &str) -> BatchOutcome {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        if self.disposed {
            return BatchOutcome::Superseded { sequence };
        }

        let names = self.extractor.extract(text);
        let heading = parse_heading(text);

        if let Some(heading) = &heading {
            let already_there = self
                .destination()
                .is_some_and(|d| d.name == *heading);
            if !already_there {
                if let Some(place) = self.resolver.resolve(heading, None).await {
                    if self.is_current(sequence) {
                        self.retarget(place.into());
                    }
                }
            }
        }

        let context = heading.or_else(|| self.destination().map(|d| d.name));
        let resolved = self.resolver.resolve_all(&names, context.as_deref()).await;

        if !self.is_current(sequence) {
            info!(
                "Discarding superseded batch — sequence={} resolved={}",
                sequence,
                resolved.len()
            );
            return BatchOutcome::Superseded { sequence };
        }

        let mut manager = self.markers.lock().unwrap_or_else(PoisonError::into_inner);
        let delta = manager.apply(resolved);
        info!(
            "Markers updated — sequence={} total={} added={} removed={}",
            sequence,
            manager.current().len(),
            delta.added.len(),
            delta.removed.len()
        );
        BatchOutcome::Applied {
            sequence,
            delta,
            markers: manager.current().clone(),
        }
    }

    /// Resolves `name` without context and, on success, makes it the primary
    /// destination. On failure nothing changes.
    pub async fn set_destination(&self, name: &str) -> Option<PrimaryDestination> {
        if self.disposed {
            return None;
        }
        let place = self.resolver.resolve(name, None).await?;
        let destination = PrimaryDestination::from(place);
        self.retarget(destination.clone());
        Some(destination)
    }

    fn retarget(&self, destination: PrimaryDestination) {
        *self
            .destination
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(destination.clone());
        if let Some(driver) = &self.driver {
            if let Err(e) = driver.fly_to(destination) {
                warn!("Camera not moved — error={}", e);
            }
        }
    }

    pub fn markers(&self) -> MarkerSet {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current()
            .clone()
    }

    pub fn destination(&self) -> Option<PrimaryDestination> {
        self.destination
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn camera_target(&self) -> Option<CameraTarget> {
        self.driver.as_ref().and_then(AnimationDriver::planned_target)
    }

    pub fn driver(&self) -> Option<&AnimationDriver<C>> {
        self.driver.as_ref()
    }

    pub fn clear_cache(&self) {
        self.resolver.clear_cache();
    }
}

impl<C: Camera + 'static> Drop for MapSession<C> {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose();
        }
    }
}
