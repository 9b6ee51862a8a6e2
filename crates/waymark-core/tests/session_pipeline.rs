use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use waymark_core::{
    AnimationConfig, AnimationState, BatchOutcome, GeocodeResponse, Geocoder, MapSession,
    RecordingCamera, ResolutionFailure, Settings,
};
use waymark_extract::{EntityExtractor, ExtractorConfig};

const PARIS_DAY: &str = r#"# Paris – June 2 → June 4

## Trip Snapshot

| Time | Activity | Notes |
|------|----------|-------|
| 09:00 | Coffee @ **Cafe de Flore** | Classic terrace |
| 11:00 | **Louvre Museum** | Book ahead |

Evening stroll past Notre Dame Cathedral.
"#;

/// Fake geocoder that records every query it sees.
struct Gazetteer {
    places: HashMap<&'static str, (f64, f64)>,
    queries: Mutex<Vec<String>>,
}

impl Gazetteer {
    fn new() -> Self {
        Self {
            places: HashMap::from([
                ("Paris", (48.8566, 2.3522)),
                ("Cafe de Flore, Paris", (48.8541, 2.3326)),
                ("Louvre Museum, Paris", (48.8606, 2.3376)),
                ("Notre Dame Cathedral, Paris", (48.8530, 2.3499)),
            ]),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Geocoder for Gazetteer {
    async fn geocode(&self, query: &str) -> Result<GeocodeResponse, ResolutionFailure> {
        self.queries.lock().unwrap().push(query.to_string());
        let json = match self.places.get(query) {
            Some((lat, lng)) => serde_json::json!({
                "status": "OK",
                "results": [{ "geometry": { "location": { "lat": lat, "lng": lng } } }]
            }),
            None => serde_json::json!({ "status": "ZERO_RESULTS", "results": [] }),
        };
        serde_json::from_value(json).map_err(|e| ResolutionFailure::Decode(e.to_string()))
    }
}

fn extractor(dir: &tempfile::TempDir) -> EntityExtractor {
    EntityExtractor::with_config(ExtractorConfig::default(), dir.path().join("extractor.json"))
}

#[tokio::test(start_paused = true)]
async fn itinerary_to_markers_and_camera() {
    let _ = simplelog::TestLogger::init(log::LevelFilter::Debug, simplelog::Config::default());
    let dir = tempfile::tempdir().unwrap();
    let gazetteer = std::sync::Arc::new(Gazetteer::new());

    let mut session = MapSession::new(
        Settings::default(),
        gazetteer.clone(),
        RecordingCamera::default(),
    )
    .with_extractor(extractor(&dir));
    session.init().unwrap();

    let outcome = session.ingest(PARIS_DAY).await;
    let BatchOutcome::Applied { markers, .. } = outcome else {
        panic!("expected the batch to apply");
    };
    let mut names: Vec<String> = markers.iter().map(|p| p.name.clone()).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["Cafe de Flore", "Louvre Museum", "Notre Dame Cathedral"]
    );

    // Every candidate is qualified with the heading destination
    let queries = gazetteer.queries.lock().unwrap().clone();
    assert!(queries.contains(&"Paris".to_string()));
    assert!(queries
        .iter()
        .filter(|q| q.as_str() != "Paris")
        .all(|q| q.ends_with(", Paris")));

    let driver = session.driver().unwrap();
    driver.finished().await;
    assert_eq!(driver.state(), AnimationState::Idle);
    let close = AnimationConfig::default().close_zoom;
    driver.with_camera(|cam| {
        assert_eq!(cam.pans(), vec![(48.8566, 2.3522)]);
        assert_eq!(cam.state.zoom, close);
    });

    session.dispose();
    assert!(session.markers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn retargeting_mid_flight_ends_on_latest() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = MapSession::new(
        Settings::default(),
        std::sync::Arc::new(Gazetteer::new()),
        RecordingCamera::default(),
    )
    .with_extractor(extractor(&dir));
    session.init().unwrap();

    session.ingest(PARIS_DAY).await;
    tokio::time::sleep(Duration::from_millis(1200)).await;
    session.set_destination("Louvre Museum, Paris").await;

    let driver = session.driver().unwrap();
    driver.finished().await;
    driver.with_camera(|cam| {
        assert_eq!(cam.pans().last(), Some(&(48.8606, 2.3376)));
        assert_eq!(cam.state.zoom, AnimationConfig::default().close_zoom);
    });
}
