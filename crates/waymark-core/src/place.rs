use serde::{Deserialize, Serialize};

/// A candidate name that the geocoder mapped to coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl ResolvedPlace {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
        }
    }

    pub fn same_position(&self, other: &ResolvedPlace) -> bool {
        self.lat == other.lat && self.lng == other.lng
    }
}

/// The single place the camera focuses on. Replaced, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryDestination {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<ResolvedPlace> for PrimaryDestination {
    fn from(place: ResolvedPlace) -> Self {
        Self {
            name: place.name,
            lat: place.lat,
            lng: place.lng,
        }
    }
}

pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(is_valid_coordinate(28.5383, -81.3792));
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
        assert!(!is_valid_coordinate(0.0, f64::INFINITY));
        assert!(!is_valid_coordinate(91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, -180.5));
    }

    #[test]
    fn test_destination_from_place() {
        let d = PrimaryDestination::from(ResolvedPlace::new("Orlando", 28.5, -81.4));
        assert_eq!(d.name, "Orlando");
        assert_eq!((d.lat, d.lng), (28.5, -81.4));
    }
}
