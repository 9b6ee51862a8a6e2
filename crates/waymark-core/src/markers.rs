use crate::place::ResolvedPlace;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Places currently on the map, keyed by exact name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerSet {
    places: BTreeMap<String, ResolvedPlace>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.places.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedPlace> {
        self.places.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedPlace> {
        self.places.values()
    }

    pub fn to_vec(&self) -> Vec<ResolvedPlace> {
        self.places.values().cloned().collect()
    }
}

impl FromIterator<ResolvedPlace> for MarkerSet {
    /// First occurrence of a name wins.
    fn from_iter<I: IntoIterator<Item = ResolvedPlace>>(iter: I) -> Self {
        let mut places = BTreeMap::new();
        for place in iter {
            places.entry(place.name.clone()).or_insert(place);
        }
        Self { places }
    }
}

/// Full-replace reconciliation: the result is exactly `resolved`, deduplicated
/// by name. Nothing from `previous` survives unless it was resolved again.
pub fn reconcile(previous: &MarkerSet, resolved: Vec<ResolvedPlace>) -> MarkerSet {
    let next: MarkerSet = resolved.into_iter().collect();
    debug!(
        "Reconciled markers — previous={} next={}",
        previous.len(),
        next.len()
    );
    next
}

/// Overlay changes for the map widget. Detach `removed` before attaching
/// `added`; a marker whose coordinates moved appears in both.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerDelta {
    pub removed: Vec<ResolvedPlace>,
    pub added: Vec<ResolvedPlace>,
}

impl MarkerDelta {
    pub fn between(previous: &MarkerSet, next: &MarkerSet) -> Self {
        let removed = previous
            .iter()
            .filter(|old| !matches!(next.get(&old.name), Some(new) if new.same_position(old)))
            .cloned()
            .collect();
        let added = next
            .iter()
            .filter(|new| !matches!(previous.get(&new.name), Some(old) if old.same_position(new)))
            .cloned()
            .collect();
        Self { removed, added }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Sole owner of the displayed [`MarkerSet`].
#[derive(Debug, Default)]
pub struct MarkerSetManager {
    current: MarkerSet,
}

impl MarkerSetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &MarkerSet {
        &self.current
    }

    /// Replaces the displayed set with `resolved` and reports what changed.
    pub fn apply(&mut self, resolved: Vec<ResolvedPlace>) -> MarkerDelta {
        let next = reconcile(&self.current, resolved);
        let delta = MarkerDelta::between(&self.current, &next);
        self.current = next;
        delta
    }

    pub fn clear(&mut self) -> MarkerDelta {
        self.apply(Vec::new())
    }
}
