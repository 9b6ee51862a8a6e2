use crate::geocode::ResolutionFailure;
use crate::place::ResolvedPlace;
use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

type CacheKey = (String, Option<String>);

struct CachedResolution {
    result: Result<ResolvedPlace, ResolutionFailure>,
    stored_at: Instant,
}

/// Short-lived memo of geocoding answers keyed by `(name, context)`.
///
/// Only answers that would come back the same on a retry are stored: hits and
/// definitive misses. Transport errors are never cached.
pub struct GeocodeCache {
    entries: LruCache<CacheKey, CachedResolution>,
    ttl: Duration,
}

impl GeocodeCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    pub fn get(
        &mut self,
        name: &str,
        context: Option<&str>,
    ) -> Option<Result<ResolvedPlace, ResolutionFailure>> {
        self.get_at(name, context, Instant::now())
    }

    fn get_at(
        &mut self,
        name: &str,
        context: Option<&str>,
        now: Instant,
    ) -> Option<Result<ResolvedPlace, ResolutionFailure>> {
        let key = (name.to_string(), context.map(str::to_string));
        let expired = match self.entries.get(&key) {
            Some(entry) => now.saturating_duration_since(entry.stored_at) >= self.ttl,
            None => return None,
        };
        if expired {
            debug!("Geocode cache entry expired — name={} context={:?}", name, context);
            self.entries.pop(&key);
            return None;
        }
        self.entries.get(&key).map(|entry| entry.result.clone())
    }

    /// Stores `result` if it is worth remembering. Returns whether it was stored.
    pub fn insert(
        &mut self,
        name: &str,
        context: Option<&str>,
        result: &Result<ResolvedPlace, ResolutionFailure>,
    ) -> bool {
        let cacheable = match result {
            Ok(_) => true,
            Err(failure) => failure.is_definitive(),
        };
        if cacheable {
            self.entries.put(
                (name.to_string(), context.map(str::to_string)),
                CachedResolution {
                    result: result.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        cacheable
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
