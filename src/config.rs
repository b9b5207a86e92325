//! Runtime configuration read from environment variables.
//!
//! - `STRIPVIEW_CACHE_ENTRIES`: LRU bound for the resize cache (unset or 0 = unbounded)
//! - `STRIPVIEW_FALLBACK_WIDTH`: width used before the viewport has been allocated
//! - `STRIPVIEW_DECODE_WORKERS`: background decode threads (1-4)

use std::num::NonZeroUsize;

use tracing::warn;

/// Width used when the toolkit reports a zero-width viewport.
pub const DEFAULT_FALLBACK_WIDTH: u32 = 800;

/// Default number of background decode workers.
pub const DEFAULT_DECODE_WORKERS: usize = 2;

/// Maximum number of background decode workers.
pub const MAX_DECODE_WORKERS: usize = 4;

const ENV_CACHE_ENTRIES: &str = "STRIPVIEW_CACHE_ENTRIES";
const ENV_FALLBACK_WIDTH: &str = "STRIPVIEW_FALLBACK_WIDTH";
const ENV_DECODE_WORKERS: &str = "STRIPVIEW_DECODE_WORKERS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Resize cache capacity in entries. `None` keeps every entry for the session.
    pub cache_capacity: Option<NonZeroUsize>,
    pub fallback_width: u32,
    pub decode_workers: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: None,
            fallback_width: DEFAULT_FALLBACK_WIDTH,
            decode_workers: DEFAULT_DECODE_WORKERS,
        }
    }
}

impl ReaderConfig {
    /// Build a config from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache_capacity = match parse_var::<usize>(&lookup, ENV_CACHE_ENTRIES) {
            Some(n) => NonZeroUsize::new(n),
            None => defaults.cache_capacity,
        };

        let fallback_width = parse_var::<u32>(&lookup, ENV_FALLBACK_WIDTH)
            .filter(|w| *w > 0)
            .unwrap_or(defaults.fallback_width);

        let decode_workers = parse_var::<usize>(&lookup, ENV_DECODE_WORKERS)
            .map(|n| n.clamp(1, MAX_DECODE_WORKERS))
            .unwrap_or(defaults.decode_workers);

        Self {
            cache_capacity,
            fallback_width,
            decode_workers,
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = NonZeroUsize::new(capacity);
        self
    }

    pub fn with_fallback_width(mut self, width: u32) -> Self {
        self.fallback_width = width.max(1);
        self
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ReaderConfig::from_lookup(|_| None);
        assert_eq!(config, ReaderConfig::default());
        assert!(config.cache_capacity.is_none());
        assert_eq!(config.fallback_width, 800);
    }

    #[test]
    fn test_parses_values() {
        let config = ReaderConfig::from_lookup(lookup_from(&[
            (ENV_CACHE_ENTRIES, "64"),
            (ENV_FALLBACK_WIDTH, "1024"),
            (ENV_DECODE_WORKERS, "3"),
        ]));
        assert_eq!(config.cache_capacity, NonZeroUsize::new(64));
        assert_eq!(config.fallback_width, 1024);
        assert_eq!(config.decode_workers, 3);
    }

    #[test]
    fn test_invalid_and_out_of_range_values() {
        let config = ReaderConfig::from_lookup(lookup_from(&[
            (ENV_CACHE_ENTRIES, "lots"),
            (ENV_FALLBACK_WIDTH, "0"),
            (ENV_DECODE_WORKERS, "32"),
        ]));
        assert!(config.cache_capacity.is_none());
        assert_eq!(config.fallback_width, DEFAULT_FALLBACK_WIDTH);
        assert_eq!(config.decode_workers, MAX_DECODE_WORKERS);
    }

    #[test]
    fn test_zero_capacity_means_unbounded() {
        let config = ReaderConfig::from_lookup(lookup_from(&[(ENV_CACHE_ENTRIES, "0")]));
        assert!(config.cache_capacity.is_none());
    }
}
