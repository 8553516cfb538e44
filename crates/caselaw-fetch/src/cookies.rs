//! JS-challenge cookie harvesting + disk cache (spec.md §4.1).
//!
//! Grounded on `examples/original_source/incapsula_bypass.py`'s
//! `IncapsulaCookieManager` (disk cache with TTL, `is_incapsula_blocked`) and
//! `harvest_cookies` (multi-strategy browser automation dispatcher). Real
//! browser automation is out of scope for a Rust core (spec.md §4.1 calls
//! this out as a pluggable "harvester" collaborator); `CookieHarvester` is
//! the trait seam a host binary plugs a headless-browser driver into.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{HttpError, Result};

/// Challenge-page markers, per `is_incapsula_blocked`: a body under 500
/// bytes containing any of these is treated as an unsolved JS challenge,
/// not real content.
const CHALLENGE_MARKERS: &[&str] = &["_Incapsula_Resource", "Incapsula", "robots"];

/// Cookies are valid for roughly 20-30 minutes in practice; cached
/// conservatively for 15 (`COOKIE_MAX_AGE_SECONDS`).
pub const COOKIE_MAX_AGE_SECONDS: u64 = 900;

/// True if `body` looks like an unsolved WAF challenge rather than real
/// page content.
#[must_use]
pub fn is_challenge_page(body: &str) -> bool {
    body.len() < 500 && CHALLENGE_MARKERS.iter().any(|m| body.contains(m))
}

/// Abstraction over whatever browser-automation strategy a deployment wires
/// in (camoufox / playwright-stealth / plain playwright, tried strongest
/// first in the original, per `harvest_cookies`). This crate ships no
/// concrete implementation — only the contract and the disk-backed cache.
pub trait CookieHarvester {
    /// Solve the JS challenge at `seed_url` and return the resulting cookie
    /// jar, e.g. `visid_incap_*` / `incap_ses_*` / `nlbi_*` session cookies.
    fn harvest(&self, seed_url: &str) -> Result<HashMap<String, String>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedCookies {
    domain: String,
    timestamp: u64,
    cookies: HashMap<String, String>,
}

/// Per-domain disk-backed cookie cache with in-memory front, grounded on
/// `IncapsulaCookieManager`.
pub struct CookieCache {
    cache_dir: PathBuf,
    max_age_secs: u64,
    memory: HashMap<String, (u64, HashMap<String, String>)>,
}

impl CookieCache {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, max_age_secs: u64) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_age_secs,
            memory: HashMap::new(),
        }
    }

    fn cache_path(&self, domain: &str) -> PathBuf {
        let safe_domain = domain.replace('.', "_");
        self.cache_dir.join(format!("incapsula_{safe_domain}.json"))
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Return cookies if cached and still within `max_age_secs`, checking
    /// the in-memory front first, then disk.
    fn load_fresh(&mut self, domain: &str) -> Option<HashMap<String, String>> {
        let now = Self::now_secs();
        if let Some((ts, cookies)) = self.memory.get(domain) {
            if now.saturating_sub(*ts) < self.max_age_secs {
                return Some(cookies.clone());
            }
        }

        let path = self.cache_path(domain);
        let bytes = std::fs::read(&path).ok()?;
        let cached: CachedCookies = serde_json::from_slice(&bytes).ok()?;
        if now.saturating_sub(cached.timestamp) >= self.max_age_secs {
            return None;
        }
        self.memory
            .insert(domain.to_string(), (cached.timestamp, cached.cookies.clone()));
        Some(cached.cookies)
    }

    fn store(&mut self, domain: &str, cookies: HashMap<String, String>) -> std::io::Result<()> {
        let timestamp = Self::now_secs();
        let record = CachedCookies {
            domain: domain.to_string(),
            timestamp,
            cookies: cookies.clone(),
        };
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::write(self.cache_path(domain), serde_json::to_vec_pretty(&record)?)?;
        self.memory.insert(domain.to_string(), (timestamp, cookies));
        Ok(())
    }

    /// Cached cookies if fresh, otherwise a freshly-harvested set (also
    /// cached). Mirrors `IncapsulaCookieManager.get_cookies`.
    pub fn get_cookies(
        &mut self,
        domain: &str,
        seed_url: &str,
        harvester: &dyn CookieHarvester,
    ) -> Result<HashMap<String, String>> {
        if let Some(cookies) = self.load_fresh(domain) {
            return Ok(cookies);
        }
        self.refresh_cookies(domain, seed_url, harvester)
    }

    /// Unconditionally re-harvest and re-cache, per `refresh_cookies`.
    pub fn refresh_cookies(
        &mut self,
        domain: &str,
        seed_url: &str,
        harvester: &dyn CookieHarvester,
    ) -> Result<HashMap<String, String>> {
        let cookies = harvester.harvest(seed_url)?;
        self.store(domain, cookies.clone())
            .map_err(HttpError::Io)?;
        Ok(cookies)
    }
}

#[must_use]
pub fn cache_file_name(domain: &str) -> String {
    format!("incapsula_{}.json", domain.replace('.', "_"))
}

pub fn cache_path_for(dir: &Path, domain: &str) -> PathBuf {
    dir.join(cache_file_name(domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubHarvester {
        cookies: HashMap<String, String>,
    }

    impl CookieHarvester for StubHarvester {
        fn harvest(&self, _seed_url: &str) -> Result<HashMap<String, String>> {
            Ok(self.cookies.clone())
        }
    }

    #[test]
    fn short_body_with_incapsula_marker_is_a_challenge() {
        assert!(is_challenge_page("_Incapsula_Resource stub page"));
        assert!(is_challenge_page("robots disallowed"));
    }

    #[test]
    fn long_body_is_never_treated_as_a_challenge() {
        let body = "a".repeat(600);
        assert!(!is_challenge_page(&body));
    }

    #[test]
    fn short_body_without_markers_is_not_a_challenge() {
        assert!(!is_challenge_page("ok"));
    }

    #[test]
    fn get_cookies_harvests_once_then_serves_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CookieCache::new(dir.path(), COOKIE_MAX_AGE_SECONDS);
        let mut jar = HashMap::new();
        jar.insert("visid_incap_123".to_string(), "abc".to_string());
        let harvester = StubHarvester { cookies: jar.clone() };

        let first = cache
            .get_cookies("www.bger.ch", "https://www.bger.ch/seed", &harvester)
            .unwrap();
        assert_eq!(first, jar);
        assert!(cache_path_for(dir.path(), "www.bger.ch").exists());

        let second = cache
            .get_cookies("www.bger.ch", "https://www.bger.ch/seed", &harvester)
            .unwrap();
        assert_eq!(second, jar);
    }

    #[test]
    fn refresh_cookies_overwrites_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CookieCache::new(dir.path(), COOKIE_MAX_AGE_SECONDS);
        let mut first_jar = HashMap::new();
        first_jar.insert("incap_ses_1".to_string(), "old".to_string());
        cache
            .get_cookies("search.bger.ch", "seed", &StubHarvester { cookies: first_jar })
            .unwrap();

        let mut new_jar = HashMap::new();
        new_jar.insert("incap_ses_1".to_string(), "new".to_string());
        let refreshed = cache
            .refresh_cookies("search.bger.ch", "seed", &StubHarvester { cookies: new_jar.clone() })
            .unwrap();
        assert_eq!(refreshed, new_jar);
    }
}
