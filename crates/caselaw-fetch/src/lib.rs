//! PoW-gated, rate-limited HTTP fetching for Incapsula/Eurospider-protected
//! Swiss court portals (spec.md §4.1).

pub mod client;
pub mod cookies;
pub mod error;
pub mod pow;

pub use client::{AsupersyncTransport, FetchClient, RawResponse, Transport};
pub use cookies::{is_challenge_page, CookieCache, CookieHarvester, COOKIE_MAX_AGE_SECONDS};
pub use error::{HttpError, Result};
pub use pow::{mine, mine_with_fingerprint, PowResult};
