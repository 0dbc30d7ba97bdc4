//! Outbound fetching of caller-referenced websites.
//!
//! # Data Flow
//! ```text
//! caller-supplied website string
//!     → url_guard.rs (scheme, credentials, deny list, IP literal, DNS + address policy)
//!     → SanitizedUrl (normalized URL + the addresses it resolved to)
//!     → fetcher.rs (GET pinned to those addresses, no redirects, timeout, byte cap)
//!     → page.rs (meta description + visible text for the prompt)
//! ```
//!
//! # Design Decisions
//! - Validation resolves DNS itself and the fetch connects only to the
//!   validated addresses, so a low-TTL record cannot swap in an internal
//!   address between check and use
//! - Redirects are refused, not re-validated
//! - DNS failure is a rejection
//! - Every failure is a value; callers degrade, never abort

pub mod fetcher;
pub mod page;
pub mod url_guard;

pub use fetcher::{FetchError, FetchResult, SafeFetcher};
pub use page::PageSummary;
pub use url_guard::{
    is_disallowed_ip, Resolver, SanitizedUrl, StaticResolver, SystemResolver, UrlGuard,
    UrlRejection, UrlValidationResult,
};
