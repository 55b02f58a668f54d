//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming submission:
//!     → cors.rs (per-form origin policy, headers for every response)
//!     → rate_limit.rs (per form + client sliding window)
//!     → [payload normalization in http::payload]
//!     → spam.rs (honeypot verdict, strip control fields)
//! ```
//!
//! # Design Decisions
//! - Spam is flagged and stored, never silently dropped
//! - Rate limiting is best-effort and process-local
//! - No trust in client input

pub mod cors;
pub mod rate_limit;
pub mod spam;

pub use cors::resolve_cors_headers;
pub use rate_limit::RateLimiter;
pub use spam::{classify, Classified};
