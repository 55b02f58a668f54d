//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FormforgeConfig (validated, immutable)
//!     → shared via ArcSwap to handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server applies rate limit + seeded forms, swaps the Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, FormConfig, FormforgeConfig, ListenerConfig, NotificationConfig,
    ObservabilityConfig, RateLimitConfig, SecurityConfig, SmtpConfig, StorageConfig,
    TimeoutConfig,
};
