//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (already loaded) → Metrics → Repository + server → Listener → Watcher
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Save snapshot → Drain tasks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Listener binds last, after the repository is restored
//! - Shutdown has a grace period; stragglers are logged, not awaited

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
