//! FormForge: a forms backend-as-a-service submission intake.

pub mod admin;
pub mod config;
pub mod http;
pub mod intake;
pub mod lifecycle;
pub mod notifier;
pub mod observability;
pub mod security;
pub mod storage;

pub use config::schema::FormforgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
