//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, reload, shutdown)
//!     → request.rs (request ID, client address)
//!     → submit.rs (collect headers and body into an intake request)
//!     → payload.rs (decode body into fields)
//!     → response.rs (negotiate redirect, HTML or JSON; attach CORS)
//!     → Send to client
//! ```

pub mod payload;
pub mod request;
pub mod response;
pub mod server;
pub mod submit;

pub use request::{client_address, MakeRequestUuidV4, X_REQUEST_ID};
pub use response::{negotiate, ResponseDescriptor, ResponseKind};
pub use server::{AppState, HttpServer};
