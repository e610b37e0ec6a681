//! Web API module for stowage.
//!
//! This module exposes upload, download, and listing of stored files over
//! HTTP, plus a health check.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
