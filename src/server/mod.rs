//! HTTP surface of the startup ideas service.
//!
//! # Endpoints
//!
//! - `GET  /`               — Welcome message
//! - `GET  /health`         — Liveness probe
//! - `POST /generate-ideas` — Run the idea generation crew
//! - `POST /validate-idea`  — Run the idea validation crew

pub mod error;
pub mod models;
pub mod routes;

pub use error::ApiError;
pub use routes::{app_router, AppState};
