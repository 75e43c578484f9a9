//! Lectern digital library server
//!
//! A REST JSON API for a lending library of digital books: users request,
//! borrow, and purchase books; librarians curate the catalog and
//! adjudicate borrow requests.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
