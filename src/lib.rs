// src/lib.rs
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod models;
pub mod valuator;

pub use error::{JobError, Result};
