// src/lib.rs

//! Library desk: catalog, roster, issue/return and CSV interchange.

pub mod cache;
pub mod clock;
pub mod error;
pub mod interchange;
pub mod models;
pub mod query;
pub mod services;
pub mod session;
pub mod storage;
pub mod utils;

pub use error::{AppError, Result};
pub use models::Config;
