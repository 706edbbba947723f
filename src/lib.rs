// Library crate exposing modules for integration tests

pub mod config;
pub mod error;
pub mod lookup;
pub mod model;
pub mod repository;
pub mod sync;

pub use error::{Error, Result};
