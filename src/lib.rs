// Library crate exposing modules for the binary and integration tests

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod repository;
pub mod runner;
pub mod util;

pub use error::{Error, Result};
