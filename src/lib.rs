pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod http;
pub mod model;

pub use error::{Error, Result};
