#![doc = include_str!("../README.md")]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod tools;

pub use api::*;
pub use config::FetchConfig;
pub use error::{FetchError, Result};
pub use tools::fetch::{FetchReport, FetchResult, Fetcher};
