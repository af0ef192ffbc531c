//! Configuration module for Sonar-Sweep
//!
//! This module handles loading, parsing, and validating JSON configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sonar_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.json")).unwrap();
//! println!("Store at {}", config.redis_url());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Backend, Config, DEFAULT_API_BASE, DEFAULT_MAX_WORKERS, DEFAULT_NAMESPACE};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
