//! ABP Filter List Compiler
//!
//! This crate parses Adblock Plus filter lists into `abp-core` rule sets.

pub mod loader;
pub mod parser;

pub use loader::{compile, load, LoadStats};
pub use parser::{parse_domains, parse_line, parse_options};
