//! HTTP clients for external services
//!
//! - `client`: shared reqwest wrapper
//! - `xai`: the search oracle (xAI chat completions with live X search)
//! - `sheets`: Google Sheets v4 values API

pub mod client;
pub mod sheets;
pub mod xai;

pub use client::HttpClient;
pub use sheets::SheetsClient;
pub use xai::XaiOracle;
