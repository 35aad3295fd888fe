//! walletscout: find the X/Twitter owner of wallet addresses listed in a
//! Google Sheet, using an AI search oracle, with resumable progress.

pub mod apis;
pub mod arguments;
pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod logger;
pub mod lookup;
pub mod paths;
pub mod retry;
pub mod run;
pub mod scheduler;
pub mod sheet;
pub mod throttle;

#[cfg(test)]
mod testing;
