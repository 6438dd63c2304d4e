#[allow(clippy::module_inception)]
mod config;

pub use config::{CacheSettings, ReputationSettings, RpcSettings, ScannerSettings, Settings};
