//! Log filter behaviour with a real global subscriber.
//!
//! Kept in its own test binary: the subscriber is process-wide.

use fastpaze::config::EngineConfig;
use fastpaze::observability::{logging, LogLevel};
use fastpaze::Engine;

#[test]
fn test_startup_filter_survives_engine_construction() {
    assert!(logging::init(LogLevel::Warn));
    let installed = logging::active_filter().expect("filter handle installed");

    // building from config records the level but leaves the installed filter alone
    let mut config = EngineConfig::default();
    config.observability.log_level = "debug".to_string();
    let engine = Engine::from_config(&config);
    assert_eq!(engine.log_level(), LogLevel::Debug);
    assert_eq!(logging::active_filter().as_deref(), Some(installed.as_str()));

    // an explicit runtime change does reload the filter
    assert_eq!(engine.set_log_level("error"), Ok(LogLevel::Error));
    let reloaded = logging::active_filter().expect("filter handle installed");
    assert!(reloaded.starts_with("error") || reloaded.contains(",error"));
    assert_ne!(reloaded, installed);
}
