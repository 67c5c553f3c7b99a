//! The first `init_usage_monitor` call installs the process-wide monitor.

use std::error::Error;
use std::sync::Arc;
use tundra_facade::{MonitorConfig, init_usage_monitor, usage_monitor};

#[test]
fn first_init_wins_and_applies_auto_start() -> Result<(), Box<dyn Error>> {
    let mut config = MonitorConfig::default();
    config.monitor.auto_start = true;
    let config = config.validate_and_normalize()?;

    let installed = init_usage_monitor(&config)?;
    assert!(installed.is_started());
    assert!(Arc::ptr_eq(&installed, &usage_monitor()));

    let second = init_usage_monitor(&config).err();
    assert_eq!(
        second.as_ref().map(|error| error.code.to_string()),
        Some("config:already_initialized".to_owned())
    );
    assert!(Arc::ptr_eq(&installed, &usage_monitor()));
    Ok(())
}
