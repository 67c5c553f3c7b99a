//! The demo workload against a standalone monitor.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tundra_facade::{DemoOptions, MonitorConfig, build_usage_monitor, run_demo};

fn monitor() -> Result<Arc<tundra_facade::UsageMonitor>, Box<dyn Error>> {
    let config = MonitorConfig::default().validate_and_normalize()?;
    Ok(Arc::new(build_usage_monitor(&config)?))
}

#[test]
fn report_shows_every_worker_at_full_depth() -> Result<(), Box<dyn Error>> {
    let monitor = monitor()?;
    let options = DemoOptions {
        threads: 3,
        depth: 4,
        hold: Duration::from_millis(5),
        fail: false,
    };

    let outcome = run_demo(&monitor, &options)?;

    assert!(outcome.report.started);
    assert_eq!(outcome.report.current_length, 3);
    for worker in 0..3 {
        let name = format!("demo-worker-{worker}");
        let invocation = outcome
            .report
            .invocation_named(&name)
            .ok_or_else(|| format!("{name} missing from report"))?;
        assert_eq!(
            invocation.services(),
            [
                "tundra.demo:level4",
                "tundra.demo:level3",
                "tundra.demo:level2",
                "tundra.demo:level1",
            ]
        );
        let innermost = invocation.callstack.first().ok_or("empty callstack")?;
        assert_eq!(innermost.session.as_str(), format!("demo-session-{worker}"));
        assert_eq!(innermost.pipeline.get("level"), Some(&serde_json::json!(4)));
    }

    assert_eq!(outcome.succeeded, 3);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.total_invocations, 12);
    assert_eq!(outcome.total_errors, 0);
    assert_eq!(monitor.tracked_threads(), 0);
    Ok(())
}

#[test]
fn failing_innermost_counts_every_level() -> Result<(), Box<dyn Error>> {
    let monitor = monitor()?;
    let options = DemoOptions {
        threads: 2,
        depth: 3,
        hold: Duration::ZERO,
        fail: true,
    };

    let outcome = run_demo(&monitor, &options)?;

    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.total_invocations, 6);
    assert_eq!(outcome.total_errors, 6);
    assert_eq!(monitor.tracked_threads(), 0);
    Ok(())
}

#[test]
fn rejects_zero_depth() -> Result<(), Box<dyn Error>> {
    let options = DemoOptions {
        depth: 0,
        ..DemoOptions::default()
    };
    let error = run_demo(&monitor()?, &options).err();
    assert_eq!(
        error.as_ref().map(|error| error.code.code()),
        Some("invalid_options")
    );
    Ok(())
}
