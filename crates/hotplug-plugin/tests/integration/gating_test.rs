//! Integration tests for the exclusion set and the plugin self-flag.

use hotplug_plugin::error::LifecycleError;
use hotplug_plugin::gating::SkipReason;

use crate::helpers::TestHost;

#[tokio::test]
async fn test_empty_root_loads_nothing() {
    let host = TestHost::new(&[]);

    assert!(host.manager.load_all(false).await.is_empty());
    assert!(host.manager.load_all(true).await.is_empty());
    assert!(host.manager.all_plugin_info().await.is_empty());
}

#[tokio::test]
async fn test_excluded_plugin_is_recorded_but_skipped() {
    let host = TestHost::with_exclusions(&["echo", "dice"], &["Echo"]);

    let loaded = host.manager.load_all(false).await;

    assert_eq!(loaded, vec!["Dice".to_string()]);
    let info = host.manager.plugin_info("Echo").await.expect("record still present");
    assert!(!info.enabled);
    assert_eq!(info.version, "0.1.0");
    assert_eq!(host.counters("echo").enabled(), 0);
}

#[tokio::test]
async fn test_exclusion_by_directory_name() {
    let host = TestHost::with_exclusions(&["echo", "dice"], &["dice"]);

    let loaded = host.manager.load_all(false).await;

    assert_eq!(loaded, vec!["Echo".to_string()]);
    assert!(!host.manager.is_active("Dice").await);
}

#[tokio::test]
async fn test_load_disabled_lifts_exclusion() {
    let host = TestHost::with_exclusions(&["echo"], &["Echo"]);

    let loaded = host.manager.load_all(true).await;

    assert_eq!(loaded, vec!["Echo".to_string()]);
    assert!(host.manager.plugin_info("Echo").await.expect("info").enabled);
}

#[tokio::test]
async fn test_self_flag_wins_over_load_disabled() {
    let host = TestHost::with_exclusions(&["echo", "dice"], &["Echo"]);
    host.disable_self("echo");

    let loaded = host.manager.load_all(true).await;

    assert_eq!(loaded, vec!["Dice".to_string()]);
    assert!(host.manager.plugin_info("Echo").await.is_some());
    assert_eq!(host.counters("echo").enabled(), 0);
}

#[tokio::test]
async fn test_self_disabled_plugin_never_active() {
    let host = TestHost::new(&["echo"]);
    host.disable_self("echo");

    let err = host.manager.load("Echo").await.unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::Skipped {
            reason: SkipReason::SelfDisabled,
            ..
        }
    ));
    assert!(host.manager.active_plugins().await.is_empty());
    let info = host.manager.plugin_info("Echo").await.expect("metadata kept");
    assert!(!info.enabled);
    assert_eq!(info.description, "Echo test plugin");
    assert!(!host.bus.registry().is_bound("Echo").await);
}

#[tokio::test]
async fn test_explicit_load_ignores_exclusion() {
    let host = TestHost::with_exclusions(&["echo"], &["Echo"]);

    assert!(host.manager.load_all(false).await.is_empty());
    host.manager.load("Echo").await.expect("explicit load");

    assert!(host.manager.is_active("Echo").await);
}

#[tokio::test]
async fn test_load_from_extra_directory() {
    let host = TestHost::new(&["echo"]);
    let extra = tempfile::tempdir().expect("tempdir");
    crate::helpers::add_unit(extra.path(), "dice");

    let loaded = host
        .manager
        .load_from_directory(extra.path(), false)
        .await;

    assert_eq!(loaded, vec!["Dice".to_string()]);
    assert!(!host.manager.is_active("Echo").await);
    let info = host.manager.plugin_info("Dice").await.expect("info");
    assert_eq!(info.path.as_deref(), Some(extra.path().join("dice").as_path()));
}
