//! Integration tests for reload, bulk reload and refresh.

use std::sync::Arc;
use std::time::Duration;

use hotplug_plugin::error::LifecycleError;

use crate::helpers::TestHost;

#[tokio::test]
async fn test_reload_builds_fresh_instance_from_new_generation() {
    let host = TestHost::new(&["echo"]);
    host.set_greeting("echo", "hello");
    host.manager.load_all(false).await;

    let before = host.manager.get_plugin("Echo").await.expect("active");
    let gen_before = host
        .manager
        .plugin_info("Echo")
        .await
        .and_then(|i| i.generation)
        .expect("generation");
    assert_eq!(host.counters("echo").greeting(), "hello");

    host.set_greeting("echo", "bonjour");
    host.manager.reload("Echo").await.expect("reload");

    let after = host.manager.get_plugin("Echo").await.expect("active");
    let info = host.manager.plugin_info("Echo").await.expect("info");

    assert!(!Arc::ptr_eq(&before, &after));
    assert!(info.enabled);
    assert!(info.generation.expect("generation") > gen_before);
    assert_eq!(host.counters("echo").greeting(), "bonjour");
    assert_eq!(host.counters("echo").calls(), vec![
        "on_enable",
        "async_init",
        "on_disable",
        "on_enable",
        "async_init",
    ]);
    assert_eq!(host.bus.registry().handler_count("text").await, 1);
}

#[tokio::test]
async fn test_reload_of_always_on_plugin_fails() {
    let host = TestHost::new(&["manage"]);
    host.manager.load_all(false).await;
    let before = host.manager.get_plugin("ManagePlugin").await.expect("active");

    let err = host.manager.reload("ManagePlugin").await.unwrap_err();

    assert!(matches!(err, LifecycleError::Protected { action: "reloaded", .. }));
    let after = host.manager.get_plugin("ManagePlugin").await.expect("still active");
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(host.counters("manage").enabled(), 1);
}

#[tokio::test]
async fn test_reload_inactive_plugin_fails() {
    let host = TestHost::new(&["echo"]);
    host.manager.load_all(false).await;
    host.manager.unload("Echo").await.expect("unload");

    let err = host.manager.reload("Echo").await.unwrap_err();

    assert!(matches!(err, LifecycleError::NotActive { .. }));
    assert!(!host.manager.is_active("Echo").await);
}

#[tokio::test]
async fn test_reload_with_vanished_unit_reports_discovery_error() {
    let host = TestHost::new(&["echo"]);
    host.manager.load_all(false).await;
    host.remove_entry("echo");

    let err = host.manager.reload("Echo").await.unwrap_err();

    assert!(matches!(err, LifecycleError::Discovery { .. }));
    assert!(!host.manager.is_active("Echo").await);
    assert!(host.manager.plugin_info("Echo").await.is_some());
}

#[tokio::test]
async fn test_reload_all_skips_broken_sibling() {
    let host = TestHost::new(&["broken", "echo"]);
    assert_eq!(host.manager.load_all(false).await, vec!["Echo".to_string()]);

    let outcome = host.manager.reload_all().await;

    assert_eq!(outcome.succeeded, vec!["Echo".to_string()]);
    assert!(outcome.failed.is_empty());
    assert!(host.manager.is_active("Echo").await);
    assert_eq!(host.counters("echo").enabled(), 2);
}

#[tokio::test]
async fn test_reload_all_leaves_always_on_plugin_alone() {
    let host = TestHost::new(&["dice", "echo", "manage"]);
    host.manager.load_all(false).await;
    let manage = host.manager.get_plugin("ManagePlugin").await.expect("active");
    let manage_gen = host
        .manager
        .plugin_info("ManagePlugin")
        .await
        .and_then(|i| i.generation);

    let outcome = host.manager.reload_all().await;

    assert_eq!(outcome.succeeded, vec!["Dice".to_string(), "Echo".to_string()]);
    let still = host.manager.get_plugin("ManagePlugin").await.expect("active");
    assert!(Arc::ptr_eq(&manage, &still));
    assert_eq!(
        host.manager.plugin_info("ManagePlugin").await.and_then(|i| i.generation),
        manage_gen
    );
    assert_eq!(host.counters("manage").disabled(), 0);
}

#[tokio::test]
async fn test_reload_all_reports_plugins_that_did_not_return() {
    let host = TestHost::new(&["dice", "echo"]);
    host.manager.load_all(false).await;
    host.disable_self("dice");

    let outcome = host.manager.reload_all().await;

    assert_eq!(outcome.succeeded, vec!["Echo".to_string()]);
    assert_eq!(outcome.failed, vec!["Dice".to_string()]);
    assert!(!host.manager.is_active("Dice").await);
}

#[tokio::test]
async fn test_refresh_all_picks_up_new_and_removed_units() {
    let host = TestHost::new(&["dice", "echo"]);
    host.manager.load_all(false).await;

    host.remove_entry("dice");
    crate::helpers::add_unit(&host.root, "manage");

    let outcome = host.manager.refresh_all().await;

    assert_eq!(
        outcome.loaded,
        vec!["Echo".to_string(), "ManagePlugin".to_string()]
    );
    assert_eq!(outcome.not_reloaded, vec!["Dice".to_string()]);
    assert_eq!(
        host.manager.active_plugins().await,
        vec!["Echo".to_string(), "ManagePlugin".to_string()]
    );
    assert_eq!(host.counters("echo").constructed(), 2);
}

#[tokio::test]
async fn test_cancelled_reload_does_not_repeat_teardown() {
    let host = TestHost::new(&["slowstop"]);
    host.manager.load("SlowStop").await.expect("load");

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), host.manager.reload("SlowStop")).await;
    assert!(cancelled.is_err());

    // The load waits for the detached teardown to release the lock.
    host.manager.load("SlowStop").await.expect("load again");

    let counters = host.counters("slowstop");
    assert_eq!(counters.disabled(), 1);
    assert_eq!(counters.calls(), vec![
        "on_enable",
        "async_init",
        "on_disable",
        "on_enable",
        "async_init",
    ]);
    assert_eq!(host.bus.registry().handler_count("text").await, 1);
}
