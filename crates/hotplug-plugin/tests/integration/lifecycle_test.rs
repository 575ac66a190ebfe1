//! Integration tests for load and unload.

use std::sync::Arc;
use std::time::Duration;

use hotplug_plugin::contract::type_of;
use hotplug_plugin::error::LifecycleError;
use hotplug_plugin::gating::SkipReason;

use crate::helpers::{Echo, TestHost};

#[tokio::test]
async fn test_load_all_activates_discovered_plugin() {
    let host = TestHost::new(&["echo"]);

    let loaded = host.manager.load_all(false).await;

    assert_eq!(loaded, vec!["Echo".to_string()]);
    let info = host.manager.plugin_info("Echo").await.expect("info");
    assert!(info.enabled);
    assert_eq!(info.directory.as_deref(), Some("echo"));
    assert_eq!(info.author, "tests");
    assert!(info.activated_at.is_some());
}

#[tokio::test]
async fn test_hooks_run_in_order() {
    let host = TestHost::new(&["echo"]);
    host.manager.load("Echo").await.expect("load");

    host.manager.unload("Echo").await.expect("unload");

    assert_eq!(
        host.counters("echo").calls(),
        vec!["on_enable", "async_init", "on_disable"]
    );
}

#[tokio::test]
async fn test_second_load_is_a_noop() {
    let host = TestHost::new(&["echo"]);

    host.manager.load("Echo").await.expect("first load");
    let first = host.manager.get_plugin("Echo").await.expect("active");

    let err = host.manager.load("Echo").await.unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyActive { .. }));

    let err = host.manager.load(type_of::<Echo>()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyActive { .. }));

    assert!(host.manager.load_all(false).await.is_empty());

    let counters = host.counters("echo");
    assert_eq!(counters.enabled(), 1);
    let still = host.manager.get_plugin("Echo").await.expect("active");
    assert!(Arc::ptr_eq(&first, &still));
    assert_eq!(host.bus.registry().handler_count("text").await, 1);
}

#[tokio::test]
async fn test_unload_then_load_builds_new_instance() {
    let host = TestHost::new(&["echo"]);
    host.manager.load("Echo").await.expect("load");
    let before = host.manager.get_plugin("Echo").await.expect("active");

    host.manager.unload("Echo").await.expect("unload");
    assert!(!host.manager.is_active("Echo").await);
    assert!(!host.manager.plugin_info("Echo").await.expect("record kept").enabled);

    host.manager.load("Echo").await.expect("load again");
    let after = host.manager.get_plugin("Echo").await.expect("active");

    assert!(!Arc::ptr_eq(&before, &after));
    let counters = host.counters("echo");
    assert_eq!(counters.enabled(), 2);
    assert_eq!(counters.disabled(), 1);
}

#[tokio::test]
async fn test_unload_twice_fails_second_time() {
    let host = TestHost::new(&["echo"]);
    host.manager.load_all(false).await;

    assert!(host.manager.unload("Echo").await.is_ok());
    let err = host.manager.unload("Echo").await.unwrap_err();

    assert!(matches!(err, LifecycleError::NotActive { .. }));
    assert_eq!(host.counters("echo").disabled(), 1);
    assert!(!host.bus.registry().is_bound("Echo").await);
}

#[tokio::test]
async fn test_construction_error_leaves_no_record() {
    let host = TestHost::new(&["broken", "echo"]);

    let loaded = host.manager.load_all(false).await;
    assert_eq!(loaded, vec!["Echo".to_string()]);

    let err = host.manager.load("Broken").await.unwrap_err();
    assert!(matches!(err, LifecycleError::Construction { .. }));
    assert!(err.to_string().contains("missing api key"));
    assert!(host.manager.plugin_info("Broken").await.is_none());
}

#[tokio::test]
async fn test_always_on_plugin_cannot_be_unloaded() {
    let host = TestHost::new(&["manage", "echo"]);
    host.manager.load_all(false).await;
    let before = host.manager.get_plugin("ManagePlugin").await.expect("active");

    let err = host.manager.unload("ManagePlugin").await.unwrap_err();
    assert!(matches!(err, LifecycleError::Protected { .. }));

    let outcome = host.manager.unload_all().await;
    assert_eq!(outcome.succeeded, vec!["Echo".to_string()]);
    assert_eq!(outcome.failed, vec!["ManagePlugin".to_string()]);

    let after = host.manager.get_plugin("ManagePlugin").await.expect("still active");
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(host.counters("manage").disabled(), 0);
}

#[tokio::test]
async fn test_type_table_reenables_plugin_without_unit() {
    let host = TestHost::new(&["echo"]);
    host.manager.load_all(false).await;
    host.manager.unload("Echo").await.expect("unload");
    host.remove_entry("echo");

    host.manager.load("Echo").await.expect("load from type table");

    assert!(host.manager.is_active("Echo").await);
}

#[tokio::test]
async fn test_unknown_identifier_is_not_found() {
    let host = TestHost::new(&["echo"]);
    let err = host.manager.load("Weather").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound { .. }));
    assert!(host.manager.all_plugin_info().await.iter().all(|i| i.id != "Weather"));
}

#[tokio::test]
async fn test_concurrent_loads_activate_once() {
    let host = TestHost::new(&["echo"]);

    let (a, b) = tokio::join!(host.manager.load("Echo"), host.manager.load("Echo"));

    assert!(a.is_ok() ^ b.is_ok());
    assert_eq!(host.counters("echo").enabled(), 1);
}

#[tokio::test]
async fn test_cancelled_load_never_leaves_half_bound_plugin() {
    let host = TestHost::new(&["slow"]);

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), host.manager.load("Slow")).await;
    assert!(cancelled.is_err());

    // Waits for the detached activation, if it got that far, to release the lock.
    match host.manager.load("Slow").await {
        Ok(()) | Err(LifecycleError::AlreadyActive { .. }) => {}
        Err(e) => panic!("unexpected error: {e}"),
    }

    assert!(host.manager.is_active("Slow").await);
    assert!(host.bus.registry().is_bound("Slow").await);
    assert_eq!(host.counters("slow").enabled(), 1);
    assert_eq!(host.counters("slow").calls(), vec!["on_enable", "async_init"]);
}

#[tokio::test]
async fn test_cancelled_unload_runs_on_disable_once() {
    let host = TestHost::new(&["slowstop"]);
    host.manager.load("SlowStop").await.expect("load");

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), host.manager.unload("SlowStop")).await;
    assert!(cancelled.is_err());

    // Blocks until the detached deactivation hands the lock back.
    let err = host.manager.unload("SlowStop").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotActive { .. }));

    assert!(!host.manager.is_active("SlowStop").await);
    assert!(!host.bus.registry().is_bound("SlowStop").await);
    assert_eq!(host.counters("slowstop").disabled(), 1);
    assert_eq!(
        host.counters("slowstop").calls(),
        vec!["on_enable", "async_init", "on_disable"]
    );
}

#[tokio::test]
async fn test_type_load_keeps_unit_of_record() {
    let host = TestHost::new(&["echo"]);
    host.manager.load_all(false).await;
    let first_gen = host
        .manager
        .plugin_info("Echo")
        .await
        .and_then(|i| i.generation)
        .expect("generation");
    host.manager.unload("Echo").await.expect("unload");

    host.set_greeting("echo", "v2");
    host.manager.load(type_of::<Echo>()).await.expect("load by type");

    let info = host.manager.plugin_info("Echo").await.expect("info");
    assert_eq!(info.directory.as_deref(), Some("echo"));
    assert_eq!(info.generation, Some(first_gen));
    assert_eq!(host.counters("echo").greeting(), "v2");

    host.set_greeting("echo", "v3");
    host.manager.reload("Echo").await.expect("reload");

    let info = host.manager.plugin_info("Echo").await.expect("info");
    assert!(info.generation.expect("generation") > first_gen);
    assert_eq!(host.counters("echo").greeting(), "v3");
}

#[tokio::test]
async fn test_type_load_honors_self_flag_of_record_unit() {
    let host = TestHost::new(&["echo"]);
    host.manager.load_all(false).await;
    host.manager.unload("Echo").await.expect("unload");
    host.disable_self("echo");

    let err = host.manager.load(type_of::<Echo>()).await.unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::Skipped {
            reason: SkipReason::SelfDisabled,
            ..
        }
    ));
    assert!(!host.manager.is_active("Echo").await);
}
