//! Integration tests for routing messages to active plugins.

use hotplug_core::Message;
use hotplug_core::events::MessageKind;

use crate::helpers::{TestHost, client};

#[tokio::test]
async fn test_route_without_client_drops_message() {
    let host = TestHost::new(&["echo"]);
    host.manager.load_all(false).await;

    assert!(host.manager.route(&Message::text("hi")).await.is_none());
    assert_eq!(host.counters("echo").handled(), 0);
}

#[tokio::test]
async fn test_route_reaches_active_plugins_only() {
    let host = TestHost::new(&["dice", "echo"]);
    host.manager.set_client(client()).await;
    host.manager.load_all(false).await;

    let result = host.manager.route(&Message::text("hi")).await.expect("routed");
    assert_eq!(result.handled(), 2);
    assert_eq!(result.results[0].result.output.as_ref().expect("output")["echo"], "hi");

    host.manager.unload("Dice").await.expect("unload");
    let result = host.manager.route(&Message::text("again")).await.expect("routed");

    assert_eq!(result.handled(), 1);
    assert_eq!(result.results[0].plugin_id, "Echo");
    assert_eq!(host.counters("dice").handled(), 1);
    assert_eq!(host.counters("echo").handled(), 2);
}

#[tokio::test]
async fn test_route_uses_message_kind_as_key() {
    let host = TestHost::new(&["echo"]);
    host.manager.set_client(client()).await;
    host.manager.load_all(false).await;

    let result = host
        .manager
        .route(&Message::new(MessageKind::HEARTBEAT))
        .await
        .expect("routed");

    assert_eq!(result.handled(), 0);
    assert_eq!(host.counters("echo").handled(), 0);
}

#[tokio::test]
async fn test_reloaded_plugin_receives_messages_once() {
    let host = TestHost::new(&["echo"]);
    host.manager.set_client(client()).await;
    host.manager.load_all(false).await;

    host.manager.reload("Echo").await.expect("reload");
    let result = host.manager.route(&Message::text("hi")).await.expect("routed");

    assert_eq!(result.handled(), 1);
    assert_eq!(host.counters("echo").handled(), 1);
}
