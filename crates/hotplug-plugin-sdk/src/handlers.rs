//! Closure-based event handlers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use hotplug_core::{ClientHandle, Message};
use hotplug_plugin::bus::{EventHandler, HandlerResult, Subscription};

type BoxedHandlerFn = Arc<
    dyn Fn(ClientHandle, Message) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>>
        + Send
        + Sync,
>;

/// An event handler backed by an async closure.
///
/// The closure receives owned clones of the client handle and message.
pub struct ClosureHandler {
    /// Name for debug output.
    name: String,
    /// Handler function.
    handler: BoxedHandlerFn,
}

impl std::fmt::Debug for ClosureHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureHandler")
            .field("name", &self.name)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureHandler {
    /// Creates a new closure-based handler.
    pub fn new<F, Fut>(name: &str, handler: F) -> Self
    where
        F: Fn(ClientHandle, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            handler: Arc::new(move |client, message| Box::pin(handler(client, message))),
        }
    }
}

#[async_trait]
impl EventHandler for ClosureHandler {
    async fn handle(&self, client: &ClientHandle, message: &Message) -> HandlerResult {
        (self.handler)(client.clone(), message.clone()).await
    }
}

/// Subscribes a closure to `event` with the default priority.
pub fn on<F, Fut>(event: &str, handler: F) -> Subscription
where
    F: Fn(ClientHandle, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Subscription::new(event, Arc::new(ClosureHandler::new(event, handler)))
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use hotplug_core::Client;
    use hotplug_plugin::bus::HandlerAction;

    use super::*;

    #[derive(Debug)]
    struct Console;

    impl Client for Console {
        fn id(&self) -> &str {
            "console"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_closure_handler_sees_message() {
        let sub = on("text", |client, message| async move {
            if message.content() == Some("stop") {
                return HandlerResult::halt("stopped");
            }
            HandlerResult::continue_with_output(serde_json::json!({ "client": client.id() }))
        })
        .with_priority(5);

        assert_eq!(sub.event, "text");
        assert_eq!(sub.priority, 5);

        let client: ClientHandle = Arc::new(Console);
        let result = sub.handler.handle(&client, &Message::text("hi")).await;
        assert_eq!(result.action, HandlerAction::Continue);
        assert_eq!(result.output.expect("output")["client"], "console");

        let result = sub.handler.handle(&client, &Message::text("stop")).await;
        assert!(matches!(result.action, HandlerAction::Halt { .. }));
    }
}
