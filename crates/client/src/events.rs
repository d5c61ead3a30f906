//! Application event bus.
//!
//! Components never reach into each other to cause side effects. The
//! gateway publishes [`StoreEvent::SessionInvalidated`] when the backend
//! rejects credentials; the session manager listens for it. Navigation
//! requests and transient notifications travel the same way and are
//! rendered by whatever view layer subscribes.

use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

/// Default number of events buffered per subscriber.
const DEFAULT_CAPACITY: usize = 64;

/// Logical views the core can ask the shell to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Landing page after login.
    Landing,
    /// Login form.
    Login,
    /// Cart page.
    Cart,
    /// Hosted checkout returned successfully.
    CheckoutSuccess,
    /// Hosted checkout was abandoned.
    CheckoutCancel,
}

impl Route {
    /// Path of the view, relative to the site origin.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::Cart => "/cart",
            Self::CheckoutSuccess => "/checkout/success",
            Self::CheckoutCancel => "/checkout/cancel",
        }
    }
}

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient, user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The backend answered 401/403; the token store has been cleared.
    SessionInvalidated { status: u16 },
    /// Show a different view.
    Navigate(Route),
    /// Leave the application for an external URL (hosted checkout).
    Redirect(Url),
    /// Show a transient notification.
    Notice(Notice),
}

/// Multi-producer, multi-consumer event channel.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is dropped, and slow subscribers observe a lag instead of stalling
/// producers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: StoreEvent) {
        if self.sender.send(event).is_err() {
            debug!("Event dropped, no subscribers");
        }
    }

    /// Ask the shell to show `route`.
    pub fn navigate(&self, route: Route) {
        self.publish(StoreEvent::Navigate(route));
    }

    /// Publish a success notification.
    pub fn notify_success(&self, message: impl Into<String>) {
        self.publish(StoreEvent::Notice(Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }));
    }

    /// Publish an error notification.
    pub fn notify_error(&self, message: impl Into<String>) {
        self.publish(StoreEvent::Notice(Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(StoreEvent::SessionInvalidated { status: 401 });
        bus.navigate(Route::Login);
        bus.notify_error("Failed");

        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::SessionInvalidated { status: 401 }
        );
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Navigate(Route::Login));
        assert!(matches!(
            rx.recv().await.unwrap(),
            StoreEvent::Notice(Notice { level: NoticeLevel::Error, ref message }) if message == "Failed"
        ));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(0);
        bus.notify_success("nobody listening");
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.path(), "/login");
        assert_eq!(Route::CheckoutSuccess.path(), "/checkout/success");
        assert_eq!(Route::CheckoutCancel.path(), "/checkout/cancel");
    }
}
