//! Realtime event port.

use serde_json::Value;

/// Channel all clients may follow for forum-wide activity.
pub const FORUM_CHANNEL: &str = "forum";

pub fn thread_channel(thread_id: i64) -> String {
    format!("thread-{}", thread_id)
}

pub fn user_channel(user_id: i64) -> String {
    format!("user-{}", user_id)
}

/// Fan-out of realtime events to subscribed clients.
///
/// Publishing is fire-and-forget: implementations swallow delivery failures.
#[cfg_attr(test, mockall::automock)]
pub trait EventPublisher: Send + Sync {
    fn publish(&self, channel: &str, event: &str, data: Value);
}
