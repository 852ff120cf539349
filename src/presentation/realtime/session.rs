//! Realtime Session State

use std::collections::HashMap;
use std::time::Instant;

use tokio::task::JoinHandle;

/// Per-connection state
#[derive(Debug)]
pub struct SessionState {
    pub session_id: String,
    pub user_id: Option<i64>,
    pub last_heartbeat: Instant,
    /// Forwarding task per subscribed channel
    subscriptions: HashMap<String, JoinHandle<()>>,
}

impl SessionState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            user_id: None,
            last_heartbeat: Instant::now(),
            subscriptions: HashMap::new(),
        }
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    pub fn is_alive(&self, timeout_ms: u64) -> bool {
        self.last_heartbeat.elapsed().as_millis() < timeout_ms as u128
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.contains_key(channel)
    }

    pub fn add_subscription(&mut self, channel: String, task: JoinHandle<()>) {
        if let Some(previous) = self.subscriptions.insert(channel, task) {
            previous.abort();
        }
    }

    /// Returns false when the channel was not subscribed.
    pub fn remove_subscription(&mut self, channel: &str) -> bool {
        match self.subscriptions.remove(channel) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Drop subscriptions matching `predicate`, returning their names.
    pub fn remove_where(&mut self, predicate: impl Fn(&str) -> bool) -> Vec<String> {
        let doomed: Vec<String> = self
            .subscriptions
            .keys()
            .filter(|channel| predicate(channel))
            .cloned()
            .collect();
        for channel in &doomed {
            self.remove_subscription(channel);
        }
        doomed
    }

    pub fn clear(&mut self) {
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        self.clear();
    }
}
