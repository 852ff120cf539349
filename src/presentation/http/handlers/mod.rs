//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints. Each module builds its service
//! from the shared state per request.

pub mod ad;
pub mod auth;
pub mod category;
pub mod health;
pub mod notification;
pub mod post;
pub mod thread;
pub mod user;

use std::sync::Arc;

use crate::application::services::Notifier;
use crate::infrastructure::repositories::PgNotificationRepository;
use crate::startup::AppState;

/// Notification writer shared by the thread and post handlers.
pub(crate) fn notifier(state: &AppState) -> Notifier<PgNotificationRepository> {
    Notifier::new(
        Arc::new(PgNotificationRepository::new(state.db.clone())),
        state.publisher(),
        state.snowflake.clone(),
    )
}
