use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use super::inbox::{Notification, NotificationInbox, NotificationRepository};
use crate::error::AppError;

/// Inbox endpoints. Both routes share the `:id` segment; it is a user id on the
/// listing route and a notification id on the read route.
pub fn notification_router<R>(inbox: Arc<NotificationInbox<R>>) -> Router
where
    R: NotificationRepository + 'static,
{
    Router::new()
        .route("/api/v1/notifications/:id", get(recent_handler::<R>))
        .route("/api/v1/notifications/:id/read", post(mark_read_handler::<R>))
        .with_state(inbox)
}

pub(crate) async fn recent_handler<R>(
    State(inbox): State<Arc<NotificationInbox<R>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Notification>>, AppError>
where
    R: NotificationRepository + 'static,
{
    Ok(Json(inbox.recent(&user_id)?))
}

pub(crate) async fn mark_read_handler<R>(
    State(inbox): State<Arc<NotificationInbox<R>>>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>, AppError>
where
    R: NotificationRepository + 'static,
{
    Ok(Json(inbox.mark_read(&notification_id)?))
}
