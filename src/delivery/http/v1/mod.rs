pub mod notifications;

use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::delivery::http::v1::notifications::{
    get_unread_count, list_notifications, list_unread_notifications, mark_all_as_read, mark_as_read,
};
use crate::usecase::contracts::{NotificationRepository, UserRepository};
use crate::AppState;

pub fn router<N, U>(state: Arc<AppState<N, U>>) -> Router
where
    N: NotificationRepository + 'static,
    U: UserRepository + 'static,
{
    Router::new()
        .route("/api/notifications", get(list_notifications::<N, U>))
        .route("/api/notifications/unread", get(list_unread_notifications::<N, U>))
        .route("/api/notifications/unread/count", get(get_unread_count::<N, U>))
        .route("/api/notifications/read-all", put(mark_all_as_read::<N, U>))
        .route("/api/notifications/{id}/read", put(mark_as_read::<N, U>))
        .with_state(state)
}
