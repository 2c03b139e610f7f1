use axum::extract::{Path, State};
use serde::Serialize;

use crate::domain::AppState;
use crate::domain::course::{self, Course};
use crate::domain::ids::{NotificationId, UserId};
use crate::domain::notification::{self, Notification};
use crate::domain::progress::{self, Analytics, Dashboard};
use crate::domain::user::{self, PlatformCounts, User};
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::auth::CurrentUser;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn list_notifications<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<Notification>>, ApiError> {
    notification::list_notifications(state.notifications(), &caller)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[NOTIFICATIONS]"))
}

pub async fn mark_notification_read<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(id): Path<NotificationId>,
    State(state): State<S>,
) -> Result<ApiSuccess<MarkedRead>, ApiError> {
    notification::mark_notification_read(state.notifications(), &caller, id)
        .await
        .map(|_| ApiSuccess::ok(MarkedRead { updated: 1 }))
        .map_err(ApiError::tagged("[NOTIFICATION_READ]"))
}

pub async fn mark_all_notifications_read<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<MarkedRead>, ApiError> {
    notification::mark_all_notifications_read(state.notifications(), &caller)
        .await
        .map(|updated| ApiSuccess::ok(MarkedRead { updated }))
        .map_err(ApiError::tagged("[NOTIFICATIONS_READ]"))
}

pub async fn dashboard<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Dashboard>, ApiError> {
    progress::dashboard(state.courses(), state.progress(), &caller)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[DASHBOARD]"))
}

pub async fn analytics<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Analytics>, ApiError> {
    caller.require_author()?;

    progress::analytics(state.courses(), &caller)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[ANALYTICS]"))
}

pub async fn toggle_ban<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<UserId>,
    State(state): State<S>,
) -> Result<ApiSuccess<User>, ApiError> {
    let admin = caller.require_admin()?;

    user::toggle_ban(state.users(), &admin, user_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[ADMIN_USER_BAN]"))
}

pub async fn list_users<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<User>>, ApiError> {
    let admin = caller.require_admin()?;

    user::list_users(state.users(), &admin)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[ADMIN_USERS]"))
}

pub async fn list_all_courses<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<Course>>, ApiError> {
    let admin = caller.require_admin()?;

    course::list_all_courses(state.courses(), &admin)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[ADMIN_COURSES]"))
}

pub async fn admin_overview<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<PlatformCounts>, ApiError> {
    let admin = caller.require_admin()?;

    user::admin_overview(state.users(), &admin)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[ADMIN_OVERVIEW]"))
}
