use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::{
    error::AppError,
    middleware::teacher::TeacherUsername,
    models::announcement::{Announcement, AnnouncementPayload},
    AppState,
};

/// GET /announcements — public, announcements currently inside their window.
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    state.announcements.active_announcements().await.map(Json)
}

/// GET /announcements/manage — every announcement, for staff editing.
pub async fn list_all(
    State(state): State<AppState>,
    teacher: TeacherUsername,
) -> Result<Json<Vec<Announcement>>, AppError> {
    state
        .announcements
        .all_announcements(teacher.as_deref())
        .await
        .map(Json)
}

pub async fn create_announcement(
    State(state): State<AppState>,
    teacher: TeacherUsername,
    Json(body): Json<AnnouncementPayload>,
) -> Result<Json<Announcement>, AppError> {
    state
        .announcements
        .create_announcement(&body, teacher.as_deref())
        .await
        .map(Json)
}

pub async fn update_announcement(
    State(state): State<AppState>,
    teacher: TeacherUsername,
    Path(id): Path<String>,
    Json(body): Json<AnnouncementPayload>,
) -> Result<Json<Announcement>, AppError> {
    state
        .announcements
        .update_announcement(&id, &body, teacher.as_deref())
        .await
        .map(Json)
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    teacher: TeacherUsername,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .announcements
        .delete_announcement(&id, teacher.as_deref())
        .await
        .map(Json)
}
