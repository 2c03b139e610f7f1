use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::domain::AppState;
use crate::domain::course::{
    self, Attachment, Category, Chapter, ChapterPatch, ChapterView, Course, CourseDetail,
    CoursePatch, CourseSummary,
};
use crate::domain::ids::{AttachmentId, ChapterId, CourseId};
use crate::domain::progress::{self, CourseProgress, UserProgress};
use crate::domain::repository::CourseRepository;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::auth::CurrentUser;
use crate::infrastructure::http::handlers::courses::dto::{
    AddAttachmentRequest, CourseQuery, CreateTitledRequest, ProgressRequest, ReorderRequest,
    UpdateChapterRequest, UpdateCourseRequest, chapter_title, course_title,
};
use crate::infrastructure::http::querystring::QueryString;

mod dto;

pub async fn list_categories<S: AppState>(
    CurrentUser(_caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<Category>>, ApiError> {
    state
        .courses()
        .list_categories()
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[CATEGORIES]"))
}

pub async fn list_courses<S: AppState>(
    CurrentUser(_caller): CurrentUser,
    QueryString(query): QueryString<CourseQuery>,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<CourseSummary>>, ApiError> {
    state
        .courses()
        .list_published_courses(&query.into())
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[COURSES]"))
}

pub async fn get_course<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
) -> Result<ApiSuccess<CourseDetail>, ApiError> {
    course::get_course(state.courses(), state.progress(), &caller, course_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[GET_COURSE]"))
}

pub async fn list_own_courses<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<Course>>, ApiError> {
    caller.require_author()?;

    course::list_own_courses(state.courses(), &caller)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[TEACHER_COURSES]"))
}

pub async fn create_course<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
    Json(body): Json<CreateTitledRequest>,
) -> Result<ApiSuccess<Course>, ApiError> {
    caller.require_author()?;
    let title = course_title(body.title)?;

    course::create_course(state.courses(), &caller, title)
        .await
        .map(|course| ApiSuccess::new(StatusCode::CREATED, course))
        .map_err(ApiError::tagged("[COURSES]"))
}

pub async fn update_course<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
    Json(body): Json<UpdateCourseRequest>,
) -> Result<ApiSuccess<Course>, ApiError> {
    caller.require_author()?;
    let patch = CoursePatch::try_from(body)?;

    course::update_course(state.courses(), &caller, course_id, patch)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[COURSE_ID]"))
}

pub async fn delete_course<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
) -> Result<ApiSuccess<Course>, ApiError> {
    caller.require_author()?;

    course::delete_course(state.courses(), &caller, course_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[COURSE_ID_DELETE]"))
}

pub async fn publish_course<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
) -> Result<ApiSuccess<Course>, ApiError> {
    caller.require_author()?;

    course::publish_course(state.courses(), &caller, course_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[COURSE_ID_PUBLISH]"))
}

pub async fn unpublish_course<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
) -> Result<ApiSuccess<Course>, ApiError> {
    caller.require_author()?;

    course::unpublish_course(state.courses(), &caller, course_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[COURSE_ID_UNPUBLISH]"))
}

pub async fn add_attachment<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
    Json(body): Json<AddAttachmentRequest>,
) -> Result<ApiSuccess<Attachment>, ApiError> {
    caller.require_author()?;

    course::add_attachment(state.courses(), &caller, course_id, body.url)
        .await
        .map(|attachment| ApiSuccess::new(StatusCode::CREATED, attachment))
        .map_err(ApiError::tagged("[COURSE_ID_ATTACHMENTS]"))
}

pub async fn delete_attachment<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path((course_id, attachment_id)): Path<(CourseId, AttachmentId)>,
    State(state): State<S>,
) -> Result<StatusCode, ApiError> {
    caller.require_author()?;

    course::delete_attachment(state.courses(), &caller, course_id, attachment_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(ApiError::tagged("[ATTACHMENT_ID]"))
}

pub async fn create_chapter<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
    Json(body): Json<CreateTitledRequest>,
) -> Result<ApiSuccess<Chapter>, ApiError> {
    caller.require_author()?;
    let title = chapter_title(body.title)?;

    course::create_chapter(state.courses(), &caller, course_id, title)
        .await
        .map(|chapter| ApiSuccess::new(StatusCode::CREATED, chapter))
        .map_err(ApiError::tagged("[CHAPTERS]"))
}

pub async fn reorder_chapters<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
    Json(body): Json<ReorderRequest>,
) -> Result<ApiSuccess<&'static str>, ApiError> {
    caller.require_author()?;

    course::reorder_chapters(state.courses(), &caller, course_id, body.into())
        .await
        .map(|_| ApiSuccess::ok("Success"))
        .map_err(ApiError::tagged("[REORDER]"))
}

pub async fn get_chapter<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path((course_id, chapter_id)): Path<(CourseId, ChapterId)>,
    State(state): State<S>,
) -> Result<ApiSuccess<ChapterView>, ApiError> {
    course::get_chapter(state.courses(), state.progress(), &caller, course_id, chapter_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[GET_CHAPTER]"))
}

pub async fn update_chapter<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path((course_id, chapter_id)): Path<(CourseId, ChapterId)>,
    State(state): State<S>,
    Json(body): Json<UpdateChapterRequest>,
) -> Result<ApiSuccess<Chapter>, ApiError> {
    caller.require_author()?;
    let patch = ChapterPatch::try_from(body)?;

    course::update_chapter(state.courses(), &caller, course_id, chapter_id, patch)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[COURSES_CHAPTER_ID]"))
}

pub async fn delete_chapter<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path((course_id, chapter_id)): Path<(CourseId, ChapterId)>,
    State(state): State<S>,
) -> Result<ApiSuccess<Chapter>, ApiError> {
    caller.require_author()?;

    course::delete_chapter(state.courses(), &caller, course_id, chapter_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[CHAPTER_ID_DELETE]"))
}

pub async fn publish_chapter<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path((course_id, chapter_id)): Path<(CourseId, ChapterId)>,
    State(state): State<S>,
) -> Result<ApiSuccess<Chapter>, ApiError> {
    caller.require_author()?;

    course::publish_chapter(state.courses(), &caller, course_id, chapter_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[CHAPTER_PUBLISH]"))
}

pub async fn unpublish_chapter<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path((course_id, chapter_id)): Path<(CourseId, ChapterId)>,
    State(state): State<S>,
) -> Result<ApiSuccess<Chapter>, ApiError> {
    caller.require_author()?;

    course::unpublish_chapter(state.courses(), &caller, course_id, chapter_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[CHAPTER_UNPUBLISH]"))
}

pub async fn course_progress<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
) -> Result<ApiSuccess<CourseProgress>, ApiError> {
    progress::course_progress(state.courses(), state.progress(), &caller, course_id)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[COURSE_PROGRESS]"))
}

pub async fn set_chapter_progress<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path((course_id, chapter_id)): Path<(CourseId, ChapterId)>,
    State(state): State<S>,
    Json(body): Json<ProgressRequest>,
) -> Result<ApiSuccess<UserProgress>, ApiError> {
    progress::set_chapter_progress(
        state.courses(),
        state.progress(),
        &caller,
        course_id,
        chapter_id,
        body.is_completed,
    )
    .await
    .map(ApiSuccess::ok)
    .map_err(ApiError::tagged("[CHAPTER_ID_PROGRESS]"))
}
