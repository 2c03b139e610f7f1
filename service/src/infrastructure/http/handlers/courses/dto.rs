use chrono::{DateTime, Utc};
use coursehub_common::{ChapterTitle, CourseTitle};
use serde::{Deserialize, Deserializer};

use crate::domain::course::{ChapterPatch, ChapterPosition, CourseFilter, CoursePatch};
use crate::domain::ids::{CategoryId, ChapterId};
use crate::infrastructure::http::api::ApiError;

/// Distinguishes a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn course_title(title: String) -> Result<CourseTitle, ApiError> {
    CourseTitle::try_new(title).map_err(|err| ApiError::UnprocessableEntity(err.to_string()))
}

pub fn chapter_title(title: String) -> Result<ChapterTitle, ApiError> {
    ChapterTitle::try_new(title).map_err(|err| ApiError::UnprocessableEntity(err.to_string()))
}

/// Query of the course catalogue route
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseQuery {
    pub title: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl From<CourseQuery> for CourseFilter {
    fn from(value: CourseQuery) -> Self {
        Self {
            title: value.title.filter(|title| !title.trim().is_empty()),
            category_id: value.category_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTitledRequest {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_capacity: Option<Option<i32>>,
    pub is_live: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub live_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,
}

impl TryFrom<UpdateCourseRequest> for CoursePatch {
    type Error = ApiError;

    fn try_from(value: UpdateCourseRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: value.title.map(course_title).transpose()?,
            description: value.description,
            image_url: value.image_url,
            price: value.price,
            category_id: value.category_id,
            max_capacity: value.max_capacity,
            is_live: value.is_live,
            live_url: value.live_url,
            start_date: value.start_date,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChapterRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub video_url: Option<Option<String>>,
    pub is_free: Option<bool>,
}

impl TryFrom<UpdateChapterRequest> for ChapterPatch {
    type Error = ApiError;

    fn try_from(value: UpdateChapterRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: value.title.map(chapter_title).transpose()?,
            description: value.description,
            video_url: value.video_url,
            is_free: value.is_free,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReorderEntry {
    pub id: ChapterId,
    pub position: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub list: Vec<ReorderEntry>,
}

impl From<ReorderRequest> for Vec<ChapterPosition> {
    fn from(value: ReorderRequest) -> Self {
        value
            .list
            .into_iter()
            .map(|entry| ChapterPosition {
                id: entry.id,
                position: entry.position,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct AddAttachmentRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub is_completed: bool,
}
