use chrono::{DateTime, Utc};
use coursehub_common::{ChapterTitle, CourseTitle};
use serde::Serialize;

use crate::domain::enrollment::capacity::Capacity;
use crate::domain::identity::{Admin, Caller};
use crate::domain::ids::{AttachmentId, CategoryId, ChapterId, CourseId, UserId};
use crate::domain::progress::progress_percentage;
use crate::domain::repository::{CourseRepository, ProgressRepository, RepositoryError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<CategoryId>,
    pub is_published: bool,
    pub max_capacity: Option<i32>,
    pub is_live: bool,
    pub live_url: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Courses without a price, or priced at zero, are enrolled without payment.
    pub fn is_free(&self) -> bool {
        self.price.is_none_or(|price| price <= 0.0)
    }

    pub fn capacity(&self) -> Capacity {
        Capacity::from(self.max_capacity)
    }

    /// Fields that still have to be filled before the course can be published.
    pub fn missing_publish_requirements(&self, has_published_chapter: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if is_blank(&self.description) {
            missing.push("description");
        }
        if is_blank(&self.image_url) {
            missing.push("imageUrl");
        }
        if self.category_id.is_none() {
            missing.push("categoryId");
        }
        if !has_published_chapter {
            missing.push("publishedChapter");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub position: i32,
    pub is_published: bool,
    pub is_free: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    pub fn missing_publish_requirements(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if is_blank(&self.description) {
            missing.push("description");
        }
        if is_blank(&self.video_url) {
            missing.push("videoUrl");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,
    pub course_id: CourseId,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Published course as listed in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: Course,
    pub category_name: Option<String>,
    pub published_chapters: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub title: Option<String>,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub id: CourseId,
    pub user_id: UserId,
    pub title: CourseTitle,
}

#[derive(Debug, Clone)]
pub struct NewChapter {
    pub id: ChapterId,
    pub course_id: CourseId,
    pub title: ChapterTitle,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub id: AttachmentId,
    pub course_id: CourseId,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterPosition {
    pub id: ChapterId,
    pub position: i32,
}

/// One purchase of a course owned by an instructor
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub course_id: CourseId,
    pub title: String,
    pub price: Option<f64>,
}

/// Changes to a course. `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub title: Option<CourseTitle>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub price: Option<Option<f64>>,
    pub category_id: Option<Option<CategoryId>>,
    pub max_capacity: Option<Option<i32>>,
    pub is_live: Option<bool>,
    pub live_url: Option<Option<String>>,
    pub start_date: Option<Option<DateTime<Utc>>>,
}

/// Changes to a chapter, same conventions as [`CoursePatch`].
#[derive(Debug, Clone, Default)]
pub struct ChapterPatch {
    pub title: Option<ChapterTitle>,
    pub description: Option<Option<String>>,
    pub video_url: Option<Option<String>>,
    pub is_free: Option<bool>,
}

/// A chapter as seen by a learner
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    pub chapter: Chapter,
    pub course_title: String,
    pub price: Option<f64>,
    pub attachments: Vec<Attachment>,
    pub next_chapter_id: Option<ChapterId>,
    pub purchased: bool,
    pub is_completed: bool,
}

/// Chapter entry of a course outline, with the caller's completion flag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterOutline {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub is_completed: bool,
}

/// A course with its chapters. Owners see drafts and attachments, learners
/// only the published chapters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub chapters: Vec<ChapterOutline>,
    pub attachments: Vec<Attachment>,
    pub purchased: bool,
    pub progress: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    #[error("Course not found")]
    CourseNotFound,
    #[error("Chapter not found")]
    ChapterNotFound,
    #[error("Attachment not found")]
    AttachmentNotFound,
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<&'static str>),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

async fn owned_course<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
) -> Result<Course, CourseError> {
    courses
        .find_owned_course(course_id, caller.id)
        .await?
        .ok_or(CourseError::CourseNotFound)
}

async fn owned_chapter<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    chapter_id: ChapterId,
) -> Result<Chapter, CourseError> {
    owned_course(courses, caller, course_id).await?;
    courses
        .find_chapter(course_id, chapter_id)
        .await?
        .ok_or(CourseError::ChapterNotFound)
}

/// Unpublishes the course once none of its chapters is published anymore.
async fn unpublish_if_empty<C: CourseRepository>(
    courses: &C,
    course_id: CourseId,
) -> Result<(), CourseError> {
    let published = courses
        .list_chapters(course_id)
        .await?
        .iter()
        .any(|chapter| chapter.is_published);

    if !published {
        courses.set_course_published(course_id, false).await?;
        tracing::info!(course_id = %course_id, "course unpublished, no published chapters left");
    }
    Ok(())
}

pub async fn create_course<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    title: CourseTitle,
) -> Result<Course, CourseError> {
    let course = courses
        .create_course(NewCourse {
            id: CourseId::generate(),
            user_id: caller.id,
            title,
        })
        .await?;

    tracing::info!(course_id = %course.id, owner = %caller.id, "course created");
    Ok(course)
}

pub async fn update_course<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    patch: CoursePatch,
) -> Result<Course, CourseError> {
    if let Some(Some(price)) = patch.price {
        if !price.is_finite() || price < 0.0 {
            return Err(CourseError::Invalid("Price must be a non-negative number".to_string()));
        }
    }
    if let Some(Some(capacity)) = patch.max_capacity {
        if capacity <= 0 {
            return Err(CourseError::Invalid("Capacity must be a positive number".to_string()));
        }
    }

    let mut course = owned_course(courses, caller, course_id).await?;

    if let Some(title) = patch.title {
        course.title = title.into_inner();
    }
    if let Some(description) = patch.description {
        course.description = description;
    }
    if let Some(image_url) = patch.image_url {
        course.image_url = image_url;
    }
    if let Some(price) = patch.price {
        course.price = price;
    }
    if let Some(category_id) = patch.category_id {
        course.category_id = category_id;
    }
    if let Some(max_capacity) = patch.max_capacity {
        course.max_capacity = max_capacity;
    }
    if let Some(is_live) = patch.is_live {
        course.is_live = is_live;
    }
    if let Some(live_url) = patch.live_url {
        course.live_url = live_url;
    }
    if let Some(start_date) = patch.start_date {
        course.start_date = start_date;
    }

    Ok(courses.update_course(&course).await?)
}

pub async fn delete_course<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
) -> Result<Course, CourseError> {
    let course = owned_course(courses, caller, course_id).await?;
    courses.delete_course(course.id).await?;
    tracing::info!(course_id = %course.id, "course deleted");
    Ok(course)
}

pub async fn publish_course<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
) -> Result<Course, CourseError> {
    let course = owned_course(courses, caller, course_id).await?;
    let has_published_chapter = courses
        .list_chapters(course.id)
        .await?
        .iter()
        .any(|chapter| chapter.is_published);

    let missing = course.missing_publish_requirements(has_published_chapter);
    if !missing.is_empty() {
        return Err(CourseError::MissingRequiredFields(missing));
    }

    Ok(courses.set_course_published(course.id, true).await?)
}

pub async fn unpublish_course<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
) -> Result<Course, CourseError> {
    let course = owned_course(courses, caller, course_id).await?;
    Ok(courses.set_course_published(course.id, false).await?)
}

pub async fn create_chapter<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    title: ChapterTitle,
) -> Result<Chapter, CourseError> {
    let course = owned_course(courses, caller, course_id).await?;
    let position = courses
        .list_chapters(course.id)
        .await?
        .iter()
        .map(|chapter| chapter.position)
        .max()
        .map_or(1, |last| last + 1);

    Ok(courses
        .create_chapter(NewChapter {
            id: ChapterId::generate(),
            course_id: course.id,
            title,
            position,
        })
        .await?)
}

pub async fn update_chapter<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    chapter_id: ChapterId,
    patch: ChapterPatch,
) -> Result<Chapter, CourseError> {
    let mut chapter = owned_chapter(courses, caller, course_id, chapter_id).await?;

    if let Some(title) = patch.title {
        chapter.title = title.into_inner();
    }
    if let Some(description) = patch.description {
        chapter.description = description;
    }
    if let Some(video_url) = patch.video_url {
        chapter.video_url = video_url;
    }
    if let Some(is_free) = patch.is_free {
        chapter.is_free = is_free;
    }

    Ok(courses.update_chapter(&chapter).await?)
}

pub async fn delete_chapter<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    chapter_id: ChapterId,
) -> Result<Chapter, CourseError> {
    let chapter = owned_chapter(courses, caller, course_id, chapter_id).await?;
    if !courses.delete_chapter(course_id, chapter_id).await? {
        return Err(CourseError::ChapterNotFound);
    }
    unpublish_if_empty(courses, course_id).await?;
    Ok(chapter)
}

pub async fn publish_chapter<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    chapter_id: ChapterId,
) -> Result<Chapter, CourseError> {
    let mut chapter = owned_chapter(courses, caller, course_id, chapter_id).await?;
    let missing = chapter.missing_publish_requirements();
    if !missing.is_empty() {
        return Err(CourseError::MissingRequiredFields(missing));
    }

    chapter.is_published = true;
    Ok(courses.update_chapter(&chapter).await?)
}

pub async fn unpublish_chapter<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    chapter_id: ChapterId,
) -> Result<Chapter, CourseError> {
    let mut chapter = owned_chapter(courses, caller, course_id, chapter_id).await?;
    chapter.is_published = false;
    let chapter = courses.update_chapter(&chapter).await?;
    unpublish_if_empty(courses, course_id).await?;
    Ok(chapter)
}

pub async fn reorder_chapters<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    positions: Vec<ChapterPosition>,
) -> Result<(), CourseError> {
    let course = owned_course(courses, caller, course_id).await?;
    let chapters = courses.list_chapters(course.id).await?;

    if let Some(unknown) = positions
        .iter()
        .find(|p| !chapters.iter().any(|chapter| chapter.id == p.id))
    {
        tracing::debug!(chapter_id = %unknown.id, "reorder references a foreign chapter");
        return Err(CourseError::ChapterNotFound);
    }

    Ok(courses.reorder_chapters(course.id, &positions).await?)
}

pub async fn add_attachment<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    url: String,
) -> Result<Attachment, CourseError> {
    let url = url.trim().to_string();
    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CourseError::Invalid("Attachment url is required".to_string()))?;

    let course = owned_course(courses, caller, course_id).await?;
    Ok(courses
        .create_attachment(NewAttachment {
            id: AttachmentId::generate(),
            course_id: course.id,
            name,
            url,
        })
        .await?)
}

pub async fn delete_attachment<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
    course_id: CourseId,
    attachment_id: AttachmentId,
) -> Result<(), CourseError> {
    let course = owned_course(courses, caller, course_id).await?;
    if courses.delete_attachment(course.id, attachment_id).await? {
        Ok(())
    } else {
        Err(CourseError::AttachmentNotFound)
    }
}

/// Loads a published chapter for a learner. Video and attachments stay hidden
/// unless the caller purchased the course, owns it, or the chapter is free.
pub async fn get_chapter<C: CourseRepository, P: ProgressRepository>(
    courses: &C,
    progress: &P,
    caller: &Caller,
    course_id: CourseId,
    chapter_id: ChapterId,
) -> Result<ChapterView, CourseError> {
    let course = courses
        .find_course(course_id)
        .await?
        .filter(|course| course.is_published)
        .ok_or(CourseError::CourseNotFound)?;

    let chapters = courses
        .list_chapters(course.id)
        .await?
        .into_iter()
        .filter(|chapter| chapter.is_published)
        .collect::<Vec<_>>();

    let index = chapters
        .iter()
        .position(|chapter| chapter.id == chapter_id)
        .ok_or(CourseError::ChapterNotFound)?;
    let next_chapter_id = chapters.get(index + 1).map(|chapter| chapter.id);
    let mut chapter = chapters[index].clone();

    let purchased = courses.has_purchase(caller.id, course.id).await?;
    let unlocked = purchased || chapter.is_free || course.user_id == caller.id;

    let attachments = if purchased || course.user_id == caller.id {
        courses.list_attachments(course.id).await?
    } else {
        Vec::new()
    };
    if !unlocked {
        chapter.video_url = None;
    }

    let is_completed = progress
        .find_progress(caller.id, chapter.id)
        .await?
        .is_some_and(|p| p.is_completed);

    Ok(ChapterView {
        chapter,
        course_title: course.title,
        price: course.price,
        attachments,
        next_chapter_id,
        purchased,
        is_completed,
    })
}

/// Courses of the calling instructor, drafts included, newest first.
pub async fn list_own_courses<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
) -> Result<Vec<Course>, CourseError> {
    Ok(courses.list_courses(Some(caller.id)).await?)
}

/// Every course on the platform, newest first.
pub async fn list_all_courses<C: CourseRepository>(
    courses: &C,
    _admin: &Admin,
) -> Result<Vec<Course>, CourseError> {
    Ok(courses.list_courses(None).await?)
}

/// Loads a course with its chapter outline. Unpublished courses are only
/// visible to their owner.
pub async fn get_course<C: CourseRepository, P: ProgressRepository>(
    courses: &C,
    progress: &P,
    caller: &Caller,
    course_id: CourseId,
) -> Result<CourseDetail, CourseError> {
    let course = courses
        .find_course(course_id)
        .await?
        .ok_or(CourseError::CourseNotFound)?;
    let is_owner = course.user_id == caller.id;
    if !course.is_published && !is_owner {
        return Err(CourseError::CourseNotFound);
    }

    let purchased = courses.has_purchase(caller.id, course.id).await?;
    let completed = progress
        .list_course_progress(caller.id, course.id)
        .await?
        .into_iter()
        .filter(|p| p.is_completed)
        .map(|p| p.chapter_id)
        .collect::<Vec<_>>();

    let chapters = courses
        .list_chapters(course.id)
        .await?
        .into_iter()
        .filter(|chapter| is_owner || chapter.is_published)
        .map(|mut chapter| {
            if !(is_owner || purchased || chapter.is_free) {
                chapter.video_url = None;
            }
            ChapterOutline {
                is_completed: completed.contains(&chapter.id),
                chapter,
            }
        })
        .collect::<Vec<_>>();

    let attachments = if is_owner {
        courses.list_attachments(course.id).await?
    } else {
        Vec::new()
    };

    let published = chapters.iter().filter(|o| o.chapter.is_published).count() as i64;
    let done = chapters
        .iter()
        .filter(|o| o.chapter.is_published && o.is_completed)
        .count() as i64;

    Ok(CourseDetail {
        course,
        chapters,
        attachments,
        purchased,
        progress: progress_percentage(published, done),
    })
}
