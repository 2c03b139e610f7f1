use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::domain::course::{Course, CourseError};
use crate::domain::identity::Caller;
use crate::domain::ids::{ChapterId, CourseId, ProgressId, UserId};
use crate::domain::repository::{CourseRepository, ProgressRepository, RepositoryError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: ProgressId,
    pub user_id: UserId,
    pub chapter_id: ChapterId,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Published chapters of a course and how many of them a user completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub published: i64,
    pub completed: i64,
}

impl ProgressCounts {
    pub fn percentage(&self) -> f64 {
        progress_percentage(self.published, self.completed)
    }
}

/// Share of completed chapters in percent, 0 for a course without published chapters.
pub fn progress_percentage(published: i64, completed: i64) -> f64 {
    if published <= 0 {
        return 0.0;
    }
    completed as f64 / published as f64 * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: CourseId,
    pub published_chapters: i64,
    pub completed_chapters: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCourse {
    #[serde(flatten)]
    pub course: Course,
    pub progress: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub completed_courses: Vec<DashboardCourse>,
    pub courses_in_progress: Vec<DashboardCourse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseRevenue {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub data: Vec<CourseRevenue>,
    pub total_revenue: f64,
    pub total_sales: usize,
}

pub async fn course_progress<C: CourseRepository, P: ProgressRepository>(
    courses: &C,
    progress: &P,
    caller: &Caller,
    course_id: CourseId,
) -> Result<CourseProgress, CourseError> {
    let course = courses
        .find_course(course_id)
        .await?
        .ok_or(CourseError::CourseNotFound)?;
    let counts = progress.count_progress(caller.id, course.id).await?;

    Ok(CourseProgress {
        course_id: course.id,
        published_chapters: counts.published,
        completed_chapters: counts.completed,
        percentage: counts.percentage(),
    })
}

pub async fn set_chapter_progress<C: CourseRepository, P: ProgressRepository>(
    courses: &C,
    progress: &P,
    caller: &Caller,
    course_id: CourseId,
    chapter_id: ChapterId,
    is_completed: bool,
) -> Result<UserProgress, CourseError> {
    let chapter = courses
        .find_chapter(course_id, chapter_id)
        .await?
        .ok_or(CourseError::ChapterNotFound)?;

    let saved = progress
        .upsert_progress(caller.id, chapter.id, is_completed)
        .await?;
    tracing::debug!(chapter_id = %chapter.id, user_id = %caller.id, is_completed, "progress saved");
    Ok(saved)
}

/// Purchased courses of the caller, split by whether every published chapter is done.
pub async fn dashboard<C: CourseRepository, P: ProgressRepository>(
    courses: &C,
    progress: &P,
    caller: &Caller,
) -> Result<Dashboard, RepositoryError> {
    let mut dashboard = Dashboard::default();

    for course in courses.list_purchased_courses(caller.id).await? {
        let counts = progress.count_progress(caller.id, course.id).await?;
        let entry = DashboardCourse {
            course,
            progress: counts.percentage(),
        };
        if entry.progress >= 100.0 {
            dashboard.completed_courses.push(entry);
        } else {
            dashboard.courses_in_progress.push(entry);
        }
    }

    Ok(dashboard)
}

/// Revenue per course owned by the caller, ordered by course title.
pub async fn analytics<C: CourseRepository>(
    courses: &C,
    caller: &Caller,
) -> Result<Analytics, RepositoryError> {
    let sales = courses.list_sales(caller.id).await?;
    let total_sales = sales.len();

    let data = sales
        .into_iter()
        .into_group_map_by(|sale| sale.course_id)
        .into_values()
        .map(|sales| CourseRevenue {
            name: sales[0].title.clone(),
            total: sales.iter().filter_map(|sale| sale.price).sum(),
        })
        .sorted_by(|a, b| a.name.cmp(&b.name))
        .collect::<Vec<_>>();
    let total_revenue = data.iter().map(|revenue| revenue.total).sum();

    Ok(Analytics {
        data,
        total_revenue,
        total_sales,
    })
}
