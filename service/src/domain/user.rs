use chrono::{DateTime, Utc};
use coursehub_common::Role;
use serde::Serialize;

use crate::domain::identity::Admin;
use crate::domain::ids::UserId;
use crate::domain::repository::{RepositoryError, UserRepository};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

/// Platform wide totals shown on the admin overview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCounts {
    pub total_courses: i64,
    pub published_courses: i64,
    pub total_users: i64,
    pub total_purchases: i64,
    pub pending_payments: i64,
    pub completed_chapters: i64,
}

/// Flips the ban flag of a user. Banned users are refused by every
/// authenticated route.
pub async fn toggle_ban<U: UserRepository>(
    users: &U,
    admin: &Admin,
    user_id: UserId,
) -> Result<User, RepositoryError> {
    let user = users
        .toggle_ban(user_id)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    tracing::info!(
        admin_id = %admin.id(),
        user_id = %user.id,
        is_banned = user.is_banned,
        "user ban toggled"
    );
    Ok(user)
}

pub async fn list_users<U: UserRepository>(
    users: &U,
    _admin: &Admin,
) -> Result<Vec<User>, RepositoryError> {
    users.list_users().await
}

pub async fn admin_overview<U: UserRepository>(
    users: &U,
    _admin: &Admin,
) -> Result<PlatformCounts, RepositoryError> {
    users.count_platform().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::Caller;
    use crate::domain::test_utils::MemoryStore;

    fn admin(store: &MemoryStore) -> Admin {
        Caller {
            id: store.add_user(Role::Admin),
            role: Role::Admin,
        }
        .require_admin()
        .unwrap()
    }

    #[tokio::test]
    async fn users_are_listed_newest_first() {
        let store = MemoryStore::default();
        let admin = admin(&store);
        let student = store.add_user(Role::Student);

        let users = list_users(&store, &admin).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, student);
        assert_eq!(users[1].id, admin.id());
    }

    #[tokio::test]
    async fn overview_counts_platform_activity() {
        let store = MemoryStore::default();
        let admin = admin(&store);
        let student = store.add_user(Role::Student);
        let course_id = store.add_course(Some(20.0), None);
        let draft = store.add_course(None, None);
        store.set_published(draft, false);
        store.add_purchase(student, course_id);

        let counts = admin_overview(&store, &admin).await.unwrap();
        assert_eq!(
            counts,
            PlatformCounts {
                total_courses: 2,
                published_courses: 1,
                // the admin, the student and one instructor per course
                total_users: 4,
                total_purchases: 1,
                pending_payments: 0,
                completed_chapters: 0,
            }
        );
    }
}
