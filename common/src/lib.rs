pub mod database;
pub mod domain;
pub mod schema;

// Table names

pub const USERS_TABLE: &str = "users";
pub const CATEGORIES_TABLE: &str = "categories";
pub const COURSES_TABLE: &str = "courses";
pub const CHAPTERS_TABLE: &str = "chapters";
pub const ATTACHMENTS_TABLE: &str = "attachments";
pub const PURCHASES_TABLE: &str = "purchases";
pub const PENDING_PURCHASES_TABLE: &str = "pending_purchases";
pub const USER_PROGRESS_TABLE: &str = "user_progress";
pub const NOTIFICATIONS_TABLE: &str = "notifications";

// Shared field names

pub const ID_FIELD_NAME: &str = "id";
pub const USER_ID_FIELD_NAME: &str = "user_id";
pub const COURSE_ID_FIELD_NAME: &str = "course_id";
pub const CHAPTER_ID_FIELD_NAME: &str = "chapter_id";

pub const CREATED_FIELD_NAME: &str = "created_at";
pub const UPDATED_FIELD_NAME: &str = "updated_at";

// expose domain module

pub use domain::*;

// expose database module

pub use database::connect as connect_to_database;
