//! Relational schema of the platform, used for ddl generation.

use std::fmt::{Display, Formatter};

use crate::{
    ATTACHMENTS_TABLE, CATEGORIES_TABLE, CHAPTER_ID_FIELD_NAME, CHAPTERS_TABLE,
    COURSE_ID_FIELD_NAME, COURSES_TABLE, CREATED_FIELD_NAME, ID_FIELD_NAME, NOTIFICATIONS_TABLE,
    PENDING_PURCHASES_TABLE, PURCHASES_TABLE, UPDATED_FIELD_NAME, USER_ID_FIELD_NAME,
    USER_PROGRESS_TABLE, USERS_TABLE,
};

/// Represents table in a database
#[derive(Debug)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub indexes: Vec<Index>,
}

/// Represents one column in the database table
#[derive(Debug)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

/// Represents Column types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    Integer,
    Double,
    TimestampTZ,
    Boolean,
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sql = match self {
            ColumnType::Uuid => "UUID",
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::TimestampTZ => "TIMESTAMPTZ",
            ColumnType::Boolean => "BOOLEAN",
        };
        f.write_str(sql)
    }
}

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

/// Represents foreign key constraint in the database table
#[derive(Debug)]
pub struct ForeignKeyConstraint {
    pub table_name: String,
    pub column_name: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
    pub on_delete: OnDelete,
}

/// Represents an index in the database table
#[derive(Debug)]
pub struct Index {
    pub table_name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        foreign_keys: Vec<ForeignKeyConstraint>,
        indexes: Vec<Index>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            foreign_keys,
            indexes,
        }
    }
}

impl Column {
    pub fn new<T: Into<String>>(
        name: T,
        column_type: ColumnType,
        not_null: bool,
        unique: bool,
        default_value: Option<T>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null,
            unique,
            primary_key: false,
            default_value: default_value.map(T::into),
        }
    }

    pub fn primary_key<T: Into<String>>(name: T, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: true,
            unique: false,
            primary_key: true,
            default_value: None,
        }
    }

    fn required(name: &str, column_type: ColumnType) -> Self {
        Self::new(name, column_type, true, false, None)
    }

    fn optional(name: &str, column_type: ColumnType) -> Self {
        Self::new(name, column_type, false, false, None)
    }

    fn flag(name: &str, default: &str) -> Self {
        Self::new(name, ColumnType::Boolean, true, false, Some(default))
    }

    fn created_at() -> Self {
        Self::new(CREATED_FIELD_NAME, ColumnType::TimestampTZ, true, false, Some("now()"))
    }

    fn updated_at() -> Self {
        Self::new(UPDATED_FIELD_NAME, ColumnType::TimestampTZ, true, false, Some("now()"))
    }
}

impl ForeignKeyConstraint {
    pub fn new<T: Into<String>>(
        table_name: T,
        column_name: T,
        referenced_table_name: T,
        referenced_column_name: T,
        on_delete: OnDelete,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
            referenced_table_name: referenced_table_name.into(),
            referenced_column_name: referenced_column_name.into(),
            on_delete,
        }
    }

    fn cascade(table_name: &str, column_name: &str, referenced_table_name: &str) -> Self {
        Self::new(
            table_name,
            column_name,
            referenced_table_name,
            ID_FIELD_NAME,
            OnDelete::Cascade,
        )
    }
}

impl Index {
    pub fn new<T: Into<String>>(table_name: T, columns: Vec<T>, unique: bool) -> Self {
        Self {
            table_name: table_name.into(),
            columns: columns.into_iter().map(T::into).collect(),
            unique,
        }
    }
}

/// All tables of the platform, ordered so that referenced tables come first.
pub fn tables() -> Vec<Table> {
    vec![
        users(),
        categories(),
        courses(),
        chapters(),
        attachments(),
        purchases(),
        pending_purchases(),
        user_progress(),
        notifications(),
    ]
}

fn users() -> Table {
    Table::new(
        USERS_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::optional("name", ColumnType::Text),
            Column::new("email", ColumnType::Text, true, true, None),
            Column::new("role", ColumnType::Text, true, false, Some("'STUDENT'")),
            Column::flag("is_banned", "false"),
            Column::created_at(),
        ],
        Vec::new(),
        Vec::new(),
    )
}

fn categories() -> Table {
    Table::new(
        CATEGORIES_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::new("name", ColumnType::Text, true, true, None),
        ],
        Vec::new(),
        Vec::new(),
    )
}

fn courses() -> Table {
    Table::new(
        COURSES_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(USER_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required("title", ColumnType::Text),
            Column::optional("description", ColumnType::Text),
            Column::optional("image_url", ColumnType::Text),
            Column::optional("price", ColumnType::Double),
            Column::optional("category_id", ColumnType::Uuid),
            Column::flag("is_published", "false"),
            Column::optional("max_capacity", ColumnType::Integer),
            Column::flag("is_live", "false"),
            Column::optional("live_url", ColumnType::Text),
            Column::optional("start_date", ColumnType::TimestampTZ),
            Column::created_at(),
            Column::updated_at(),
        ],
        vec![
            ForeignKeyConstraint::cascade(COURSES_TABLE, USER_ID_FIELD_NAME, USERS_TABLE),
            ForeignKeyConstraint::new(
                COURSES_TABLE,
                "category_id",
                CATEGORIES_TABLE,
                ID_FIELD_NAME,
                OnDelete::SetNull,
            ),
        ],
        vec![
            Index::new(COURSES_TABLE, vec![USER_ID_FIELD_NAME], false),
            Index::new(COURSES_TABLE, vec!["category_id"], false),
        ],
    )
}

fn chapters() -> Table {
    Table::new(
        CHAPTERS_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(COURSE_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required("title", ColumnType::Text),
            Column::optional("description", ColumnType::Text),
            Column::optional("video_url", ColumnType::Text),
            Column::required("position", ColumnType::Integer),
            Column::flag("is_published", "false"),
            Column::flag("is_free", "false"),
            Column::created_at(),
            Column::updated_at(),
        ],
        vec![ForeignKeyConstraint::cascade(
            CHAPTERS_TABLE,
            COURSE_ID_FIELD_NAME,
            COURSES_TABLE,
        )],
        vec![Index::new(CHAPTERS_TABLE, vec![COURSE_ID_FIELD_NAME], false)],
    )
}

fn attachments() -> Table {
    Table::new(
        ATTACHMENTS_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(COURSE_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required("name", ColumnType::Text),
            Column::required("url", ColumnType::Text),
            Column::created_at(),
        ],
        vec![ForeignKeyConstraint::cascade(
            ATTACHMENTS_TABLE,
            COURSE_ID_FIELD_NAME,
            COURSES_TABLE,
        )],
        vec![Index::new(ATTACHMENTS_TABLE, vec![COURSE_ID_FIELD_NAME], false)],
    )
}

fn purchases() -> Table {
    Table::new(
        PURCHASES_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(USER_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(COURSE_ID_FIELD_NAME, ColumnType::Uuid),
            Column::created_at(),
        ],
        vec![
            ForeignKeyConstraint::cascade(PURCHASES_TABLE, USER_ID_FIELD_NAME, USERS_TABLE),
            ForeignKeyConstraint::cascade(PURCHASES_TABLE, COURSE_ID_FIELD_NAME, COURSES_TABLE),
        ],
        vec![
            Index::new(
                PURCHASES_TABLE,
                vec![USER_ID_FIELD_NAME, COURSE_ID_FIELD_NAME],
                true,
            ),
            Index::new(PURCHASES_TABLE, vec![COURSE_ID_FIELD_NAME], false),
        ],
    )
}

fn pending_purchases() -> Table {
    Table::new(
        PENDING_PURCHASES_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(USER_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(COURSE_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required("order_id", ColumnType::Text),
            Column::optional("proof_image_url", ColumnType::Text),
            Column::new("status", ColumnType::Text, true, false, Some("'PENDING'")),
            Column::optional("admin_note", ColumnType::Text),
            Column::created_at(),
            Column::updated_at(),
        ],
        vec![
            ForeignKeyConstraint::cascade(
                PENDING_PURCHASES_TABLE,
                USER_ID_FIELD_NAME,
                USERS_TABLE,
            ),
            ForeignKeyConstraint::cascade(
                PENDING_PURCHASES_TABLE,
                COURSE_ID_FIELD_NAME,
                COURSES_TABLE,
            ),
        ],
        vec![
            Index::new(
                PENDING_PURCHASES_TABLE,
                vec![USER_ID_FIELD_NAME, COURSE_ID_FIELD_NAME],
                true,
            ),
            Index::new(PENDING_PURCHASES_TABLE, vec!["status"], false),
        ],
    )
}

fn user_progress() -> Table {
    Table::new(
        USER_PROGRESS_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(USER_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(CHAPTER_ID_FIELD_NAME, ColumnType::Uuid),
            Column::flag("is_completed", "false"),
            Column::created_at(),
            Column::updated_at(),
        ],
        vec![
            ForeignKeyConstraint::cascade(USER_PROGRESS_TABLE, USER_ID_FIELD_NAME, USERS_TABLE),
            ForeignKeyConstraint::cascade(
                USER_PROGRESS_TABLE,
                CHAPTER_ID_FIELD_NAME,
                CHAPTERS_TABLE,
            ),
        ],
        vec![
            Index::new(
                USER_PROGRESS_TABLE,
                vec![USER_ID_FIELD_NAME, CHAPTER_ID_FIELD_NAME],
                true,
            ),
            Index::new(USER_PROGRESS_TABLE, vec![CHAPTER_ID_FIELD_NAME], false),
        ],
    )
}

fn notifications() -> Table {
    Table::new(
        NOTIFICATIONS_TABLE,
        vec![
            Column::primary_key(ID_FIELD_NAME, ColumnType::Uuid),
            Column::required(USER_ID_FIELD_NAME, ColumnType::Uuid),
            Column::required("title", ColumnType::Text),
            Column::required("message", ColumnType::Text),
            Column::flag("is_read", "false"),
            Column::created_at(),
        ],
        vec![ForeignKeyConstraint::cascade(
            NOTIFICATIONS_TABLE,
            USER_ID_FIELD_NAME,
            USERS_TABLE,
        )],
        vec![Index::new(NOTIFICATIONS_TABLE, vec![USER_ID_FIELD_NAME], false)],
    )
}
