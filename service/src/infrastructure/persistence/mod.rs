use coursehub_common::database::Database;

mod courses;
mod enrollment;
mod notifications;
mod progress;
mod result;
mod users;

/// Postgres implementation of every domain repository, sharing one connection pool.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    database: &'static Database,
}

impl PostgresRepository {
    pub fn new(database: &'static Database) -> Self {
        Self { database }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.database.database_pool()
    }
}
