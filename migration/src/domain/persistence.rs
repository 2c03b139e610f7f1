use std::collections::HashSet;

use crate::domain::migration::MigrationStep;

pub trait Persistence: Send + Sync + Clone + 'static {
    /// load names of the tables present in the database schema
    fn load(&self) -> impl Future<Output = Result<HashSet<String>, anyhow::Error>>;
    /// apply migration steps to database, each one in its own transaction
    fn apply_migration_steps(
        &self,
        steps: Vec<MigrationStep>,
    ) -> impl Future<Output = Result<(), anyhow::Error>>;
    /// extract database schema
    fn database_schema(&self) -> &str;
}
