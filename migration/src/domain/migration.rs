use coursehub_common::schema::{Column, ForeignKeyConstraint, Index, OnDelete, Table};

use crate::domain::persistence::Persistence;

/// Creates the tables of the schema definition missing from the database.
pub struct Migration<P: Persistence> {
    tables: Vec<Table>,
    persistence: P,
}

/// One unit of migration, applied in a single transaction
#[derive(Debug)]
pub struct MigrationStep {
    table_name: String,
    ddls: Vec<String>,
}

impl MigrationStep {
    fn create_table(database_schema: &str, table: &Table) -> Self {
        Self {
            table_name: table.name.clone(),
            ddls: create_table_ddl(database_schema, table),
        }
    }

    pub fn ctx(&self) -> String {
        format!("CREATE TABLE {}", self.table_name)
    }

    pub fn into_ddls(self) -> Vec<String> {
        self.ddls
    }
}

impl<P: Persistence> Migration<P> {
    pub fn new(tables: Vec<Table>, persistence: P) -> Self {
        Self {
            tables,
            persistence,
        }
    }

    /// Returns the number of created tables.
    pub async fn migrate(&self) -> Result<usize, anyhow::Error> {
        let actual_schema = self.persistence.load().await?;

        let steps = self
            .tables
            .iter()
            .filter(|table| !actual_schema.contains(&table.name))
            .map(|table| MigrationStep::create_table(self.persistence.database_schema(), table))
            .collect::<Vec<_>>();

        let count = steps.len();
        self.persistence.apply_migration_steps(steps).await?;
        Ok(count)
    }
}

fn create_table_ddl(schema: &str, table: &Table) -> Vec<String> {
    let mut columns = Vec::new();
    let mut pk_columns = Vec::new();

    for column in table.columns.iter() {
        columns.push(column_ddl(column));
        if column.primary_key {
            pk_columns.push(format!("\"{}\"", column.name));
        }
    }

    let columns_sql = columns.join(",\n    ");
    let pk_columns_sql = pk_columns.join(",");

    let table_ddl = format!(
        "CREATE TABLE \"{}\".\"{}\" (\n    {},\n    PRIMARY KEY({})\n)",
        schema, table.name, columns_sql, pk_columns_sql
    );

    let mut ddls = vec![table_ddl];

    for fk in table.foreign_keys.iter() {
        ddls.push(create_fk_ddl(schema, fk));
    }

    for index in table.indexes.iter() {
        ddls.push(create_index_ddl(schema, index));
    }

    ddls
}

fn column_ddl(column: &Column) -> String {
    let mut sql = format!("\"{}\" {}", column.name, column.column_type);
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if let Some(default_value) = &column.default_value {
        sql.push_str(format!(" DEFAULT {}", default_value).as_str());
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    sql
}

fn create_fk_ddl(schema: &str, fk: &ForeignKeyConstraint) -> String {
    let on_delete = match fk.on_delete {
        OnDelete::Cascade => "CASCADE",
        OnDelete::SetNull => "SET NULL",
    };
    format!(
        "ALTER TABLE \"{}\".\"{}\" ADD CONSTRAINT \"{}_{}_fkey\" FOREIGN KEY (\"{}\") REFERENCES \"{}\".\"{}\" (\"{}\") ON DELETE {}",
        schema,
        fk.table_name,
        fk.table_name,
        fk.column_name,
        fk.column_name,
        schema,
        fk.referenced_table_name,
        fk.referenced_column_name,
        on_delete
    )
}

fn create_index_ddl(schema: &str, index: &Index) -> String {
    let columns_sql = index
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE {}INDEX \"{}_{}_idx\" ON \"{}\".\"{}\" ({})",
        if index.unique { "UNIQUE " } else { "" },
        index.table_name,
        index.columns.join("_"),
        schema,
        index.table_name,
        columns_sql
    )
}
