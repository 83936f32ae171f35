//! Data catalog metadata that can be offered to the model as context
//!
//! The required methods map one-to-one on catalog reads. Search and statistics are provided on
//! top of them, so every implementation gets the same semantics.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::CatalogError;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub description: Option<String>,
    pub location_uri: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub parameters: HashMap<String, String>,
    pub catalog_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub database_name: String,
    pub owner: Option<String>,
    pub table_type: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub last_access_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub serde_library: Option<String>,
    pub compressed: bool,
    pub number_of_buckets: i32,
    pub bucket_columns: Vec<String>,
    pub columns: Vec<ColumnInfo>,
    pub partition_keys: Vec<ColumnInfo>,
    pub parameters: HashMap<String, String>,
    pub retention: i32,
}

/// A table whose name matched a search term
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableMatch {
    pub database_name: String,
    pub table_name: String,
    pub table_type: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

impl From<&TableInfo> for TableMatch {
    fn from(table: &TableInfo) -> Self {
        Self {
            database_name: table.database_name.clone(),
            table_name: table.name.clone(),
            table_type: table.table_type.clone(),
            create_time: table.create_time,
            location: table.location.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub database_name: String,
    /// `None` if the tables of this database could not be listed
    pub table_count: Option<usize>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_databases: usize,
    pub total_tables: usize,
    pub databases: Vec<DatabaseStats>,
}

#[async_trait]
pub trait DataCatalog: Send + Sync + std::fmt::Debug {
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>, CatalogError>;

    async fn database(&self, name: &str) -> Result<DatabaseInfo, CatalogError>;

    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>, CatalogError>;

    async fn table(&self, database: &str, name: &str) -> Result<TableInfo, CatalogError>;

    /// Case insensitive substring search on table names across all databases
    ///
    /// Databases whose tables cannot be listed are skipped.
    async fn search_tables(&self, term: &str) -> Result<Vec<TableMatch>, CatalogError> {
        tracing::debug!(term, "Searching catalog tables");
        let needle = term.to_lowercase();
        let mut found = Vec::new();

        for database in self.list_databases().await? {
            let tables = match self.list_tables(&database.name).await {
                Ok(tables) => tables,
                Err(error) => {
                    tracing::warn!(database = %database.name, %error, "Skipping database in search");
                    continue;
                }
            };

            found.extend(
                tables
                    .iter()
                    .filter(|table| table.name.to_lowercase().contains(&needle))
                    .map(TableMatch::from),
            );
        }

        Ok(found)
    }

    /// Table counts per database
    async fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let databases = self.list_databases().await?;
        let mut stats = Vec::with_capacity(databases.len());

        for database in databases {
            let table_count = match self.list_tables(&database.name).await {
                Ok(tables) => Some(tables.len()),
                Err(error) => {
                    tracing::warn!(database = %database.name, %error, "Failed to count tables");
                    None
                }
            };

            stats.push(DatabaseStats {
                database_name: database.name,
                table_count,
                description: database.description,
            });
        }

        Ok(CatalogStats {
            total_databases: stats.len(),
            total_tables: stats.iter().filter_map(|db| db.table_count).sum(),
            databases: stats,
        })
    }
}
