//! AWS Glue Data Catalog as a [`DataCatalog`]
//!
//! Databases and tables are read on demand; every listing follows `NextToken` until exhausted.
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use aws_sdk_glue::{
    Client,
    error::SdkError,
    primitives::DateTime as AwsDateTime,
    types::{Column, Database, Table},
};
use bedrock_chat_core::{
    DataCatalog,
    catalog::{ColumnInfo, DatabaseInfo, TableInfo},
    errors::CatalogError,
};
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use tokio::runtime::Handle;

#[cfg(test)]
use mockall::automock;

/// Reads databases and tables from the Glue Data Catalog of the configured account and region
#[derive(Debug, Clone, Builder)]
#[builder(setter(strip_option), build_fn(error = anyhow::Error))]
pub struct AwsGlue {
    #[builder(default = self.default_client(), setter(custom))]
    client: Arc<dyn GlueCatalog>,
}

/// One page of a paginated Glue listing
#[derive(Debug, Clone, Default)]
pub(crate) struct Page<T> {
    items: Vec<T>,
    next_token: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
trait GlueCatalog: std::fmt::Debug + Send + Sync {
    async fn databases_page(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<Database>, CatalogError>;

    async fn database(&self, name: &str) -> Result<Database, CatalogError>;

    async fn tables_page(
        &self,
        database: &str,
        next_token: Option<String>,
    ) -> Result<Page<Table>, CatalogError>;

    async fn table(&self, database: &str, name: &str) -> Result<Table, CatalogError>;
}

#[async_trait]
impl GlueCatalog for Client {
    async fn databases_page(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<Database>, CatalogError> {
        let response = self
            .get_databases()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(SdkError::into_service_error)
            .context("Failed to list databases")
            .map_err(CatalogError::unavailable)?;

        Ok(Page {
            items: response.database_list().to_vec(),
            next_token: response.next_token().map(ToString::to_string),
        })
    }

    async fn database(&self, name: &str) -> Result<Database, CatalogError> {
        let response = match self.get_database().name(name).send().await {
            Ok(response) => response,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_entity_not_found_exception() {
                    return Err(CatalogError::NotFound(format!("database {name}")));
                }
                return Err(CatalogError::unavailable(
                    anyhow::Error::from(err).context(format!("Failed to get database {name}")),
                ));
            }
        };

        response
            .database()
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("database {name}")))
    }

    async fn tables_page(
        &self,
        database: &str,
        next_token: Option<String>,
    ) -> Result<Page<Table>, CatalogError> {
        let response = match self
            .get_tables()
            .database_name(database)
            .set_next_token(next_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_entity_not_found_exception() {
                    return Err(CatalogError::NotFound(format!("database {database}")));
                }
                return Err(CatalogError::unavailable(
                    anyhow::Error::from(err)
                        .context(format!("Failed to list tables of {database}")),
                ));
            }
        };

        Ok(Page {
            items: response.table_list().to_vec(),
            next_token: response.next_token().map(ToString::to_string),
        })
    }

    async fn table(&self, database: &str, name: &str) -> Result<Table, CatalogError> {
        let response = match self
            .get_table()
            .database_name(database)
            .name(name)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_entity_not_found_exception() {
                    return Err(CatalogError::NotFound(format!("table {database}.{name}")));
                }
                return Err(CatalogError::unavailable(
                    anyhow::Error::from(err)
                        .context(format!("Failed to get table {database}.{name}")),
                ));
            }
        };

        response
            .table()
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("table {database}.{name}")))
    }
}

impl AwsGlue {
    pub fn builder() -> AwsGlueBuilder {
        AwsGlueBuilder::default()
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Arc::new(Client::new(config)),
        }
    }
}

impl AwsGlueBuilder {
    #[allow(clippy::unused_self)]
    fn default_client(&self) -> Arc<Client> {
        let config = tokio::task::block_in_place(|| {
            Handle::current().block_on(async { aws_config::from_env().load().await })
        });
        Arc::new(Client::new(&config))
    }

    /// Set the aws glue client
    pub fn client(&mut self, client: Client) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }

    #[cfg(test)]
    #[allow(private_bounds)]
    pub fn test_client(&mut self, client: impl GlueCatalog + 'static) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }
}

fn to_chrono(time: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
    time.and_then(|time| DateTime::from_timestamp(time.secs(), time.subsec_nanos()))
}

fn to_column(column: &Column) -> ColumnInfo {
    ColumnInfo {
        name: column.name().to_string(),
        data_type: column.r#type().map(ToString::to_string),
        comment: column.comment().map(ToString::to_string),
    }
}

fn to_database(database: &Database) -> DatabaseInfo {
    DatabaseInfo {
        name: database.name().to_string(),
        description: database.description().map(ToString::to_string),
        location_uri: database.location_uri().map(ToString::to_string),
        create_time: to_chrono(database.create_time()),
        parameters: database.parameters().cloned().unwrap_or_default(),
        catalog_id: database.catalog_id().map(ToString::to_string),
    }
}

fn to_table(database: &str, table: &Table) -> TableInfo {
    let storage = table.storage_descriptor();

    TableInfo {
        name: table.name().to_string(),
        database_name: table.database_name().unwrap_or(database).to_string(),
        owner: table.owner().map(ToString::to_string),
        table_type: table.table_type().map(ToString::to_string),
        create_time: to_chrono(table.create_time()),
        update_time: to_chrono(table.update_time()),
        last_access_time: to_chrono(table.last_access_time()),
        location: storage
            .and_then(|s| s.location())
            .map(ToString::to_string),
        input_format: storage
            .and_then(|s| s.input_format())
            .map(ToString::to_string),
        output_format: storage
            .and_then(|s| s.output_format())
            .map(ToString::to_string),
        serde_library: storage
            .and_then(|s| s.serde_info())
            .and_then(|serde| serde.serialization_library())
            .map(ToString::to_string),
        compressed: storage.is_some_and(|s| s.compressed()),
        number_of_buckets: storage.map_or(0, |s| s.number_of_buckets()),
        bucket_columns: storage
            .map(|s| s.bucket_columns().to_vec())
            .unwrap_or_default(),
        columns: storage
            .map(|s| s.columns().iter().map(to_column).collect())
            .unwrap_or_default(),
        partition_keys: table.partition_keys().iter().map(to_column).collect(),
        parameters: table.parameters().cloned().unwrap_or_default(),
        retention: table.retention(),
    }
}

#[async_trait]
impl DataCatalog for AwsGlue {
    #[tracing::instrument(skip_all, err)]
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>, CatalogError> {
        let mut databases = Vec::new();
        let mut next_token = None;

        loop {
            let page = self.client.databases_page(next_token).await?;
            databases.extend(page.items.iter().map(to_database));

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = databases.len(), "Listed databases");
        Ok(databases)
    }

    #[tracing::instrument(skip(self), err)]
    async fn database(&self, name: &str) -> Result<DatabaseInfo, CatalogError> {
        let database = self.client.database(name).await?;
        Ok(to_database(&database))
    }

    #[tracing::instrument(skip(self), err)]
    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>, CatalogError> {
        let mut tables = Vec::new();
        let mut next_token = None;

        loop {
            let page = self.client.tables_page(database, next_token).await?;
            tables.extend(page.items.iter().map(|table| to_table(database, table)));

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    #[tracing::instrument(skip(self), err)]
    async fn table(&self, database: &str, name: &str) -> Result<TableInfo, CatalogError> {
        let table = self.client.table(database, name).await?;
        Ok(to_table(database, &table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_glue::types::StorageDescriptor;
    use mockall::{Sequence, predicate::eq};
    use pretty_assertions::assert_eq;

    fn database(name: &str) -> Database {
        Database::builder()
            .name(name)
            .description(format!("{name} data"))
            .create_time(AwsDateTime::from_secs(1_700_000_000))
            .build()
            .unwrap()
    }

    fn table(name: &str) -> Table {
        Table::builder()
            .name(name)
            .table_type("EXTERNAL_TABLE")
            .storage_descriptor(
                StorageDescriptor::builder()
                    .columns(
                        Column::builder()
                            .name("order_id")
                            .r#type("bigint")
                            .build()
                            .unwrap(),
                    )
                    .location(format!("s3://lake/{name}/"))
                    .build(),
            )
            .partition_keys(Column::builder().name("dt").r#type("string").build().unwrap())
            .build()
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_list_databases_follows_pagination() {
        let mut mock = MockGlueCatalog::new();
        let mut seq = Sequence::new();

        mock.expect_databases_page()
            .with(eq(None::<String>))
            .once()
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(Page {
                    items: vec![database("sales")],
                    next_token: Some("page-2".to_string()),
                })
            });
        mock.expect_databases_page()
            .with(eq(Some("page-2".to_string())))
            .once()
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(Page {
                    items: vec![database("logs")],
                    next_token: None,
                })
            });

        let glue = AwsGlue::builder().test_client(mock).build().unwrap();
        let databases = glue.list_databases().await.unwrap();

        let names = databases.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["sales", "logs"]);
        assert_eq!(databases[0].description.as_deref(), Some("sales data"));
        assert_eq!(
            databases[0].create_time,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_list_tables_maps_storage_descriptor() {
        let mut mock = MockGlueCatalog::new();
        mock.expect_tables_page()
            .withf(|database, token| database.to_string() == "sales" && token.is_none())
            .once()
            .returning(|_, _| {
                Ok(Page {
                    items: vec![table("orders")],
                    next_token: Some(String::new()),
                })
            });

        let glue = AwsGlue::builder().test_client(mock).build().unwrap();
        let tables = glue.list_tables("sales").await.unwrap();

        assert_eq!(tables.len(), 1);
        let orders = &tables[0];
        assert_eq!(orders.name, "orders");
        // Glue omits the database name in some responses
        assert_eq!(orders.database_name, "sales");
        assert_eq!(orders.location.as_deref(), Some("s3://lake/orders/"));
        assert_eq!(
            orders.columns,
            vec![ColumnInfo {
                name: "order_id".into(),
                data_type: Some("bigint".into()),
                comment: None,
            }]
        );
        assert_eq!(orders.partition_keys[0].name, "dt");
    }

    #[test_log::test(tokio::test)]
    async fn test_not_found_is_passed_through() {
        let mut mock = MockGlueCatalog::new();
        mock.expect_table()
            .once()
            .returning(|database, name| {
                Err(CatalogError::NotFound(format!("table {database}.{name}")))
            });

        let glue = AwsGlue::builder().test_client(mock).build().unwrap();
        let err = glue.table("sales", "missing").await.unwrap_err();

        assert!(matches!(err, CatalogError::NotFound(ref what) if what == "table sales.missing"));
    }

    #[test_log::test(tokio::test)]
    async fn test_search_uses_paginated_listings() {
        let mut mock = MockGlueCatalog::new();
        mock.expect_databases_page().returning(|_| {
            Ok(Page {
                items: vec![database("sales"), database("restricted")],
                next_token: None,
            })
        });
        mock.expect_tables_page().returning(|database, _| {
            if database == "restricted" {
                return Err(CatalogError::unavailable(anyhow::anyhow!("AccessDenied")));
            }
            Ok(Page {
                items: vec![table("orders"), table("customers")],
                next_token: None,
            })
        });

        let glue = AwsGlue::builder().test_client(mock).build().unwrap();
        let found = glue.search_tables("ORD").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].table_name, "orders");
        assert_eq!(found[0].database_name, "sales");
    }
}
