//! Turns data catalog metadata into a system prompt
//!
//! The prompt lists databases with their tables and column types, so the model can answer
//! questions about the user's data and write queries against it. Large catalogs are cut off after
//! `max_tables` tables; databases past the cut are named, but their tables are never read.
use std::{fmt::Write as _, sync::Arc};

use bedrock_chat_core::{
    DataCatalog,
    catalog::{ColumnInfo, TableInfo},
    errors::CatalogError,
};
use indoc::indoc;

const DEFAULT_MAX_TABLES: usize = 50;

const PREAMBLE: &str = indoc! {"
    You are a helpful assistant with access to the metadata of the user's AWS Glue Data Catalog.
    Use it when the user asks about their data, and refer to databases and tables by name.
    Do not invent tables or columns that are not listed below.
"};

#[derive(Clone, Debug)]
pub struct CatalogContext {
    catalog: Arc<dyn DataCatalog>,
    max_tables: usize,
}

impl CatalogContext {
    pub fn new(catalog: Arc<dyn DataCatalog>) -> Self {
        Self {
            catalog,
            max_tables: DEFAULT_MAX_TABLES,
        }
    }

    #[must_use]
    pub fn with_max_tables(mut self, max_tables: usize) -> Self {
        self.max_tables = max_tables;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn DataCatalog> {
        &self.catalog
    }

    /// Renders the catalog as a system prompt
    ///
    /// Databases whose tables cannot be listed are mentioned without tables. Once `max_tables`
    /// tables are rendered no further tables are listed.
    ///
    /// # Errors
    ///
    /// Errors if the databases cannot be listed at all
    #[tracing::instrument(skip_all, err)]
    pub async fn system_prompt(&self) -> Result<String, CatalogError> {
        let databases = self.catalog.list_databases().await?;

        let mut prompt = String::from(PREAMBLE);
        let mut rendered = 0usize;
        let mut omitted = 0usize;
        let mut remaining = databases.iter();

        for database in remaining.by_ref() {
            let _ = write!(prompt, "\n## Database `{}`", database.name);
            if let Some(description) = &database.description {
                let _ = write!(prompt, ": {description}");
            }
            prompt.push('\n');

            let tables = match self.catalog.list_tables(&database.name).await {
                Ok(tables) => tables,
                Err(error) => {
                    tracing::warn!(database = %database.name, %error, "Tables unavailable for context");
                    prompt.push_str("(tables unavailable)\n");
                    continue;
                }
            };

            for table in &tables {
                if rendered >= self.max_tables {
                    omitted += 1;
                    continue;
                }
                render_table(&mut prompt, table);
                rendered += 1;
            }

            if rendered >= self.max_tables {
                break;
            }
        }

        let unread = remaining
            .map(|database| format!("`{}`", database.name))
            .collect::<Vec<_>>();

        if databases.is_empty() {
            prompt.push_str("\nThe catalog has no databases.\n");
        }
        if !unread.is_empty() {
            let _ = writeln!(prompt, "\nOther databases: {}", unread.join(", "));
        }
        if omitted > 0 || !unread.is_empty() {
            let _ = writeln!(
                prompt,
                "\n(only the first {} tables are shown)",
                self.max_tables
            );
        }

        tracing::debug!(
            databases = databases.len(),
            tables = rendered,
            omitted,
            unread = unread.len(),
            "Rendered catalog context"
        );

        Ok(prompt)
    }
}

fn render_table(prompt: &mut String, table: &TableInfo) {
    let _ = write!(prompt, "- `{}`", table.name);
    if let Some(table_type) = &table.table_type {
        let _ = write!(prompt, " ({table_type})");
    }

    let columns = table
        .columns
        .iter()
        .map(render_column)
        .chain(
            table
                .partition_keys
                .iter()
                .map(|key| format!("{} [partition]", render_column(key))),
        )
        .collect::<Vec<_>>();

    if !columns.is_empty() {
        let _ = write!(prompt, ": {}", columns.join(", "));
    }
    prompt.push('\n');
}

fn render_column(column: &ColumnInfo) -> String {
    match &column.data_type {
        Some(data_type) => format!("{} {data_type}", column.name),
        None => column.name.clone(),
    }
}
