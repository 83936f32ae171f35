#![allow(clippy::missing_panics_doc)]
//! Test doubles for the core traits
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use crate::{
    catalog::{ColumnInfo, DataCatalog, DatabaseInfo, TableInfo},
    errors::{CatalogError, ChatError},
    generation::{Generation, GenerationRequest},
    traits::LanguageModel,
};

type Expectation = (Option<GenerationRequest>, Result<Generation, ChatError>);
type Expectations = Arc<Mutex<Vec<Expectation>>>;
type Received = Arc<Mutex<Vec<(GenerationRequest, Result<Generation, String>)>>>;

/// A language model that replays queued responses
///
/// Expectations are consumed in the order they were added. If an expectation carries a request,
/// the received request must equal it. Dropping the last clone panics if expectations are left.
#[derive(Clone)]
pub struct MockLanguageModel {
    model_id: String,
    expectations: Expectations,
    received: Received,
}

impl std::fmt::Debug for MockLanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLanguageModel")
            .field("model_id", &self.model_id)
            .finish()
    }
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::with_model_id("anthropic.claude-3-haiku-20240307-v1:0")
    }

    pub fn with_model_id(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            expectations: Arc::new(Mutex::new(Vec::new())),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Expect exactly `request` and answer with `response`
    pub fn expect_generate(
        &self,
        request: GenerationRequest,
        response: Result<Generation, ChatError>,
    ) {
        self.expectations
            .lock()
            .unwrap()
            .insert(0, (Some(request), response));
    }

    /// Answer the next request, whatever it is, with `response`
    pub fn expect_any(&self, response: Result<Generation, ChatError>) {
        self.expectations.lock().unwrap().insert(0, (None, response));
    }

    /// Requests received so far, oldest first
    pub fn received_requests(&self) -> Vec<GenerationRequest> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ChatError> {
        let (expected, response) = self.expectations.lock().unwrap().pop().unwrap_or_else(|| {
            panic!(
                "Received generation request, but no expectations are set\n{}",
                pretty_request(request)
            )
        });

        if let Some(expected) = expected {
            assert_eq!(
                &expected,
                request,
                "Unexpected request\n{}",
                pretty_request(request)
            );
        }

        let recorded = match &response {
            Ok(generation) => Ok(generation.clone()),
            Err(err) => Err(err.to_string()),
        };
        self.received
            .lock()
            .unwrap()
            .push((request.clone(), recorded));

        response
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl Drop for MockLanguageModel {
    fn drop(&mut self) {
        // We are still cloned, so do not check assertions yet
        if Arc::strong_count(&self.received) > 1 {
            return;
        }
        let Ok(expectations) = self.expectations.lock() else {
            return;
        };

        if expectations.is_empty() {
            let num_received = self.received.lock().map(|r| r.len()).unwrap_or_default();
            tracing::debug!("[MockLanguageModel] All {num_received} expectations were met");
        } else if !std::thread::panicking() {
            panic!(
                "[MockLanguageModel] {} expectation(s) were not met",
                expectations.len()
            );
        }
    }
}

fn pretty_request(request: &GenerationRequest) -> String {
    let mut output = String::new();
    if let Some(system) = &request.system {
        output.push_str(&format!(" system: \"{system}\"\n"));
    }
    for turn in &request.history {
        output.push_str(&format!(" {turn}\n"));
    }
    output.push_str(&format!(
        " prompt: \"{}\" ({:?})\n",
        request.prompt, request.params
    ));
    output
}

/// An in-memory data catalog
///
/// Databases listed with `with_broken_database` fail whenever their tables are read.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    databases: BTreeMap<String, Vec<TableInfo>>,
    broken: Vec<String>,
    table_reads: Arc<AtomicUsize>,
}

impl StaticCatalog {
    /// Number of `list_tables` calls so far, shared between clones
    pub fn table_reads(&self) -> usize {
        self.table_reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn with_database(mut self, name: &str) -> Self {
        self.databases.entry(name.to_string()).or_default();
        self
    }

    #[must_use]
    pub fn with_table(mut self, database: &str, table: &str, columns: &[(&str, &str)]) -> Self {
        let table = TableInfo {
            name: table.to_string(),
            database_name: database.to_string(),
            table_type: Some("EXTERNAL_TABLE".to_string()),
            columns: columns
                .iter()
                .map(|(name, ty)| ColumnInfo {
                    name: (*name).to_string(),
                    data_type: Some((*ty).to_string()),
                    comment: None,
                })
                .collect(),
            ..Default::default()
        };
        self.databases
            .entry(database.to_string())
            .or_default()
            .push(table);
        self
    }

    #[must_use]
    pub fn with_broken_database(mut self, name: &str) -> Self {
        self.databases.entry(name.to_string()).or_default();
        self.broken.push(name.to_string());
        self
    }

    fn tables_of(&self, database: &str) -> Result<&Vec<TableInfo>, CatalogError> {
        if self.broken.iter().any(|b| b == database) {
            return Err(CatalogError::unavailable(anyhow::anyhow!(
                "AccessDeniedException: not authorized to read {database}"
            )));
        }
        self.databases
            .get(database)
            .ok_or_else(|| CatalogError::NotFound(format!("database {database}")))
    }
}

#[async_trait]
impl DataCatalog for StaticCatalog {
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>, CatalogError> {
        Ok(self
            .databases
            .keys()
            .map(|name| DatabaseInfo {
                name: name.clone(),
                ..Default::default()
            })
            .collect())
    }

    async fn database(&self, name: &str) -> Result<DatabaseInfo, CatalogError> {
        if self.databases.contains_key(name) {
            Ok(DatabaseInfo {
                name: name.to_string(),
                ..Default::default()
            })
        } else {
            Err(CatalogError::NotFound(format!("database {name}")))
        }
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>, CatalogError> {
        self.table_reads.fetch_add(1, Ordering::SeqCst);
        self.tables_of(database).cloned()
    }

    async fn table(&self, database: &str, name: &str) -> Result<TableInfo, CatalogError> {
        self.tables_of(database)?
            .iter()
            .find(|table| table.name == name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("table {database}.{name}")))
    }
}
