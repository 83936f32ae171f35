//! Read only views on the data catalog
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use bedrock_chat_core::{
    DataCatalog,
    catalog::{CatalogStats, DatabaseInfo, TableInfo, TableMatch},
    errors::ChatError,
};
use serde::{Deserialize, Serialize};

use crate::{responses::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub(crate) struct Listing<T> {
    success: bool,
    count: usize,
    #[serde(flatten)]
    items: T,
}

#[derive(Debug, Serialize)]
pub(crate) struct Databases {
    databases: Vec<DatabaseInfo>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Tables {
    database: String,
    tables: Vec<TableInfo>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Matches {
    term: String,
    matches: Vec<TableMatch>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Item<T> {
    success: bool,
    #[serde(flatten)]
    item: T,
}

#[derive(Debug, Serialize)]
pub(crate) struct Database {
    database: DatabaseInfo,
}

#[derive(Debug, Serialize)]
pub(crate) struct Table {
    table: TableInfo,
}

#[derive(Debug, Serialize)]
pub(crate) struct Stats {
    stats: CatalogStats,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    term: String,
}

fn catalog(state: &AppState) -> Result<&Arc<dyn DataCatalog>, ApiError> {
    state.catalog().ok_or(ApiError::CatalogDisabled)
}

pub(crate) async fn list_databases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Listing<Databases>>, ApiError> {
    let databases = catalog(&state)?.list_databases().await?;

    Ok(Json(Listing {
        success: true,
        count: databases.len(),
        items: Databases { databases },
    }))
}

pub(crate) async fn database(
    State(state): State<Arc<AppState>>,
    Path(database): Path<String>,
) -> Result<Json<Item<Database>>, ApiError> {
    let database = catalog(&state)?.database(&database).await?;

    Ok(Json(Item {
        success: true,
        item: Database { database },
    }))
}

pub(crate) async fn list_tables(
    State(state): State<Arc<AppState>>,
    Path(database): Path<String>,
) -> Result<Json<Listing<Tables>>, ApiError> {
    let tables = catalog(&state)?.list_tables(&database).await?;

    Ok(Json(Listing {
        success: true,
        count: tables.len(),
        items: Tables { database, tables },
    }))
}

pub(crate) async fn table(
    State(state): State<Arc<AppState>>,
    Path((database, table)): Path<(String, String)>,
) -> Result<Json<Item<Table>>, ApiError> {
    let table = catalog(&state)?.table(&database, &table).await?;

    Ok(Json(Item {
        success: true,
        item: Table { table },
    }))
}

pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Listing<Matches>>, ApiError> {
    let catalog = catalog(&state)?;
    let Query(query) = query?;

    let term = query.term.trim();
    if term.is_empty() {
        return Err(ChatError::invalid_input("search term is required").into());
    }

    let matches = catalog.search_tables(term).await?;

    Ok(Json(Listing {
        success: true,
        count: matches.len(),
        items: Matches {
            term: term.to_string(),
            matches,
        },
    }))
}

pub(crate) async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Item<Stats>>, ApiError> {
    let stats = catalog(&state)?.stats().await?;

    Ok(Json(Item {
        success: true,
        item: Stats { stats },
    }))
}
