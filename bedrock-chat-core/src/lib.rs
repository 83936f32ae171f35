#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Core types and traits for bedrock-chat
//!
//! Holds the data model (turns, conversations, model descriptors, invocation results), the error
//! taxonomy, and the traits integrations implement. Nothing in here talks to AWS.

pub mod catalog;
pub mod conversation;
pub mod errors;
pub mod generation;
pub mod model;
pub mod session;
mod traits;

pub use catalog::DataCatalog;
pub use errors::{CatalogError, ChatError};
pub use traits::*;

pub mod prelude {
    pub use crate::catalog::{CatalogStats, DataCatalog, DatabaseInfo, TableInfo, TableMatch};
    pub use crate::conversation::{ContextBudget, Conversation, ConversationSummary, Role, Turn};
    pub use crate::errors::{CatalogError, ChatError};
    pub use crate::generation::{
        ChatRequest, Generation, GenerationLimits, GenerationParams, GenerationRequest,
        InvocationResult, TokenUsage,
    };
    pub use crate::model::ModelDescriptor;
    pub use crate::session::{SessionStore, SharedConversation};
    pub use crate::traits::{LanguageModel, ModelCatalog};
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
