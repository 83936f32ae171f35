//! Chat invocations over a language model
//!
//! [`ChatInvoker`] runs a single user message against a model with the conversation so far as
//! context, and records the exchange. [`CatalogContext`] renders a data catalog as system prompt
//! for requests that ask for it.
mod catalog_context;
mod invoker;

pub use catalog_context::CatalogContext;
pub use invoker::{ChatInvoker, ChatInvokerBuilder};
