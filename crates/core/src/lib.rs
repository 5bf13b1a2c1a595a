//! Core types for the txweave transaction coordinator
//!
//! This crate defines the vocabulary shared by the coordinator and by
//! resource adapters:
//! - [`error`]: the transaction error taxonomy and adapter error types
//! - [`definition`]: per-transaction settings (timeout, read-only, isolation)
//! - [`key`]: registry keys identifying resource factories

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod definition;
pub mod error;
pub mod key;

pub use definition::{IsolationLevel, TransactionDefinition};
pub use error::{AdapterError, AdapterErrorKind, AdapterResult, DataAccessError, Error, Result};
pub use key::ResourceKey;
