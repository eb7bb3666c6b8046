//! Storage layer
//!
//! Handles the durable side of the list store.
//!
//! ## Architecture
//!
//! - **KvStore**: Byte-level key-value backend (file or in-memory)
//! - **Schema**: Strict JSON encoding of the ordered item sequence
//!
//! The list store encodes its whole sequence and writes it under one key
//! on every mutation.

pub mod error;
pub mod persistence;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use persistence::{validate_key, FileKvStore, KvStore, MemoryKvStore};
pub use schema::{decode, encode, SchemaError};
