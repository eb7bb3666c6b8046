//! ticklist Core Library
//!
//! This crate provides the core functionality for ticklist, a small
//! local todo list whose contents are mirrored into a durable key-value
//! byte store.
//!
//! # Architecture
//!
//! - **ListStore**: Single owner of the ordered item sequence
//! - **KvStore**: Durable byte store the sequence is written through to
//!
//! Every mutation is persisted before it becomes visible in memory, so the
//! in-memory list never shows data that was not saved.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = ListStore::open(FileKvStore::new(&config), config.storage_key.clone())?;
//!
//! // Add an item
//! let item = store.add("Buy milk")?;
//!
//! // Query items
//! for item in store.items() { ... }
//! ```
//!
//! # Modules
//!
//! - `store`: The write-through list store (main entry point)
//! - `models`: Item and ItemId
//! - `storage`: Key-value backends, storage errors and the persisted schema
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod storage;
pub mod store;

pub use config::Config;
pub use models::{Item, ItemId};
pub use storage::{FileKvStore, KvStore, MemoryKvStore, SchemaError, StorageError};
pub use store::{ErrorKind, ListStore, LoadFailure, PersistFailure, StoreError};
