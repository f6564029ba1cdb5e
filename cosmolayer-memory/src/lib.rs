//! In-memory emulator of a partitioned document service for cosmolayer.
//!
//! This crate provides a thread-safe, in-process implementation of the `StoreBackend`
//! trait. It behaves like the remote service at the level the client depends on, and
//! is meant for development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **SQL subset** - Executes the queries the client's translator produces
//! - **Server-side paging** - Feed pages with continuation tokens and a configurable page size
//! - **Partition keys and etags** - Ids unique per partition, conditional replace and delete
//!
//! # Quick Start
//!
//! ```ignore
//! use cosmolayer::{prelude::*, memory::InMemoryStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let backend = InMemoryStore::builder().build().await?;
//! let users = DocumentClient::<_, User>::new(backend, "Accounts", "Users");
//! let cancel = CancellationToken::new();
//!
//! users.ensure_database_exists(None, None, &cancel).await?;
//! users.ensure_container_exists(ContainerProperties::default(), None, None, &cancel).await?;
//! users.insert(&user, None, None, &cancel).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as cosmolayer_memory;

mod evaluator;
pub mod sql;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
