//! A generic client layer over partitioned JSON document databases.
//!
//! This crate is the core of the cosmolayer project and provides:
//!
//! - **Document traits** ([`document`]) - The [`Document`](document::Document) trait and partition keys
//! - **Backend abstraction** ([`backend`]) - The remote operations a document service exposes
//! - **Document client** ([`client`]) - A container-bound client typed over its documents
//! - **Typed facades** ([`facade`]) - Clients with compile-time database and container ids
//! - **Query and filtering API** ([`query`]) - Composable filter expressions
//! - **Query translation** ([`translate`]) - Filter expressions rendered as parameterized SQL
//! - **Resources and options** ([`resource`], [`options`]) - Provisioning and per-request settings
//! - **Paging** ([`page`]) - Feed pages, continuation tokens and page requests
//! - **Error handling** ([`error`]) - Error types, failure classes and result types
//!
//! # Example
//!
//! ```ignore
//! use cosmolayer_core::{client::DocumentClient, document::Document, query::Filter};
//! use serde::{Serialize, Deserialize};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! let users = DocumentClient::<_, User>::new(backend, "Accounts", "Users");
//! let page = users
//!     .get_items(None, Some(&Filter::eq("name", "Alice")), None, &CancellationToken::new())
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as cosmolayer_core;

pub mod backend;
pub mod client;
pub mod document;
pub mod error;
pub mod facade;
pub mod options;
pub mod page;
pub mod query;
pub mod resource;
pub mod translate;
