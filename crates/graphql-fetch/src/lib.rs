//! graphql-fetch - Typed GraphQL transport and query-cache adapters.
//!
//! This crate provides:
//! - Parsed operation documents bound to their data and variables types.
//! - A single-exchange HTTP transport with one classified error type.
//! - Deterministic cache keys derived from operation name and variables.
//! - Query, fetch, infinite-query and mutation adapters over any
//!   [`QueryCache`] implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use graphql_fetch::{Transport, TypedDocument};
//!
//! let transport = Transport::new("https://graphqlzero.almansi.me/api");
//! let user: TypedDocument<UserData, UserVars> =
//!     TypedDocument::parse("query User($id: ID!) { user(id: $id) { id name } }")?;
//!
//! let data = transport.execute(&user, Some(&UserVars { id: "1".into() })).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod adapter;
mod cache;
mod config;
mod document;
mod error;
mod key;
mod transport;

pub use adapter::{Fetcher, GraphqlClient, Mutation};
pub use cache::{MutationFn, PageFn, QueryCache, QueryFn};
pub use config::{Endpoint, TransportConfig};
pub use document::{OperationDocument, TypedDocument, operation_name};
pub use error::{ConfigError, DocumentError, ErrorKind, GraphqlError, GraphqlResult, UNKNOWN_ERROR};
pub use key::{INFINITE_DISCRIMINATOR, QueryKey, build_key};
pub use transport::{GraphqlRequest, Transport, TransportBuilder};
