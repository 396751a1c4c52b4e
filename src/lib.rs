//! REST scaffolding: CRUD routes for plain Rust structs, with DTO mapping and pluggable authorization.
//!
//! Describe the storage and transport structs with [`Model`], build a [`Resource`] (by hand or from a
//! [`Store`]), then mount [`resource_routes`] on an axum router.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mapping;
pub mod resource;
pub mod response;
pub mod routes;
pub mod sql;
pub mod store;

pub use config::{Options, Settings};
pub use error::{AppError, ConfigError, KeyFormatError, StoreError};
pub use extractors::RequestContext;
pub use mapping::{Field, FieldMap, FieldValue, KeyKind, MatchPolicy, Model};
pub use resource::{Action, AuthorizeFn, BoxFuture, ChildCollection, Resource};
pub use routes::{common_routes, common_routes_with_ready, resource_routes};
pub use store::{MemoryStore, PgStore, PgStoreBuilder, Store};
