// ============================================================================
// liveorm
// ============================================================================

//! Object-relational mapping layer with live-update notifications.
//!
//! An entity type is declared once through [`EntityTypeBuilder`] and resolved
//! into an immutable schema: properties (including foreign-key expansions), a
//! key, and the CRUD statement templates compiled from them. At runtime every
//! construction path funnels through a per-type identity map, so one primary
//! key maps to at most one live [`Instance`] in the process. Types marked
//! live accept [`Listener`] registrations and fan out update, delete and
//! incoming-reference notifications as instances mutate.
//!
//! Storage is a collaborator behind the async [`StorageBackend`] trait — one
//! statement per call, one awaited result, pooling left to the implementor.
//!
//! ```
//! use liveorm::{DataType, EntityTypeBuilder, PropertyDescriptor};
//!
//! let user = EntityTypeBuilder::new("User")
//!     .property(PropertyDescriptor::new("name", DataType::Text))
//!     .surrogate_key("id")
//!     .live()
//!     .resolve()
//!     .unwrap();
//!
//! assert_eq!(
//!     user.statements().insert.text(),
//!     "INSERT INTO table_User (name) VALUES (:name) RETURNING id"
//! );
//! ```

pub mod core;
pub mod entity;
pub mod model;
pub mod schema;
pub mod sql;
pub mod storage;

// Re-export the main types for convenience
pub use self::core::{DataType, OrmError, Params, Result, Row, SchemaError, Value};
pub use entity::{IdentityMap, Instance, Listener};
pub use model::Model;
pub use schema::{
    EntityType, EntityTypeBuilder, KeyDescriptor, KeyKind, KeyValue, PropertyDescriptor,
    ReferenceDescriptor,
};
pub use sql::{Condition, Expr, Order, RawQuery, Select, Statement, Statements};
pub use storage::{BackendError, Rows, StorageBackend};
