use thiserror::Error;

use crate::core::Params;

/// Error raised while resolving an entity schema. Fatal for the type being
/// registered: a type that fails to resolve produces no `EntityType`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entity '{0}' declares no key")]
    NoKey(String),

    #[error("reference '{reference}' of entity '{entity}' targets a type whose key is not resolved")]
    UnresolvedReference { entity: String, reference: String },

    #[error("key of entity '{0}' contains more than one reference")]
    MultipleReferencesInKey(String),

    #[error("entity '{entity}' declares '{property}' more than once")]
    DuplicateProperty { entity: String, property: String },

    #[error("key of entity '{entity}' names unknown property '{property}'")]
    UnknownKeyProperty { entity: String, property: String },

    #[error("live reference '{reference}' of entity '{entity}' targets a non-live type")]
    LiveReferenceToStatic { entity: String, reference: String },
}

/// Runtime error of the mapping layer. All variants are recoverable at the
/// call site; cache-invariant violations are panics, not errors.
#[derive(Error, Debug)]
pub enum OrmError {
    #[error("constraint of property '{entity}.{property}' failed")]
    PropertyConstraint { entity: String, property: String },

    #[error("object-wide constraint of '{entity}' instance failed")]
    ObjectConstraint { entity: String },

    #[error("property '{entity}.{property}' expects {expected}, got {actual}")]
    TypeMismatch {
        entity: String,
        property: String,
        expected: String,
        actual: &'static str,
    },

    #[error("missing value for required property '{entity}.{property}'")]
    MissingValue { entity: String, property: String },

    #[error("'{entity}' has no property '{property}'")]
    UnknownProperty { entity: String, property: String },

    #[error("'{entity}' has no reference '{reference}'")]
    UnknownReference { entity: String, reference: String },

    #[error("column '{entity}.{property}' belongs to reference '{reference}'; assign through the reference")]
    ReferenceColumn {
        entity: String,
        property: String,
        reference: String,
    },

    #[error("key for '{entity}.{of}' has {got} component(s), expected {expected}")]
    KeyArity {
        entity: String,
        of: String,
        expected: usize,
        got: usize,
    },

    #[error("row for '{entity}' has {got} column(s), expected {expected}")]
    RowShape {
        entity: String,
        expected: usize,
        got: usize,
    },

    #[error("expected exactly one row, got {0}")]
    NotSingle(usize),

    #[error("instance of '{0}' is not persisted")]
    NotPersisted(String),

    #[error("instance of '{0}' is already persisted")]
    AlreadyPersisted(String),

    #[error("entity type '{0}' is not live and accepts no listeners")]
    NotLive(String),

    #[error("while executing `{statement}` with {params:?}: {source}")]
    Storage {
        statement: String,
        params: Params,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, OrmError>;
