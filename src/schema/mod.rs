pub mod builder;
pub mod entity_type;
pub mod key;
pub mod property;
pub mod reference;

pub use builder::EntityTypeBuilder;
pub use entity_type::{EntityType, ObjectConstraint};
pub use key::{KeyDescriptor, KeyKind, KeyValue};
pub use property::{PropertyConstraint, PropertyDescriptor};
pub use reference::ReferenceDescriptor;

/// Backing table of an entity type.
pub(crate) fn table_name(entity: &str) -> String {
    format!("table_{}", entity)
}
