use std::fmt;
use std::sync::Arc;

use crate::core::Value;
use crate::entity::{IdentityMap, Instance};
use crate::schema::{KeyDescriptor, KeyValue, PropertyDescriptor, ReferenceDescriptor};
use crate::sql::Statements;

/// Object-wide invariant, checked at construction and before insert/update.
pub type ObjectConstraint = Arc<dyn Fn(&Instance) -> bool + Send + Sync>;

/// The compiled schema of one entity: resolved property list (declared
/// properties followed by reference expansions), references, key, and the
/// statement templates derived from them. Immutable after resolution except
/// for the identity-map cache it owns.
pub struct EntityType {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) props: Vec<PropertyDescriptor>,
    /// Number of declared (non-synthetic) properties; expansions start here.
    pub(crate) declared: usize,
    pub(crate) refs: Vec<ReferenceDescriptor>,
    pub(crate) key: KeyDescriptor,
    pub(crate) constraint: Option<ObjectConstraint>,
    pub(crate) live: bool,
    pub(crate) statements: Statements,
    pub(crate) cache: IdentityMap,
}

impl EntityType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// All resolved properties, in column order.
    pub fn props(&self) -> &[PropertyDescriptor] {
        &self.props
    }

    /// The declared properties, excluding reference expansions.
    pub fn declared_props(&self) -> &[PropertyDescriptor] {
        &self.props[..self.declared]
    }

    pub fn refs(&self) -> &[ReferenceDescriptor] {
        &self.refs
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceDescriptor> {
        self.refs.iter().find(|r| r.name == name)
    }

    pub fn key(&self) -> &KeyDescriptor {
        &self.key
    }

    /// Whether instances of this type accept listeners.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    pub fn cache(&self) -> &IdentityMap {
        &self.cache
    }

    pub(crate) fn prop_slot(&self, name: &str) -> Option<usize> {
        self.props.iter().position(|p| p.name == name)
    }

    /// Extract the key from a full value row; `None` while any component is
    /// NULL (e.g. an unassigned surrogate key).
    pub(crate) fn key_of(&self, values: &[Value]) -> Option<KeyValue> {
        let components: Vec<_> = self.key.slots().iter().map(|&s| values[s].clone()).collect();
        let key = KeyValue::from_components(components);
        (!key.is_null()).then_some(key)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("props", &self.props)
            .field("refs", &self.refs)
            .field("key", &self.key)
            .field("live", &self.live)
            .finish()
    }
}
