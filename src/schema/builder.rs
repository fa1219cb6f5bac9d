use std::sync::Arc;

use log::debug;

use crate::core::{DataType, SchemaError};
use crate::entity::{IdentityMap, Instance};
use crate::schema::entity_type::ObjectConstraint;
use crate::schema::key::KeyDecl;
use crate::schema::{
    EntityType, KeyDescriptor, KeyKind, PropertyDescriptor, ReferenceDescriptor, table_name,
};
use crate::sql;

struct RefDecl {
    name: String,
    target: Arc<EntityType>,
    live: bool,
}

/// Collects the declaration of one entity type and resolves it into an
/// immutable [`EntityType`].
///
/// ```
/// use liveorm::{DataType, EntityTypeBuilder, PropertyDescriptor};
///
/// let user = EntityTypeBuilder::new("User")
///     .property(PropertyDescriptor::new("name", DataType::Text))
///     .surrogate_key("id")
///     .live()
///     .resolve()
///     .unwrap();
/// assert_eq!(user.table(), "table_User");
/// assert!(user.statements().insert.text().ends_with("RETURNING id"));
/// ```
pub struct EntityTypeBuilder {
    name: String,
    props: Vec<PropertyDescriptor>,
    refs: Vec<RefDecl>,
    key: Option<KeyDecl>,
    constraint: Option<ObjectConstraint>,
    live: bool,
}

impl EntityTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Vec::new(),
            refs: Vec::new(),
            key: None,
            constraint: None,
            live: false,
        }
    }

    /// Declare a property. Declaration order is column order.
    pub fn property(mut self, prop: PropertyDescriptor) -> Self {
        self.props.push(prop);
        self
    }

    /// Declare a reference to an already-resolved entity type.
    pub fn reference(mut self, name: impl Into<String>, target: &Arc<EntityType>) -> Self {
        self.refs.push(RefDecl {
            name: name.into(),
            target: Arc::clone(target),
            live: false,
        });
        self
    }

    /// Declare a reference whose assignment participates in the live
    /// notification protocol. The target must itself be live.
    pub fn live_reference(mut self, name: impl Into<String>, target: &Arc<EntityType>) -> Self {
        self.refs.push(RefDecl {
            name: name.into(),
            target: Arc::clone(target),
            live: true,
        });
        self
    }

    /// Declare the key as a composite of property and/or reference names.
    pub fn key(mut self, components: &[&str]) -> Self {
        self.key = Some(KeyDecl::Props(components.iter().map(|s| s.to_string()).collect()));
        self
    }

    /// Declare a dedicated server-generated key column (SERIAL).
    pub fn surrogate_key(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.props.push(
            PropertyDescriptor::new(name.clone(), DataType::Integer)
                .sql_type("SERIAL")
                .optional(),
        );
        self.key = Some(KeyDecl::Surrogate(name));
        self
    }

    /// Attach an object-wide invariant, checked at construction and before
    /// insert/update.
    pub fn constraint(mut self, f: impl Fn(&Instance) -> bool + Send + Sync + 'static) -> Self {
        self.constraint = Some(Arc::new(f));
        self
    }

    /// Mark instances of this type as live (listener-capable).
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    /// Resolve the declaration: expand references, specialize the key,
    /// compile the statement templates.
    pub fn resolve(self) -> Result<Arc<EntityType>, SchemaError> {
        let name = self.name;
        let key_decl = self.key.ok_or_else(|| SchemaError::NoKey(name.clone()))?;

        let mut props = self.props;
        let declared = props.len();

        // Uniqueness over declared properties and reference names together;
        // expanded column names derive from reference names and stay unique.
        let mut seen: Vec<&str> = Vec::new();
        for n in props.iter().map(|p| p.name()).chain(self.refs.iter().map(|r| r.name.as_str())) {
            if seen.contains(&n) {
                return Err(SchemaError::DuplicateProperty {
                    entity: name,
                    property: n.to_string(),
                });
            }
            seen.push(n);
        }

        // Expand references into synthetic component properties.
        let mut refs = Vec::with_capacity(self.refs.len());
        for decl in self.refs {
            if decl.live && !decl.target.is_live() {
                return Err(SchemaError::LiveReferenceToStatic {
                    entity: name,
                    reference: decl.name,
                });
            }
            let target_key = decl.target.key();
            if target_key.slots().is_empty() {
                return Err(SchemaError::UnresolvedReference {
                    entity: name,
                    reference: decl.name,
                });
            }
            let mut slots = Vec::with_capacity(target_key.slots().len());
            for &target_slot in target_key.slots() {
                let target_prop = &decl.target.props()[target_slot];
                // SERIAL is a generation marker, not a storage type; a column
                // referencing one is a plain INT.
                let sql_type = if target_prop.sql_type == "SERIAL" {
                    "INT".to_string()
                } else {
                    target_prop.sql_type.clone()
                };
                let mut component = PropertyDescriptor::new(
                    format!("{}_{}", decl.name, target_prop.name()),
                    target_prop.data_type(),
                )
                .skip_json();
                component.sql_type = sql_type;
                component.synthetic = true;
                slots.push(props.len());
                props.push(component);
            }
            refs.push(ReferenceDescriptor {
                name: decl.name,
                target: decl.target,
                live: decl.live,
                slots,
            });
        }

        let key = resolve_key(&name, key_decl, &props[..declared], &refs)?;

        for p in &mut props {
            p.owner = name.clone();
        }

        let table = table_name(&name);
        let statements = sql::compile(&table, &props, &refs, &key);
        debug!(
            "resolved entity type '{}': {} column(s), key {:?}",
            name,
            props.len(),
            key.kind()
        );

        Ok(Arc::new(EntityType {
            name,
            table,
            props,
            declared,
            refs,
            key,
            constraint: self.constraint,
            live: self.live,
            statements,
            cache: IdentityMap::new(),
        }))
    }
}

fn resolve_key(
    entity: &str,
    decl: KeyDecl,
    declared: &[PropertyDescriptor],
    refs: &[ReferenceDescriptor],
) -> Result<KeyDescriptor, SchemaError> {
    match decl {
        KeyDecl::Surrogate(name) => {
            let slot = declared
                .iter()
                .position(|p| p.name() == name)
                .ok_or_else(|| SchemaError::UnknownKeyProperty {
                    entity: entity.to_string(),
                    property: name,
                })?;
            Ok(KeyDescriptor::new(KeyKind::Surrogate, vec![slot]))
        }
        KeyDecl::Props(names) => {
            let mut slots = Vec::new();
            let mut refs_in_key = 0;
            for n in &names {
                if let Some(slot) = declared.iter().position(|p| p.name() == *n) {
                    slots.push(slot);
                } else if let Some(r) = refs.iter().find(|r| r.name() == n.as_str()) {
                    refs_in_key += 1;
                    if refs_in_key > 1 {
                        return Err(SchemaError::MultipleReferencesInKey(entity.to_string()));
                    }
                    slots.extend_from_slice(r.slots());
                } else {
                    return Err(SchemaError::UnknownKeyProperty {
                        entity: entity.to_string(),
                        property: n.clone(),
                    });
                }
            }
            if slots.is_empty() {
                return Err(SchemaError::NoKey(entity.to_string()));
            }
            let kind = if slots.len() == 1 { KeyKind::Single } else { KeyKind::Composite };
            Ok(KeyDescriptor::new(kind, slots))
        }
    }
}
