use std::fmt;

use crate::core::Value;

/// Key declaration collected by the builder, resolved into a [`KeyDescriptor`].
#[derive(Debug, Clone)]
pub(crate) enum KeyDecl {
    /// Composite of declared property and/or reference names.
    Props(Vec<String>),
    /// Dedicated server-generated SERIAL column.
    Surrogate(String),
}

/// How a resolved key is represented. Decided once at schema-resolution time;
/// a one-component composite degenerates to `Single`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Single,
    Composite,
    Surrogate,
}

/// Resolved key of an entity type: which property slots identify an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    kind: KeyKind,
    slots: Vec<usize>,
}

impl KeyDescriptor {
    pub(crate) fn new(kind: KeyKind, slots: Vec<usize>) -> Self {
        debug_assert!(!slots.is_empty());
        debug_assert!(kind == KeyKind::Composite || slots.len() == 1);
        Self { kind, slots }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Property slots of the key components, in key order.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    pub fn is_surrogate(&self) -> bool {
        self.kind == KeyKind::Surrogate
    }

    pub fn is_single(&self) -> bool {
        self.kind != KeyKind::Composite
    }
}

/// Key of a concrete instance: a scalar for single-column keys, an ordered
/// tuple otherwise. Both forms expose the same component view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Single(Value),
    Composite(Vec<Value>),
}

impl KeyValue {
    /// Build from resolved components; one component collapses to `Single`.
    pub fn from_components(mut components: Vec<Value>) -> Self {
        if components.len() == 1 {
            Self::Single(components.remove(0))
        } else {
            Self::Composite(components)
        }
    }

    pub fn components(&self) -> &[Value] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Composite(vs) => vs,
        }
    }

    pub fn len(&self) -> usize {
        self.components().len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The scalar of a single-column key.
    pub fn scalar(&self) -> Option<&Value> {
        match self {
            Self::Single(v) => Some(v),
            Self::Composite(_) => None,
        }
    }

    /// A key with any NULL component does not identify a row.
    pub fn is_null(&self) -> bool {
        self.components().iter().any(Value::is_null)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(v) => write!(f, "{}", v),
            Self::Composite(vs) => {
                write!(f, "(")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl<T: Into<Value>> From<T> for KeyValue {
    fn from(v: T) -> Self {
        Self::Single(v.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_component_collapses_to_single() {
        let k = KeyValue::from_components(vec![Value::Integer(7)]);
        assert_eq!(k, KeyValue::Single(Value::Integer(7)));
        assert_eq!(k.scalar(), Some(&Value::Integer(7)));
        assert_eq!(k.components(), &[Value::Integer(7)]);
    }

    #[test]
    fn test_composite_components() {
        let k = KeyValue::from_components(vec![Value::Integer(1), Value::from("a")]);
        assert_eq!(k.len(), 2);
        assert_eq!(k.scalar(), None);
        assert!(!k.is_null());
    }

    #[test]
    fn test_null_component_means_no_key() {
        let k = KeyValue::from_components(vec![Value::Integer(1), Value::Null]);
        assert!(k.is_null());
    }
}
