use std::fmt;
use std::sync::Arc;

use crate::core::{DataType, OrmError, Result, Value};

/// Validation predicate attached to a single property.
pub type PropertyConstraint = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Declared (or reference-expanded) field of an entity type.
///
/// Built with the usual chaining style:
///
/// ```
/// use liveorm::{DataType, PropertyDescriptor};
///
/// let age = PropertyDescriptor::new("age", DataType::Integer)
///     .optional()
///     .constraint(|v| v.as_i64().map_or(true, |n| n >= 0));
/// assert_eq!(age.sql_def(), "\tage INT");
/// ```
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) sql_type: String,
    pub(crate) sql_extra: String,
    pub(crate) required: bool,
    pub(crate) json: bool,
    pub(crate) constraint: Option<PropertyConstraint>,
    /// Owning entity name, stamped at resolve time.
    pub(crate) owner: String,
    /// True for columns materialized from a reference expansion.
    pub(crate) synthetic: bool,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            sql_type: data_type.sql_type().to_string(),
            sql_extra: String::new(),
            required: true,
            json: true,
            constraint: None,
            owner: String::new(),
            synthetic: false,
        }
    }

    /// Override the SQL column type.
    pub fn sql_type(mut self, sql_type: &str) -> Self {
        self.sql_type = sql_type.to_string();
        self
    }

    /// Extra SQL appended to the column definition (e.g. `UNIQUE`).
    pub fn sql_extra(mut self, extra: &str) -> Self {
        self.sql_extra = extra.to_string();
        self
    }

    /// Allow NULL for this column.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Exclude this property from the serialized (JSON) form.
    pub fn skip_json(mut self) -> Self {
        self.json = false;
        self
    }

    /// Attach a validation predicate, checked on every assignment.
    pub fn constraint(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.constraint = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn in_json(&self) -> bool {
        self.json
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Column definition line for CREATE TABLE.
    pub fn sql_def(&self) -> String {
        let mut def = format!("\t{} {}", self.name, self.sql_type);
        if !self.sql_extra.is_empty() {
            def.push(' ');
            def.push_str(&self.sql_extra);
        }
        if self.required {
            def.push_str(" NOT NULL");
        }
        def
    }

    /// Table-qualified column name for query rendering.
    pub fn qualified(&self) -> String {
        format!("{}.{}", super::table_name(&self.owner), self.name)
    }

    /// Check a candidate value against the column type and the constraint
    /// predicate. NULL handling (required columns) happens at persist time.
    pub(crate) fn accept(&self, value: &Value) -> Result<()> {
        if !self.data_type.is_compatible(value) {
            return Err(OrmError::TypeMismatch {
                entity: self.owner.clone(),
                property: self.name.clone(),
                expected: self.data_type.to_string(),
                actual: value.type_name(),
            });
        }
        if let Some(check) = &self.constraint
            && !value.is_null()
            && !check(value)
        {
            return Err(OrmError::PropertyConstraint {
                entity: self.owner.clone(),
                property: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("sql_type", &self.sql_type)
            .field("required", &self.required)
            .field("json", &self.json)
            .field("constrained", &self.constraint.is_some())
            .field("synthetic", &self.synthetic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_def() {
        let p = PropertyDescriptor::new("name", DataType::Text);
        assert_eq!(p.sql_def(), "\tname VARCHAR NOT NULL");

        let p = PropertyDescriptor::new("score", DataType::Float).optional();
        assert_eq!(p.sql_def(), "\tscore DOUBLE PRECISION");

        let p = PropertyDescriptor::new("email", DataType::Text).sql_extra("UNIQUE");
        assert_eq!(p.sql_def(), "\temail VARCHAR UNIQUE NOT NULL");
    }

    #[test]
    fn test_accept_checks_type_and_predicate() {
        let p = PropertyDescriptor::new("age", DataType::Integer)
            .constraint(|v| v.as_i64().map_or(true, |n| n >= 0));
        assert!(p.accept(&Value::Integer(3)).is_ok());
        assert!(p.accept(&Value::Null).is_ok());
        assert!(matches!(
            p.accept(&Value::Text("x".into())),
            Err(OrmError::TypeMismatch { .. })
        ));
        assert!(matches!(
            p.accept(&Value::Integer(-1)),
            Err(OrmError::PropertyConstraint { .. })
        ));
    }
}
