//! Expression-tree query construction.
//!
//! Comparisons over properties and keys build [`Condition`] trees; a
//! [`Select`] renders them into a statement with deterministically named
//! parameters and decodes its result rows as instances through the identity
//! map. Deliberately plain string assembly: the statement shape matters, the
//! dialect does not.

use std::sync::Arc;

use crate::core::{Params, Result, Value};
use crate::entity::Instance;
use crate::schema::{EntityType, KeyValue};
use crate::sql::Statement;
use crate::storage::{Rows, StorageBackend};

/// One side of a comparison: a column, a bound literal, or a row of them.
#[derive(Debug, Clone)]
pub enum Operand {
    Column(String),
    Literal(Value),
    Row(Vec<Operand>),
}

impl Operand {
    fn render(&self, params: &mut ParamSink) -> String {
        match self {
            Self::Column(name) => name.clone(),
            Self::Literal(value) => params.bind(value.clone()),
            Self::Row(items) => {
                let rendered: Vec<_> = items.iter().map(|i| i.render(params)).collect();
                format!("({})", rendered.join(", "))
            }
        }
    }
}

impl<T: Into<Value>> From<T> for Operand {
    fn from(v: T) -> Self {
        Self::Literal(v.into())
    }
}

impl From<KeyValue> for Operand {
    fn from(key: KeyValue) -> Self {
        match key {
            KeyValue::Single(v) => Self::Literal(v),
            KeyValue::Composite(vs) => Self::Row(vs.into_iter().map(Self::Literal).collect()),
        }
    }
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        e.op
    }
}

/// A column (or key) expression, produced by [`EntityType::col`] and
/// [`EntityType::key_expr`]. Comparison methods yield [`Condition`]s, the
/// sign methods yield [`Order`] terms.
#[derive(Debug, Clone)]
pub struct Expr {
    pub(crate) op: Operand,
}

impl Expr {
    fn cmp(self, op: &'static str, rhs: impl Into<Operand>) -> Condition {
        Condition::Cmp {
            lhs: self.op,
            op,
            rhs: rhs.into(),
        }
    }

    pub fn eq(self, rhs: impl Into<Operand>) -> Condition {
        self.cmp("=", rhs)
    }

    pub fn ne(self, rhs: impl Into<Operand>) -> Condition {
        self.cmp("!=", rhs)
    }

    pub fn lt(self, rhs: impl Into<Operand>) -> Condition {
        self.cmp("<", rhs)
    }

    pub fn le(self, rhs: impl Into<Operand>) -> Condition {
        self.cmp("<=", rhs)
    }

    pub fn gt(self, rhs: impl Into<Operand>) -> Condition {
        self.cmp(">", rhs)
    }

    pub fn ge(self, rhs: impl Into<Operand>) -> Condition {
        self.cmp(">=", rhs)
    }

    pub fn asc(self) -> Order {
        Order {
            op: self.op,
            dir: "ASC",
        }
    }

    pub fn desc(self) -> Order {
        Order {
            op: self.op,
            dir: "DESC",
        }
    }
}

/// A WHERE-clause tree.
#[derive(Debug, Clone)]
pub enum Condition {
    Cmp {
        lhs: Operand,
        op: &'static str,
        rhs: Operand,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        match self {
            Self::And(mut cs) => {
                cs.push(other);
                Self::And(cs)
            }
            c => Self::And(vec![c, other]),
        }
    }

    pub fn or(self, other: Condition) -> Condition {
        match self {
            Self::Or(mut cs) => {
                cs.push(other);
                Self::Or(cs)
            }
            c => Self::Or(vec![c, other]),
        }
    }

    fn render(&self, params: &mut ParamSink) -> String {
        match self {
            Self::Cmp { lhs, op, rhs } => {
                format!("{} {} {}", lhs.render(params), op, rhs.render(params))
            }
            Self::And(cs) => {
                let parts: Vec<_> = cs.iter().map(|c| format!("({})", c.render(params))).collect();
                parts.join(" AND ")
            }
            Self::Or(cs) => {
                let parts: Vec<_> = cs.iter().map(|c| format!("({})", c.render(params))).collect();
                parts.join(" OR ")
            }
            Self::Not(c) => format!("(NOT {})", c.render(params)),
        }
    }
}

impl std::ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Self::Not(Box::new(self))
    }
}

/// An ORDER BY term.
#[derive(Debug, Clone)]
pub struct Order {
    op: Operand,
    dir: &'static str,
}

impl Order {
    fn render(&self, params: &mut ParamSink) -> String {
        format!("{} {}", self.op.render(params), self.dir)
    }
}

/// Allocates `:p0`, `:p1`, … placeholder names for bound literals, in render
/// order, so a query's text and parameter map are reproducible.
#[derive(Default)]
struct ParamSink {
    params: Params,
}

impl ParamSink {
    fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.params.len());
        self.params.insert(name.clone(), value);
        format!(":{}", name)
    }
}

/// A SELECT over one entity type, decoding rows as canonical instances.
#[derive(Debug, Clone)]
pub struct Select {
    ty: Arc<EntityType>,
    conditions: Vec<Condition>,
    order: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    pub(crate) fn new(ty: Arc<EntityType>) -> Self {
        Self {
            ty,
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render to a statement plus its bound parameters.
    pub fn build(&self) -> (Statement, Params) {
        let mut sink = ParamSink::default();
        let mut text = format!("SELECT * FROM {}", self.ty.table());
        if !self.conditions.is_empty() {
            let parts: Vec<_> = self
                .conditions
                .iter()
                .map(|c| format!("({})", c.render(&mut sink)))
                .collect();
            text.push_str(" WHERE ");
            text.push_str(&parts.join(" AND "));
        }
        if !self.order.is_empty() {
            let parts: Vec<_> = self.order.iter().map(|o| o.render(&mut sink)).collect();
            text.push_str(" ORDER BY ");
            text.push_str(&parts.join(", "));
        }
        if let Some(limit) = self.limit {
            text.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            text.push_str(&format!(" OFFSET {}", offset));
        }
        (Statement::new(text), sink.params)
    }

    /// All matching instances.
    pub async fn all(&self, db: &dyn StorageBackend) -> Result<Vec<Arc<Instance>>> {
        let rows = self.rows(db).await?;
        rows.all().into_iter().map(|row| self.ty.from_row(row)).collect()
    }

    /// Exactly one matching instance, or [`crate::OrmError::NotSingle`].
    pub async fn single(&self, db: &dyn StorageBackend) -> Result<Arc<Instance>> {
        let rows = self.rows(db).await?;
        self.ty.from_row(rows.single()?)
    }

    /// At most `n` matching instances.
    pub async fn amount(&self, db: &dyn StorageBackend, n: usize) -> Result<Vec<Arc<Instance>>> {
        let rows = self.rows(db).await?;
        rows.amount(n).into_iter().map(|row| self.ty.from_row(row)).collect()
    }

    /// The raw cursor, without instance decoding.
    pub async fn rows(&self, db: &dyn StorageBackend) -> Result<Rows> {
        let (statement, params) = self.build();
        statement.query(db, &params).await
    }
}

/// Hand-written SQL whose result rows decode as instances of one type.
#[derive(Debug, Clone)]
pub struct RawQuery {
    ty: Arc<EntityType>,
    statement: Statement,
    params: Params,
}

impl RawQuery {
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub async fn all(&self, db: &dyn StorageBackend) -> Result<Vec<Arc<Instance>>> {
        let rows = self.statement.query(db, &self.params).await?;
        rows.all().into_iter().map(|row| self.ty.from_row(row)).collect()
    }

    pub async fn single(&self, db: &dyn StorageBackend) -> Result<Arc<Instance>> {
        let rows = self.statement.query(db, &self.params).await?;
        self.ty.from_row(rows.single()?)
    }

    pub async fn rows(&self, db: &dyn StorageBackend) -> Result<Rows> {
        self.statement.query(db, &self.params).await
    }
}

impl EntityType {
    /// Column expression for a resolved property.
    ///
    /// # Panics
    ///
    /// Panics if the type has no such property; referencing an undeclared
    /// column in a query is a programming error.
    pub fn col(&self, name: &str) -> Expr {
        let slot = self.prop_slot(name).unwrap_or_else(|| {
            panic!("entity type '{}' has no property '{}'", self.name(), name)
        });
        Expr {
            op: Operand::Column(self.props()[slot].qualified()),
        }
    }

    /// Key expression: a plain column for single keys, a row of columns for
    /// composite keys. Comparison operators behave identically for both.
    pub fn key_expr(&self) -> Expr {
        let slots = self.key().slots();
        let op = if self.key().is_single() {
            Operand::Column(self.props()[slots[0]].qualified())
        } else {
            Operand::Row(
                slots
                    .iter()
                    .map(|&s| Operand::Column(self.props()[s].qualified()))
                    .collect(),
            )
        };
        Expr { op }
    }

    /// Start an unfiltered SELECT over this type.
    pub fn select(self: &Arc<Self>) -> Select {
        Select::new(Arc::clone(self))
    }

    /// SELECT filtered by one condition.
    pub fn get(self: &Arc<Self>, condition: Condition) -> Select {
        self.select().filter(condition)
    }

    /// Raw SQL whose rows decode as instances of this type.
    pub fn raw(self: &Arc<Self>, text: impl Into<String>) -> RawQuery {
        RawQuery {
            ty: Arc::clone(self),
            statement: Statement::new(text),
            params: Params::new(),
        }
    }
}
