mod compile;
pub mod query;
pub mod statement;

pub(crate) use compile::compile;
pub use query::{Condition, Expr, Operand, Order, RawQuery, Select};
pub use statement::{Statement, Statements};
