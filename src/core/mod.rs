pub mod error;
pub mod types;
pub mod value;

pub use error::{OrmError, Result, SchemaError};
pub use types::{DataType, Params, Row};
pub use value::Value;
