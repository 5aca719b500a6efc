pub mod error;
pub mod types;
pub mod value;

pub use error::{ModelError, Result};
pub use types::{Criteria, Row, row_from};
pub use value::Value;
