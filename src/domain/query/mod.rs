//! Query execution, failure classification and outcome types.

mod classifier;
mod error;
mod executor;
mod types;

pub use classifier::{classify, ErrorKind};
pub use error::{DbError, ErrorCategory, Phase};
pub use executor::{QueryExecutor, RetryPolicy};
pub use types::{QueryFailure, QueryOutcome, QueryRequest, QueryRows, QuerySuccess};
