//! Cross-cutting types: errors, results, request context, telemetry.

pub mod error;
pub mod request_context;
pub mod result;
pub mod telemetry;

pub use error::{AppError, ErrorKind};
pub use request_context::RequestContext;
pub use result::AppResult;
