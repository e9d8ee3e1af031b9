use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the binding layer.
///
/// Constructors never fail; they record the outcome in the `is_ready` /
/// `is_valid` flags instead. Every fallible operation returns one of these,
/// and nothing panics or unwinds across the crate boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open database `{path}`: {message}")]
    Open { path: String, message: String },
    #[error("statement failed to compile: {message}")]
    Prepare { message: String },
    #[error("statement is not valid, no engine call was attempted")]
    StatementInvalid,
    #[error("statement produced a row where completion was expected")]
    StepMismatch,
    #[error("step failed: {message}")]
    Step { message: String },
    #[error("could not bind parameter {index}: {message}")]
    Bind { index: i32, message: String },
}
