use thiserror::Error;

pub type TmResult<T> = Result<T, TmError>;

#[derive(Error, Debug)]
pub enum TmError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },

    #[error("Did not converge: {what}")]
    NonConvergence { what: String },
}
