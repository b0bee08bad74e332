use thiserror::Error;

/// Fatal conditions raised by a pipeline stage. Any of these aborts the whole
/// invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("start date {start} is after end date {end}")]
    InvalidWindow { start: String, end: String },
    #[error("no {device} data in the selected window")]
    EmptyResult { device: String },
    #[error("{device}: expected column '{column}' is missing")]
    SchemaMismatch { device: String, column: String },
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
    #[error("{device}: column '{column}' has {got} values, table has {want} rows")]
    LengthMismatch {
        device: String,
        column: String,
        got: usize,
        want: usize,
    },
    #[error("{device}: column '{column}' already exists")]
    DuplicateColumn { device: String, column: String },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn empty(device: &str) -> Self {
        Self::EmptyResult {
            device: device.to_string(),
        }
    }

    pub fn missing_column(device: &str, column: &str) -> Self {
        Self::SchemaMismatch {
            device: device.to_string(),
            column: column.to_string(),
        }
    }
}

/// Why a single record's timestamp was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("timestamp is missing")]
    Missing,
    #[error("timestamp '{0}' is not numeric")]
    NotNumeric(String),
    #[error("timestamp {0} is out of range")]
    OutOfRange(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
