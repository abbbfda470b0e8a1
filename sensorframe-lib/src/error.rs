#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("row of {bits} bits exceeds the maximum of {maximum}")]
    RowTooLong { bits: usize, maximum: usize },

    #[error("{rows} rows exceeds the maximum of {maximum}")]
    TooManyRows { rows: usize, maximum: usize },

    #[error("Not enough bytes")]
    NotEnoughData { actual: usize, minimum: usize },

    /// Text that is not in the `{bits}hex` row notation.
    #[error("invalid bit row: {0}")]
    InvalidRow(String),

    #[error("unknown decoder: {0}")]
    UnknownDecoder(String),

    #[error("duplicate decoder: {0}")]
    DuplicateDecoder(String),

    #[error("failed to start decode threads: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
