use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O or lock failure while committing. The store is left unchanged.
    WriteFailure,
    /// Malformed query string.
    QuerySyntax,
    /// Manifest or segment unreadable or inconsistent.
    StoreCorruption,
    InvalidArgument,
    Io,
    Internal,
}

#[derive(Debug, ThisError)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    /// Offending substring for `QuerySyntax` errors
    pub fragment: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context, fragment: None }
    }

    pub fn write_failure(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::WriteFailure, context.into())
    }

    pub fn corruption(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::StoreCorruption, context.into())
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context.into())
    }

    pub fn query_syntax(fragment: impl Into<String>, reason: &str) -> Self {
        let fragment = fragment.into();
        Error {
            kind: ErrorKind::QuerySyntax,
            context: format!("{} near '{}'", reason, fragment),
            fragment: Some(fragment),
        }
    }

    /// Only commit failures are worth retrying; everything else needs the
    /// caller to change something first.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::WriteFailure
    }

    /// Reclassify plain I/O failures as commit failures.
    pub fn into_write_failure(self) -> Self {
        match self.kind {
            ErrorKind::Io | ErrorKind::Internal => Error {
                kind: ErrorKind::WriteFailure,
                ..self
            },
            _ => self,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::corruption(format!("decode failed: {}", err))
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error::corruption(format!("FST error: {}", err))
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::write_failure(format!("manifest replace failed: {}", err.error))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
