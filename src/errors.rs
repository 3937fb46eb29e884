use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    pub(crate) kind: ErrorKind,
    pub(crate) cause: Option<ErrorDetail>,
}

#[derive(Debug)]
pub enum ErrorDetail {
    Error(Box<Error>),
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Directory { path: PathBuf },
    Parse { path: PathBuf },
    KeyLoad { path: PathBuf },
    Signing { digest: String },
    Removal { path: PathBuf },
    Write { path: PathBuf },
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(value: ErrorKind) -> Self {
        Self {
            kind: value,
            cause: None,
        }
    }
}

impl ErrorKind {
    pub fn wrap(self, err: Error) -> Error {
        Error {
            kind: self,
            cause: Some(ErrorDetail::Error(Box::new(err))),
        }
    }
    pub fn with_msg(self, msg: impl Into<String>) -> Error {
        Error {
            kind: self,
            cause: Some(ErrorDetail::Message(msg.into())),
        }
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = vec![
            Some(self.kind.to_string()),
            self.cause.as_ref().map(|it| it.to_string()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(":\n");
        f.write_str(&message)
    }
}

impl Display for ErrorDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetail::Error(err) => write!(f, "{}", err),
            ErrorDetail::Message(msg) => f.write_str(msg),
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => {
                write!(f, "invalid configuration")
            }
            ErrorKind::Directory { path } => {
                write!(f, "the directory {} does not exist", path.display())
            }
            ErrorKind::Parse { path } => {
                write!(
                    f,
                    "{} is not a valid certificate signing request",
                    path.display()
                )
            }
            ErrorKind::KeyLoad { path } => {
                write!(f, "could not load private key {}", path.display())
            }
            ErrorKind::Signing { digest } => {
                write!(f, "could not sign request with digest \"{digest}\"")
            }
            ErrorKind::Removal { path } => {
                write!(f, "could not remove {}", path.display())
            }
            ErrorKind::Write { path } => {
                write!(f, "could not write {}", path.display())
            }
        }
    }
}
