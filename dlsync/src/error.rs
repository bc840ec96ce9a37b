use std::{error, fmt, io, string::FromUtf8Error};

use camino::FromPathBufError;
use serde::{Deserialize, Serialize};

/// Errors raised while capturing, normalizing or comparing trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Error {
    /// A root path or one of its sub-directories cannot be listed.
    NamespaceUnavailable { path: String, reason: String },
    /// A cached snapshot could not be parsed or misses required fields.
    MalformedCache(String),
    /// An entry could not be matched or classified.
    AmbiguousMatch { path: String, reason: String },
    Config(String),
    Utf8(String),
    Io(String),
    Auth(String),
    Api(String),
    Other(String),
}

impl Error {
    pub fn unavailable<P, R>(path: P, reason: R) -> Self
    where
        P: fmt::Display,
        R: fmt::Display,
    {
        Self::NamespaceUnavailable {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn ambiguous<P, R>(path: P, reason: R) -> Self
    where
        P: fmt::Display,
        R: fmt::Display,
    {
        Self::AmbiguousMatch {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_malformed_cache(&self) -> bool {
        matches!(self, Self::MalformedCache(..))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamespaceUnavailable { path, reason } => {
                write!(f, "Cannot list '{path}': {reason}")
            }
            Self::MalformedCache(msg) => write!(f, "Malformed snapshot cache: {msg}"),
            Self::AmbiguousMatch { path, reason } => {
                write!(f, "Cannot classify '{path}': {reason}")
            }
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Utf8(msg) => write!(f, "Non UTF-8 string: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Auth(msg) => write!(f, "Authorization error: {msg}"),
            Self::Api(msg) => write!(f, "API error: {msg}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl error::Error for Error {}

impl From<FromUtf8Error> for Error {
    fn from(value: FromUtf8Error) -> Self {
        Self::Utf8(String::from_utf8_lossy(&value.into_bytes()).to_string())
    }
}

impl From<FromPathBufError> for Error {
    fn from(value: FromPathBufError) -> Self {
        Self::Utf8(value.as_path().as_os_str().to_string_lossy().to_string())
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::Api(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! config_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Config(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! api_error {
    ($($t:tt)*) => {
        $crate::Error::Api(format!($($t)*))
    };
}

#[macro_export]
macro_rules! auth_error {
    ($($t:tt)*) => {
        $crate::Error::Auth(format!($($t)*))
    };
}

#[macro_export]
macro_rules! cache_error {
    ($($t:tt)*) => {
        $crate::Error::MalformedCache(format!($($t)*))
    };
}
