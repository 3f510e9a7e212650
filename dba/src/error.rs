use std::error;
use std::fmt;

/// Convenient result type using [`DbaError`] as the error type.
pub type DbaResult<T> = Result<T, DbaError>;

/// Main error type for resolution, tunneling and session operations.
///
/// A [`DbaError`] is either a single error carrying an [`ErrorKind`], a static
/// description and an optional dynamic detail, or an aggregate of several errors.
#[derive(Debug, Clone)]
pub struct DbaError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    Many(Vec<DbaError>),
}

/// Categories of failures.
///
/// Every kind is fatal to the current invocation. Inside a replica-set scan,
/// [`ErrorKind::ConnectFailed`], [`ErrorKind::ProbeFailed`] and
/// [`ErrorKind::ProbeTimeout`] only disqualify the probed ordinal.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Instance state
    NotReady,
    NotFound,
    NoPrimaryFound,

    // Cluster API
    Unauthorized,
    ClusterUnreachable,
    ClusterRequestFailed,

    // Tunnels and probes
    ConnectFailed,
    ProbeFailed,
    ProbeTimeout,

    // Client sessions
    ClientExitFailure,

    // Data, configuration and IO
    InvalidData,
    DeserializationError,
    ConfigError,
    IoError,

    Unknown,
}

impl DbaError {
    /// Creates a [`DbaError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<DbaError>) -> DbaError {
        DbaError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }

    /// Returns a copy of this error whose detail is prefixed with `context`.
    ///
    /// Used to attach the engine, namespace and instance name to errors that
    /// surface from lower layers.
    pub fn with_context(self, context: impl fmt::Display) -> DbaError {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => DbaError {
                repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, context.to_string()),
            },
            ErrorRepr::WithDescriptionAndDetail(kind, desc, detail) => DbaError {
                repr: ErrorRepr::WithDescriptionAndDetail(
                    kind,
                    desc,
                    format!("{context}: {detail}"),
                ),
            },
            ErrorRepr::Many(errors) => {
                let context = context.to_string();
                DbaError::many(
                    errors
                        .into_iter()
                        .map(|err| err.with_context(&context))
                        .collect(),
                )
            }
        }
    }
}

impl PartialEq for DbaError {
    fn eq(&self, other: &DbaError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for DbaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")?;
                } else if errors.len() == 1 {
                    errors[0].fmt(f)?;
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl error::Error for DbaError {}

impl From<(ErrorKind, &'static str)> for DbaError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> DbaError {
        DbaError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for DbaError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> DbaError {
        DbaError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl From<std::io::Error> for DbaError {
    fn from(err: std::io::Error) -> DbaError {
        DbaError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

impl From<serde_json::Error> for DbaError {
    fn from(err: serde_json::Error) -> DbaError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        DbaError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`kube::Error`] to [`DbaError`], classifying API status codes.
///
/// 404 maps to [`ErrorKind::NotFound`], 401 and 403 to [`ErrorKind::Unauthorized`],
/// other API responses to [`ErrorKind::ClusterRequestFailed`], and transport
/// failures to [`ErrorKind::ClusterUnreachable`].
impl From<kube::Error> for DbaError {
    fn from(err: kube::Error) -> DbaError {
        let (kind, description) = match &err {
            kube::Error::Api(response) => match response.code {
                404 => (ErrorKind::NotFound, "Cluster resource not found"),
                401 | 403 => (
                    ErrorKind::Unauthorized,
                    "Cluster API request was not authorized",
                ),
                _ => (
                    ErrorKind::ClusterRequestFailed,
                    "Cluster API request was rejected",
                ),
            },
            kube::Error::Auth(_) => (
                ErrorKind::Unauthorized,
                "Cluster API authentication failed",
            ),
            kube::Error::UpgradeConnection(_) => (
                ErrorKind::ConnectFailed,
                "Port-forward connection upgrade failed",
            ),
            kube::Error::SerdeError(_) => (
                ErrorKind::DeserializationError,
                "Cluster API response could not be decoded",
            ),
            _ => (
                ErrorKind::ClusterUnreachable,
                "Cluster API could not be reached",
            ),
        };

        DbaError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

impl From<kube::config::KubeconfigError> for DbaError {
    fn from(err: kube::config::KubeconfigError) -> DbaError {
        DbaError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConfigError,
                "Kubeconfig could not be loaded",
                err.to_string(),
            ),
        }
    }
}

impl From<mongodb::error::Error> for DbaError {
    fn from(err: mongodb::error::Error) -> DbaError {
        DbaError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ProbeFailed,
                "MongoDB primary probe failed",
                err.to_string(),
            ),
        }
    }
}

impl From<sqlx::Error> for DbaError {
    fn from(err: sqlx::Error) -> DbaError {
        DbaError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ProbeFailed,
                "MySQL primary probe failed",
                err.to_string(),
            ),
        }
    }
}
