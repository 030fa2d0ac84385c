//! Unified error type.

/// The error type returned by Capsule's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding a port, compiling a route pattern,
/// resolving a service out of the [`Container`](crate::Container).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid route `{pattern}`: {reason}")]
    InvalidRoute { pattern: String, reason: String },

    #[error("duplicate route name `{0}`")]
    DuplicateRouteName(String),

    #[error("no route named `{0}`")]
    UnknownRoute(String),

    #[error("cannot build url for `{pattern}`: {reason}")]
    UrlGeneration { pattern: String, reason: String },

    #[error("service `{0}` is not registered")]
    ServiceNotFound(&'static str),

    #[error("circular dependency while resolving `{0}`")]
    CircularDependency(&'static str),

    #[error("service `{service}` failed to build: {reason}")]
    ServiceBuild { service: &'static str, reason: String },
}

impl Error {
    pub(crate) fn invalid_route(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRoute { pattern: pattern.to_owned(), reason: reason.into() }
    }
}
