//! Classification of persistence directives into backend kinds

use crate::config::Persist;
use crate::error::{Result, StorageError};
use std::fmt;

/// Connection-string schemes that select a shared remote backend
pub const REMOTE_SCHEMES: &[&str] = &["redis", "rediss"];

/// Backend kind a directive resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Ephemeral in-process storage
    Memory,
    /// Shared remote connection
    Remote,
    /// Directory-rooted file storage
    File,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Memory => "memory",
            BackendKind::Remote => "remote",
            BackendKind::File => "file",
        })
    }
}

/// A directive after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// No persistence requested
    Memory,
    /// Connection string with a recognised scheme
    Remote {
        /// Scheme name, without `://`
        scheme: &'static str,
        /// Full connection string
        url: &'a str,
    },
    /// File-system root
    File {
        /// Root directory namespaces are placed under
        root: &'a str,
    },
}

impl<'a> Directive<'a> {
    /// Classify a directive.
    ///
    /// The order is fixed: absent, then remote scheme, then file-system
    /// root. A string that matches a remote scheme is always remote, even if
    /// it could also be read as a path.
    pub fn classify(persist: Option<&'a Persist>) -> Result<Self> {
        match persist {
            None => Ok(Directive::Memory),
            Some(Persist::Flag(_)) => Err(StorageError::BooleanDirective),
            Some(Persist::Location(location)) => Self::classify_str(location),
        }
    }

    /// Classify a non-boolean directive string.
    ///
    /// An empty string is rejected with
    /// [`StorageError::InvalidDirective`] instead of being read as a root
    /// relative to the working directory; callers that want a relative
    /// store must name it (for example `"."`).
    pub fn classify_str(location: &'a str) -> Result<Self> {
        if let Some(scheme) = remote_scheme(location) {
            return Ok(Directive::Remote { scheme, url: location });
        }
        if location.is_empty() {
            return Err(StorageError::InvalidDirective(location.to_string()));
        }
        Ok(Directive::File { root: location })
    }

    /// Backend kind this directive selects
    pub fn kind(&self) -> BackendKind {
        match self {
            Directive::Memory => BackendKind::Memory,
            Directive::Remote { .. } => BackendKind::Remote,
            Directive::File { .. } => BackendKind::File,
        }
    }
}

/// Recognised remote scheme `location` starts with, if any.
///
/// Matching is anchored at the start and case-sensitive.
pub fn remote_scheme(location: &str) -> Option<&'static str> {
    REMOTE_SCHEMES.iter().copied().find(|scheme| {
        location
            .strip_prefix(*scheme)
            .is_some_and(|rest| rest.starts_with("://"))
    })
}
