//! The boundary between epkit and the inference runtime.
//!
//! Everything in this module describes a collaborator that epkit configures
//! but does not implement: the environment which reports hardware devices, the
//! session configuration which collects execution providers, and the compiler
//! which turns a model into a device-specialized artifact.
//!
//! ## Environments
//!
//! An [`Environment`] enumerates the execution-provider devices that are
//! currently available. The default implementation, [`ManifestEnvironment`],
//! serves a fixed device list declared in the configuration file. Code that
//! needs devices should receive an environment explicitly; the process-wide
//! default returned by [`environment::global`] is only consulted by `main`.
//!
//! ## Compilation
//!
//! A [`ModelCompiler`] produces a compiled model from a source model for the
//! execution providers attached to a [`SessionOptions`]. Compilation is driven
//! through [`ModelCompilationOptions`], a scoped resource released on drop.
//!
//! ## Error Handling
//!
//! Runtime failures are reported through [`Error`]. The [`ErrorKind`] gives the
//! category, and the underlying cause (an I/O error, a subprocess failure) is
//! available as the error source.

pub(crate) mod compiler;
pub(crate) mod device;
pub(crate) mod environment;
pub(crate) mod session;

use std::error::Error as StdError;
use std::fmt;

pub(crate) use compiler::{CommandCompiler, ModelCompilationOptions, ModelCompiler};
pub(crate) use device::{EpDevice, HardwareDeviceType};
pub(crate) use environment::{Environment, ManifestEnvironment};
pub(crate) use session::{ProviderOptions, SessionOptions};

/// General categories of errors raised by the inference runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// The environment failed to enumerate its devices.
    Enumeration,
    /// A device handed to the runtime is not one the environment reports,
    /// or a device list was empty or inconsistent.
    InvalidDevice,
    /// The model compiler could not be started or was misconfigured.
    Compilation,
    /// A filesystem operation failed.
    Io,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    detail: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    #[cfg(test)]
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error {
            kind,
            detail: None,
            source: None,
        }
    }

    pub(crate) fn with_detail<S: Into<String>>(kind: ErrorKind, detail: S) -> Error {
        Error {
            kind,
            detail: Some(detail.into()),
            source: None,
        }
    }

    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            kind,
            detail: None,
            source: Some(source),
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Enumeration => "failed to enumerate execution provider devices",
            ErrorKind::InvalidDevice => "invalid execution provider device",
            ErrorKind::Compilation => "model compilation failed",
            ErrorKind::Io => "a filesystem operation failed",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.message(), detail),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::from_source(ErrorKind::Io, Box::new(value))
    }
}
