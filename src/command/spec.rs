//! # Command specification.
//!
//! Defines [`CommandSpec`] the program name and arguments every attempt runs.
//!
//! A `CommandSpec` is immutable once a run starts. [`CommandSpec::resolve`] locates
//! the executable the same way a shell would: names containing a path separator
//! are checked directly, bare names are searched in `PATH`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RetryError;

/// Program name and argument list of the command to retry.
///
/// ## Example
/// ```rust
/// use retry_exec::CommandSpec;
///
/// let spec = CommandSpec::new("echo").arg("hello").arg("world");
/// assert_eq!(spec.name(), "echo");
/// assert_eq!(spec.args(), ["hello", "world"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    name: Arc<str>,
    args: Arc<[String]>,
}

impl CommandSpec {
    /// Creates a spec without arguments.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            args: Arc::from(Vec::new()),
        }
    }

    /// Creates a spec from a name and arguments.
    pub fn with_args<I, S>(name: impl Into<Arc<str>>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a new spec with one more argument.
    pub fn arg(self, arg: impl Into<String>) -> Self {
        let mut args = self.args.to_vec();
        args.push(arg.into());
        Self {
            name: self.name,
            args: args.into(),
        }
    }

    /// Program name as given by the caller.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the program name (cheap to clone into events).
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Arguments passed to every attempt.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn args_arc(&self) -> Arc<[String]> {
        Arc::clone(&self.args)
    }

    /// Locates the executable.
    ///
    /// Returns [`RetryError::NotFound`] when the name does not resolve to an
    /// executable file; callers must not schedule any attempt in that case.
    pub fn resolve(&self) -> Result<PathBuf, RetryError> {
        which::which(self.name()).map_err(|_| RetryError::NotFound {
            name: self.name().to_string(),
        })
    }
}
