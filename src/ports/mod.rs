// Ports - Interface definitions (contracts)

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CutXResult;

/// One transcoder run: its arguments and the file it writes
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub output: PathBuf,
}

impl Invocation {
    pub fn new(args: Vec<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            args,
            output: output.into(),
        }
    }

    /// Whether `flag` appears among the arguments
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }

    /// Value following `flag`, if present
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Port for media duration queries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Container duration in seconds
    async fn probe_duration(&self, path: &Path) -> CutXResult<f64>;
}

/// Port for running the external transcoder
#[async_trait]
pub trait TranscodePort: Send + Sync {
    /// Run to completion, passing every stderr line to `on_line`.
    ///
    /// A spawn failure or non-zero exit is a `CutXError::Transcode`.
    async fn run(
        &self,
        invocation: &Invocation,
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
    ) -> CutXResult<()>;
}
