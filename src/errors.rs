use nvml_wrapper::error::NvmlError;
use std::io;
use thiserror::Error;

use crate::metrics::Pid;

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("process no longer exists (pid={0})")]
    NoSuchProcess(Pid),
    #[error("access denied (pid={0})")]
    AccessDenied(Pid),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("NVML error: {0}")]
    Nvml(#[from] NvmlError),
    #[error("failed to serialize sample: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SampleError {
    /// Maps an I/O failure on a `/proc/<pid>` file to the process-level error it means.
    pub fn from_proc_io(pid: Pid, path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => SampleError::NoSuchProcess(pid),
            io::ErrorKind::PermissionDenied => SampleError::AccessDenied(pid),
            _ => SampleError::Io {
                path: path.to_string(),
                source: err,
            },
        }
    }

    /// Errors that mean "this candidate went away or is not ours to inspect".
    pub fn is_transient_inspection(&self) -> bool {
        matches!(self, SampleError::NoSuchProcess(_) | SampleError::AccessDenied(_))
    }
}
