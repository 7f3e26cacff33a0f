use thiserror::Error;

/// Job-level errors surfaced to callers of the two entry points.
///
/// Per-tier failures are not represented here: a GPU or module failure is
/// handled by downgrading the job to a lower tier and only becomes an
/// `EngineError` when the last-resort scalar tier itself fails or no tier
/// accepts the work.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source buffer length {actual} does not match {width}x{height} RGBA ({expected})")]
    SourceSizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("no backend supports {algorithm} in the requested color mode")]
    NoSupportingBackend { algorithm: &'static str },

    #[error("all backends failed; last error: {0}")]
    AllBackendsFailed(#[source] BackendError),

    #[error("job cancelled")]
    Cancelled,
}

/// Failures inside one backend tier, caught per chunk by the scheduler.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("GPU unavailable: {0}")]
    GpuUnavailable(String),

    #[error("GPU execution failed: {0}")]
    Gpu(String),

    #[error("module error: {0}")]
    Module(#[from] ModuleError),

    #[error("algorithm not supported by this backend")]
    Unsupported,
}

/// Compiled-module tier failures: loading, linking and per-call faults.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("artifact fetch failed: {0}")]
    Fetch(String),

    #[error("invalid module binary: {0}")]
    Invalid(String),

    #[error("module is missing required export {0:?}")]
    MissingExport(&'static str),

    #[error("module call failed: {0}")]
    Call(String),

    #[error("module not loaded")]
    NotLoaded,

    #[error("module tier unavailable after {attempts} failed load attempts")]
    Unavailable { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_messages() {
        let err = EngineError::SourceSizeMismatch {
            width: 4,
            height: 4,
            expected: 64,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "source buffer length 10 does not match 4x4 RGBA (64)"
        );

        let err = EngineError::NoSupportingBackend {
            algorithm: "ordered",
        };
        assert_eq!(
            err.to_string(),
            "no backend supports ordered in the requested color mode"
        );
    }

    #[test]
    fn test_module_error_chains_into_backend_error() {
        let err: BackendError = ModuleError::NotLoaded.into();
        match err {
            BackendError::Module(ModuleError::NotLoaded) => {}
            other => panic!("expected Module(NotLoaded), got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_message_counts_attempts() {
        let err = ModuleError::Unavailable { attempts: 3 };
        assert_eq!(
            err.to_string(),
            "module tier unavailable after 3 failed load attempts"
        );
    }
}
