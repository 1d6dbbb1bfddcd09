use thiserror::Error;

/// Failures surfaced to callers of [`crate::ModelRegistry::dispatch`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("request superseded by newer work")]
    Superseded,

    #[error("model worker is shut down")]
    WorkerClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = DispatchError::UnknownModel("models/yolo/x.tflite".to_string());
        assert_eq!(
            err.to_string(),
            "unknown model: models/yolo/x.tflite",
            "UnknownModel should name the requested model"
        );

        let err = DispatchError::Superseded;
        assert_eq!(
            err.to_string(),
            "request superseded by newer work",
            "Superseded should display correct message"
        );

        let err = DispatchError::WorkerClosed;
        assert_eq!(
            err.to_string(),
            "model worker is shut down",
            "WorkerClosed should display correct message"
        );
    }
}
