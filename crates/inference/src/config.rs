use postprocess::SuppressionPolicy;
use std::env;

pub use common::Environment;

const DEFAULT_MODEL_PATH: &str = "models/yolo/lite-model_yolo-v5-tflite_tflite_model_1.tflite";
const DEFAULT_LABEL_PATH: &str = "models/coco.names";

/// Detection pipeline configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub environment: Environment,
    pub model_paths: Vec<String>,
    pub label_path: String,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub queue_capacity: usize,
    pub suppression: SuppressionPolicy,
}

impl DetectorConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let model_paths: Vec<String> = env::var("MODEL_PATHS")
            .unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string())
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        let label_path = env::var("LABEL_PATH").unwrap_or_else(|_| DEFAULT_LABEL_PATH.to_string());

        let score_threshold = env::var("SCORE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.5);

        let nms_threshold = env::var("NMS_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.5);

        // A bounded queue needs at least one slot.
        let queue_capacity = env::var("QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25)
            .max(1);

        let suppression = env::var("SUPPRESSION_POLICY")
            .ok()
            .and_then(|s| SuppressionPolicy::from_name(&s))
            .unwrap_or(SuppressionPolicy::Standard);

        Ok(Self {
            environment,
            model_paths,
            label_path,
            score_threshold,
            nms_threshold,
            queue_capacity,
            suppression,
        })
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            model_paths: vec!["models/yolo/test.tflite".to_string()],
            label_path: "models/coco.names".to_string(),
            score_threshold: 0.5,
            nms_threshold: 0.5,
            queue_capacity: 25,
            suppression: SuppressionPolicy::Standard,
        }
    }
}
