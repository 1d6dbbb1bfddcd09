use crate::{
    backend::{AcceleratorDevice, InferenceEngine},
    codec::PixelImage,
    config::DetectorConfig,
    errors::DispatchError,
    worker::{WorkerHandle, WorkerSettings, spawn_worker},
};
use postprocess::{Detection, Labels, ModelFamily};
use std::collections::BTreeMap;
use std::sync::Arc;

/// All loaded models keyed by their configured path, plus the accelerators
/// visible to the backend that loaded them.
///
/// The map is built once at startup and read-only afterwards.
pub struct ModelRegistry {
    workers: BTreeMap<String, WorkerHandle>,
    devices: Vec<AcceleratorDevice>,
}

impl ModelRegistry {
    /// Load every configured model and spawn a worker thread for each.
    ///
    /// A model that fails to load is logged and excluded; loading nothing
    /// at all is a configuration error.
    pub fn load<E: InferenceEngine>(
        config: &DetectorConfig,
        labels: Arc<Labels>,
    ) -> anyhow::Result<Self> {
        let devices = E::devices();
        let mut workers = BTreeMap::new();

        for path in &config.model_paths {
            let engine = match E::load_model(path) {
                Ok(engine) => engine,
                Err(e) => {
                    tracing::error!(model = %path, error = %e, "Failed to load model");
                    continue;
                }
            };

            let settings = WorkerSettings {
                family: ModelFamily::from_model_path(path),
                score_threshold: config.score_threshold,
                nms_threshold: config.nms_threshold,
                suppression: config.suppression,
                queue_capacity: config.queue_capacity,
            };
            let handle = spawn_worker(path, engine, settings, Arc::clone(&labels))?;

            tracing::info!(
                model = %path,
                family = ?ModelFamily::from_model_path(path),
                "Model loaded"
            );
            workers.insert(path.clone(), handle);
        }

        if workers.is_empty() {
            anyhow::bail!("no models could be loaded");
        }

        Ok(Self { workers, devices })
    }

    /// Identifiers of all loaded models, sorted.
    pub fn list_models(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }

    /// Accelerators enumerated by the backend at startup.
    pub fn devices(&self) -> &[AcceleratorDevice] {
        &self.devices
    }

    /// Queue `image` on the named model's worker and await its result.
    pub async fn dispatch(
        &self,
        model: &str,
        image: PixelImage,
    ) -> Result<Vec<Detection>, DispatchError> {
        let worker = self
            .workers
            .get(model)
            .ok_or_else(|| DispatchError::UnknownModel(model.to_string()))?;
        let receiver = worker.submit(image)?;
        // The sender drops without replying only if the worker stops.
        receiver.await.map_err(|_| DispatchError::WorkerClosed)?
    }

    /// Stop every worker, letting each drain its backlog first.
    pub fn shutdown(&self) {
        for (model, worker) in &self.workers {
            tracing::info!(model = %model, "Stopping model worker");
            worker.shutdown();
        }
    }
}
