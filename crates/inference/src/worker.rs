use crate::{backend::InferenceEngine, codec::PixelImage, errors::DispatchError};
use anyhow::Context;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use postprocess::{Detection, Labels, ModelFamily, SuppressionPolicy, decode_outputs, suppress};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// How long an idle worker sleeps before re-checking for shutdown.
const IDLE_WAKE: Duration = Duration::from_millis(10);

/// Lifecycle of a model worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Busy,
    Closed,
}

/// Per-model decode and queueing parameters.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub family: ModelFamily,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub suppression: SuppressionPolicy,
    pub queue_capacity: usize,
}

struct PendingRequest {
    image: PixelImage,
    reply: oneshot::Sender<Result<Vec<Detection>, DispatchError>>,
}

struct QueueInner {
    items: VecDeque<PendingRequest>,
    closed: bool,
}

/// Bounded request queue that favors fresh work: at capacity the oldest
/// pending request is displaced and resolved as superseded.
struct WorkQueue {
    inner: Mutex<QueueInner>,
    ready: Condvar,
    capacity: usize,
    superseded_counter: Counter<u64>,
}

impl WorkQueue {
    fn new(capacity: usize, superseded_counter: Counter<u64>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
            // A bounded queue needs at least one slot.
            capacity: capacity.max(1),
            superseded_counter,
        }
    }

    fn push(&self, request: PendingRequest) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.closed {
            return Err(DispatchError::WorkerClosed);
        }
        if inner.items.len() >= self.capacity {
            if let Some(displaced) = inner.items.pop_front() {
                self.superseded_counter.add(1, &[]);
                let _ = displaced.reply.send(Err(DispatchError::Superseded));
            }
        }
        inner.items.push_back(request);
        drop(inner);
        self.ready.notify_one();
        Ok(())
    }

    /// Close the queue and append the shutdown sentinel (an empty image)
    /// behind any backlog, so queued requests still drain in order.
    fn push_sentinel(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.closed {
            return;
        }
        inner.closed = true;
        let (reply, _) = oneshot::channel();
        inner.items.push_back(PendingRequest {
            image: PixelImage::empty(),
            reply,
        });
        drop(inner);
        self.ready.notify_one();
    }

    /// Take the next request, waiting up to `timeout` for one to arrive.
    fn pop_wait(&self, timeout: Duration) -> Option<PendingRequest> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(request) = inner.items.pop_front() {
            return Some(request);
        }
        let (mut inner, _) = self
            .ready
            .wait_timeout(inner, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        inner.items.pop_front()
    }

    fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }
}

fn init_metrics(
    meter_name: &'static str,
) -> (Histogram<f64>, Counter<u64>, Counter<u64>, Counter<u64>) {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.001, 0.002, 0.005, 0.007, 0.01, 0.015, 0.02, 0.025, 0.03, 0.04, 0.05, 0.075, 0.1, 0.15,
        0.2, 0.5,
    ];
    let duration_histogram: Histogram<f64> = meter
        .f64_histogram("inference_duration_seconds")
        .with_description("Time to answer a single request (infer + decode + suppress)")
        .with_unit("s")
        .with_boundaries(latency_buckets.to_vec())
        .build();
    let requests_counter: Counter<u64> = meter
        .u64_counter("inference_requests_total")
        .with_description("Total requests answered")
        .build();
    let superseded_counter: Counter<u64> = meter
        .u64_counter("inference_requests_superseded_total")
        .with_description("Total queued requests displaced by newer work")
        .build();
    let detections_counter: Counter<u64> = meter
        .u64_counter("inference_detections_total")
        .with_description("Total detections produced")
        .build();

    (
        duration_histogram,
        requests_counter,
        superseded_counter,
        detections_counter,
    )
}

/// Runs one loaded model on a dedicated thread, answering queued requests.
struct Worker<E: InferenceEngine> {
    name: String,
    engine: E,
    settings: WorkerSettings,
    labels: Arc<Labels>,
    queue: Arc<WorkQueue>,
    state: Arc<Mutex<WorkerState>>,
    duration_histogram: Histogram<f64>,
    requests_counter: Counter<u64>,
    detections_counter: Counter<u64>,
}

impl<E: InferenceEngine> Worker<E> {
    fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn run(mut self) {
        tracing::info!(model = %self.name, "Model worker starting");

        let mut requests_processed = 0u64;
        let mut total_detections = 0usize;

        while self.state() != WorkerState::Closed {
            let Some(request) = self.queue.pop_wait(IDLE_WAKE) else {
                if self.queue.is_closed() {
                    self.set_state(WorkerState::Closed);
                }
                continue;
            };

            // The shutdown sentinel sits behind the backlog, so queued
            // requests are answered before the worker stops.
            if request.image.is_empty() {
                self.set_state(WorkerState::Closed);
                continue;
            }

            self.set_state(WorkerState::Busy);
            let start = Instant::now();
            let detections = self.run_inference(&request.image);
            let elapsed = start.elapsed().as_secs_f64();

            self.duration_histogram.record(elapsed, &[]);
            self.requests_counter.add(1, &[]);
            self.detections_counter.add(detections.len() as u64, &[]);

            requests_processed += 1;
            total_detections += detections.len();
            let _ = request.reply.send(Ok(detections));
            self.set_state(WorkerState::Idle);

            if requests_processed.is_multiple_of(10) {
                tracing::debug!(
                    model = %self.name,
                    requests_processed,
                    total_detections,
                    "Request processed"
                );
            }
        }

        tracing::info!(model = %self.name, "Model worker stopped");
    }

    /// Run one image through the model. Failures are logged and answered
    /// with no detections rather than tearing the worker down.
    fn run_inference(&mut self, image: &PixelImage) -> Vec<Detection> {
        let _infer_span = tracing::info_span!("model_inference", model = %self.name).entered();

        if let Err(e) = self.engine.fill_input(image) {
            tracing::error!(model = %self.name, error = %e, "Failed to fill input tensor");
            return Vec::new();
        }
        if let Err(e) = self.engine.invoke() {
            tracing::error!(model = %self.name, error = %e, "Inference invocation failed");
            return Vec::new();
        }

        let mut outputs = Vec::with_capacity(self.engine.output_count());
        for index in 0..self.engine.output_count() {
            match self.engine.output_tensor(index) {
                Ok(tensor) => outputs.push(tensor),
                Err(e) => {
                    tracing::warn!(model = %self.name, index, error = %e, "Missing output tensor");
                }
            }
        }

        // Boxes are scaled to the source image, not the model input.
        let candidates = decode_outputs(
            self.settings.family,
            &outputs,
            self.engine.dequant_mode(),
            self.settings.score_threshold,
            image.width as f32,
            image.height as f32,
        );

        suppress(
            self.settings.suppression,
            &candidates,
            self.settings.score_threshold,
            self.settings.nms_threshold,
            &self.labels,
        )
    }
}

/// Submission side of one model worker.
pub struct WorkerHandle {
    queue: Arc<WorkQueue>,
    state: Arc<Mutex<WorkerState>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    /// Queue an image for inference, returning a receiver for its result.
    ///
    /// Fails immediately with `WorkerClosed` after shutdown; a queued
    /// request resolves as `Superseded` when newer work displaces it.
    pub fn submit(
        &self,
        image: PixelImage,
    ) -> Result<oneshot::Receiver<Result<Vec<Detection>, DispatchError>>, DispatchError> {
        let (reply, receiver) = oneshot::channel();
        self.queue.push(PendingRequest { image, reply })?;
        Ok(receiver)
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the worker once it has drained its backlog, then join it.
    pub fn shutdown(&self) {
        self.queue.push_sentinel();
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("Worker thread panicked during shutdown");
            }
        }
    }
}

/// Spawn a dedicated worker thread for one loaded model.
pub fn spawn_worker<E: InferenceEngine>(
    name: &str,
    engine: E,
    settings: WorkerSettings,
    labels: Arc<Labels>,
) -> anyhow::Result<WorkerHandle> {
    let (duration_histogram, requests_counter, superseded_counter, detections_counter) =
        init_metrics("inference");

    let queue = Arc::new(WorkQueue::new(settings.queue_capacity, superseded_counter));
    let state = Arc::new(Mutex::new(WorkerState::Idle));

    let worker = Worker {
        name: name.to_string(),
        engine,
        settings,
        labels,
        queue: Arc::clone(&queue),
        state: Arc::clone(&state),
        duration_histogram,
        requests_counter,
        detections_counter,
    };

    let thread = thread::Builder::new()
        .name(format!("model-{name}"))
        .spawn(move || worker.run())
        .with_context(|| format!("Failed to spawn worker thread for model {name}"))?;

    Ok(WorkerHandle {
        queue,
        state,
        thread: Mutex::new(Some(thread)),
    })
}
