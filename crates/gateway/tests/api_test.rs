use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::Environment;
use gateway::{AppState, build_router};
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use inference::{AcceleratorDevice, DetectorConfig, InferenceEngine, ModelRegistry, PixelImage};
use postprocess::{Labels, RawTensor, SuppressionPolicy};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const GOOD_MODEL: &str = "models/yolo/good.tflite";
const OTHER_MODEL: &str = "models/yolo/zebra.tflite";

/// Engine that replays one flat tensor: a strong class-0 box in the image
/// center plus a weak record that objectness gating removes.
struct FlatEngine {
    outputs: Vec<RawTensor>,
}

impl InferenceEngine for FlatEngine {
    fn load_model(path: &str) -> anyhow::Result<Self> {
        if path.contains("missing") {
            anyhow::bail!("model file not found: {path}");
        }

        let mut strong = vec![0.0f32; 85];
        strong[0] = 0.5;
        strong[1] = 0.5;
        strong[2] = 0.4;
        strong[3] = 0.4;
        strong[4] = 0.9;
        strong[5] = 0.8;

        let mut weak = vec![0.0f32; 85];
        weak[0] = 0.5;
        weak[1] = 0.5;
        weak[2] = 0.4;
        weak[3] = 0.4;
        weak[4] = 0.2;
        weak[6] = 0.9;

        let mut data = strong;
        data.extend_from_slice(&weak);
        Ok(Self {
            outputs: vec![RawTensor::from_f32(data, vec![1, 2, 85])],
        })
    }

    fn fill_input(&mut self, _image: &PixelImage) -> anyhow::Result<()> {
        Ok(())
    }

    fn invoke(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn output_tensor(&self, index: usize) -> anyhow::Result<RawTensor> {
        self.outputs
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no output tensor at index {index}"))
    }

    fn devices() -> Vec<AcceleratorDevice> {
        vec![AcceleratorDevice {
            kind: "test".to_string(),
            index: 0,
        }]
    }
}

fn test_config() -> DetectorConfig {
    DetectorConfig {
        environment: Environment::Development,
        model_paths: vec![GOOD_MODEL.to_string(), OTHER_MODEL.to_string()],
        label_path: "models/coco.names".to_string(),
        score_threshold: 0.5,
        nms_threshold: 0.5,
        queue_capacity: 4,
        suppression: SuppressionPolicy::Standard,
    }
}

fn test_registry() -> Arc<ModelRegistry> {
    let labels = Arc::new(Labels::from_lines(["person", "bicycle"]));
    Arc::new(ModelRegistry::load::<FlatEngine>(&test_config(), labels).expect("registry loads"))
}

fn test_app() -> Router {
    build_router(
        AppState {
            registry: test_registry(),
        },
        "./static",
    )
}

fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png encoding succeeds");
    bytes
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body reads")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// POST a PNG through the full stack: body decode, dispatch, inference,
/// geometry decode, suppression, JSON reply.
///
/// Tests:
/// - 200 with a JSON array body
/// - the weak record is gated out, so exactly one detection survives
/// - wire field names and pixel-space geometry
#[tokio::test]
async fn test_invoke_returns_detections_for_posted_image() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/invoke/{GOOD_MODEL}"))
        .body(Body::from(encode_png(100, 80)))
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::OK);

    let value = body_json(response).await;
    let detections = value.as_array().expect("body is a JSON array");
    assert_eq!(detections.len(), 1, "weak record should be gated out");

    let detection = &detections[0];
    assert_eq!(detection["ClassID"], 0);
    assert_eq!(detection["ClassName"], "person");
    assert_eq!(detection["Box"]["Min"]["X"], 30);
    assert_eq!(detection["Box"]["Min"]["Y"], 24);
    assert_eq!(detection["Box"]["Max"]["X"], 70);
    assert_eq!(detection["Box"]["Max"]["Y"], 56);
    let score = detection["Score"].as_f64().expect("score is a number");
    assert!(
        (score - 0.8).abs() < 1e-6,
        "confidence should be the class score, got {score}"
    );
}

#[tokio::test]
async fn test_invoke_with_empty_body_is_rejected() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/invoke/{GOOD_MODEL}"))
        .body(Body::empty())
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, "body is empty");
}

#[tokio::test]
async fn test_invoke_with_undecodable_body_is_rejected() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/invoke/{GOOD_MODEL}"))
        .body(Body::from("definitely not an image"))
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, "cannot get image from body");
}

#[tokio::test]
async fn test_invoke_with_unknown_model_is_not_found() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/invoke/models/yolo/unknown.tflite")
        .body(Body::from(encode_png(32, 32)))
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_models_endpoint_lists_sorted_identifiers() {
    let app = test_app();
    let request = Request::builder()
        .uri("/models")
        .body(Body::empty())
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!([GOOD_MODEL, OTHER_MODEL])
    );
}

#[tokio::test]
async fn test_devices_endpoint_reports_accelerators() {
    let app = test_app();
    let request = Request::builder()
        .uri("/devices")
        .body(Body::empty())
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!([{"Kind": "test", "Index": 0}])
    );
}

#[tokio::test]
async fn test_invoke_after_shutdown_is_unavailable() {
    let registry = test_registry();
    registry.shutdown();
    let app = build_router(AppState { registry }, "./static");

    let request = Request::builder()
        .method("POST")
        .uri(format!("/invoke/{GOOD_MODEL}"))
        .body(Body::from(encode_png(32, 32)))
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unmatched_path_falls_through_to_static_files() {
    let app = test_app();
    let request = Request::builder()
        .uri("/no-such-page.html")
        .body(Body::empty())
        .expect("request builds");

    let response = app.oneshot(request).await.expect("request is handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
