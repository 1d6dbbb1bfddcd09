use common::span_debug;

/// Decoded RGB image, 3 bytes per pixel.
///
/// The empty image (no pixels) never enters the work queue as a request;
/// inside the queue it is reserved as the worker shutdown sentinel, so
/// callers must reject empty images before dispatching.
#[derive(Debug, Clone, Default)]
pub struct PixelImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PixelImage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Decodes an encoded image body (JPEG or PNG) into RGB pixels.
///
/// Decode failures are logged and yield the empty image rather than an
/// error; the caller decides how to reject it.
pub fn decode_image(data: &[u8]) -> PixelImage {
    let _s = span_debug!("decode_image");

    match image::load_from_memory(data) {
        Ok(decoded) => {
            let rgb = decoded.to_rgb8();
            PixelImage {
                width: rgb.width(),
                height: rgb.height(),
                pixels: rgb.into_raw(),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode image body");
            PixelImage::empty()
        }
    }
}
