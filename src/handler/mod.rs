//! The stylization request handler.

mod envelope;
mod request;

pub use envelope::{ErrorBody, Response, SuccessBody, STATUS_ERROR, STATUS_OK};
pub use request::{Request, CONTENT_FIELD, IMAGE_SIZE_FIELD, STYLE_FIELD};

use std::time::Instant;

use crate::error::{Error, Result};
use crate::image;
use crate::model::StyleModel;

/// Configuration for the stylization handler.
#[derive(Debug, Clone)]
pub struct Config {
    /// Largest accepted `image_size`. `None`, the default, accepts any positive
    /// size; memory and compute then grow with the square of the request.
    pub max_image_size: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_image_size: None,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.max_image_size == Some(0) {
            return Err(Error::InvalidParameter {
                name: "max_image_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Turns content/style uploads into a stylized PNG using a loaded model.
///
/// The model is loaded once by the caller and handed in; the handler holds no
/// other state, so `handle` may be called concurrently from several threads.
pub struct Handler<M> {
    config: Config,
    model: M,
}

impl<M: StyleModel> Handler<M> {
    /// Create a new handler around an already loaded model.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(model: M, config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing handler with config: {config:?}");

        Ok(Self { config, model })
    }

    /// Process one request. Always returns exactly one envelope.
    pub fn handle(&self, request: &Request) -> Response {
        let start = Instant::now();
        let result = self.stylize(request);

        match &result {
            Ok(_) => tracing::info!("Stylized request in {:?}", start.elapsed()),
            Err(err) => tracing::warn!(
                kind = err.kind().as_str(),
                "Stylization failed after {:?}: {err}",
                start.elapsed()
            ),
        }

        Response::from_result(result)
    }

    /// Run the full pipeline, returning the success body or the first failure.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload is missing or undecodable, `image_size` is
    /// invalid, or inference or encoding fails.
    pub fn stylize(&self, request: &Request) -> Result<SuccessBody> {
        let content_bytes = request.file(CONTENT_FIELD)?;
        let style_bytes = request.file(STYLE_FIELD)?;
        let size = self.image_size(request)?;

        let content = image::load_image(content_bytes, size, CONTENT_FIELD)?;
        let style = image::load_image(style_bytes, size, STYLE_FIELD)?;

        tracing::debug!("Running style model at {size}x{size}...");
        let stylized = self.model.stylize(&content, &style)?;

        let output = image::tensor_to_image(&stylized)?;
        let png = image::encode_png(&output)?;

        tracing::debug!(
            "Encoded {}x{} output as {} PNG bytes",
            output.width(),
            output.height(),
            png.len()
        );

        Ok(SuccessBody {
            stylized_image: image::to_data_uri(&png),
        })
    }

    fn image_size(&self, request: &Request) -> Result<u32> {
        let size = request.image_size()?;

        match self.config.max_image_size {
            Some(max) if size > max => Err(Error::InvalidParameter {
                name: IMAGE_SIZE_FIELD.to_string(),
                reason: format!("{size} exceeds the maximum of {max}"),
            }),
            _ => Ok(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use base64::engine::general_purpose::STANDARD as Base64;
    use base64::Engine as _;
    use ::image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::image::{ImageTensor, PNG_DATA_URI_PREFIX};

    /// Averages content and style pixel by pixel.
    struct BlendModel;

    impl StyleModel for BlendModel {
        fn stylize(&self, content: &ImageTensor, style: &ImageTensor) -> Result<ImageTensor> {
            Ok((content + style) / 2.0)
        }
    }

    /// Always fails.
    struct BrokenModel;

    impl StyleModel for BrokenModel {
        fn stylize(&self, _: &ImageTensor, _: &ImageTensor) -> Result<ImageTensor> {
            Err(Error::Model("graph exploded".to_string()))
        }
    }

    /// Returns a tensor outside [0, 1] and counts invocations.
    #[derive(Default)]
    struct OvershootModel {
        calls: AtomicUsize,
    }

    impl StyleModel for OvershootModel {
        fn stylize(&self, content: &ImageTensor, _: &ImageTensor) -> Result<ImageTensor> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(content * 4.0 - 1.0)
        }
    }

    fn solid_png(size: u32, color: [u8; 3]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::from_pixel(size, size, Rgb(color))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn red_blue_request() -> Request {
        Request::new()
            .with_file(CONTENT_FIELD, solid_png(300, [255, 0, 0]))
            .with_file(STYLE_FIELD, solid_png(300, [0, 0, 255]))
    }

    fn decode_output(response: &Response) -> RgbImage {
        let uri = response.success_body().unwrap().stylized_image;
        let payload = uri.strip_prefix(PNG_DATA_URI_PREFIX).unwrap();
        let png = Base64.decode(payload).unwrap();
        ::image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    fn handler<M: StyleModel>(model: M) -> Handler<M> {
        Handler::new(model, Config::default()).unwrap()
    }

    #[test]
    fn test_default_size_red_blue() {
        let response = handler(BlendModel).handle(&red_blue_request());

        assert_eq!(response.status_code, STATUS_OK);
        assert_eq!(response.headers["Content-Type"], "application/json");

        let output = decode_output(&response);
        assert_eq!(output.dimensions(), (256, 256));
        assert!(output.pixels().all(|p| p.0 == [127, 0, 127]));
    }

    #[test]
    fn test_explicit_size() {
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "37");
        let response = handler(BlendModel).handle(&request);

        assert!(response.is_success());
        assert_eq!(decode_output(&response).dimensions(), (37, 37));
    }

    #[test]
    fn test_size_one() {
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "1");
        let response = handler(BlendModel).handle(&request);

        assert!(response.is_success());
        assert_eq!(decode_output(&response).dimensions(), (1, 1));
    }

    #[test]
    fn test_non_positive_size() {
        for size in ["0", "-5"] {
            let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, size);
            let response = handler(BlendModel).handle(&request);

            assert_eq!(response.status_code, STATUS_ERROR, "{size}");
            assert!(response.error_body().is_ok());
        }
    }

    #[test]
    fn test_non_integer_size() {
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "large");
        let response = handler(BlendModel).handle(&request);

        assert_eq!(response.status_code, STATUS_ERROR);
        assert!(response.error_body().unwrap().error.contains("large"));
    }

    #[test]
    fn test_default_config_has_no_ceiling() {
        let handler = handler(BlendModel);
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "100000");

        assert_eq!(Config::default().max_image_size, None);
        assert_eq!(handler.image_size(&request).unwrap(), 100_000);
    }

    #[test]
    fn test_size_above_ceiling() {
        let config = Config {
            max_image_size: Some(64),
        };
        let handler = Handler::new(BlendModel, config).unwrap();
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "65");

        let response = handler.handle(&request);

        assert_eq!(response.status_code, STATUS_ERROR);
        assert!(response.error_body().unwrap().error.contains("maximum of 64"));
    }

    #[test]
    fn test_missing_uploads() {
        let only_style = Request::new().with_file(STYLE_FIELD, solid_png(4, [0, 0, 0]));
        let only_content = Request::new().with_file(CONTENT_FIELD, solid_png(4, [0, 0, 0]));

        for request in [only_style, only_content, Request::new()] {
            let response = handler(BlendModel).handle(&request);
            assert_eq!(response.status_code, STATUS_ERROR);
            assert!(response.error_body().unwrap().error.starts_with("missing upload"));
        }
    }

    #[test]
    fn test_undecodable_upload() {
        let request = Request::new()
            .with_file(CONTENT_FIELD, solid_png(8, [1, 2, 3]))
            .with_file(STYLE_FIELD, b"GIF89a?".to_vec());

        let response = handler(BlendModel).handle(&request);

        assert_eq!(response.status_code, STATUS_ERROR);
        assert!(response.error_body().unwrap().error.contains("'style'"));
    }

    #[test]
    fn test_model_failure_message() {
        let response = handler(BrokenModel).handle(&red_blue_request());

        assert_eq!(response.status_code, STATUS_ERROR);
        assert_eq!(
            response.error_body().unwrap().error,
            "model inference failed: graph exploded"
        );
    }

    #[test]
    fn test_output_is_clipped() {
        let model = Arc::new(OvershootModel::default());
        let handler = handler(Arc::clone(&model));
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "8");

        let response = handler.handle(&request);

        // red channel 1.0 * 4 - 1 = 3.0, others 0.0 * 4 - 1 = -1.0
        assert!(decode_output(&response).pixels().all(|p| p.0 == [255, 0, 0]));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeatable_output() {
        let handler = handler(BlendModel);
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "48");

        let first = decode_output(&handler.handle(&request));
        let second = decode_output(&handler.handle(&request));

        assert_eq!(first, second);
    }

    #[test]
    fn test_concurrent_requests_share_model() {
        let model = Arc::new(OvershootModel::default());
        let handler = handler(Arc::clone(&model));
        let request = red_blue_request().with_field(IMAGE_SIZE_FIELD, "16");

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| assert!(handler.handle(&request).is_success()));
            }
        });

        assert_eq!(model.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_invalid_config() {
        let config = Config {
            max_image_size: Some(0),
        };

        assert!(Handler::new(BlendModel, config).is_err());
    }
}
