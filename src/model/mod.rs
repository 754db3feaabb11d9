//! The style-transfer model capability and its ONNX Runtime implementation.

mod loader;
mod onnx;

pub use loader::{ModelCache, ModelSource};
pub use onnx::OnnxStyleModel;

use std::sync::Arc;

use crate::error::Result;
use crate::image::ImageTensor;

/// A pretrained style-transfer network, treated as an opaque function.
///
/// Implementations receive two NHWC tensors with identical spatial dimensions and
/// values in [0, 1], and return a batch of stylized images in the same range.
/// The handler only ever reads the first batch element.
///
/// `stylize` takes `&self` so that a single loaded model can serve concurrent
/// requests; implementations that need exclusive access must synchronize
/// internally.
pub trait StyleModel: Send + Sync {
    /// Run inference on a content/style pair.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn stylize(&self, content: &ImageTensor, style: &ImageTensor) -> Result<ImageTensor>;
}

impl<M: StyleModel + ?Sized> StyleModel for Arc<M> {
    fn stylize(&self, content: &ImageTensor, style: &ImageTensor) -> Result<ImageTensor> {
        (**self).stylize(content, style)
    }
}

impl<M: StyleModel + ?Sized> StyleModel for Box<M> {
    fn stylize(&self, content: &ImageTensor, style: &ImageTensor) -> Result<ImageTensor> {
        (**self).stylize(content, style)
    }
}
