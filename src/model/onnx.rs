//! ONNX Runtime backed style-transfer model.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::ImageTensor;

use super::{ModelCache, ModelSource, StyleModel};

/// Arbitrary-image-stylization network exported to ONNX.
///
/// The graph takes the content tensor as its first input and the style tensor as
/// its second, both NHWC in [0, 1]. Its first output is the stylized batch.
pub struct OnnxStyleModel {
    name: String,
    // `Session::run` needs `&mut`, so concurrent requests take turns.
    session: Mutex<Session>,
}

impl OnnxStyleModel {
    /// Resolve `source` (downloading into the model cache if it is a URL) and load it.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be fetched or loaded.
    pub fn load(source: &ModelSource) -> Result<Self> {
        let path = match source {
            ModelSource::Path(path) => path.clone(),
            ModelSource::Url(_) => ModelCache::new()?.resolve(source)?,
        };
        Self::from_file(&path)
    }

    /// Load an ONNX model session from a local file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a loadable model.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        tracing::info!("Loading style model {name}...");

        let session = Session::builder()
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?
            .commit_from_file(path)
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?;

        tracing::info!("Style model loaded");

        Ok(Self {
            name,
            session: Mutex::new(session),
        })
    }

    /// File name of the loaded model.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl StyleModel for OnnxStyleModel {
    fn stylize(&self, content: &ImageTensor, style: &ImageTensor) -> Result<ImageTensor> {
        let content_value =
            Tensor::from_array(content.clone()).map_err(|source| Error::Inference { source })?;
        let style_value =
            Tensor::from_array(style.clone()).map_err(|source| Error::Inference { source })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Model(format!("session for {} is poisoned", self.name)))?;

        let outputs = session
            .run(ort::inputs![content_value, style_value])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "stylized image output".to_string(),
                actual: "no output".to_string(),
            })?;

        extract_array4(&output)
    }
}

/// Extract a 4D array from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn extract_array4(value: &ort::value::ValueRef<'_>) -> Result<Array4<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    // Output shapes are concrete after a run, so dimensions are non-negative
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    if dims.len() != 4 {
        return Err(Error::ShapeMismatch {
            expected: "4D tensor".to_string(),
            actual: format!("{}D tensor", dims.len()),
        });
    }

    Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data.to_vec()).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{dims:?}"),
            actual: "reshape failed".to_string(),
        }
    })
}
