//! Incoming stylization request.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::image::DEFAULT_IMAGE_SIZE;

/// Upload name of the content image.
pub const CONTENT_FIELD: &str = "content";
/// Upload name of the style image.
pub const STYLE_FIELD: &str = "style";
/// Form field carrying the square output edge length.
pub const IMAGE_SIZE_FIELD: &str = "image_size";

/// A multipart-like request: named file uploads plus plain form fields.
#[derive(Debug, Clone, Default)]
pub struct Request {
    files: HashMap<String, Vec<u8>>,
    form: HashMap<String, String>,
}

impl Request {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an uploaded file.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), bytes.into());
        self
    }

    /// Attach a form field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(name.into(), value.into());
        self
    }

    /// Bytes of the upload called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if no such upload exists.
    pub fn file(&self, name: &str) -> Result<&[u8]> {
        self.files
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingUpload {
                field: name.to_string(),
            })
    }

    /// Value of the form field called `name`, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// The requested square edge length, [`DEFAULT_IMAGE_SIZE`] when absent.
    ///
    /// Surrounding whitespace and a leading sign are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not an integer or is not positive.
    pub fn image_size(&self) -> Result<u32> {
        let Some(raw) = self.field(IMAGE_SIZE_FIELD) else {
            return Ok(DEFAULT_IMAGE_SIZE);
        };

        let value: i64 = raw.trim().parse().map_err(|source| Error::ImageSizeParse {
            value: raw.to_string(),
            source,
        })?;

        if value <= 0 {
            return Err(Error::InvalidParameter {
                name: IMAGE_SIZE_FIELD.to_string(),
                reason: format!("must be a positive integer, got {value}"),
            });
        }

        u32::try_from(value).map_err(|_| Error::InvalidParameter {
            name: IMAGE_SIZE_FIELD.to_string(),
            reason: format!("{value} is too large"),
        })
    }
}
