//! Tensor to image conversion and PNG data URI encoding.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Axis;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Prefix of every data URI produced by [`to_data_uri`].
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Convert the first element of an NHWC batch back into an RGB image.
///
/// Values are clipped to [0, 1], scaled to [0, 255] and truncated to `u8`.
///
/// # Errors
///
/// Returns an error if the tensor is empty, has no 3-channel layout, or its
/// spatial dimensions do not fit in `u32`.
pub fn tensor_to_image(tensor: &ImageTensor) -> Result<RgbImage> {
    let (batch, height, width, channels) = tensor.dim();

    if batch == 0 || channels != RGB_CHANNELS {
        return Err(Error::ShapeMismatch {
            expected: format!("[>=1, H, W, {RGB_CHANNELS}]"),
            actual: format!("{:?}", tensor.shape()),
        });
    }

    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(Error::ShapeMismatch {
            expected: "spatial dimensions within u32".to_string(),
            actual: format!("{:?}", tensor.shape()),
        });
    };

    let first = tensor.index_axis(Axis(0), 0);

    Ok(RgbImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([
            denormalize(first[[y, x, 0]]),
            denormalize(first[[y, x, 1]]),
            denormalize(first[[y, x, 2]]),
        ])
    }))
}

/// Encode an RGB image as PNG bytes.
///
/// # Errors
///
/// Returns an error if the PNG encoder fails.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|source| Error::ImageEncode { source })?;
    Ok(buffer.into_inner())
}

/// Wrap PNG bytes in a `data:image/png;base64,` URI.
#[must_use]
pub fn to_data_uri(png: &[u8]) -> String {
    format!("{PNG_DATA_URI_PREFIX}{}", Base64.encode(png))
}

/// Denormalize a value from [0, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // NaN saturates to 0 in the cast
    (value.clamp(0.0, 1.0) * 255.0) as u8
}
