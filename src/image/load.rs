//! Decoding uploaded bytes into normalized tensors.

use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Decode an uploaded image and convert it to a normalized tensor.
///
/// The image is:
/// 1. Decoded from memory (format sniffed from the bytes)
/// 2. Converted to RGB
/// 3. Resized to `size`x`size`, ignoring the aspect ratio
/// 4. Normalized to [0, 1] range
/// 5. Returned as NHWC tensor (1, size, size, 3)
///
/// `field` names the upload and only appears in error messages.
///
/// # Errors
///
/// Returns an error if the bytes are not a decodable image.
pub fn load_image(bytes: &[u8], size: u32, field: &str) -> Result<ImageTensor> {
    let img = image::load_from_memory(bytes).map_err(|source| Error::ImageDecode {
        field: field.to_string(),
        source,
    })?;

    tracing::debug!(
        "Decoded '{field}' image {}x{}, resizing to {size}x{size}",
        img.width(),
        img.height()
    );

    Ok(image_to_tensor(&img, size))
}

/// Convert a `DynamicImage` to a normalized NHWC tensor.
fn image_to_tensor(img: &DynamicImage, size: u32) -> ImageTensor {
    // Drop alpha before resampling so transparent pixels keep their colour
    let rgb = imageops::resize(&img.to_rgb8(), size, size, FilterType::CatmullRom);

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, RGB_CHANNELS));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..RGB_CHANNELS {
            tensor[[0, y, x, c]] = f32::from(pixel[c]) / 255.0;
        }
    }

    tensor
}
