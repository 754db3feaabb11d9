//! Image decoding, tensor conversion and PNG encoding.

mod load;
mod save;

pub use load::load_image;
pub use save::{encode_png, tensor_to_image, to_data_uri, PNG_DATA_URI_PREFIX};

use ndarray::Array4;

/// Image tensor in NHWC format (batch, height, width, channels).
/// Values are normalized to [0, 1].
pub type ImageTensor = Array4<f32>;

/// Default square edge length when a request does not specify one.
pub const DEFAULT_IMAGE_SIZE: u32 = 256;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
