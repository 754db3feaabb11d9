//! # style-transfer
//!
//! A request handler for neural style transfer: it takes a content image and a
//! style image, runs them through a pretrained arbitrary-image-stylization
//! network, and answers with the stylized picture as a PNG data URI inside an
//! HTTP-like JSON envelope.
//!
//! The model is loaded once and handed to a [`Handler`]; every call to
//! [`Handler::handle`] produces exactly one [`Response`], with failures of any
//! kind mapped to a 500 envelope.
//!
//! ## Example
//!
//! ```no_run
//! use style_transfer::{Config, Handler, ModelSource, OnnxStyleModel, Request};
//!
//! # fn main() -> style_transfer::Result<()> {
//! let model = OnnxStyleModel::load(&ModelSource::Path("stylize.onnx".into()))?;
//! let handler = Handler::new(model, Config::default())?;
//!
//! let request = Request::new()
//!     .with_file("content", std::fs::read("photo.jpg")?)
//!     .with_file("style", std::fs::read("painting.png")?)
//!     .with_field("image_size", "512");
//!
//! let response = handler.handle(&request);
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod image;
pub mod model;

pub use error::{Error, ErrorKind, Result};
pub use handler::{Config, Handler, Request, Response};
pub use model::{ModelCache, ModelSource, OnnxStyleModel, StyleModel};
