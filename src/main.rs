//! `style-transfer` CLI - stylize a content image with a style image.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use style_transfer::handler::{CONTENT_FIELD, IMAGE_SIZE_FIELD, STYLE_FIELD};
use style_transfer::image::PNG_DATA_URI_PREFIX;
use style_transfer::{Config, Handler, ModelSource, OnnxStyleModel, Request, Response};

/// Run a content/style image pair through a style-transfer model and print the
/// JSON response envelope.
#[derive(Parser, Debug)]
#[command(name = "style-transfer")]
#[command(version, about, long_about = None)]
struct Args {
    /// ONNX model: a local path, or an http(s) URL downloaded into the cache.
    #[arg(short, long, value_name = "PATH|URL")]
    model: ModelSource,

    /// Content image path.
    #[arg(short, long, value_name = "FILE")]
    content: PathBuf,

    /// Style image path.
    #[arg(short, long, value_name = "FILE")]
    style: PathBuf,

    /// Square output edge length, passed through as the `image_size` form field.
    #[arg(long, value_name = "INT", allow_hyphen_values = true)]
    image_size: Option<String>,

    /// Largest accepted image size. 0, the default, means no limit.
    #[arg(long, default_value = "0", value_name = "INT")]
    max_image_size: u32,

    /// Also write the stylized PNG here on success.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("style_transfer={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the envelope reported success.
fn run(args: &Args) -> Result<bool> {
    let config = Config {
        max_image_size: (args.max_image_size > 0).then_some(args.max_image_size),
    };

    let model = OnnxStyleModel::load(&args.model)
        .with_context(|| format!("Failed to load model from {}", args.model))?;
    tracing::info!("Stylizing with {}", model.name());
    let handler = Handler::new(model, config).context("Failed to initialize handler")?;

    let request = build_request(args)?;
    let response = handler.handle(&request);

    println!("{}", serde_json::to_string_pretty(&response)?);

    if let (Some(output), true) = (&args.output, response.is_success()) {
        write_output(&response, output)?;
        tracing::info!("Wrote stylized image to {}", output.display());
    }

    Ok(response.is_success())
}

fn build_request(args: &Args) -> Result<Request> {
    let content = std::fs::read(&args.content)
        .with_context(|| format!("Failed to read {}", args.content.display()))?;
    let style = std::fs::read(&args.style)
        .with_context(|| format!("Failed to read {}", args.style.display()))?;

    let mut request = Request::new()
        .with_file(CONTENT_FIELD, content)
        .with_file(STYLE_FIELD, style);

    if let Some(size) = &args.image_size {
        request = request.with_field(IMAGE_SIZE_FIELD, size.as_str());
    }

    Ok(request)
}

fn write_output(response: &Response, path: &Path) -> Result<()> {
    let uri = response.success_body()?.stylized_image;
    let payload = uri
        .strip_prefix(PNG_DATA_URI_PREFIX)
        .context("Stylized image is not a PNG data URI")?;
    let png = Base64.decode(payload).context("Stylized image is not valid base64")?;

    std::fs::write(path, png).with_context(|| format!("Failed to write {}", path.display()))
}
