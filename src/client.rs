//! The photocopy effect round-trip: file in, model call, file out.

use crate::config::EffectConfig;
use crate::error::{EffectError, Result};
use crate::image::providers::GeminiProvider;
use crate::image::{EffectRequest, ImageFile, ImageFormat, ImageModel};
use ::image::DynamicImage;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Instruction sent with every image.
pub const PHOTOCOPY_PROMPT: &str = "Add realistic photocopy artifacts, grain, and slight distortions to this image, making it look like a very old, faded photocopy.";

/// Inserted between the file stem and its extension to name the result.
pub const EFFECT_SUFFIX: &str = "_photocopy_effect";

/// Returns where the result for `input` is written.
///
/// `/a/b/cat.png` becomes `/a/b/cat_photocopy_effect.png`. Only the last
/// extension is considered, and a file without one simply gets the suffix.
pub fn output_path_for(input: impl AsRef<Path>) -> PathBuf {
    let input = input.as_ref();
    let mut name: OsString = input.file_stem().map(OsString::from).unwrap_or_default();
    name.push(EFFECT_SUFFIX);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

/// Decodes an image part, trusting the bytes over the reported MIME type.
fn decode_returned(mime_type: &str, data: &[u8]) -> Result<DynamicImage> {
    let claimed = ImageFormat::from_mime_type(mime_type);
    if let Some(claimed) = claimed {
        if !claimed.matches_bytes(data) {
            tracing::debug!(mime_type, "returned image does not match its MIME type");
        }
    }

    let format = ImageFormat::from_magic_bytes(data)
        .or(claimed)
        .ok_or_else(|| EffectError::Decode(format!("unrecognized {mime_type} image data")))?;

    ::image::load_from_memory_with_format(data, format.to_codec())
        .map_err(|e| EffectError::Decode(format!("returned {mime_type} image: {e}")))
}

/// Converts pixels into a layout the target encoder accepts.
///
/// PNG takes anything the decoder produces, TIFF everything but grey-alpha;
/// JPEG has no alpha; the rest only handle 8-bit RGB or RGBA.
fn fit_for(format: ImageFormat, image: DynamicImage) -> DynamicImage {
    match format {
        ImageFormat::Png => image,
        ImageFormat::Tiff => match image.color() {
            ::image::ColorType::La8 => DynamicImage::ImageRgba8(image.to_rgba8()),
            ::image::ColorType::La16 => DynamicImage::ImageRgba16(image.to_rgba16()),
            _ => image,
        },
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageFormat::WebP | ImageFormat::Gif | ImageFormat::Bmp => {
            if image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            }
        }
    }
}

/// Applies the photocopy effect to image files through an [`ImageModel`].
pub struct ImageEffectClient<M = GeminiProvider> {
    config: EffectConfig,
    model: M,
}

impl ImageEffectClient<GeminiProvider> {
    /// Creates a client backed by Gemini, configured from `config`.
    pub fn gemini(config: EffectConfig) -> Result<Self> {
        let model = GeminiProvider::from_config(&config)?;
        Ok(Self::new(config, model))
    }
}

impl<M: ImageModel> ImageEffectClient<M> {
    /// Creates a client with an explicit model implementation.
    pub fn new(config: EffectConfig, model: M) -> Self {
        Self { config, model }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Returns the underlying model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Ages the image at `input_path` and writes the result next to it.
    ///
    /// Makes exactly one model call; any failure aborts without writing
    /// anything. Returns the path of the written file.
    pub async fn apply_effect(&self, input_path: impl AsRef<Path>) -> Result<PathBuf> {
        let input_path = input_path.as_ref();
        let api_key = self.config.api_key()?;

        tracing::info!(path = %input_path.display(), "loading image");
        let input = ImageFile::open(input_path)?;
        tracing::debug!(
            format = input.format.extension(),
            width = input.width,
            height = input.height,
            "input image loaded"
        );

        let request = EffectRequest::for_image(PHOTOCOPY_PROMPT, &input);

        tracing::info!(model = self.model.name(), "sending image and prompt");
        let response = self.model.generate(api_key, &request).await?;

        let Some((mime_type, data)) = response.first_image() else {
            let text = response.text();
            tracing::warn!(text = text.as_deref().unwrap_or(""), "no image in response");
            return Err(EffectError::NoImageReturned { text });
        };

        let generated = decode_returned(mime_type, data)?;

        let output_path = output_path_for(input_path);
        // Extension decides the encoding, falling back to the input's format
        let format = output_path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageFormat::from_extension)
            .unwrap_or(input.format);
        fit_for(format, generated)
            .save_with_format(&output_path, format.to_codec())
            .map_err(|source| EffectError::Output {
                path: output_path.clone(),
                source,
            })?;

        tracing::info!(
            path = %output_path.display(),
            duration_ms = response.duration_ms,
            "updated image saved"
        );

        Ok(output_path)
    }
}
