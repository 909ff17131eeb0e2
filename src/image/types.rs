//! Core types for the effect round-trip.

use crate::error::{EffectError, Result};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
    /// Windows bitmap.
    Bmp,
    /// TIFF format.
    Tiff,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Maps a MIME type reported by the API.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            "image/bmp" => Some(Self::Bmp),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        if data.starts_with(b"BM") {
            return Some(Self::Bmp);
        }

        // TIFF: little-endian II*\0 or big-endian MM\0*
        if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
            return Some(Self::Tiff);
        }

        None
    }

    /// Checks if the given data matches this format's magic bytes.
    pub fn matches_bytes(&self, data: &[u8]) -> bool {
        Self::from_magic_bytes(data) == Some(*self)
    }

    pub(crate) fn to_codec(self) -> ::image::ImageFormat {
        match self {
            Self::Png => ::image::ImageFormat::Png,
            Self::Jpeg => ::image::ImageFormat::Jpeg,
            Self::WebP => ::image::ImageFormat::WebP,
            Self::Gif => ::image::ImageFormat::Gif,
            Self::Bmp => ::image::ImageFormat::Bmp,
            Self::Tiff => ::image::ImageFormat::Tiff,
        }
    }

    pub(crate) fn from_codec(format: ::image::ImageFormat) -> Option<Self> {
        match format {
            ::image::ImageFormat::Png => Some(Self::Png),
            ::image::ImageFormat::Jpeg => Some(Self::Jpeg),
            ::image::ImageFormat::WebP => Some(Self::WebP),
            ::image::ImageFormat::Gif => Some(Self::Gif),
            ::image::ImageFormat::Bmp => Some(Self::Bmp),
            ::image::ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }
}

/// An input image loaded from disk.
///
/// Pixels are normalized to 8-bit RGB and the payload is re-encoded as PNG,
/// so whatever the source format the model always receives the same kind of
/// data.
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// Where the image was read from.
    pub path: PathBuf,
    /// Format of the file on disk.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// PNG-encoded RGB payload sent upstream.
    pub data: Vec<u8>,
}

impl ImageFile {
    /// Reads and decodes the image at `path`.
    ///
    /// Fails with [`EffectError::FileAccess`] when the file cannot be read and
    /// [`EffectError::UnsupportedFormat`] when it cannot be decoded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| EffectError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }

    fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let unsupported = |reason: String| EffectError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason,
        };

        let codec_format = ::image::guess_format(bytes).map_err(|e| unsupported(e.to_string()))?;
        let format = ImageFormat::from_codec(codec_format)
            .ok_or_else(|| unsupported(format!("{codec_format:?} is not supported")))?;

        let decoded = ::image::load_from_memory_with_format(bytes, codec_format)
            .map_err(|e| unsupported(e.to_string()))?;
        let rgb = decoded.to_rgb8();

        let mut data = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut data), ::image::ImageFormat::Png)
            .map_err(|e| unsupported(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            width: rgb.width(),
            height: rgb.height(),
            data,
        })
    }

    /// MIME type of the payload in [`ImageFile::data`].
    pub fn mime_type(&self) -> &'static str {
        ImageFormat::Png.mime_type()
    }
}

/// A single outbound request: the instruction plus the image to edit.
#[derive(Debug, Clone)]
pub struct EffectRequest {
    /// Natural-language instruction for the model.
    pub prompt: String,
    /// Encoded image bytes.
    pub image: Vec<u8>,
    /// MIME type of `image`.
    pub mime_type: String,
}

impl EffectRequest {
    /// Creates a request with the given prompt and image payload.
    pub fn new(prompt: impl Into<String>, image: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image,
            mime_type: mime_type.into(),
        }
    }

    /// Creates a request for a loaded image file.
    pub fn for_image(prompt: impl Into<String>, file: &ImageFile) -> Self {
        Self::new(prompt, file.data.clone(), file.mime_type())
    }
}

/// One unit of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Commentary text.
    Text(String),
    /// Raw image bytes.
    Image {
        /// MIME type reported by the API.
        mime_type: String,
        /// Decoded (not base64) bytes.
        data: Vec<u8>,
    },
}

/// What the model sent back, in order.
#[derive(Debug, Clone, Default)]
pub struct EffectResponse {
    /// Returned parts, in the order the API listed them.
    pub parts: Vec<ResponsePart>,
    /// Round-trip duration in milliseconds.
    pub duration_ms: Option<u64>,
}

impl EffectResponse {
    /// Creates a response from parts.
    pub fn new(parts: Vec<ResponsePart>) -> Self {
        Self {
            parts,
            ..Default::default()
        }
    }

    /// Returns the first image part, if any.
    pub fn first_image(&self) -> Option<(&str, &[u8])> {
        self.parts.iter().find_map(|part| match part {
            ResponsePart::Image { mime_type, data } => Some((mime_type.as_str(), data.as_slice())),
            ResponsePart::Text(_) => None,
        })
    }

    /// Concatenates all text parts, or `None` if there are none.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                ResponsePart::Text(t) => Some(t.as_str()),
                ResponsePart::Image { .. } => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}
