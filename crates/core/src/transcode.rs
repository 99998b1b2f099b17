//! Image transcoder - decodes an upload, shrinks it to fit a bounding box and re-encodes it.
//!
//! Resizing preserves aspect ratio and never enlarges: an image already inside the bounds keeps
//! its original dimensions and is only re-encoded.
//!
//! Quality applies to JPEG and WebP output; PNG is always lossless. Work happens entirely on
//! in-memory buffers.

use crate::constants::{DEFAULT_QUALITY, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH};
use crate::{MediaError, MediaResult};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Encoded format written to storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Jpeg,
    Png,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(OutputFormat::Webp),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(MediaError::InvalidInput(format!(
                "unsupported output format '{}' (expected webp, jpeg or png)",
                other
            ))),
        }
    }
}

/// Target bounds and encoding for one transcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranscodeOptions {
    pub width: u32,
    pub height: u32,
    /// 1-100
    pub quality: u8,
    pub format: OutputFormat,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_TARGET_WIDTH,
            height: DEFAULT_TARGET_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::default(),
        }
    }
}

impl TranscodeOptions {
    fn validate(&self) -> MediaResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::InvalidInput(
                "target width and height must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(MediaError::InvalidInput(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Result of a transcode.
#[derive(Debug, Clone)]
pub struct TranscodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Stateless image transcoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct Transcoder;

impl Transcoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode `input`, fit it within the target box and encode it in the target format.
    ///
    /// This is CPU-bound; async callers should run it on a blocking thread.
    ///
    /// # Errors
    ///
    /// - `MediaError::InvalidInput` for zero bounds or quality outside 1-100
    /// - `MediaError::Processing` if the input cannot be decoded or the output cannot be encoded
    pub fn optimize(&self, input: &[u8], options: &TranscodeOptions) -> MediaResult<TranscodedImage> {
        options.validate()?;

        let img = image::load_from_memory(input)
            .map_err(|e| MediaError::Processing(format!("failed to decode image: {e}")))?;

        let (orig_w, orig_h) = img.dimensions();
        let (new_w, new_h) = fit_within(orig_w, orig_h, options.width, options.height);

        let resized = if (new_w, new_h) == (orig_w, orig_h) {
            img
        } else {
            img.resize_exact(new_w, new_h, FilterType::Lanczos3)
        };

        let bytes = encode(&resized, options)?;

        debug!(
            original_width = orig_w,
            original_height = orig_h,
            width = new_w,
            height = new_h,
            format = %options.format,
            size = bytes.len(),
            "image transcoded"
        );

        Ok(TranscodedImage {
            bytes,
            width: new_w,
            height: new_h,
            format: options.format,
        })
    }
}

/// Scale `(width, height)` down to fit within `(max_width, max_height)` keeping aspect ratio.
///
/// Returns the input unchanged when it already fits. Each side is at least 1 pixel.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let new_w = ((width as f64 * ratio).round() as u32).clamp(1, max_width);
    let new_h = ((height as f64 * ratio).round() as u32).clamp(1, max_height);
    (new_w, new_h)
}

fn encode(img: &DynamicImage, options: &TranscodeOptions) -> MediaResult<Vec<u8>> {
    let mut buf = Vec::new();

    let result = match options.format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, options.quality))
        }
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buf)),
        OutputFormat::Webp => return encode_webp(img, options.quality),
    };

    result.map_err(|e| {
        MediaError::Processing(format!("failed to encode {}: {e}", options.format))
    })?;
    Ok(buf)
}

/// Lossy WebP through libwebp; the `image` encoder only writes lossless WebP.
fn encode_webp(img: &DynamicImage, quality: u8) -> MediaResult<Vec<u8>> {
    let rgba = img.to_rgba8();
    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
        .encode_simple(false, f32::from(quality))
        .map_err(|e| MediaError::Processing(format!("failed to encode webp: {e:?}")))?;
    Ok(encoded.to_vec())
}
