use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ExtendedColorType, RgbaImage, codecs::jpeg::JpegEncoder};

/// Base64 image ready to be embedded in a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub base64: String,
    pub mime: &'static str,
}

impl EncodedImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// JPEG-encode at `quality` (1-100) and base64 the bytes.
///
/// Alpha is dropped since JPEG has no alpha channel.
pub fn encode_jpeg_base64(image: &RgbaImage, quality: u8) -> Result<EncodedImage> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .context("Failed to encode JPEG")?;

    tracing::debug!(
        "Encoded {}x{} capture into {} JPEG bytes",
        rgb.width(),
        rgb.height(),
        buffer.len()
    );

    Ok(EncodedImage {
        base64: STANDARD.encode(&buffer),
        mime: "image/jpeg",
    })
}
