use super::{Fields, MetadataParser};
use anyhow::Context;
use async_trait::async_trait;
use image::metadata::Orientation;
use image::{ImageDecoder, ImageReader};
use serde_json::Value;
use std::path::Path;

/// Reads dimensions, format and EXIF orientation from an image header
///
/// Only the header is decoded, never the pixel data. `orientation` is the EXIF
/// orientation code, or `null` when the file carries no EXIF orientation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageParser;

impl ImageParser {
    /// Extensions this parser is normally registered for
    pub const EXTENSIONS: &'static [&'static str] = &[
        "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "ico",
    ];

    /// Blocking header read
    pub fn read_header(path: &Path) -> anyhow::Result<Fields> {
        let reader = ImageReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .with_guessed_format()?;
        let format = reader
            .format()
            .context("unrecognized image format")?;

        let mut decoder = reader.into_decoder()?;
        let (width, height) = decoder.dimensions();
        // No EXIF orientation tag means null.
        let orientation = decoder
            .exif_metadata()?
            .and_then(|chunk| Orientation::from_exif_chunk(&chunk))
            .map(Orientation::to_exif);

        let mut fields = Fields::new();
        fields.insert("width".to_string(), Value::from(width));
        fields.insert("height".to_string(), Value::from(height));
        fields.insert(
            "format".to_string(),
            Value::from(format.extensions_str().first().copied().unwrap_or_default()),
        );
        fields.insert(
            "orientation".to_string(),
            orientation.map_or(Value::Null, Value::from),
        );
        Ok(fields)
    }
}

#[async_trait]
impl MetadataParser for ImageParser {
    async fn parse(&self, path: &Path) -> anyhow::Result<Fields> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_header(&path)).await?
    }
}
