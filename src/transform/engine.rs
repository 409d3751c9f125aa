use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};

use crate::foundation::error::{StyleCacheError, StyleCacheResult};
use crate::style::action::{Action, ActionKind, Param};

/// A decoded image travelling through an action chain.
#[derive(Clone, Debug)]
pub struct Bitmap {
    pub image: DynamicImage,
    /// EXIF orientation recorded by the decoder; consumed by `auto_orient`.
    pub orientation: Orientation,
}

impl Bitmap {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            orientation: Orientation::NoTransforms,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn decode_path(path: &Path) -> StyleCacheResult<Self> {
        let reader = ImageReader::open(path)?
            .with_guessed_format()
            .map_err(StyleCacheError::Io)?;
        Self::decode_reader(reader).map_err(|e| {
            StyleCacheError::validation(format!("decode '{}': {e}", path.display()))
        })
    }

    pub fn decode_bytes(bytes: &[u8]) -> StyleCacheResult<Self> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(StyleCacheError::Io)?;
        Self::decode_reader(reader)
            .map_err(|e| StyleCacheError::validation(format!("decode image bytes: {e}")))
    }

    fn decode_reader<R: std::io::BufRead + std::io::Seek>(
        reader: ImageReader<R>,
    ) -> image::ImageResult<Self> {
        let mut decoder = reader.into_decoder()?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let image = DynamicImage::from_decoder(decoder)?;
        Ok(Self { image, orientation })
    }

    /// Encode into `format`. Formats without an alpha channel get an RGB8 flattening.
    pub fn encode(&self, format: ImageFormat) -> StyleCacheResult<Vec<u8>> {
        let flattened;
        let image = if format == ImageFormat::Jpeg
            && !matches!(self.image, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_))
        {
            flattened = DynamicImage::ImageRgb8(self.image.to_rgb8());
            &flattened
        } else {
            &self.image
        };

        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), format)
            .map_err(|e| StyleCacheError::persist(format!("encode {format:?}: {e}")))?;
        Ok(buf)
    }
}

/// Pixel-level capability the engine sequences. One call per action.
///
/// Implementations must be pure: the same kind, params and input bitmap always yield the same
/// output pixels.
pub trait PixelPrimitives: Send + Sync {
    fn apply_primitive(
        &self,
        kind: ActionKind,
        params: &[Param],
        bitmap: Bitmap,
    ) -> StyleCacheResult<Bitmap>;
}

/// Applies an ordered action chain through a [`PixelPrimitives`] implementation.
#[derive(Clone)]
pub struct TransformEngine {
    primitives: Arc<dyn PixelPrimitives>,
}

impl TransformEngine {
    pub fn new(primitives: Arc<dyn PixelPrimitives>) -> Self {
        Self { primitives }
    }

    /// Apply `actions` in ascending `order` (ties keep slice order). The first failing primitive
    /// aborts the chain with a [`StyleCacheError::Transform`] naming the action.
    #[tracing::instrument(skip_all, fields(actions = actions.len()))]
    pub fn apply(&self, source: Bitmap, actions: &[Action]) -> StyleCacheResult<Bitmap> {
        let mut ordered: Vec<&Action> = actions.iter().collect();
        ordered.sort_by_key(|a| a.order);

        let mut bitmap = source;
        for action in ordered {
            bitmap = self
                .primitives
                .apply_primitive(action.kind, &action.params, bitmap)
                .map_err(|e| {
                    StyleCacheError::transform(action.kind.as_str(), action.order, e.to_string())
                })?;
            tracing::trace!(
                kind = action.kind.as_str(),
                order = action.order,
                width = bitmap.width(),
                height = bitmap.height(),
                "applied action"
            );
        }
        Ok(bitmap)
    }

    /// Decode `source`, apply `actions`, and encode the result as `format`.
    pub fn render_file(
        &self,
        source: &Path,
        actions: &[Action],
        format: ImageFormat,
    ) -> StyleCacheResult<Vec<u8>> {
        let bitmap = Bitmap::decode_path(source)?;
        self.apply(bitmap, actions)?.encode(format)
    }
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/engine.rs"]
mod tests;
