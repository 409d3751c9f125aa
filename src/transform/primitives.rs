//! Default [`PixelPrimitives`] built on the `image` crate.
//!
//! Convolution kernels follow the classic GD filter set (edge detect, emboss, mean removal,
//! gaussian blur, smooth) and operate on color channels only; alpha passes through untouched.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::cache::paths::normalize_rel_path;
use crate::foundation::core::HexColor;
use crate::foundation::error::{StyleCacheError, StyleCacheResult};
use crate::style::action::{ActionKind, Axis, Param};
use crate::transform::engine::{Bitmap, PixelPrimitives};

/// Largest width or height a resize-like action may request.
pub const MAX_DIMENSION: u32 = 8192;

const RESAMPLE: FilterType = FilterType::Lanczos3;

/// `image`-crate implementation of every action kind. Text is rasterized with `imageproc`.
#[derive(Clone, Debug)]
pub struct ImagePrimitives {
    /// Directory overlay images and font files are resolved against.
    asset_root: PathBuf,
}

impl ImagePrimitives {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    fn asset_path(&self, file: &str) -> StyleCacheResult<PathBuf> {
        Ok(self.asset_root.join(normalize_rel_path(file)?))
    }
}

impl PixelPrimitives for ImagePrimitives {
    fn apply_primitive(
        &self,
        kind: ActionKind,
        params: &[Param],
        bitmap: Bitmap,
    ) -> StyleCacheResult<Bitmap> {
        let p = Params(params);
        let Bitmap {
            image,
            orientation,
        } = bitmap;

        let image = match kind {
            ActionKind::Flip => match p.axis(0)? {
                Axis::X => image.fliph(),
                Axis::Y => image.flipv(),
            },
            ActionKind::Rotate => rotate_clockwise(image, p.number(0)?),
            ActionKind::Brightness => image.brighten(p.number(0)?.round() as i32),
            // Negative levels raise contrast, matching the GD convention style authors expect.
            ActionKind::Contrast => image.adjust_contrast(-p.number(0)? as f32),
            ActionKind::Smooth => {
                let w = p.number(0)? as f32;
                let kernel = [1.0, 1.0, 1.0, 1.0, w, 1.0, 1.0, 1.0, 1.0];
                convolve(image, kernel, w + 8.0, 0.0)
            }
            ActionKind::Fill => {
                let fill = Rgba(p.color(0)?.to_rgba(255));
                let (w, h) = (image.width(), image.height());
                DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, fill))
            }
            ActionKind::Colorize => colorize(image, p.color(0)?, p.number(1)?),
            ActionKind::Crop => {
                let coords = [p.number(0)?, p.number(1)?, p.number(2)?, p.number(3)?];
                crop(image, coords)?
            }
            ActionKind::Overlay => self.overlay(image, &p)?,
            ActionKind::Text => self.text(image, &p)?,
            ActionKind::FitToWidth => {
                let w = dimension(p.number(0)?)?;
                let h = scaled(image.height(), w, image.width());
                image.resize_exact(w, h, RESAMPLE)
            }
            ActionKind::FitToHeight => {
                let h = dimension(p.number(0)?)?;
                let w = scaled(image.width(), h, image.height());
                image.resize_exact(w, h, RESAMPLE)
            }
            ActionKind::Pixelate => pixelate(image, p.number(0)?),
            ActionKind::Opacity => opacity(image, p.number(0)?),
            ActionKind::Resize => {
                let (w, h) = (dimension(p.number(0)?)?, dimension(p.number(1)?)?);
                image.resize_exact(w, h, RESAMPLE)
            }
            ActionKind::Thumbnail => {
                let (w, h) = (dimension(p.number(0)?)?, dimension(p.number(1)?)?);
                image.resize_to_fill(w, h, RESAMPLE)
            }
            ActionKind::BestFit => {
                let (max_w, max_h) = (dimension(p.number(0)?)?, dimension(p.number(1)?)?);
                if image.width() <= max_w && image.height() <= max_h {
                    image
                } else {
                    image.resize(max_w, max_h, RESAMPLE)
                }
            }
            ActionKind::AutoOrient => {
                let mut image = image;
                image.apply_orientation(orientation);
                return Ok(Bitmap::new(image));
            }
            ActionKind::Desaturate => image.grayscale(),
            ActionKind::Invert => {
                let mut image = image;
                image.invert();
                image
            }
            ActionKind::Edges => convolve(
                image,
                [-1.0, 0.0, -1.0, 0.0, 4.0, 0.0, -1.0, 0.0, -1.0],
                1.0,
                127.0,
            ),
            ActionKind::Emboss => convolve(
                image,
                [1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.5],
                1.0,
                127.0,
            ),
            ActionKind::MeanRemove | ActionKind::Sketch => convolve(
                image,
                [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0],
                1.0,
                0.0,
            ),
            ActionKind::Blur => convolve(
                image,
                [1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0],
                16.0,
                0.0,
            ),
            ActionKind::Sepia => sepia(image),
        };

        Ok(Bitmap { image, orientation })
    }
}

impl ImagePrimitives {
    fn overlay(&self, image: DynamicImage, p: &Params<'_>) -> StyleCacheResult<DynamicImage> {
        let file = p.token(0)?;
        let anchor = p.token(1)?;
        let alpha = p.number(2)?.clamp(0.0, 1.0);
        let (dx, dy) = (p.number(3)?.round() as i64, p.number(4)?.round() as i64);

        let path = self.asset_path(&file)?;
        let layer = image::open(&path)
            .map_err(|e| fail(format!("overlay '{}': {e}", path.display())))?;
        let layer = opacity(layer, alpha).into_rgba8();

        let mut base = image.into_rgba8();
        let (x, y) = anchor_origin(&anchor, base.dimensions(), layer.dimensions())?;
        imageops::overlay(&mut base, &layer, x + dx, y + dy);
        Ok(DynamicImage::ImageRgba8(base))
    }

    /// `text <content>,<font file>,<size px>,<color>,<anchor>,<dx>,<dy>`.
    fn text(&self, image: DynamicImage, p: &Params<'_>) -> StyleCacheResult<DynamicImage> {
        let content = p.token(0)?;
        let font_path = self.asset_path(&p.token(1)?)?;
        let size = p.number(2)? as f32;
        let color = Rgba(p.color(3)?.to_rgba(255));
        let anchor = p.token(4)?;
        let (dx, dy) = (p.number(5)?.round() as i64, p.number(6)?.round() as i64);
        if !(size.is_finite() && size > 0.0) {
            return Err(fail(format!("font size {size} must be positive")));
        }

        let font = load_font(&font_path)?;
        let scale = PxScale::from(size);
        let extent = text_size(scale, &font, &content);

        let mut base = image.into_rgba8();
        let (x, y) = anchor_origin(&anchor, base.dimensions(), extent)?;
        let (x, y) = (to_i32(x + dx), to_i32(y + dy));
        draw_text_mut(&mut base, color, x, y, scale, &font, &content);
        Ok(DynamicImage::ImageRgba8(base))
    }
}

fn load_font(path: &Path) -> StyleCacheResult<FontVec> {
    let bytes = std::fs::read(path)
        .map_err(|e| fail(format!("font '{}': {e}", path.display())))?;
    FontVec::try_from_vec(bytes).map_err(|e| fail(format!("font '{}': {e}", path.display())))
}

/// Top-left corner that places a `layer`-sized box at `anchor` inside `base`.
fn anchor_origin(
    anchor: &str,
    base: (u32, u32),
    layer: (u32, u32),
) -> StyleCacheResult<(i64, i64)> {
    let (bw, bh) = (i64::from(base.0), i64::from(base.1));
    let (lw, lh) = (i64::from(layer.0), i64::from(layer.1));
    let origin = match anchor.to_ascii_lowercase().as_str() {
        "topleft" => (0, 0),
        "top" => ((bw - lw) / 2, 0),
        "topright" => (bw - lw, 0),
        "left" => (0, (bh - lh) / 2),
        "center" => ((bw - lw) / 2, (bh - lh) / 2),
        "right" => (bw - lw, (bh - lh) / 2),
        "bottomleft" => (0, bh - lh),
        "bottom" => ((bw - lw) / 2, bh - lh),
        "bottomright" => (bw - lw, bh - lh),
        other => return Err(fail(format!("unknown anchor '{other}'"))),
    };
    Ok(origin)
}

fn to_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

struct Params<'a>(&'a [Param]);

impl Params<'_> {
    fn number(&self, idx: usize) -> StyleCacheResult<f64> {
        match self.0.get(idx) {
            Some(Param::Number(n)) => Ok(*n),
            _ => Err(fail(format!("parameter {} must be a number", idx + 1))),
        }
    }

    fn color(&self, idx: usize) -> StyleCacheResult<HexColor> {
        match self.0.get(idx) {
            Some(Param::Color(c)) => Ok(*c),
            _ => Err(fail(format!("parameter {} must be a color", idx + 1))),
        }
    }

    fn axis(&self, idx: usize) -> StyleCacheResult<Axis> {
        match self.0.get(idx) {
            Some(Param::Axis(a)) => Ok(*a),
            _ => Err(fail(format!("parameter {} must be x or y", idx + 1))),
        }
    }

    fn token(&self, idx: usize) -> StyleCacheResult<String> {
        self.0
            .get(idx)
            .map(ToString::to_string)
            .ok_or_else(|| fail(format!("missing parameter {}", idx + 1)))
    }
}

fn fail(msg: impl Into<String>) -> StyleCacheError {
    StyleCacheError::Other(anyhow::anyhow!(msg.into()))
}

fn dimension(v: f64) -> StyleCacheResult<u32> {
    let v = v.round();
    if v < 1.0 || v > f64::from(MAX_DIMENSION) {
        return Err(fail(format!("dimension {v} is outside 1..={MAX_DIMENSION}")));
    }
    Ok(v as u32)
}

/// `value * target / basis`, rounded, at least 1.
fn scaled(value: u32, target: u32, basis: u32) -> u32 {
    if basis == 0 {
        return 1;
    }
    let v = (u64::from(value) * u64::from(target) + u64::from(basis) / 2) / u64::from(basis);
    v.clamp(1, u64::from(MAX_DIMENSION)) as u32
}

fn rotate_clockwise(image: DynamicImage, degrees: f64) -> DynamicImage {
    let deg = degrees.rem_euclid(360.0);
    if deg == 0.0 {
        return image;
    }
    if deg == 90.0 {
        return image.rotate90();
    }
    if deg == 180.0 {
        return image.rotate180();
    }
    if deg == 270.0 {
        return image.rotate270();
    }

    let src = image.into_rgba8();
    let (sw, sh) = (f64::from(src.width()), f64::from(src.height()));
    let (sin, cos) = deg.to_radians().sin_cos();
    let dw = (sw * cos.abs() + sh * sin.abs()).round().max(1.0);
    let dh = (sw * sin.abs() + sh * cos.abs()).round().max(1.0);
    let (scx, scy) = (sw / 2.0, sh / 2.0);
    let (dcx, dcy) = (dw / 2.0, dh / 2.0);

    let out = RgbaImage::from_fn(dw as u32, dh as u32, |x, y| {
        let dx = f64::from(x) + 0.5 - dcx;
        let dy = f64::from(y) + 0.5 - dcy;
        // Inverse rotation back into source space (y axis points down).
        let sx = cos * dx + sin * dy + scx;
        let sy = -sin * dx + cos * dy + scy;
        if sx < 0.0 || sy < 0.0 || sx >= sw || sy >= sh {
            Rgba([0, 0, 0, 0])
        } else {
            *src.get_pixel(sx as u32, sy as u32)
        }
    });
    DynamicImage::ImageRgba8(out)
}

fn colorize(image: DynamicImage, color: HexColor, amount: f64) -> DynamicImage {
    let a = amount.clamp(0.0, 1.0);
    let tint = [f64::from(color.r), f64::from(color.g), f64::from(color.b)];
    let mut img = image.into_rgba8();
    for px in img.pixels_mut() {
        for c in 0..3 {
            let v = f64::from(px[c]) * (1.0 - a) + tint[c] * a;
            px[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    DynamicImage::ImageRgba8(img)
}

fn crop(image: DynamicImage, coords: [f64; 4]) -> StyleCacheResult<DynamicImage> {
    let clamp_x = |v: f64| v.round().clamp(0.0, f64::from(image.width())) as u32;
    let clamp_y = |v: f64| v.round().clamp(0.0, f64::from(image.height())) as u32;
    let (x1, x2) = (clamp_x(coords[0]), clamp_x(coords[2]));
    let (y1, y2) = (clamp_y(coords[1]), clamp_y(coords[3]));
    let (left, top) = (x1.min(x2), y1.min(y2));
    let (w, h) = (x1.abs_diff(x2), y1.abs_diff(y2));
    if w == 0 || h == 0 {
        return Err(fail("crop region is empty"));
    }
    Ok(image.crop_imm(left, top, w, h))
}

fn pixelate(image: DynamicImage, block: f64) -> DynamicImage {
    let block = block.round().max(1.0) as u32;
    if block <= 1 {
        return image;
    }
    let mut img = image.into_rgba8();
    let (w, h) = img.dimensions();
    for by in (0..h).step_by(block as usize) {
        for bx in (0..w).step_by(block as usize) {
            let ex = bx.saturating_add(block).min(w);
            let ey = by.saturating_add(block).min(h);
            let mut sum = [0u64; 4];
            for y in by..ey {
                for x in bx..ex {
                    let px = img.get_pixel(x, y);
                    for c in 0..4 {
                        sum[c] += u64::from(px[c]);
                    }
                }
            }
            let n = u64::from((ex - bx) * (ey - by));
            let avg = Rgba(sum.map(|s| ((s + n / 2) / n) as u8));
            for y in by..ey {
                for x in bx..ex {
                    img.put_pixel(x, y, avg);
                }
            }
        }
    }
    DynamicImage::ImageRgba8(img)
}

fn opacity(image: DynamicImage, amount: f64) -> DynamicImage {
    let a = amount.clamp(0.0, 1.0);
    let mut img = image.into_rgba8();
    for px in img.pixels_mut() {
        px[3] = (f64::from(px[3]) * a).round() as u8;
    }
    DynamicImage::ImageRgba8(img)
}

fn sepia(image: DynamicImage) -> DynamicImage {
    let mut img = image.grayscale().into_rgba8();
    for px in img.pixels_mut() {
        px[0] = px[0].saturating_add(100);
        px[1] = px[1].saturating_add(50);
    }
    DynamicImage::ImageRgba8(img)
}

/// 3x3 convolution over RGB with edge clamping: `sum(k * px) / divisor + offset`.
fn convolve(image: DynamicImage, kernel: [f32; 9], divisor: f32, offset: f32) -> DynamicImage {
    let divisor = if divisor == 0.0 { 1.0 } else { divisor };
    let src = image.into_rgba8();
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return DynamicImage::ImageRgba8(src);
    }

    let out = RgbaImage::from_fn(w, h, |x, y| {
        let mut acc = [0.0f32; 3];
        for ky in 0..3u32 {
            for kx in 0..3u32 {
                let sx = (x + kx).saturating_sub(1).min(w - 1);
                let sy = (y + ky).saturating_sub(1).min(h - 1);
                let px = src.get_pixel(sx, sy);
                let k = kernel[(ky * 3 + kx) as usize];
                for c in 0..3 {
                    acc[c] += k * f32::from(px[c]);
                }
            }
        }
        let alpha = src.get_pixel(x, y)[3];
        let ch = |v: f32| (v / divisor + offset).round().clamp(0.0, 255.0) as u8;
        Rgba([ch(acc[0]), ch(acc[1]), ch(acc[2]), alpha])
    });
    DynamicImage::ImageRgba8(out)
}

#[cfg(test)]
#[path = "../../tests/unit/transform/primitives.rs"]
mod tests;
