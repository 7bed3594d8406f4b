//! Canonical avatar rendering.
//!
//! Turns an arbitrary source photo plus editor parameters into a fixed-size
//! square WebP image. The crop square is always fully contained in the
//! (rotated) source, so the output never samples outside the photo and never
//! has empty regions.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::{debug, trace};

use crate::domain::entities::{CanonicalImageBlob, TransformParams};
use crate::domain::errors::TransformError;

/// Default edge length of the canonical avatar, in pixels.
pub const DEFAULT_OUTPUT_SIZE: u32 = 256;

/// Default upper bound on the encoded avatar size (2 MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for the image transformer.
#[derive(Debug, Clone)]
pub struct ImageTransformerConfig {
    /// Output edge length in pixels.
    pub output_size: u32,
    /// Largest encoded output accepted.
    pub max_output_bytes: usize,
}

impl Default for ImageTransformerConfig {
    fn default() -> Self {
        Self {
            output_size: DEFAULT_OUTPUT_SIZE,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Renders editor input into a [`CanonicalImageBlob`].
#[derive(Debug, Clone, Default)]
pub struct ImageTransformer {
    config: ImageTransformerConfig,
}

impl ImageTransformer {
    /// Creates a transformer. An output size of zero is raised to one pixel.
    #[must_use]
    pub fn new(mut config: ImageTransformerConfig) -> Self {
        config.output_size = config.output_size.max(1);
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ImageTransformerConfig {
        &self.config
    }

    /// Decodes, crops and encodes on the blocking pool.
    ///
    /// # Errors
    /// Returns `TransformError` for invalid parameters, undecodable sources,
    /// encoder failures or oversize output.
    pub async fn transform(
        &self,
        source: Bytes,
        params: TransformParams,
    ) -> Result<CanonicalImageBlob, TransformError> {
        params.validate()?;
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.transform_blocking(&source, params))
            .await
            .map_err(|e| TransformError::Task {
                message: format!("transform task panicked: {e}"),
            })?
    }

    /// Synchronous variant of [`Self::transform`].
    ///
    /// # Errors
    /// Same as [`Self::transform`].
    pub fn transform_blocking(
        &self,
        source: &[u8],
        params: TransformParams,
    ) -> Result<CanonicalImageBlob, TransformError> {
        params.validate()?;

        let decoded =
            image::load_from_memory(source).map_err(|e| TransformError::decode(e.to_string()))?;
        trace!(
            width = decoded.width(),
            height = decoded.height(),
            "Decoded avatar source"
        );

        let canvas = self.render(&decoded, params)?;
        let bytes = encode_webp(canvas)?;

        if bytes.len() > self.config.max_output_bytes {
            return Err(TransformError::TooLarge {
                size: bytes.len(),
                max: self.config.max_output_bytes,
            });
        }

        debug!(
            size = self.config.output_size,
            bytes = bytes.len(),
            rotation = params.normalized_rotation(),
            scale = params.scale,
            "Rendered canonical avatar"
        );

        Ok(CanonicalImageBlob::new(
            Bytes::from(bytes),
            self.config.output_size,
        ))
    }

    fn render(
        &self,
        source: &DynamicImage,
        params: TransformParams,
    ) -> Result<RgbaImage, TransformError> {
        if source.width() == 0 || source.height() == 0 {
            return Err(TransformError::decode("source image has no pixels"));
        }
        let size = self.config.output_size;

        if let Some(turns) = params.quarter_turns() {
            let rotated = match turns {
                1 => source.rotate90(),
                2 => source.rotate180(),
                3 => source.rotate270(),
                _ => source.clone(),
            };
            let crop = QuarterTurnCrop::compute(rotated.width(), rotated.height(), params);
            return Ok(rotated
                .crop_imm(crop.x, crop.y, crop.side, crop.side)
                .resize_exact(size, size, FilterType::Lanczos3)
                .to_rgba8());
        }

        let geometry = CropGeometry::compute(source.width(), source.height(), params);
        let pixels = source.to_rgba8();
        let mut canvas = RgbaImage::new(size, size);
        let step = 1.0 / f64::from(size);
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let u = (f64::from(x) + 0.5) * step;
            let v = (f64::from(y) + 0.5) * step;
            let (sx, sy) = geometry.source_point(u, v);
            *pixel = sample_bilinear(&pixels, sx, sy);
        }
        Ok(canvas)
    }
}

/// Crop square of a quarter-turn rotation, in pixels of the rotated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterTurnCrop {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

impl QuarterTurnCrop {
    /// Computes the crop for an already rotated `width` x `height` image.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn compute(width: u32, height: u32, params: TransformParams) -> Self {
        let shorter = width.min(height).max(1);
        let scale = f64::from(params.scale.max(1.0));
        let side = ((f64::from(shorter) / scale).floor() as u32).clamp(1, shorter);

        let slack_x = width.saturating_sub(side);
        let slack_y = height.saturating_sub(side);
        let x = (f64::from(params.focal_x.clamp(0.0, 1.0)) * f64::from(slack_x)).round() as u32;
        let y = (f64::from(params.focal_y.clamp(0.0, 1.0)) * f64::from(slack_y)).round() as u32;

        Self {
            x: x.min(slack_x),
            y: y.min(slack_y),
            side,
        }
    }
}

/// Crop square for an arbitrary rotation, expressed in source coordinates.
///
/// The square is axis-aligned in the rotated (display) frame. Its centre is
/// stored in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropGeometry {
    pub source_width: f64,
    pub source_height: f64,
    /// Edge length of the crop square, in source pixels.
    pub side: f64,
    pub center_x: f64,
    pub center_y: f64,
    cos: f64,
    sin: f64,
}

impl CropGeometry {
    /// Computes the crop for a `width` x `height` source.
    #[must_use]
    pub fn compute(width: u32, height: u32, params: TransformParams) -> Self {
        let w = f64::from(width.max(1));
        let h = f64::from(height.max(1));
        let (sin, cos) = rotation_sin_cos(params.normalized_rotation());
        let spread = cos.abs() + sin.abs();

        let fit_side = w.min(h) / spread;
        let side = fit_side / f64::from(params.scale.max(1.0));
        let half = side / 2.0;

        // Feasible centre offsets, in the source frame.
        let extent_x = (w / 2.0 - half * spread).max(0.0);
        let extent_y = (h / 2.0 - half * spread).max(0.0);

        // Focal point spans the feasible region's bounding box in the display frame.
        let bound_x = extent_x * cos.abs() + extent_y * sin.abs();
        let bound_y = extent_x * sin.abs() + extent_y * cos.abs();
        let qx = (f64::from(params.focal_x.clamp(0.0, 1.0)) - 0.5) * 2.0 * bound_x;
        let qy = (f64::from(params.focal_y.clamp(0.0, 1.0)) - 0.5) * 2.0 * bound_y;

        let offset_x = (cos * qx + sin * qy).clamp(-extent_x, extent_x);
        let offset_y = (-sin * qx + cos * qy).clamp(-extent_y, extent_y);

        Self {
            source_width: w,
            source_height: h,
            side,
            center_x: w / 2.0 + offset_x,
            center_y: h / 2.0 + offset_y,
            cos,
            sin,
        }
    }

    /// Maps a point of the crop square (`u`, `v` in `[0, 1]`, display frame)
    /// to source pixel coordinates.
    #[must_use]
    pub fn source_point(&self, u: f64, v: f64) -> (f64, f64) {
        let dx = (u - 0.5) * self.side;
        let dy = (v - 0.5) * self.side;
        (
            self.center_x + self.cos * dx + self.sin * dy,
            self.center_y - self.sin * dx + self.cos * dy,
        )
    }

    /// The four crop corners, in source pixel coordinates.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            self.source_point(0.0, 0.0),
            self.source_point(1.0, 0.0),
            self.source_point(1.0, 1.0),
            self.source_point(0.0, 1.0),
        ]
    }

    /// Whether every corner lies inside the source, allowing `epsilon` of
    /// floating point slack.
    #[must_use]
    pub fn is_contained(&self, epsilon: f64) -> bool {
        self.corners().iter().all(|&(x, y)| {
            x >= -epsilon
                && y >= -epsilon
                && x <= self.source_width + epsilon
                && y <= self.source_height + epsilon
        })
    }
}

/// Exact sine and cosine for right angles, floating point otherwise.
fn rotation_sin_cos(degrees: i32) -> (f64, f64) {
    match degrees {
        0 => (0.0, 1.0),
        90 => (1.0, 0.0),
        180 => (0.0, -1.0),
        270 => (-1.0, 0.0),
        _ => f64::from(degrees).to_radians().sin_cos(),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let max_x = image.width() - 1;
    let max_y = image.height() - 1;
    let x = (x - 0.5).clamp(0.0, f64::from(max_x));
    let y = (y - 0.5).clamp(0.0, f64::from(max_y));

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(max_x);
    let y1 = (y0 + 1).min(max_y);
    let tx = x - f64::from(x0);
    let ty = y - f64::from(y0);

    let p00 = image.get_pixel(x0, y0).0;
    let p10 = image.get_pixel(x1, y0).0;
    let p01 = image.get_pixel(x0, y1).0;
    let p11 = image.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for (c, channel) in out.iter_mut().enumerate() {
        let top = f64::from(p00[c]) * (1.0 - tx) + f64::from(p10[c]) * tx;
        let bottom = f64::from(p01[c]) * (1.0 - tx) + f64::from(p11[c]) * tx;
        *channel = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn encode_webp(canvas: RgbaImage) -> Result<Vec<u8>, TransformError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
        .map_err(|e| TransformError::encode(e.to_string()))?;
    Ok(buf)
}
