//! QR image rendering
//!
//! Encodes a payload with `qrcode` and paints the module matrix into an
//! `image` buffer by hand, which keeps pixel format, scaling and quiet
//! zone under our control.

use image::{Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("QR encoding failed: {0}")]
    Encode(String),
    #[error("PNG encoding failed: {0}")]
    Png(String),
}

/// Error-correction level. Payment codes default to H so damaged or dirty
/// prints stay scannable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCorrection {
    L, // ~7%
    M, // ~15%
    Q, // ~25%
    H, // ~30%
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

/// Rendering options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderOptions {
    /// Lower bound on the output edge, in pixels.
    pub width: u32,
    /// Quiet zone around the code, in modules.
    pub margin: u32,
    /// RGBA foreground (dark modules).
    pub dark: [u8; 4],
    /// RGBA background.
    pub light: [u8; 4],
    pub error_correction: ErrorCorrection,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 280,
            margin: 2,
            dark: [0, 0, 0, 255],
            light: [255, 255, 255, 255],
            error_correction: ErrorCorrection::H,
        }
    }
}

/// Renders a payload into an RGBA image.
///
/// Modules are drawn at an integer scale rounded up, so the output edge is
/// at least `opts.width` pixels and every module stays crisp.
pub fn render_image(payload: &str, opts: &RenderOptions) -> Result<RgbaImage, RenderError> {
    let code = QrCode::with_error_correction_level(
        payload.as_bytes(),
        opts.error_correction.into(),
    )
    .map_err(|e| RenderError::Encode(e.to_string()))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();

    let total_modules = modules + 2 * opts.margin;
    let scale = ((opts.width + total_modules - 1) / total_modules).max(1);
    let size = total_modules * scale;

    let dark = Rgba(opts.dark);
    let light = Rgba(opts.light);
    let mut img = RgbaImage::from_pixel(size, size, light);

    for (i, color) in colors.iter().enumerate() {
        if *color == Color::Dark {
            let mx = i as u32 % modules;
            let my = i as u32 / modules;
            let px = (mx + opts.margin) * scale;
            let py = (my + opts.margin) * scale;
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(px + dx, py + dy, dark);
                }
            }
        }
    }

    log::debug!(
        "rendered {} modules at scale {} into {}x{} image",
        modules,
        scale,
        size,
        size
    );
    Ok(img)
}

/// Renders a payload straight to PNG bytes.
pub fn render_png(payload: &str, opts: &RenderOptions) -> Result<Vec<u8>, RenderError> {
    let img = render_image(payload, opts)?;
    let mut bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bytes);
    img.write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| RenderError::Png(e.to_string()))?;
    Ok(bytes)
}
