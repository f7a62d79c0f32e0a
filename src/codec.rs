use anyhow::{Result, anyhow, bail};
use clap::ValueEnum;
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};

/// Redundancy added by the barcode library to survive partial damage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ErrorLevel {
    #[default]
    Low,
    Medium,
    Quartile,
    High,
}

impl ErrorLevel {
    fn to_ec_level(self) -> EcLevel {
        match self {
            ErrorLevel::Low => EcLevel::L,
            ErrorLevel::Medium => EcLevel::M,
            ErrorLevel::Quartile => EcLevel::Q,
            ErrorLevel::High => EcLevel::H,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EncodeOptions {
    /// Width and height of the rendered image in pixels.
    pub size: u32,
    /// Quiet-zone margin around the matrix, in modules.
    pub margin: u32,
    pub level: ErrorLevel,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            size: 400,
            margin: 0,
            level: ErrorLevel::Low,
        }
    }
}

/// A square barcode matrix of dark/light modules, row-major.
pub struct ModuleMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl ModuleMatrix {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }
}

/// The external-library seam: everything behind these two calls (matrix
/// construction, error correction, binarization, pattern recognition) belongs
/// to the barcode crates, not to this tool.
pub trait Codec {
    fn encode(&self, text: &str, options: &EncodeOptions) -> Result<ModuleMatrix>;

    /// `Ok(None)` means the image held no recognizable QR code.
    fn decode(&self, image: &GrayImage) -> Result<Option<String>>;
}

/// Production codec backed by `qrcode` (encoding) and `rqrr` (recognition).
pub struct QrCodec;

impl Codec for QrCodec {
    fn encode(&self, text: &str, options: &EncodeOptions) -> Result<ModuleMatrix> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), options.level.to_ec_level())
            .map_err(|err| anyhow!("building QR matrix: {err}"))?;
        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();
        Ok(ModuleMatrix { width, modules })
    }

    fn decode(&self, image: &GrayImage) -> Result<Option<String>> {
        // Recognizers expect a quiet zone; rendered output may have none.
        let padded = pad_quiet_zone(image);
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            padded.width() as usize,
            padded.height() as usize,
            |x, y| padded.get_pixel(x as u32, y as u32)[0],
        );
        let grids = prepared.detect_grids();
        let Some(grid) = grids.first() else {
            return Ok(None);
        };
        let (_meta, content) = grid
            .decode()
            .map_err(|err| anyhow!("reading QR payload: {err}"))?;
        Ok(Some(content))
    }
}

/// Renders a matrix into an exactly `size`x`size` grayscale image: integer
/// module scale, leftover pixels split as centered white padding.
pub fn render_matrix(matrix: &ModuleMatrix, options: &EncodeOptions) -> Result<GrayImage> {
    let total_modules = matrix.width() as u32 + 2 * options.margin;
    if options.size < total_modules {
        bail!(
            "target size {}px cannot fit {} modules",
            options.size,
            total_modules
        );
    }
    let scale = options.size / total_modules;
    let rendered = matrix.width() as u32 * scale;
    let offset = (options.size - rendered) / 2;

    let mut image = GrayImage::from_pixel(options.size, options.size, Luma([255]));
    for my in 0..matrix.width() {
        for mx in 0..matrix.width() {
            if !matrix.is_dark(mx, my) {
                continue;
            }
            let base_x = offset + mx as u32 * scale;
            let base_y = offset + my as u32 * scale;
            for dy in 0..scale {
                for dx in 0..scale {
                    image.put_pixel(base_x + dx, base_y + dy, Luma([0]));
                }
            }
        }
    }
    Ok(image)
}

fn pad_quiet_zone(image: &GrayImage) -> GrayImage {
    let pad = (image.width().min(image.height()) / 4).max(16);
    let mut padded = GrayImage::from_pixel(
        image.width() + 2 * pad,
        image.height() + 2 * pad,
        Luma([255]),
    );
    image::imageops::replace(&mut padded, image, i64::from(pad), i64::from(pad));
    padded
}
