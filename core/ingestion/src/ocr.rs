use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::extractor::{run_cmd_with_timeout, ExtractError};

/// Images larger than this on their longest side are scaled down.
pub const MAX_SIDE: u32 = 2000;
/// Images smaller than this on their longest side are scaled up 2x.
pub const MIN_SIDE: u32 = 800;

/// Tesseract-backed text recognition with a light cleanup pass on the image.
pub struct OcrEngine {
    languages: String,
    timeout_secs: u64,
}

impl OcrEngine {
    pub fn new(languages: &str, timeout_secs: u64) -> Self {
        Self {
            languages: languages.to_string(),
            timeout_secs,
        }
    }

    /// Recognized text, or a readable failure report naming the file.
    pub async fn recognize(&self, path: &Path, file_name: &str) -> String {
        match self.try_recognize(path).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("OCR failed for {}: {}", file_name, e);
                self.failure_report(file_name, &e)
            }
        }
    }

    async fn try_recognize(&self, path: &Path) -> Result<String, ExtractError> {
        let prepared = tempfile::Builder::new()
            .prefix("docnote-ocr-")
            .suffix(".png")
            .tempfile()?;

        let source = path.to_path_buf();
        let target = prepared.path().to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), ExtractError> {
            let img = image::open(&source)?;
            preprocess(img).save(&target)?;
            Ok(())
        })
        .await??;

        debug!("Running tesseract with languages {}", self.languages);

        run_cmd_with_timeout(
            "tesseract",
            Command::new("tesseract")
                .arg(prepared.path())
                .arg("stdout")
                .arg("-l")
                .arg(&self.languages),
            self.timeout_secs,
        )
        .await
    }

    fn failure_report(&self, file_name: &str, error: &ExtractError) -> String {
        format!(
            "[OCR failed for {}]\n\
             Reason: {}\n\
             Possible causes:\n\
             - tesseract is not installed or not on PATH\n\
             - language data for {} is not installed\n\
             - the image is too blurry or low-contrast to read",
            file_name, error, self.languages
        )
    }
}

/// Normalize size, drop colour, stretch contrast, then sharpen.
pub fn preprocess(img: DynamicImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height);

    let img = if longest > MAX_SIDE {
        img.resize(MAX_SIDE, MAX_SIDE, FilterType::Lanczos3)
    } else if longest < MIN_SIDE {
        img.resize(width * 2, height * 2, FilterType::Lanczos3)
    } else {
        img
    };

    let mut gray = img.to_luma8();
    stretch_contrast(&mut gray);
    imageops::unsharpen(&gray, 1.0, 2)
}

/// Linear min/max stretch to the full 0..=255 range. Flat images are left alone.
pub fn stretch_contrast(img: &mut GrayImage) {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));

    if max <= min {
        return;
    }

    let span = u32::from(max - min);
    for pixel in img.pixels_mut() {
        let value = u32::from(pixel.0[0] - min);
        pixel.0[0] = (value * 255 / span) as u8;
    }
}
