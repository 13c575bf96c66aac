//! PDF rendition of an analysis: [`layout`] decides where everything goes,
//! [`writer`] serialises the result with `lopdf`.

pub mod layout;
pub mod metrics;
pub mod writer;

use std::path::Path;

use crate::ExportError;
use crate::types::ReportData;

/// Decoded warning icon, ready to embed as an image XObject.
#[derive(Debug, Clone)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    /// Packed 8-bit RGB samples.
    pub rgb: Vec<u8>,
    /// 8-bit alpha samples, present only when the image has transparency.
    pub alpha: Option<Vec<u8>>,
}

impl Icon {
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for px in rgba.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }
        let opaque = alpha.iter().all(|&a| a == u8::MAX);
        Self {
            width,
            height,
            rgb,
            alpha: (!opaque).then_some(alpha),
        }
    }

    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        Ok(Self::from_image(&image::open(path)?))
    }
}

/// Load the optional notice icon. The report is still produced without it,
/// so failures only log.
pub fn load_icon(path: Option<&Path>) -> Option<Icon> {
    let path = path?;
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no warning icon at path");
        return None;
    }
    match Icon::open(path) {
        Ok(icon) => Some(icon),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not load warning icon, continuing without it");
            None
        }
    }
}

/// Render the report to PDF bytes.
pub fn render_pdf(report: &ReportData, icon: Option<&Icon>) -> Result<Vec<u8>, ExportError> {
    let pages = layout::layout_report(report, icon.is_some());
    writer::write_pdf(&pages, icon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_icon_has_no_alpha() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            4,
            2,
            image::Rgb([255, 193, 7]),
        ));
        let icon = Icon::from_image(&img);
        assert_eq!((icon.width, icon.height), (4, 2));
        assert_eq!(icon.rgb.len(), 4 * 2 * 3);
        assert!(icon.alpha.is_none());
    }

    #[test]
    fn transparent_icon_keeps_alpha() {
        let mut img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let icon = Icon::from_image(&image::DynamicImage::ImageRgba8(img));
        assert_eq!(icon.alpha.as_deref(), Some(&[0, 255, 255, 255][..]));
    }

    #[test]
    fn missing_or_broken_icon_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_icon(None).is_none());
        assert!(load_icon(Some(&dir.path().join("nope.png"))).is_none());

        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        assert!(load_icon(Some(&broken)).is_none());
    }

    #[test]
    fn icon_round_trips_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warning.png");
        image::RgbaImage::from_pixel(3, 3, image::Rgba([255, 193, 7, 128]))
            .save(&path)
            .unwrap();
        let icon = load_icon(Some(&path)).unwrap();
        assert_eq!(icon.width, 3);
        assert!(icon.alpha.is_some());
    }
}
