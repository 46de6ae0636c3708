//! PDF export: rasterize, slice into page bands, wrap as JPEG pages

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, RgbImage};
use integrity_common::{Error, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::ops::Range;
use tracing::debug;

use super::raster::rasterize;
use super::ReportDocument;

const MM_TO_PT: f64 = 72.0 / 25.4;
const JPEG_QUALITY: u8 = 90;

/// Page geometry in millimetres plus the raster density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
    pub px_per_mm: f64,
}

impl PageLayout {
    pub fn a4() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 10.0,
            px_per_mm: 4.0,
        }
    }

    pub fn content_width_px(&self) -> u32 {
        ((self.width_mm - 2.0 * self.margin_mm) * self.px_per_mm).floor() as u32
    }

    /// Bitmap rows that fit on one page
    pub fn band_height_px(&self) -> u32 {
        ((self.height_mm - 2.0 * self.margin_mm) * self.px_per_mm).floor().max(1.0) as u32
    }

    fn page_size_pt(&self) -> (f64, f64) {
        (self.width_mm * MM_TO_PT, self.height_mm * MM_TO_PT)
    }
}

/// Split `height` rows into contiguous bands of at most `band` rows
///
/// Yields `ceil(height / band)` ranges covering `0..height` exactly once.
pub fn page_bands(height: u32, band: u32) -> Vec<Range<u32>> {
    let band = band.max(1);
    (0..height.div_ceil(band))
        .map(|i| {
            let start = i * band;
            start..(start + band).min(height)
        })
        .collect()
}

fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|e| Error::Render(format!("JPEG encoding failed: {}", e)))?;
    Ok(buf)
}

/// Render `doc` as a multi-page PDF
pub fn render_pdf(doc: &ReportDocument, layout: &PageLayout) -> Result<Vec<u8>> {
    let bitmap = rasterize(doc, layout.content_width_px())?;
    if bitmap.height() == 0 {
        return Err(Error::Render("Report has no content to print".to_string()));
    }

    let bands = page_bands(bitmap.height(), layout.band_height_px());
    let pages: Vec<(u32, Vec<u8>)> = bands
        .iter()
        .map(|rows| {
            let slice = imageops::crop_imm(&bitmap, 0, rows.start, bitmap.width(), rows.len() as u32).to_image();
            encode_jpeg(&slice).map(|jpeg| (slice.height(), jpeg))
        })
        .collect::<Result<_>>()?;

    let bytes = assemble(layout, bitmap.width(), &pages)?;
    debug!(
        pages = pages.len(),
        bitmap_height = bitmap.height(),
        bytes = bytes.len(),
        "PDF assembled"
    );
    Ok(bytes)
}

/// One image page per JPEG band, top-aligned inside the margins
fn assemble(layout: &PageLayout, width_px: u32, pages: &[(u32, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut pdf = Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let (page_w, page_h) = layout.page_size_pt();
    let margin = layout.margin_mm * MM_TO_PT;
    let px_to_pt = MM_TO_PT / layout.px_per_mm;

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (height_px, jpeg) in pages {
        let image_id = pdf.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width_px as i64,
                "Height" => *height_px as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.clone(),
        ));

        let draw_w = width_px as f64 * px_to_pt;
        let draw_h = *height_px as f64 * px_to_pt;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(draw_w as f32),
                        0.into(),
                        0.into(),
                        Object::Real(draw_h as f32),
                        Object::Real(margin as f32),
                        Object::Real((page_h - margin - draw_h) as f32),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| Error::Render(format!("PDF content encoding failed: {}", e)))?;
        let content_id = pdf.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(page_w as f32),
                Object::Real(page_h as f32),
            ],
        }),
    );

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    pdf.save_to(&mut buf)
        .map_err(|e| Error::Render(format!("PDF write failed: {}", e)))?;
    Ok(buf)
}
