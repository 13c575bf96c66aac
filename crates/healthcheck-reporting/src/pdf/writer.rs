//! Serialise laid-out pages to a PDF document.
//!
//! Uses the standard Helvetica fonts with WinAnsiEncoding, so no font
//! program is embedded and text is written as single-byte strings.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use super::Icon;
use super::layout::{Align, DrawOp, Font, PAGE_HEIGHT, PAGE_WIDTH, Page, Rgb};
use super::metrics::text_width;
use crate::ExportError;

const PT_PER_MM: f64 = 72.0 / 25.4;
/// Control-point distance for approximating a quarter circle with a cubic.
const KAPPA: f64 = 0.552_284_8;

fn pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn font_name(font: Font) -> &'static str {
    match font {
        Font::Regular => "F1",
        Font::Bold => "F2",
    }
}

/// Encode text as WinAnsi (CP-1252) bytes. Comparison signs common in lab
/// reference ranges get ASCII stand-ins; anything else unmappable becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '≥' => out.extend_from_slice(b">="),
            '≤' => out.extend_from_slice(b"<="),
            '≠' => out.extend_from_slice(b"!="),
            '≈' => out.push(b'~'),
            '−' => out.push(b'-'),
            _ => out.push(win_ansi_byte(c)),
        }
    }
    out
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
        '€' => 0x80,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '\t' => b' ',
        _ => b'?',
    }
}

fn fill_color(ops: &mut Vec<Operation>, c: Rgb) {
    ops.push(Operation::new("rg", rgb_operands(c)));
}

fn stroke_color(ops: &mut Vec<Operation>, c: Rgb) {
    ops.push(Operation::new("RG", rgb_operands(c)));
}

fn rgb_operands(Rgb(r, g, b): Rgb) -> Vec<Object> {
    [r, g, b]
        .into_iter()
        .map(|v| real(f64::from(v) / 255.0))
        .collect()
}

fn op(name: &str, operands: &[f64]) -> Operation {
    Operation::new(name, operands.iter().map(|&v| real(v)).collect())
}

/// Rounded rectangle path in PDF space. `(x0, y0)` is the bottom-left corner.
fn rounded_rect_path(ops: &mut Vec<Operation>, x0: f64, y0: f64, w: f64, h: f64, r: f64) {
    let (x1, y1) = (x0 + w, y0 + h);
    let k = r * KAPPA;
    ops.push(op("m", &[x0 + r, y0]));
    ops.push(op("l", &[x1 - r, y0]));
    ops.push(op("c", &[x1 - r + k, y0, x1, y0 + r - k, x1, y0 + r]));
    ops.push(op("l", &[x1, y1 - r]));
    ops.push(op("c", &[x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1]));
    ops.push(op("l", &[x0 + r, y1]));
    ops.push(op("c", &[x0 + r - k, y1, x0, y1 - r + k, x0, y1 - r]));
    ops.push(op("l", &[x0, y0 + r]));
    ops.push(op("c", &[x0, y0 + r - k, x0 + r - k, y0, x0 + r, y0]));
    ops.push(Operation::new("h", vec![]));
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut ops = Vec::new();
    for draw in &page.ops {
        match draw {
            DrawOp::FillRect { x, y, w, h, fill } => {
                fill_color(&mut ops, *fill);
                ops.push(op("re", &[pt(*x), pt(PAGE_HEIGHT - y - h), pt(*w), pt(*h)]));
                ops.push(Operation::new("f", vec![]));
            }
            DrawOp::RoundedRect {
                x,
                y,
                w,
                h,
                radius,
                fill,
                stroke,
                line_width,
            } => {
                fill_color(&mut ops, *fill);
                stroke_color(&mut ops, *stroke);
                ops.push(op("w", &[pt(*line_width)]));
                rounded_rect_path(
                    &mut ops,
                    pt(*x),
                    pt(PAGE_HEIGHT - y - h),
                    pt(*w),
                    pt(*h),
                    pt(*radius),
                );
                ops.push(Operation::new("B", vec![]));
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                width,
            } => {
                stroke_color(&mut ops, *color);
                ops.push(op("w", &[pt(*width)]));
                ops.push(op("m", &[pt(*x1), pt(PAGE_HEIGHT - y1)]));
                ops.push(op("l", &[pt(*x2), pt(PAGE_HEIGHT - y2)]));
                ops.push(Operation::new("S", vec![]));
            }
            DrawOp::Text {
                x,
                y,
                text,
                font,
                size,
                color,
                align,
            } => {
                let width = text_width(text, *size, *font);
                let left = match align {
                    Align::Left => *x,
                    Align::Center => x - width / 2.0,
                    Align::Right => x - width,
                };
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font_name(*font).as_bytes().to_vec()), real(*size)],
                ));
                fill_color(&mut ops, *color);
                ops.push(op("Td", &[pt(left), pt(PAGE_HEIGHT - y)]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Icon { x, y, w, h } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(op("cm", &[pt(*w), 0.0, 0.0, pt(*h), pt(*x), pt(PAGE_HEIGHT - y - h)]));
                ops.push(Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
    ops
}

fn add_font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    })
}

fn add_icon(doc: &mut Document, icon: &Icon) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(i64::from(icon.width)),
        "Height" => Object::Integer(i64::from(icon.height)),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => Object::Integer(8),
    };
    if let Some(alpha) = &icon.alpha {
        let smask = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(i64::from(icon.width)),
                "Height" => Object::Integer(i64::from(icon.height)),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(8),
            },
            alpha.clone(),
        ));
        dict.set("SMask", smask);
    }
    doc.add_object(Stream::new(dict, icon.rgb.clone()))
}

/// Build the document and return its serialised bytes.
pub fn write_pdf(pages: &[Page], icon: Option<&Icon>) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = add_font(&mut doc, "Helvetica");
    let bold = add_font(&mut doc, "Helvetica-Bold");
    let mut resources = dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    };
    if let Some(icon) = icon {
        let image_id = add_icon(&mut doc, icon);
        resources.set("XObject", dictionary! { "Im1" => image_id });
    }
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                real(pt(PAGE_WIDTH)),
                real(pt(PAGE_HEIGHT)),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("HealthCheck - Resultados del Analisis"),
        "Producer" => Object::string_literal("HealthCheck"),
    });
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
