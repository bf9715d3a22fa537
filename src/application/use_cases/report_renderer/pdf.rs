// ============================================================
// PDF ENCODING
// ============================================================
// ReportLayout -> PDF bytes via lopdf.
// No document ID, info dictionary or timestamps are written, so equal
// layouts encode to equal bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::layout::{DrawOp, Font, Page, ReportLayout};
use crate::domain::error::{AppError, Result};
use crate::domain::report_style::{ReportStyle, Rgb};

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";
const LINE_WIDTH: f32 = 0.5;

pub fn encode(layout: &ReportLayout, style: &ReportStyle) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR => regular_id,
            FONT_BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let content = Content {
            operations: page_operations(page),
        };
        let bytes = content
            .encode()
            .map_err(|e| AppError::RenderError(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let media_box: Vec<Object> = vec![
        Object::Integer(0),
        Object::Integer(0),
        style.page_width.into(),
        style.page_height.into(),
    ];
    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if style.compress {
        doc.compress();
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::RenderError(format!("Failed to write PDF: {}", e)))?;
    Ok(bytes)
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut ops = vec![Operation::new("w", vec![LINE_WIDTH.into()])];

    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                font,
                color,
                text,
            } => {
                let font_name = match font {
                    Font::Regular => FONT_REGULAR,
                    Font::Bold => FONT_BOLD,
                };
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![font_name.into(), (*size).into()]));
                ops.push(fill_color(*color));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                let paint = match (fill, stroke) {
                    (Some(_), Some(_)) => "B",
                    (Some(_), None) => "f",
                    (None, Some(_)) => "S",
                    (None, None) => continue,
                };
                if let Some(fill) = fill {
                    ops.push(fill_color(*fill));
                }
                if let Some(stroke) = stroke {
                    ops.push(stroke_color(*stroke));
                }
                ops.push(Operation::new(
                    "re",
                    vec![(*x).into(), (*y).into(), (*width).into(), (*height).into()],
                ));
                ops.push(Operation::new(paint, vec![]));
            }
            DrawOp::Polygon { points, fill } => {
                let Some(((x0, y0), rest)) = points.split_first() else {
                    continue;
                };
                ops.push(fill_color(*fill));
                ops.push(Operation::new("m", vec![(*x0).into(), (*y0).into()]));
                for (x, y) in rest {
                    ops.push(Operation::new("l", vec![(*x).into(), (*y).into()]));
                }
                ops.push(Operation::new("h", vec![]));
                ops.push(Operation::new("f", vec![]));
            }
        }
    }

    ops
}

fn fill_color(color: Rgb) -> Operation {
    Operation::new("rg", color.components().iter().map(|c| (*c).into()).collect())
}

fn stroke_color(color: Rgb) -> Operation {
    Operation::new("RG", color.components().iter().map(|c| (*c).into()).collect())
}

/// Encode text for the standard fonts' WinAnsiEncoding. Characters outside
/// Windows-1252 become '?'.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (encoded, _, unmappable) = encoding_rs::WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable || encoded.len() != 1 {
            bytes.push(b'?');
        } else {
            bytes.extend_from_slice(&encoded);
        }
    }
    bytes
}
