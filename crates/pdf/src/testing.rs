//! Fixture builders shared by the unit tests.

use std::io::Cursor;

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::source::SourceDocument;

/// A PDF with one page per entry of `sizes`, each filling a small square.
pub fn blank_pdf(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = sizes
        .iter()
        .map(|&(width, height)| {
            let content = Content {
                operations: vec![
                    Operation::new("re", vec![0.into(), 0.into(), 10.into(), 10.into()]),
                    Operation::new("f", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                lopdf::Dictionary::new(),
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ],
                "Resources" => lopdf::Dictionary::new(),
                "Contents" => content_id,
            });
            page_id.into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A single A4 page whose `Contents` is an array with one stream per entry.
pub fn split_content_pdf(streams: &[&[u8]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let contents: Vec<Object> = streams
        .iter()
        .map(|data| {
            doc.add_object(Stream::new(lopdf::Dictionary::new(), data.to_vec()))
                .into()
        })
        .collect();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(595.0), Object::Real(842.0)],
        "Resources" => lopdf::Dictionary::new(),
        "Contents" => contents,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Page sizes of a PDF, in page order.
pub fn page_sizes(bytes: &[u8]) -> Vec<(f32, f32)> {
    let source = SourceDocument::load_bytes(bytes).unwrap();
    source
        .pages()
        .values()
        .map(|&id| source.page_dimensions(id).unwrap())
        .collect()
}

/// A solid red PNG with the given alpha.
pub fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 20, 20, alpha]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([20, 20, 200]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// A `Tj` found in a page content stream, with the `Td` offset before it.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnText {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

fn decoded_ops(bytes: &[u8], number: u32) -> Vec<Operation> {
    let source = SourceDocument::load_bytes(bytes).unwrap();
    let id = source.pages()[&number];
    let content = source.page(id).unwrap().content;
    Content::decode(&content).unwrap().operations
}

pub fn drawn_text(bytes: &[u8], number: u32) -> Vec<DrawnText> {
    let mut position = (0.0, 0.0);
    let mut texts = Vec::new();
    for op in decoded_ops(bytes, number) {
        match op.operator.as_str() {
            "Td" => {
                position = (
                    op.operands[0].as_float().unwrap(),
                    op.operands[1].as_float().unwrap(),
                );
            }
            "Tj" => {
                if let Object::String(raw, _) = &op.operands[0] {
                    texts.push(DrawnText {
                        x: position.0,
                        y: position.1,
                        text: raw.iter().map(|&b| b as char).collect(),
                    });
                }
            }
            _ => {}
        }
    }
    texts
}

/// Names passed to `Do`, in drawing order.
pub fn drawn_xobjects(bytes: &[u8], number: u32) -> Vec<String> {
    decoded_ops(bytes, number)
        .into_iter()
        .filter(|op| op.operator == "Do")
        .filter_map(|op| {
            op.operands
                .first()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
        })
        .collect()
}

/// Operators of the Form XObject a page registers under `name`.
pub fn form_operators(bytes: &[u8], number: u32, name: &str) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    let page = doc.get_dictionary(doc.get_pages()[&number]).unwrap();
    let form_id = page
        .get(b"Resources")
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"XObject"))
        .and_then(Object::as_dict)
        .and_then(|x| x.get(name.as_bytes()))
        .and_then(Object::as_reference)
        .unwrap();
    let form = doc.get_object(form_id).and_then(Object::as_stream).unwrap();
    let data = form
        .decompressed_content()
        .unwrap_or_else(|_| form.content.clone());
    Content::decode(&data)
        .unwrap()
        .operations
        .into_iter()
        .map(|op| op.operator)
        .collect()
}
