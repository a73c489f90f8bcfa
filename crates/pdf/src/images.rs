use std::fmt;
use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, DynamicImage, ExtendedColorType, ImageDecoder};
use lopdf::{dictionary, Object, ObjectId, Stream};

use crate::compose::OutputDocument;
use crate::PdfError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    WebP,
    Unknown,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => write!(f, "jpeg"),
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Gif => write!(f, "gif"),
            ImageFormat::Bmp => write!(f, "bmp"),
            ImageFormat::WebP => write!(f, "webp"),
            ImageFormat::Unknown => write!(f, "unknown"),
        }
    }
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Unknown => "application/octet-stream",
        }
    }
}

/// Detect the image format from raw bytes using magic byte signatures.
///
/// Returns `ImageFormat::Unknown` if the bytes are too short (< 8) or no
/// known signature matches.
pub fn detect_image_format(bytes: &[u8]) -> ImageFormat {
    if bytes.len() < 8 {
        return ImageFormat::Unknown;
    }

    // JPEG: FF D8 FF
    if bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
        return ImageFormat::Jpeg;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if bytes[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return ImageFormat::Png;
    }

    // GIF: "GIF87a" or "GIF89a"
    if &bytes[..6] == b"GIF87a" || &bytes[..6] == b"GIF89a" {
        return ImageFormat::Gif;
    }

    // BMP: "BM"
    if bytes[0] == b'B' && bytes[1] == b'M' {
        return ImageFormat::Bmp;
    }

    // WebP: "RIFF" at offset 0 and "WEBP" at offset 8
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return ImageFormat::WebP;
    }

    ImageFormat::Unknown
}

/// An image XObject in the output document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    /// Height over width.
    pub fn aspect(&self) -> f32 {
        if self.width == 0 {
            1.0
        } else {
            self.height as f32 / self.width as f32
        }
    }
}

/// Embed PNG or JPEG bytes. Other formats are rejected.
pub fn embed_image(out: &mut OutputDocument, bytes: &[u8]) -> Result<EmbeddedImage, PdfError> {
    match detect_image_format(bytes) {
        ImageFormat::Png => {
            let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
                .map_err(|e| PdfError::Image(e.to_string()))?;
            Ok(embed_decoded(out, &decoded))
        }
        ImageFormat::Jpeg => embed_jpeg(out, bytes),
        other => Err(PdfError::Image(format!("unsupported image format: {}", other))),
    }
}

/// Embed decoded pixels as 8-bit RGB, with a soft mask when any pixel is
/// not fully opaque.
pub fn embed_decoded(out: &mut OutputDocument, decoded: &DynamicImage) -> EmbeddedImage {
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    let mut alpha = Vec::with_capacity(width as usize * height as usize);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if alpha.iter().any(|&a| a != u8::MAX) {
        let mask = out.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        dict.set("SMask", mask);
    }

    let id = out.add_object(Stream::new(dict, rgb));
    EmbeddedImage { id, width, height }
}

/// Device space for JPEG data passed through behind `DCTDecode`. CMYK and
/// other models have none; the decoder converts those to RGB.
fn dct_color_space(color: ExtendedColorType) -> Option<&'static str> {
    match color {
        ExtendedColorType::L8 => Some("DeviceGray"),
        ExtendedColorType::Rgb8 => Some("DeviceRGB"),
        _ => None,
    }
}

/// JPEG data goes in as-is behind `DCTDecode` when its color model maps onto
/// a device space; anything else is decoded and re-embedded.
fn embed_jpeg(out: &mut OutputDocument, bytes: &[u8]) -> Result<EmbeddedImage, PdfError> {
    let decoder =
        JpegDecoder::new(Cursor::new(bytes)).map_err(|e| PdfError::Image(e.to_string()))?;
    let color_space = dct_color_space(decoder.original_color_type());
    let decoded =
        DynamicImage::from_decoder(decoder).map_err(|e| PdfError::Image(e.to_string()))?;

    let Some(color_space) = color_space else {
        return Ok(embed_decoded(out, &decoded));
    };

    let (width, height) = (decoded.width(), decoded.height());
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    )
    .with_compression(false);

    let id = out.add_object(Object::Stream(stream));
    Ok(EmbeddedImage { id, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{jpeg_bytes, png_bytes};

    // -- detect_image_format ------------------------------------------------

    #[test]
    fn detect_jpeg() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
        assert_eq!(detect_image_format(&bytes), ImageFormat::Jpeg);
    }

    #[test]
    fn detect_png() {
        let bytes = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        assert_eq!(detect_image_format(&bytes), ImageFormat::Png);
    }

    #[test]
    fn detect_gif89a() {
        assert_eq!(detect_image_format(b"GIF89a\x01\x00\x01\x00"), ImageFormat::Gif);
    }

    #[test]
    fn detect_webp() {
        assert_eq!(detect_image_format(b"RIFF\x00\x00\x00\x00WEBPVP8 "), ImageFormat::WebP);
    }

    #[test]
    fn detect_short_input() {
        assert_eq!(detect_image_format(&[0xFF, 0xD8, 0xFF]), ImageFormat::Unknown);
    }

    #[test]
    fn detect_generated_images() {
        assert_eq!(detect_image_format(&png_bytes(4, 4, 255)), ImageFormat::Png);
        assert_eq!(detect_image_format(&jpeg_bytes(4, 4)), ImageFormat::Jpeg);
    }

    // -- embedding ----------------------------------------------------------

    #[test]
    fn embed_opaque_png() {
        let mut out = OutputDocument::new();
        let image = embed_image(&mut out, &png_bytes(8, 4, 255)).unwrap();
        assert_eq!((image.width, image.height), (8, 4));
        assert_eq!(image.aspect(), 0.5);
    }

    #[test]
    fn embed_translucent_png_adds_mask() {
        let mut out = OutputDocument::new();
        let opaque = embed_image(&mut out, &png_bytes(2, 2, 255)).unwrap();
        let translucent = embed_image(&mut out, &png_bytes(2, 2, 128)).unwrap();
        // The mask is its own object, allocated before the image.
        assert_eq!(translucent.id.0, opaque.id.0 + 2);
    }

    #[test]
    fn embed_jpeg_keeps_dimensions() {
        let mut out = OutputDocument::new();
        let image = embed_image(&mut out, &jpeg_bytes(6, 3)).unwrap();
        assert_eq!((image.width, image.height), (6, 3));
    }

    #[test]
    fn rgb_jpeg_is_passed_through() {
        let mut out = OutputDocument::new();
        let bytes = jpeg_bytes(6, 3);
        let image = embed_image(&mut out, &bytes).unwrap();
        let stream = out.object(image.id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert_eq!(stream.content, bytes);
    }

    #[test]
    fn only_gray_and_rgb_jpegs_keep_their_encoding() {
        assert_eq!(dct_color_space(ExtendedColorType::L8), Some("DeviceGray"));
        assert_eq!(dct_color_space(ExtendedColorType::Rgb8), Some("DeviceRGB"));
        assert_eq!(dct_color_space(ExtendedColorType::Cmyk8), None);
        assert_eq!(dct_color_space(ExtendedColorType::La8), None);
    }

    #[test]
    fn embed_rejects_other_formats() {
        let mut out = OutputDocument::new();
        assert!(matches!(
            embed_image(&mut out, b"GIF89a\x01\x00\x01\x00"),
            Err(PdfError::Image(_))
        ));
        assert!(matches!(
            embed_image(&mut out, b"plain text, not an image"),
            Err(PdfError::Image(_))
        ));
    }
}
