use image::{DynamicImage, ImageDecoder, ImageError, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use thiserror::Error;

const JPEG_SOS: [u8; 2] = [0xFF, 0xDA];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to decode image: upload is empty")]
    Empty,

    #[error("failed to decode image: {0}")]
    Format(#[from] ImageError),

    #[error("failed to decode image: decoded image has zero size ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("failed to decode image: JPEG data ends before the end-of-image marker")]
    Truncated,
}

/// An RGB8 pixel grid with non-zero width and height.
///
/// Channel order is R, G, B, which is what the exported detection models
/// expect; alpha and grayscale sources are expanded or dropped on decode.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    pub fn from_rgb(pixels: RgbImage) -> Result<Self, DecodeError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroDimensions { width, height });
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Packed row-major HWC bytes.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}

/// Decode an uploaded buffer into an RGB image.
///
/// The format is sniffed from the leading bytes; any declared content type is
/// ignored. An EXIF orientation tag is applied, so the returned grid is the
/// image as a viewer would show it.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let _s = common::span_debug!("decode_image");

    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let format = image::guess_format(bytes)?;
    if format == ImageFormat::Jpeg && !jpeg_is_complete(bytes) {
        return Err(DecodeError::Truncated);
    }

    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format).into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut decoded = DynamicImage::from_decoder(decoder)?;
    decoded.apply_orientation(orientation);

    tracing::debug!(
        format = ?format,
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        orientation = ?orientation,
        "Decoded upload"
    );

    DecodedImage::from_rgb(decoded.into_rgb8())
}

/// The JPEG decoder pads a cut-off scan with grey instead of failing, so
/// require an EOI marker after the last start-of-scan. Entropy-coded data
/// byte-stuffs 0xFF, so neither marker can appear inside a scan.
fn jpeg_is_complete(bytes: &[u8]) -> bool {
    let Some(last_scan) = bytes.windows(2).rposition(|w| w == JPEG_SOS) else {
        return false;
    };
    bytes[last_scan..].windows(2).any(|w| w == JPEG_EOI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbaImage};
    use std::io::Cursor;

    fn encode(image: &image::DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> image::DynamicImage {
        image::DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_decode_png() {
        let bytes = encode(&solid_rgb(10, 10, [10, 20, 30]), ImageFormat::Png);
        let decoded = decode(&bytes).unwrap();

        assert_eq!((decoded.width(), decoded.height()), (10, 10));
        assert_eq!(decoded.as_raw().len(), 10 * 10 * 3);
        assert_eq!(&decoded.as_raw()[..3], &[10, 20, 30], "PNG decodes losslessly as RGB");
    }

    #[test]
    fn test_decode_jpeg() {
        let bytes = encode(&solid_rgb(32, 16, [200, 40, 40]), ImageFormat::Jpeg);
        let decoded = decode(&bytes).unwrap();

        assert_eq!((decoded.width(), decoded.height()), (32, 16));
        // Lossy, but a solid red stays red-dominant in channel 0
        let px = &decoded.as_raw()[..3];
        assert!(px[0] > px[1] && px[0] > px[2], "expected red first, got {:?}", px);
    }

    #[test]
    fn test_decode_drops_alpha() {
        let rgba = image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([1, 2, 3, 128]),
        ));
        let decoded = decode(&encode(&rgba, ImageFormat::Png)).unwrap();

        assert_eq!(decoded.as_raw().len(), 4 * 4 * 3);
        assert_eq!(&decoded.as_raw()[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_decode_expands_grayscale() {
        let gray = image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            3,
            2,
            image::Luma([77]),
        ));
        let decoded = decode(&encode(&gray, ImageFormat::Png)).unwrap();

        assert_eq!(&decoded.as_raw()[..3], &[77, 77, 77]);
    }

    #[test]
    fn test_empty_buffer_is_decode_error() {
        let err = decode(&[]).unwrap_err();
        assert!(matches!(err, DecodeError::Empty));
        assert!(err.to_string().contains("failed to decode image"));
    }

    #[test]
    fn test_garbage_bytes_are_decode_error() {
        let err = decode(&[0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, DecodeError::Format(_)));
        assert!(err.to_string().starts_with("failed to decode image"));
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let bytes = encode(&solid_rgb(64, 64, [0, 255, 0]), ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];

        assert!(matches!(decode(truncated), Err(DecodeError::Format(_))));
    }

    #[test]
    fn test_truncated_jpeg_is_decode_error() {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 90]));
        let bytes = encode(&image::DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);
        assert!(decode(&bytes).is_ok());

        let len = bytes.len();
        for keep in [len / 2, len * 2 / 3, len * 3 / 4, len * 9 / 10, len - 1] {
            let err = decode(&bytes[..keep]).unwrap_err();
            assert!(
                err.to_string().starts_with("failed to decode image"),
                "{keep}/{len} bytes: {err}"
            );
        }
    }

    #[test]
    fn test_jpeg_with_trailing_bytes_still_decodes() {
        let mut bytes = encode(&solid_rgb(16, 16, [50, 60, 70]), ImageFormat::Jpeg);
        bytes.extend_from_slice(&[0, 0, 0, 0]);

        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    /// Insert an APP1 Exif segment carrying only an Orientation tag right
    /// after the SOI marker.
    fn with_exif_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
        #[rustfmt::skip]
        let payload: Vec<u8> = vec![
            b'E', b'x', b'i', b'f', 0, 0,
            // Big-endian TIFF header, IFD0 at offset 8
            b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08,
            // One entry: tag 0x0112 (Orientation), SHORT, count 1
            0x00, 0x01,
            0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, orientation, 0x00, 0x00,
            // No next IFD
            0x00, 0x00, 0x00, 0x00,
        ];
        let segment_len = (payload.len() + 2) as u16;

        let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_exif_rotation_is_applied() {
        let jpeg = encode(&solid_rgb(20, 10, [120, 120, 120]), ImageFormat::Jpeg);

        let rotated = decode(&with_exif_orientation(&jpeg, 6)).unwrap();
        assert_eq!((rotated.width(), rotated.height()), (10, 20));

        let upright = decode(&with_exif_orientation(&jpeg, 1)).unwrap();
        assert_eq!((upright.width(), upright.height()), (20, 10));
    }

    #[test]
    fn test_magic_only_is_decode_error() {
        // Valid PNG signature, nothing after it
        let magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert!(decode(&magic).is_err());
    }

    #[test]
    fn test_zero_sized_image_rejected() {
        let err = DecodedImage::from_rgb(RgbImage::new(0, 5)).unwrap_err();
        assert!(matches!(err, DecodeError::ZeroDimensions { width: 0, height: 5 }));
    }
}
