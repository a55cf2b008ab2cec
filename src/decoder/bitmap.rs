//! Frame image decoding into RGBA bitmaps.
//!
//! The format is sniffed from the data, since chunk entry names are frame
//! numbers and carry no reliable extension. PNG is always available; JPEG
//! and WebP need the `jpeg` and `webp` features.

use std::io::Cursor;

use crate::error::DecodeError;

/// A decoded frame: `height` rows of `width` RGBA8 pixels, tightly packed.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("[{} bytes]", self.pixels.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }
}

impl Bitmap {
    /// Decode an encoded image into RGBA pixels.
    ///
    /// Images whose RGBA size would exceed `max_bytes` are refused before
    /// any pixel buffer is allocated.
    pub fn decode(data: &[u8], max_bytes: u64) -> Result<Self, DecodeError> {
        match ImageFormat::sniff(data) {
            Some(ImageFormat::Png) => decode_png(data, max_bytes),
            Some(ImageFormat::Jpeg) => decode_jpeg(data, max_bytes),
            Some(ImageFormat::WebP) => decode_webp(data, max_bytes),
            None => Err(DecodeError::UnsupportedImage),
        }
    }

    /// Pixel at `(x, y)`, if inside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels
            .get(at..at + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Re-encode as an RGBA PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, png::EncodingError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(out)
    }
}

/// Size of a `width` x `height` RGBA8 bitmap, checked against `max_bytes`.
fn rgba_size(width: u32, height: u32, max_bytes: u64) -> Result<usize, DecodeError> {
    let size = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|n| n.checked_mul(4));
    match size {
        Some(size) if size <= max_bytes => usize::try_from(size).map_err(|_| {
            DecodeError::EntryTooLarge {
                size,
                limit: max_bytes,
            }
        }),
        size => Err(DecodeError::EntryTooLarge {
            size: size.unwrap_or(u64::MAX),
            limit: max_bytes,
        }),
    }
}

fn decode_png(data: &[u8], max_bytes: u64) -> Result<Bitmap, DecodeError> {
    let limits = png::Limits {
        bytes: usize::try_from(max_bytes).unwrap_or(usize::MAX),
    };
    let mut decoder = png::Decoder::new_with_limits(Cursor::new(data), limits);
    // Palette and sub-byte depths expand, 16-bit samples drop to 8 bits.
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let (width, height) = (reader.info().width, reader.info().height);
    // The header is untrusted: refuse before allocating anything sized by it.
    rgba_size(width, height, max_bytes)?;

    let (color_type, _) = reader.output_color_type();
    let buf_size = reader
        .output_buffer_size()
        .ok_or(png::DecodingError::LimitsExceeded)?;
    let mut buf = vec![0u8; buf_size];
    let frame = reader.next_frame(&mut buf)?;
    buf.truncate(frame.buffer_size());

    let pixels = match color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 0xFF])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 0xFF]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Indexed => {
            return Err(DecodeError::Image("PNG palette was not expanded".into()));
        }
    };

    Ok(Bitmap {
        width,
        height,
        pixels,
    })
}

#[cfg(feature = "jpeg")]
fn decode_jpeg(data: &[u8], max_bytes: u64) -> Result<Bitmap, DecodeError> {
    // libjpeg reports fatal errors by unwinding.
    let decoded = std::panic::catch_unwind(|| -> Result<Bitmap, DecodeError> {
        let mut image = mozjpeg::Decompress::new_mem(data)?.rgba()?;
        let (width, height) = (image.width() as u32, image.height() as u32);
        rgba_size(width, height, max_bytes)?;
        let rows: Vec<[u8; 4]> = image.read_scanlines()?;
        image.finish()?;
        Ok(Bitmap {
            width,
            height,
            pixels: rows.concat(),
        })
    });

    match decoded {
        Ok(result) => result,
        Err(_) => Err(DecodeError::Image("corrupt JPEG data".into())),
    }
}

#[cfg(not(feature = "jpeg"))]
fn decode_jpeg(_data: &[u8], _max_bytes: u64) -> Result<Bitmap, DecodeError> {
    Err(DecodeError::Image(
        "JPEG support is not enabled (build with the `jpeg` feature)".into(),
    ))
}

#[cfg(feature = "webp")]
fn decode_webp(data: &[u8], max_bytes: u64) -> Result<Bitmap, DecodeError> {
    let features = webp::BitstreamFeatures::new(data)
        .ok_or_else(|| DecodeError::Image("corrupt WebP header".into()))?;
    rgba_size(features.width(), features.height(), max_bytes)?;

    let image = webp::Decoder::new(data)
        .decode()
        .ok_or_else(|| DecodeError::Image("corrupt WebP data".into()))?;

    let pixels = if image.is_alpha() {
        image.to_vec()
    } else {
        image
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 0xFF])
            .collect()
    };

    Ok(Bitmap {
        width: image.width(),
        height: image.height(),
        pixels,
    })
}

#[cfg(not(feature = "webp"))]
fn decode_webp(_data: &[u8], _max_bytes: u64) -> Result<Bitmap, DecodeError> {
    Err(DecodeError::Image(
        "WebP support is not enabled (build with the `webp` feature)".into(),
    ))
}
