//! Fixture helpers: in-memory ZIP chunks and PNG frames.

#![allow(dead_code)]

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::io::Write;

use chunkzip::DecoderConfig;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// Builds a ZIP archive entry by entry, in the order given.
#[derive(Default)]
pub struct ZipBuilder {
    data: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, payload: &[u8]) -> Self {
        let crc = crc32(payload);
        self.raw(name, METHOD_STORED, payload.to_vec(), payload.len(), crc)
    }

    pub fn deflated(self, name: &str, payload: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(payload).unwrap();
        let packed = encoder.finish().unwrap();
        self.raw(name, METHOD_DEFLATE, packed, payload.len(), crc32(payload))
    }

    /// A stored entry whose recorded CRC does not match its data.
    pub fn stored_with_bad_crc(self, name: &str, payload: &[u8]) -> Self {
        let crc = crc32(payload) ^ 0xDEAD_BEEF;
        self.raw(name, METHOD_STORED, payload.to_vec(), payload.len(), crc)
    }

    pub fn directory(self, name: &str) -> Self {
        assert!(name.ends_with('/'));
        self.raw(name, METHOD_STORED, Vec::new(), 0, 0)
    }

    pub fn raw(
        mut self,
        name: &str,
        method: u16,
        data: Vec<u8>,
        uncompressed: usize,
        crc: u32,
    ) -> Self {
        let offset = self.data.len() as u32;

        self.data.extend_from_slice(b"PK\x03\x04");
        put16(&mut self.data, 20);
        put16(&mut self.data, 0);
        put16(&mut self.data, method);
        put16(&mut self.data, 0);
        put16(&mut self.data, 0x21);
        put32(&mut self.data, crc);
        put32(&mut self.data, data.len() as u32);
        put32(&mut self.data, uncompressed as u32);
        put16(&mut self.data, name.len() as u16);
        put16(&mut self.data, 0);
        self.data.extend_from_slice(name.as_bytes());
        self.data.extend_from_slice(&data);

        self.central.extend_from_slice(b"PK\x01\x02");
        put16(&mut self.central, 20);
        put16(&mut self.central, 20);
        put16(&mut self.central, 0);
        put16(&mut self.central, method);
        put16(&mut self.central, 0);
        put16(&mut self.central, 0x21);
        put32(&mut self.central, crc);
        put32(&mut self.central, data.len() as u32);
        put32(&mut self.central, uncompressed as u32);
        put16(&mut self.central, name.len() as u16);
        put16(&mut self.central, 0);
        put16(&mut self.central, 0);
        put16(&mut self.central, 0);
        put16(&mut self.central, 0);
        put32(&mut self.central, 0);
        put32(&mut self.central, offset);
        self.central.extend_from_slice(name.as_bytes());

        self.count += 1;
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        let cd_offset = self.data.len() as u32;
        let cd_size = self.central.len() as u32;
        self.data.extend_from_slice(&self.central);

        self.data.extend_from_slice(b"PK\x05\x06");
        put16(&mut self.data, 0);
        put16(&mut self.data, 0);
        put16(&mut self.data, self.count);
        put16(&mut self.data, self.count);
        put32(&mut self.data, cd_size);
        put32(&mut self.data, cd_offset);
        put16(&mut self.data, 0);
        self.data
    }
}

/// An RGB PNG filled with a single colour.
pub fn png_frame(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let pixels: Vec<u8> = std::iter::repeat(rgb)
        .take((width * height) as usize)
        .flatten()
        .collect();

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&pixels).unwrap();
        writer.finish().unwrap();
    }
    out
}

/// A valid 1x1 PNG whose header claims `width` x `height`.
pub fn png_with_declared_size(width: u32, height: u32) -> Vec<u8> {
    let mut png = png_frame(1, 1, [0, 0, 0]);
    // Signature, IHDR length and type, then width and height; the chunk CRC
    // covers the type and data and follows at 29.
    png[16..20].copy_from_slice(&width.to_be_bytes());
    png[20..24].copy_from_slice(&height.to_be_bytes());
    let crc = crc32(&png[12..29]);
    png[29..33].copy_from_slice(&crc.to_be_bytes());
    png
}

pub fn config(parallel: usize) -> DecoderConfig {
    DecoderConfig {
        max_parallel_entries: parallel,
        ..DecoderConfig::default()
    }
}

/// One entry decoding at a time and one event in flight, so scheduling
/// advances in step with the consumer.
pub fn lockstep_config() -> DecoderConfig {
    DecoderConfig {
        max_parallel_entries: 1,
        channel_capacity: 1,
        ..DecoderConfig::default()
    }
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

fn put16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
