//! Incremental text decoders producing UTF-8.
//!
//! A [`Codec`] converts raw bytes to UTF-8 piecewise. It never splits a
//! character across calls: when the destination cannot hold the next
//! character it stops with [`TransformStatus::ShortDst`], and when the source
//! ends in the middle of a sequence it stops with [`TransformStatus::ShortSrc`]
//! so the caller can retry with more input. Malformed input decodes to
//! U+FFFD rather than failing.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStatus {
    /// All of `src` was consumed
    Complete,
    /// `dst` has no room for the next character
    ShortDst,
    /// `src` ends with an incomplete sequence
    ShortSrc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transformed {
    pub written: usize,
    pub consumed: usize,
    pub status: TransformStatus,
}

impl Transformed {
    fn new(written: usize, consumed: usize, status: TransformStatus) -> Self {
        Self {
            written,
            consumed,
            status,
        }
    }
}

pub trait Codec: Send {
    /// Decode from `src` into `dst`. `at_eof` tells the codec no more input
    /// follows, so trailing incomplete sequences must be flushed.
    fn transform(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool) -> Result<Transformed>;

    /// Copy of the codec including any state it has accumulated
    fn box_clone(&self) -> Box<dyn Codec>;

    /// Whether a fresh codec may start decoding at any character boundary.
    /// Codecs that learn something from the head of the stream (a byte order
    /// mark) return false.
    fn resumable(&self) -> bool {
        true
    }
}

impl Clone for Box<dyn Codec> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Write `c` at `dst[*w..]`, returning false when it does not fit
fn put_char(dst: &mut [u8], w: &mut usize, c: char) -> bool {
    let len = c.len_utf8();
    if dst.len() - *w < len {
        return false;
    }
    c.encode_utf8(&mut dst[*w..*w + len]);
    *w += len;
    true
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// Byte-for-byte passthrough
#[derive(Debug, Clone, Default)]
pub struct PlainCodec;

impl Codec for PlainCodec {
    fn transform(&mut self, dst: &mut [u8], src: &[u8], _at_eof: bool) -> Result<Transformed> {
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
        let status = if n < src.len() {
            TransformStatus::ShortDst
        } else {
            TransformStatus::Complete
        };
        Ok(Transformed::new(n, n, status))
    }

    fn box_clone(&self) -> Box<dyn Codec> {
        Box::new(self.clone())
    }
}

/// Validating UTF-8 decoder
#[derive(Debug, Clone, Default)]
pub struct Utf8Codec;

impl Codec for Utf8Codec {
    fn transform(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool) -> Result<Transformed> {
        let mut r = 0;
        let mut w = 0;

        while r < src.len() {
            let lead = src[r];
            if lead < 0x80 {
                if w == dst.len() {
                    return Ok(Transformed::new(w, r, TransformStatus::ShortDst));
                }
                dst[w] = lead;
                w += 1;
                r += 1;
                continue;
            }

            let width = utf8_width(lead);
            if width == 0 {
                if !put_char(dst, &mut w, REPLACEMENT) {
                    return Ok(Transformed::new(w, r, TransformStatus::ShortDst));
                }
                r += 1;
                continue;
            }

            let end = (r + width).min(src.len());
            match std::str::from_utf8(&src[r..end]) {
                Ok(s) => {
                    if dst.len() - w < s.len() {
                        return Ok(Transformed::new(w, r, TransformStatus::ShortDst));
                    }
                    dst[w..w + s.len()].copy_from_slice(s.as_bytes());
                    w += s.len();
                    r = end;
                }
                Err(e) if e.error_len().is_none() && !at_eof => {
                    return Ok(Transformed::new(w, r, TransformStatus::ShortSrc));
                }
                Err(e) => {
                    if !put_char(dst, &mut w, REPLACEMENT) {
                        return Ok(Transformed::new(w, r, TransformStatus::ShortDst));
                    }
                    // a truncated sequence at end of input becomes one replacement
                    r += if e.error_len().is_none() { end - r } else { 1 };
                }
            }
        }

        Ok(Transformed::new(w, r, TransformStatus::Complete))
    }

    fn box_clone(&self) -> Box<dyn Codec> {
        Box::new(self.clone())
    }
}

/// ISO 8859-1: every byte maps to the code point of the same value
#[derive(Debug, Clone, Default)]
pub struct Latin1Codec;

impl Codec for Latin1Codec {
    fn transform(&mut self, dst: &mut [u8], src: &[u8], _at_eof: bool) -> Result<Transformed> {
        let mut w = 0;
        for (r, &b) in src.iter().enumerate() {
            if !put_char(dst, &mut w, char::from(b)) {
                return Ok(Transformed::new(w, r, TransformStatus::ShortDst));
            }
        }
        Ok(Transformed::new(w, src.len(), TransformStatus::Complete))
    }

    fn box_clone(&self) -> Box<dyn Codec> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Utf16Codec {
    big_endian: bool,
    expect_bom: bool,
    started: bool,
}

impl Utf16Codec {
    pub fn little_endian() -> Self {
        Self {
            big_endian: false,
            expect_bom: false,
            started: true,
        }
    }

    pub fn big_endian() -> Self {
        Self {
            big_endian: true,
            expect_bom: false,
            started: true,
        }
    }

    /// Byte order taken from a leading BOM, big-endian when there is none
    pub fn with_bom() -> Self {
        Self {
            big_endian: true,
            expect_bom: true,
            started: false,
        }
    }

    fn unit(&self, pair: &[u8]) -> u32 {
        if self.big_endian {
            u32::from(u16::from_be_bytes([pair[0], pair[1]]))
        } else {
            u32::from(u16::from_le_bytes([pair[0], pair[1]]))
        }
    }
}

impl Codec for Utf16Codec {
    fn transform(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool) -> Result<Transformed> {
        let mut r = 0;
        let mut w = 0;

        if !self.started {
            if src.len() < 2 && !at_eof {
                return Ok(Transformed::new(0, 0, TransformStatus::ShortSrc));
            }
            match src {
                [0xFE, 0xFF, ..] => {
                    self.big_endian = true;
                    r = 2;
                }
                [0xFF, 0xFE, ..] => {
                    self.big_endian = false;
                    r = 2;
                }
                _ => {}
            }
            self.started = true;
        }

        while r < src.len() {
            let left = src.len() - r;
            if left < 2 {
                if !at_eof {
                    return Ok(Transformed::new(w, r, TransformStatus::ShortSrc));
                }
                if !put_char(dst, &mut w, REPLACEMENT) {
                    return Ok(Transformed::new(w, r, TransformStatus::ShortDst));
                }
                r = src.len();
                continue;
            }

            let unit = self.unit(&src[r..r + 2]);
            let (c, width) = match unit {
                0xD800..=0xDBFF => {
                    if left < 4 {
                        if !at_eof {
                            return Ok(Transformed::new(w, r, TransformStatus::ShortSrc));
                        }
                        (REPLACEMENT, left)
                    } else {
                        let low = self.unit(&src[r + 2..r + 4]);
                        if (0xDC00..=0xDFFF).contains(&low) {
                            let cp = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                            (char::from_u32(cp).unwrap_or(REPLACEMENT), 4)
                        } else {
                            (REPLACEMENT, 2)
                        }
                    }
                }
                0xDC00..=0xDFFF => (REPLACEMENT, 2),
                _ => (char::from_u32(unit).unwrap_or(REPLACEMENT), 2),
            };

            if !put_char(dst, &mut w, c) {
                return Ok(Transformed::new(w, r, TransformStatus::ShortDst));
            }
            r += width;
        }

        Ok(Transformed::new(w, r, TransformStatus::Complete))
    }

    fn box_clone(&self) -> Box<dyn Codec> {
        Box::new(self.clone())
    }

    fn resumable(&self) -> bool {
        !self.expect_bom
    }
}

/// Named source encodings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Plain,
    Utf8,
    Utf16,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl Encoding {
    pub const ALL: [Encoding; 6] = [
        Encoding::Plain,
        Encoding::Utf8,
        Encoding::Utf16,
        Encoding::Utf16Le,
        Encoding::Utf16Be,
        Encoding::Latin1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Plain => "plain",
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16 => "utf-16",
            Encoding::Utf16Le => "utf-16le",
            Encoding::Utf16Be => "utf-16be",
            Encoding::Latin1 => "latin1",
        }
    }

    pub fn decoder(&self) -> Box<dyn Codec> {
        match self {
            Encoding::Plain => Box::new(PlainCodec),
            Encoding::Utf8 => Box::new(Utf8Codec),
            Encoding::Utf16 => Box::new(Utf16Codec::with_bom()),
            Encoding::Utf16Le => Box::new(Utf16Codec::little_endian()),
            Encoding::Utf16Be => Box::new(Utf16Codec::big_endian()),
            Encoding::Latin1 => Box::new(Latin1Codec),
        }
    }

    /// Encode `text` the way a writer using this encoding would. Characters
    /// latin1 cannot represent become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Plain | Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Encoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Encoding::Utf16 => [0xFE, 0xFF]
                .into_iter()
                .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
                .collect(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "plain" | "nop" => Ok(Encoding::Plain),
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-16" | "utf16" | "utf-16-bom" => Ok(Encoding::Utf16),
            "utf-16le" | "utf16le" => Ok(Encoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Encoding::Utf16Be),
            "latin1" | "iso8859-1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(Error::Config(format!("unknown encoding '{}'", other))),
        }
    }
}
