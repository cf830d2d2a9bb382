use std::io::{self, Read};

use crate::encoding::{Codec, TransformStatus};
use crate::error::{Error, Result};

/// Smallest scratch area handed to a codec; one UTF-8 character always fits
const MIN_SCRATCH: usize = 16;

/// Raw bytes the codec consumed that no delivered line has claimed yet,
/// together with the codec state at the start of those bytes. Replaying
/// them up to a line boundary yields the exact raw length of the line.
struct Ledger {
    codec: Box<dyn Codec>,
    raw: Vec<u8>,
    offset: u64,
}

/// Converts a raw byte source into UTF-8 through a [`Codec`]
pub struct DecoderTransform<R> {
    source: R,
    codec: Box<dyn Codec>,
    chunk: Vec<u8>,
    scratch: Vec<u8>,
    pending: Vec<u8>,
    decoded: Vec<u8>,
    decoded_pos: usize,
    offset: u64,
    ledger: Ledger,
}

impl<R: Read> DecoderTransform<R> {
    pub fn new(source: R, codec: Box<dyn Codec>, buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(Error::Config("buffer size must be positive".to_string()));
        }

        Ok(Self {
            source,
            ledger: Ledger {
                codec: codec.box_clone(),
                raw: Vec::new(),
                offset: 0,
            },
            codec,
            chunk: vec![0; buffer_size],
            scratch: vec![0; (buffer_size * 4).max(MIN_SCRATCH)],
            pending: Vec::new(),
            decoded: Vec::new(),
            decoded_pos: 0,
            offset: 0,
        })
    }

    /// Fill `dst` with decoded bytes. Returns [`Error::Eof`] when the source
    /// is exhausted and nothing is buffered; undecodable leftovers are kept
    /// for when the source grows.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }
        if self.decoded_pos == self.decoded.len() {
            self.fill()?;
        }

        let available = &self.decoded[self.decoded_pos..];
        let n = available.len().min(dst.len());
        dst[..n].copy_from_slice(&available[..n]);
        self.decoded_pos += n;
        if self.decoded_pos == self.decoded.len() {
            self.decoded.clear();
            self.decoded_pos = 0;
        }
        Ok(n)
    }

    fn fill(&mut self) -> Result<()> {
        self.decoded.clear();
        self.decoded_pos = 0;

        loop {
            let n = read_retrying(&mut self.source, &mut self.chunk)?;
            if n == 0 {
                return Err(Error::Eof);
            }
            self.pending.extend_from_slice(&self.chunk[..n]);
            self.decode_pending()?;
            if !self.decoded.is_empty() {
                return Ok(());
            }
        }
    }

    /// Decode as much of `pending` as possible. Output and codec state are
    /// committed only when every transform call succeeds.
    fn decode_pending(&mut self) -> Result<()> {
        let mut codec = self.codec.box_clone();
        let mut out = Vec::new();
        let mut consumed = 0;

        loop {
            let t = codec.transform(&mut self.scratch, &self.pending[consumed..], false)?;
            out.extend_from_slice(&self.scratch[..t.written]);
            consumed += t.consumed;

            match t.status {
                TransformStatus::ShortDst if t.written == 0 && t.consumed == 0 => {
                    return Err(Error::Decode("codec made no progress".to_string()));
                }
                TransformStatus::ShortDst => continue,
                TransformStatus::ShortSrc | TransformStatus::Complete => break,
            }
        }

        self.codec = codec;
        self.decoded.extend_from_slice(&out);
        self.offset += consumed as u64;
        self.ledger.raw.extend_from_slice(&self.pending[..consumed]);
        self.pending.drain(..consumed);
        Ok(())
    }

    /// Read and drop exactly `n` raw bytes. Only valid before decoding starts.
    pub fn discard(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        while remaining > 0 {
            let want = remaining.min(self.chunk.len() as u64) as usize;
            let got = read_retrying(&mut self.source, &mut self.chunk[..want])?;
            if got == 0 {
                return Err(Error::Eof);
            }
            remaining -= got as u64;
            self.offset += got as u64;
            self.ledger.offset += got as u64;
        }
        Ok(())
    }

    /// Claim the raw bytes behind the next `decoded_len` decoded bytes.
    /// `decoded_len` must end on a character boundary of the decoded stream.
    pub fn attribute(&mut self, decoded_len: usize) -> Result<usize> {
        let (raw, _) = self.attribute_prefix(decoded_len)?;
        Ok(raw)
    }

    /// Like [`attribute`](Self::attribute), but stops at the last whole
    /// character within `decoded_len`. Returns the raw and decoded lengths
    /// actually claimed.
    pub fn attribute_prefix(&mut self, decoded_len: usize) -> Result<(usize, usize)> {
        let ledger = &mut self.ledger;
        let mut scratch = vec![0; decoded_len];
        let mut written = 0;
        let mut consumed = 0;

        while written < decoded_len {
            let t = ledger
                .codec
                .transform(&mut scratch[written..], &ledger.raw[consumed..], false)?;
            written += t.written;
            consumed += t.consumed;
            if t.written == 0 && t.consumed == 0 {
                break;
            }
        }

        ledger.raw.drain(..consumed);
        ledger.offset += consumed as u64;
        Ok((consumed, written))
    }

    /// Raw bytes consumed by the codec so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Raw offset of the end of the last attributed decoded byte
    pub fn attributed_offset(&self) -> u64 {
        self.ledger.offset
    }

    pub fn resumable(&self) -> bool {
        self.codec.resumable()
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }
}

fn read_retrying<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match source.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other.map_err(Error::from),
        }
    }
}
