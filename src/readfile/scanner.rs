use std::io::Read;

use tracing::{trace, warn};

use super::decoder::DecoderTransform;
use crate::error::Result;

/// Splits the decoded stream into separator-terminated lines
pub struct LineScanner<R> {
    decoder: DecoderTransform<R>,
    separator: Vec<u8>,
    max_bytes: usize,
    buf: Vec<u8>,
    chunk: Vec<u8>,
    search_from: usize,
    skipping: bool,
    skipped_raw: usize,
    skipped_len: u64,
    segment_offset: u64,
    stream_offset: u64,
}

impl<R: Read> LineScanner<R> {
    pub fn new(decoder: DecoderTransform<R>, separator: &[u8], buffer_size: usize) -> Self {
        debug_assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            decoder,
            separator: separator.to_vec(),
            max_bytes: 0,
            buf: Vec::new(),
            chunk: vec![0; buffer_size.max(1)],
            search_from: 0,
            skipping: false,
            skipped_raw: 0,
            skipped_len: 0,
            segment_offset: 0,
            stream_offset: 0,
        }
    }

    /// Lines longer than `max_bytes` (separator excluded) are dropped. Zero
    /// disables the limit.
    pub fn set_max_bytes(&mut self, max_bytes: usize) {
        self.max_bytes = max_bytes;
    }

    /// Next complete line, separator included, with the raw bytes it took.
    /// Bytes of a trailing incomplete line stay buffered across errors.
    pub fn scan(&mut self) -> Result<(Vec<u8>, usize)> {
        loop {
            if let Some(pos) = find(&self.buf[self.search_from..], &self.separator) {
                let end = self.search_from + pos + self.separator.len();
                let raw = self.decoder.attribute(end)? + std::mem::take(&mut self.skipped_raw);
                let line: Vec<u8> = self.buf.drain(..end).collect();
                self.search_from = 0;
                let skipped_len = std::mem::take(&mut self.skipped_len);
                self.advance(end as u64 + skipped_len);

                let too_long =
                    self.max_bytes > 0 && line.len() - self.separator.len() > self.max_bytes;
                if self.skipping || too_long {
                    warn!(
                        max_bytes = self.max_bytes,
                        raw_bytes = raw,
                        "line exceeds the size limit, skipped"
                    );
                    self.skipping = false;
                    self.skipped_raw = raw;
                    continue;
                }

                trace!(
                    len = line.len(),
                    raw_bytes = raw,
                    stream_offset = self.stream_offset,
                    "scanned line"
                );
                return Ok((line, raw));
            }

            self.search_from = self.buf.len().saturating_sub(self.separator.len() - 1);
            if self.max_bytes > 0 && self.buf.len() > self.max_bytes + self.separator.len() {
                self.drop_buffered()?;
            }

            let n = self.decoder.read(&mut self.chunk)?;
            self.buf.extend_from_slice(&self.chunk[..n]);
        }
    }

    /// Discard the buffered head of an over-long line, keeping enough of the
    /// tail to still recognize a separator split across reads. A character
    /// cut by the last read stays buffered.
    fn drop_buffered(&mut self) -> Result<()> {
        let keep = self.separator.len() - 1;
        let (raw, cut) = self.decoder.attribute_prefix(self.buf.len() - keep)?;
        if cut == 0 {
            return Ok(());
        }

        self.skipped_raw += raw;
        self.skipped_len += cut as u64;
        self.buf.drain(..cut);
        self.search_from = 0;
        self.skipping = true;
        Ok(())
    }

    /// Drop exactly `n` decoded bytes from the head of the stream. `n` must
    /// end on a character boundary.
    pub fn discard(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        while remaining > 0 {
            let take = remaining.min(self.buf.len() as u64) as usize;
            if take > 0 {
                let (_, claimed) = self.decoder.attribute_prefix(take)?;
                if claimed > 0 {
                    self.buf.drain(..claimed);
                    remaining -= claimed as u64;
                    continue;
                }
            }

            let n = self.decoder.read(&mut self.chunk)?;
            self.buf.extend_from_slice(&self.chunk[..n]);
        }
        self.search_from = 0;
        Ok(())
    }

    fn advance(&mut self, len: u64) {
        self.segment_offset += len;
        self.stream_offset += len;
    }

    pub fn set_offsets(&mut self, segment_offset: u64, stream_offset: u64) {
        self.segment_offset = segment_offset;
        self.stream_offset = stream_offset;
    }

    pub fn segment_offset(&self) -> u64 {
        self.segment_offset
    }

    pub fn stream_offset(&self) -> u64 {
        self.stream_offset
    }

    pub fn decoder(&self) -> &DecoderTransform<R> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut DecoderTransform<R> {
        &mut self.decoder
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() == 1 {
        return haystack.iter().position(|&b| b == needle[0]);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
