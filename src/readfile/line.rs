use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decoder::DecoderTransform;
use super::scanner::LineScanner;
use crate::encoding::Codec;
use crate::error::{Error, Result};

/// Checkpoint of a [`LineReader`].
///
/// `encoded_offset` is a raw source offset at which decoding can restart,
/// `converted_segment_offset` the decoded distance from there to the next
/// undelivered line and `converted_stream_offset` the decoded bytes
/// delivered since tracking began.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub encoded_offset: u64,
    pub converted_segment_offset: u64,
    pub converted_stream_offset: u64,
}

impl State {
    pub fn validate(&self) -> Result<()> {
        if self.converted_stream_offset < self.converted_segment_offset {
            return Err(Error::InvalidState {
                stream: self.converted_stream_offset,
                segment: self.converted_segment_offset,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ReplayingToOffset,
    Accumulating,
}

/// Reads separator-terminated lines from a raw source in any supported
/// encoding and can resume from a [`State`]
pub struct LineReader<R> {
    scanner: LineScanner<R>,
    phase: Phase,
    segment_base: u64,
}

impl<R: Read> LineReader<R> {
    pub fn new(
        source: R,
        codec: Box<dyn Codec>,
        separator: &[u8],
        buffer_size: usize,
    ) -> Result<Self> {
        if separator.is_empty() {
            return Err(Error::Config("line separator must not be empty".to_string()));
        }
        if std::str::from_utf8(separator).is_err() {
            return Err(Error::Config("line separator must be valid UTF-8".to_string()));
        }

        let decoder = DecoderTransform::new(source, codec, buffer_size)?;
        Ok(Self {
            scanner: LineScanner::new(decoder, separator, buffer_size),
            phase: Phase::Idle,
            segment_base: 0,
        })
    }

    /// Skip lines whose decoded length exceeds `max_bytes`
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.scanner.set_max_bytes(max_bytes);
        self
    }

    /// Position the reader at a checkpoint by reading and discarding up to
    /// it. Must be called before the first [`next`](Self::next).
    pub fn set_state(&mut self, state: State) -> Result<()> {
        state.validate()?;
        if self.phase != Phase::Idle {
            return Err(Error::ReaderStarted);
        }

        debug!(?state, "resuming line reader from checkpoint");
        self.phase = Phase::ReplayingToOffset;

        let replayed = self
            .scanner
            .decoder_mut()
            .discard(state.encoded_offset)
            .and_then(|_| self.scanner.discard(state.converted_segment_offset));
        match replayed {
            Ok(()) => {}
            Err(Error::Eof) => return Err(Error::CheckpointBeyondSource),
            Err(e) => return Err(e),
        }

        self.scanner.set_offsets(
            state.converted_segment_offset,
            state.converted_stream_offset,
        );
        self.segment_base = state.encoded_offset;
        self.phase = Phase::Accumulating;
        Ok(())
    }

    /// Next line, separator included, and the raw bytes consumed for it
    pub fn next(&mut self) -> Result<(Vec<u8>, usize)> {
        match self.phase {
            Phase::ReplayingToOffset => return Err(Error::CheckpointBeyondSource),
            Phase::Idle => self.phase = Phase::Accumulating,
            Phase::Accumulating => {}
        }
        self.scanner.scan()
    }

    /// Checkpoint covering every line returned so far
    pub fn state(&self) -> State {
        let stream = self.scanner.stream_offset();
        let decoder = self.scanner.decoder();
        if decoder.resumable() {
            State {
                encoded_offset: decoder.attributed_offset(),
                converted_segment_offset: 0,
                converted_stream_offset: stream,
            }
        } else {
            State {
                encoded_offset: self.segment_base,
                converted_segment_offset: self.scanner.segment_offset(),
                converted_stream_offset: stream,
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn get_ref(&self) -> &R {
        self.scanner.decoder().get_ref()
    }
}
