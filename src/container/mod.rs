//! Container runtime log formats: Docker `json-file` records and CRI lines.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{trace, warn};

use crate::config::{ContainerConfig, ContainerFormat, StreamSelector};
use crate::error::{Error, Result};
use crate::message::{Message, Reader};

pub mod cri;
pub mod docker;

pub use cri::CriParser;
pub use docker::DockerJsonParser;

/// A decoded container log record
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerLine {
    pub ts: DateTime<Utc>,
    pub stream: String,
    pub content: Vec<u8>,
    /// The record continues in the next one
    pub partial: bool,
}

pub trait LineParser {
    fn parse(&self, line: &[u8]) -> Result<ContainerLine>;
}

/// Parse one raw container log line in the given format
pub fn parse_line(line: &[u8], format: ContainerFormat, cri_flags: bool) -> Result<ContainerLine> {
    let cri = CriParser { flags: cri_flags };
    match format {
        ContainerFormat::Docker => DockerJsonParser.parse(line),
        ContainerFormat::Cri => cri.parse(line),
        ContainerFormat::Auto if line.first() == Some(&b'{') => DockerJsonParser.parse(line),
        ContainerFormat::Auto => cri.parse(line),
    }
}

/// Unwraps container log records into their payload, joining partial
/// records and dropping records from unselected streams.
///
/// `bytes` of a returned message covers every upstream record consumed for
/// it, filtered ones included. A parse error carries the same total in
/// [`Error::Parse`] and does not affect the following calls. Any other
/// upstream error leaves a join in progress and the uncounted bytes in place,
/// so the next call picks up where this one stopped.
pub struct ContainerLogReader<R> {
    reader: R,
    stream: StreamSelector,
    partial: bool,
    format: ContainerFormat,
    cri_flags: bool,
    consumed: usize,
    joining: Option<Joined>,
}

/// A message being assembled from partial records
struct Joined {
    message: Message,
    stream: String,
    partial: bool,
}

impl<R: Reader> ContainerLogReader<R> {
    pub fn new(reader: R, config: &ContainerConfig) -> Self {
        Self {
            reader,
            stream: config.stream,
            partial: config.partial,
            format: config.format,
            cri_flags: config.cri_flags,
            consumed: 0,
            joining: None,
        }
    }

    /// Next upstream record, parsed. A parse error hands out and resets the
    /// consumed byte count.
    fn read_record(&mut self) -> Result<(Message, ContainerLine)> {
        let message = self.reader.next()?;
        self.consumed += message.bytes;

        match parse_line(&message.content, self.format, self.cri_flags) {
            Ok(record) => Ok((message, record)),
            Err(Error::Parse { reason, .. }) => {
                let bytes = std::mem::take(&mut self.consumed);
                warn!(reason = %reason, bytes, "invalid container log line");
                Err(Error::Parse { reason, bytes })
            }
            Err(e) => Err(e),
        }
    }
}

impl<R: Reader> Reader for ContainerLogReader<R> {
    fn next(&mut self) -> Result<Message> {
        loop {
            let mut joined = match self.joining.take() {
                Some(joined) => joined,
                None => {
                    let (mut message, record) = self.read_record()?;
                    message.ts = record.ts;
                    message.content = record.content;
                    message.add_fields([("stream", Value::String(record.stream.clone()))]);
                    Joined {
                        message,
                        stream: record.stream,
                        partial: record.partial,
                    }
                }
            };

            while self.partial && joined.partial {
                let (next, record) = match self.read_record() {
                    Ok(read) => read,
                    Err(e @ Error::Parse { .. }) => return Err(e),
                    Err(e) => {
                        self.joining = Some(joined);
                        return Err(e);
                    }
                };

                joined.message.content.extend_from_slice(&record.content);
                if next.checkpoint.is_some() {
                    joined.message.checkpoint = next.checkpoint;
                }
                joined.partial = record.partial;
            }

            let Joined {
                mut message,
                stream,
                ..
            } = joined;
            if !self.stream.matches(&stream) {
                trace!(stream = %stream, "container record filtered by stream");
                continue;
            }

            message.bytes = std::mem::take(&mut self.consumed);
            return Ok(message);
        }
    }
}
