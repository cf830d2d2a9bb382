use std::io::Read;

use tracing::debug;

use crate::config::HarvestConfig;
use crate::container::ContainerLogReader;
use crate::error::Result;
use crate::message::Reader;
use crate::readfile::{EncodeReader, LimitReader, LineReader, State, StripNewline, TimeoutReader};

/// Assembles the reader chain for one source from a [`HarvestConfig`]:
/// line reading, optional container unwrapping, newline stripping, content
/// limit and an optional timeout.
#[derive(Debug, Clone)]
pub struct ReaderBuilder {
    config: HarvestConfig,
    checkpoint: Option<State>,
}

impl ReaderBuilder {
    pub fn new(config: HarvestConfig) -> Self {
        Self {
            config,
            checkpoint: None,
        }
    }

    /// Resume from a checkpoint previously taken from this source
    pub fn with_checkpoint(mut self, state: State) -> Self {
        self.checkpoint = Some(state);
        self
    }

    pub fn build<R>(self, source: R) -> Result<Box<dyn Reader>>
    where
        R: Read + Send + 'static,
    {
        let config = self.config;
        config.validate()?;

        let line = LineReader::new(
            source,
            config.encoding.decoder(),
            config.line_terminator.as_bytes(),
            config.buffer_size,
        )?
        .with_max_bytes(config.line_max_bytes());

        let mut encoded = EncodeReader::new(line);
        if let Some(state) = self.checkpoint {
            encoded.set_state(state)?;
        }

        let mut reader: Box<dyn Reader> = Box::new(encoded);
        if let Some(container) = &config.container {
            reader = Box::new(ContainerLogReader::new(reader, container));
        }
        reader = Box::new(LimitReader::new(StripNewline::new(reader), config.max_bytes));
        if let Some(timeout) = config.timeout {
            reader = Box::new(TimeoutReader::new(reader, timeout));
        }

        debug!(
            encoding = %config.encoding,
            container = config.container.is_some(),
            timeout = ?config.timeout,
            "reader chain ready"
        );
        Ok(reader)
    }
}

/// Build the reader chain for `source` starting from its beginning
pub fn build_reader<R>(source: R, config: &HarvestConfig) -> Result<Box<dyn Reader>>
where
    R: Read + Send + 'static,
{
    ReaderBuilder::new(config.clone()).build(source)
}
