use std::time::Duration;

use clap::ValueEnum;

use crate::encoding::Encoding;
use crate::error::{Error, Result};

pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Settings for one harvested source
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    pub encoding: Encoding,
    pub buffer_size: usize,
    /// Content limit applied after container parsing; lines are read with a
    /// four times larger limit
    pub max_bytes: usize,
    pub line_terminator: String,
    pub container: Option<ContainerConfig>,
    pub timeout: Option<Duration>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Plain,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_bytes: DEFAULT_MAX_BYTES,
            line_terminator: "\n".to_string(),
            container: None,
            timeout: None,
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer_size must be greater than 0".to_string()));
        }
        if self.max_bytes == 0 {
            return Err(Error::Config("max_bytes must be greater than 0".to_string()));
        }
        if self.line_terminator.is_empty() {
            return Err(Error::Config("line_terminator must not be empty".to_string()));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(Error::Config("timeout must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Line limit handed to the line reader, leaving room for container
    /// framing around the payload
    pub fn line_max_bytes(&self) -> usize {
        self.max_bytes.saturating_mul(4)
    }
}

/// Container log parsing options
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerConfig {
    pub stream: StreamSelector,
    /// Join partial records into one message
    pub partial: bool,
    pub format: ContainerFormat,
    /// Recognize a `P`/`F` tag field after the CRI stream name
    pub cri_flags: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            stream: StreamSelector::All,
            partial: true,
            format: ContainerFormat::Auto,
            cri_flags: true,
        }
    }
}

/// Which container output stream to keep
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamSelector {
    #[default]
    All,
    Stdout,
    Stderr,
}

impl StreamSelector {
    pub fn matches(self, stream: &str) -> bool {
        match self {
            StreamSelector::All => true,
            StreamSelector::Stdout => stream == "stdout",
            StreamSelector::Stderr => stream == "stderr",
        }
    }
}

/// Container log line format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContainerFormat {
    /// Docker JSON when the line starts with `{`, CRI otherwise
    #[default]
    Auto,
    Docker,
    Cri,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.encoding, Encoding::Plain);
        assert_eq!(config.buffer_size, 16384);
        assert_eq!(config.max_bytes, 10485760);
        assert_eq!(config.line_max_bytes(), 41943040);
        assert!(config.validate().is_ok());

        let container = ContainerConfig::default();
        assert_eq!(container.stream, StreamSelector::All);
        assert!(container.partial);
        assert!(container.cri_flags);
    }

    #[test]
    fn test_validate() {
        let invalid = [
            HarvestConfig { buffer_size: 0, ..Default::default() },
            HarvestConfig { max_bytes: 0, ..Default::default() },
            HarvestConfig { line_terminator: String::new(), ..Default::default() },
            HarvestConfig { timeout: Some(Duration::ZERO), ..Default::default() },
        ];
        for config in invalid {
            assert!(matches!(config.validate(), Err(Error::Config(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_stream_selector() {
        assert!(StreamSelector::All.matches("anything"));
        assert!(StreamSelector::Stdout.matches("stdout"));
        assert!(!StreamSelector::Stdout.matches("stderr"));
        assert!(StreamSelector::Stderr.matches("stderr"));
    }
}
