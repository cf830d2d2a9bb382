use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use harvest::config::{ContainerConfig, ContainerFormat, HarvestConfig, StreamSelector};
use harvest::encoding::Encoding;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One content line per message
    #[default]
    Raw,
    /// One JSON object per message with timestamp, byte count and fields
    Jsonl,
}

#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(about = "Read log lines from files in any supported encoding, with resumable checkpoints")]
#[command(
    long_about = "Read log lines from files in any supported encoding, with resumable checkpoints\n\nEXAMPLES:\n  harvest app.log\n  harvest -e utf-16le --state-file app.state -f app.log\n  harvest --container --stream stderr -o jsonl /var/log/containers/web.log"
)]
#[command(version)]
pub struct Cli {
    /// Input file (stdin if not specified, or use "-")
    pub file: Option<PathBuf>,

    /// Source encoding: plain, utf-8, utf-16, utf-16le, utf-16be, latin1
    #[arg(short = 'e', long, default_value = "plain", help_heading = "Input Options")]
    pub encoding: Encoding,

    /// Read buffer size in bytes
    #[arg(long, default_value_t = harvest::config::DEFAULT_BUFFER_SIZE, help_heading = "Input Options")]
    pub buffer_size: usize,

    /// Maximum message size in bytes; longer messages are truncated
    #[arg(long, default_value_t = harvest::config::DEFAULT_MAX_BYTES, help_heading = "Input Options")]
    pub max_bytes: usize,

    /// Line terminator; `\n`, `\r` and `\t` escapes are understood
    #[arg(long, default_value = "\n", value_parser = parse_terminator, help_heading = "Input Options")]
    pub line_terminator: String,

    /// Parse Docker JSON or CRI container log lines
    #[arg(long, help_heading = "Container Options")]
    pub container: bool,

    /// Keep only this container stream
    #[arg(long, value_enum, default_value = "all", requires = "container", help_heading = "Container Options")]
    pub stream: StreamSelector,

    /// Do not join partial container records
    #[arg(long, requires = "container", help_heading = "Container Options")]
    pub no_partial: bool,

    /// Parse every line as CRI, even lines starting with '{'
    #[arg(long, requires = "container", help_heading = "Container Options")]
    pub force_cri: bool,

    /// CRI lines carry no P/F tag field
    #[arg(long, requires = "container", help_heading = "Container Options")]
    pub no_cri_flags: bool,

    /// Give up waiting for a line after this long (e.g. 500ms, 2s)
    #[arg(long, value_parser = humantime::parse_duration, help_heading = "Reading Options")]
    pub timeout: Option<Duration>,

    /// Keep reading when the end of the input is reached
    #[arg(short = 'f', long, help_heading = "Reading Options")]
    pub follow: bool,

    /// Pause between polls at end of input in follow mode
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s", help_heading = "Reading Options")]
    pub backoff: Duration,

    /// Resume from and persist the checkpoint in this file
    #[arg(long, requires = "file", help_heading = "Reading Options")]
    pub state_file: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "raw", help_heading = "Output Options")]
    pub output: OutputFormat,
}

fn parse_terminator(value: &str) -> Result<String, String> {
    let unescaped = value
        .replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t");
    if unescaped.is_empty() {
        return Err("line terminator must not be empty".to_string());
    }
    Ok(unescaped)
}

impl Cli {
    pub fn to_config(&self) -> HarvestConfig {
        let container = self.container.then(|| ContainerConfig {
            stream: self.stream,
            partial: !self.no_partial,
            format: if self.force_cri {
                ContainerFormat::Cri
            } else {
                ContainerFormat::Auto
            },
            cri_flags: !self.no_cri_flags,
        });

        HarvestConfig {
            encoding: self.encoding,
            buffer_size: self.buffer_size,
            max_bytes: self.max_bytes,
            line_terminator: self.line_terminator.clone(),
            container,
            timeout: self.timeout,
        }
    }

    pub fn reads_stdin(&self) -> bool {
        self.file.as_ref().map_or(true, |path| path.as_os_str() == "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_map_to_default_config() {
        let cli = Cli::try_parse_from(["harvest", "app.log"]).unwrap();
        assert_eq!(cli.to_config(), HarvestConfig::default());
        assert!(!cli.reads_stdin());
        assert_eq!(cli.backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_container_flags() {
        let cli = Cli::try_parse_from([
            "harvest",
            "--container",
            "--stream",
            "stderr",
            "--force-cri",
            "--no-partial",
            "-e",
            "utf-16le",
            "--timeout",
            "250ms",
            "-",
        ])
        .unwrap();
        let config = cli.to_config();
        let container = config.container.unwrap();
        assert_eq!(container.stream, StreamSelector::Stderr);
        assert_eq!(container.format, ContainerFormat::Cri);
        assert!(!container.partial);
        assert!(container.cri_flags);
        assert_eq!(config.encoding, Encoding::Utf16Le);
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert!(cli.reads_stdin());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["harvest", "-e", "ebcdic"]).is_err());
        assert!(Cli::try_parse_from(["harvest", "--stream", "stdout"]).is_err());
        assert!(Cli::try_parse_from(["harvest", "--state-file", "s.json"]).is_err());
        assert!(Cli::try_parse_from(["harvest", "--line-terminator", ""]).is_err());
    }

    #[test]
    fn test_line_terminator_escapes() {
        let cli = Cli::try_parse_from(["harvest", "--line-terminator", "\\r\\n"]).unwrap();
        assert_eq!(cli.line_terminator, "\r\n");
    }
}
