use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ContainerLine, LineParser};
use crate::error::{Error, Result};

/// One record of Docker's `json-file` logging driver
#[derive(Deserialize)]
struct DockerRecord {
    #[serde(default)]
    log: String,
    #[serde(default)]
    stream: String,
    #[serde(default)]
    time: String,
}

/// Parses `{"log":...,"stream":...,"time":...}` lines. A record whose `log`
/// does not end in a newline is partial.
pub struct DockerJsonParser;

impl LineParser for DockerJsonParser {
    fn parse(&self, line: &[u8]) -> Result<ContainerLine> {
        let record: DockerRecord = serde_json::from_slice(line).map_err(|e| Error::Parse {
            reason: format!("decoding docker JSON: {}", e),
            bytes: line.len(),
        })?;

        let ts = DateTime::parse_from_rfc3339(&record.time).map_err(|e| Error::Parse {
            reason: format!("parsing docker timestamp '{}': {}", record.time, e),
            bytes: line.len(),
        })?;

        let content = record.log.into_bytes();
        Ok(ContainerLine {
            ts: ts.with_timezone(&Utc),
            stream: record.stream,
            partial: !content.ends_with(b"\n"),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_docker_record() {
        let line = br#"{"log":"hello\n","stream":"stdout","time":"2017-11-09T13:27:36.277747246Z"}"#;
        let parsed = DockerJsonParser.parse(line).unwrap();
        assert_eq!(parsed.content, b"hello\n");
        assert_eq!(parsed.stream, "stdout");
        assert!(!parsed.partial);
        assert_eq!(
            parsed.ts,
            "2017-11-09T13:27:36.277747246Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_partial_record() {
        let line = br#"{"log":"hel","stream":"stderr","time":"2017-11-09T13:27:36Z"}"#;
        let parsed = DockerJsonParser.parse(line).unwrap();
        assert!(parsed.partial);
        assert_eq!(parsed.stream, "stderr");
    }

    #[test]
    fn test_trailing_newline_accepted() {
        let line = b"{\"log\":\"x\\n\",\"stream\":\"stdout\",\"time\":\"2017-11-09T13:27:36Z\"}\n";
        assert!(DockerJsonParser.parse(line).is_ok());
    }

    #[test]
    fn test_errors_report_line_length() {
        let missing_time = br#"{"log":"x\n","stream":"stdout"}"#;
        match DockerJsonParser.parse(missing_time) {
            Err(Error::Parse { bytes, .. }) => assert_eq!(bytes, missing_time.len()),
            other => panic!("expected parse error, got {:?}", other.map(|l| l.content)),
        }
        assert!(DockerJsonParser.parse(b"{not json").is_err());
    }
}
