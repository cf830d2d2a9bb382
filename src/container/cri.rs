use chrono::{DateTime, Utc};

use super::{ContainerLine, LineParser};
use crate::error::{Error, Result};

/// Parses CRI lines: `<timestamp> <stream> [<tags>] <message>`. With tags
/// enabled a third field made only of `P`/`F` tags (`:`-separated) is taken
/// as the tag set, and `P` marks a partial record. Anything else there is
/// the start of the message.
pub struct CriParser {
    pub flags: bool,
}

fn is_tag_set(field: &[u8]) -> bool {
    field
        .split(|&b| b == b':')
        .all(|tag| tag == b"P" || tag == b"F")
}

fn split_once_space(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = bytes.iter().position(|&b| b == b' ')?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}

impl LineParser for CriParser {
    fn parse(&self, line: &[u8]) -> Result<ContainerLine> {
        let fail = |reason: String| Error::Parse {
            reason,
            bytes: line.len(),
        };

        let parts: Vec<&[u8]> = line.splitn(3, |&b| b == b' ').collect();
        if parts.len() < 3 {
            return Err(fail(format!(
                "invalid CRI log format: expected 3 fields, found {}",
                parts.len()
            )));
        }

        let raw_ts = String::from_utf8_lossy(parts[0]);
        let ts = DateTime::parse_from_rfc3339(&raw_ts)
            .map_err(|e| fail(format!("parsing CRI timestamp '{}': {}", raw_ts, e)))?;

        let (partial, mut content) = match split_once_space(parts[2]) {
            Some((tags, message)) if self.flags && is_tag_set(tags) => {
                (tags.split(|&b| b == b':').any(|tag| tag == b"P"), message)
            }
            _ => (false, parts[2]),
        };
        if partial {
            while let [rest @ .., b'\n' | b'\r'] = content {
                content = rest;
            }
        }

        Ok(ContainerLine {
            ts: ts.with_timezone(&Utc),
            stream: String::from_utf8_lossy(parts[1]).into_owned(),
            content: content.to_vec(),
            partial,
        })
    }
}
