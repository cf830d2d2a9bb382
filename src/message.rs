use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Result;
use crate::readfile::State;

/// A single log line travelling through the reader chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub ts: DateTime<Utc>,
    pub content: Vec<u8>,
    /// Raw source bytes consumed to produce this message
    pub bytes: usize,
    pub fields: IndexMap<String, Value>,
    /// Reader position after the last line that went into this message
    pub checkpoint: Option<State>,
}

impl Message {
    pub fn new(content: Vec<u8>, bytes: usize) -> Self {
        Self {
            ts: Utc::now(),
            content,
            bytes,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0 || (self.content.is_empty() && self.fields.is_empty())
    }

    /// Merge `fields` into the message, replacing keys that already exist
    pub fn add_fields<I, K>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in fields {
            self.fields.insert(key.into(), value);
        }
    }

    /// Append `flag` to the `flags` array stored under the object at `key`
    pub fn add_flag(&mut self, key: &str, flag: &str) {
        let entry = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        if !entry.is_object() {
            *entry = Value::Object(Default::default());
        }
        let Value::Object(map) = entry else {
            return;
        };

        let flags = map
            .entry("flags")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !flags.is_array() {
            *flags = Value::Array(Vec::new());
        }
        if let Value::Array(list) = flags {
            if !list.iter().any(|f| f.as_str() == Some(flag)) {
                list.push(Value::String(flag.to_string()));
            }
        }
    }

    pub fn has_flag(&self, key: &str, flag: &str) -> bool {
        self.fields
            .get(key)
            .and_then(|v| v.get("flags"))
            .and_then(Value::as_array)
            .is_some_and(|flags| flags.iter().any(|f| f.as_str() == Some(flag)))
    }

    pub fn content_lossy(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Pull-based source of messages; every stage of the chain implements it
pub trait Reader: Send {
    fn next(&mut self) -> Result<Message>;
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn next(&mut self) -> Result<Message> {
        (**self).next()
    }
}
