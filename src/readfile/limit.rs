use crate::error::Result;
use crate::message::{Message, Reader};

/// Truncates message content to `max_bytes` and flags the message. The raw
/// byte count stays as read so offset accounting is unaffected.
pub struct LimitReader<R> {
    reader: R,
    max_bytes: usize,
}

impl<R> LimitReader<R> {
    pub fn new(reader: R, max_bytes: usize) -> Self {
        Self { reader, max_bytes }
    }
}

impl<R: Reader> Reader for LimitReader<R> {
    fn next(&mut self) -> Result<Message> {
        let mut message = self.reader.next()?;
        if message.content.len() > self.max_bytes {
            message.content.truncate(self.max_bytes);
            message.add_flag("log", "truncated");
        }
        Ok(message)
    }
}
