use std::io::Read;

use super::line::{LineReader, State};
use crate::error::Result;
use crate::message::{Message, Reader};

/// Lifts lines from a [`LineReader`] into [`Message`]s stamped with the
/// checkpoint reached after each line
pub struct EncodeReader<R> {
    reader: LineReader<R>,
}

impl<R: Read> EncodeReader<R> {
    pub fn new(reader: LineReader<R>) -> Self {
        Self { reader }
    }

    pub fn state(&self) -> State {
        self.reader.state()
    }

    pub fn set_state(&mut self, state: State) -> Result<()> {
        self.reader.set_state(state)
    }
}

impl<R: Read + Send> Reader for EncodeReader<R> {
    fn next(&mut self) -> Result<Message> {
        let (line, bytes) = self.reader.next()?;
        let mut message = Message::new(line, bytes);
        message.checkpoint = Some(self.reader.state());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Encoding;
    use std::io::Cursor;

    #[test]
    fn test_messages_carry_raw_bytes_and_checkpoint() {
        let raw = Encoding::Latin1.encode("caf\u{e9}\nbar\n");
        let line = LineReader::new(Cursor::new(raw), Encoding::Latin1.decoder(), b"\n", 4).unwrap();
        let mut reader = EncodeReader::new(line);

        let first = reader.next().unwrap();
        assert_eq!(first.content, "café\n".as_bytes());
        assert_eq!(first.bytes, 5);
        assert!(first.fields.is_empty());
        assert_eq!(first.checkpoint.unwrap().encoded_offset, 5);
        assert_eq!(first.checkpoint.unwrap().converted_stream_offset, 6);

        let second = reader.next().unwrap();
        assert_eq!(second.content, b"bar\n");
        assert_eq!(second.bytes, 4);
        assert_eq!(reader.state().encoded_offset, 9);

        assert!(reader.next().unwrap_err().is_eof());
    }
}
