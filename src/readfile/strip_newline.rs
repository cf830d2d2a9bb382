use crate::error::Result;
use crate::message::{Message, Reader};

/// Removes one trailing `\n` or `\r\n` from every message
pub struct StripNewline<R> {
    reader: R,
}

impl<R> StripNewline<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Reader> Reader for StripNewline<R> {
    fn next(&mut self) -> Result<Message> {
        let mut message = self.reader.next()?;
        let len = message.content.len() - line_end_len(&message.content);
        message.content.truncate(len);
        Ok(message)
    }
}

fn line_end_len(content: &[u8]) -> usize {
    if content.ends_with(b"\r\n") {
        2
    } else if content.ends_with(b"\n") {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::VecReader;

    fn strip(input: &[u8]) -> Vec<u8> {
        let mut reader = StripNewline::new(VecReader::from_lines([input]));
        reader.next().unwrap().content
    }

    #[test]
    fn test_strips_one_terminator() {
        assert_eq!(strip(b"abc\n"), b"abc");
        assert_eq!(strip(b"abc\r\n"), b"abc");
        assert_eq!(strip(b"abc\n\n"), b"abc\n");
        assert_eq!(strip(b"abc\r"), b"abc\r");
        assert_eq!(strip(b"abc"), b"abc");
        assert_eq!(strip(b""), b"");
    }

    #[test]
    fn test_bytes_are_untouched() {
        let mut reader = StripNewline::new(VecReader::from_lines([&b"abc\r\n"[..]]));
        assert_eq!(reader.next().unwrap().bytes, 5);
    }

    #[test]
    fn test_errors_pass_through() {
        let mut reader = StripNewline::new(VecReader::from_lines(Vec::<&[u8]>::new()));
        assert!(reader.next().unwrap_err().is_eof());
    }
}
