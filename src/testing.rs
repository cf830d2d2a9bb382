//! Helpers shared by unit tests

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::message::{Message, Reader};

/// Reader replaying canned lines, then [`Error::Eof`]. Gaps added with
/// [`then_eof`](Self::then_eof) report `Eof` once in the middle of the stream.
pub struct VecReader {
    lines: VecDeque<Option<Vec<u8>>>,
}

impl VecReader {
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        Self {
            lines: VecDeque::new(),
        }
        .then_lines(lines)
    }

    pub fn then_lines<'a, I>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        self.lines
            .extend(lines.into_iter().map(|line| Some(line.to_vec())));
        self
    }

    pub fn then_eof(mut self) -> Self {
        self.lines.push_back(None);
        self
    }
}

impl Reader for VecReader {
    fn next(&mut self) -> Result<Message> {
        let line = self.lines.pop_front().flatten().ok_or(Error::Eof)?;
        let bytes = line.len();
        Ok(Message::new(line, bytes))
    }
}
