#![no_main]

use std::io::Cursor;

use harvest::encoding::Encoding;
use harvest::readfile::{EncodeReader, LineReader, State};
use harvest::Reader;
use libfuzzer_sys::fuzz_target;

const MAX_BUFFER: usize = 64;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let encoding = Encoding::ALL[data[0] as usize % Encoding::ALL.len()];
    let buffer_size = data[1] as usize % MAX_BUFFER + 1;
    let raw = data[2..].to_vec();

    let line = match LineReader::new(Cursor::new(raw.clone()), encoding.decoder(), b"\n", buffer_size) {
        Ok(line) => line,
        Err(_) => return,
    };
    let mut reader = EncodeReader::new(line);

    let mut total = 0usize;
    let mut states: Vec<State> = Vec::new();
    while let Ok(message) = reader.next() {
        assert!(message.content.ends_with(b"\n"));
        assert!(std::str::from_utf8(&message.content).is_ok() || encoding == Encoding::Plain);
        total += message.bytes;
        if let Some(state) = message.checkpoint {
            states.push(state);
        }
    }
    assert!(total <= raw.len());

    // resuming from any checkpoint must succeed
    if let Some(state) = states.last() {
        let line = LineReader::new(Cursor::new(raw), encoding.decoder(), b"\n", buffer_size)
            .expect("settings accepted before");
        let mut resumed = EncodeReader::new(line);
        resumed.set_state(*state).expect("checkpoint within source");
    }
});
