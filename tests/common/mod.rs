// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use harvest::encoding::Encoding;
use harvest::readfile::{EncodeReader, LineReader};
use harvest::{Error, Message, Reader};
use tempfile::NamedTempFile;

/// Run the harvest binary with `input` on stdin
pub fn run_harvest_with_input(args: &[&str], input: &[u8]) -> (String, String, i32) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_harvest"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start harvest");

    if let Some(mut stdin) = cmd.stdin.take() {
        stdin.write_all(input).expect("Failed to write to stdin");
    }

    let output = cmd.wait_with_output().expect("Failed to read output");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Run the harvest binary with `args` followed by the path of a temporary
/// file holding `content`
pub fn run_harvest_with_file(args: &[&str], content: &[u8]) -> (String, String, i32) {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(content)
        .expect("Failed to write to temp file");

    let mut full_args = args.to_vec();
    full_args.push(temp_file.path().to_str().unwrap());
    run_harvest(&full_args)
}

pub fn run_harvest(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_harvest"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute harvest");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Drain a reader until end of stream, failing on any other error
pub fn read_all<R: Reader + ?Sized>(reader: &mut R) -> Vec<Message> {
    let mut messages = Vec::new();
    loop {
        match reader.next() {
            Ok(message) => messages.push(message),
            Err(Error::Eof) => return messages,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

/// Message reader over in-memory raw bytes
pub fn encode_reader(raw: &[u8], encoding: Encoding, buffer_size: usize) -> EncodeReader<Cursor<Vec<u8>>> {
    let line = LineReader::new(Cursor::new(raw.to_vec()), encoding.decoder(), b"\n", buffer_size)
        .expect("valid line reader settings");
    EncodeReader::new(line)
}

/// Raw length of `text` written on its own in `encoding`, without a BOM
pub fn raw_len(encoding: Encoding, text: &str) -> usize {
    match encoding {
        Encoding::Utf16 => Encoding::Utf16Be.encode(text).len(),
        other => other.encode(text).len(),
    }
}
