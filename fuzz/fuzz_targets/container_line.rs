#![no_main]

use harvest::config::ContainerFormat;
use harvest::container::parse_line;
use harvest::Error;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let format = match data[0] % 3 {
        0 => ContainerFormat::Auto,
        1 => ContainerFormat::Docker,
        _ => ContainerFormat::Cri,
    };
    let cri_flags = data[0] & 0x80 != 0;
    let line = &data[1..];

    match parse_line(line, format, cri_flags) {
        Ok(parsed) => {
            if parsed.partial && format != ContainerFormat::Docker {
                assert!(!parsed.content.ends_with(b"\n"));
            }
        }
        Err(Error::Parse { bytes, .. }) => assert_eq!(bytes, line.len()),
        Err(e) => panic!("unexpected error kind: {}", e),
    }
});
