use std::fs::File;
use std::io::{self, Chain, Cursor, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression of a byte source, recognised by its magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else if head.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

type Prefixed<R> = Chain<Cursor<Vec<u8>>, R>;

/// Byte source that transparently decompresses gzip and zstd input.
/// Offsets taken from a reader chain on top of it count decompressed bytes.
pub enum SourceReader<R: Read> {
    Gzip(MultiGzDecoder<Prefixed<R>>),
    Zstd(zstd::Decoder<'static, io::BufReader<Prefixed<R>>>),
    Plain(Prefixed<R>),
}

impl<R: Read> SourceReader<R> {
    pub fn new(mut reader: R) -> io::Result<Self> {
        let mut head = Vec::with_capacity(ZSTD_MAGIC.len());
        (&mut reader)
            .take(ZSTD_MAGIC.len() as u64)
            .read_to_end(&mut head)?;
        let compression = Compression::detect(&head);
        let chained = Cursor::new(head).chain(reader);

        Ok(match compression {
            Compression::Gzip => SourceReader::Gzip(MultiGzDecoder::new(chained)),
            Compression::Zstd => SourceReader::Zstd(zstd::Decoder::new(chained)?),
            Compression::None => SourceReader::Plain(chained),
        })
    }

    pub fn compression(&self) -> Compression {
        match self {
            SourceReader::Gzip(_) => Compression::Gzip,
            SourceReader::Zstd(_) => Compression::Zstd,
            SourceReader::Plain(_) => Compression::None,
        }
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceReader::Gzip(reader) => reader.read(buf),
            SourceReader::Zstd(reader) => reader.read(buf),
            SourceReader::Plain(reader) => reader.read(buf),
        }
    }
}

// zstd::Decoder has no Debug impl
impl<R: Read> std::fmt::Debug for SourceReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceReader::{:?}", self.compression())
    }
}

/// Open a log file, decompressing it when it is gzip or zstd
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<SourceReader<File>> {
    let path = path.as_ref();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        if extension.eq_ignore_ascii_case("zip") {
            return Err(Error::Config(format!(
                "ZIP archives are not supported, extract {} first",
                path.display()
            )));
        }
    }

    let reader = SourceReader::new(File::open(path)?)?;
    debug!(path = %path.display(), compression = ?reader.compression(), "opened source");
    Ok(reader)
}
