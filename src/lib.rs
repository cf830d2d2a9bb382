//! Line-oriented log harvesting.
//!
//! Raw bytes in any supported encoding are decoded, split into lines and
//! passed through a chain of [`Reader`] decorators. Every message carries the
//! raw byte count it consumed and the [`State`] needed to resume after it.

pub mod checkpoint;
pub mod config;
pub mod container;
pub mod decompression;
pub mod encoding;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod readfile;

#[cfg(test)]
mod testing;

pub use config::HarvestConfig;
pub use error::{Error, Result};
pub use message::{Message, Reader};
pub use pipeline::{build_reader, ReaderBuilder};
pub use readfile::State;
