//! Line reading from raw byte sources.
//!
//! The chain bottom-up: [`DecoderTransform`] turns raw bytes into UTF-8,
//! [`LineScanner`] cuts the decoded stream into lines, [`LineReader`] adds
//! checkpoint resumption and [`EncodeReader`] lifts lines into
//! [`Message`](crate::message::Message)s. The remaining readers decorate
//! messages.

pub mod decoder;
pub mod encode;
pub mod limit;
pub mod line;
pub mod scanner;
pub mod strip_newline;
pub mod timeout;

pub use decoder::DecoderTransform;
pub use encode::EncodeReader;
pub use limit::LimitReader;
pub use line::{LineReader, Phase, State};
pub use scanner::LineScanner;
pub use strip_newline::StripNewline;
pub use timeout::TimeoutReader;
