use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver};
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::{Message, Reader};

enum Worker<R> {
    NotStarted(R),
    Running {
        rx: Receiver<Result<Message>>,
        handle: JoinHandle<R>,
    },
    Lost,
}

/// Bounds how long [`next`](Reader::next) may block.
///
/// The wrapped reader runs on a background thread that hands results over a
/// single-slot channel. When the timer fires first the timeout signal is
/// returned while the pending read keeps going; its result is delivered by a
/// later call. The thread ends after forwarding an error and is restarted on
/// the following call.
pub struct TimeoutReader<R> {
    worker: Worker<R>,
    timeout: Duration,
    signal: fn() -> Error,
}

impl<R: Reader + 'static> TimeoutReader<R> {
    pub fn new(reader: R, timeout: Duration) -> Self {
        Self {
            worker: Worker::NotStarted(reader),
            timeout,
            signal: || Error::Timeout,
        }
    }

    /// Return the error built by `signal` instead of [`Error::Timeout`]
    pub fn with_signal(mut self, signal: fn() -> Error) -> Self {
        self.signal = signal;
        self
    }

    fn start(&mut self) {
        let mut reader = match std::mem::replace(&mut self.worker, Worker::Lost) {
            Worker::NotStarted(reader) => reader,
            other => {
                self.worker = other;
                return;
            }
        };

        debug!(timeout = ?self.timeout, "starting timeout reader worker");
        let (tx, rx) = bounded(1);
        let handle = thread::spawn(move || {
            loop {
                let result = reader.next();
                let failed = result.is_err();
                if tx.send(result).is_err() || failed {
                    break;
                }
            }
            reader
        });
        self.worker = Worker::Running { rx, handle };
    }

    /// Take the reader back from a worker that has stopped
    fn reclaim(&mut self) {
        if let Worker::Running { handle, .. } = std::mem::replace(&mut self.worker, Worker::Lost) {
            if let Ok(reader) = handle.join() {
                self.worker = Worker::NotStarted(reader);
            }
        }
    }
}

impl<R: Reader + 'static> Reader for TimeoutReader<R> {
    fn next(&mut self) -> Result<Message> {
        if matches!(self.worker, Worker::NotStarted(_)) {
            self.start();
        }
        let rx = match &self.worker {
            Worker::Running { rx, .. } => rx.clone(),
            _ => return Err(Error::WorkerLost),
        };

        let timer = crossbeam_channel::after(self.timeout);
        select! {
            recv(rx) -> msg => match msg {
                Ok(Ok(message)) => Ok(message),
                Ok(Err(e)) => {
                    self.reclaim();
                    Err(e)
                }
                Err(_) => {
                    self.reclaim();
                    Err(Error::WorkerLost)
                }
            },
            recv(timer) -> _ => Err((self.signal)()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;
    use std::time::Instant;

    /// Reader fed by the test through a channel, blocking until fed
    struct FedReader {
        rx: Receiver<Result<Message>>,
    }

    impl Reader for FedReader {
        fn next(&mut self) -> Result<Message> {
            self.rx.recv().unwrap_or(Err(Error::Eof))
        }
    }

    fn fed(timeout: Duration) -> (Sender<Result<Message>>, TimeoutReader<FedReader>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, TimeoutReader::new(FedReader { rx }, timeout))
    }

    fn line(content: &str) -> Result<Message> {
        Ok(Message::new(content.as_bytes().to_vec(), content.len()))
    }

    #[test]
    fn test_passes_messages_through() {
        let (tx, mut reader) = fed(Duration::from_secs(5));
        tx.send(line("a")).unwrap();
        tx.send(line("b")).unwrap();
        assert_eq!(reader.next().unwrap().content, b"a");
        assert_eq!(reader.next().unwrap().content, b"b");
    }

    #[test]
    fn test_timeout_then_delayed_delivery() {
        let (tx, mut reader) = fed(Duration::from_millis(50));

        let started = Instant::now();
        assert!(reader.next().unwrap_err().is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(reader.next().unwrap_err().is_timeout());

        tx.send(line("late")).unwrap();
        tx.send(line("later")).unwrap();
        assert_eq!(reader.next().unwrap().content, b"late");
        assert_eq!(reader.next().unwrap().content, b"later");
        assert!(reader.next().unwrap_err().is_timeout());
    }

    #[test]
    fn test_worker_restarts_after_error() {
        let (tx, mut reader) = fed(Duration::from_secs(5));
        tx.send(line("a")).unwrap();
        tx.send(Err(Error::Eof)).unwrap();
        tx.send(line("b")).unwrap();

        assert_eq!(reader.next().unwrap().content, b"a");
        assert!(reader.next().unwrap_err().is_eof());
        assert!(matches!(reader.worker, Worker::NotStarted(_)));
        assert_eq!(reader.next().unwrap().content, b"b");
    }

    #[test]
    fn test_custom_signal() {
        let (_tx, reader) = fed(Duration::from_millis(10));
        let mut reader = reader.with_signal(|| Error::Eof);
        assert!(reader.next().unwrap_err().is_eof());
    }
}
