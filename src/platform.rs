use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::Result;
#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    SignalInt = 130,  // 128 + SIGINT (2)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

static SHOULD_TERMINATE: AtomicBool = AtomicBool::new(false);

/// Turns SIGINT/SIGTERM into a shutdown request. A second SIGINT exits
/// immediately.
pub struct SignalHandler {
    _handle: Option<thread::JoinHandle<()>>,
}

impl SignalHandler {
    #[cfg(unix)]
    pub fn new() -> Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = thread::spawn(move || {
            let mut interrupts = 0;
            for sig in signals.forever() {
                SHOULD_TERMINATE.store(true, Ordering::Relaxed);
                match sig {
                    SIGINT => {
                        interrupts += 1;
                        if interrupts > 1 {
                            warn!("second interrupt, exiting without saving state");
                            ExitCode::SignalInt.exit();
                        }
                    }
                    SIGTERM => warn!("terminated, stopping"),
                    _ => {}
                }
            }
        });
        Ok(Self {
            _handle: Some(handle),
        })
    }

    #[cfg(not(unix))]
    pub fn new() -> Result<Self> {
        Ok(Self { _handle: None })
    }

    pub fn should_terminate() -> bool {
        SHOULD_TERMINATE.load(Ordering::Relaxed)
    }
}
