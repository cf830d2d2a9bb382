//! Checkpoint store contract.
//!
//! The reader chain only hands out [`State`]s; keeping them across runs is
//! the job of whoever consumes the messages.

use crate::error::Result;
use crate::readfile::State;

pub trait CheckpointStore {
    /// Last saved checkpoint, `None` when nothing was saved yet
    fn load(&self) -> Result<Option<State>>;

    fn save(&mut self, state: &State) -> Result<()>;
}
