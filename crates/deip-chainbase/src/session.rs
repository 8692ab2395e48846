//! Undo sessions (§4.1): a stack of pre-image logs. `commit` drops the
//! top log, `squash` concatenates it into the parent, `undo` replays it
//! in reverse against the [`crate::db::Database`] it was recorded
//! against. Only the topmost session may be committed or undone.

use deip_core::error::{DeipError, UndoError};

use crate::db::Database;

/// One recorded reversal. Table wrappers push one of these for every
/// create/modify/remove so `undo` can restore the exact prior state
/// without the session stack knowing anything about table internals.
pub type UndoAction = Box<dyn FnOnce(&mut Database) + Send>;

#[derive(Default)]
pub struct UndoLog {
    actions: Vec<UndoAction>,
}

impl UndoLog {
    pub fn push(&mut self, action: UndoAction) {
        self.actions.push(action);
    }

    pub(crate) fn replay(mut self, db: &mut Database) {
        while let Some(action) = self.actions.pop() {
            action(db);
        }
    }

    fn append(&mut self, mut other: UndoLog) {
        self.actions.append(&mut other.actions);
    }
}

/// The session stack lives inside [`Database`] itself; this type is the
/// stack discipline, not a handle callers hold across awaits — every
/// mutation goes through `Database::with_session` so the right log
/// always receives the pre-image.
#[derive(Default)]
pub struct SessionStack {
    sessions: Vec<UndoLog>,
}

impl SessionStack {
    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    pub fn start(&mut self) {
        self.sessions.push(UndoLog::default());
    }

    /// Record an undo action against the topmost open session, if any. A
    /// mutation attempted with no open session is itself a programmer
    /// error at the call site (§4.1: "attempt to mutate outside a
    /// session is fatal"); callers check `depth() > 0` first.
    pub fn record(&mut self, action: UndoAction) {
        if let Some(top) = self.sessions.last_mut() {
            top.push(action);
        }
    }

    pub fn commit(&mut self) -> Result<(), DeipError> {
        if self.sessions.pop().is_none() {
            return Err(UndoError::NoSessionOpen.into());
        }
        Ok(())
    }

    /// Drops the bottommost session's pre-image log without disturbing
    /// any session above it — irreversibility finalizes the oldest open
    /// block session while newer ones stay undo-able for a fork switch.
    pub fn commit_oldest(&mut self) -> Result<(), DeipError> {
        if self.sessions.is_empty() {
            return Err(UndoError::NoSessionOpen.into());
        }
        self.sessions.remove(0);
        Ok(())
    }

    pub fn squash(&mut self) -> Result<(), DeipError> {
        let top = self.sessions.pop().ok_or(UndoError::NoSessionOpen)?;
        match self.sessions.last_mut() {
            Some(parent) => {
                parent.append(top);
                Ok(())
            }
            None => Err(UndoError::PastCommitPoint.into()),
        }
    }

    /// Pops the topmost log; the caller (`Database::undo`) replays it
    /// against itself once this returns, after the stack has already
    /// been mutated so nested undo-during-undo cannot happen.
    pub fn pop_for_undo(&mut self) -> Result<UndoLog, DeipError> {
        self.sessions.pop().ok_or_else(|| UndoError::NoSessionOpen.into())
    }
}
