//! Session phase: the axis orthogonal to play status
//!
//! A session is either live (`Active`), persisted with its engine released
//! (`Suspended`), or restoring a persisted session (`Activating`). While
//! activating, engine events of the reload and its seek are state updates,
//! not user-relevant changes.

use crate::engine::Generation;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Active,
    Suspended,
    /// Waiting for the engine to confirm steady playback of `generation`
    Activating { generation: Generation },
}

impl SessionPhase {
    /// Legal transitions:
    ///
    /// ```text
    /// Active     -> Suspended | Activating   (cold start restore)
    /// Suspended  -> Active | Activating
    /// Activating -> Active | Suspended
    /// ```
    pub fn can_transition_to(&self, next: &SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Active, Suspended)
                | (Active, Activating { .. })
                | (Suspended, Active)
                | (Suspended, Activating { .. })
                | (Activating { .. }, Active)
                | (Activating { .. }, Suspended)
        )
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: SessionPhase) -> Result<()> {
        if !self.can_transition_to(&next) {
            return Err(Error::InvalidState(format!(
                "illegal session transition {:?} -> {:?}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, SessionPhase::Suspended)
    }

    /// True while restoring and `generation` belongs to the restore
    pub fn is_restoring(&self, generation: Generation) -> bool {
        matches!(self, SessionPhase::Activating { generation: g } if *g == generation)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Suspended => write!(f, "suspended"),
            SessionPhase::Activating { .. } => write!(f, "activating"),
        }
    }
}
