use std::fmt;

/// Whether the content filter is currently enforced.
///
/// Recomputed from the external source of truth on every poll, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterState {
    Blocked,
    Allowed,
}

impl FilterState {
    pub fn is_blocked(self) -> bool {
        matches!(self, FilterState::Blocked)
    }

    /// The word shown on the panel for this state.
    pub fn label(self) -> &'static str {
        match self {
            FilterState::Blocked => "BLOCKED",
            FilterState::Allowed => "ALLOWED",
        }
    }
}

impl From<bool> for FilterState {
    fn from(blocked: bool) -> Self {
        if blocked {
            FilterState::Blocked
        } else {
            FilterState::Allowed
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
