//! Change events.
//!
//! An [`Event`] tags both sides of invalidation: the dependency edge a
//! generator declares ("rebuild me if this input is updated") and the
//! notification published when an input actually changes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Kind of change a path went through.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Event {
    /// The path came into existence.
    #[strum(serialize = "create", serialize = "created")]
    Create,
    /// The path's content changed.
    #[strum(serialize = "update", serialize = "updated", serialize = "write")]
    Update,
    /// The path was removed.
    #[strum(serialize = "delete", serialize = "deleted", serialize = "remove")]
    Delete,
}

impl Event {
    /// All event kinds, in declaration order.
    pub const ALL: [Event; 3] = [Event::Create, Event::Update, Event::Delete];

    /// Parse from string (case-insensitive).
    ///
    /// Supports aliases: "created", "updated"/"write", "deleted"/"remove".
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Create => "create",
            Event::Update => "update",
            Event::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
