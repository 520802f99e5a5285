//! Reliability classes and the transition rules between them.
//!
//! A property state carries at most one reliability class: `Assumed`,
//! `Confirmed`, `Deleted`, or `Derived` (a first state with no explicit
//! class is simply untagged). The rules about which transitions are legal
//! are not enforced as a separate check-then-act step; they are emitted as
//! `MINUS` guards inside the same WHERE clause as the data pattern, so the
//! eventual store execution stays atomic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Reliability class of a property state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    /// Value assumed, not yet verified.
    Assumed,
    /// Value confirmed by an attributed user; immutable afterwards.
    Confirmed,
    /// Property deleted; the state carries no value.
    Deleted,
    /// Value produced by a calculation. Machine-only: never a settable
    /// target of an explicit reliability operation.
    Derived,
}

impl Reliability {
    /// Parses a symbolic key into a reliability class that may be used as
    /// the target of an explicit reliability-setting operation.
    ///
    /// # Errors
    ///
    /// `derived` parses as a class but is rejected here with
    /// [`ValidationError::DerivedNotSettable`]; anything unrecognized is
    /// [`ValidationError::UnknownReliabilityKey`].
    pub fn settable(key: &str) -> Result<Self, ValidationError> {
        let class = key.parse::<Self>()?;
        if class == Self::Derived {
            return Err(ValidationError::DerivedNotSettable);
        }
        Ok(class)
    }

    /// The ontology class token spliced into query text.
    #[must_use]
    pub const fn class_token(self) -> &'static str {
        match self {
            Self::Assumed => "opm:Assumed",
            Self::Confirmed => "opm:Confirmed",
            Self::Deleted => "opm:Deleted",
            Self::Derived => "opm:Derived",
        }
    }

    /// Classes that must be absent from the current state for an ordinary
    /// value update to proceed.
    #[must_use]
    pub const fn update_blockers() -> [Self; 3] {
        [Self::Deleted, Self::Confirmed, Self::Derived]
    }

    /// Classes that must be absent from the current state before this class
    /// may be set on a new state.
    ///
    /// Confirming is blocked by `Deleted` and `Confirmed` (and never acts on
    /// `Derived` states: their confirmation is driven by their arguments);
    /// deleting is blocked only by `Confirmed`.
    #[must_use]
    pub fn transition_blockers(self) -> &'static [Self] {
        match self {
            Self::Confirmed => &[Self::Deleted, Self::Confirmed, Self::Derived],
            Self::Deleted => &[Self::Confirmed],
            Self::Assumed => &[Self::Deleted, Self::Confirmed, Self::Derived],
            Self::Derived => &[],
        }
    }

    /// Whether setting this class requires a user attribution URI.
    #[must_use]
    pub const fn requires_attribution(self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Whether a new state of this class carries a value. Deleted states
    /// have no current value.
    #[must_use]
    pub const fn carries_value(self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

impl FromStr for Reliability {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assumed" => Ok(Self::Assumed),
            "confirmed" => Ok(Self::Confirmed),
            "deleted" => Ok(Self::Deleted),
            "derived" => Ok(Self::Derived),
            other => Err(ValidationError::UnknownReliabilityKey {
                key: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::Assumed => "assumed",
            Self::Confirmed => "confirmed",
            Self::Deleted => "deleted",
            Self::Derived => "derived",
        };
        write!(f, "{key}")
    }
}

/// Renders the `MINUS` guard excluding one class from a state variable.
#[must_use]
pub fn minus_class(state_var: &str, class: Reliability) -> String {
    format!("MINUS {{ ?{state_var} a {} . }}", class.class_token())
}

/// Renders the `MINUS` guards excluding each blocker class, one per line.
#[must_use]
pub fn minus_classes(state_var: &str, classes: &[Reliability]) -> String {
    classes
        .iter()
        .map(|c| minus_class(state_var, *c))
        .collect::<Vec<_>>()
        .join("\n")
}
