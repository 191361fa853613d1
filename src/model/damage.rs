//! Damage kinds, severities and the entries recorded against vehicle parts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A kind of visible damage that can be logged on a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageKind {
    Scratch,
    Dent,
    Crack,
    Bend,
    Detached,
    Missing,
    Destroyed,
    Torn,
    Cut,
    Exposed,
}

impl DamageKind {
    /// Get all damage kinds in display order.
    pub fn all() -> &'static [DamageKind] {
        &[
            DamageKind::Scratch,
            DamageKind::Dent,
            DamageKind::Crack,
            DamageKind::Bend,
            DamageKind::Detached,
            DamageKind::Missing,
            DamageKind::Destroyed,
            DamageKind::Torn,
            DamageKind::Cut,
            DamageKind::Exposed,
        ]
    }

    /// Wire name of this damage kind.
    pub fn name(&self) -> &'static str {
        match self {
            DamageKind::Scratch => "scratch",
            DamageKind::Dent => "dent",
            DamageKind::Crack => "crack",
            DamageKind::Bend => "bend",
            DamageKind::Detached => "detached",
            DamageKind::Missing => "missing",
            DamageKind::Destroyed => "destroyed",
            DamageKind::Torn => "torn",
            DamageKind::Cut => "cut",
            DamageKind::Exposed => "exposed",
        }
    }

    /// The annotator must pick minor/major explicitly for these kinds.
    pub fn requires_manual_severity(&self) -> bool {
        matches!(self, DamageKind::Scratch | DamageKind::Dent)
    }

    /// Severity is always major for these kinds.
    ///
    /// Defined as the complement of [`requires_manual_severity`](Self::requires_manual_severity)
    /// so the two sets can never overlap.
    pub fn is_implicit_major(&self) -> bool {
        !self.requires_manual_severity()
    }

    /// Total-loss kinds: nothing else may be logged on a part carrying one.
    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            DamageKind::Destroyed | DamageKind::Detached | DamageKind::Missing
        )
    }
}

impl fmt::Display for DamageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown damage or severity name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{value}'")]
pub struct ParseNameError {
    /// What was being parsed
    pub what: &'static str,
    /// The rejected input
    pub value: String,
}

impl FromStr for DamageKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        DamageKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| ParseNameError {
                what: "damage kind",
                value: s.to_string(),
            })
    }
}

/// Severity of a logged damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
}

impl Severity {
    /// Wire name of this severity.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minor" => Ok(Severity::Minor),
            "major" => Ok(Severity::Major),
            _ => Err(ParseNameError {
                what: "severity",
                value: s.to_string(),
            }),
        }
    }
}

/// One damage logged against one part.
///
/// Entries are unique within an annotation by `(part, damage, severity)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageEntry {
    /// Part name from the taxonomy
    pub part: String,
    /// Damage kind, allowed for `part`
    pub damage: DamageKind,
    /// Severity; `None` only for entries not produced by the rule engine
    pub severity: Option<Severity>,
}

impl DamageEntry {
    /// Create a new entry.
    pub fn new(part: impl Into<String>, damage: DamageKind, severity: Severity) -> Self {
        Self {
            part: part.into(),
            damage,
            severity: Some(severity),
        }
    }

    /// Check whether this entry is for `part` with `damage` at `severity`.
    pub fn matches(&self, part: &str, damage: DamageKind, severity: Severity) -> bool {
        self.part == part && self.damage == damage && self.severity == Some(severity)
    }
}

impl fmt::Display for DamageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.part.replace('_', " "), self.damage)?;
        if let Some(severity) = self.severity {
            write!(f, " ({})", severity)?;
        }
        Ok(())
    }
}
