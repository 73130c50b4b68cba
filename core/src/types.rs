//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A simulation timestep. One timestep = one year of agent time.
pub type Tick = u64;

/// The canonical run identifier.
pub type RunId = String;

/// Timestep index used for the pre-run baseline analytics snapshot.
pub const BASELINE_TIMESTEP: i64 = -1;

pub const BEHAVIOUR_COUNT: usize = 4;
pub const LEVEL_COUNT: usize = 3;
pub const AGE_BAND_COUNT: usize = 12;

/// Build a fresh run identifier. The seed is kept visible so log lines
/// and result files can be matched back to a reproducible run.
pub fn new_run_id(seed: u64) -> RunId {
    format!("run-{seed}-{}", uuid::Uuid::new_v4().simple())
}

/// Stable registry key for an agent. Never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{:06}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    pub fn index(self) -> usize {
        match self {
            Self::Male => 0,
            Self::Female => 1,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }
}

/// Ordinal risk level of a behaviour. 0 is the lowest risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Level {
    pub const ALL: [Level; LEVEL_COUNT] = [Level::Low, Level::Medium, Level::High];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Level::from_index(value as usize)
            .ok_or_else(|| format!("behaviour level must be 0, 1 or 2, got {value}"))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level as u8
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Behaviour {
    Smoking,
    Alcohol,
    Diet,
    Inactivity,
}

impl Behaviour {
    /// Canonical processing order. NEVER reorder: RNG draws follow it.
    pub const ALL: [Behaviour; BEHAVIOUR_COUNT] = [
        Behaviour::Smoking,
        Behaviour::Alcohol,
        Behaviour::Diet,
        Behaviour::Inactivity,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Smoking => "Smoking",
            Self::Alcohol => "Alcohol",
            Self::Diet => "Diet",
            Self::Inactivity => "Inactivity",
        }
    }
}

impl fmt::Display for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Edge type in the social graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Spouse,
    Household,
    Workplace,
    Friendship,
}

impl RelationKind {
    /// Canonical aggregation order.
    pub const ALL: [RelationKind; 4] = [
        RelationKind::Spouse,
        RelationKind::Household,
        RelationKind::Workplace,
        RelationKind::Friendship,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Spouse => "Spouse",
            Self::Household => "Household",
            Self::Workplace => "Workplace",
            Self::Friendship => "Friendship",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of twelve five-year age bands, 25–29 through 80–84.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgeBand(u8);

impl AgeBand {
    pub const MIN_AGE: u32 = 25;
    pub const MAX_AGE: u32 = 84;

    /// The band containing `age`, or None outside [25, 84].
    pub fn from_age(age: u32) -> Option<Self> {
        if (Self::MIN_AGE..=Self::MAX_AGE).contains(&age) {
            Some(Self(((age - Self::MIN_AGE) / 5) as u8))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = AgeBand> {
        (0..AGE_BAND_COUNT as u8).map(AgeBand)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn lower(self) -> u32 {
        Self::MIN_AGE + 5 * self.0 as u32
    }

    pub fn upper(self) -> u32 {
        self.lower() + 4
    }

    pub fn label(self) -> String {
        format!("{}-{}", self.lower(), self.upper())
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower(), self.upper())
    }
}
