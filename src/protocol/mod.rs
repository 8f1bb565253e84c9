//! Targeting protocols and the stage pipeline
//!
//! A request names an ordered list of protocol tags. Each tag resolves to one
//! [`Stage`] from a closed set, and the stages are chained behind a mandatory
//! range limit into a [`Pipeline`]:
//!
//! ```text
//! scans ──▶ RangeLimit(100) ──▶ stage 1 ──▶ stage 2 ──▶ ... ──▶ first survivor = target
//! ```
//!
//! Filters are not commutative, so the caller's tag order is preserved.
//! Every stage is pure: it borrows the scans, returns a new sequence, and an
//! empty input short-circuits to an empty output.
//!
//! # Example
//!
//! ```
//! use endor::models::{Coordinate, Enemy, EnemyType, Scan};
//! use endor::protocol::{Pipeline, ProtocolType};
//!
//! let scans = vec![
//!     Scan::new(Coordinate::new(30, 40), Enemy::new(EnemyType::Soldier, 10), 0),
//!     Scan::new(Coordinate::new(3, 4), Enemy::new(EnemyType::Mech, 1), 0),
//! ];
//!
//! let pipeline = Pipeline::from_protocols(&[ProtocolType::ClosestEnemies]);
//! let target = pipeline.select_target(&scans).unwrap();
//! assert_eq!(target.coordinates, Coordinate::new(3, 4));
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::Scan;

/// Maximum engagement distance applied ahead of every caller-selected stage
pub const DEFAULT_MAX_DISTANCE: f64 = 100.0;

// ============================================================================
// Protocol Tags
// ============================================================================

/// Protocol tags accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolType {
    ClosestEnemies,
    FurthestEnemies,
    AssistAllies,
    AvoidCrossfire,
    PrioritizeMech,
    AvoidMech,
}

impl ProtocolType {
    /// Get the wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClosestEnemies => "closest-enemies",
            Self::FurthestEnemies => "furthest-enemies",
            Self::AssistAllies => "assist-allies",
            Self::AvoidCrossfire => "avoid-crossfire",
            Self::PrioritizeMech => "prioritize-mech",
            Self::AvoidMech => "avoid-mech",
        }
    }

    /// Parse a wire tag, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "closest-enemies" => Some(Self::ClosestEnemies),
            "furthest-enemies" => Some(Self::FurthestEnemies),
            "assist-allies" => Some(Self::AssistAllies),
            "avoid-crossfire" => Some(Self::AvoidCrossfire),
            "prioritize-mech" => Some(Self::PrioritizeMech),
            "avoid-mech" => Some(Self::AvoidMech),
            _ => None,
        }
    }

    /// Get all protocol tags
    pub fn all() -> Vec<Self> {
        vec![
            Self::ClosestEnemies,
            Self::FurthestEnemies,
            Self::AssistAllies,
            Self::AvoidCrossfire,
            Self::PrioritizeMech,
            Self::AvoidMech,
        ]
    }

    /// The stage this tag selects
    pub fn stage(&self) -> Stage {
        match self {
            Self::ClosestEnemies => Stage::ClosestFirst,
            Self::FurthestEnemies => Stage::FurthestFirst,
            Self::AssistAllies => Stage::RequireAllies,
            Self::AvoidCrossfire => Stage::AvoidAllies,
            Self::PrioritizeMech => Stage::PreferMech,
            Self::AvoidMech => Stage::AvoidMech,
        }
    }
}

impl FromStr for ProtocolType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidProtocolTag(s.to_string()))
    }
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Stages
// ============================================================================

/// A single filtering or ordering rule over candidate scans
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Keep scans with distance <= `max_distance`
    RangeLimit { max_distance: f64 },
    /// Stable sort, nearest first
    ClosestFirst,
    /// Stable sort, furthest first
    FurthestFirst,
    /// Keep scans with at least one ally present
    RequireAllies,
    /// Keep scans with no allies present
    AvoidAllies,
    /// Keep mech scans, or every non-mech scan when there are none
    PreferMech,
    /// Drop mech scans
    AvoidMech,
}

impl Stage {
    /// Apply this stage, returning a new sequence
    pub fn apply<'a>(&self, scans: &[&'a Scan]) -> Vec<&'a Scan> {
        if scans.is_empty() {
            return Vec::new();
        }

        match *self {
            Self::RangeLimit { max_distance } => range_limit(scans, max_distance),
            Self::ClosestFirst => closest_first(scans),
            Self::FurthestFirst => furthest_first(scans),
            Self::RequireAllies => keep(scans, |s| s.allies > 0),
            Self::AvoidAllies => keep(scans, |s| s.allies == 0),
            Self::PreferMech => prefer_mech(scans),
            Self::AvoidMech => keep(scans, |s| !s.enemies.is_mech()),
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RangeLimit { .. } => "range-limit",
            Self::ClosestFirst => "closest-first",
            Self::FurthestFirst => "furthest-first",
            Self::RequireAllies => "require-allies",
            Self::AvoidAllies => "avoid-allies",
            Self::PreferMech => "prefer-mech",
            Self::AvoidMech => "avoid-mech",
        }
    }
}

impl From<ProtocolType> for Stage {
    fn from(protocol: ProtocolType) -> Self {
        protocol.stage()
    }
}

fn keep<'a>(scans: &[&'a Scan], predicate: impl Fn(&Scan) -> bool) -> Vec<&'a Scan> {
    scans.iter().copied().filter(|s| predicate(s)).collect()
}

fn range_limit<'a>(scans: &[&'a Scan], max_distance: f64) -> Vec<&'a Scan> {
    keep(scans, |s| s.distance() <= max_distance)
}

// `sort_by` is stable, so equal distances keep their input order.
fn closest_first<'a>(scans: &[&'a Scan]) -> Vec<&'a Scan> {
    let mut sorted = scans.to_vec();
    sorted.sort_by(|a, b| a.distance().total_cmp(&b.distance()));
    sorted
}

fn furthest_first<'a>(scans: &[&'a Scan]) -> Vec<&'a Scan> {
    let mut sorted = scans.to_vec();
    sorted.sort_by(|a, b| b.distance().total_cmp(&a.distance()));
    sorted
}

fn prefer_mech<'a>(scans: &[&'a Scan]) -> Vec<&'a Scan> {
    let mechs = keep(scans, |s| s.enemies.is_mech());
    if mechs.is_empty() {
        keep(scans, |s| !s.enemies.is_mech())
    } else {
        mechs
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Ordered composition of stages, always headed by a range limit
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build a pipeline with the default range limit
    pub fn from_protocols(protocols: &[ProtocolType]) -> Self {
        Self::with_max_distance(DEFAULT_MAX_DISTANCE, protocols)
    }

    /// Build a pipeline with a process-wide range limit
    pub fn with_max_distance(max_distance: f64, protocols: &[ProtocolType]) -> Self {
        let mut stages = Vec::with_capacity(protocols.len() + 1);
        stages.push(Stage::RangeLimit { max_distance });
        stages.extend(protocols.iter().map(ProtocolType::stage));
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order, borrowing the scans
    pub fn run<'a>(&self, scans: &'a [Scan]) -> Vec<&'a Scan> {
        let mut candidates: Vec<&'a Scan> = scans.iter().collect();

        for stage in &self.stages {
            if candidates.is_empty() {
                break;
            }
            candidates = stage.apply(&candidates);
            tracing::trace!(stage = stage.name(), remaining = candidates.len(), "Stage applied");
        }

        candidates
    }

    /// Run the pipeline and pick the first survivor
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTargetSet`] when no scan survives.
    pub fn select_target<'a>(&self, scans: &'a [Scan]) -> Result<&'a Scan> {
        self.run(scans).first().copied().ok_or(Error::EmptyTargetSet)
    }
}

// ============================================================================
// Tests
// ============================================================================
