// Core data structures for the endor targeting service

use serde::{Deserialize, Serialize};

/// Grid position of a scan, measured from the cannon origin
///
/// The distance from origin is computed once at construction and never
/// recomputed, so a `Coordinate` is immutable after it is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "CoordinateRepr", into = "CoordinateRepr")]
pub struct Coordinate {
    x: u32,
    y: u32,
    distance: f64,
}

/// Wire shape of a coordinate (`{"x": .., "y": ..}`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CoordinateRepr {
    x: u32,
    y: u32,
}

impl From<CoordinateRepr> for Coordinate {
    fn from(repr: CoordinateRepr) -> Self {
        Self::new(repr.x, repr.y)
    }
}

impl From<Coordinate> for CoordinateRepr {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl Coordinate {
    /// Create a coordinate and cache its distance from origin
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            distance: f64::from(x).hypot(f64::from(y)),
        }
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Euclidean distance from origin
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Euclidean distance to another coordinate
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        dx.hypot(dy)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Kind of enemy detected by a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyType {
    Soldier,
    Mech,
}

impl EnemyType {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soldier => "soldier",
            Self::Mech => "mech",
        }
    }

    /// Parse a wire name, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "soldier" => Some(Self::Soldier),
            "mech" => Some(Self::Mech),
            _ => None,
        }
    }

    /// Get all enemy types
    pub fn all() -> Vec<Self> {
        vec![Self::Soldier, Self::Mech]
    }
}

impl std::fmt::Display for EnemyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enemy composition at a scanned position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    #[serde(rename = "type")]
    pub kind: EnemyType,
    pub number: u32,
}

impl Enemy {
    pub fn new(kind: EnemyType, number: u32) -> Self {
        Self { kind, number }
    }

    pub fn is_mech(&self) -> bool {
        self.kind == EnemyType::Mech
    }
}

/// One sensor reading: where, what, and how many allies are nearby
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub coordinates: Coordinate,
    pub enemies: Enemy,
    pub allies: u32,
}

impl Scan {
    pub fn new(coordinates: Coordinate, enemies: Enemy, allies: u32) -> Self {
        Self {
            coordinates,
            enemies,
            allies,
        }
    }

    /// Distance of this scan from origin
    pub fn distance(&self) -> f64 {
        self.coordinates.distance()
    }
}

/// A decoded attack request: protocol tags already resolved, scans in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Radar {
    pub protocols: Vec<crate::protocol::ProtocolType>,
    pub scan: Vec<Scan>,
}

impl Radar {
    pub fn new(protocols: Vec<crate::protocol::ProtocolType>, scan: Vec<Scan>) -> Self {
        Self { protocols, scan }
    }
}

/// Outcome of a successful attack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackReport {
    pub target: Coordinate,
    pub casualties: u32,
    pub generation: u32,
}
