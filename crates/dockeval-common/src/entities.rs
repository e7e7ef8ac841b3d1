/// Core geometry and result types shared by the reader, box calculator,
/// scorer and the evaluation pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Deviation written in place of real values when a structure could not be scored.
pub const FAILURE_SENTINEL: u32 = 999;

// ---------------------------------------------------------------------------
// Point cloud
// ---------------------------------------------------------------------------

/// Cartesian coordinate in Å.
pub type Point3 = [f64; 3];

/// Ordered atom coordinates in source-file order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud(Vec<Point3>);

impl PointCloud {
    pub fn new(points: Vec<Point3>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point3] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3> {
        self.0.iter()
    }
}

impl From<Vec<Point3>> for PointCloud {
    fn from(points: Vec<Point3>) -> Self {
        Self(points)
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point3;
    type IntoIter = std::slice::Iter<'a, Point3>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Structure file format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
    Pdb,
    Pdbqt,
    Sdf,
}

impl StructureFormat {
    /// Infer the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdb" => Some(Self::Pdb),
            "pdbqt" => Some(Self::Pdbqt),
            "sdf" | "mol" => Some(Self::Sdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdb => "pdb",
            Self::Pdbqt => "pdbqt",
            Self::Sdf => "sdf",
        }
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdb => "PDB",
            Self::Pdbqt => "PDBQT",
            Self::Sdf => "SDF",
        })
    }
}

// ---------------------------------------------------------------------------
// Bounding box / search region
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box. Starts inverted (+inf / -inf) so that a box
/// nothing was folded into is detectable with [`BoundingBox::is_empty`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn include(&mut self, p: &Point3) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn center(&self) -> Point3 {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn extent(&self) -> Point3 {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Explicit docking search region: a center and per-axis edge lengths (Å).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRegion {
    pub center: Point3,
    pub size: Point3,
}

// ---------------------------------------------------------------------------
// Per-structure evaluation result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The docking engine did not leave its output file behind.
    MissingOutput(PathBuf),
    /// The comparator ran but reported no poses.
    NoPoses,
    /// The predicted pose could not be turned into a search box.
    InvalidPose(String),
    /// The comparator could not be run or its output was unreadable.
    Comparator(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOutput(path) => write!(f, "docking output missing: {}", path.display()),
            Self::NoPoses => f.write_str("comparator reported no poses"),
            Self::InvalidPose(msg) => write!(f, "invalid predicted pose: {msg}"),
            Self::Comparator(msg) => write!(f, "comparator failed: {msg}"),
        }
    }
}

/// Outcome of evaluating one structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PoseEvaluation {
    Scored {
        /// Deviation of the first-ranked pose.
        top1: f64,
        /// Lowest deviation among the first N ranked poses.
        best_of_n: f64,
        /// Number of poses considered for `best_of_n`.
        poses: usize,
    },
    Failed(FailureReason),
}

impl PoseEvaluation {
    /// Reduce ranked deviations (file order) to top-1 / best-of-`n`.
    pub fn from_ranked(deviations: &[f64], n: usize) -> Self {
        let kept = &deviations[..deviations.len().min(n)];
        match kept.first() {
            None => Self::Failed(FailureReason::NoPoses),
            Some(&top1) => Self::Scored {
                top1,
                best_of_n: kept.iter().copied().fold(f64::INFINITY, f64::min),
                poses: kept.len(),
            },
        }
    }
}
