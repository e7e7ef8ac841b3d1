//! Coordinate extraction from PDB, PDBQT and SDF structure files.
//!
//! Each format is described by a [`ColumnLayout`] row: which lines carry atom
//! records, where the x/y/z columns sit, and how hydrogens are recognised.
//! Supporting a new variant of a format means adding a row, not new parsing code.

use dockeval_common::error::{DockEvalError, Result};
use dockeval_common::{Point3, PointCloud, StructureFormat};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

/// How a format marks the lines that hold atom coordinates.
#[derive(Debug)]
pub enum RecordSelection {
    /// Line-tagged records (PDB, PDBQT). Records are grouped by tag in the
    /// order the tags are listed here.
    Tagged {
        tags: &'static [&'static str],
        /// Lines at or below this length are ignored.
        min_len: usize,
        /// Reading stops at the first line starting with this marker.
        stop_marker: Option<&'static str>,
    },
    /// Connection-table block (SDF / MOL V2000) sized by a counts line.
    CountsBlock {
        counts_line: usize,
        counts: Range<usize>,
        first_atom_line: usize,
        /// Annotation token some writers emit; only used to classify the file.
        variant_marker: &'static str,
    },
}

#[derive(Debug)]
pub struct ColumnLayout {
    pub format: StructureFormat,
    pub records: RecordSelection,
    pub x: Range<usize>,
    pub y: Range<usize>,
    pub z: Range<usize>,
    pub element: Range<usize>,
    /// Exact content of `element` for a hydrogen atom.
    pub hydrogen: &'static str,
    pub skip_hydrogens: bool,
}

pub static PDB_LAYOUT: ColumnLayout = ColumnLayout {
    format: StructureFormat::Pdb,
    records: RecordSelection::Tagged {
        tags: &["ATOM", "HETATM"],
        min_len: 0,
        stop_marker: None,
    },
    x: 30..38,
    y: 38..46,
    z: 46..54,
    element: 76..78,
    hydrogen: " H",
    skip_hydrogens: false,
};

pub static PDBQT_LAYOUT: ColumnLayout = ColumnLayout {
    format: StructureFormat::Pdbqt,
    records: RecordSelection::Tagged {
        tags: &["ATOM"],
        min_len: 60,
        stop_marker: Some("MODEL 2"),
    },
    x: 30..38,
    y: 38..46,
    z: 46..54,
    element: 13..14,
    hydrogen: "H",
    skip_hydrogens: true,
};

pub static SDF_LAYOUT: ColumnLayout = ColumnLayout {
    format: StructureFormat::Sdf,
    records: RecordSelection::CountsBlock {
        counts_line: 3,
        counts: 0..3,
        first_atom_line: 4,
        variant_marker: "atomInfo",
    },
    x: 0..10,
    y: 10..20,
    z: 20..30,
    element: 31..34,
    hydrogen: "H  ",
    skip_hydrogens: true,
};

impl ColumnLayout {
    pub fn for_format(format: StructureFormat) -> &'static ColumnLayout {
        match format {
            StructureFormat::Pdb => &PDB_LAYOUT,
            StructureFormat::Pdbqt => &PDBQT_LAYOUT,
            StructureFormat::Sdf => &SDF_LAYOUT,
        }
    }

    fn is_hydrogen(&self, line: &str) -> bool {
        column(line, &self.element) == self.hydrogen
    }

    fn coordinates(&self, line: &str) -> std::result::Result<Point3, String> {
        let mut point = [0.0; 3];
        for (slot, (axis, range)) in point
            .iter_mut()
            .zip([("x", &self.x), ("y", &self.y), ("z", &self.z)])
        {
            let field = column(line, range).trim();
            *slot = field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("{axis} field {field:?} is not a number"))?;
        }
        Ok(point)
    }
}

/// Slice a fixed-width column, clamped to the line length. Returns "" when the
/// column starts past the end of the line or splits a multi-byte character.
fn column<'a>(line: &'a str, range: &Range<usize>) -> &'a str {
    let end = range.end.min(line.len());
    line.get(range.start.min(end)..end).unwrap_or("")
}

/// Coordinates read from one structure file.
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularCoordinates {
    pub cloud: PointCloud,
    /// Atom count declared by the file header, hydrogens included (SDF only).
    pub declared_atoms: Option<usize>,
}

/// Reads a [`PointCloud`] from a structure file using the layout for its format.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateReader {
    layout: &'static ColumnLayout,
    skip_hydrogens: bool,
}

impl CoordinateReader {
    pub fn new(format: StructureFormat) -> Self {
        let layout = ColumnLayout::for_format(format);
        Self {
            layout,
            skip_hydrogens: layout.skip_hydrogens,
        }
    }

    /// Build a reader for `path`, inferring the format from its extension.
    pub fn for_path(path: &Path) -> Result<Self> {
        StructureFormat::from_path(path).map(Self::new).ok_or_else(|| {
            DockEvalError::Config(format!(
                "cannot infer structure format of {}",
                path.display()
            ))
        })
    }

    /// Override the per-format default for hydrogen exclusion.
    pub fn skip_hydrogens(mut self, skip: bool) -> Self {
        self.skip_hydrogens = skip;
        self
    }

    /// Read the whole file into memory and extract its coordinates.
    pub fn read(&self, path: &Path) -> Result<MolecularCoordinates> {
        let text = std::fs::read_to_string(path).map_err(|e| DockEvalError::io(path, e))?;
        debug!("Reading {} coordinates from {:?}", self.layout.format, path);
        self.parse(&text, path)
    }

    /// Extract coordinates from file contents. `source` is only used in diagnostics.
    pub fn parse(&self, text: &str, source: &Path) -> Result<MolecularCoordinates> {
        match &self.layout.records {
            RecordSelection::Tagged {
                tags,
                min_len,
                stop_marker,
            } => Ok(MolecularCoordinates {
                cloud: self.parse_tagged(text, source, tags, *min_len, *stop_marker),
                declared_atoms: None,
            }),
            RecordSelection::CountsBlock {
                counts_line,
                counts,
                first_atom_line,
                variant_marker,
            } => self.parse_counts_block(
                text,
                source,
                *counts_line,
                counts,
                *first_atom_line,
                variant_marker,
            ),
        }
    }

    fn parse_tagged(
        &self,
        text: &str,
        source: &Path,
        tags: &[&str],
        min_len: usize,
        stop_marker: Option<&str>,
    ) -> PointCloud {
        let mut groups: Vec<Vec<Point3>> = vec![Vec::new(); tags.len()];

        for (idx, line) in text.lines().enumerate() {
            if let Some(marker) = stop_marker {
                if line.starts_with(marker) {
                    stop_at_model_boundary(source, idx, marker);
                    break;
                }
            }
            if line.len() <= min_len {
                continue;
            }
            let Some(group) = tags.iter().position(|tag| line.starts_with(tag)) else {
                continue;
            };
            if self.skip_hydrogens && self.layout.is_hydrogen(line) {
                continue;
            }
            match self.layout.coordinates(line) {
                Ok(point) => groups[group].push(point),
                Err(e) => warn_skipped(source, idx, &e),
            }
        }

        PointCloud::new(groups.into_iter().flatten().collect())
    }

    fn parse_counts_block(
        &self,
        text: &str,
        source: &Path,
        counts_line: usize,
        counts: &Range<usize>,
        first_atom_line: usize,
        variant_marker: &str,
    ) -> Result<MolecularCoordinates> {
        let lines: Vec<&str> = text.lines().collect();

        let header = lines.get(counts_line).ok_or_else(|| DockEvalError::MalformedHeader {
            path: source.to_path_buf(),
            reason: format!("missing counts line {}", counts_line + 1),
        })?;
        let field = column(header, counts).trim();
        let natom: usize = field.parse().map_err(|_| DockEvalError::MalformedHeader {
            path: source.to_path_buf(),
            reason: format!("atom count {field:?} is not an integer"),
        })?;

        let start = atom_block_start(&lines, variant_marker, first_atom_line, source);
        let block = lines
            .get(start..start + natom)
            .ok_or_else(|| DockEvalError::TruncatedAtomBlock {
                path: source.to_path_buf(),
                declared: natom,
                found: lines.len().saturating_sub(start),
            })?;

        let mut points = Vec::with_capacity(natom);
        for (offset, line) in block.iter().enumerate() {
            if self.skip_hydrogens && self.layout.is_hydrogen(line) {
                continue;
            }
            match self.layout.coordinates(line) {
                Ok(point) => points.push(point),
                Err(e) => warn_skipped(source, start + offset, &e),
            }
        }

        Ok(MolecularCoordinates {
            cloud: PointCloud::new(points),
            declared_atoms: Some(natom),
        })
    }
}

/// Only the first model of a multi-model file is read.
fn stop_at_model_boundary(source: &Path, idx: usize, marker: &str) {
    debug!(
        "{}: '{}' at line {}, ignoring remaining models",
        source.display(),
        marker,
        idx + 1
    );
}

/// Locate the first atom line of a connection table. Files carrying the
/// annotation marker and plain files both keep the atom block right after
/// the counts line; the branch only records which variant was seen.
fn atom_block_start(lines: &[&str], marker: &str, first_atom_line: usize, source: &Path) -> usize {
    match lines.iter().position(|line| line.contains(marker)) {
        Some(idx) => {
            debug!(
                "{}: '{}' annotation at line {}",
                source.display(),
                marker,
                idx + 1
            );
            first_atom_line
        }
        None => {
            debug!(
                "{}: no '{}' annotation, atom block assumed at line {}",
                source.display(),
                marker,
                first_atom_line + 1
            );
            first_atom_line
        }
    }
}

fn warn_skipped(source: &Path, idx: usize, reason: &str) {
    warn!(
        "{}: skipping atom record at line {}: {}",
        source.display(),
        idx + 1,
        reason
    );
}

/// All ATOM then all HETATM coordinates of a PDB file, hydrogens included.
pub fn read_pdb(path: &Path) -> Result<PointCloud> {
    Ok(CoordinateReader::new(StructureFormat::Pdb).read(path)?.cloud)
}

/// Heavy-atom coordinates of the first model of a PDBQT file.
pub fn read_pdbqt(path: &Path) -> Result<PointCloud> {
    Ok(CoordinateReader::new(StructureFormat::Pdbqt).read(path)?.cloud)
}

/// Heavy-atom coordinates of an SDF file and its declared atom count.
pub fn read_sdf(path: &Path) -> Result<(PointCloud, usize)> {
    let coords = CoordinateReader::new(StructureFormat::Sdf).read(path)?;
    Ok((coords.cloud, coords.declared_atoms.unwrap_or(0)))
}
