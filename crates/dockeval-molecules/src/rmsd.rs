//! Pose deviation between two ligand coordinate sets.
//!
//! No superposition is performed: both poses must already share the receptor
//! frame, so the value measures how far the ligand moved, not how its shape differs.

use crate::coords::CoordinateReader;
use dockeval_common::error::{DockEvalError, Result};
use dockeval_common::{Point3, PointCloud, StructureFormat};
use std::path::Path;
use tracing::warn;

/// Result of a positional (index-matched) RMSD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaiveRmsd {
    pub value: f64,
    /// Number of atom pairs that entered the mean.
    pub compared_atoms: usize,
    /// Set when the inputs differed in length and the longer one was cut.
    /// Such values are a best-effort comparison, not a structural match.
    pub truncated: bool,
}

/// sqrt(mean |a_i - b_i|^2) over index-matched atoms.
///
/// Inputs of unequal length are cut to the shorter one with a warning.
/// Fails when either input is empty.
pub fn naive_rmsd(a: &[Point3], b: &[Point3]) -> Result<NaiveRmsd> {
    let truncated = a.len() != b.len();
    if truncated {
        warn!(
            "Atom count mismatch ({} vs {}), comparing the first {} atoms only",
            a.len(),
            b.len(),
            a.len().min(b.len())
        );
    }

    let n = a.len().min(b.len());
    if n == 0 {
        return Err(DockEvalError::EmptyPointCloud(format!(
            "cannot compare poses with {} and {} atoms",
            a.len(),
            b.len()
        )));
    }

    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| {
            let dx = p[0] - q[0];
            let dy = p[1] - q[1];
            let dz = p[2] - q[2];
            dx * dx + dy * dy + dz * dz
        })
        .sum();

    Ok(NaiveRmsd {
        value: (sum_sq / n as f64).sqrt(),
        compared_atoms: n,
        truncated,
    })
}

/// [`naive_rmsd`] over two point clouds.
pub fn cloud_rmsd(a: &PointCloud, b: &PointCloud) -> Result<NaiveRmsd> {
    naive_rmsd(a.points(), b.points())
}

fn read_pair(format: StructureFormat, a: &Path, b: &Path) -> Result<(PointCloud, PointCloud, Option<usize>)> {
    let reader = CoordinateReader::new(format);
    let first = reader.read(a)?;
    let second = reader.read(b)?;
    Ok((first.cloud, second.cloud, second.declared_atoms))
}

/// RMSD between every ATOM/HETATM record of two PDB files.
pub fn rmsd_pdb(a: &Path, b: &Path) -> Result<NaiveRmsd> {
    let (first, second, _) = read_pair(StructureFormat::Pdb, a, b)?;
    cloud_rmsd(&first, &second)
}

/// Heavy-atom RMSD between the first models of two PDBQT files.
pub fn fast_rmsd_pdbqt(a: &Path, b: &Path) -> Result<NaiveRmsd> {
    let (first, second, _) = read_pair(StructureFormat::Pdbqt, a, b)?;
    cloud_rmsd(&first, &second)
}

/// Heavy-atom RMSD between two SDF files, with the atom count declared by `b`.
pub fn fast_rmsd_sdf(a: &Path, b: &Path) -> Result<(NaiveRmsd, usize)> {
    let (first, second, declared) = read_pair(StructureFormat::Sdf, a, b)?;
    Ok((cloud_rmsd(&first, &second)?, declared.unwrap_or(0)))
}

/// RMSD between two files of any supported format, inferred from the extension.
pub fn rmsd_files(a: &Path, b: &Path) -> Result<NaiveRmsd> {
    let first = CoordinateReader::for_path(a)?.read(a)?;
    let second = CoordinateReader::for_path(b)?.read(b)?;
    cloud_rmsd(&first.cloud, &second.cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ligand() -> Vec<Point3> {
        vec![
            [1.2, -0.4, 3.3],
            [2.5, 0.1, 3.9],
            [3.1, 1.4, 4.2],
            [2.2, 2.6, 3.7],
            [0.9, 2.0, 3.1],
        ]
    }

    fn translated(points: &[Point3], t: Point3) -> Vec<Point3> {
        points
            .iter()
            .map(|p| [p[0] + t[0], p[1] + t[1], p[2] + t[2]])
            .collect()
    }

    #[test]
    fn test_self_rmsd_is_zero() {
        let a = ligand();
        let r = naive_rmsd(&a, &a).unwrap();
        assert_eq!(r.value, 0.0);
        assert_eq!(r.compared_atoms, 5);
        assert!(!r.truncated);
    }

    #[test]
    fn test_rmsd_is_symmetric() {
        let a = ligand();
        let b = vec![
            [0.0, 0.0, 0.0],
            [2.0, 1.0, 4.0],
            [3.5, 1.0, 5.0],
            [-1.0, 2.0, 3.0],
            [0.9, 2.4, 2.0],
        ];
        let ab = naive_rmsd(&a, &b).unwrap().value;
        let ba = naive_rmsd(&b, &a).unwrap().value;
        assert!((ab - ba).abs() < 1e-12);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_translation_gives_vector_norm() {
        let t = [3.0, 4.0, 12.0];
        for n in 1..=5 {
            let a = &ligand()[..n];
            let b = translated(a, t);
            let r = naive_rmsd(a, &b).unwrap();
            assert!((r.value - 13.0).abs() < 1e-9, "n={} rmsd={}", n, r.value);
        }
    }

    #[test]
    fn test_mismatch_truncates_to_shorter() {
        let a = ligand()[..3].to_vec();
        let b = translated(&ligand(), [1.0, 0.0, 0.0]);
        let full = naive_rmsd(&a, &b).unwrap();
        let cut = naive_rmsd(&a, &b[..3]).unwrap();
        assert_eq!(full.value, cut.value);
        assert_eq!(full.compared_atoms, 3);
        assert!(full.truncated);
        assert!(!cut.truncated);
    }

    #[test]
    fn test_empty_input_fails() {
        let err = naive_rmsd(&[], &ligand()).unwrap_err();
        assert!(matches!(err, DockEvalError::EmptyPointCloud(_)));
    }

    fn pdbqt_file(points: &[Point3]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for (i, p) in points.iter().enumerate() {
            writeln!(
                file,
                "ATOM  {:>5}  C{:<2} UNL     1    {:>8.3}{:>8.3}{:>8.3}  0.00  0.00    +0.000 C ",
                i + 1,
                i + 1,
                p[0],
                p[1],
                p[2]
            )
            .unwrap();
        }
        file
    }

    #[test]
    fn test_fast_rmsd_pdbqt_from_files() {
        let a = ligand();
        let first = pdbqt_file(&a);
        let second = pdbqt_file(&translated(&a, [0.0, 2.0, 0.0]));
        let r = fast_rmsd_pdbqt(first.path(), second.path()).unwrap();
        assert!((r.value - 2.0).abs() < 1e-9);
    }

    fn pdb_file(records: &[(&str, Point3, &str)]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for (i, (record, p, element)) in records.iter().enumerate() {
            writeln!(
                file,
                "{:<6}{:>5} {:<4} LIG A   1    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00          {:>2}",
                record,
                i + 1,
                format!("{element}{}", i + 1),
                p[0],
                p[1],
                p[2],
                element
            )
            .unwrap();
        }
        file
    }

    #[test]
    fn test_rmsd_pdb_orders_atom_before_hetatm_and_keeps_hydrogens() {
        // same three atoms; only the line order differs
        let first = pdb_file(&[
            ("HETATM", [0.0, 0.0, 0.0], "C"),
            ("ATOM", [1.0, 0.0, 0.0], "C"),
            ("ATOM", [2.0, 0.0, 0.0], "H"),
        ]);
        let second = pdb_file(&[
            ("ATOM", [1.0, 0.0, 0.0], "C"),
            ("ATOM", [2.0, 0.0, 0.0], "H"),
            ("HETATM", [0.0, 0.0, 0.0], "C"),
        ]);
        let r = rmsd_pdb(first.path(), second.path()).unwrap();
        assert_eq!(r.value, 0.0);
        assert_eq!(r.compared_atoms, 3);

        let shifted = pdb_file(&[
            ("ATOM", [1.0, 0.0, 4.0], "C"),
            ("ATOM", [2.0, 0.0, 4.0], "H"),
            ("HETATM", [0.0, 0.0, 4.0], "C"),
        ]);
        let r = rmsd_pdb(first.path(), shifted.path()).unwrap();
        assert!((r.value - 4.0).abs() < 1e-9);
    }

    fn sdf_file(atoms: &[(Point3, &str)]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "ligand\n  dockeval\n\n").unwrap();
        writeln!(file, "{:>3}  0  0  0  0  0  0  0  0  0999 V2000", atoms.len()).unwrap();
        for (p, symbol) in atoms {
            writeln!(
                file,
                "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
                p[0], p[1], p[2], symbol
            )
            .unwrap();
        }
        write!(file, "M  END\n$$$$\n").unwrap();
        file
    }

    #[test]
    fn test_fast_rmsd_sdf_reports_second_file_atom_count() {
        let first = sdf_file(&[([0.0, 0.0, 0.0], "C"), ([1.0, 0.0, 0.0], "H"), ([2.0, 0.0, 0.0], "O")]);
        let second = sdf_file(&[
            ([0.0, 3.0, 0.0], "C"),
            ([1.0, 3.0, 0.0], "H"),
            ([2.0, 3.0, 0.0], "O"),
            ([2.5, 3.0, 0.0], "H"),
        ]);

        let (r, natom) = fast_rmsd_sdf(first.path(), second.path()).unwrap();
        assert!((r.value - 3.0).abs() < 1e-9);
        assert_eq!(r.compared_atoms, 2);
        assert!(!r.truncated);
        assert_eq!(natom, 4);

        let (_, natom) = fast_rmsd_sdf(second.path(), first.path()).unwrap();
        assert_eq!(natom, 3);
    }

    #[test]
    fn test_rmsd_files_rejects_unknown_extension() {
        let err = rmsd_files(Path::new("a.xyz"), Path::new("b.xyz")).unwrap_err();
        assert!(matches!(err, DockEvalError::Config(_)));
    }
}
