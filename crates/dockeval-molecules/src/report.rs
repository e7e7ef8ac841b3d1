//! Per-structure RMSD results as CSV.

use dockeval_common::error::{DockEvalError, Result};
use dockeval_common::PoseEvaluation;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// CSV sink with one row per structure: `pdb,top1_rmsd,top<N>_rmsd`.
///
/// Failed structures are written as a two-field `<pdb>,<sentinel>` row, the
/// layout downstream tooling already expects. Every row is flushed so an
/// interrupted batch still leaves a readable file.
pub struct RmsdReport<W: Write> {
    writer: csv::Writer<W>,
    sentinel: u32,
}

impl RmsdReport<File> {
    /// Create (truncate) `path` and write the header.
    pub fn create(path: &Path, top_n: usize, sentinel: u32) -> Result<Self> {
        let file = File::create(path).map_err(|e| DockEvalError::io(path, e))?;
        debug!("Writing RMSD results to {:?}", path);
        Self::from_writer(file, top_n, sentinel)
    }
}

impl<W: Write> RmsdReport<W> {
    pub fn from_writer(inner: W, top_n: usize, sentinel: u32) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(inner);
        writer.write_record(["pdb".to_string(), "top1_rmsd".to_string(), format!("top{top_n}_rmsd")])?;
        writer.flush().map_err(csv::Error::from)?;
        Ok(Self { writer, sentinel })
    }

    pub fn record(&mut self, pdb: &str, evaluation: &PoseEvaluation) -> Result<()> {
        match evaluation {
            PoseEvaluation::Scored { top1, best_of_n, .. } => {
                self.writer
                    .write_record([pdb.to_string(), top1.to_string(), best_of_n.to_string()])?;
            }
            PoseEvaluation::Failed(_) => {
                self.writer
                    .write_record([pdb.to_string(), self.sentinel.to_string()])?;
            }
        }
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| DockEvalError::Csv(csv::Error::from(e.into_error())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockeval_common::FailureReason;
    use std::path::PathBuf;

    #[test]
    fn test_rows_and_sentinel() {
        let mut report = RmsdReport::from_writer(Vec::new(), 5, 999).unwrap();
        report
            .record(
                "2xyz",
                &PoseEvaluation::Scored {
                    top1: 1.5,
                    best_of_n: 0.75,
                    poses: 5,
                },
            )
            .unwrap();
        report
            .record(
                "1abc",
                &PoseEvaluation::Failed(FailureReason::MissingOutput(PathBuf::from("x.sdf"))),
            )
            .unwrap();
        let text = String::from_utf8(report.into_inner().unwrap()).unwrap();
        assert_eq!(text, "pdb,top1_rmsd,top5_rmsd\n2xyz,1.5,0.75\n1abc,999\n");
    }

    #[test]
    fn test_create_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rmsd.csv");
        let mut report = RmsdReport::create(&path, 3, 999).unwrap();
        report
            .record("3def", &PoseEvaluation::Failed(FailureReason::NoPoses))
            .unwrap();
        drop(report);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "pdb,top1_rmsd,top3_rmsd\n3def,999\n");
    }
}
