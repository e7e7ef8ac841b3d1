//! dockeval-molecules - Pose evaluation pipeline.
//!
//! 1. Reading ligand coordinates (PDB / PDBQT / SDF)
//! 2. Deriving a docking search box from the predicted pose
//! 3. Re-docking in that box (GNINA)
//! 4. Scoring the docked poses against the reference ligand (RMSD)
//! 5. Writing per-structure top-1 / top-N results

pub mod coords;
pub mod pocket;
pub mod rmsd;
pub mod comparator;
pub mod docking;
pub mod report;
pub mod pipeline;
