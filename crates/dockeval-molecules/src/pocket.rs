//! Search box derivation around a predicted ligand pose.

use dockeval_common::error::{DockEvalError, Result};
use dockeval_common::{BoundingBox, PointCloud, SearchRegion};
use tracing::debug;

/// Margin added to each bounding-box edge (Å).
pub const POCKET_PADDING: f64 = 5.0;
/// Largest edge the capped policy allows (Å).
pub const MAX_POCKET_EDGE: f64 = 60.0;

/// How the docking search space is chosen for each structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxPolicy {
    /// Bounding box of the predicted pose grown by `padding` on every axis.
    Padded { padding: f64 },
    /// Cube of edge `edge` centred on the predicted pose.
    Fixed { edge: f64 },
    /// Padded box with every edge limited to `max_edge`.
    Capped { padding: f64, max_edge: f64 },
    /// Engine autoboxes around the reference ligand.
    GroundTruthPocket,
    /// Engine autoboxes around the whole receptor.
    WholeProtein,
}

impl Default for BoxPolicy {
    fn default() -> Self {
        Self::Padded {
            padding: POCKET_PADDING,
        }
    }
}

impl BoxPolicy {
    pub fn capped() -> Self {
        Self::Capped {
            padding: POCKET_PADDING,
            max_edge: MAX_POCKET_EDGE,
        }
    }

    /// Whether the engine derives the box itself from an anchor file.
    pub fn is_autobox(&self) -> bool {
        matches!(self, Self::GroundTruthPocket | Self::WholeProtein)
    }

    /// Region for an already folded bounding box. `None` for autobox policies.
    pub fn region(&self, bbox: &BoundingBox) -> Option<SearchRegion> {
        let center = bbox.center();
        let extent = bbox.extent();
        let size = match *self {
            Self::Padded { padding } => extent.map(|e| e + padding),
            Self::Fixed { edge } => [edge; 3],
            Self::Capped { padding, max_edge } => extent.map(|e| (e + padding).min(max_edge)),
            Self::GroundTruthPocket | Self::WholeProtein => return None,
        };
        Some(SearchRegion { center, size })
    }
}

/// Fold every point into a bounding box. An empty cloud is an error.
pub fn bounding_box(cloud: &PointCloud) -> Result<BoundingBox> {
    let bbox = cloud.iter().fold(BoundingBox::empty(), |mut bbox, p| {
        bbox.include(p);
        bbox
    });
    if bbox.is_empty() {
        return Err(DockEvalError::EmptyPointCloud(
            "cannot derive a bounding box from zero points".to_string(),
        ));
    }
    Ok(bbox)
}

/// Bounding box plus the explicit region the policy derives from it.
/// Autobox policies have no explicit region and are rejected.
pub fn search_region(cloud: &PointCloud, policy: &BoxPolicy) -> Result<(BoundingBox, SearchRegion)> {
    let bbox = bounding_box(cloud)?;
    let region = policy.region(&bbox).ok_or_else(|| {
        DockEvalError::Config(format!("{policy:?} lets the engine autobox; no explicit region"))
    })?;
    debug!(
        "bbox min={:?} max={:?} -> {:?} region {:?}",
        bbox.min, bbox.max, policy, region
    );
    Ok((bbox, region))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_cloud() -> PointCloud {
        // 10 heavy atoms in a 2 Å cube: the 8 corners plus two interior points
        let mut points = Vec::new();
        for x in [0.0, 2.0] {
            for y in [0.0, 2.0] {
                for z in [0.0, 2.0] {
                    points.push([x, y, z]);
                }
            }
        }
        points.push([1.0, 1.0, 1.0]);
        points.push([0.5, 1.5, 1.0]);
        PointCloud::new(points)
    }

    fn scattered_cloud() -> PointCloud {
        PointCloud::new(vec![
            [-12.3, 4.0, 7.5],
            [3.1, -40.2, 8.0],
            [0.0, 10.0, 90.0],
            [25.5, 1.0, -3.25],
        ])
    }

    #[test]
    fn test_cube_padded_region() {
        let (bbox, region) = search_region(&cube_cloud(), &BoxPolicy::default()).unwrap();
        assert_eq!(bbox.min, [0.0, 0.0, 0.0]);
        assert_eq!(bbox.max, [2.0, 2.0, 2.0]);
        assert_eq!(region.center, [1.0, 1.0, 1.0]);
        assert_eq!(region.size, [7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_center_is_midpoint_under_every_policy() {
        let cloud = scattered_cloud();
        let bbox = bounding_box(&cloud).unwrap();
        for i in 0..3 {
            assert!(bbox.min[i] <= bbox.max[i]);
        }
        for policy in [BoxPolicy::default(), BoxPolicy::Fixed { edge: 30.0 }, BoxPolicy::capped()] {
            let region = policy.region(&bbox).unwrap();
            for i in 0..3 {
                assert_eq!(region.center[i], (bbox.min[i] + bbox.max[i]) / 2.0);
            }
        }
    }

    #[test]
    fn test_padded_size_is_extent_plus_margin() {
        let bbox = bounding_box(&scattered_cloud()).unwrap();
        let region = BoxPolicy::default().region(&bbox).unwrap();
        for i in 0..3 {
            assert_eq!(region.size[i], (bbox.max[i] - bbox.min[i]) + 5.0);
            assert!(region.size[i] >= 5.0);
        }
    }

    #[test]
    fn test_capped_size_limited_per_axis() {
        let bbox = bounding_box(&scattered_cloud()).unwrap();
        let region = BoxPolicy::capped().region(&bbox).unwrap();
        for i in 0..3 {
            assert_eq!(region.size[i], ((bbox.max[i] - bbox.min[i]) + 5.0).min(60.0));
        }
        // only the z extent (93.25) exceeds the cap
        assert!((region.size[0] - 42.8).abs() < 1e-9);
        assert!((region.size[1] - 55.2).abs() < 1e-9);
        assert_eq!(region.size[2], 60.0);
    }

    #[test]
    fn test_fixed_size_is_cube() {
        let (_, region) = search_region(&cube_cloud(), &BoxPolicy::Fixed { edge: 30.0 }).unwrap();
        assert_eq!(region.size, [30.0, 30.0, 30.0]);
    }

    #[test]
    fn test_autobox_policies_have_no_region() {
        let bbox = bounding_box(&cube_cloud()).unwrap();
        assert!(BoxPolicy::GroundTruthPocket.region(&bbox).is_none());
        assert!(BoxPolicy::WholeProtein.region(&bbox).is_none());
        assert!(BoxPolicy::WholeProtein.is_autobox());
        assert!(!BoxPolicy::default().is_autobox());

        let err = search_region(&cube_cloud(), &BoxPolicy::GroundTruthPocket).unwrap_err();
        assert!(matches!(err, DockEvalError::Config(_)));
    }

    #[test]
    fn test_single_point_has_margin_only() {
        let cloud = PointCloud::new(vec![[3.0, -1.0, 2.0]]);
        let (_, region) = search_region(&cloud, &BoxPolicy::default()).unwrap();
        assert_eq!(region.center, [3.0, -1.0, 2.0]);
        assert_eq!(region.size, [5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_empty_cloud_is_error() {
        let err = bounding_box(&PointCloud::default()).unwrap_err();
        assert!(matches!(err, DockEvalError::EmptyPointCloud(_)));
    }
}
