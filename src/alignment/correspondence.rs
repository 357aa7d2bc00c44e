extern crate nalgebra as na;

use std::collections::{HashMap, HashSet};
use log::{info, warn};
use na::{Vector3, UnitQuaternion, Matrix3xX};
use crate::trajectory::{TrackerPose, ReconstructionPose};
use crate::alignment::AlignmentError;
use crate::numerics::bounding_extents;
use crate::Float;

/**
 * A tracker pose and a reconstruction pose sharing the same frame identifier.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct Correspondence {
    pub id: String,
    pub tracker_position: Vector3<Float>,
    pub reconstruction_position: Vector3<Float>,
    pub tracker_orientation: UnitQuaternion<Float>,
    pub timestamp: Option<Float>
}

/**
 * Ordered as the tracker stream. Identifiers are unique.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct CorrespondenceSet {
    pairs: Vec<Correspondence>,
    tracker_frames: usize
}

impl CorrespondenceSet {
    pub fn new(pairs: Vec<Correspondence>, tracker_frames: usize) -> CorrespondenceSet {
        CorrespondenceSet { pairs, tracker_frames }
    }

    pub fn pairs(&self) -> &Vec<Correspondence> { &self.pairs }
    pub fn len(&self) -> usize { self.pairs.len() }
    pub fn is_empty(&self) -> bool { self.pairs.is_empty() }
    pub fn tracker_frames(&self) -> usize { self.tracker_frames }

    /**
     * matched / total tracker frames
     */
    pub fn coverage(&self) -> Float {
        match self.tracker_frames {
            0 => 0.0,
            n => self.pairs.len() as Float / n as Float
        }
    }

    pub fn tracker_positions(&self) -> Vec<Vector3<Float>> {
        self.pairs.iter().map(|c| c.tracker_position).collect()
    }

    pub fn reconstruction_positions(&self) -> Vec<Vector3<Float>> {
        self.pairs.iter().map(|c| c.reconstruction_position).collect()
    }

    /**
     * Points as columns
     */
    pub fn tracker_matrix(&self) -> Matrix3xX<Float> {
        Matrix3xX::<Float>::from_columns(&self.tracker_positions())
    }

    pub fn reconstruction_matrix(&self) -> Matrix3xX<Float> {
        Matrix3xX::<Float>::from_columns(&self.reconstruction_positions())
    }

    pub fn ensure_minimum(&self, required: usize) -> Result<(), AlignmentError> {
        match self.pairs.len() {
            matched if matched < required => Err(AlignmentError::InsufficientCorrespondence { matched, required, tracker_frames: self.tracker_frames }),
            _ => Ok(())
        }
    }

    pub fn reconstruction_extents(&self) -> [Float; 3] {
        bounding_extents(&self.reconstruction_positions())
    }

    pub fn tracker_extents(&self) -> [Float; 3] {
        bounding_extents(&self.tracker_positions())
    }
}

/**
 * Exact match on the frame identifier. A duplicate identifier within one stream is skipped,
 * the first occurrence wins.
 */
pub fn match_poses(tracker: &[TrackerPose], reconstruction: &[ReconstructionPose]) -> CorrespondenceSet {
    let mut reconstruction_by_id = HashMap::<&str, &ReconstructionPose>::with_capacity(reconstruction.len());
    for pose in reconstruction {
        if reconstruction_by_id.contains_key(pose.id.as_str()) {
            warn!("duplicate reconstruction pose for frame {}, keeping the first", pose.id);
            continue;
        }
        reconstruction_by_id.insert(pose.id.as_str(), pose);
    }

    let mut seen = HashSet::<&str>::with_capacity(tracker.len());
    let mut pairs = Vec::<Correspondence>::with_capacity(reconstruction_by_id.len().min(tracker.len()));
    for pose in tracker {
        if !seen.insert(pose.id.as_str()) {
            warn!("duplicate tracker pose for frame {}, keeping the first", pose.id);
            continue;
        }

        if let Some(reconstructed) = reconstruction_by_id.get(pose.id.as_str()) {
            pairs.push(Correspondence {
                id: pose.id.clone(),
                tracker_position: pose.position,
                reconstruction_position: *reconstructed.position(),
                tracker_orientation: pose.orientation,
                timestamp: pose.timestamp
            });
        }
    }

    let set = CorrespondenceSet::new(pairs, seen.len());
    info!("matched {} of {} tracker frames (coverage {:.3})", set.len(), set.tracker_frames(), set.coverage());
    set
}

/**
 * Matching followed by the minimum count check.
 */
pub fn match_poses_with_minimum(tracker: &[TrackerPose], reconstruction: &[ReconstructionPose], required: usize) -> Result<CorrespondenceSet, AlignmentError> {
    let set = match_poses(tracker, reconstruction);
    set.ensure_minimum(required)?;
    Ok(set)
}
