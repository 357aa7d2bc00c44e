extern crate nalgebra as na;

use std::collections::HashMap;
use na::{Vector3, UnitQuaternion};
use serde::{Serialize, Deserialize};
use crate::Float;

/**
 * Pose from the on-device tracker. Metric and gravity aligned.
 * The timestamp is only absent when the source file had no time column.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct TrackerPose {
    pub id: String,
    pub position: Vector3<Float>,
    pub orientation: UnitQuaternion<Float>,
    pub timestamp: Option<Float>
}

impl TrackerPose {
    pub fn new(id: &str, position: Vector3<Float>, orientation: UnitQuaternion<Float>, timestamp: Float) -> TrackerPose {
        TrackerPose { id: id.to_string(), position, orientation, timestamp: Some(timestamp) }
    }
}

/**
 * What the reconstruction registered for a frame. Most reconstruction outputs we consume only
 * give a camera centre, so position-only is the common case.
 */
#[derive(Debug,Clone,Copy,PartialEq)]
pub enum PoseEstimate {
    PositionOnly { position: Vector3<Float> },
    WithOrientation { position: Vector3<Float>, orientation: UnitQuaternion<Float> }
}

impl PoseEstimate {
    pub fn position(&self) -> &Vector3<Float> {
        match self {
            PoseEstimate::PositionOnly { position } => position,
            PoseEstimate::WithOrientation { position, .. } => position
        }
    }

    pub fn orientation(&self) -> Option<&UnitQuaternion<Float>> {
        match self {
            PoseEstimate::PositionOnly { .. } => None,
            PoseEstimate::WithOrientation { orientation, .. } => Some(orientation)
        }
    }
}

#[derive(Debug,Clone,PartialEq)]
pub struct ReconstructionPose {
    pub id: String,
    pub estimate: PoseEstimate
}

impl ReconstructionPose {
    pub fn position_only(id: &str, position: Vector3<Float>) -> ReconstructionPose {
        ReconstructionPose { id: id.to_string(), estimate: PoseEstimate::PositionOnly { position } }
    }

    pub fn with_orientation(id: &str, position: Vector3<Float>, orientation: UnitQuaternion<Float>) -> ReconstructionPose {
        ReconstructionPose { id: id.to_string(), estimate: PoseEstimate::WithOrientation { position, orientation } }
    }

    pub fn position(&self) -> &Vector3<Float> {
        self.estimate.position()
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    Tracker,
    Reconstruction
}

/**
 * One record of a camera trajectory artifact.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct TrajectoryPose {
    pub id: String,
    pub position: Vector3<Float>,
    pub orientation: Option<UnitQuaternion<Float>>,
    pub timestamp: Option<Float>
}

#[derive(Debug,Clone,PartialEq)]
pub struct Trajectory {
    pub coordinate_system: CoordinateSystem,
    pub poses: Vec<TrajectoryPose>
}

impl Trajectory {

    /**
     * Trajectory in reconstruction frame. Timestamps are taken from the tracker pose of the same id
     * since the reconstruction carries none.
     */
    pub fn from_reconstruction(reconstruction: &[ReconstructionPose], tracker: &[TrackerPose]) -> Trajectory {
        let mut timestamps = HashMap::<&str, Option<Float>>::with_capacity(tracker.len());
        for t in tracker {
            timestamps.entry(t.id.as_str()).or_insert(t.timestamp);
        }

        let poses = reconstruction.iter().map(|r| {
            let timestamp = timestamps.get(r.id.as_str()).copied().flatten();
            TrajectoryPose {
                id: r.id.clone(),
                position: *r.position(),
                orientation: r.estimate.orientation().copied(),
                timestamp
            }
        }).collect::<Vec<TrajectoryPose>>();

        Trajectory { coordinate_system: CoordinateSystem::Reconstruction, poses }
    }

    pub fn positions(&self) -> Vec<Vector3<Float>> {
        self.poses.iter().map(|p| p.position).collect()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}
