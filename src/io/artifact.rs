extern crate nalgebra as na;

use std::path::Path;
use log::{info, warn};
use na::{Vector3, Matrix3};
use serde::{Serialize, Deserialize};
use crate::alignment::{AlignmentRun, AlignmentMethod, AlignmentConfig};
use crate::alignment::similarity::GlobalTransform;
use crate::alignment::segment::{Segment, SegmentCamera, SegmentCorrectionTable};
use crate::alignment::applicator::CompositeTransform;
use crate::trajectory::{Trajectory, TrajectoryPose, CoordinateSystem};
use crate::numerics::pose::{row_major, from_row_major, optimal_correction_of_rotation, quaternion_from_xyzw};
use crate::io::{IoError, write_atomically};
use crate::Float;

/**
 * Stored rotations further than this from orthogonal are projected back onto SO(3) on load.
 */
const ORTHOGONALITY_TOLERANCE: Float = 1e-9;

fn array(v: &Vector3<Float>) -> [Float; 3] {
    [v.x, v.y, v.z]
}

fn vector(a: &[Float; 3]) -> Vector3<Float> {
    Vector3::<Float>::new(a[0], a[1], a[2])
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct GlobalTransformRecord {
    pub scale: Float,
    /// Row major, acts on column vectors
    pub rotation: [[Float; 3]; 3],
    pub reconstruction_centroid: [Float; 3],
    pub tracker_centroid: [Float; 3],
    pub mean_error: Float,
    pub median_error: Float
}

impl GlobalTransformRecord {
    pub fn from_transform(transform: &GlobalTransform) -> GlobalTransformRecord {
        GlobalTransformRecord {
            scale: transform.scale(),
            rotation: row_major(transform.rotation()),
            reconstruction_centroid: array(transform.reconstruction_centroid()),
            tracker_centroid: array(transform.tracker_centroid()),
            mean_error: transform.mean_error(),
            median_error: transform.median_error()
        }
    }

    pub fn to_transform(&self) -> Result<GlobalTransform, IoError> {
        let stored = from_row_major(&self.rotation);
        let orthogonality_error = (stored.transpose()*stored - Matrix3::<Float>::identity()).norm();
        let rotation = match orthogonality_error {
            e if e > ORTHOGONALITY_TOLERANCE => {
                warn!("stored rotation is off SO(3) by {:e}, projecting", e);
                optimal_correction_of_rotation(&stored).ok_or_else(|| IoError::Parse { path: String::from("<alignment record>"), line: 0, message: "rotation could not be projected onto SO(3)".to_string() })?
            },
            _ => stored
        };
        Ok(GlobalTransform::from_parts(self.scale, rotation, vector(&self.reconstruction_centroid), vector(&self.tracker_centroid))
            .with_statistics(self.mean_error, self.median_error))
    }
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct SegmentRecord {
    pub index: usize,
    pub start_time: Float,
    pub end_time: Float,
    pub offset: [Float; 3],
    pub correspondence_count: usize,
    pub inherited_from: Option<usize>,
    pub substituted_orientation: bool
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct SegmentCameraRecord {
    pub id: String,
    pub position: [Float; 3],
    pub timestamp: Float,
    pub segment: usize
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct SegmentTableRecord {
    pub segment_duration: Float,
    pub start_time: Float,
    pub mean_error: Float,
    pub median_error: Float,
    pub segments: Vec<SegmentRecord>,
    pub cameras: Vec<SegmentCameraRecord>
}

impl SegmentTableRecord {
    pub fn from_table(table: &SegmentCorrectionTable) -> SegmentTableRecord {
        SegmentTableRecord {
            segment_duration: table.segment_duration(),
            start_time: table.start_time(),
            mean_error: table.mean_error(),
            median_error: table.median_error(),
            segments: table.segments().iter().map(|s| SegmentRecord {
                index: s.index,
                start_time: s.start_time,
                end_time: s.end_time,
                offset: array(&s.offset),
                correspondence_count: s.correspondence_count,
                inherited_from: s.inherited_from,
                substituted_orientation: s.substituted_orientation
            }).collect(),
            cameras: table.cameras().iter().map(|c| SegmentCameraRecord {
                id: c.id.clone(),
                position: array(&c.position),
                timestamp: c.timestamp,
                segment: c.segment
            }).collect()
        }
    }

    pub fn to_table(&self) -> Result<SegmentCorrectionTable, IoError> {
        let segments = self.segments.iter().map(|s| Segment {
            index: s.index,
            start_time: s.start_time,
            end_time: s.end_time,
            offset: vector(&s.offset),
            correspondence_count: s.correspondence_count,
            inherited_from: s.inherited_from,
            substituted_orientation: s.substituted_orientation
        }).collect();
        let cameras = self.cameras.iter().map(|c| SegmentCamera {
            id: c.id.clone(),
            position: vector(&c.position),
            timestamp: c.timestamp,
            segment: c.segment
        }).collect();
        Ok(SegmentCorrectionTable::from_parts(self.segment_duration, self.start_time, segments, cameras, self.mean_error, self.median_error)?)
    }
}

/**
 * Everything needed to trace output geometry back to the parameters that produced it and to
 * re-apply them offline.
 */
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct AlignmentRecord {
    pub method: String,
    pub method_detail: AlignmentMethod,
    pub config: AlignmentConfig,
    pub correspondence_count: usize,
    pub tracker_frames: usize,
    pub coverage: Float,
    pub global_transform: GlobalTransformRecord,
    pub segment_correction: Option<SegmentTableRecord>
}

impl AlignmentRecord {
    pub fn from_run(run: &AlignmentRun) -> AlignmentRecord {
        AlignmentRecord {
            method: run.method.to_string(),
            method_detail: run.method,
            config: run.config,
            correspondence_count: run.correspondences.len(),
            tracker_frames: run.correspondences.tracker_frames(),
            coverage: run.correspondences.coverage(),
            global_transform: GlobalTransformRecord::from_transform(&run.global),
            segment_correction: run.segments.as_ref().map(SegmentTableRecord::from_table)
        }
    }

    pub fn to_composite(&self) -> Result<CompositeTransform, IoError> {
        let global = self.global_transform.to_transform()?;
        let segments = match &self.segment_correction {
            Some(record) => Some(record.to_table()?),
            None => None
        };
        Ok(CompositeTransform::new(global, segments, self.config.max_camera_distance, self.config.substitute_orientation))
    }
}

pub fn save_alignment(file_path: &Path, run: &AlignmentRun) -> Result<(), IoError> {
    let record = AlignmentRecord::from_run(run);
    let json = serde_json::to_string_pretty(&record)?;
    write_atomically(file_path, json.as_bytes())?;
    info!("wrote alignment record ({}) to {}", record.method, file_path.display());
    Ok(())
}

pub fn load_alignment(file_path: &Path) -> Result<AlignmentRecord, IoError> {
    let contents = std::fs::read_to_string(file_path).map_err(|e| IoError::io(file_path, e))?;
    Ok(serde_json::from_str::<AlignmentRecord>(&contents)?)
}

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct PositionRecord {
    pub x: Float,
    pub y: Float,
    pub z: Float
}

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct QuaternionRecord {
    pub x: Float,
    pub y: Float,
    pub z: Float,
    pub w: Float
}

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct TrajectoryPoseRecord {
    pub id: String,
    pub position: PositionRecord,
    pub rotation: Option<QuaternionRecord>,
    pub timestamp: Option<Float>
}

/**
 * Viewer facing trajectory. The coordinate system is always spelled out.
 */
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct TrajectoryArtifact {
    pub coordinate_system: CoordinateSystem,
    pub poses: Vec<TrajectoryPoseRecord>
}

impl TrajectoryArtifact {
    pub fn from_trajectory(trajectory: &Trajectory) -> TrajectoryArtifact {
        TrajectoryArtifact {
            coordinate_system: trajectory.coordinate_system,
            poses: trajectory.poses.iter().map(|p| TrajectoryPoseRecord {
                id: p.id.clone(),
                position: PositionRecord { x: p.position.x, y: p.position.y, z: p.position.z },
                rotation: p.orientation.map(|q| QuaternionRecord { x: q.i, y: q.j, z: q.k, w: q.w }),
                timestamp: p.timestamp
            }).collect()
        }
    }

    pub fn to_trajectory(&self) -> Trajectory {
        Trajectory {
            coordinate_system: self.coordinate_system,
            poses: self.poses.iter().map(|p| TrajectoryPose {
                id: p.id.clone(),
                position: Vector3::<Float>::new(p.position.x, p.position.y, p.position.z),
                orientation: p.rotation.map(|q| quaternion_from_xyzw(q.x, q.y, q.z, q.w)),
                timestamp: p.timestamp
            }).collect()
        }
    }
}

pub fn save_trajectory(file_path: &Path, trajectory: &Trajectory) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(&TrajectoryArtifact::from_trajectory(trajectory))?;
    write_atomically(file_path, json.as_bytes())
}

pub fn load_trajectory(file_path: &Path) -> Result<Trajectory, IoError> {
    let contents = std::fs::read_to_string(file_path).map_err(|e| IoError::io(file_path, e))?;
    Ok(serde_json::from_str::<TrajectoryArtifact>(&contents)?.to_trajectory())
}
