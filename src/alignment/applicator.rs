extern crate nalgebra as na;

use std::collections::HashMap;
use log::{info, warn};
use na::{Vector3, UnitQuaternion};
use crate::alignment::{correspondence::CorrespondenceSet, similarity::GlobalTransform, segment::SegmentCorrectionTable, nearest::{CameraIndex, segment_for_point}};
use crate::geometry::{PointCloud, Mesh, TagPosition};
use crate::trajectory::{Trajectory, TrajectoryPose, TrackerPose, CoordinateSystem};
use crate::Float;

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default)]
pub struct ApplicationReport {
    pub transformed: usize,
    /// Points that got the global transform only because no camera was within range
    pub without_camera: usize,
    /// Trajectory poses that kept their own orientation because the tracker had no pose for them
    pub without_tracker_orientation: usize
}

/**
 * Global transform, then the offset of the segment of the nearest camera.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct CompositeTransform {
    global: GlobalTransform,
    segments: Option<(SegmentCorrectionTable, CameraIndex)>,
    substitute_orientation: bool
}

impl CompositeTransform {
    pub fn new(global: GlobalTransform, segments: Option<SegmentCorrectionTable>, max_camera_distance: Option<Float>, substitute_orientation: bool) -> CompositeTransform {
        let segments = segments.map(|table| {
            let index = CameraIndex::from_segment_table(&table, max_camera_distance);
            (table, index)
        });
        CompositeTransform { global, segments, substitute_orientation }
    }

    pub fn global(&self) -> &GlobalTransform { &self.global }
    pub fn segment_table(&self) -> Option<&SegmentCorrectionTable> { self.segments.as_ref().map(|(table, _)| table) }
    pub fn substitutes_orientation(&self) -> bool { self.substitute_orientation }

    /**
     * Returns the tracker frame point and whether a local offset could be looked up.
     * Without a segment table every point counts as looked up.
     */
    fn map_point(&self, point: &Vector3<Float>) -> (Vector3<Float>, bool) {
        let aligned = self.global.transform_point(point);
        match &self.segments {
            None => (aligned, true),
            Some((table, index)) => match segment_for_point(index, table, &aligned).and_then(|s| table.offset(s)) {
                Some(offset) => (aligned + offset, true),
                None => (aligned, false)
            }
        }
    }

    pub fn transform_point(&self, point: &Vector3<Float>) -> Vector3<Float> {
        self.map_point(point).0
    }

    pub fn residuals(&self, correspondences: &CorrespondenceSet) -> Vec<Float> {
        correspondences.pairs().iter().map(|c| (self.transform_point(&c.reconstruction_position) - c.tracker_position).norm()).collect()
    }

    fn transform_points(&self, points: &mut [Vector3<Float>], report: &mut ApplicationReport) {
        for p in points.iter_mut() {
            let (mapped, has_camera) = self.map_point(p);
            *p = mapped;
            report.transformed += 1;
            if !has_camera {
                report.without_camera += 1;
            }
        }
    }

    pub fn apply_to_point_cloud(&self, cloud: &mut PointCloud) -> ApplicationReport {
        let mut report = ApplicationReport::default();
        self.transform_points(&mut cloud.points, &mut report);
        if let Some(normals) = cloud.normals.as_mut() {
            for n in normals.iter_mut() {
                *n = self.global.transform_direction(n);
            }
        }

        if report.without_camera > 0 {
            warn!("{} of {} cloud points had no camera in range and received the global transform only", report.without_camera, report.transformed);
        }
        info!("transformed point cloud with {} points", report.transformed);
        report
    }

    /**
     * Normals are recomputed from the moved vertices.
     */
    pub fn apply_to_mesh(&self, mesh: &mut Mesh) -> ApplicationReport {
        let mut report = ApplicationReport::default();
        self.transform_points(&mut mesh.vertices, &mut report);
        mesh.compute_vertex_normals();

        if report.without_camera > 0 {
            warn!("{} of {} mesh vertices had no camera in range and received the global transform only", report.without_camera, report.transformed);
        }
        info!("transformed mesh with {} vertices and {} triangles", report.transformed, mesh.triangles.len());
        report
    }

    /**
     * Positions follow the point rule. Orientations are rotated into tracker frame and, with substitution enabled,
     * replaced by the tracker orientation of the same frame. Substitution never touches positions.
     */
    pub fn apply_to_trajectory(&self, trajectory: &Trajectory, tracker: &[TrackerPose]) -> (Trajectory, ApplicationReport) {
        let mut tracker_orientations = HashMap::<&str, &UnitQuaternion<Float>>::with_capacity(tracker.len());
        for pose in tracker {
            tracker_orientations.entry(pose.id.as_str()).or_insert(&pose.orientation);
        }

        let mut report = ApplicationReport::default();
        let poses = trajectory.poses.iter().map(|pose| {
            let (position, has_camera) = self.map_point(&pose.position);
            report.transformed += 1;
            if !has_camera {
                report.without_camera += 1;
            }

            let rotated = pose.orientation.map(|q| self.global.transform_orientation(&q));
            let orientation = match self.substitute_orientation {
                false => rotated,
                true => match tracker_orientations.get(pose.id.as_str()) {
                    Some(&&q) => Some(q),
                    None => {
                        report.without_tracker_orientation += 1;
                        rotated
                    }
                }
            };

            TrajectoryPose { id: pose.id.clone(), position, orientation, timestamp: pose.timestamp }
        }).collect::<Vec<TrajectoryPose>>();

        if report.without_tracker_orientation > 0 {
            warn!("{} trajectory poses have no tracker pose, kept their reconstructed orientation", report.without_tracker_orientation);
        }
        info!("transformed trajectory with {} poses", report.transformed);
        (Trajectory { coordinate_system: CoordinateSystem::Tracker, poses }, report)
    }
}

/**
 * Tag positions are captured in tracker frame and are never moved.
 */
pub fn pass_through_tags(tags: &[TagPosition]) -> &[TagPosition] {
    tags
}

#[derive(Debug,Clone,PartialEq)]
pub struct TagComparison {
    pub id: String,
    pub nearest_point_distance: Option<Float>
}

/**
 * Distance from each tag to the closest point of aligned geometry.
 */
pub fn compare_tags(tags: &[TagPosition], points: &[Vector3<Float>]) -> Vec<TagComparison> {
    tags.iter().map(|tag| {
        let nearest_point_distance = points.iter().map(|p| (p - tag.position).norm()).reduce(Float::min);
        TagComparison { id: tag.id.clone(), nearest_point_distance }
    }).collect()
}
