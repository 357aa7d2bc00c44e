extern crate nalgebra as na;

use na::Vector3;
use crate::alignment::segment::SegmentCorrectionTable;
use crate::Float;

/**
 * Stage 1 of the geometry to segment association: nearest globally aligned camera in 3D.
 * Linear scan, camera counts are in the hundreds.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct CameraIndex {
    positions: Vec<Vector3<Float>>,
    max_distance: Option<Float>
}

impl CameraIndex {
    pub fn new(positions: Vec<Vector3<Float>>, max_distance: Option<Float>) -> CameraIndex {
        CameraIndex { positions, max_distance }
    }

    pub fn from_segment_table(table: &SegmentCorrectionTable, max_distance: Option<Float>) -> CameraIndex {
        CameraIndex::new(table.cameras().iter().map(|c| c.position).collect(), max_distance)
    }

    pub fn len(&self) -> usize { self.positions.len() }
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }

    /**
     * None if there are no cameras or none within `max_distance`. Ties go to the lower index.
     */
    pub fn nearest(&self, point: &Vector3<Float>) -> Option<usize> {
        let (index, distance_squared) = self.positions.iter().enumerate()
            .map(|(i, c)| (i, (c - point).norm_squared()))
            .fold(None, |best: Option<(usize, Float)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d))
            })?;

        match self.max_distance {
            Some(max) if distance_squared > max*max => None,
            _ => Some(index)
        }
    }
}

/**
 * Stage 2: segment of a camera, by the timestamp assignment made when the table was built.
 */
pub fn segment_of_camera(table: &SegmentCorrectionTable, camera: usize) -> Option<usize> {
    table.cameras().get(camera).map(|c| c.segment)
}

/**
 * Both stages. `point` must already be globally aligned.
 */
pub fn segment_for_point(index: &CameraIndex, table: &SegmentCorrectionTable, point: &Vector3<Float>) -> Option<usize> {
    index.nearest(point).and_then(|camera| segment_of_camera(table, camera))
}
