extern crate nalgebra as na;

use log::info;
use na::{Vector3, Matrix3, Matrix3xX, UnitQuaternion};
use crate::alignment::{AlignmentError, correspondence::CorrespondenceSet};
use crate::numerics::{mean, median, pose::rotate_orientation};
use crate::Float;

/**
 * Spread below this is treated as all points coinciding. Applies to both point sets.
 */
pub const COINCIDENT_EPS: Float = 1e-12;

/**
 * Ratio of the second to the first singular value of a centered point set
 * below which the points are treated as collinear.
 */
pub const COLLINEAR_EPS: Float = 1e-6;

/**
 * Similarity mapping reconstruction frame into tracker frame:
 * p' = scale * R * (p - reconstruction_centroid) + tracker_centroid
 */
#[derive(Debug,Clone,PartialEq)]
pub struct GlobalTransform {
    scale: Float,
    rotation: Matrix3<Float>,
    reconstruction_centroid: Vector3<Float>,
    tracker_centroid: Vector3<Float>,
    mean_error: Float,
    median_error: Float
}

impl GlobalTransform {

    /**
     * Residual statistics are zero until `evaluate` is called.
     */
    pub fn from_parts(scale: Float, rotation: Matrix3<Float>, reconstruction_centroid: Vector3<Float>, tracker_centroid: Vector3<Float>) -> GlobalTransform {
        GlobalTransform { scale, rotation, reconstruction_centroid, tracker_centroid, mean_error: 0.0, median_error: 0.0 }
    }

    pub fn with_statistics(self, mean_error: Float, median_error: Float) -> GlobalTransform {
        GlobalTransform { mean_error, median_error, ..self }
    }

    /**
     * Identity mapping with its residuals measured on the set. Used when the reconstruction was already
     * constrained to tracker frame, or as an explicit fallback.
     */
    pub fn identity(correspondences: &CorrespondenceSet) -> GlobalTransform {
        GlobalTransform::from_parts(1.0, Matrix3::<Float>::identity(), Vector3::<Float>::zeros(), Vector3::<Float>::zeros()).evaluate(correspondences)
    }

    pub fn scale(&self) -> Float { self.scale }
    pub fn rotation(&self) -> &Matrix3<Float> { &self.rotation }
    pub fn reconstruction_centroid(&self) -> &Vector3<Float> { &self.reconstruction_centroid }
    pub fn tracker_centroid(&self) -> &Vector3<Float> { &self.tracker_centroid }
    pub fn mean_error(&self) -> Float { self.mean_error }
    pub fn median_error(&self) -> Float { self.median_error }

    pub fn transform_point(&self, point: &Vector3<Float>) -> Vector3<Float> {
        self.scale*(self.rotation*(point - self.reconstruction_centroid)) + self.tracker_centroid
    }

    /**
     * Directions only see the rotation.
     */
    pub fn transform_direction(&self, direction: &Vector3<Float>) -> Vector3<Float> {
        self.rotation*direction
    }

    pub fn transform_orientation(&self, orientation: &UnitQuaternion<Float>) -> UnitQuaternion<Float> {
        rotate_orientation(&self.rotation, orientation)
    }

    pub fn residuals(&self, correspondences: &CorrespondenceSet) -> Vec<Float> {
        correspondences.pairs().iter().map(|c| (self.transform_point(&c.reconstruction_position) - c.tracker_position).norm()).collect()
    }

    /**
     * Recomputes mean and median residual on the given set.
     */
    pub fn evaluate(self, correspondences: &CorrespondenceSet) -> GlobalTransform {
        let residuals = self.residuals(correspondences);
        let mean_error = mean(&residuals);
        let (median_error, _) = median(residuals, true);
        self.with_statistics(mean_error, median_error)
    }
}

fn degenerate(correspondences: &CorrespondenceSet, reason: &str) -> AlignmentError {
    degenerate_with_extents(correspondences, correspondences.reconstruction_extents(), reason)
}

fn degenerate_with_extents(correspondences: &CorrespondenceSet, extents: [Float; 3], reason: &str) -> AlignmentError {
    AlignmentError::DegenerateGeometry {
        matched: correspondences.len(),
        extents,
        reason: reason.to_string()
    }
}

/**
 * Why a centered point set cannot fix a similarity: all points coincide or they lie on one line.
 */
fn spread_defect(centered: &Matrix3xX<Float>) -> Option<&'static str> {
    if centered.norm() < COINCIDENT_EPS {
        return Some("coincide");
    }

    let covariance: Matrix3<Float> = centered*centered.transpose();
    let mut eigenvalues = covariance.symmetric_eigenvalues().iter().map(|v| v.max(0.0)).collect::<Vec<Float>>();
    eigenvalues.sort_unstable_by(|a, b| b.total_cmp(a));
    match (eigenvalues[1]/eigenvalues[0]).sqrt() < COLLINEAR_EPS {
        true => Some("are collinear"),
        false => None
    }
}

fn centered(points: &Matrix3xX<Float>, centroid: &Vector3<Float>) -> Matrix3xX<Float> {
    let mut centered = points.clone();
    for mut column in centered.column_iter_mut() {
        column -= centroid;
    }
    centered
}

/**
 * Scale is the ratio of Frobenius norms of the centered point sets, rotation is the orthogonal
 * Procrustes solution with det(R) = +1.
 */
pub fn estimate_global_transform(correspondences: &CorrespondenceSet, min_correspondences: usize) -> Result<GlobalTransform, AlignmentError> {
    correspondences.ensure_minimum(min_correspondences)?;
    if correspondences.len() < 3 {
        return Err(degenerate(correspondences, "at least three correspondences are needed"));
    }

    let reconstruction = correspondences.reconstruction_matrix();
    let tracker = correspondences.tracker_matrix();
    let reconstruction_centroid = reconstruction.column_mean();
    let tracker_centroid = tracker.column_mean();
    let reconstruction_centered = centered(&reconstruction, &reconstruction_centroid);
    let tracker_centered = centered(&tracker, &tracker_centroid);

    if let Some(defect) = spread_defect(&reconstruction_centered) {
        return Err(degenerate(correspondences, &format!("reconstruction positions {}", defect)));
    }
    // A rank one H leaves the rotation free, and coinciding tracker points would give scale 0
    if let Some(defect) = spread_defect(&tracker_centered) {
        return Err(degenerate_with_extents(correspondences, correspondences.tracker_extents(), &format!("tracker positions {}", defect)));
    }

    let scale = tracker_centered.norm()/reconstruction_centered.norm();

    // Points as rows: H = A^T B with A reconstruction, B tracker
    let h: Matrix3<Float> = &reconstruction_centered*tracker_centered.transpose();
    let svd = h.svd(true,true);
    let u = svd.u.ok_or_else(|| degenerate(correspondences, "svd did not produce U"))?;
    let v_t = svd.v_t.ok_or_else(|| degenerate(correspondences, "svd did not produce V^T"))?;

    let mut v = v_t.transpose();
    if (v*u.transpose()).determinant() < 0.0 {
        let smallest = svd.singular_values.imin();
        v.column_mut(smallest).neg_mut();
    }
    let rotation = v*u.transpose();

    let transform = GlobalTransform::from_parts(scale, rotation, reconstruction_centroid, tracker_centroid).evaluate(correspondences);
    info!("global transform: scale {:.5}, mean error {:.4} m, median error {:.4} m over {} correspondences",
        transform.scale(), transform.mean_error(), transform.median_error(), correspondences.len());
    Ok(transform)
}
