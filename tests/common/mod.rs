#![allow(dead_code)]

extern crate nalgebra as na;

use na::{Vector3, Rotation3, UnitQuaternion};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use frame_alignment::trajectory::{TrackerPose, ReconstructionPose};
use frame_alignment::Float;

pub const FRAME_INTERVAL: Float = 0.1;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/**
 * Reconstruction to tracker similarity used to generate the synthetic streams: tracker = s * R * recon + t
 */
pub struct TrueSimilarity {
    pub scale: Float,
    pub rotation: Rotation3<Float>,
    pub translation: Vector3<Float>
}

impl TrueSimilarity {
    pub fn apply(&self, p: &Vector3<Float>) -> Vector3<Float> {
        self.scale*(self.rotation*p) + self.translation
    }
}

pub fn true_similarity() -> TrueSimilarity {
    TrueSimilarity {
        scale: 2.5,
        rotation: Rotation3::from_euler_angles(0.3, -0.5, 1.1),
        translation: Vector3::<Float>::new(1.0, -2.0, 0.5)
    }
}

pub fn frame_id(i: usize) -> String {
    format!("frame_{:05}", i)
}

/**
 * Curved walk in reconstruction frame, never collinear.
 */
pub fn reconstruction_walk(n: usize) -> Vec<Vector3<Float>> {
    (0..n).map(|i| {
        let s = i as Float;
        Vector3::<Float>::new((0.2*s).cos(), (0.3*s).sin(), 0.05*s)
    }).collect()
}

pub fn tracker_orientation(i: usize) -> UnitQuaternion<Float> {
    let s = i as Float;
    UnitQuaternion::<Float>::from_euler_angles(0.02*s, -0.01*s, 0.05*s)
}

/**
 * Noise free streams. Reconstruction orientations are the tracker orientations seen from reconstruction frame.
 */
pub fn synthetic_streams(n: usize, similarity: &TrueSimilarity) -> (Vec<TrackerPose>, Vec<ReconstructionPose>) {
    let walk = reconstruction_walk(n);
    let rotation_inverse = UnitQuaternion::<Float>::from_rotation_matrix(&similarity.rotation).inverse();
    let tracker = walk.iter().enumerate()
        .map(|(i, p)| TrackerPose::new(&frame_id(i), similarity.apply(p), tracker_orientation(i), (i as Float)*FRAME_INTERVAL))
        .collect::<Vec<TrackerPose>>();
    let reconstruction = walk.iter().enumerate()
        .map(|(i, p)| ReconstructionPose::with_orientation(&frame_id(i), *p, rotation_inverse*tracker_orientation(i)))
        .collect::<Vec<ReconstructionPose>>();
    (tracker, reconstruction)
}

/**
 * Adds gaussian noise and a slow translational drift growing with time to the tracker positions.
 */
pub fn drifting_streams(n: usize, similarity: &TrueSimilarity, noise_sigma: Float, drift_per_second: Vector3<Float>, seed: u64) -> (Vec<TrackerPose>, Vec<ReconstructionPose>) {
    let (mut tracker, reconstruction) = synthetic_streams(n, similarity);
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise_sigma).expect("valid sigma");
    for pose in tracker.iter_mut() {
        let t = pose.timestamp.expect("synthetic poses are timestamped");
        let noise = Vector3::<Float>::new(normal.sample(&mut rng), normal.sample(&mut rng), normal.sample(&mut rng));
        pose.position += drift_per_second*t + noise;
    }
    (tracker, reconstruction)
}
