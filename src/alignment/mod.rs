extern crate nalgebra as na;

use std::fmt;
use log::{info, warn};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::trajectory::{TrackerPose, ReconstructionPose};
use crate::Float;

pub mod correspondence;
pub mod similarity;
pub mod segment;
pub mod nearest;
pub mod applicator;

use self::correspondence::{CorrespondenceSet, match_poses};
use self::similarity::{GlobalTransform, estimate_global_transform};
use self::segment::{SegmentCorrectionTable, compute_segment_corrections, DEFAULT_SEGMENT_DURATION};
use self::applicator::CompositeTransform;

pub const DEFAULT_MIN_CORRESPONDENCES: usize = 10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("need at least {required} correspondences, matched {matched} of {tracker_frames} tracker frames")]
    InsufficientCorrespondence { matched: usize, required: usize, tracker_frames: usize },
    #[error("degenerate geometry over {matched} correspondences (extents {extents:?}): {reason}")]
    DegenerateGeometry { matched: usize, extents: [Float; 3], reason: String },
    #[error("{missing} poses lack a timestamp, first is frame {first_id}")]
    MissingTimestamp { missing: usize, first_id: String },
    #[error("invalid alignment configuration: {0}")]
    InvalidConfiguration(String)
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    GlobalOnly,
    GlobalWithSegments,
    /// Reconstruction was run with tracker poses as priors and is already in tracker frame
    PriorConstrained
}

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub strategy: Strategy,
    pub segment_duration: Float,
    pub substitute_orientation: bool,
    pub min_correspondences: usize,
    pub max_camera_distance: Option<Float>,
    pub fallback_to_identity: bool
}

impl Default for AlignmentConfig {
    fn default() -> AlignmentConfig {
        AlignmentConfig {
            strategy: Strategy::GlobalWithSegments,
            segment_duration: DEFAULT_SEGMENT_DURATION,
            substitute_orientation: false,
            min_correspondences: DEFAULT_MIN_CORRESPONDENCES,
            max_camera_distance: None,
            fallback_to_identity: false
        }
    }
}

impl AlignmentConfig {
    pub fn validate(&self) -> Result<(), AlignmentError> {
        if self.min_correspondences == 0 {
            return Err(AlignmentError::InvalidConfiguration("min_correspondences must be at least 1".to_string()));
        }
        if !(self.segment_duration.is_finite() && self.segment_duration > 0.0) {
            return Err(AlignmentError::InvalidConfiguration(format!("segment_duration must be positive, got {}", self.segment_duration)));
        }
        if let Some(d) = self.max_camera_distance {
            if !(d.is_finite() && d >= 0.0) {
                return Err(AlignmentError::InvalidConfiguration(format!("max_camera_distance must be non negative, got {}", d)));
            }
        }
        Ok(())
    }
}

/**
 * How an output was produced. Persisted with every alignment artifact.
 */
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub struct AlignmentMethod {
    pub strategy: Strategy,
    pub orientation_substitution: bool,
    pub identity_fallback: bool
}

impl fmt::Display for AlignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut display = String::from(match (self.identity_fallback, self.strategy) {
            (true, _) => "identity_fallback",
            (false, Strategy::GlobalOnly) => "global",
            (false, Strategy::GlobalWithSegments) => "global+segment",
            (false, Strategy::PriorConstrained) => "prior_constrained"
        });
        if self.orientation_substitution {
            display.push_str("+orientation");
        }
        write!(f, "{}", display)
    }
}

/**
 * Everything one alignment invocation produced. Only complete runs exist, so anything built from this is
 * safe to persist.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct AlignmentRun {
    pub config: AlignmentConfig,
    pub method: AlignmentMethod,
    pub correspondences: CorrespondenceSet,
    pub global: GlobalTransform,
    pub segments: Option<SegmentCorrectionTable>
}

impl AlignmentRun {
    pub fn composite(&self) -> CompositeTransform {
        CompositeTransform::new(self.global.clone(), self.segments.clone(), self.config.max_camera_distance, self.config.substitute_orientation)
    }

    /**
     * Identity transform with its measured error, for callers whose policy is to keep going when a fit is not possible.
     */
    pub fn identity_fallback(correspondences: CorrespondenceSet, config: &AlignmentConfig) -> AlignmentRun {
        let global = GlobalTransform::identity(&correspondences);
        warn!("falling back to the identity transform, mean error {:.4} m over {} correspondences", global.mean_error(), correspondences.len());
        AlignmentRun {
            config: *config,
            method: AlignmentMethod { strategy: config.strategy, orientation_substitution: config.substitute_orientation, identity_fallback: true },
            correspondences,
            global,
            segments: None
        }
    }
}

/**
 * Matcher, global solver and, depending on the strategy, the segment corrector.
 */
pub fn align_matched(correspondences: CorrespondenceSet, config: &AlignmentConfig) -> Result<AlignmentRun, AlignmentError> {
    config.validate()?;

    let global = match config.strategy {
        Strategy::PriorConstrained => {
            correspondences.ensure_minimum(config.min_correspondences)?;
            GlobalTransform::identity(&correspondences)
        },
        Strategy::GlobalOnly | Strategy::GlobalWithSegments => estimate_global_transform(&correspondences, config.min_correspondences)?
    };

    let segments = match config.strategy {
        Strategy::GlobalWithSegments => Some(compute_segment_corrections(&global, &correspondences, config.segment_duration, config.substitute_orientation)?),
        Strategy::GlobalOnly | Strategy::PriorConstrained => None
    };

    let method = AlignmentMethod { strategy: config.strategy, orientation_substitution: config.substitute_orientation, identity_fallback: false };
    info!("alignment finished with method {}", method);
    Ok(AlignmentRun { config: *config, method, correspondences, global, segments })
}

pub fn align(tracker: &[TrackerPose], reconstruction: &[ReconstructionPose], config: &AlignmentConfig) -> Result<AlignmentRun, AlignmentError> {
    align_matched(match_poses(tracker, reconstruction), config)
}
