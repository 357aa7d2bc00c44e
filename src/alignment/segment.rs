extern crate nalgebra as na;

use log::{debug, info, warn};
use na::Vector3;
use crate::alignment::{AlignmentError, correspondence::CorrespondenceSet, similarity::GlobalTransform};
use crate::numerics::{mean, median};
use crate::Float;

pub const DEFAULT_SEGMENT_DURATION: Float = 2.0;

/**
 * Upper bound on windows per matched camera.
 */
pub const MAX_WINDOWS_PER_CORRESPONDENCE: usize = 100;

#[derive(Debug,Clone,PartialEq)]
pub struct Segment {
    pub index: usize,
    pub start_time: Float,
    pub end_time: Float,
    pub offset: Vector3<Float>,
    pub correspondence_count: usize,
    /// Window whose offset was copied because this one had no correspondences
    pub inherited_from: Option<usize>,
    pub substituted_orientation: bool
}

/**
 * A matched camera after the global transform, with the window its timestamp falls into.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct SegmentCamera {
    pub id: String,
    pub position: Vector3<Float>,
    pub timestamp: Float,
    pub segment: usize
}

/**
 * Piecewise constant translation corrections over fixed duration windows.
 * Offsets are added after the global transform.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct SegmentCorrectionTable {
    segment_duration: Float,
    start_time: Float,
    segments: Vec<Segment>,
    cameras: Vec<SegmentCamera>,
    mean_error: Float,
    median_error: Float
}

impl SegmentCorrectionTable {

    pub fn from_parts(segment_duration: Float, start_time: Float, segments: Vec<Segment>, cameras: Vec<SegmentCamera>, mean_error: Float, median_error: Float) -> Result<SegmentCorrectionTable, AlignmentError> {
        validate_duration(segment_duration)?;
        if segments.is_empty() {
            return Err(AlignmentError::InvalidConfiguration("segment table without segments".to_string()));
        }
        if let Some(camera) = cameras.iter().find(|c| c.segment >= segments.len()) {
            return Err(AlignmentError::InvalidConfiguration(format!("camera {} refers to segment {} of {}", camera.id, camera.segment, segments.len())));
        }
        Ok(SegmentCorrectionTable { segment_duration, start_time, segments, cameras, mean_error, median_error })
    }

    pub fn segment_duration(&self) -> Float { self.segment_duration }
    pub fn start_time(&self) -> Float { self.start_time }
    pub fn segments(&self) -> &Vec<Segment> { &self.segments }
    pub fn cameras(&self) -> &Vec<SegmentCamera> { &self.cameras }
    pub fn mean_error(&self) -> Float { self.mean_error }
    pub fn median_error(&self) -> Float { self.median_error }

    pub fn segment_index(&self, timestamp: Float) -> usize {
        window_index(timestamp, self.start_time, self.segment_duration, self.segments.len())
    }

    pub fn offset(&self, segment: usize) -> Option<&Vector3<Float>> {
        self.segments.get(segment).map(|s| &s.offset)
    }

    pub fn substitutes_orientation(&self) -> bool {
        self.segments.iter().any(|s| s.substituted_orientation)
    }
}

fn validate_duration(segment_duration: Float) -> Result<(), AlignmentError> {
    match segment_duration {
        d if d.is_finite() && d > 0.0 => Ok(()),
        d => Err(AlignmentError::InvalidConfiguration(format!("segment duration must be positive, got {}", d)))
    }
}

/**
 * Windows needed to cover `span`. Errors when the count is out of proportion to the correspondences,
 * which happens with outlying or differently based timestamps.
 */
fn window_count(span: Float, segment_duration: Float, correspondences: usize) -> Result<usize, AlignmentError> {
    let windows = (span/segment_duration).ceil().max(1.0);
    let limit = MAX_WINDOWS_PER_CORRESPONDENCE*correspondences.max(1);
    match windows <= limit as Float {
        true => Ok(windows as usize),
        false => Err(AlignmentError::InvalidConfiguration(format!(
            "timestamps span {} s, {} s windows would need {} windows for {} correspondences (limit {}), check for outlying timestamps",
            span, segment_duration, windows, correspondences, limit)))
    }
}

fn window_index(timestamp: Float, start_time: Float, segment_duration: Float, count: usize) -> usize {
    let raw = ((timestamp - start_time)/segment_duration).floor();
    match raw {
        r if r <= 0.0 => 0,
        r => (r as usize).min(count - 1)
    }
}

/**
 * For every empty window the nearest window that has correspondences, by window index.
 * Ties go to the earlier window. Populated windows map to None.
 */
fn inheritance_sources(counts: &[usize]) -> Vec<Option<usize>> {
    let mut previous = vec![None; counts.len()];
    let mut last = None;
    for (i, &n) in counts.iter().enumerate() {
        if n > 0 {
            last = Some(i);
        }
        previous[i] = last;
    }

    let mut sources = vec![None; counts.len()];
    let mut next = None;
    for i in (0..counts.len()).rev() {
        if counts[i] > 0 {
            next = Some(i);
            continue;
        }
        sources[i] = match (previous[i], next) {
            (Some(p), Some(n)) if n - i < i - p => Some(n),
            (Some(p), _) => Some(p),
            (None, n) => n
        };
    }
    sources
}

/**
 * Partitions the matched cameras by timestamp into windows of `segment_duration` seconds and stores the mean
 * residual vector (tracker - globally aligned) of each window as its offset.
 *
 * A single window carries a zero offset: the mean residual over all correspondences is already removed by the
 * centroid alignment of the global transform.
 */
pub fn compute_segment_corrections(global: &GlobalTransform, correspondences: &CorrespondenceSet, segment_duration: Float, substitute_orientation: bool) -> Result<SegmentCorrectionTable, AlignmentError> {
    validate_duration(segment_duration)?;
    if correspondences.is_empty() {
        return Err(AlignmentError::InsufficientCorrespondence { matched: 0, required: 1, tracker_frames: correspondences.tracker_frames() });
    }

    let missing = correspondences.pairs().iter().filter(|c| c.timestamp.is_none()).collect::<Vec<_>>();
    if let Some(first) = missing.first() {
        return Err(AlignmentError::MissingTimestamp { missing: missing.len(), first_id: first.id.clone() });
    }

    let timestamps = correspondences.pairs().iter().filter_map(|c| c.timestamp).collect::<Vec<Float>>();
    let start_time = timestamps.iter().copied().fold(Float::INFINITY, Float::min);
    let end_time = timestamps.iter().copied().fold(Float::NEG_INFINITY, Float::max);
    let count = window_count(end_time - start_time, segment_duration, correspondences.len())?;

    let aligned = correspondences.pairs().iter().map(|c| global.transform_point(&c.reconstruction_position)).collect::<Vec<Vector3<Float>>>();
    let assignment = timestamps.iter().map(|&t| window_index(t, start_time, segment_duration, count)).collect::<Vec<usize>>();

    let mut sums = vec![Vector3::<Float>::zeros(); count];
    let mut counts = vec![0usize; count];
    for ((pair, aligned_position), &segment) in correspondences.pairs().iter().zip(aligned.iter()).zip(assignment.iter()) {
        sums[segment] += pair.tracker_position - aligned_position;
        counts[segment] += 1;
    }

    let own_offsets = sums.iter().zip(counts.iter()).map(|(sum, &n)| match (count, n) {
        (1, _) => Vector3::<Float>::zeros(),
        (_, 0) => Vector3::<Float>::zeros(),
        (_, n) => sum/(n as Float)
    }).collect::<Vec<Vector3<Float>>>();

    let sources = inheritance_sources(&counts);
    let mut segments = Vec::<Segment>::with_capacity(count);
    for (index, &inherited_from) in sources.iter().enumerate() {
        let offset = match inherited_from {
            Some(source) => {
                warn!("segment {} has no correspondences, inheriting offset of segment {}", index, source);
                own_offsets[source]
            },
            None => own_offsets[index]
        };

        let segment = Segment {
            index,
            start_time: start_time + (index as Float)*segment_duration,
            end_time: start_time + ((index + 1) as Float)*segment_duration,
            offset,
            correspondence_count: counts[index],
            inherited_from,
            substituted_orientation: substitute_orientation
        };
        debug!("segment {}: [{:.3}, {:.3}) {} correspondences, offset [{:.4}, {:.4}, {:.4}]",
            index, segment.start_time, segment.end_time, segment.correspondence_count, offset.x, offset.y, offset.z);
        segments.push(segment);
    }

    let cameras = correspondences.pairs().iter().zip(aligned.iter()).zip(assignment.iter()).zip(timestamps.iter())
        .map(|(((pair, aligned_position), &segment), &timestamp)| SegmentCamera { id: pair.id.clone(), position: *aligned_position, timestamp, segment })
        .collect::<Vec<SegmentCamera>>();

    let residuals = correspondences.pairs().iter().zip(aligned.iter()).zip(assignment.iter())
        .map(|((pair, aligned_position), &segment)| (aligned_position + segments[segment].offset - pair.tracker_position).norm())
        .collect::<Vec<Float>>();
    let mean_error = mean(&residuals);
    let (median_error, _) = median(residuals, true);

    info!("segment correction: {} windows of {:.2} s, mean error {:.4} m, median error {:.4} m", count, segment_duration, mean_error, median_error);
    SegmentCorrectionTable::from_parts(segment_duration, start_time, segments, cameras, mean_error, median_error)
}
