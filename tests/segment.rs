mod common;

extern crate nalgebra as na;

use na::{Vector3, Matrix3};
use approx::assert_relative_eq;
use frame_alignment::alignment::{AlignmentError, AlignmentConfig, Strategy, align};
use frame_alignment::alignment::correspondence::{Correspondence, CorrespondenceSet, match_poses};
use frame_alignment::alignment::similarity::{GlobalTransform, estimate_global_transform};
use frame_alignment::alignment::segment::compute_segment_corrections;
use frame_alignment::alignment::applicator::CompositeTransform;
use frame_alignment::numerics::mean;
use frame_alignment::Float;

fn identity_global() -> GlobalTransform {
    GlobalTransform::from_parts(1.0, Matrix3::<Float>::identity(), Vector3::<Float>::zeros(), Vector3::<Float>::zeros())
}

/**
 * Tracker = reconstruction + offset, one entry per (timestamp, offset).
 */
fn offset_set(samples: &[(Option<Float>, Vector3<Float>)]) -> CorrespondenceSet {
    let walk = common::reconstruction_walk(samples.len());
    let pairs = samples.iter().zip(walk.iter()).enumerate().map(|(i, ((timestamp, offset), p))| Correspondence {
        id: common::frame_id(i),
        tracker_position: p + offset,
        reconstruction_position: *p,
        tracker_orientation: common::tracker_orientation(i),
        timestamp: *timestamp
    }).collect::<Vec<Correspondence>>();
    CorrespondenceSet::new(pairs, samples.len())
}

#[test]
fn single_window_is_a_no_op() {
    common::init_logging();
    let (tracker, reconstruction) = common::drifting_streams(15, &common::true_similarity(), 0.01, Vector3::<Float>::new(0.0, 0.05, 0.0), 5);
    let set = match_poses(&tracker, &reconstruction);
    let global = estimate_global_transform(&set, 10).expect("well conditioned input");

    let table = compute_segment_corrections(&global, &set, 2.0, false).expect("timestamped input");

    assert_eq!(table.segments().len(), 1);
    assert_eq!(table.segments()[0].offset, Vector3::<Float>::zeros());
    assert_eq!(table.segments()[0].correspondence_count, 15);

    let composite = CompositeTransform::new(global.clone(), Some(table), None, false);
    for c in set.pairs() {
        assert_eq!(composite.transform_point(&c.reconstruction_position), global.transform_point(&c.reconstruction_position));
    }
}

#[test]
fn offsets_are_mean_residuals_per_window() {
    let a = Vector3::<Float>::new(0.1, 0.0, 0.0);
    let b = Vector3::<Float>::new(0.0, -0.2, 0.0);
    let b_noisy = Vector3::<Float>::new(0.0, -0.4, 0.0);
    let set = offset_set(&[(Some(10.0), a), (Some(11.0), a), (Some(12.5), b), (Some(13.9), b_noisy)]);

    let table = compute_segment_corrections(&identity_global(), &set, 2.0, false).expect("timestamped input");

    assert_eq!(table.segments().len(), 2);
    assert_eq!(table.start_time(), 10.0);
    assert_relative_eq!(table.segments()[0].offset, a, epsilon = 1e-12);
    assert_relative_eq!(table.segments()[1].offset, Vector3::<Float>::new(0.0, -0.3, 0.0), epsilon = 1e-12);
    assert_relative_eq!(table.segments()[1].start_time, 12.0);
    assert_relative_eq!(table.segments()[1].end_time, 14.0);
    assert_relative_eq!(table.mean_error(), 0.05, epsilon = 1e-12);
    assert_relative_eq!(table.median_error(), 0.05, epsilon = 1e-12);
}

#[test]
fn window_boundaries_and_the_final_timestamp() {
    let zero = Vector3::<Float>::zeros();
    let set = offset_set(&[(Some(0.0), zero), (Some(2.0), zero), (Some(3.0), zero), (Some(4.0), zero)]);

    let table = compute_segment_corrections(&identity_global(), &set, 2.0, false).expect("timestamped input");

    assert_eq!(table.segments().len(), 2);
    assert_eq!(table.segment_index(0.0), 0);
    assert_eq!(table.segment_index(1.999), 0);
    assert_eq!(table.segment_index(2.0), 1);
    assert_eq!(table.segment_index(4.0), 1);
    let assigned = table.cameras().iter().map(|c| c.segment).collect::<Vec<usize>>();
    assert_eq!(assigned, vec![0, 1, 1, 1]);
}

#[test]
fn empty_windows_inherit_from_the_nearest_populated_window() {
    let a = Vector3::<Float>::new(0.1, 0.0, 0.0);
    let d = Vector3::<Float>::new(0.0, 0.0, 0.3);
    // windows of 2 s over [0, 7]: 0 and 3 populated, 1 and 2 empty
    let set = offset_set(&[(Some(0.0), a), (Some(0.5), a), (Some(6.5), d), (Some(7.0), d)]);

    let table = compute_segment_corrections(&identity_global(), &set, 2.0, false).expect("timestamped input");
    let segments = table.segments();

    assert_eq!(segments.len(), 4);
    assert_eq!(segments[1].correspondence_count, 0);
    assert_eq!(segments[1].inherited_from, Some(0));
    assert_eq!(segments[1].offset, segments[0].offset);
    assert_eq!(segments[2].correspondence_count, 0);
    assert_eq!(segments[2].inherited_from, Some(3));
    assert_eq!(segments[2].offset, segments[3].offset);
    assert_eq!(segments[0].inherited_from, None);
    assert_relative_eq!(segments[3].offset, d, epsilon = 1e-12);
}

#[test]
fn equidistant_empty_window_inherits_from_the_earlier_one() {
    let a = Vector3::<Float>::new(0.1, 0.0, 0.0);
    let c = Vector3::<Float>::new(0.0, 0.2, 0.0);
    let set = offset_set(&[(Some(0.0), a), (Some(1.0), a), (Some(4.5), c), (Some(5.9), c)]);

    let table = compute_segment_corrections(&identity_global(), &set, 2.0, false).expect("timestamped input");

    assert_eq!(table.segments().len(), 3);
    assert_eq!(table.segments()[1].inherited_from, Some(0));
    assert_relative_eq!(table.segments()[1].offset, a, epsilon = 1e-12);
}

#[test]
fn long_empty_stretches_split_at_the_midpoint() {
    let a = Vector3::<Float>::new(0.1, 0.0, 0.0);
    let c = Vector3::<Float>::new(0.0, 0.2, 0.0);
    // 200 windows of 2 s, only the first and the last populated
    let set = offset_set(&[(Some(0.0), a), (Some(399.0), c)]);

    let table = compute_segment_corrections(&identity_global(), &set, 2.0, false).expect("timestamped input");
    let segments = table.segments();

    assert_eq!(segments.len(), 200);
    assert!(segments[1..100].iter().all(|s| s.inherited_from == Some(0)));
    assert!(segments[100..199].iter().all(|s| s.inherited_from == Some(199)));
    assert_eq!(segments[199].inherited_from, None);
    assert_relative_eq!(segments[99].offset, a, epsilon = 1e-12);
    assert_relative_eq!(segments[100].offset, c, epsilon = 1e-12);
}

#[test]
fn outlying_timestamp_that_explodes_the_window_count_is_rejected() {
    let zero = Vector3::<Float>::zeros();
    let mut samples = (0..11).map(|i| (Some(1.0e7 + 0.1*(i as Float)), zero)).collect::<Vec<_>>();
    samples.push((Some(0.0), zero));
    let set = offset_set(&samples);

    match compute_segment_corrections(&identity_global(), &set, 2.0, false) {
        Err(AlignmentError::InvalidConfiguration(reason)) => assert!(reason.contains("12 correspondences")),
        other => panic!("expected a rejected window count, got {:?}", other)
    }
}

#[test]
fn segment_correction_reduces_drift_error() {
    let (tracker, reconstruction) = common::drifting_streams(100, &common::true_similarity(), 0.01, Vector3::<Float>::new(0.06, -0.04, 0.05), 21);
    let config = AlignmentConfig { strategy: Strategy::GlobalWithSegments, ..AlignmentConfig::default() };

    let run = align(&tracker, &reconstruction, &config).expect("alignment succeeds");
    let table = run.segments.as_ref().expect("segments were requested");

    assert_eq!(table.segments().len(), 5);
    assert!(table.segments().iter().all(|s| s.inherited_from.is_none()));
    assert!(table.mean_error() < run.global.mean_error());
    assert!(table.median_error() < run.global.median_error());

    let corrected = run.composite().residuals(&run.correspondences);
    assert!(mean(&corrected) < run.global.mean_error());
    assert_eq!(run.method.to_string(), "global+segment");
}

#[test]
fn missing_timestamps_are_reported() {
    let zero = Vector3::<Float>::zeros();
    let set = offset_set(&[(Some(0.0), zero), (None, zero), (Some(1.0), zero), (None, zero)]);

    assert_eq!(
        compute_segment_corrections(&identity_global(), &set, 2.0, false),
        Err(AlignmentError::MissingTimestamp { missing: 2, first_id: common::frame_id(1) })
    );
}

#[test]
fn non_positive_duration_is_rejected() {
    let zero = Vector3::<Float>::zeros();
    let set = offset_set(&[(Some(0.0), zero), (Some(1.0), zero)]);

    for duration in [0.0, -1.0, Float::NAN] {
        assert!(matches!(compute_segment_corrections(&identity_global(), &set, duration, false), Err(AlignmentError::InvalidConfiguration(_))));
    }
    let config = AlignmentConfig { segment_duration: 0.0, ..AlignmentConfig::default() };
    assert!(matches!(config.validate(), Err(AlignmentError::InvalidConfiguration(_))));
}

#[test]
fn substitution_flag_is_recorded_per_segment() {
    let zero = Vector3::<Float>::zeros();
    let set = offset_set(&[(Some(0.0), zero), (Some(3.0), zero), (Some(5.0), zero)]);

    let table = compute_segment_corrections(&identity_global(), &set, 2.0, true).expect("timestamped input");

    assert!(table.substitutes_orientation());
    assert!(table.segments().iter().all(|s| s.substituted_orientation));
}
