mod common;

extern crate nalgebra as na;

use na::{Vector3, Matrix3, Rotation3, UnitQuaternion};
use approx::assert_relative_eq;
use frame_alignment::alignment::{AlignmentConfig, Strategy, align};
use frame_alignment::alignment::similarity::GlobalTransform;
use frame_alignment::alignment::segment::{Segment, SegmentCamera, SegmentCorrectionTable};
use frame_alignment::alignment::applicator::{CompositeTransform, pass_through_tags, compare_tags};
use frame_alignment::geometry::{PointCloud, Mesh, TagPosition};
use frame_alignment::trajectory::{Trajectory, CoordinateSystem};
use frame_alignment::numerics::pose::angular_distance;
use frame_alignment::Float;

fn quarter_turn_global() -> GlobalTransform {
    let rotation = *Rotation3::<Float>::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2).matrix();
    GlobalTransform::from_parts(2.0, rotation, Vector3::<Float>::zeros(), Vector3::<Float>::new(10.0, 0.0, 0.0))
}

/**
 * Two windows with cameras at the aligned positions (10,0,0) and (10,20,0).
 */
fn two_window_table() -> SegmentCorrectionTable {
    let segments = (0..2).map(|index| Segment {
        index,
        start_time: 2.0*(index as Float),
        end_time: 2.0*((index + 1) as Float),
        offset: match index { 0 => Vector3::<Float>::new(0.0, 0.0, 1.0), _ => Vector3::<Float>::new(0.0, 0.0, -1.0) },
        correspondence_count: 1,
        inherited_from: None,
        substituted_orientation: false
    }).collect::<Vec<Segment>>();
    let cameras = vec!(
        SegmentCamera { id: "a".to_string(), position: Vector3::<Float>::new(10.0, 0.0, 0.0), timestamp: 0.0, segment: 0 },
        SegmentCamera { id: "b".to_string(), position: Vector3::<Float>::new(10.0, 20.0, 0.0), timestamp: 3.0, segment: 1 }
    );
    SegmentCorrectionTable::from_parts(2.0, 0.0, segments, cameras, 0.0, 0.0).expect("consistent table")
}

#[test]
fn point_rule_is_global_then_segment_offset() {
    common::init_logging();
    let composite = CompositeTransform::new(quarter_turn_global(), Some(two_window_table()), None, false);

    // (1,0,0) -> rotated (0,1,0) -> scaled (0,2,0) -> (10,2,0), nearest camera a
    assert_relative_eq!(composite.transform_point(&Vector3::<Float>::new(1.0, 0.0, 0.0)), Vector3::<Float>::new(10.0, 2.0, 1.0), epsilon = 1e-12);
    // (9,0,0) -> (10,18,0), nearest camera b
    assert_relative_eq!(composite.transform_point(&Vector3::<Float>::new(9.0, 0.0, 0.0)), Vector3::<Float>::new(10.0, 18.0, -1.0), epsilon = 1e-12);
}

#[test]
fn point_cloud_points_move_and_normals_rotate() {
    let composite = CompositeTransform::new(quarter_turn_global(), Some(two_window_table()), Some(3.0), false);
    let mut cloud = PointCloud::from_points(vec!(
        Vector3::<Float>::new(0.0, 0.0, 0.0),
        Vector3::<Float>::new(9.5, 0.0, 0.0),
        Vector3::<Float>::new(5.0, 0.0, 0.0)
    ));
    cloud.normals = Some(vec![Vector3::<Float>::x(); 3]);
    cloud.colors = Some(vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]]);

    let report = composite.apply_to_point_cloud(&mut cloud);

    assert_eq!(report.transformed, 3);
    assert_eq!(report.without_camera, 1);
    assert_relative_eq!(cloud.points[0], Vector3::<Float>::new(10.0, 0.0, 1.0), epsilon = 1e-12);
    assert_relative_eq!(cloud.points[1], Vector3::<Float>::new(10.0, 19.0, -1.0), epsilon = 1e-12);
    // aligned (10,10,0) is 10 m from both cameras, global only
    assert_relative_eq!(cloud.points[2], Vector3::<Float>::new(10.0, 10.0, 0.0), epsilon = 1e-12);
    for n in cloud.normals.as_ref().expect("normals kept") {
        assert_relative_eq!(*n, Vector3::<Float>::y(), epsilon = 1e-12);
    }
    assert_eq!(cloud.colors, Some(vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]]));
}

#[test]
fn mesh_normals_are_recomputed_after_the_move() {
    let composite = CompositeTransform::new(quarter_turn_global(), None, None, false);
    let mut mesh = Mesh::new(
        vec!(Vector3::<Float>::new(0.0, 0.0, 0.0), Vector3::<Float>::new(1.0, 0.0, 0.0), Vector3::<Float>::new(0.0, 1.0, 0.0), Vector3::<Float>::new(5.0, 5.0, 5.0)),
        vec!([0, 1, 2])
    );
    mesh.normals = Some(vec![Vector3::<Float>::x(); 4]);

    let report = composite.apply_to_mesh(&mut mesh);

    assert_eq!(report.transformed, 4);
    assert_eq!(report.without_camera, 0);
    assert_eq!(mesh.triangles, vec!([0, 1, 2]));
    let normals = mesh.normals.as_ref().expect("normals recomputed");
    for n in &normals[0..3] {
        assert_relative_eq!(*n, Vector3::<Float>::z(), epsilon = 1e-12);
    }
    assert_eq!(normals[3], Vector3::<Float>::zeros());
}

#[test]
fn orientation_substitution_never_changes_positions() {
    let (tracker, reconstruction) = common::drifting_streams(60, &common::true_similarity(), 0.01, Vector3::<Float>::new(0.03, 0.0, 0.02), 17);
    let trajectory = Trajectory::from_reconstruction(&reconstruction, &tracker);

    let plain = align(&tracker, &reconstruction, &AlignmentConfig::default()).expect("alignment succeeds");
    let substituting = align(&tracker, &reconstruction, &AlignmentConfig { substitute_orientation: true, ..AlignmentConfig::default() }).expect("alignment succeeds");
    assert_eq!(substituting.method.to_string(), "global+segment+orientation");

    let (plain_trajectory, _) = plain.composite().apply_to_trajectory(&trajectory, &tracker);
    let (substituted_trajectory, report) = substituting.composite().apply_to_trajectory(&trajectory, &tracker);

    assert_eq!(report.without_tracker_orientation, 0);
    assert_eq!(substituted_trajectory.coordinate_system, CoordinateSystem::Tracker);
    for ((p, s), t) in plain_trajectory.poses.iter().zip(substituted_trajectory.poses.iter()).zip(tracker.iter()) {
        assert_eq!(p.position, s.position);
        assert_eq!(s.orientation, Some(t.orientation));
        assert_eq!(s.timestamp, t.timestamp);
    }
}

#[test]
fn rotated_orientations_match_tracker_orientations_without_noise() {
    let (tracker, reconstruction) = common::synthetic_streams(30, &common::true_similarity());
    let trajectory = Trajectory::from_reconstruction(&reconstruction, &tracker);
    let run = align(&tracker, &reconstruction, &AlignmentConfig { strategy: Strategy::GlobalOnly, ..AlignmentConfig::default() }).expect("alignment succeeds");

    let (aligned, report) = run.composite().apply_to_trajectory(&trajectory, &tracker);

    assert_eq!(report.transformed, 30);
    for (pose, t) in aligned.poses.iter().zip(tracker.iter()) {
        assert_relative_eq!(pose.position, t.position, epsilon = 1e-9);
        let orientation: UnitQuaternion<Float> = pose.orientation.expect("reconstruction had orientations");
        assert!(angular_distance(&orientation, &t.orientation) < 1e-9);
    }
}

#[test]
fn poses_without_tracker_counterpart_keep_their_rotated_orientation() {
    let (tracker, reconstruction) = common::synthetic_streams(20, &common::true_similarity());
    let trajectory = Trajectory::from_reconstruction(&reconstruction, &tracker);
    let run = align(&tracker, &reconstruction, &AlignmentConfig { substitute_orientation: true, ..AlignmentConfig::default() }).expect("alignment succeeds");

    let (aligned, report) = run.composite().apply_to_trajectory(&trajectory, &tracker[..15]);

    assert_eq!(report.without_tracker_orientation, 5);
    for (pose, t) in aligned.poses[15..].iter().zip(tracker[15..].iter()) {
        let orientation = pose.orientation.expect("reconstruction had orientations");
        assert!(angular_distance(&orientation, &t.orientation) < 1e-9);
    }
}

#[test]
fn prior_constrained_runs_leave_geometry_in_place() {
    let (tracker, _) = common::synthetic_streams(12, &common::true_similarity());
    let reconstruction = tracker.iter()
        .map(|t| frame_alignment::trajectory::ReconstructionPose::position_only(&t.id, t.position))
        .collect::<Vec<_>>();
    let run = align(&tracker, &reconstruction, &AlignmentConfig { strategy: Strategy::PriorConstrained, ..AlignmentConfig::default() }).expect("alignment succeeds");

    assert!(run.segments.is_none());
    assert_eq!(*run.global.rotation(), Matrix3::<Float>::identity());
    assert_eq!(run.global.mean_error(), 0.0);
    let p = Vector3::<Float>::new(3.0, -1.0, 7.5);
    assert_eq!(run.composite().transform_point(&p), p);
}

#[test]
fn tags_pass_through_untouched() {
    let tags = vec!(
        TagPosition { id: "17".to_string(), position: Vector3::<Float>::new(1.0, 2.0, 3.0) },
        TagPosition { id: "42".to_string(), position: Vector3::<Float>::new(-4.0, 0.5, 0.0) }
    );

    let passed = pass_through_tags(&tags);
    assert_eq!(passed, &tags[..]);

    let points = vec!(Vector3::<Float>::new(1.0, 2.0, 3.5), Vector3::<Float>::new(-4.0, 0.5, 2.0));
    let comparisons = compare_tags(passed, &points);
    assert_eq!(comparisons[0].id, "17");
    assert_relative_eq!(comparisons[0].nearest_point_distance.expect("points exist"), 0.5, epsilon = 1e-12);
    assert_relative_eq!(comparisons[1].nearest_point_distance.expect("points exist"), 2.0, epsilon = 1e-12);
    assert_eq!(compare_tags(passed, &[])[0].nearest_point_distance, None);
}
