extern crate nalgebra as na;

use std::path::Path;
use na::{Vector3, Quaternion, UnitQuaternion};
use crate::trajectory::{TrackerPose, ReconstructionPose};
use crate::geometry::TagPosition;
use crate::numerics::pose::quaternion_from_xyzw;
use crate::io::{IoError, read_data_lines, parse_floats, frame_id_from_file_name, write_atomically};
use crate::Float;

/**
 * `id timestamp tx ty tz qx qy qz qw` per line. A timestamp of `-` means the capture had none.
 */
pub fn load_tracker_poses(file_path: &Path) -> Result<Vec<TrackerPose>, IoError> {
    read_data_lines(file_path)?.iter().map(|(line, content)| {
        let tokens = content.split_whitespace().collect::<Vec<&str>>();
        if tokens.len() != 9 {
            return Err(IoError::parse(file_path, *line, &format!("expected 9 fields, got {}", tokens.len())));
        }

        let timestamp = match tokens[1] {
            "-" => None,
            ts => Some(parse_floats(&[ts], file_path, *line)?[0])
        };
        let values = parse_floats(&tokens[2..], file_path, *line)?;
        Ok(TrackerPose {
            id: frame_id_from_file_name(tokens[0]),
            position: Vector3::<Float>::new(values[0], values[1], values[2]),
            orientation: quaternion_from_xyzw(values[3], values[4], values[5], values[6]),
            timestamp
        })
    }).collect()
}

/**
 * `id x y z` per line.
 */
pub fn load_position_only_poses(file_path: &Path) -> Result<Vec<ReconstructionPose>, IoError> {
    read_data_lines(file_path)?.iter().map(|(line, content)| {
        let (id, position) = parse_id_position(content, file_path, *line)?;
        Ok(ReconstructionPose::position_only(&frame_id_from_file_name(&id), position))
    }).collect()
}

/**
 * COLMAP images.txt. Every image has a header line
 * `IMAGE_ID QW QX QY QZ TX TY TZ CAMERA_ID NAME` followed by a (possibly empty) line of 2D points.
 * The stored pose is world to camera; we keep the camera centre and the camera to world orientation.
 */
pub fn load_colmap_images(file_path: &Path) -> Result<Vec<ReconstructionPose>, IoError> {
    let contents = std::fs::read_to_string(file_path).map_err(|e| IoError::io(file_path, e))?;
    let lines = contents.lines().enumerate()
        .filter(|(_, l)| !l.trim_start().starts_with('#'))
        .map(|(idx, l)| (idx + 1, l.trim()))
        .collect::<Vec<(usize, &str)>>();

    let mut poses = Vec::<ReconstructionPose>::with_capacity(lines.len()/2);
    let mut idx = 0;
    while idx < lines.len() {
        let (line, content) = lines[idx];
        if content.is_empty() {
            idx += 1;
            continue;
        }

        let tokens = content.split_whitespace().collect::<Vec<&str>>();
        if tokens.len() < 10 {
            return Err(IoError::parse(file_path, line, &format!("expected an image line with 10 fields, got {}", tokens.len())));
        }
        let values = parse_floats(&tokens[1..8], file_path, line)?;
        let world_to_camera = UnitQuaternion::<Float>::from_quaternion(Quaternion::<Float>::new(values[0], values[1], values[2], values[3]));
        let translation = Vector3::<Float>::new(values[4], values[5], values[6]);
        let camera_to_world = world_to_camera.inverse();
        let centre = -(camera_to_world*translation);
        let name = tokens[9..].join(" ");

        poses.push(ReconstructionPose::with_orientation(&frame_id_from_file_name(&name), centre, camera_to_world));
        // skip the 2D point line
        idx += 2;
    }

    Ok(poses)
}

/**
 * COLMAP images.txt when the first data line has ten or more fields, `id x y z` otherwise.
 */
pub fn load_reconstruction_poses(file_path: &Path) -> Result<Vec<ReconstructionPose>, IoError> {
    let first_field_count = read_data_lines(file_path)?.first().map(|(_, l)| l.split_whitespace().count()).unwrap_or(0);
    match first_field_count {
        n if n >= 10 => load_colmap_images(file_path),
        _ => load_position_only_poses(file_path)
    }
}

pub fn load_tags(file_path: &Path) -> Result<Vec<TagPosition>, IoError> {
    read_data_lines(file_path)?.iter().map(|(line, content)| {
        let (id, position) = parse_id_position(content, file_path, *line)?;
        Ok(TagPosition { id, position })
    }).collect()
}

pub fn write_tags(file_path: &Path, tags: &[TagPosition]) -> Result<(), IoError> {
    let mut contents = String::from("# id x y z (tracker frame)\n");
    for tag in tags {
        contents.push_str(&format!("{} {} {} {}\n", tag.id, tag.position.x, tag.position.y, tag.position.z));
    }
    write_atomically(file_path, contents.as_bytes())
}

fn parse_id_position(content: &str, file_path: &Path, line: usize) -> Result<(String, Vector3<Float>), IoError> {
    let tokens = content.split_whitespace().collect::<Vec<&str>>();
    if tokens.len() != 4 {
        return Err(IoError::parse(file_path, line, &format!("expected 4 fields, got {}", tokens.len())));
    }
    let values = parse_floats(&tokens[1..], file_path, line)?;
    Ok((tokens[0].to_string(), Vector3::<Float>::new(values[0], values[1], values[2])))
}
