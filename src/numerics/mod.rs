extern crate nalgebra as na;

use na::Vector3;
use crate::{Float,float};

pub mod pose;

pub fn mean(data: &[Float]) -> Float {
    match data.len() {
        0 => 0.0,
        n => data.iter().sum::<Float>()/(n as Float)
    }
}

/**
 * Median of an even count is the mean of the two middle values.
 * Returns the sorted data alongside so callers can reuse it.
 */
pub fn median(data: Vec<Float>, sort_data: bool) -> (Float, Vec<Float>) {
    let mut mut_data = data;
    if sort_data {
        mut_data.sort_unstable_by(|a, b| a.total_cmp(b));
    }
    let middle = mut_data.len()/2;
    let value = match mut_data.len() {
        0 => 0.0,
        n if n % 2 == 0 => 0.5*(mut_data[middle-1] + mut_data[middle]),
        _ => mut_data[middle]
    };
    (value, mut_data)
}

/**
 * Axis aligned extents (max - min per axis). Zero for an empty slice.
 */
pub fn bounding_extents(points: &[Vector3<Float>]) -> [Float; 3] {
    if points.is_empty() {
        return [0.0; 3];
    }

    let mut min = Vector3::<Float>::repeat(float::MAX);
    let mut max = Vector3::<Float>::repeat(float::MIN);
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    let extents = max - min;
    [extents.x, extents.y, extents.z]
}
