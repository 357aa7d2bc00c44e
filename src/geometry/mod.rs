extern crate nalgebra as na;

use na::Vector3;
use crate::Float;

#[derive(Debug,Clone,PartialEq)]
pub struct PointCloud {
    pub points: Vec<Vector3<Float>>,
    pub colors: Option<Vec<[u8; 3]>>,
    pub normals: Option<Vec<Vector3<Float>>>
}

impl PointCloud {
    pub fn from_points(points: Vec<Vector3<Float>>) -> PointCloud {
        PointCloud { points, colors: None, normals: None }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug,Clone,PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vector3<Float>>,
    pub triangles: Vec<[usize; 3]>,
    pub colors: Option<Vec<[u8; 3]>>,
    pub normals: Option<Vec<Vector3<Float>>>
}

impl Mesh {
    pub fn new(vertices: Vec<Vector3<Float>>, triangles: Vec<[usize; 3]>) -> Mesh {
        Mesh { vertices, triangles, colors: None, normals: None }
    }

    /**
     * Area weighted vertex normals: unnormalised face normals are accumulated per vertex.
     * Vertices not referenced by any triangle, or only by degenerate ones, get a zero normal.
     */
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3::<Float>::zeros(); self.vertices.len()];
        for &[a, b, c] in &self.triangles {
            if a >= self.vertices.len() || b >= self.vertices.len() || c >= self.vertices.len() {
                continue;
            }
            let face_normal = (self.vertices[b] - self.vertices[a]).cross(&(self.vertices[c] - self.vertices[a]));
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }

        for n in normals.iter_mut() {
            if let Some(unit) = n.try_normalize(1e-12) {
                *n = unit;
            } else {
                *n = Vector3::<Float>::zeros();
            }
        }

        self.normals = Some(normals);
    }
}

/**
 * Tag position captured on device. Already in tracker frame.
 */
#[derive(Debug,Clone,PartialEq)]
pub struct TagPosition {
    pub id: String,
    pub position: Vector3<Float>
}
