extern crate nalgebra as na;

use std::path::Path;
use na::Vector3;
use crate::geometry::{PointCloud, Mesh};
use crate::io::{IoError, parse_floats, write_atomically};
use crate::Float;

struct Element {
    name: String,
    count: usize,
    properties: Vec<String>
}

struct PlyData {
    vertices: Vec<Vector3<Float>>,
    normals: Option<Vec<Vector3<Float>>>,
    colors: Option<Vec<[u8; 3]>>,
    triangles: Vec<[usize; 3]>
}

fn property_index(element: &Element, name: &str) -> Option<usize> {
    element.properties.iter().position(|p| p == name)
}

/**
 * ASCII PLY only. Vertices need x y z, nx ny nz and red green blue are picked up when all three are present.
 * Faces must be triangles.
 */
fn read_ply(file_path: &Path) -> Result<PlyData, IoError> {
    let contents = std::fs::read_to_string(file_path).map_err(|e| IoError::io(file_path, e))?;
    let mut lines = contents.lines().enumerate().map(|(idx, l)| (idx + 1, l.trim()));

    match lines.next() {
        Some((_, "ply")) => (),
        _ => return Err(IoError::parse(file_path, 1, "missing ply magic"))
    }

    let mut elements = Vec::<Element>::new();
    loop {
        let (line, content) = lines.next().ok_or_else(|| IoError::parse(file_path, 0, "header is not terminated"))?;
        let tokens = content.split_whitespace().collect::<Vec<&str>>();
        match tokens.as_slice() {
            ["end_header"] => break,
            ["format", "ascii", _] => (),
            ["format", other, _] => return Err(IoError::parse(file_path, line, &format!("unsupported ply format {}", other))),
            ["comment", ..] | ["obj_info", ..] => (),
            ["element", name, count] => {
                let count = count.parse::<usize>().map_err(|_| IoError::parse(file_path, line, "element count is not an integer"))?;
                elements.push(Element { name: name.to_string(), count, properties: Vec::new() });
            },
            ["property", "list", _, _, name] | ["property", _, name] => {
                let element = elements.last_mut().ok_or_else(|| IoError::parse(file_path, line, "property before element"))?;
                element.properties.push(name.to_string());
            },
            _ => return Err(IoError::parse(file_path, line, &format!("unexpected header line '{}'", content)))
        }
    }

    let mut data = PlyData { vertices: Vec::new(), normals: None, colors: None, triangles: Vec::new() };
    for element in &elements {
        match element.name.as_str() {
            "vertex" => {
                let position_idx = ["x", "y", "z"].map(|n| property_index(element, n));
                let normal_idx = ["nx", "ny", "nz"].map(|n| property_index(element, n));
                let color_idx = ["red", "green", "blue"].map(|n| property_index(element, n));
                let [Some(x), Some(y), Some(z)] = position_idx else {
                    return Err(IoError::parse(file_path, 0, "vertex element without x y z"));
                };
                let normal_idx = match normal_idx { [Some(a), Some(b), Some(c)] => Some([a, b, c]), _ => None };
                let color_idx = match color_idx { [Some(a), Some(b), Some(c)] => Some([a, b, c]), _ => None };

                let mut normals = Vec::<Vector3<Float>>::with_capacity(element.count);
                let mut colors = Vec::<[u8; 3]>::with_capacity(element.count);
                data.vertices.reserve(element.count);
                for _ in 0..element.count {
                    let (line, content) = lines.next().ok_or_else(|| IoError::parse(file_path, 0, "fewer vertices than declared"))?;
                    let tokens = content.split_whitespace().collect::<Vec<&str>>();
                    if tokens.len() < element.properties.len() {
                        return Err(IoError::parse(file_path, line, "vertex line is missing properties"));
                    }
                    let values = parse_floats(&tokens, file_path, line)?;
                    data.vertices.push(Vector3::<Float>::new(values[x], values[y], values[z]));
                    if let Some([a, b, c]) = normal_idx {
                        normals.push(Vector3::<Float>::new(values[a], values[b], values[c]));
                    }
                    if let Some([r, g, b]) = color_idx {
                        colors.push([values[r] as u8, values[g] as u8, values[b] as u8]);
                    }
                }
                data.normals = normal_idx.map(|_| normals);
                data.colors = color_idx.map(|_| colors);
            },
            "face" => {
                data.triangles.reserve(element.count);
                for _ in 0..element.count {
                    let (line, content) = lines.next().ok_or_else(|| IoError::parse(file_path, 0, "fewer faces than declared"))?;
                    let indices = content.split_whitespace().map(|t| t.parse::<usize>()).collect::<Result<Vec<usize>, _>>()
                        .map_err(|_| IoError::parse(file_path, line, "face index is not an integer"))?;
                    match indices.as_slice() {
                        [3, a, b, c, ..] => data.triangles.push([*a, *b, *c]),
                        _ => return Err(IoError::parse(file_path, line, "only triangle faces are supported"))
                    }
                }
            },
            _ => {
                for _ in 0..element.count {
                    lines.next();
                }
            }
        }
    }

    if let Some(&[a, b, c]) = data.triangles.iter().find(|t| t.iter().any(|&i| i >= data.vertices.len())) {
        return Err(IoError::parse(file_path, 0, &format!("face [{} {} {}] refers to a missing vertex", a, b, c)));
    }

    Ok(data)
}

fn write_ply(file_path: &Path, vertices: &[Vector3<Float>], normals: Option<&Vec<Vector3<Float>>>, colors: Option<&Vec<[u8; 3]>>, triangles: &[[usize; 3]]) -> Result<(), IoError> {
    let mut contents = String::from("ply\nformat ascii 1.0\ncomment tracker frame\n");
    contents.push_str(&format!("element vertex {}\nproperty double x\nproperty double y\nproperty double z\n", vertices.len()));
    if normals.is_some() {
        contents.push_str("property double nx\nproperty double ny\nproperty double nz\n");
    }
    if colors.is_some() {
        contents.push_str("property uchar red\nproperty uchar green\nproperty uchar blue\n");
    }
    if !triangles.is_empty() {
        contents.push_str(&format!("element face {}\nproperty list uchar int vertex_indices\n", triangles.len()));
    }
    contents.push_str("end_header\n");

    for (i, v) in vertices.iter().enumerate() {
        contents.push_str(&format!("{} {} {}", v.x, v.y, v.z));
        if let Some(n) = normals.and_then(|ns| ns.get(i)) {
            contents.push_str(&format!(" {} {} {}", n.x, n.y, n.z));
        }
        if let Some(c) = colors.and_then(|cs| cs.get(i)) {
            contents.push_str(&format!(" {} {} {}", c[0], c[1], c[2]));
        }
        contents.push('\n');
    }
    for t in triangles {
        contents.push_str(&format!("3 {} {} {}\n", t[0], t[1], t[2]));
    }

    write_atomically(file_path, contents.as_bytes())
}

pub fn load_point_cloud(file_path: &Path) -> Result<PointCloud, IoError> {
    let data = read_ply(file_path)?;
    Ok(PointCloud { points: data.vertices, colors: data.colors, normals: data.normals })
}

pub fn load_mesh(file_path: &Path) -> Result<Mesh, IoError> {
    let data = read_ply(file_path)?;
    Ok(Mesh { vertices: data.vertices, triangles: data.triangles, colors: data.colors, normals: data.normals })
}

pub fn write_point_cloud(file_path: &Path, cloud: &PointCloud) -> Result<(), IoError> {
    write_ply(file_path, &cloud.points, cloud.normals.as_ref(), cloud.colors.as_ref(), &[])
}

pub fn write_mesh(file_path: &Path, mesh: &Mesh) -> Result<(), IoError> {
    write_ply(file_path, &mesh.vertices, mesh.normals.as_ref(), mesh.colors.as_ref(), &mesh.triangles)
}
