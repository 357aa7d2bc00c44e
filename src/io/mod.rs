extern crate nalgebra as na;

use std::path::Path;
use std::fs::File;
use std::io::{BufReader, BufRead, Write};
use thiserror::Error;

use crate::Float;

pub mod pose_loader;
pub mod ply;
pub mod artifact;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error
    },
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("alignment: {0}")]
    Alignment(#[from] crate::alignment::AlignmentError)
}

impl IoError {
    pub fn parse(path: &Path, line: usize, message: &str) -> IoError {
        IoError::Parse { path: path.display().to_string(), line, message: message.to_string() }
    }

    pub fn io(path: &Path, source: std::io::Error) -> IoError {
        IoError::Io { path: path.display().to_string(), source }
    }
}

/**
 * Accepts plain decimals as well as a mantissa with an `e` exponent, correctly rounded.
 */
pub fn parse_to_float(string: &str) -> Option<Float> {
    string.parse::<Float>().ok()
}

pub fn parse_floats(tokens: &[&str], path: &Path, line: usize) -> Result<Vec<Float>, IoError> {
    tokens.iter().map(|t| parse_to_float(t).ok_or_else(|| IoError::parse(path, line, &format!("'{}' is not a number", t)))).collect()
}

/**
 * Lines with their 1-based number, skipping blanks and `#` comments.
 */
pub fn read_data_lines(file_path: &Path) -> Result<Vec<(usize, String)>, IoError> {
    let file = File::open(file_path).map_err(|e| IoError::io(file_path, e))?;
    let reader = BufReader::new(file);
    let mut lines = Vec::<(usize, String)>::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| IoError::io(file_path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push((idx + 1, trimmed.to_string()));
    }
    Ok(lines)
}

/**
 * Stable per-frame key: the file name without directories and extension.
 */
pub fn frame_id_from_file_name(name: &str) -> String {
    Path::new(name).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| name.to_string())
}

/**
 * Writes next to the destination and renames, so readers never see a partial file.
 */
pub fn write_atomically(file_path: &Path, contents: &[u8]) -> Result<(), IoError> {
    let file_name = file_path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp_path = file_path.with_file_name(format!(".{}.tmp", file_name));
    {
        let mut file = File::create(&tmp_path).map_err(|e| IoError::io(&tmp_path, e))?;
        file.write_all(contents).map_err(|e| IoError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| IoError::io(&tmp_path, e))?;
    }
    std::fs::rename(&tmp_path, file_path).map_err(|e| IoError::io(file_path, e))
}
