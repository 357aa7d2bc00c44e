extern crate nalgebra as na;

use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};

use self::alignment::AlignmentConfig;
use self::io::IoError;

pub mod numerics;
pub mod trajectory;
pub mod geometry;
pub mod alignment;
pub mod io;
pub mod visualize;

macro_rules! define_float {
    ($f:tt) => {
        pub use std::$f as float;
        pub type Float = $f;
    }
}

define_float!(f64);

/**
 * One alignment job: where the inputs live, where the outputs go and which strategy to run.
 * Relative input paths are resolved against `dataset_path`.
 */
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct RuntimeConf {
    pub dataset_path: String,
    pub output_path: String,
    pub tracker_poses: String,
    pub reconstruction_poses: String,
    #[serde(default)]
    pub point_cloud: Option<String>,
    #[serde(default)]
    pub mesh: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub plot_residuals: bool,
    #[serde(default)]
    pub alignment: AlignmentConfig
}

impl RuntimeConf {
    pub fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        match path.is_absolute() {
            true => path.to_path_buf(),
            false => Path::new(&self.dataset_path).join(path)
        }
    }

    pub fn output_file(&self, file_name: &str) -> PathBuf {
        Path::new(&self.output_path).join(file_name)
    }
}

pub fn load_runtime_conf(path: &Path) -> Result<RuntimeConf, IoError> {
    let contents = std::fs::read_to_string(path).map_err(|source| IoError::Io{path: path.display().to_string(), source})?;
    let conf = serde_yaml::from_str::<RuntimeConf>(&contents)?;
    Ok(conf)
}
