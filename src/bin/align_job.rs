extern crate color_eyre;
extern crate frame_alignment;

use std::path::PathBuf;
use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use log::{info, warn};

use frame_alignment::load_runtime_conf;
use frame_alignment::alignment::{AlignmentError, AlignmentRun, align_matched, correspondence::match_poses, applicator::{pass_through_tags, compare_tags}};
use frame_alignment::trajectory::Trajectory;
use frame_alignment::io::{pose_loader, ply, artifact};
use frame_alignment::visualize::plot::{draw_residuals, draw_positions_per_axis};

/// Aligns a reconstruction to tracker frame and writes all job outputs in tracker frame.
#[derive(Debug, Parser)]
#[command(author, version, about = "Reconstruction to tracker frame alignment")]
struct Args {
    /// Path to the YAML job file
    #[arg(long)]
    config: PathBuf
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let runtime_conf = load_runtime_conf(&args.config)?;
    let config = runtime_conf.alignment;

    let tracker = pose_loader::load_tracker_poses(&runtime_conf.resolve(&runtime_conf.tracker_poses))?;
    let reconstruction = pose_loader::load_reconstruction_poses(&runtime_conf.resolve(&runtime_conf.reconstruction_poses))?;
    info!("loaded {} tracker poses and {} reconstruction poses", tracker.len(), reconstruction.len());

    let correspondences = match_poses(&tracker, &reconstruction);
    let run = match align_matched(correspondences.clone(), &config) {
        Ok(run) => run,
        Err(e @ (AlignmentError::InsufficientCorrespondence{..} | AlignmentError::DegenerateGeometry{..})) if config.fallback_to_identity => {
            warn!("alignment failed: {}", e);
            AlignmentRun::identity_fallback(correspondences, &config)
        },
        Err(e) => return Err(e.into())
    };
    let composite = run.composite();

    std::fs::create_dir_all(&runtime_conf.output_path)?;

    let mut cloud_points = None;
    if let Some(path) = &runtime_conf.point_cloud {
        let mut cloud = ply::load_point_cloud(&runtime_conf.resolve(path))?;
        composite.apply_to_point_cloud(&mut cloud);
        ply::write_point_cloud(&runtime_conf.output_file("point_cloud_tracker.ply"), &cloud)?;
        cloud_points = Some(cloud.points);
    }

    if let Some(path) = &runtime_conf.mesh {
        let mut mesh = ply::load_mesh(&runtime_conf.resolve(path))?;
        composite.apply_to_mesh(&mut mesh);
        ply::write_mesh(&runtime_conf.output_file("mesh_tracker.ply"), &mesh)?;
    }

    let trajectory = Trajectory::from_reconstruction(&reconstruction, &tracker);
    let (aligned_trajectory, _) = composite.apply_to_trajectory(&trajectory, &tracker);
    artifact::save_trajectory(&runtime_conf.output_file("trajectory.json"), &aligned_trajectory)?;

    if let Some(path) = &runtime_conf.tags {
        let tags = pose_loader::load_tags(&runtime_conf.resolve(path))?;
        let tags = pass_through_tags(&tags);
        if let Some(points) = &cloud_points {
            for comparison in compare_tags(tags, points) {
                match comparison.nearest_point_distance {
                    Some(d) => info!("tag {} is {:.3} m from the aligned point cloud", comparison.id, d),
                    None => warn!("tag {} could not be compared, point cloud is empty", comparison.id)
                }
            }
        }
        pose_loader::write_tags(&runtime_conf.output_file("tags.txt"), tags)?;
    }

    artifact::save_alignment(&runtime_conf.output_file("alignment.json"), &run)?;

    if runtime_conf.plot_residuals {
        let global_residuals = run.global.residuals(&run.correspondences);
        let corrected_residuals = run.segments.as_ref().map(|_| composite.residuals(&run.correspondences));
        draw_residuals(&global_residuals, corrected_residuals.as_ref(), &runtime_conf.output_path, "residuals.png").map_err(|e| eyre!("{}", e))?;

        let aligned = run.correspondences.reconstruction_positions().iter().map(|p| composite.transform_point(p)).collect::<Vec<_>>();
        let info_text = format!("method {}", run.method);
        draw_positions_per_axis(&aligned, &run.correspondences.tracker_positions(), &runtime_conf.output_path, "positions.png", &info_text).map_err(|e| eyre!("{}", e))?;
    }

    println!("{} mean error {:.4} m median error {:.4} m", run.method, run.global.mean_error(), run.global.median_error());
    Ok(())
}
