extern crate plotters;
extern crate nalgebra as na;

use plotters::prelude::*;
use na::Vector3;

use crate::{float,Float};

fn get_min_max(data_vectors: &[&Vec<Float>]) -> (Float,Float) {

    let mut min = float::MAX;
    let mut max = float::MIN;

    for data in data_vectors {
        for &v in data.iter() {
            if v < min {
                min = v;
            }

            if v > max {
                max = v;
            }
        }
    }

    if min > max {
        min = 0.0;
        max = 0.0;
    }

    if(max-min) < 1e-5 {
        max = min + 1e-5;
    }

    (min,max)
}

/**
 * Residual per correspondence after the global fit (red) and, when given, after segment correction (green).
 */
pub fn draw_residuals(global: &Vec<Float>, corrected: Option<&Vec<Float>>, output_folder: &str, file_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut series = vec!(global);
    if let Some(c) = corrected {
        series.push(c);
    }
    let (_,max) = get_min_max(&series);
    let x_max = global.len().max(2) - 1;

    let path = format!("{}/{}",output_folder,file_name);
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .caption("Residual error", ("sans-serif", 40))
        .build_cartesian_2d(0..x_max, 0.0..max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("correspondence")
        .y_desc("m")
        .draw()?;

    chart.draw_series(
        LineSeries::new(
            (0..).zip(global.iter()).map(|(x, y)| (x, *y)),
            &RED,
        )
    )?;

    if let Some(c) = corrected {
        chart.draw_series(
            LineSeries::new(
                (0..).zip(c.iter()).map(|(x, y)| (x, *y)),
                &GREEN,
            )
        )?;
    }

    root.present()?;
    Ok(())
}

/**
 * Per axis comparison of tracker positions (green) and aligned reconstruction positions (red).
 */
pub fn draw_positions_per_axis(aligned: &Vec<Vector3<Float>>, tracker: &Vec<Vector3<Float>>, output_folder: &str, file_name: &str, info: &str) -> Result<(), Box<dyn std::error::Error>> {
    let per_axis = |points: &Vec<Vector3<Float>>| (0..3).map(|axis| points.iter().map(|point| point[axis]).collect::<Vec<Float>>()).collect::<Vec<Vec<Float>>>();
    let data_aligned = per_axis(aligned);
    let data_tracker = per_axis(tracker);
    let x_max = aligned.len().max(2) - 1;

    let path = format!("{}/{}",output_folder,file_name);
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;
    root.titled(info, ("sans-serif", 12))?;

    let drawing_areas = root.split_evenly((3,1));
    let titles = ["Position X", "Position Y", "Position Z"];

    for (i, area) in drawing_areas.iter().enumerate() {
        let (min,max) = get_min_max(&[&data_aligned[i],&data_tracker[i]]);

        let mut chart = ChartBuilder::on(area)
        .margin(30)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .caption(titles[i], ("sans-serif", 40))
        .build_cartesian_2d(0..x_max, min..max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .draw()?;

        chart.draw_series(
            LineSeries::new(
                (0..).zip(data_aligned[i].iter()).map(|(x, y)| (x, *y)),
                &RED.mix(0.5),
            )
        )?;

        chart.draw_series(
            LineSeries::new(
                (0..).zip(data_tracker[i].iter()).map(|(x, y)| (x, *y)),
                &GREEN.mix(0.5),
            )
        )?;
    }

    root.present()?;
    Ok(())
}
