//! Headless spin demo: renders an auto-rotating point cloud and a small
//! graph, writing one PPM image per frame.
//!
//! Run with `cargo run --example spin [output-dir]`. The default output
//! directory is `spin_frames/` under the current directory. Convert to a
//! GIF with e.g. `ffmpeg -i spin_frames/frame_%03d.ppm spin.gif`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use chartwell::{
    Chart, ChartData, ChartOptions, GpuContext, GraphLink, GraphNode, ManualScheduler,
    OrbitOptions, PointDatum, Series, SeriesData, SeriesRegistry,
};

const FRAMES: u32 = 48;
const FRAME_MS: f64 = 1000.0 / 60.0;

/// A helix of points plus a ring graph, enough to show both renderers.
fn demo_data() -> ChartData {
    let points = (0..200)
        .map(|i| {
            let t = i as f32 * 0.08;
            let mut p = PointDatum::at(t.cos() * 3.0, t * 0.03 - 3.0, t.sin() * 3.0);
            p.color = Some([0.3 + 0.7 * (t * 0.5).sin().abs(), 0.5, 0.9, 1.0]);
            p
        })
        .collect();

    let nodes = (0..8)
        .map(|i| GraphNode::new(format!("n{i}")))
        .collect::<Vec<_>>();
    let links = (0..8)
        .map(|i| GraphLink::new(format!("n{i}"), format!("n{}", (i + 1) % 8)))
        .collect();

    ChartData::new(vec![
        Series::from_data(SeriesData::Points { points }),
        Series::from_data(SeriesData::Graph { nodes, links }),
    ])
}

/// Write tightly packed RGBA pixels as a binary PPM (alpha dropped).
fn write_ppm(path: &Path, width: u32, height: u32, rgba: &[u8]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write!(out, "P6\n{width} {height}\n255\n")?;
    for px in rgba.chunks_exact(4) {
        out.write_all(&px[0..3])?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("spin_frames"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let gpu = GpuContext::new_blocking().context("no GPU adapter available")?;
    println!("Rendering on {}", gpu.adapter_info().name);

    let orbit = OrbitOptions {
        auto_rotate: true,
        ..OrbitOptions::default()
    };
    let mut chart = Chart::new(
        gpu,
        SeriesRegistry::with_defaults(),
        Box::new(ManualScheduler::new()),
        ChartOptions::new(640, 480).with_orbit(orbit),
    );

    chart.update(&demo_data())?;

    let (width, height) = chart.target_size();
    let mut now = 0.0;
    for frame in 0..FRAMES {
        now += FRAME_MS;
        chart.on_frame(now);

        let path = out_dir.join(format!("frame_{frame:03}.ppm"));
        write_ppm(&path, width, height, &chart.read_pixels())?;
    }

    chart.destroy();
    println!(
        "Wrote {FRAMES} frames of {width}x{height} to {}",
        out_dir.display()
    );
    Ok(())
}
