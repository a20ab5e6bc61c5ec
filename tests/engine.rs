//! End-to-end engine scenarios over a real GPU adapter.
//!
//! These tests build charts against whatever adapter the machine offers
//! and drive them through the injected scheduler, frame by frame. When
//! no adapter is available (headless CI without a software rasterizer)
//! every test returns early and reports success.
//!
//! ## Running
//! - Default: `cargo test --test engine`
//! - Force a backend: `WGPU_BACKEND=vulkan cargo test --test engine`

use chartwell::{
    Chart, ChartData, ChartOptions, GpuContext, GraphLink, GraphNode, ManualScheduler, PointDatum,
    RenderError, Series, SeriesData, SeriesRegistry,
};

/// Acquire an adapter, or skip the test on machines without one.
fn gpu() -> Option<GpuContext> {
    GpuContext::new_blocking().ok()
}

fn chart_with(gpu: &GpuContext, scheduler: &ManualScheduler, options: ChartOptions) -> Chart {
    Chart::new(
        gpu.clone(),
        SeriesRegistry::with_defaults(),
        Box::new(scheduler.clone()),
        options,
    )
}

/// A deterministic point cloud around the origin.
fn scatter(count: usize) -> ChartData {
    let points = (0..count)
        .map(|i| {
            let t = i as f32 * 0.7;
            let mut p = PointDatum::at(t.cos() * 2.0, t.sin() * 2.0, (i as f32 * 0.3).sin());
            p.label = Some(format!("point-{i}"));
            p
        })
        .collect();
    ChartData::new(vec![Series::from_data(SeriesData::Points { points })])
}

/// Pump frames until the chart stops requesting them. Returns how many
/// frames ran. Panics when the loop never goes quiet.
fn pump(chart: &mut Chart, now: &mut f64, max_frames: u32) -> u32 {
    let mut frames = 0;
    while chart.is_loop_armed() {
        *now += 16.0;
        chart.on_frame(*now);
        frames += 1;
        assert!(frames <= max_frames, "frame loop never went quiet");
    }
    frames
}

#[test]
fn first_render_shows_points_then_idles() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = chart_with(
        &gpu,
        &scheduler,
        ChartOptions::new(800, 600).with_enter_duration(0.0),
    );

    // 1. Feeding data arms the loop.
    chart.update(&scatter(40)).expect("update failed");
    assert!(chart.is_loop_armed(), "update should request a frame");

    // 2. The first frame renders and, with nothing moving, disarms.
    let mut now = 0.0;
    let frames = pump(&mut chart, &mut now, 10);
    assert_eq!(frames, 1, "a static scene needs exactly one frame");

    // 3. The canvas is no longer uniformly background.
    let pixels = chart.read_pixels();
    let background = &pixels[0..4];
    let foreign = pixels
        .chunks_exact(4)
        .filter(|px| *px != background)
        .count();
    assert!(foreign > 0, "no point reached the framebuffer");
}

#[test]
fn drag_rotates_camera_then_coasts_to_rest() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = chart_with(
        &gpu,
        &scheduler,
        ChartOptions::new(800, 600).with_enter_duration(0.0),
    );
    chart.update(&scatter(10)).expect("update failed");
    let mut now = 0.0;
    pump(&mut chart, &mut now, 10);

    let start = chart.camera().position;

    // Primary-button drag to the right, then release mid-motion.
    chart.pointer_down(400.0, 300.0, chartwell::PointerButton::Primary);
    chart.pointer_move(440.0, 300.0);
    now += 16.0;
    chart.on_frame(now);
    chart.pointer_up();

    // Inertia keeps the loop alive until damping snaps velocity to zero.
    let coast_frames = pump(&mut chart, &mut now, 1000);
    assert!(coast_frames > 1, "release should coast, not stop dead");

    let end = chart.camera().position;
    assert_ne!(start, end, "drag should have moved the camera");

    // Rotation slides along the orbit sphere without changing its radius.
    let radius = |p: [f32; 3]| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
    assert!(
        (radius(start) - radius(end)).abs() < 1e-3,
        "rotation must preserve the orbit radius"
    );
}

#[test]
fn hover_resolves_the_datum_under_the_cursor() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = chart_with(
        &gpu,
        &scheduler,
        ChartOptions::new(800, 600).with_enter_duration(0.0),
    );

    // Data arrives the way a host would send it, as a JSON payload.
    let payload = r#"{
        "series": [{
            "name": "cities",
            "type": "points",
            "points": [
                { "position": [0.0, 0.0, 0.0], "size": 24.0, "label": "origin" },
                { "position": [50.0, 50.0, 0.0], "label": "far away" }
            ]
        }]
    }"#;
    let data: ChartData = serde_json::from_str(payload).expect("payload should parse");
    chart.update(&data).expect("update failed");

    let mut now = 0.0;
    pump(&mut chart, &mut now, 10);

    // The default camera looks at the origin, which lands mid-canvas.
    let hit = chart
        .data_at_point(400.0, 300.0)
        .expect("expected a datum under the canvas center");
    assert_eq!(hit.series, 0);
    assert_eq!(hit.index, 0);
    assert_eq!(hit.label.as_deref(), Some("origin"));

    // Empty corners resolve to nothing.
    assert_eq!(chart.data_at_point(5.0, 5.0), None);
    assert_eq!(chart.data_at_point(795.0, 595.0), None);
}

#[test]
fn settled_graph_survives_styling_updates_but_rescatters_on_topology_change() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = chart_with(
        &gpu,
        &scheduler,
        ChartOptions::new(800, 600).with_enter_duration(0.0),
    );

    let graph = |extra_node: bool, color: Option<[f32; 4]>| {
        let mut nodes = vec![GraphNode::new("a"), GraphNode::new("b"), GraphNode::new("c")];
        nodes[0].color = color;
        let mut links = vec![GraphLink::new("a", "b"), GraphLink::new("b", "c")];
        if extra_node {
            nodes.push(GraphNode::new("d"));
            links.push(GraphLink::new("c", "d"));
        }
        ChartData::new(vec![Series::from_data(SeriesData::Graph { nodes, links })])
    };

    // 1. Initial layout runs until the iteration budget settles it.
    chart.update(&graph(false, None)).expect("update failed");
    let mut now = 0.0;
    let settle_frames = pump(&mut chart, &mut now, 1000);
    assert!(
        settle_frames > 50,
        "the force layout should take many frames to settle, ran {settle_frames}"
    );

    // 2. A styling-only update keeps node positions: no simulation
    //    restarts, so the loop quiets after a single redraw.
    chart
        .update(&graph(false, Some([1.0, 0.0, 0.0, 1.0])))
        .expect("update failed");
    let restyle_frames = pump(&mut chart, &mut now, 1000);
    assert!(
        restyle_frames <= 2,
        "styling change should not rerun the layout, ran {restyle_frames}"
    );

    // 3. Changing the topology rescatters and reruns the simulation.
    chart.update(&graph(true, None)).expect("update failed");
    let reflow_frames = pump(&mut chart, &mut now, 1000);
    assert!(
        reflow_frames > 50,
        "topology change should rerun the layout, ran {reflow_frames}"
    );
}

#[test]
fn entry_animation_holds_the_loop_until_complete() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = chart_with(
        &gpu,
        &scheduler,
        ChartOptions::new(800, 600).with_enter_duration(100.0),
    );

    chart.update(&scatter(5)).expect("update failed");
    let mut now = 0.0;
    let frames = pump(&mut chart, &mut now, 100);

    // 100 ms at ~16 ms per frame, plus the final full-size frame.
    assert!(
        (6..=10).contains(&frames),
        "expected the animation to span ~7 frames, ran {frames}"
    );

    // A second update must not replay the entry animation.
    chart.update(&scatter(5)).expect("update failed");
    let frames = pump(&mut chart, &mut now, 100);
    assert_eq!(frames, 1, "later updates redraw once, ran {frames}");
}

#[test]
fn resize_tracks_canvas_and_camera() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = chart_with(
        &gpu,
        &scheduler,
        ChartOptions::new(800, 600).with_enter_duration(0.0),
    );
    chart.update(&scatter(10)).expect("update failed");
    let mut now = 0.0;
    pump(&mut chart, &mut now, 10);

    chart.resize(400, 300, 1.0);
    pump(&mut chart, &mut now, 10);

    assert_eq!(chart.target_size(), (400, 300));
    assert_eq!(chart.camera().viewport(), [400.0, 300.0]);
    assert_eq!(chart.read_pixels().len(), 400 * 300 * 4);

    // Zero dimensions are ignored rather than destroying the targets.
    chart.resize(0, 0, 1.0);
    assert_eq!(chart.target_size(), (400, 300));

    // Out-of-loop rendering still works at the new size.
    chart.render_once();
    assert_eq!(chart.read_pixels().len(), 400 * 300 * 4);
}

#[test]
fn unknown_series_kind_surfaces_as_an_error() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = Chart::new(
        gpu.clone(),
        SeriesRegistry::new(),
        Box::new(scheduler.clone()),
        ChartOptions::default(),
    );

    let err = chart.update(&scatter(1)).expect_err("empty registry");
    assert!(matches!(err, RenderError::UnknownSeries(kind) if kind == "points"));
}

#[test]
fn destroyed_chart_rejects_further_work() {
    let Some(gpu) = gpu() else { return };
    let scheduler = ManualScheduler::new();
    let mut chart = chart_with(&gpu, &scheduler, ChartOptions::default());

    chart.update(&scatter(3)).expect("update failed");
    chart.destroy();

    assert!(chart.is_destroyed());
    assert!(!chart.is_loop_armed(), "destroy must cancel the pending frame");
    assert!(matches!(
        chart.update(&scatter(3)),
        Err(RenderError::Destroyed)
    ));
    assert!(!chart.on_frame(16.0));
    assert_eq!(chart.data_at_point(400.0, 300.0), None);
    assert!(chart.read_pixels().is_empty());

    // Calling destroy again is harmless.
    chart.destroy();
}
