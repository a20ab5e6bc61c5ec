//! Force-directed graph layout
//!
//! Runs in 2D screen space: repulsion between all nodes (Barnes-Hut
//! approximated through [`Quadtree`]), spring attraction along edges, and
//! a weak pull toward the canvas center. The simulation burns a fixed
//! iteration budget and then reports itself settled so the frame loop can
//! stop stepping physics.

mod quadtree;

pub use quadtree::Quadtree;

/// Default number of physics steps folded into one rendered frame.
const DEFAULT_STEPS_PER_FRAME: u32 = 3;

/// Default node radius in pixels.
const DEFAULT_NODE_RADIUS: f32 = 5.0;

/// A node being laid out
#[derive(Debug, Clone)]
pub struct LayoutNode {
    /// Position in canvas pixels
    pub x: f32,
    pub y: f32,
    /// Velocity
    pub vx: f32,
    pub vy: f32,
    /// Mass used by the repulsion term
    pub mass: f32,
    /// Display radius in pixels
    pub radius: f32,
    /// Index of the data point this node visualizes
    pub source_index: usize,
}

/// A spring between two nodes (indices into the node array)
#[derive(Debug, Clone)]
pub struct LayoutEdge {
    pub source: usize,
    pub target: usize,
    /// Length the spring relaxes toward, in pixels
    pub rest_length: f32,
}

/// Tunable physics constants
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Inverse-square repulsion strength
    pub repulsion: f32,
    /// Hooke spring constant for edges
    pub spring: f32,
    /// Pull toward the canvas center
    pub gravity: f32,
    /// Velocity decay per step (0-1, lower = more friction)
    pub friction: f32,
    /// Barnes-Hut opening angle; 0 degenerates to exact pairwise forces
    pub theta: f32,
    /// Steps executed before the layout declares itself settled
    pub max_iterations: u32,
    /// Physics steps per rendered frame
    pub steps_per_frame: u32,
    /// Nodes are kept this many pixels inside the canvas edge
    pub bounds_margin: f32,
    /// Seed for randomized initial placement
    pub seed: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            repulsion: 60.0,
            spring: 0.08,
            gravity: 0.003,
            friction: 0.9,
            theta: 0.8,
            max_iterations: 600,
            steps_per_frame: DEFAULT_STEPS_PER_FRAME,
            bounds_margin: 10.0,
            seed: 0x9d0_c4a5,
        }
    }
}

/// Force-directed layout state
pub struct ForceLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub options: LayoutOptions,
    bounds: [f32; 2],
    quadtree: Quadtree,
    iterations: u32,
    settled: bool,
    rng: SplitMix64,
}

impl ForceLayout {
    /// Create an empty layout over a default-sized canvas
    pub fn new(options: LayoutOptions) -> Self {
        let rng = SplitMix64::new(options.seed);
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            options,
            bounds: [800.0, 600.0],
            quadtree: Quadtree::new(),
            iterations: 0,
            settled: true,
            rng,
        }
    }

    /// Canvas size the simulation is confined to
    pub fn set_bounds(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.bounds = [width, height];
        }
    }

    /// Whether the iteration budget has been spent
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Steps taken since the last rebuild
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Replace the graph, scattering nodes randomly inside the bounds
    ///
    /// Edges referencing out-of-range nodes are dropped. The iteration
    /// budget restarts, waking the simulation up again.
    pub fn rebuild(&mut self, node_count: usize, mut edges: Vec<LayoutEdge>) {
        let margin = self.options.bounds_margin;
        let w = (self.bounds[0] - 2.0 * margin).max(1.0);
        let h = (self.bounds[1] - 2.0 * margin).max(1.0);

        self.nodes = (0..node_count)
            .map(|i| LayoutNode {
                x: margin + self.rng.next_f32() * w,
                y: margin + self.rng.next_f32() * h,
                vx: 0.0,
                vy: 0.0,
                mass: 1.0,
                radius: DEFAULT_NODE_RADIUS,
                source_index: i,
            })
            .collect();

        edges.retain(|e| e.source < node_count && e.target < node_count);
        self.edges = edges;
        self.iterations = 0;
        self.settled = false;
    }

    /// Keep the node set but restart the iteration budget
    ///
    /// Used when data changes without changing the graph topology, so
    /// existing positions survive and the layout just re-relaxes.
    pub fn reheat(&mut self) {
        self.iterations = 0;
        self.settled = false;
    }

    /// Run one physics step
    pub fn step(&mut self) {
        if self.settled {
            return;
        }
        if self.nodes.is_empty() {
            self.settled = true;
            return;
        }

        self.quadtree.build(&self.nodes);

        // Barnes-Hut repulsion between all nodes
        for i in 0..self.nodes.len() {
            let (x, y) = (self.nodes[i].x, self.nodes[i].y);
            let (fx, fy) =
                self.quadtree
                    .repulsion_at(x, y, self.options.repulsion, self.options.theta);
            self.nodes[i].vx += fx;
            self.nodes[i].vy += fy;
        }

        // Spring attraction along edges
        for edge in &self.edges {
            let (source, target) = (edge.source, edge.target);
            let dx = self.nodes[target].x - self.nodes[source].x;
            let dy = self.nodes[target].y - self.nodes[source].y;
            let dist = (dx * dx + dy * dy).sqrt().max(1.0);

            // Hooke's law toward the rest length: F = k * (d - d0)
            let force = self.options.spring * (dist - edge.rest_length);
            let fx = force * dx / dist;
            let fy = force * dy / dist;

            self.nodes[source].vx += fx;
            self.nodes[source].vy += fy;
            self.nodes[target].vx -= fx;
            self.nodes[target].vy -= fy;
        }

        // Weak gravity toward the canvas center
        let cx = self.bounds[0] * 0.5;
        let cy = self.bounds[1] * 0.5;
        for node in &mut self.nodes {
            node.vx += (cx - node.x) * self.options.gravity;
            node.vy += (cy - node.y) * self.options.gravity;
        }

        // Integrate with friction; nodes stay inside the canvas
        let margin = self.options.bounds_margin;
        let max_x = (self.bounds[0] - margin).max(margin);
        let max_y = (self.bounds[1] - margin).max(margin);
        for node in &mut self.nodes {
            node.vx *= self.options.friction;
            node.vy *= self.options.friction;
            node.x = (node.x + node.vx).clamp(margin, max_x);
            node.y = (node.y + node.vy).clamp(margin, max_y);
        }

        self.iterations += 1;
        if self.iterations >= self.options.max_iterations {
            self.settled = true;
            tracing::debug!(iterations = self.iterations, "layout settled");
        }
    }

    /// Advance the step budget for one rendered frame
    ///
    /// Returns true while the simulation still wants more frames.
    pub fn tick(&mut self) -> bool {
        for _ in 0..self.options.steps_per_frame {
            self.step();
        }
        !self.settled
    }

    /// Run synchronously until settled (for tests and headless use)
    pub fn run_to_settled(&mut self) {
        while !self.settled {
            self.step();
        }
    }
}

/// Small deterministic generator for initial node placement
/// (splitmix64; seeded so layouts are reproducible under test).
#[derive(Debug, Clone)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1)
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}
