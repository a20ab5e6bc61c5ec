//! Arena-backed Barnes-Hut quadtree
//!
//! Nodes live in a flat `Vec` and reference each other by index, so
//! rebuilding the tree every simulation step reuses the same allocation.
//! Each cell carries the aggregate mass and mass-weighted centroid of the
//! bodies below it, which is all the force walk needs.

use super::LayoutNode;

/// Added to squared distances so coincident bodies cannot divide by zero.
const DIST_EPSILON: f32 = 0.01;

/// Insertion stops subdividing below this depth; coincident bodies fold
/// into the leaf's aggregates instead.
const MAX_DEPTH: u32 = 24;

/// Bodies lighter than this are clamped so centroid updates stay finite.
const MIN_BODY_MASS: f32 = 1e-6;

/// One cell of the quadtree
#[derive(Debug, Clone)]
struct QuadCell {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    /// Aggregate mass of all bodies at or below this cell
    mass: f32,
    /// Mass-weighted centroid
    cx: f32,
    cy: f32,
    /// Child arena indices (NW, NE, SW, SE), -1 when absent
    children: [i32; 4],
    /// Body index for a leaf holding a single body, -1 otherwise
    body: i32,
    /// Number of bodies at or below this cell
    count: u32,
}

impl QuadCell {
    fn empty(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            mass: 0.0,
            cx: 0.0,
            cy: 0.0,
            children: [-1; 4],
            body: -1,
            count: 0,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children == [-1; 4]
    }

    fn width(&self) -> f32 {
        self.x1 - self.x0
    }
}

/// Barnes-Hut quadtree over the layout's node positions
#[derive(Debug, Default)]
pub struct Quadtree {
    cells: Vec<QuadCell>,
}

impl Quadtree {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Number of cells in the arena (after a build)
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Root aggregate as (mass, centroid_x, centroid_y)
    pub fn root_aggregate(&self) -> Option<(f32, f32, f32)> {
        self.cells.first().map(|c| (c.mass, c.cx, c.cy))
    }

    /// Rebuild the tree over the given bodies, reusing the arena
    pub fn build(&mut self, nodes: &[LayoutNode]) {
        self.cells.clear();
        if nodes.is_empty() {
            return;
        }

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for n in nodes {
            min_x = min_x.min(n.x);
            min_y = min_y.min(n.y);
            max_x = max_x.max(n.x);
            max_y = max_y.max(n.y);
        }

        // Square root cell: one width per level keeps the theta criterion
        // uniform in both axes.
        let side = (max_x - min_x).max(max_y - min_y).max(1.0);
        let cx = (min_x + max_x) * 0.5;
        let cy = (min_y + max_y) * 0.5;
        let half = side * 0.5;
        self.cells.push(QuadCell::empty(cx - half, cy - half, cx + half, cy + half));

        for i in 0..nodes.len() {
            self.insert(nodes, i);
        }
    }

    /// Insert one body, updating aggregates along the descent
    fn insert(&mut self, nodes: &[LayoutNode], body: usize) {
        let bx = nodes[body].x;
        let by = nodes[body].y;
        let bm = nodes[body].mass.max(MIN_BODY_MASS);

        let mut idx = 0usize;
        let mut depth = 0u32;
        loop {
            {
                let cell = &mut self.cells[idx];
                let total = cell.mass + bm;
                cell.cx = (cell.cx * cell.mass + bx * bm) / total;
                cell.cy = (cell.cy * cell.mass + by * bm) / total;
                cell.mass = total;
                cell.count += 1;
            }

            if self.cells[idx].count == 1 {
                // First body in this region.
                self.cells[idx].body = body as i32;
                return;
            }

            if depth >= MAX_DEPTH {
                // Coincident bodies at the cap stay folded into the
                // aggregates above.
                return;
            }

            // A leaf that already holds a body subdivides: the resident
            // body is reseeded one level down, then the descent continues.
            let evicted = self.cells[idx].body;
            if evicted >= 0 {
                self.cells[idx].body = -1;
                let e = evicted as usize;
                let child = self.child_for(idx, nodes[e].x, nodes[e].y);
                let em = nodes[e].mass.max(MIN_BODY_MASS);
                let cell = &mut self.cells[child];
                cell.cx = nodes[e].x;
                cell.cy = nodes[e].y;
                cell.mass = em;
                cell.count = 1;
                cell.body = evicted;
            }

            idx = self.child_for(idx, bx, by);
            depth += 1;
        }
    }

    /// Child cell index for the quadrant containing (x, y), created on demand
    fn child_for(&mut self, parent: usize, x: f32, y: f32) -> usize {
        let (x0, y0, x1, y1) = {
            let p = &self.cells[parent];
            (p.x0, p.y0, p.x1, p.y1)
        };
        let mx = (x0 + x1) * 0.5;
        let my = (y0 + y1) * 0.5;

        // Screen space: y grows downward, so NW is the low-x, low-y corner.
        let (quadrant, cx0, cy0, cx1, cy1) = match (x >= mx, y >= my) {
            (false, false) => (0, x0, y0, mx, my),
            (true, false) => (1, mx, y0, x1, my),
            (false, true) => (2, x0, my, mx, y1),
            (true, true) => (3, mx, my, x1, y1),
        };

        let existing = self.cells[parent].children[quadrant];
        if existing >= 0 {
            existing as usize
        } else {
            let idx = self.cells.len();
            self.cells.push(QuadCell::empty(cx0, cy0, cx1, cy1));
            self.cells[parent].children[quadrant] = idx as i32;
            idx
        }
    }

    /// Accumulated Barnes-Hut repulsion on a body at (x, y)
    ///
    /// A cell whose width over distance falls below `theta`, or which holds
    /// a single body, acts as a point mass; otherwise the walk recurses.
    /// With `theta = 0` every cell is opened and the result matches the
    /// exact pairwise sum.
    pub fn repulsion_at(&self, x: f32, y: f32, repulsion: f32, theta: f32) -> (f32, f32) {
        let mut out = (0.0, 0.0);
        if !self.cells.is_empty() {
            self.accumulate(0, x, y, repulsion, theta, &mut out);
        }
        out
    }

    fn accumulate(
        &self,
        idx: usize,
        x: f32,
        y: f32,
        repulsion: f32,
        theta: f32,
        out: &mut (f32, f32),
    ) {
        let cell = &self.cells[idx];
        if cell.count == 0 {
            return;
        }

        let dx = x - cell.cx;
        let dy = y - cell.cy;
        let dist_sq = dx * dx + dy * dy + DIST_EPSILON;
        let width = cell.width();

        if cell.is_leaf() || width * width < theta * theta * dist_sq {
            // Point-mass approximation. A body querying its own leaf gets
            // dx = dy = 0 and contributes nothing.
            let force = repulsion * cell.mass / dist_sq;
            let dist = dist_sq.sqrt();
            out.0 += force * dx / dist;
            out.1 += force * dy / dist;
        } else {
            for &child in &cell.children {
                if child >= 0 {
                    self.accumulate(child as usize, x, y, repulsion, theta, out);
                }
            }
        }
    }
}
