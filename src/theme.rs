//! Resolved colors and sizing defaults applied when data omits styling

use serde::{Deserialize, Serialize};

/// Color constants for the built-in dark theme (RGBA, normalized 0.0-1.0)
pub mod colors {
    /// Background: near-black blue
    pub const BACKGROUND: [f32; 4] = [0.055, 0.063, 0.090, 1.0];

    /// Default point color: cyan (#4FC3F7)
    pub const POINT: [f32; 4] = [0.310, 0.765, 0.969, 1.0];

    /// Default graph node color: amber (#FFB74D)
    pub const NODE: [f32; 4] = [1.0, 0.718, 0.302, 1.0];

    /// Default graph edge color: translucent gray
    pub const EDGE: [f32; 4] = [0.5, 0.5, 0.5, 0.35];
}

/// Resolved theme handed to every series renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Clear color of the visual target
    pub background: [f32; 4],

    /// Fallback color for points without an explicit one
    pub point_color: [f32; 4],

    /// Fallback color for graph nodes
    pub node_color: [f32; 4],

    /// Color for graph edges
    pub edge_color: [f32; 4],

    /// Fallback point radius in pixels
    pub point_size: f32,

    /// Fallback graph node radius in pixels
    pub node_radius: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: colors::BACKGROUND,
            point_color: colors::POINT,
            node_color: colors::NODE,
            edge_color: colors::EDGE,
            point_size: 6.0,
            node_radius: 8.0,
        }
    }
}

impl Theme {
    /// Background as a wgpu clear color
    pub fn clear_color(&self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.background[0]),
            g: f64::from(self.background[1]),
            b: f64::from(self.background[2]),
            a: f64::from(self.background[3]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_theme_has_opaque_background() {
        let theme = Theme::default();
        assert_eq!(theme.background[3], 1.0);
        assert!(theme.point_size > 0.0);
    }

    #[test]
    fn clear_color_matches_background() {
        let theme = Theme::default();
        let clear = theme.clear_color();
        assert!((clear.r - f64::from(theme.background[0])).abs() < 1e-6);
        assert!((clear.a - 1.0).abs() < 1e-6);
    }
}
