//! Input data model for charts
//!
//! These types are what hosts hand to [`Chart::update`](crate::chart::Chart::update).
//! They are plain serde values so datasets can come from JSON files or be
//! built in code; resolution into GPU buffers happens inside the series
//! renderers.

use serde::{Deserialize, Serialize};

/// One datum in a 3D point series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointDatum {
    /// World-space position
    pub position: [f32; 3],

    /// Point radius in pixels; the theme default applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,

    /// RGBA color as normalized floats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[f32; 4]>,

    /// Optional label carried through to hit-test results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl PointDatum {
    /// Create a point at a position with all styling defaulted
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            size: None,
            color: None,
            label: None,
        }
    }
}

/// A node in a force-directed graph series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier, referenced by link endpoints
    pub id: String,

    /// Human-readable label for display and hit-test results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Node radius in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,

    /// RGBA color as normalized floats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[f32; 4]>,
}

impl GraphNode {
    /// Create a node with just an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            size: None,
            color: None,
        }
    }
}

/// A link between two graph nodes, referenced by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    /// Source node id
    pub source: String,

    /// Target node id
    pub target: String,

    /// Spring rest length in pixels; the layout default applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_length: Option<f32>,
}

impl GraphLink {
    /// Create a link with the default rest length
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rest_length: None,
        }
    }
}

/// Payload of one series, tagged by series type.
///
/// The tag string doubles as the registry key the chart uses to look up
/// a renderer, so `kind` of a custom registration must match the tag of
/// the data it is meant to draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeriesData {
    /// 3D scatter points
    Points { points: Vec<PointDatum> },

    /// Force-directed node-link graph, laid out in screen space
    Graph {
        nodes: Vec<GraphNode>,
        links: Vec<GraphLink>,
    },
}

impl SeriesData {
    /// Registry key for this series type
    pub fn kind(&self) -> &'static str {
        match self {
            SeriesData::Points { .. } => "points",
            SeriesData::Graph { .. } => "graph",
        }
    }
}

/// A single named series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    /// Display name, reported in hit-test results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub data: SeriesData,
}

impl Series {
    /// Wrap series data without a name
    pub fn from_data(data: SeriesData) -> Self {
        Self { name: None, data }
    }
}

/// Top-level payload for [`Chart::update`](crate::chart::Chart::update)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub series: Vec<Series>,
}

impl ChartData {
    pub fn new(series: Vec<Series>) -> Self {
        Self { series }
    }
}
