//! Fastest-driver-per-minisector comparison of two qualifying laps.
//!
//! Two telemetry traces are merged, the lap distance is cut into equal
//! minisectors, each minisector goes to the driver with the higher mean
//! speed, and the labelled samples can be rendered as a coloured track map.

pub mod attribute;
pub mod cache;
pub mod competitor;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod render;
pub mod trace;

pub use attribute::{
    attribute, Attribution, Attributor, BoundaryPolicy, CompetitorMean, SegmentWinner,
};
pub use cache::TraceCache;
pub use competitor::{Competitor, Event};
pub use config::{ComparisonConfig, SegmentRange};
pub use error::{MinisectorError, Result};
pub use loader::{FileTraceSource, MemoryTraceSource, TraceSource};
pub use pipeline::{compare, Comparison};
pub use render::{render_png, render_svg, RenderError, RenderOptions};
pub use trace::{MergedSample, Sample, Trace};
