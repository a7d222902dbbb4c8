/// Color parsing, luminance, and gradients.
pub mod color;
/// Map drawing configuration.
pub mod config;
/// Node and way constructor.
pub mod constructor;
/// Map features: buildings, roads, trees, craters, direction sectors.
pub mod feature;
/// Drawable figures.
pub mod figure;
/// Geometry primitives, projections, and boundary boxes.
pub mod geometry;
/// The icon shape library.
pub mod icon;
/// The OpenStreetMap data model and document fetching.
pub mod osm;
/// The map painter.
pub mod painter;
/// Points with icons and labels, and the occupancy grid.
pub mod point;
/// The tag-to-style drawing scheme.
pub mod scheme;
/// Text label construction.
pub mod text;
/// Slippy tile generation.
pub mod tile;
