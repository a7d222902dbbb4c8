/// Rectangles limiting map space.
pub mod boundary_box;
/// Geo projections.
pub mod flinger;
/// Vectors, polylines, and segments.
pub mod vector;
