/// Building extrusion.
pub mod building;
/// Craters drawn as gradient rings.
pub mod crater;
/// Direction sectors for views and cameras.
pub mod direction;
/// Road network with connectors and intersections.
pub mod road;
/// Trees with crowns and trunks.
pub mod tree;
