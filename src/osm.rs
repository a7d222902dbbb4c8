/// Fetching raw OSM documents.
pub mod getter;
/// The in-memory OpenStreetMap entity model and its parsers.
pub mod reader;
