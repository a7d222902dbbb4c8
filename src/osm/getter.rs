use std::fs;
use std::path::PathBuf;

use log::{debug, info};
use thiserror::Error;

use crate::geometry::boundary_box::BoundaryBox;

/// The raw node cap response of the OpenStreetMap API, reported verbatim.
const NODE_LIMIT_RESPONSE: &str = "You requested too many nodes (limit is 50000). \
  Either request a smaller area, or use planet.osm";

#[derive(Error, Debug)]
pub enum FetchError {
  #[error(
    "cannot download data: too many nodes (limit is 50000), try to request a smaller area"
  )]
  TooManyNodes,
  #[error("cannot download data: {0}")]
  Failed(String),
  #[error("cannot read cached data: {0}")]
  Io(#[from] std::io::Error),
}

/// Source of raw OSM documents for a boundary box.
///
/// The core never talks to the network itself; implementations are injected
/// by the driver and are responsible for retries and timeouts.
pub trait OsmFetcher {
  fn fetch(&self, boundary_box: &BoundaryBox) -> Result<String, FetchError>;
}

/// Classify a raw OpenStreetMap API response body.
///
/// Valid map documents start with `<`; the node-limit refusal is mapped to
/// its own error so the driver can report it verbatim.
pub fn classify_response(content: &[u8]) -> Result<String, FetchError> {
  if content.starts_with(b"<") {
    return String::from_utf8(content.to_vec())
      .map_err(|error| FetchError::Failed(error.to_string()));
  }
  if content == NODE_LIMIT_RESPONSE.as_bytes() {
    return Err(FetchError::TooManyNodes);
  }
  Err(FetchError::Failed("unexpected response".to_string()))
}

/// Fetcher that keeps downloaded documents in a cache directory, keyed by
/// the canonical boundary box format.
pub struct CachingFetcher<F> {
  inner: F,
  cache_path: PathBuf,
}

impl<F: OsmFetcher> CachingFetcher<F> {
  #[must_use]
  pub fn new(inner: F, cache_path: PathBuf) -> Self {
    Self { inner, cache_path }
  }

  fn document_path(&self, boundary_box: &BoundaryBox) -> PathBuf {
    self.cache_path.join(format!("{}.osm", boundary_box.get_format()))
  }
}

impl<F: OsmFetcher> OsmFetcher for CachingFetcher<F> {
  fn fetch(&self, boundary_box: &BoundaryBox) -> Result<String, FetchError> {
    let path = self.document_path(boundary_box);
    if path.is_file() {
      debug!("Using cached {}.", path.display());
      return Ok(fs::read_to_string(&path)?);
    }
    let content = self.inner.fetch(boundary_box)?;
    fs::create_dir_all(&self.cache_path)?;
    fs::write(&path, &content)?;
    info!("Cached OSM data to {}.", path.display());
    Ok(content)
  }
}

/// Fetcher over a directory of already downloaded `<format>.osm` documents.
pub struct DirectoryFetcher {
  cache_path: PathBuf,
}

impl DirectoryFetcher {
  #[must_use]
  pub fn new(cache_path: PathBuf) -> Self {
    Self { cache_path }
  }
}

impl OsmFetcher for DirectoryFetcher {
  fn fetch(&self, boundary_box: &BoundaryBox) -> Result<String, FetchError> {
    let path = self.cache_path.join(format!("{}.osm", boundary_box.get_format()));
    if path.is_file() {
      return Ok(fs::read_to_string(&path)?);
    }
    Err(FetchError::Failed(format!("no cached document {}", path.display())))
  }
}
