//! Tile request coordinates.
//!
//! A [`TileRequest`] identifies one stored artifact by layer, tile
//! coordinates and filename. Requests are produced by the host; the cache and
//! provider only read their fields.

/// A request for a single tile artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileRequest {
    /// Layer name (e.g. "basemap")
    pub layer: String,

    /// Tile X coordinate
    pub x: u32,

    /// Tile Y coordinate
    pub y: u32,

    /// Zoom level
    pub z: u32,

    /// Artifact filename within the tile (e.g. "tile.png", "tile@2x.png")
    pub filename: String,
}

impl TileRequest {
    /// Create a new tile request.
    pub fn new(
        layer: impl Into<String>,
        z: u32,
        x: u32,
        y: u32,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            layer: layer.into(),
            x,
            y,
            z,
            filename: filename.into(),
        }
    }

    /// Parse a request from a tile URL path of the form `/layer/z/x/y/filename`.
    ///
    /// The leading slash is optional and any query string is ignored. Returns
    /// `None` if the path does not have exactly five segments or if a
    /// coordinate is not a non-negative integer.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = path.strip_prefix('/').unwrap_or(path);

        let mut segments = path.split('/');
        let layer = segments.next().filter(|s| !s.is_empty())?;
        let z = segments.next()?.parse().ok()?;
        let x = segments.next()?.parse().ok()?;
        let y = segments.next()?.parse().ok()?;
        let filename = segments.next().filter(|s| !s.is_empty())?;

        if segments.next().is_some() {
            return None;
        }

        Some(Self::new(layer, z, x, y, filename))
    }
}
