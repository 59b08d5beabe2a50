// src/map/mod.rs
pub mod linedef;

pub use linedef::{LineId, MapLine};

use crate::error::BspError;

/// The map-data collaborator. Anything that can hand over its lines once, in a
/// stable order, can feed the builder.
pub trait MapData {
    fn lines(&self) -> Result<Vec<MapLine>, BspError>;
}

impl MapData for [MapLine] {
    fn lines(&self) -> Result<Vec<MapLine>, BspError> {
        Ok(self.to_vec())
    }
}

impl MapData for Vec<MapLine> {
    fn lines(&self) -> Result<Vec<MapLine>, BspError> {
        Ok(self.clone())
    }
}
