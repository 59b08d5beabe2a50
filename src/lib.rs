// src/lib.rs
//! A steppable BSP compiler for Doom-style 2D maps.
//!
//! [`BspBuilder`] turns a set of map lines into a [`BspTree`] of convex
//! subsectors. The build can run in one call or be advanced one atomic step at
//! a time for inspection.

pub mod bsp;
pub mod config;
pub mod error;
pub mod map;

pub use bsp::{BspBuilder, BspState, BspTree, Point2D};
pub use config::BspConfig;
pub use error::BspError;
pub use map::{LineId, MapData, MapLine};
