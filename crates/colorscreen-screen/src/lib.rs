//! Synthesis of the 128x128 periodic `mult`/`add` tile that models one
//! repeat of an additive color-screen mosaic, for every supported
//! [`ScreenType`](colorscreen_core::ScreenType).

mod tile;

pub use tile::ScreenTile;
