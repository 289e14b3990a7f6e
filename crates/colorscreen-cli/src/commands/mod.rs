//! Subcommand implementations.

pub mod detect;
pub mod lcc;
pub mod par;
pub mod render_tile;
