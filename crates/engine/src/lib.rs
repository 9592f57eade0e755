//! Settlement replacement engine.
//!
//! `world` is the spatial substrate shared with the host (blocks, structure
//! records, living entities). `replace` is the pipeline that finds generated
//! settlements in that world and swaps them for a blueprint, a bounded amount
//! of work per tick.

pub mod replace;
pub mod world;
