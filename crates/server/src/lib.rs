//! Minecraft host for the settlement replacement engine.
//!
//! `block` maps vanilla block names onto engine `BlockId`s and builds the
//! classification tables; `persistence` moves worlds in and out of Anvil
//! region files; `blueprint_file` reads and writes blueprint JSON.

pub mod block;
pub mod blueprint_file;
pub mod config;
pub mod metrics;
pub mod persistence;
