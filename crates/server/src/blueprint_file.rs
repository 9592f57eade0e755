//! Blueprint JSON files.
//!
//! ```json
//! { "name": "cabin", "width": 5, "height": 4, "length": 5,
//!   "blockData": [ { "x": 0, "y": 0, "z": 0, "block": "minecraft:oak_planks" }, ... ] }
//! ```
//!
//! Cells may carry an optional `properties` object for stateful blocks
//! (stairs facing, slab half...). Names without a namespace are read as
//! `minecraft:`. A name the block registry does not know becomes air.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use settlement_engine::replace::{Blueprint, BlueprintCell, BlueprintSet};
use settlement_engine::world::World;
use settlement_engine::world::block::BlockId;
use settlement_engine::world::position::{BlockBox, BlockPos};

use crate::block;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintFile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub length: u32,
    #[serde(rename = "blockData")]
    pub block_data: Vec<BlockEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub block: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl BlockEntry {
    fn resolve(&self) -> Option<BlockId> {
        let name = block::qualify(&self.block);
        if self.properties.is_empty() {
            block::default_state(&name)
        } else {
            block::state_with_properties(
                &name,
                self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            )
        }
    }
}

impl BlueprintFile {
    /// Resolve every entry against the block registry.
    pub fn into_blueprint(self) -> Result<Blueprint> {
        let mut unresolved = 0usize;
        let cells = self
            .block_data
            .iter()
            .map(|entry| {
                let block = entry.resolve().unwrap_or_else(|| {
                    unresolved += 1;
                    tracing::warn!(
                        blueprint = %self.name,
                        block = %entry.block,
                        x = entry.x, y = entry.y, z = entry.z,
                        "unknown block, placing air instead"
                    );
                    BlockId::AIR
                });
                BlueprintCell {
                    x: entry.x,
                    y: entry.y,
                    z: entry.z,
                    block,
                }
            })
            .collect();
        if unresolved > 0 {
            tracing::warn!(blueprint = %self.name, unresolved, "blueprint has unresolved blocks");
        }
        Ok(Blueprint::new(self.name, self.width, self.height, self.length, cells)?)
    }

    pub fn from_blueprint(blueprint: &Blueprint) -> Self {
        let block_data = blueprint
            .cells()
            .iter()
            .map(|cell| BlockEntry {
                x: cell.x,
                y: cell.y,
                z: cell.z,
                block: block::name_of(cell.block),
                properties: block::properties_of(cell.block).into_iter().collect(),
            })
            .collect();
        Self {
            name: blueprint.name().to_string(),
            width: blueprint.width(),
            height: blueprint.height(),
            length: blueprint.length(),
            block_data,
        }
    }
}

pub fn load(path: &Path) -> Result<Blueprint> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading blueprint {}", path.display()))?;
    let file: BlueprintFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing blueprint {}", path.display()))?;
    file.into_blueprint()
        .with_context(|| format!("building blueprint {}", path.display()))
}

pub fn save(blueprint: &Blueprint, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&BlueprintFile::from_blueprint(blueprint))?;
    fs::write(path, json).with_context(|| format!("writing blueprint {}", path.display()))
}

/// Every `*.json` blueprint in `dir`, registered in file-name order. Files
/// that fail to load are logged and skipped.
pub fn load_dir(dir: &Path) -> Result<BlueprintSet> {
    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("listing blueprints in {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut set = BlueprintSet::new();
    for path in paths {
        match load(&path) {
            Ok(blueprint) => {
                tracing::info!(
                    name = blueprint.name(),
                    blocks = blueprint.non_air_count(),
                    "Loaded blueprint {}",
                    path.display()
                );
                set.register(blueprint);
            }
            Err(e) => tracing::error!("Skipping blueprint {}: {e:#}", path.display()),
        }
    }
    Ok(set)
}

/// Record every block (air included) of the inclusive box spanned by `a`
/// and `b` as a blueprint anchored at the box's minimum corner.
pub fn capture(world: &World, a: BlockPos, b: BlockPos, name: &str) -> Result<Blueprint> {
    let bounds = BlockBox::from_corners(a, b);
    let (width, height, length) = bounds.size();
    let mut cells = Vec::with_capacity((width * height * length) as usize);
    for y in bounds.min.y..=bounds.max.y {
        for z in bounds.min.z..=bounds.max.z {
            for x in bounds.min.x..=bounds.max.x {
                let pos = BlockPos::new(x, y, z);
                let block = world
                    .block(pos)
                    .with_context(|| format!("capturing ({x}, {y}, {z})"))?;
                cells.push(BlueprintCell {
                    x: (x - bounds.min.x) as i32,
                    y: (y - bounds.min.y) as i32,
                    z: (z - bounds.min.z) as i32,
                    block,
                });
            }
        }
    }
    Ok(Blueprint::new(
        name,
        width as u32,
        height as u32,
        length as u32,
        cells,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_and_unknown_names() {
        let file: BlueprintFile = serde_json::from_str(
            r#"{ "name": "t", "width": 2, "height": 1, "length": 1,
                 "blockData": [
                   { "x": 0, "y": 0, "z": 0, "block": "oak_planks" },
                   { "x": 1, "y": 0, "z": 0, "block": "somemod:thing" }
                 ] }"#,
        )
        .unwrap();
        let bp = file.into_blueprint().unwrap();
        assert_eq!(bp.cells()[0].block, block::default_state("minecraft:oak_planks").unwrap());
        assert_eq!(bp.cells()[1].block, BlockId::AIR);
    }

    #[test]
    fn properties_select_a_state() {
        let entry = BlockEntry {
            x: 0,
            y: 0,
            z: 0,
            block: "minecraft:oak_stairs".into(),
            properties: BTreeMap::from([
                ("facing".to_string(), "south".to_string()),
                ("half".to_string(), "top".to_string()),
                ("shape".to_string(), "straight".to_string()),
                ("waterlogged".to_string(), "false".to_string()),
            ]),
        };
        let id = entry.resolve().unwrap();
        assert_ne!(id, block::default_state("oak_stairs").unwrap());
        assert!(block::properties_of(id).contains(&("half".to_string(), "top".to_string())));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let file = BlueprintFile {
            name: "flat".into(),
            width: 3,
            height: 0,
            length: 3,
            block_data: Vec::new(),
        };
        assert!(file.into_blueprint().is_err());
    }
}
