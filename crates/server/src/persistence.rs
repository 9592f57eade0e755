//! World persistence using Minecraft's Anvil region file format (.mca).
//!
//! Loads `World` data (block sections and structure starts) from
//! `world/region/r.X.Z.mca` and writes modified chunks back. Saving merges
//! into the chunk already on disk: only `block_states` are replaced, so
//! biomes, heightmaps, structure references and everything else the engine
//! does not model survive untouched.
//!
//! The replaced-cell ledger lives next to the region directory in
//! `settlements_replaced.json`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{Cursor, Seek};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use fastnbt::{IntArray, LongArray, Value};
use serde::{Deserialize, Serialize};

use settlement_engine::replace::dedup::{DedupCache, DedupKey};
use settlement_engine::world::block::BlockId;
use settlement_engine::world::chunk::{Chunk, ChunkSection, SECTION_VOLUME};
use settlement_engine::world::position::{BlockBox, BlockPos, ChunkPos};
use settlement_engine::world::structure::StructureStart;
use settlement_engine::world::World;

use crate::block;

// ── MC 1.21.11 data version ─────────────────────────────────────────────────

/// DataVersion tag written into freshly created chunks. MC 1.21.11 = 4189.
const DATA_VERSION: i32 = 4189;

/// Structure start id the game writes for an empty slot.
const INVALID_START: &str = "INVALID";

pub const LEDGER_FILE: &str = "settlements_replaced.json";

// ── Palette conversion ──────────────────────────────────────────────────────

/// Convert a palette entry (name + optional properties) back to a BlockId.
fn palette_entry_to_block_id(entry: &PaletteEntry) -> BlockId {
    let resolved = match &entry.properties {
        Some(props) if !props.is_empty() => block::state_with_properties(
            &entry.name,
            props.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ),
        _ => block::state_with_properties(&entry.name, std::iter::empty()),
    };
    match resolved {
        Some(id) => id,
        None => {
            tracing::warn!("Unknown block in save file: {}, defaulting to air", entry.name);
            BlockId::AIR
        }
    }
}

/// Palette entry for a BlockId, as an NBT compound.
fn palette_entry_value(id: BlockId) -> Value {
    let mut entry = HashMap::new();
    entry.insert("Name".to_string(), Value::String(block::name_of(id)));
    let props = block::properties_of(id);
    if !props.is_empty() {
        let props = props
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        entry.insert("Properties".to_string(), Value::Compound(props));
    }
    Value::Compound(entry)
}

// ── Chunk NBT structs (serde, load side) ────────────────────────────────────

#[derive(Deserialize, Debug)]
struct ChunkNbt {
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(default)]
    sections: Vec<SectionNbt>,
    structures: Option<StructuresNbt>,
}

#[derive(Deserialize, Debug)]
struct SectionNbt {
    #[serde(rename = "Y")]
    y: i8,
    block_states: Option<BlockStatesNbt>,
}

#[derive(Deserialize, Debug)]
struct BlockStatesNbt {
    palette: Vec<PaletteEntry>,
    data: Option<LongArray>,
}

#[derive(Deserialize, Debug, Clone)]
struct PaletteEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Properties")]
    properties: Option<HashMap<String, String>>,
}

#[derive(Deserialize, Debug, Default)]
struct StructuresNbt {
    #[serde(default)]
    starts: HashMap<String, StartNbt>,
}

#[derive(Deserialize, Debug)]
struct StartNbt {
    id: String,
    #[serde(rename = "Children", default)]
    children: Vec<PieceNbt>,
}

#[derive(Deserialize, Debug)]
struct PieceNbt {
    id: String,
    #[serde(rename = "BB")]
    bb: Option<IntArray>,
}

// ── Bit-packing helpers ──────────────────────────────────────────────────────

/// Pack 4096 palette indices into a `Vec<i64>` using MC's bit-packing format.
///
/// `bits_per_entry` = max(4, ceil(log2(palette_len))).
/// Entries are packed sequentially into i64s with no entry spanning two longs.
fn pack_indices(indices: &[u16; SECTION_VOLUME], palette_len: usize) -> Option<Vec<i64>> {
    if palette_len <= 1 {
        return None; // single-block section, no data array needed
    }

    let bits = bits_per_entry(palette_len);
    let entries_per_long = 64 / bits;
    let num_longs = SECTION_VOLUME.div_ceil(entries_per_long);
    let mask = (1u64 << bits) - 1;

    let mut longs = vec![0i64; num_longs];
    for (i, &idx) in indices.iter().enumerate() {
        let long_idx = i / entries_per_long;
        let bit_offset = (i % entries_per_long) * bits;
        longs[long_idx] |= ((idx as u64 & mask) << bit_offset) as i64;
    }
    Some(longs)
}

/// Unpack palette indices back into 4096 entries.
fn unpack_indices(data: &[i64], palette_len: usize) -> [u16; SECTION_VOLUME] {
    let bits = bits_per_entry(palette_len);
    let entries_per_long = 64 / bits;
    let mask = (1u64 << bits) - 1;

    let mut indices = [0u16; SECTION_VOLUME];
    for (i, idx) in indices.iter_mut().enumerate() {
        let long_idx = i / entries_per_long;
        let bit_offset = (i % entries_per_long) * bits;
        if let Some(&long) = data.get(long_idx) {
            *idx = ((long as u64 >> bit_offset) & mask) as u16;
        }
    }
    indices
}

/// Calculate bits per palette entry (Anvil minimum is 4).
fn bits_per_entry(palette_len: usize) -> usize {
    let raw = if palette_len <= 1 {
        0
    } else {
        (usize::BITS - (palette_len - 1).leading_zeros()) as usize
    };
    raw.max(4)
}

// ── Save ─────────────────────────────────────────────────────────────────────

/// Save only dirty (modified) chunks to Anvil region files under `<dir>/region/`.
///
/// Chunks already present in a region file are merged (see module docs);
/// chunks seen for the first time get a minimal root carrying the world's
/// structure starts. Returns the number of chunks written.
pub fn save_world(world: &World, dir: &Path) -> Result<usize> {
    let dirty = world.take_dirty_chunks();
    if dirty.is_empty() {
        tracing::info!("World save: nothing to save (no dirty chunks)");
        return Ok(0);
    }

    let start = Instant::now();
    let region_dir = dir.join("region");
    fs::create_dir_all(&region_dir)
        .with_context(|| format!("creating {}", region_dir.display()))?;

    let mut by_region: HashMap<(i32, i32), Vec<ChunkPos>> = HashMap::new();
    for pos in dirty {
        by_region
            .entry((pos.x.div_euclid(32), pos.z.div_euclid(32)))
            .or_default()
            .push(pos);
    }

    let mut total_chunks = 0usize;

    for ((rx, rz), positions) in &by_region {
        let path = region_dir.join(format!("r.{}.{}.mca", rx, rz));

        let mut region = if path.exists() {
            let file_bytes = fs::read(&path)
                .with_context(|| format!("reading region r.{}.{}", rx, rz))?;
            fastanvil::Region::from_stream(Cursor::new(file_bytes))
                .with_context(|| format!("parsing region r.{}.{}", rx, rz))?
        } else {
            fastanvil::Region::new(Cursor::new(Vec::new()))
                .with_context(|| format!("creating region r.{}.{}", rx, rz))?
        };

        for pos in positions {
            // Chunk was removed between dirty-mark and save.
            if !world.has_chunk(*pos) {
                continue;
            }
            let local_x = pos.x.rem_euclid(32) as usize;
            let local_z = pos.z.rem_euclid(32) as usize;

            let existing = region
                .read_chunk(local_x, local_z)
                .with_context(|| format!("reading chunk ({}, {})", pos.x, pos.z))?;
            let mut root = match existing {
                Some(bytes) => match fastnbt::from_bytes::<Value>(&bytes) {
                    Ok(Value::Compound(root)) => root,
                    Ok(_) | Err(_) => {
                        tracing::warn!(x = pos.x, z = pos.z, "unreadable chunk on disk, rewriting from scratch");
                        fresh_root(world, *pos)
                    }
                },
                None => fresh_root(world, *pos),
            };

            let Some(chunk_ref) = world.get_chunk(pos) else {
                continue;
            };
            let sections = match root.remove("sections") {
                Some(Value::List(list)) => list,
                _ => Vec::new(),
            };
            let merged = merge_sections(sections, &chunk_ref);
            drop(chunk_ref);

            if !root.contains_key("yPos") {
                let y_pos = merged.first().and_then(section_y).unwrap_or(0);
                root.insert("yPos".to_string(), Value::Int(y_pos as i32));
            }
            root.insert("sections".to_string(), Value::List(merged));

            let nbt_bytes = fastnbt::to_bytes(&Value::Compound(root))
                .with_context(|| format!("serializing chunk ({}, {})", pos.x, pos.z))?;
            region
                .write_chunk(local_x, local_z, &nbt_bytes)
                .with_context(|| format!("writing chunk ({}, {})", pos.x, pos.z))?;
            total_chunks += 1;
        }

        // Flush: recover the cursor and write to disk.
        let mut cursor = region.into_inner()?;
        let len = cursor.stream_position()?;
        let data = cursor.into_inner();
        fs::write(&path, &data[..len as usize])
            .with_context(|| format!("writing {}", path.display()))?;
    }

    tracing::info!(
        "World saved: {} dirty chunks across {} regions ({:.2?})",
        total_chunks,
        by_region.len(),
        start.elapsed(),
    );
    Ok(total_chunks)
}

fn section_y(section: &Value) -> Option<i8> {
    match section {
        Value::Compound(map) => match map.get("Y") {
            Some(Value::Byte(y)) => Some(*y),
            _ => None,
        },
        _ => None,
    }
}

/// Replace the block states of every section on disk with the engine's
/// view, append sections the engine filled that disk lacked, and order the
/// result by Y.
fn merge_sections(on_disk: Vec<Value>, chunk: &Chunk) -> Vec<Value> {
    let mut ours: BTreeMap<i8, Value> = chunk
        .sections()
        .map(|(&idx, section)| (idx as i8, block_states_value(section)))
        .collect();

    let mut merged = Vec::with_capacity(on_disk.len() + ours.len());
    for section in on_disk {
        let Some(y) = section_y(&section) else {
            continue;
        };
        let Value::Compound(mut map) = section else {
            continue;
        };
        let states = ours.remove(&y).unwrap_or_else(air_block_states);
        map.insert("block_states".to_string(), states);
        merged.push(Value::Compound(map));
    }
    for (y, states) in ours {
        let mut map = HashMap::new();
        map.insert("Y".to_string(), Value::Byte(y));
        map.insert("block_states".to_string(), states);
        merged.push(Value::Compound(map));
    }
    merged.sort_by_key(|s| section_y(s).unwrap_or(i8::MIN));
    merged
}

fn air_block_states() -> Value {
    let mut map = HashMap::new();
    map.insert(
        "palette".to_string(),
        Value::List(vec![palette_entry_value(BlockId::AIR)]),
    );
    Value::Compound(map)
}

/// Convert one engine section to an Anvil `block_states` compound.
///
/// Engine sections are stored in YZX order, the same as Anvil, so indices
/// carry over directly.
fn block_states_value(section: &ChunkSection) -> Value {
    let mut palette_map: HashMap<BlockId, u16> = HashMap::new();
    let mut palette: Vec<Value> = Vec::new();
    let mut indices = [0u16; SECTION_VOLUME];

    for (i, &block_id) in section.blocks().iter().enumerate() {
        indices[i] = *palette_map.entry(block_id).or_insert_with(|| {
            palette.push(palette_entry_value(block_id));
            (palette.len() - 1) as u16
        });
    }

    let mut map = HashMap::new();
    if let Some(data) = pack_indices(&indices, palette.len()) {
        map.insert("data".to_string(), Value::LongArray(LongArray::new(data)));
    }
    map.insert("palette".to_string(), Value::List(palette));
    Value::Compound(map)
}

/// Root compound for a chunk that has no record on disk yet.
fn fresh_root(world: &World, pos: ChunkPos) -> HashMap<String, Value> {
    let mut root = HashMap::new();
    root.insert("DataVersion".to_string(), Value::Int(DATA_VERSION));
    root.insert("xPos".to_string(), Value::Int(pos.x));
    root.insert("zPos".to_string(), Value::Int(pos.z));
    root.insert("Status".to_string(), Value::String("minecraft:full".into()));
    root.insert(
        "structures".to_string(),
        structures_value(&world.structure_starts(pos)),
    );
    root
}

/// Structure starts as the game writes them: one child piece spanning the
/// recorded bounds, or a bare `INVALID` id.
fn structures_value(starts: &[StructureStart]) -> Value {
    let mut by_id = HashMap::new();
    for start in starts {
        let mut entry = HashMap::new();
        if start.valid {
            let bb = &start.bounds;
            let mut piece = HashMap::new();
            piece.insert("id".to_string(), Value::String(start.generator.clone()));
            piece.insert(
                "BB".to_string(),
                Value::IntArray(IntArray::new(vec![
                    bb.min.x as i32,
                    bb.min.y as i32,
                    bb.min.z as i32,
                    bb.max.x as i32,
                    bb.max.y as i32,
                    bb.max.z as i32,
                ])),
            );
            entry.insert("id".to_string(), Value::String(start.id.clone()));
            entry.insert("Children".to_string(), Value::List(vec![Value::Compound(piece)]));
        } else {
            entry.insert("id".to_string(), Value::String(INVALID_START.to_string()));
        }
        by_id.insert(start.id.clone(), Value::Compound(entry));
    }
    let mut structures = HashMap::new();
    structures.insert("starts".to_string(), Value::Compound(by_id));
    structures.insert("References".to_string(), Value::Compound(HashMap::new()));
    Value::Compound(structures)
}

// ── Load ─────────────────────────────────────────────────────────────────────

/// Load a world from Anvil region files under `<dir>/region/`.
///
/// Returns `None` if the region directory does not exist or contains no chunks.
pub fn load_world(dir: &Path) -> Result<Option<World>> {
    let region_dir = dir.join("region");
    if !region_dir.is_dir() {
        return Ok(None);
    }

    let start = Instant::now();
    block::warm_up();

    let world = World::new();
    let mut total_chunks = 0usize;
    let mut total_starts = 0usize;
    let mut region_count = 0usize;

    for entry in fs::read_dir(&region_dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".mca") {
            continue;
        }

        // Parse region coordinates from filename: r.X.Z.mca
        let parts: Vec<&str> = name.trim_end_matches(".mca").split('.').collect();
        let coords = match parts.as_slice() {
            ["r", x, z] => x.parse::<i32>().ok().zip(z.parse::<i32>().ok()),
            _ => None,
        };
        let Some((rx, rz)) = coords else {
            tracing::warn!("Skipping unexpected file in region dir: {}", name);
            continue;
        };

        let file = fs::File::open(&path)
            .with_context(|| format!("opening region file {}", path.display()))?;
        let mut region = fastanvil::Region::from_stream(file)
            .with_context(|| format!("parsing region file {}", path.display()))?;

        for x in 0..32usize {
            for z in 0..32usize {
                let Some(nbt_bytes) = region
                    .read_chunk(x, z)
                    .with_context(|| format!("reading chunk ({}, {}) from r.{}.{}", x, z, rx, rz))?
                else {
                    continue;
                };

                let chunk_nbt: ChunkNbt = fastnbt::from_bytes(&nbt_bytes).with_context(|| {
                    format!("deserializing chunk ({}, {}) from r.{}.{}", x, z, rx, rz)
                })?;

                let chunk_pos = ChunkPos::new(chunk_nbt.x_pos, chunk_nbt.z_pos);
                world.insert_chunk(chunk_pos, nbt_to_chunk(&chunk_nbt));
                for start in nbt_to_starts(chunk_pos, chunk_nbt.structures.as_ref()) {
                    world.add_structure_start(chunk_pos, start);
                    total_starts += 1;
                }
                total_chunks += 1;
            }
        }
        region_count += 1;
    }

    if total_chunks == 0 {
        return Ok(None);
    }

    tracing::info!(
        "World loaded: {} chunks, {} structure starts from {} regions ({:.2?})",
        total_chunks,
        total_starts,
        region_count,
        start.elapsed(),
    );
    Ok(Some(world))
}

/// Convert Anvil NBT chunk data back into an engine `Chunk`.
fn nbt_to_chunk(nbt: &ChunkNbt) -> Chunk {
    let mut chunk = Chunk::new();

    for section_nbt in &nbt.sections {
        let Some(states) = &section_nbt.block_states else {
            continue;
        };
        let resolved: Vec<BlockId> = states.palette.iter().map(palette_entry_to_block_id).collect();
        let Some(&first) = resolved.first() else {
            continue;
        };

        let mut blocks = [first; SECTION_VOLUME];
        if let Some(data) = states.data.as_ref().filter(|_| resolved.len() > 1) {
            let indices = unpack_indices(data, resolved.len());
            for (block, idx) in blocks.iter_mut().zip(indices) {
                *block = resolved.get(idx as usize).copied().unwrap_or(BlockId::AIR);
            }
        }

        chunk.insert_section(section_nbt.y as i32, ChunkSection::from_blocks(blocks));
    }

    chunk
}

/// Structure starts recorded in a chunk's `structures.starts` compound.
fn nbt_to_starts(pos: ChunkPos, structures: Option<&StructuresNbt>) -> Vec<StructureStart> {
    let Some(structures) = structures else {
        return Vec::new();
    };
    let mut keys: Vec<&String> = structures.starts.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let start = &structures.starts[key];
            let bounds = start
                .children
                .iter()
                .filter_map(|piece| piece.bb.as_deref().and_then(bb_to_box))
                .reduce(|a, b| a.union(&b));
            let generator = start
                .children
                .first()
                .map(|piece| piece.id.clone())
                .unwrap_or_default();
            let valid = start.id != INVALID_START && bounds.is_some();
            let origin = pos.block_origin(0);
            let id = if start.id == INVALID_START { key.clone() } else { start.id.clone() };
            StructureStart {
                id,
                generator,
                valid,
                bounds: bounds.unwrap_or(BlockBox::from_corners(origin, origin)),
            }
        })
        .collect()
}

/// `[minX, minY, minZ, maxX, maxY, maxZ]` to a box.
fn bb_to_box(bb: &[i32]) -> Option<BlockBox> {
    match *bb {
        [x0, y0, z0, x1, y1, z1] => Some(BlockBox::from_corners(
            BlockPos::new(x0 as i64, y0 as i64, z0 as i64),
            BlockPos::new(x1 as i64, y1 as i64, z1 as i64),
        )),
        _ => None,
    }
}

// ── Replaced-cell ledger ─────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Default)]
struct Ledger {
    cell_size: i64,
    cells: Vec<DedupKey>,
}

/// Seed `dedup` with the cells recorded as replaced under `dir`.
///
/// A missing ledger is an empty one. A ledger written with a different cell
/// size describes other cells, so it is ignored with a warning. Returns the
/// number of cells seeded.
pub fn load_ledger(dir: &Path, dedup: &DedupCache) -> Result<usize> {
    let path = dir.join(LEDGER_FILE);
    if !path.exists() {
        return Ok(0);
    }
    let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let ledger: Ledger =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    if ledger.cell_size != dedup.cell_size() {
        tracing::warn!(
            recorded = ledger.cell_size,
            configured = dedup.cell_size(),
            "replaced-cell ledger uses a different cell size; ignoring it"
        );
        return Ok(0);
    }
    let count = ledger.cells.len();
    dedup.seed(ledger.cells);
    tracing::info!(cells = count, "Seeded replaced-cell ledger");
    Ok(count)
}

/// Write every done cell of `dedup` to the ledger under `dir`.
pub fn save_ledger(dir: &Path, dedup: &DedupCache) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let ledger = Ledger {
        cell_size: dedup.cell_size(),
        cells: dedup.done_keys(),
    };
    let path = dir.join(LEDGER_FILE);
    let json = serde_json::to_string_pretty(&ledger)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(ledger.cells.len())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_entry() {
        assert_eq!(bits_per_entry(1), 4); // min 4
        assert_eq!(bits_per_entry(2), 4);
        assert_eq!(bits_per_entry(16), 4);
        assert_eq!(bits_per_entry(17), 5);
        assert_eq!(bits_per_entry(256), 8);
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let mut indices = [0u16; SECTION_VOLUME];
        for (i, idx) in indices.iter_mut().enumerate() {
            *idx = (i % 7) as u16;
        }
        let packed = pack_indices(&indices, 7).unwrap();
        assert_eq!(unpack_indices(&packed, 7), indices);
        assert!(pack_indices(&[0u16; SECTION_VOLUME], 1).is_none());
    }

    #[test]
    fn test_palette_entry_roundtrip() {
        let stairs = block::state_with_properties(
            "oak_stairs",
            [("facing", "west"), ("half", "top"), ("shape", "straight"), ("waterlogged", "false")],
        )
        .unwrap();
        let Value::Compound(map) = palette_entry_value(stairs) else {
            panic!("palette entry is a compound");
        };
        let Some(Value::Compound(props)) = map.get("Properties") else {
            panic!("stairs carry properties");
        };
        let entry = PaletteEntry {
            name: "minecraft:oak_stairs".into(),
            properties: Some(
                props
                    .iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => (k.clone(), s.clone()),
                        other => panic!("unexpected {other:?}"),
                    })
                    .collect(),
            ),
        };
        assert_eq!(palette_entry_to_block_id(&entry), stairs);

        let unknown = PaletteEntry { name: "minecraft:nope".into(), properties: None };
        assert_eq!(palette_entry_to_block_id(&unknown), BlockId::AIR);
    }

    #[test]
    fn test_starts_use_union_of_children() {
        let starts = StructuresNbt {
            starts: HashMap::from([
                (
                    "minecraft:village_plains".to_string(),
                    StartNbt {
                        id: "minecraft:village_plains".into(),
                        children: vec![
                            PieceNbt { id: "minecraft:jigsaw".into(), bb: Some(IntArray::new(vec![0, 60, 0, 10, 70, 10])) },
                            PieceNbt { id: "minecraft:other".into(), bb: Some(IntArray::new(vec![-5, 62, 4, 3, 80, 20])) },
                        ],
                    },
                ),
                (
                    "minecraft:mineshaft".to_string(),
                    StartNbt { id: INVALID_START.into(), children: Vec::new() },
                ),
            ]),
        };
        let parsed = nbt_to_starts(ChunkPos::new(0, 0), Some(&starts));
        assert_eq!(parsed.len(), 2);
        let mineshaft = &parsed[0];
        assert_eq!(mineshaft.id, "minecraft:mineshaft");
        assert!(!mineshaft.valid);
        let village = &parsed[1];
        assert!(village.valid);
        assert_eq!(village.generator, "minecraft:jigsaw");
        assert_eq!(
            village.bounds,
            BlockBox::from_corners(BlockPos::new(-5, 60, 0), BlockPos::new(10, 80, 20))
        );
    }

    #[test]
    fn test_merge_keeps_disk_sections_and_sorts() {
        let stone = block::default_state("stone").unwrap();
        let mut chunk = Chunk::new();
        chunk.insert_section(4, ChunkSection::new_filled(stone));
        chunk.insert_section(-1, ChunkSection::new_filled(stone));

        let mut disk_section = HashMap::new();
        disk_section.insert("Y".to_string(), Value::Byte(2));
        disk_section.insert("biomes".to_string(), Value::Compound(HashMap::new()));
        disk_section.insert("block_states".to_string(), block_states_value(&ChunkSection::new_filled(stone)));

        let merged = merge_sections(vec![Value::Compound(disk_section)], &chunk);
        let ys: Vec<i8> = merged.iter().filter_map(section_y).collect();
        assert_eq!(ys, vec![-1, 2, 4]);
        // Section 2 has no engine data any more: cleared to air, biomes kept.
        let Value::Compound(two) = &merged[1] else { panic!() };
        assert!(two.contains_key("biomes"));
        assert_eq!(two.get("block_states"), Some(&air_block_states()));
    }
}
