//! Minecraft block registry and the classification tables built from it.
//!
//! `BlockId` values are MC block state IDs (from azalea-block), so a single
//! block type such as `oak_stairs` owns many ids. Tables are therefore built
//! by name and expanded to every state of each named block.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use azalea_block::{BlockState, BlockTrait};
use azalea_registry::builtin::BlockKind;

use settlement_engine::replace::tables::BlockTables;
use settlement_engine::world::block::BlockId;

pub const NAMESPACE: &str = "minecraft";

/// Key for the reverse lookup: `("stone", [])` or
/// `("oak_stairs", [("facing", "north"), ...])` with properties sorted.
type StateKey = (String, Vec<(String, String)>);

struct Registry {
    by_state: HashMap<StateKey, u16>,
    by_name: HashMap<String, Vec<u16>>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let mut by_state = HashMap::new();
    let mut by_name: HashMap<String, Vec<u16>> = HashMap::new();
    for id in 0..=BlockState::MAX_STATE {
        let Ok(state) = BlockState::try_from(id as u32) else {
            continue;
        };
        let block: Box<dyn BlockTrait> = Box::<dyn BlockTrait>::from(state);
        let name = block.id().to_string();
        let mut props: Vec<(String, String)> = block
            .property_map()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        props.sort();
        by_name.entry(name.clone()).or_default().push(id);
        by_state.insert((name, props), id);
    }
    Registry { by_state, by_name }
});

/// Force the registry to build now rather than on first lookup.
pub fn warm_up() {
    LazyLock::force(&REGISTRY);
}

/// `minecraft:stone` or `stone` -> `stone`. Other namespaces are not ours.
pub fn strip_namespace(name: &str) -> Option<&str> {
    match name.split_once(':') {
        Some((NAMESPACE, path)) => Some(path),
        Some(_) => None,
        None => Some(name),
    }
}

/// Prefix a bare identifier with the default namespace.
pub fn qualify(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{NAMESPACE}:{name}")
    }
}

/// The default state of a named block.
pub fn default_state(name: &str) -> Option<BlockId> {
    let path = strip_namespace(name)?;
    let kind = path.parse::<BlockKind>().ok()?;
    Some(BlockId(u32::from(BlockState::from(kind)) as u16))
}

/// A specific state of a named block. Properties may be given in any order.
pub fn state_with_properties<'a>(
    name: &str,
    properties: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Option<BlockId> {
    let path = strip_namespace(name)?;
    let mut props: Vec<(String, String)> = properties
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    props.sort();
    REGISTRY
        .by_state
        .get(&(path.to_string(), props))
        .map(|&id| BlockId(id))
}

/// Every state id of a named block (empty if the name is unknown).
pub fn states_of(name: &str) -> &'static [u16] {
    strip_namespace(name)
        .and_then(|path| REGISTRY.by_name.get(path))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn block_of(id: BlockId) -> Box<dyn BlockTrait> {
    let state = BlockState::try_from(id.0 as u32).unwrap_or(BlockState::AIR);
    Box::<dyn BlockTrait>::from(state)
}

/// Namespaced name of the block type, e.g. `minecraft:oak_stairs`.
pub fn name_of(id: BlockId) -> String {
    format!("{NAMESPACE}:{}", block_of(id).id())
}

/// State properties of `id`, sorted by key. Empty for simple blocks.
pub fn properties_of(id: BlockId) -> Vec<(String, String)> {
    let mut props: Vec<(String, String)> = block_of(id)
        .property_map()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    props.sort();
    props
}

// ── Classification tables ───────────────────────────────────────────────────

/// Functional and decorative blocks that mark generated settlements.
pub const STRUCTURE_SPECIFIC: &[&str] = &[
    "bell",
    // beds
    "white_bed", "orange_bed", "magenta_bed", "light_blue_bed", "yellow_bed", "lime_bed",
    "pink_bed", "gray_bed", "light_gray_bed", "cyan_bed", "purple_bed", "blue_bed",
    "brown_bed", "green_bed", "red_bed", "black_bed",
    // workstations
    "smithing_table", "fletching_table", "cartography_table", "brewing_stand", "cauldron",
    "composter", "barrel", "smoker", "blast_furnace", "grindstone", "lectern", "loom",
    "stonecutter",
    // crops
    "wheat", "carrots", "potatoes", "beetroots", "melon_stem", "pumpkin_stem",
    "sweet_berry_bush",
    // oak (plains)
    "oak_log", "oak_wood", "oak_planks", "oak_stairs", "oak_slab", "oak_fence",
    "oak_fence_gate", "oak_door", "oak_trapdoor", "oak_pressure_plate",
    // spruce (taiga, snowy)
    "spruce_log", "spruce_wood", "spruce_planks", "spruce_stairs", "spruce_slab",
    "spruce_fence", "spruce_fence_gate", "spruce_door", "spruce_trapdoor",
    "spruce_pressure_plate",
    // acacia (savanna)
    "acacia_log", "acacia_wood", "acacia_planks", "acacia_stairs", "acacia_slab",
    "acacia_fence", "acacia_fence_gate", "acacia_door", "acacia_trapdoor",
    "acacia_pressure_plate",
    // birch
    "birch_log", "birch_planks", "birch_stairs", "birch_slab", "birch_fence",
    "birch_fence_gate", "birch_door", "birch_trapdoor", "birch_pressure_plate",
    // sandstone (desert)
    "sandstone", "smooth_sandstone", "cut_sandstone", "sandstone_stairs", "sandstone_slab",
    "sandstone_wall",
    // cobblestone and stone bricks
    "cobblestone", "cobblestone_stairs", "cobblestone_slab", "cobblestone_wall",
    "mossy_cobblestone", "stone_bricks", "stone_brick_stairs", "stone_brick_slab",
    "stone_brick_wall", "smooth_stone", "smooth_stone_slab",
    // bricks
    "bricks", "brick_stairs", "brick_slab", "brick_wall",
    // infrastructure
    "dirt_path", "torch", "wall_torch", "lantern", "campfire", "hay_block", "farmland",
    "glass_pane", "glass", "ladder", "chest", "crafting_table", "furnace", "bookshelf",
    // stripped wood
    "stripped_oak_log", "stripped_spruce_log", "stripped_birch_log", "stripped_acacia_log",
    "stripped_jungle_log", "stripped_dark_oak_log", "stripped_oak_wood",
    "stripped_spruce_wood", "stripped_birch_wood", "stripped_acacia_wood",
    "stripped_jungle_wood", "stripped_dark_oak_wood",
    // wool
    "white_wool", "orange_wool", "magenta_wool", "light_blue_wool", "yellow_wool",
    "lime_wool", "pink_wool", "gray_wool", "light_gray_wool", "cyan_wool", "purple_wool",
    "blue_wool", "brown_wool", "green_wool", "red_wool", "black_wool",
    // terracotta
    "terracotta", "white_terracotta", "orange_terracotta", "magenta_terracotta",
    "light_blue_terracotta", "yellow_terracotta", "lime_terracotta", "pink_terracotta",
    "gray_terracotta", "light_gray_terracotta", "cyan_terracotta", "purple_terracotta",
    "blue_terracotta", "brown_terracotta", "green_terracotta", "red_terracotta",
    "black_terracotta",
    "white_glazed_terracotta", "orange_glazed_terracotta", "magenta_glazed_terracotta",
    "light_blue_glazed_terracotta", "yellow_glazed_terracotta", "lime_glazed_terracotta",
    "pink_glazed_terracotta", "gray_glazed_terracotta", "light_gray_glazed_terracotta",
    "cyan_glazed_terracotta", "purple_glazed_terracotta", "blue_glazed_terracotta",
    "brown_glazed_terracotta", "green_glazed_terracotta", "red_glazed_terracotta",
    "black_glazed_terracotta",
];

/// Terrain the tight pass leaves alone.
pub const NATURAL: &[&str] = &[
    "grass_block", "dirt", "coarse_dirt", "podzol", "mycelium", "sand", "red_sand", "gravel",
    "stone", "andesite", "diorite", "granite", "clay", "water", "lava", "bedrock", "snow",
    "snow_block", "ice", "packed_ice", "blue_ice", "deepslate", "tuff", "calcite",
    "short_grass", "tall_grass", "fern", "large_fern", "dandelion", "poppy",
];

/// Undisturbed surface blocks; ground samples resting on these win.
pub const TOPSOIL: &[&str] = &[
    "grass_block", "dirt", "coarse_dirt", "podzol", "mycelium", "sand", "red_sand",
    "snow_block",
];

pub const WATER: &[&str] = &["water"];

/// Non-air blocks a ground sample looks straight through.
pub const PASSABLE: &[&str] = &[
    "short_grass", "tall_grass", "fern", "large_fern", "dandelion", "poppy", "dead_bush",
    "snow",
];

/// Never removed.
pub const PROTECTED: &[&str] = &["bedrock"];

/// Every state id of every named block.
pub fn ids_of(names: &[&str]) -> HashSet<BlockId> {
    let mut ids = HashSet::new();
    for name in names {
        let states = states_of(name);
        if states.is_empty() {
            tracing::warn!(block = name, "block not in registry; left out of table");
        }
        ids.extend(states.iter().map(|&id| BlockId(id)));
    }
    ids
}

/// The vanilla classification tables.
pub fn minecraft_tables() -> BlockTables {
    BlockTables {
        structure_specific: ids_of(STRUCTURE_SPECIFIC),
        natural: ids_of(NATURAL),
        topsoil: ids_of(TOPSOIL),
        water: ids_of(WATER),
        passable: ids_of(PASSABLE),
        protected: ids_of(PROTECTED),
    }
}
