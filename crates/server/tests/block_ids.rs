use azalea_block::{blocks, BlockState, BlockTrait};
use azalea_registry::builtin::BlockKind;

use settlement_server::block;

#[test]
fn registry_agrees_with_azalea_states() {
    let ids: Vec<(&str, u32, u32)> = vec![
        ("stone", u32::from(blocks::Stone {}.as_block_state()), block::default_state("stone").unwrap().0 as u32),
        ("bedrock", u32::from(blocks::Bedrock {}.as_block_state()), block::default_state("minecraft:bedrock").unwrap().0 as u32),
        (
            "grass_block(snowy=false)",
            u32::from(blocks::GrassBlock { snowy: false }.as_block_state()),
            block::state_with_properties("grass_block", [("snowy", "false")]).unwrap().0 as u32,
        ),
        (
            "oak_log(y)",
            u32::from(blocks::OakLog { axis: azalea_block::properties::Axis::Y }.as_block_state()),
            block::state_with_properties("oak_log", [("axis", "y")]).unwrap().0 as u32,
        ),
        (
            "water(default via BlockKind)",
            u32::from(BlockState::from(BlockKind::Water)),
            block::default_state("water").unwrap().0 as u32,
        ),
    ];
    for (name, azalea, ours) in &ids {
        assert_eq!(azalea, ours, "{name} resolves to a different state");
    }
}

#[test]
fn every_state_of_a_block_shares_its_name() {
    let states = block::states_of("bell");
    assert!(states.len() > 1, "bell has attachment/facing/powered states");
    for &id in states {
        assert_eq!(block::name_of(settlement_engine::world::block::BlockId(id)), "minecraft:bell");
    }
}
