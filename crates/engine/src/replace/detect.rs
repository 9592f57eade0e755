//! Deciding whether a structure start is a settlement.
//!
//! Known settlement types are matched by exact identifier. Anything else goes
//! through a naming heuristic that favours recall: an identifier or
//! generator mentioning `village`, or a jigsaw-built structure whose
//! identifier names one of the settlement biomes. Heuristic hits are
//! reported separately so the caller can decide whether to trust them.

use crate::world::structure::StructureStart;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementVariant {
    Plains,
    Desert,
    Savanna,
    Snowy,
    Taiga,
}

impl SettlementVariant {
    pub const ALL: [SettlementVariant; 5] = [
        SettlementVariant::Plains,
        SettlementVariant::Desert,
        SettlementVariant::Savanna,
        SettlementVariant::Snowy,
        SettlementVariant::Taiga,
    ];

    /// The registry identifier of this variant.
    pub const fn identifier(self) -> &'static str {
        match self {
            SettlementVariant::Plains => "minecraft:village_plains",
            SettlementVariant::Desert => "minecraft:village_desert",
            SettlementVariant::Savanna => "minecraft:village_savanna",
            SettlementVariant::Snowy => "minecraft:village_snowy",
            SettlementVariant::Taiga => "minecraft:village_taiga",
        }
    }

    /// Biome token used by the fallback heuristic.
    pub const fn token(self) -> &'static str {
        match self {
            SettlementVariant::Plains => "plains",
            SettlementVariant::Desert => "desert",
            SettlementVariant::Savanna => "savanna",
            SettlementVariant::Snowy => "snowy",
            SettlementVariant::Taiga => "taiga",
        }
    }

    pub fn from_identifier(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.identifier() == id)
    }
}

/// How a structure was recognised as a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementMatch {
    Known(SettlementVariant),
    /// Matched only by the naming heuristic.
    Heuristic,
}

const SETTLEMENT_TOKEN: &str = "village";
const JIGSAW_TOKEN: &str = "jigsaw";

/// Classify a structure start. Validity is not considered here.
pub fn identify(start: &StructureStart) -> Option<SettlementMatch> {
    if let Some(variant) = SettlementVariant::from_identifier(&start.id) {
        return Some(SettlementMatch::Known(variant));
    }

    let id = start.id.to_ascii_lowercase();
    let generator = start.generator.to_ascii_lowercase();

    if id.contains(SETTLEMENT_TOKEN) || generator.contains(SETTLEMENT_TOKEN) {
        return Some(SettlementMatch::Heuristic);
    }
    if generator.contains(JIGSAW_TOKEN)
        && SettlementVariant::ALL.iter().any(|v| id.contains(v.token()))
    {
        return Some(SettlementMatch::Heuristic);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::position::{BlockBox, BlockPos};

    fn start(id: &str, generator: &str) -> StructureStart {
        let bb = BlockBox::from_corners(BlockPos::new(0, 60, 0), BlockPos::new(32, 80, 32));
        StructureStart::new(id, generator, bb)
    }

    #[test]
    fn known_variants_match_exactly() {
        for variant in SettlementVariant::ALL {
            assert_eq!(
                identify(&start(variant.identifier(), "minecraft:jigsaw")),
                Some(SettlementMatch::Known(variant))
            );
        }
    }

    #[test]
    fn heuristic_catches_renamed_settlements() {
        assert_eq!(
            identify(&start("somemod:village_swamp", "somemod:pieces")),
            Some(SettlementMatch::Heuristic)
        );
        assert_eq!(
            identify(&start("somemod:desert_outpost", "minecraft:jigsaw")),
            Some(SettlementMatch::Heuristic)
        );
    }

    #[test]
    fn unrelated_structures_are_ignored() {
        assert_eq!(identify(&start("minecraft:desert_pyramid", "minecraft:desert_pyramid")), None);
        assert_eq!(identify(&start("minecraft:bastion_remnant", "minecraft:jigsaw")), None);
    }
}
