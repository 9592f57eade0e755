use std::collections::HashSet;

use crate::world::block::BlockId;

/// Block classification tables handed to the pipeline at construction.
///
/// The engine never decides what a block *is*; the host supplies these sets.
#[derive(Debug, Clone, Default)]
pub struct BlockTables {
    /// Functional/decorative blocks strongly associated with settlements.
    /// The wide pass removes only these.
    pub structure_specific: HashSet<BlockId>,
    /// Natural terrain the tight pass leaves in place.
    pub natural: HashSet<BlockId>,
    /// Surface blocks that mark undisturbed ground for placement sampling.
    pub topsoil: HashSet<BlockId>,
    /// Fluid blocks subject to the artificial-water vote.
    pub water: HashSet<BlockId>,
    /// Non-air blocks a ground sample can pass through (plants, snow layers).
    pub passable: HashSet<BlockId>,
    /// Never removed, whatever the other tables say.
    pub protected: HashSet<BlockId>,
}

impl BlockTables {
    pub fn is_structure_specific(&self, id: BlockId) -> bool {
        self.structure_specific.contains(&id)
    }

    pub fn is_natural(&self, id: BlockId) -> bool {
        self.natural.contains(&id)
    }

    pub fn is_topsoil(&self, id: BlockId) -> bool {
        self.topsoil.contains(&id)
    }

    pub fn is_water(&self, id: BlockId) -> bool {
        self.water.contains(&id)
    }

    pub fn is_protected(&self, id: BlockId) -> bool {
        self.protected.contains(&id)
    }

    /// Can a ground sample rest on this block?
    pub fn is_solid(&self, id: BlockId) -> bool {
        !id.is_air() && !self.water.contains(&id) && !self.passable.contains(&id)
    }

    /// Does a ground sample see open space here?
    pub fn is_open(&self, id: BlockId) -> bool {
        id.is_air() || self.passable.contains(&id)
    }
}
