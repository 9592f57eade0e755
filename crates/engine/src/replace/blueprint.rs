//! In-memory blueprint model and the registry of active blueprints.

use std::sync::Arc;

use crate::world::block::BlockId;

use super::error::ReplaceError;

/// One block of a blueprint, relative to the footprint's minimum corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlueprintCell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub block: BlockId,
}

/// An immutable, pre-authored block layout.
///
/// Shared by reference (`Arc<Blueprint>`) between every job that places it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    name: String,
    width: u32,
    height: u32,
    length: u32,
    cells: Vec<BlueprintCell>,
}

impl Blueprint {
    /// Dimensions must be positive. Cells are kept in the order given, which
    /// is also the order they are written in.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        length: u32,
        cells: Vec<BlueprintCell>,
    ) -> Result<Self, ReplaceError> {
        let name = name.into();
        if width == 0 || height == 0 || length == 0 {
            return Err(ReplaceError::InvalidBlueprint(format!(
                "'{name}' has a zero dimension ({width}x{height}x{length})"
            )));
        }
        Ok(Self {
            name,
            width,
            height,
            length,
            cells,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn cells(&self) -> &[BlueprintCell] {
        &self.cells
    }

    pub fn non_air_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.block.is_air()).count()
    }
}

/// The active blueprints, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct BlueprintSet {
    blueprints: Vec<Arc<Blueprint>>,
}

impl BlueprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, blueprint: Blueprint) -> Arc<Blueprint> {
        let blueprint = Arc::new(blueprint);
        self.blueprints.push(Arc::clone(&blueprint));
        blueprint
    }

    /// The blueprint new jobs receive: the first one registered.
    pub fn first(&self) -> Option<Arc<Blueprint>> {
        self.blueprints.first().cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Blueprint>> {
        self.blueprints.iter().find(|b| b.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Blueprint>> {
        self.blueprints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(x: i32, y: i32, z: i32, id: u16) -> BlueprintCell {
        BlueprintCell { x, y, z, block: BlockId(id) }
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(Blueprint::new("flat", 4, 0, 4, Vec::new()).is_err());
    }

    #[test]
    fn first_registered_is_selected() {
        let mut set = BlueprintSet::new();
        set.register(Blueprint::new("hall", 2, 1, 2, vec![cell(0, 0, 0, 1), cell(1, 0, 0, 0)]).unwrap());
        set.register(Blueprint::new("tower", 1, 8, 1, vec![cell(0, 0, 0, 1)]).unwrap());

        assert_eq!(set.len(), 2);
        assert_eq!(set.first().unwrap().name(), "hall");
        assert_eq!(set.get("tower").unwrap().height(), 8);
        assert_eq!(set.first().unwrap().non_air_count(), 1);
    }
}
