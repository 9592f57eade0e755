use super::position::BlockBox;

/// A generated structure whose start is recorded in a chunk.
///
/// This is what the host's structure registry reports for a chunk: the
/// structure type identifier, the generator that produced it, whether the
/// start is valid, and the bounding box over all of its pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureStart {
    /// Namespaced structure identifier, e.g. `minecraft:village_plains`.
    pub id: String,
    /// Generator/piece type that built it, e.g. `minecraft:jigsaw`.
    pub generator: String,
    pub valid: bool,
    pub bounds: BlockBox,
}

impl StructureStart {
    pub fn new(id: impl Into<String>, generator: impl Into<String>, bounds: BlockBox) -> Self {
        Self {
            id: id.into(),
            generator: generator.into(),
            valid: true,
            bounds,
        }
    }
}
