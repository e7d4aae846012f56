pub mod block;
pub mod edit;
pub mod field;
pub mod help;
pub mod layout;
pub mod parser;
pub mod value;

use std::sync::Arc;

use crate::block::BlockDefinition;

/// A parsed set of block declarations.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Block definitions in declaration order.
    pub blocks: Vec<Arc<BlockDefinition>>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Catalog {
    pub fn new(source_id: usize) -> Self {
        Catalog {
            blocks: Vec::new(),
            source_id,
        }
    }

    /// Add a definition to the end of the catalog.
    pub fn push(&mut self, definition: BlockDefinition) -> Arc<BlockDefinition> {
        let definition = Arc::new(definition);
        self.blocks.push(Arc::clone(&definition));
        definition
    }

    pub fn get(&self, name: &str) -> Option<&Arc<BlockDefinition>> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Position of a block in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.name == name)
    }

    pub fn block_names(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.name.as_str()).collect()
    }
}
