pub mod error;
mod lower;
mod schema;

pub use error::ParseError;

use crate::Catalog;

/// Parser entry point for TOML block declarations.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the declarations into a catalog of block definitions.
    /// Top-level keys other than `block` are ignored.
    pub fn parse(&self) -> Result<Catalog, Vec<ParseError>> {
        let document: schema::RawDocument = toml::from_str(&self.source)
            .map_err(|e| vec![ParseError::from_toml(&e, self.file_id)])?;
        log::debug!(
            "parsed {} block declaration(s) from file {}",
            document.blocks.len(),
            self.file_id
        );
        lower::lower_document(document, self.file_id)
    }
}
