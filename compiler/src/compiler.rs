use crate::error::InfoError;
use crate::parser::Parser;
use crate::types::Schema;

/// Compile a textual source into `(Schema, Vec<u8>)`. The buffer holds the
/// encoded root value and is empty when the source declares types only.
/// Returns `Err(InfoError)` if lexing, parsing or verification fails.
pub fn compile_source(text: &str) -> Result<(Schema, Vec<u8>), InfoError> {
    let mut parser = Parser::new(text);
    parser.parse()?;
    Ok(parser.into_parts())
}
