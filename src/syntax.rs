pub use source_span::{Loc, Position, Span};

mod ast;
mod error;
pub mod parser;

pub use ast::*;
pub use error::{Error, Result};
pub use parser::Parser;

use crate::source::SourceId;

pub fn parse(text: &str, source: SourceId) -> Result<Grammar> {
	Parser::new(text, source).parse()
}
