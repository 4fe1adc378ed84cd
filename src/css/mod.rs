//! CSS Selectors
//!
//! Selector text is tokenized, parsed into a typed selector AST and then
//! translated into the XPath AST, which both XPath backends evaluate.

pub mod lexer;
pub mod parser;
pub mod transformer;

pub use parser::{parse, SelectorList};
pub use transformer::transform;

use crate::error::Result;
use crate::xpath::Expr;

/// Parse a selector group and translate it to XPath
pub fn to_xpath(css: &str) -> Result<Expr> {
    Ok(transform(&parse(css)?))
}
