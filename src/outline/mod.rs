//! Parsing of tariff schedule notes into nested outlines.
//!
//! Pages of extracted text flow through `normalize`, `locate`, `segment` and
//! `build_outline`; the `assemble_*` functions chain those stages per family.

mod assemble;
mod builder;
mod dedup;
mod error;
mod flatten;
mod grammar;
mod locate;
mod normalize;
mod segment;
#[cfg(test)]
mod tests;
mod types;

pub use assemble::assemble;
pub use dedup::deduplicate;
pub use flatten::flatten;
pub use grammar::OutlineGrammar;
pub use types::{DocumentFamily, NaturalKey, ParsedUnit};
