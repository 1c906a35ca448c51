//! goxx whole-program analyses
//!
//! Type identity, method sets, the interface satisfaction index and the
//! declaration order of named types. All analyses are read-only queries over
//! a [`goxx_ast::Program`] and are recomputed in full for every translation.

pub mod decl_order;
pub mod error;
pub mod identity;
pub mod method_set;
pub mod satisfaction;

pub use decl_order::{order_type_decls, value_dependencies};
pub use error::{CheckError, Result};
pub use identity::{identical, identical_signatures};
pub use method_set::{implements, method_set, MethodEntry};
pub use satisfaction::{IndexedType, SatisfactionIndex, TypeFilter};

use goxx_ast::Program;
use tracing::info;

/// Results of analysing a whole program
#[derive(Debug, Clone)]
pub struct Analysis {
    pub index: SatisfactionIndex,
}

/// Run every whole-program analysis
pub fn analyze(program: &Program) -> Result<Analysis> {
    let index = SatisfactionIndex::build(program)?;
    info!(
        named_types = index.types().len(),
        pairs = index.pair_count(),
        "analysis complete"
    );
    Ok(Analysis { index })
}
