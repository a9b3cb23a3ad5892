//! FILENAME: core/table-engine/src/lib.rs
//! Report table engine.
//!
//! Resolves a declarative table definition against a taxonomy and a fact
//! store into a render-ready layout: header groups with spanning cells per
//! axis, and pages of body cells holding the matched facts.
//!
//! Layers:
//! - `definition`: Serializable table description (what the table IS)
//! - `structure`: Resolved structural trees, one per axis (HOW we compute)
//! - `layout`: Render-ready output (WHAT a renderer walks)
//! - `resolver` / `materializer` / `table`: The resolution pipeline

#[macro_use]
pub mod logging;

pub mod binding;
pub mod cleanup;
pub mod config;
pub mod definition;
pub mod error;
pub mod labels;
pub mod layout;
pub mod materializer;
pub mod matcher;
pub mod resolver;
pub mod structure;
pub mod table;

pub use binding::AspectBinding;
pub use config::TableOptions;
pub use definition::*;
pub use error::{CellCoordinate, Result, StructuralError};
pub use layout::*;
pub use materializer::{cell_binding, discriminator_count, leaf_paths, HeaderForest, LayoutMaterializer};
pub use matcher::FactMatcher;
pub use resolver::StructuralResolver;
pub use structure::{RollupKind, StructuralNode};
pub use table::{parameter_combinations, resolve_table, resolve_table_set, TableInstance};
