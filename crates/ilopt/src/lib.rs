#![deny(clippy::unwrap_used)]

//! Optimiser passes over the intermediate language of `ilopt_core`.
//!
//! The two main passes are [`disambiguate`], which gives every binding a
//! distinct name, and [`full_inline`], which replaces calls to user
//! functions by their bodies. The inliner requires the output of the
//! disambiguator.

pub mod ast_copier;
pub mod body_copier;
pub mod disambiguator;
mod error;
pub mod full_inliner;
pub mod inlinable_function_filter;
pub mod movable;
pub mod name_collector;
pub mod name_dispenser;
mod pipeline;
mod settings;

pub use ast_copier::{copy_verbatim, AstCopier, VerbatimCopier};
pub use body_copier::BodyCopier;
pub use disambiguator::{disambiguate, Disambiguator};
pub use error::{OptimiserError, Result};
pub use full_inliner::{full_inline, FullInliner};
pub use inlinable_function_filter::{inlinable_functions, InlinableFunctionFilter};
pub use movable::MovableChecker;
pub use name_collector::{collect_names, NameCollector};
pub use name_dispenser::NameDispenser;
pub use pipeline::{dump_ast_json, optimise_source, run_steps};
pub use settings::{read_settings, DialectKind, OptimiserSettings, OptimiserStep};
