//! C syntax trees for the structural checks
//!
//! This crate handles:
//! - The read-only syntax tree model the rule checker walks
//! - The `FrontEnd` trait for anything that can turn a C file into a tree
//! - A clang front-end built on `clang -Xclang -ast-dump=json`
//! - Front-end diagnostics and parse failures

pub mod tree;
pub mod frontend;
pub mod clang;

pub use tree::{NodeKind, Preorder, SyntaxNode, SyntaxTree};
pub use frontend::{FrontEnd, FrontEndDiagnostic, FrontEndSeverity, ParseFailure};
pub use clang::{tree_from_clang_json, ClangFrontEnd};
