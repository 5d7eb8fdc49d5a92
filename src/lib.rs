//! CHTL — a braced, element-oriented notation that compiles to coordinated
//! HTML, CSS, and JavaScript.
//!
//! The pipeline is staged the way the module list below reads: [`lexer`]
//! tokenizes, [`expr`] handles value expressions inside style blocks,
//! [`parser`] builds the [`ast`] (registering template/custom definitions
//! into [`symbols`] as it goes), [`loader`] resolves `[Import]` statements,
//! [`generator`] walks the tree to produce output, [`chtljs`] rewrites
//! `script { ... }` bodies, and [`plugin`] lets an embedder extend what
//! CHTL-JS recognizes. [`compile`] wires all of it into one function call,
//! [`assemble`] shapes the result into whatever final document layout the
//! caller asked for, and [`format`] re-serializes the parsed AST back into
//! canonical CHTL source.

pub mod assemble;
pub mod ast;
pub mod chtljs;
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod expr;
pub mod format;
pub mod fs_loader;
pub mod generator;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod plugin;
pub mod position;
pub mod symbols;
pub mod token;

pub use compile::{compile, CompileOptions, CompileResult};
