//! Illustrative external-collaborator actors for a scripting-language
//! toolchain, hosted on top of `slug-kernel`.
//!
//! None of these actors implement real lexing, parsing, or evaluation —
//! that is explicitly out of scope for the kernel this crate demonstrates
//! (the kernel schedules and polices messages between language-service
//! actors; it has no opinion on what a "token" or an "AST node" actually
//! is). Each module shows the shape a real implementation would take:
//! register an [`slug_kernel::OperationMap`], spawn behind a
//! [`slug_kernel::HandlerFactory`], and let the kernel's policy engine
//! gate who may call it.

pub mod evaluator;
pub mod fileio;
pub mod lexer;
pub mod module_loader;
pub mod parser;
pub mod repl;
pub mod stdout;
