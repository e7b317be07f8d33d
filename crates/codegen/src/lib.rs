//! # Rulecraft Codegen
//!
//! Turns resolved invocations into a named, validated automation program.
//!
//! ```text
//! trigger ─┐
//! query   ─┼─▶ generate_program ─▶ Program (AST) ─▶ ProgramCompiler ─▶ GeneratedProgram
//! action  ─┘         │
//!                 naming
//! ```
//!
//! The [`describe`] module renders the same invocations as English for the
//! confirmation question.

pub mod ast;
pub mod compiler;
pub mod describe;
pub mod generator;
pub mod naming;

pub use ast::{Attribute, BinaryOp, Expression, InvocationPart, Program, RulePart, Selector, Statement};
pub use compiler::{CompileError, ProgramCompiler, SchemaCompiler};
pub use describe::{Template, describe_invocation, describe_program, describe_value};
pub use generator::{GeneratedProgram, generate_program};
pub use naming::{ProgramShape, capitalize, capitalize_selector, program_name};
