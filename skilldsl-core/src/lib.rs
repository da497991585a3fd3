//! Core of the SkillDSL toolchain: an S-expression language for declaring
//! reactive computation units ("skills") and the wiring between them.
//!
//! The pipeline is roughly:
//!
//!   source .skill
//!     -> lexer      (tokens)
//!     -> parser     (value tree)
//!     -> skill / wiring mappers (descriptors, connections)
//!     -> eval       (compute forms against state and inputs)
//!     -> generator  (descriptors back to canonical text)
//!
//! The CLI and any other front-end should depend on this crate rather
//! than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: values, lexing and parsing
// ---------------------------------------------------------------------

pub mod ast;
pub mod lexer;
pub mod parser;

// ---------------------------------------------------------------------
// Skill model: descriptors, wiring and UX actions
// ---------------------------------------------------------------------

pub mod skill;
pub mod wiring;
pub mod action;

// ---------------------------------------------------------------------
// Evaluation and serialization
// ---------------------------------------------------------------------

pub mod eval;
pub mod generator;

// ---------------------------------------------------------------------
// Catalog, validation and library loading
// ---------------------------------------------------------------------

pub mod registry;
pub mod validate;
pub mod library;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use action::Action;
pub use ast::{Number, Value, ValueMap};
pub use error::{CoreError, EvalError, ParseError, SkillError};
pub use eval::{EvalConfig, EvalOutcome, Evaluator, Program, evaluate};
pub use generator::{
    Generator, RenderConfig, format_literal, format_value, render, render_document, render_wiring,
};
pub use library::{LibraryIssue, SkillFile, SkillLibrary, load_skill_library};
pub use parser::{ParseConfig, ParsedForm, parse, parse_document};
pub use skill::{Compute, SkillDescriptor, ast_to_skill, parse_skill, skills_in_document};
pub use validate::{EncodingStats, ValidationReport, encoding_stats, validate_skill_text};
pub use wiring::{Connection, Wiring, wiring_in_document};
