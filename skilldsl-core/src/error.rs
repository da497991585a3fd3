use std::path::PathBuf;

use thiserror::Error;

/// Failures produced while turning DSL text into a value tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty input")]
    EmptyInput,
    #[error("unterminated form: missing '{close}' for '{open}'")]
    UnterminatedForm { open: char, close: char },
    #[error("unexpected closing delimiter '{0}'")]
    UnexpectedClosingDelimiter(char),
    #[error("nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
}

/// Failures mapping a parsed value tree onto skill or wiring records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkillError {
    #[error("malformed skill form: {0}")]
    MalformedSkillForm(String),
    #[error("malformed wiring form: {0}")]
    MalformedWiringForm(String),
}

/// Faults raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("'{form}' is missing operand {position}")]
    MissingOperand { form: String, position: usize },
    #[error("'{form}': {detail}")]
    TypeMismatch { form: String, detail: String },
    #[error("evaluation nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("skill library directory was not found at {0}")]
    MissingLibrary(PathBuf),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Skill(#[from] SkillError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
