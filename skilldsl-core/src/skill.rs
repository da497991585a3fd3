//! Skill descriptors and their mapping from `define-skill` forms.

use serde::Serialize;

use crate::ast::{Value, ValueMap};
use crate::error::{CoreError, ParseError, SkillError};
use crate::parser::{parse, parse_document};

/// The compute part of a skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Compute {
    /// Pre-formatted DSL text, emitted verbatim by the serializer.
    Source(String),
    /// Parsed expressions; usually exactly one.
    Forms(Vec<Value>),
}

impl Compute {
    /// The single expression to evaluate; several forms run as an implicit `do`.
    pub fn expression(&self) -> Result<Option<Value>, ParseError> {
        let forms = match self {
            Compute::Source(source) if source.trim().is_empty() => return Ok(None),
            Compute::Source(source) => parse_document(source)?,
            Compute::Forms(forms) => forms.clone(),
        };
        Ok(match forms.len() {
            0 => None,
            1 => forms.into_iter().next(),
            _ => Some(Value::List(
                std::iter::once(Value::symbol("do")).chain(forms).collect(),
            )),
        })
    }
}

/// One declared skill.
///
/// Fields carry parsed values as-is: a hand-written form may use a symbol
/// where a keyword is conventional, and the mapper does not reject it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillDescriptor {
    pub id: Value,
    pub inputs: Vec<Value>,
    pub outputs: Vec<Value>,
    /// Normally a map of slot name to initial value.
    pub state: Value,
    pub compute: Option<Compute>,
}

impl SkillDescriptor {
    /// Empty skill with a keyword id (`"adder"` and `":adder"` are equivalent).
    pub fn new(id: &str) -> Self {
        SkillDescriptor {
            id: Value::keyword(id),
            inputs: Vec::new(),
            outputs: Vec::new(),
            state: Value::Map(ValueMap::new()),
            compute: None,
        }
    }

    pub fn with_inputs<'a>(mut self, channels: impl IntoIterator<Item = &'a str>) -> Self {
        self.inputs = channels.into_iter().map(Value::keyword).collect();
        self
    }

    pub fn with_outputs<'a>(mut self, channels: impl IntoIterator<Item = &'a str>) -> Self {
        self.outputs = channels.into_iter().map(Value::keyword).collect();
        self
    }

    pub fn with_state(mut self, state: ValueMap) -> Self {
        self.state = Value::Map(state);
        self
    }

    pub fn with_compute_source(mut self, source: impl Into<String>) -> Self {
        self.compute = Some(Compute::Source(source.into()));
        self
    }

    pub fn with_compute(mut self, form: Value) -> Self {
        self.compute = Some(Compute::Forms(vec![form]));
        self
    }

    /// Id without its leading `:`.
    pub fn name(&self) -> String {
        self.id.key_text()
    }

    pub fn state_map(&self) -> Option<&ValueMap> {
        self.state.as_map()
    }

    /// Maps a `(define-skill <id> ...)` form onto a descriptor.
    ///
    /// Unknown sub-forms are skipped; a repeated sub-form overwrites the
    /// earlier one.
    pub fn from_ast(ast: &Value) -> Result<Self, SkillError> {
        let items = match ast {
            Value::List(items) if ast.is_form("define-skill") => items,
            Value::List(_) => {
                return Err(SkillError::MalformedSkillForm(
                    "expected a list headed by define-skill".to_string(),
                ));
            }
            other => {
                return Err(SkillError::MalformedSkillForm(format!(
                    "expected a define-skill list, found {other}"
                )));
            }
        };
        let Some(id) = items.get(1) else {
            return Err(SkillError::MalformedSkillForm(
                "define-skill has no id".to_string(),
            ));
        };

        let mut skill = SkillDescriptor {
            id: id.clone(),
            ..SkillDescriptor::new("")
        };
        for item in &items[2..] {
            let Value::List(parts) = item else { continue };
            let Some((head, rest)) = parts.split_first() else {
                continue;
            };
            match head.as_symbol() {
                Some("inputs") => skill.inputs = rest.to_vec(),
                Some("outputs") => skill.outputs = rest.to_vec(),
                Some("state") => {
                    if let Some(state) = rest.first() {
                        skill.state = state.clone();
                    }
                }
                Some("compute") => {
                    skill.compute = if rest.is_empty() {
                        None
                    } else {
                        Some(Compute::Forms(rest.to_vec()))
                    };
                }
                _ => {}
            }
        }
        Ok(skill)
    }
}

impl TryFrom<&Value> for SkillDescriptor {
    type Error = SkillError;

    fn try_from(ast: &Value) -> Result<Self, Self::Error> {
        SkillDescriptor::from_ast(ast)
    }
}

/// Descriptor for a `define-skill` form, or `None` for any other shape.
pub fn ast_to_skill(ast: &Value) -> Option<SkillDescriptor> {
    SkillDescriptor::from_ast(ast).ok()
}

/// Parses text holding a single `define-skill` form.
pub fn parse_skill(source: &str) -> Result<SkillDescriptor, CoreError> {
    let parsed = parse(source)?;
    Ok(SkillDescriptor::from_ast(&parsed.ast)?)
}

/// Every `define-skill` form among a document's top-level forms.
pub fn skills_in_document(forms: &[Value]) -> Vec<SkillDescriptor> {
    forms.iter().filter_map(ast_to_skill).collect()
}
