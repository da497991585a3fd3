//! Shape checks for externally produced skill text, and the size
//! comparison between the DSL and JSON encodings of a descriptor.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::generator::render;
use crate::parser::parse;
use crate::skill::SkillDescriptor;

const REQUIRED_SECTIONS: [&str; 3] = ["inputs", "outputs", "compute"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Parsed, is a `define-skill` form, and has every required section.
    pub valid: bool,
    /// Id without its colon, when the text is a skill form.
    pub skill_id: Option<String>,
    pub has_inputs: bool,
    pub has_outputs: bool,
    pub has_compute: bool,
    /// Required sections that are absent.
    pub missing: Vec<String>,
    /// Parse or shape failure, when there is one.
    pub error: Option<String>,
}

impl ValidationReport {
    fn failed(error: String) -> Self {
        ValidationReport {
            valid: false,
            skill_id: None,
            has_inputs: false,
            has_outputs: false,
            has_compute: false,
            missing: REQUIRED_SECTIONS.iter().map(|s| s.to_string()).collect(),
            error: Some(error),
        }
    }
}

/// Inspects `text` for a `define-skill` form with inputs, outputs and compute.
pub fn validate_skill_text(text: &str) -> ValidationReport {
    let parsed = match parse(text) {
        Ok(parsed) => parsed,
        Err(err) => return ValidationReport::failed(err.to_string()),
    };
    let Some(id) = parsed.skill_id else {
        return ValidationReport::failed("not a define-skill form".to_string());
    };

    let has_section = |name: &str| {
        parsed
            .ast
            .as_seq()
            .is_some_and(|items| items[2..].iter().any(|item| item.is_form(name)))
    };
    let has_inputs = has_section("inputs");
    let has_outputs = has_section("outputs");
    let has_compute = has_section("compute");
    let missing: Vec<String> = REQUIRED_SECTIONS
        .iter()
        .zip([has_inputs, has_outputs, has_compute])
        .filter(|(_, present)| !present)
        .map(|(name, _)| name.to_string())
        .collect();

    debug!(skill = %id, missing = missing.len(), "validated skill text");
    ValidationReport {
        valid: missing.is_empty(),
        skill_id: Some(id.key_text()),
        has_inputs,
        has_outputs,
        has_compute,
        error: None,
        missing,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodingStats {
    pub sexpr_chars: usize,
    pub json_chars: usize,
    /// Fraction of the JSON size saved by the DSL; negative when larger.
    pub savings: f64,
}

/// Compares the rendered DSL size against pretty-printed JSON of the
/// same descriptor fields.
pub fn encoding_stats(skill: &SkillDescriptor) -> EncodingStats {
    let sexpr_chars = render(skill).chars().count();
    let document = json!({
        "type": "skill-definition",
        "id": skill.id,
        "inputs": skill.inputs,
        "outputs": skill.outputs,
        "state": skill.state,
        "compute": skill.compute,
    });
    let json_chars = serde_json::to_string_pretty(&document)
        .map(|text| text.chars().count())
        .unwrap_or(0);
    let savings = if json_chars == 0 {
        0.0
    } else {
        (json_chars as f64 - sexpr_chars as f64) / json_chars as f64
    };
    EncodingStats {
        sexpr_chars,
        json_chars,
        savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_complete_skill() {
        let report = validate_skill_text(
            "(define-skill :adder (inputs :a :b) (outputs :sum) (compute (emit :sum (+ 1 2))))",
        );
        assert!(report.valid);
        assert_eq!(report.skill_id.as_deref(), Some("adder"));
        assert!(report.missing.is_empty());
        assert_eq!(report.error, None);
    }

    #[test]
    fn lists_missing_sections() {
        let report = validate_skill_text("(define-skill :partial (inputs :a))");
        assert!(!report.valid);
        assert!(report.has_inputs);
        assert!(!report.has_outputs);
        assert_eq!(report.missing, vec!["outputs", "compute"]);
    }

    #[test]
    fn reports_parse_and_shape_failures() {
        let report = validate_skill_text("(define-skill :broken");
        assert!(!report.valid);
        assert!(report.error.as_deref().is_some_and(|e| e.contains("unterminated")));

        let report = validate_skill_text("(+ 1 2)");
        assert!(!report.valid);
        assert_eq!(report.skill_id, None);
        assert_eq!(report.missing.len(), 3);
    }

    #[test]
    fn dsl_is_smaller_than_json() {
        let skill = SkillDescriptor::new("adder")
            .with_inputs(["a", "b"])
            .with_outputs(["sum"])
            .with_compute_source("(emit :sum (+ (get input :a) (get input :b)))");
        let stats = encoding_stats(&skill);
        assert!(stats.sexpr_chars < stats.json_chars);
        assert!(stats.savings > 0.0 && stats.savings < 1.0);
    }
}
