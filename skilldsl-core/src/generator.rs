//! Serializer from descriptors and value trees back to DSL text.
//!
//! The output is what [`crate::parser`] reads: every rendered skill or
//! wiring form parses back to the same structure.

use tracing::debug;

use crate::ast::{Value, ValueMap};
use crate::skill::{Compute, SkillDescriptor};
use crate::wiring::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Spaces per nesting level of the skill layout.
    pub indent: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig { indent: 2 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: RenderConfig,
}

impl Generator {
    pub fn new(config: RenderConfig) -> Self {
        Generator { config }
    }

    /// Renders one `(define-skill ...)` form.
    pub fn render_skill(&self, skill: &SkillDescriptor) -> String {
        let pad = " ".repeat(self.config.indent);
        let mut lines = vec![format!("(define-skill {}", format_literal(&skill.id))];

        if !skill.inputs.is_empty() {
            lines.push(format!("{pad}(inputs {})", join_values(&skill.inputs, Strings::Quoted)));
        }
        if !skill.outputs.is_empty() {
            lines.push(format!("{pad}(outputs {})", join_values(&skill.outputs, Strings::Quoted)));
        }
        if skill.state.is_truthy() {
            lines.push(format!("{pad}(state {})", format_literal(&skill.state)));
        }

        match skill.compute.as_ref().and_then(compute_text) {
            Some(body) => {
                lines.push(format!("{pad}(compute"));
                lines.push(format!("{pad}{pad}{body}))"));
            }
            None => close_last(&mut lines),
        }

        debug!(skill = %skill.id, "rendered skill");
        lines.join("\n")
    }

    /// Renders a `(define-wiring ...)` form, one `connect` line per connection.
    pub fn render_wiring(&self, connections: &[Connection]) -> String {
        let pad = " ".repeat(self.config.indent);
        let mut lines = vec!["(define-wiring".to_string()];
        for connection in connections {
            lines.push(format!(
                "{pad}(connect :{}:{} -> :{}:{})",
                connection.from_skill,
                connection.from_channel,
                connection.to_skill,
                connection.to_channel
            ));
        }
        close_last(&mut lines);
        lines.join("\n")
    }

    /// Renders a complete DSL file: header comments, every skill, then wiring.
    pub fn render_document(
        &self,
        title: &str,
        skills: &[SkillDescriptor],
        connections: &[Connection],
    ) -> String {
        let mut parts = vec![format!(";; {title}"), String::new()];
        for skill in skills {
            parts.push(self.render_skill(skill));
            parts.push(String::new());
        }
        parts.push(";; Skill Wiring".to_string());
        parts.push(self.render_wiring(connections));
        parts.join("\n")
    }
}

/// Renders a skill with the default layout.
pub fn render(skill: &SkillDescriptor) -> String {
    Generator::default().render_skill(skill)
}

/// Renders a wiring list with the default layout.
pub fn render_wiring(connections: &[Connection]) -> String {
    Generator::default().render_wiring(connections)
}

/// Renders a complete DSL file with the default layout.
pub fn render_document(title: &str, skills: &[SkillDescriptor], connections: &[Connection]) -> String {
    Generator::default().render_document(title, skills, connections)
}

/// Formats a single value as DSL text.
///
/// Strings starting with `:` or `(` are treated as pre-formatted keywords
/// or expressions and emitted unquoted.
pub fn format_value(value: &Value) -> String {
    write_value(value, Strings::PreFormatted)
}

/// Formats a parsed value tree so it reads back as the same tree.
///
/// Every string is quoted, since keywords and forms have their own variants.
pub fn format_literal(value: &Value) -> String {
    write_value(value, Strings::Quoted)
}

pub fn format_map(map: &ValueMap) -> String {
    write_map(map, Strings::PreFormatted)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Strings {
    PreFormatted,
    Quoted,
}

fn write_value(value: &Value, strings: Strings) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Number(number) => number.to_string(),
        Value::Str(text)
            if strings == Strings::PreFormatted
                && (text.starts_with(':') || text.starts_with('(')) =>
        {
            text.clone()
        }
        Value::Str(text) => format!("\"{text}\""),
        Value::Keyword(name) => format!(":{name}"),
        Value::Symbol(name) => name.clone(),
        Value::Map(map) => write_map(map, strings),
        Value::List(items) | Value::Vector(items) => format!("({})", join_values(items, strings)),
    }
}

fn write_map(map: &ValueMap, strings: Strings) -> String {
    let pairs: Vec<String> = map
        .iter()
        .map(|(key, value)| {
            let key = if key.starts_with(':') {
                key.to_string()
            } else {
                format!(":{key}")
            };
            format!("{key} {}", write_value(value, strings))
        })
        .collect();
    format!("{{{}}}", pairs.join(" "))
}

fn join_values(values: &[Value], strings: Strings) -> String {
    values
        .iter()
        .map(|value| write_value(value, strings))
        .collect::<Vec<_>>()
        .join(" ")
}

fn compute_text(compute: &Compute) -> Option<String> {
    match compute {
        Compute::Source(source) if source.is_empty() => None,
        Compute::Source(source) => Some(source.clone()),
        Compute::Forms(forms) if forms.is_empty() => None,
        Compute::Forms(forms) => Some(join_values(forms, Strings::Quoted)),
    }
}

fn close_last(lines: &mut [String]) {
    if let Some(last) = lines.last_mut() {
        last.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::skill::ast_to_skill;

    fn adder() -> SkillDescriptor {
        SkillDescriptor::new(":adder")
            .with_inputs([":a", ":b"])
            .with_outputs([":sum"])
            .with_state([("total", Value::int(0))].into_iter().collect())
            .with_compute_source("(emit :sum (+ (get input :a) (get input :b)))")
    }

    #[test]
    fn renders_full_skill_layout() {
        assert_eq!(
            render(&adder()),
            "(define-skill :adder\n  (inputs :a :b)\n  (outputs :sum)\n  (state {:total 0})\n  (compute\n    (emit :sum (+ (get input :a) (get input :b)))))"
        );
    }

    #[test]
    fn closes_header_without_compute() {
        let skill = SkillDescriptor::new("stub").with_inputs(["in"]).with_outputs(["out"]);
        assert_eq!(render(&skill), "(define-skill :stub\n  (inputs :in)\n  (outputs :out))");
        assert_eq!(render(&SkillDescriptor::new("bare")), "(define-skill :bare)");
    }

    #[test]
    fn omits_empty_state() {
        let text = render(&SkillDescriptor::new("empty-state").with_inputs(["in"]));
        assert!(!text.contains("(state"));
    }

    #[test]
    fn formats_values() {
        assert_eq!(format_value(&Value::Nil), "nil");
        assert_eq!(format_value(&Value::Bool(true)), "true");
        assert_eq!(format_value(&Value::int(-3)), "-3");
        assert_eq!(format_value(&Value::float(45.0)), "45.0");
        assert_eq!(format_value(&Value::float(0.15)), "0.15");
        assert_eq!(format_value(&Value::str("hi there")), "\"hi there\"");
        assert_eq!(format_value(&Value::str(":kw")), ":kw");
        assert_eq!(format_value(&Value::str("(+ 1 2)")), "(+ 1 2)");
        assert_eq!(format_value(&Value::keyword("total")), ":total");
        assert_eq!(format_value(&Value::Vector(vec![Value::int(1), Value::symbol("x")])), "(1 x)");
        assert_eq!(
            format_value(&Value::map([
                ("config", Value::map([("port", Value::int(4000)), ("debug", Value::Bool(true))])),
                ("count", Value::int(0)),
            ])),
            "{:config {:port 4000 :debug true} :count 0}"
        );
        assert_eq!(format_value(&Value::Map(ValueMap::new())), "{}");
    }

    #[test]
    fn literal_format_quotes_every_string() {
        assert_eq!(format_literal(&Value::str(":kw")), "\":kw\"");
        assert_eq!(
            format_literal(&Value::list([Value::symbol("emit"), Value::keyword("msg"), Value::str("(x")])),
            "(emit :msg \"(x\")"
        );
        assert_eq!(format_literal(&Value::map([("mode", Value::str(":fast"))])), "{:mode \":fast\"}");
    }

    #[test]
    fn compute_strings_survive_a_second_render() {
        let skill = SkillDescriptor::new("notify").with_compute_source("(emit :msg \"(draft\")");
        let first = parse(&render(&skill)).expect("parse rendered skill").ast;
        let back = ast_to_skill(&first).expect("skill");
        assert!(matches!(back.compute, Some(Compute::Forms(_))));

        let text = render(&back);
        assert!(text.contains("(emit :msg \"(draft\")"), "{text}");
        assert_eq!(parse(&text).expect("reparse").ast, first);
    }

    #[test]
    fn keyword_like_state_strings_stay_strings() {
        let skill = SkillDescriptor::new("mode").with_state(
            [("mode", Value::str(":fast")), ("next", Value::str("(later"))]
                .into_iter()
                .collect(),
        );
        let text = render(&skill);
        assert!(text.contains("(state {:mode \":fast\" :next \"(later\"})"), "{text}");
        let back = ast_to_skill(&parse(&text).expect("parse").ast).expect("skill");
        assert_eq!(back.state, skill.state);
    }

    #[test]
    fn renders_compute_forms_recursively() {
        let compute = parse("(emit :out (* 2 (get state :n)))").expect("parse").ast;
        let skill = SkillDescriptor::new("double").with_compute(compute);
        assert_eq!(
            render(&skill),
            "(define-skill :double\n  (compute\n    (emit :out (* 2 (get state :n)))))"
        );
    }

    #[test]
    fn round_trips_through_parser() {
        let original = adder();
        let text = render(&original);
        let parsed = parse(&text).expect("parse rendered skill");
        assert_eq!(parsed.skill_id, Some(Value::keyword("adder")));
        let back = ast_to_skill(&parsed.ast).expect("skill");
        assert_eq!(back.id, original.id);
        assert_eq!(back.inputs, original.inputs);
        assert_eq!(back.outputs, original.outputs);
        assert_eq!(back.state, original.state);

        let again = parse(&render(&back)).expect("reparse").ast;
        assert_eq!(again, parsed.ast);
    }

    #[test]
    fn round_trips_boolean_and_string_state() {
        let skill = SkillDescriptor::new("flags").with_state(
            [
                ("enabled", Value::Bool(true)),
                ("debug", Value::Bool(false)),
                ("label", Value::str("test")),
                ("ratio", Value::float(0.5)),
            ]
            .into_iter()
            .collect(),
        );
        let back = ast_to_skill(&parse(&render(&skill)).expect("parse").ast).expect("skill");
        assert_eq!(back.state, skill.state);
    }

    #[test]
    fn honours_indent_config() {
        let generator = Generator::new(RenderConfig { indent: 4 });
        let text = generator.render_skill(&SkillDescriptor::new("x").with_inputs(["a"]));
        assert_eq!(text, "(define-skill :x\n    (inputs :a))");
    }

    #[test]
    fn renders_wiring_in_order() {
        let connections = vec![
            Connection::new("scope", "total", "calc", "input"),
            Connection::new("calc", "effort", "agg", "input"),
        ];
        assert_eq!(
            render_wiring(&connections),
            "(define-wiring\n  (connect :scope:total -> :calc:input)\n  (connect :calc:effort -> :agg:input))"
        );
        assert_eq!(render_wiring(&[]), "(define-wiring)");
    }

    #[test]
    fn renders_documents() {
        let text = render_document(
            "Skills",
            &[SkillDescriptor::new("a"), SkillDescriptor::new("b")],
            &[Connection::new("a", "x", "b", "y")],
        );
        assert!(text.starts_with(";; Skills\n"));
        assert!(text.contains("(define-skill :a)\n\n(define-skill :b)\n"));
        assert!(text.ends_with(";; Skill Wiring\n(define-wiring\n  (connect :a:x -> :b:y))"));
    }
}
