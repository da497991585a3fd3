//! Declarative skill wiring.
//!
//! Connections are kept in declaration order. Nothing here schedules or
//! runs skills; the wiring is an interchange artifact only.

use serde::Serialize;

use crate::ast::Value;
use crate::error::SkillError;
use crate::generator::render_wiring;

/// One output-to-input link. Names are stored without colons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Connection {
    pub from_skill: String,
    pub from_channel: String,
    pub to_skill: String,
    pub to_channel: String,
}

impl Connection {
    pub fn new(from_skill: &str, from_channel: &str, to_skill: &str, to_channel: &str) -> Self {
        Connection {
            from_skill: from_skill.to_string(),
            from_channel: from_channel.to_string(),
            to_skill: to_skill.to_string(),
            to_channel: to_channel.to_string(),
        }
    }

    /// Reads `(connect :skill:channel -> :skill:channel)`.
    pub fn from_ast(form: &Value) -> Result<Self, SkillError> {
        let malformed = || SkillError::MalformedWiringForm(format!("bad connect form {form}"));
        let Value::List(items) = form else {
            return Err(malformed());
        };
        match items.as_slice() {
            [head, from, arrow, to]
                if head.as_symbol() == Some("connect") && arrow.as_symbol() == Some("->") =>
            {
                let (from_skill, from_channel) = split_endpoint(from).ok_or_else(malformed)?;
                let (to_skill, to_channel) = split_endpoint(to).ok_or_else(malformed)?;
                Ok(Connection {
                    from_skill,
                    from_channel,
                    to_skill,
                    to_channel,
                })
            }
            _ => Err(malformed()),
        }
    }
}

/// `:skill:channel` keyword into its two names.
fn split_endpoint(endpoint: &Value) -> Option<(String, String)> {
    let Value::Keyword(name) = endpoint else {
        return None;
    };
    let (skill, channel) = name.split_once(':')?;
    if skill.is_empty() || channel.is_empty() {
        return None;
    }
    Some((skill.to_string(), channel.to_string()))
}

/// Ordered connection list with a fluent builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Wiring {
    connections: Vec<Connection>,
}

impl Wiring {
    pub fn new() -> Self {
        Wiring::default()
    }

    pub fn connect(
        &mut self,
        from_skill: &str,
        from_channel: &str,
        to_skill: &str,
        to_channel: &str,
    ) -> &mut Self {
        self.connections
            .push(Connection::new(from_skill, from_channel, to_skill, to_channel));
        self
    }

    pub fn push(&mut self, connection: Connection) -> &mut Self {
        self.connections.push(connection);
        self
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn to_sexpr(&self) -> String {
        render_wiring(&self.connections)
    }

    /// Reads a `(define-wiring (connect ...) ...)` form.
    pub fn from_ast(form: &Value) -> Result<Self, SkillError> {
        let Value::List(items) = form else {
            return Err(SkillError::MalformedWiringForm(format!(
                "expected a define-wiring list, found {form}"
            )));
        };
        if !form.is_form("define-wiring") {
            return Err(SkillError::MalformedWiringForm(
                "expected a list headed by define-wiring".to_string(),
            ));
        }
        let connections = items[1..]
            .iter()
            .map(Connection::from_ast)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Wiring { connections })
    }

    /// Skill names referenced by a connection but absent from `known`,
    /// in first-seen order.
    pub fn unknown_skills<'a>(&'a self, known: &[&str]) -> Vec<&'a str> {
        let mut unknown: Vec<&str> = Vec::new();
        for connection in &self.connections {
            for name in [&connection.from_skill, &connection.to_skill] {
                let name = name.as_str();
                if !known.contains(&name) && !unknown.contains(&name) {
                    unknown.push(name);
                }
            }
        }
        unknown
    }
}

impl From<Vec<Connection>> for Wiring {
    fn from(connections: Vec<Connection>) -> Self {
        Wiring { connections }
    }
}

/// Every `define-wiring` form among a document's top-level forms, flattened.
pub fn wiring_in_document(forms: &[Value]) -> Result<Wiring, SkillError> {
    let mut wiring = Wiring::new();
    for form in forms.iter().filter(|form| form.is_form("define-wiring")) {
        for connection in Wiring::from_ast(form)?.connections {
            wiring.push(connection);
        }
    }
    Ok(wiring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, parse_document};

    #[test]
    fn builds_fluently() {
        let mut wiring = Wiring::new();
        wiring
            .connect("a", "out", "b", "in")
            .connect("b", "out", "c", "in");
        assert_eq!(wiring.len(), 2);
        assert_eq!(
            wiring.to_sexpr(),
            "(define-wiring\n  (connect :a:out -> :b:in)\n  (connect :b:out -> :c:in))"
        );
    }

    #[test]
    fn clear_drops_connections() {
        let mut wiring = Wiring::new();
        wiring.connect("a", "x", "b", "y");
        wiring.clear();
        assert!(wiring.is_empty());
        assert!(!wiring.to_sexpr().contains("connect"));
    }

    #[test]
    fn round_trips_through_parser() {
        let mut wiring = Wiring::new();
        wiring
            .connect("project-scope", "total-files", "component-calculator", "file-count")
            .connect("effort-aggregator", "total-days", "buffer-calculator", "base-days");
        let parsed = parse(&wiring.to_sexpr()).expect("parse");
        assert!(parsed.ast.is_form("define-wiring"));
        assert_eq!(Wiring::from_ast(&parsed.ast).expect("wiring"), wiring);
    }

    #[test]
    fn rejects_malformed_connections() {
        for source in [
            "(define-wiring (connect :a:x :b:y))",
            "(define-wiring (connect :a -> :b:y))",
            "(define-wiring (link :a:x -> :b:y))",
            "(define-wiring (connect \"a:x\" -> :b:y))",
            "(define-wiring 7)",
            "(connect :a:x -> :b:y)",
        ] {
            let ast = parse(source).expect("parse").ast;
            assert!(
                matches!(Wiring::from_ast(&ast), Err(SkillError::MalformedWiringForm(_))),
                "{source} should be rejected"
            );
        }
    }

    #[test]
    fn reports_unknown_skills() {
        let mut wiring = Wiring::new();
        wiring
            .connect("a", "x", "ghost", "y")
            .connect("ghost", "x", "phantom", "y");
        assert_eq!(wiring.unknown_skills(&["a"]), vec!["ghost", "phantom"]);
        assert!(wiring.unknown_skills(&["a", "ghost", "phantom"]).is_empty());
    }

    #[test]
    fn collects_wiring_from_documents() {
        let forms = parse_document(
            "(define-skill :a)\n(define-wiring (connect :a:x -> :b:y))\n(define-wiring (connect :b:y -> :c:z))",
        )
        .expect("doc");
        let wiring = wiring_in_document(&forms).expect("wiring");
        assert_eq!(wiring.len(), 2);
        assert_eq!(wiring.connections()[1], Connection::new("b", "y", "c", "z"));
    }
}
