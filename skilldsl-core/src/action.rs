//! Composer for nested UX action forms such as
//! `(on-click (seq (validate-input) (submit-form)))`.

use crate::ast::Value;
use crate::generator::format_value;

/// An operator applied to literal operands or nested actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub operator: String,
    pub operands: Vec<Value>,
}

impl Action {
    /// `(fn-name args...)`.
    pub fn call(name: &str, args: impl IntoIterator<Item = Value>) -> Self {
        Action {
            operator: name.to_string(),
            operands: args.into_iter().collect(),
        }
    }

    pub fn seq(actions: impl IntoIterator<Item = Action>) -> Self {
        Action::call("seq", actions.into_iter().map(Value::from))
    }

    pub fn if_then_else(condition: Action, then: Action, otherwise: Action) -> Self {
        Action::call("if", [condition.into(), then.into(), otherwise.into()])
    }

    pub fn on_click(action: Action) -> Self {
        Action::call("on-click", [action.into()])
    }

    pub fn on_change(action: Action) -> Self {
        Action::call("on-change", [action.into()])
    }

    pub fn on_blur(action: Action) -> Self {
        Action::call("on-blur", [action.into()])
    }

    pub fn debounce(ms: i64, action: Action) -> Self {
        Action::call("debounce", [Value::int(ms), action.into()])
    }

    pub fn to_value(&self) -> Value {
        self.clone().into()
    }

    /// Single-line DSL text; an action without operands renders as `(op)`.
    pub fn to_sexpr(&self) -> String {
        format_value(&self.to_value())
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        Value::List(
            std::iter::once(Value::Symbol(action.operator))
                .chain(action.operands)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn renders_bare_calls() {
        assert_eq!(Action::call("submit-form", []).to_sexpr(), "(submit-form)");
        assert_eq!(
            Action::on_blur(Action::call("validate-input", [])).to_sexpr(),
            "(on-blur (validate-input))"
        );
    }

    #[test]
    fn renders_nested_actions() {
        let action = Action::on_click(Action::seq([
            Action::call("validate-input", []),
            Action::debounce(300, Action::call("save", [Value::keyword("draft")])),
        ]));
        assert_eq!(
            action.to_sexpr(),
            "(on-click (seq (validate-input) (debounce 300 (save :draft))))"
        );
    }

    #[test]
    fn quotes_plain_string_operands() {
        let action = Action::call(
            "show",
            [Value::str("Saved!"), Value::str(":toast"), Value::float(1.5)],
        );
        assert_eq!(action.to_sexpr(), "(show \"Saved!\" :toast 1.5)");
    }

    #[test]
    fn conditional_actions_parse_back() {
        let action = Action::on_change(Action::if_then_else(
            Action::call("valid?", []),
            Action::call("enable", [Value::keyword("submit")]),
            Action::call("disable", [Value::keyword("submit")]),
        ));
        let text = action.to_sexpr();
        assert_eq!(
            text,
            "(on-change (if (valid?) (enable :submit) (disable :submit)))"
        );
        assert_eq!(parse(&text).expect("parse").ast, action.to_value());
    }
}
