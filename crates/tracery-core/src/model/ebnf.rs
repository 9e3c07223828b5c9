//! EBNF grammar diagram aggregate.

use std::fmt;

use indexmap::IndexMap;

use super::{DiagramMeta, ModelError};

/// A parsed EBNF expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EbnfExpr {
    /// Reference to another rule.
    Identifier(String),
    /// Quoted terminal.
    Terminal(String),
    /// `? ... ?`
    Special(String),
    /// `a , b , c`
    Sequence(Vec<EbnfExpr>),
    /// `a | b | c`
    Alternation(Vec<EbnfExpr>),
    /// `[ a ]`
    Optional(Box<EbnfExpr>),
    /// `{ a }`
    ZeroOrMore(Box<EbnfExpr>),
    /// `{ a }-`
    OneOrMore(Box<EbnfExpr>),
}

impl EbnfExpr {
    /// Names of all rules referenced by this expression, in source order.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Identifier(name) => out.push(name),
            Self::Terminal(_) | Self::Special(_) => {}
            Self::Sequence(items) | Self::Alternation(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Optional(inner) | Self::ZeroOrMore(inner) | Self::OneOrMore(inner) => {
                inner.collect_references(out)
            }
        }
    }
}

impl fmt::Display for EbnfExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[EbnfExpr], sep: &str) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                match item {
                    EbnfExpr::Sequence(_) | EbnfExpr::Alternation(_) => write!(f, "( {item} )")?,
                    _ => write!(f, "{item}")?,
                }
            }
            Ok(())
        }

        match self {
            Self::Identifier(name) => f.write_str(name),
            Self::Terminal(text) if text.contains('"') => write!(f, "'{text}'"),
            Self::Terminal(text) => write!(f, "\"{text}\""),
            Self::Special(text) => write!(f, "? {text} ?"),
            Self::Sequence(items) => join(f, items, " , "),
            Self::Alternation(items) => join(f, items, " | "),
            Self::Optional(inner) => write!(f, "[ {inner} ]"),
            Self::ZeroOrMore(inner) => write!(f, "{{ {inner} }}"),
            Self::OneOrMore(inner) => write!(f, "{{ {inner} }}-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbnfRule {
    name: String,
    expr: EbnfExpr,
    comment: Option<String>,
}

impl EbnfRule {
    pub fn new(name: impl Into<String>, expr: EbnfExpr) -> Self {
        Self {
            name: name.into(),
            expr,
            comment: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expr(&self) -> &EbnfExpr {
        &self.expr
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// The EBNF diagram aggregate.
#[derive(Debug, Clone, Default)]
pub struct EbnfDiagram {
    pub(super) meta: DiagramMeta,
    rules: IndexMap<String, EbnfRule>,
    pending_comment: Option<String>,
}

impl EbnfDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> impl ExactSizeIterator<Item = &EbnfRule> {
        self.rules.values()
    }

    pub fn rule(&self, name: &str) -> Option<&EbnfRule> {
        self.rules.get(name)
    }

    /// Stores a comment that attaches to the next rule.
    pub fn push_comment(&mut self, comment: impl Into<String>) {
        self.pending_comment = Some(comment.into());
    }

    /// # Errors
    ///
    /// Fails when a rule with the same name already exists.
    pub fn add_rule(&mut self, mut rule: EbnfRule) -> Result<(), ModelError> {
        if self.rules.contains_key(rule.name()) {
            return Err(ModelError::DuplicateRule(rule.name().to_string()));
        }
        rule.comment = self.pending_comment.take();
        self.rules.insert(rule.name.clone(), rule);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_attaches_to_next_rule_only() {
        let mut diagram = EbnfDiagram::new();
        diagram.push_comment("digits");
        diagram
            .add_rule(EbnfRule::new("digit", EbnfExpr::Terminal("0".into())))
            .unwrap();
        diagram
            .add_rule(EbnfRule::new("zero", EbnfExpr::Terminal("0".into())))
            .unwrap();

        assert_eq!(diagram.rule("digit").unwrap().comment(), Some("digits"));
        assert_eq!(diagram.rule("zero").unwrap().comment(), None);
    }

    #[test]
    fn test_duplicate_rule() {
        let mut diagram = EbnfDiagram::new();
        let rule = EbnfRule::new("a", EbnfExpr::Identifier("b".into()));
        diagram.add_rule(rule.clone()).unwrap();
        assert_eq!(
            diagram.add_rule(rule).unwrap_err(),
            ModelError::DuplicateRule("a".into())
        );
    }

    #[test]
    fn test_display_and_references() {
        let expr = EbnfExpr::Sequence(vec![
            EbnfExpr::Identifier("sign".into()),
            EbnfExpr::OneOrMore(Box::new(EbnfExpr::Alternation(vec![
                EbnfExpr::Terminal("0".into()),
                EbnfExpr::Identifier("digit".into()),
            ]))),
        ]);
        assert_eq!(expr.to_string(), "sign , { \"0\" | digit }-");
        assert_eq!(expr.references(), ["sign", "digit"]);
    }
}
