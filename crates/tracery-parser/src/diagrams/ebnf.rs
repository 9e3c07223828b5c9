//! EBNF grammar.
//!
//! Rule bodies use ISO EBNF:
//!
//! ```text
//! alternation := sequence ( "|" sequence )*
//! sequence    := factor ( "," factor )*
//! factor      := "(" alternation ")" | "[" alternation "]"
//!              | "{" alternation "}" [ "-" ] | terminal | special | identifier
//! ```

use log::debug;
use winnow::{
    ModalResult, Parser as _,
    ascii::multispace0,
    combinator::{alt, delimited, opt, separated},
    token::{one_of, take_till, take_while},
};

use tracery_core::model::{
    Diagram, DiagramKind, EbnfDiagram, ModelError,
    ebnf::{EbnfExpr, EbnfRule},
};

use crate::{
    command::{
        Command, CommandError, CommandResult, LineLocation, MultiLineCommand, MultiLineMatch,
        RegexResult, SingleLineCommand, Trim, common::common_commands,
    },
    factory::DiagramFactory,
    source::BlockKind,
};

type Input<'a> = &'a str;

fn identifier(input: &mut Input<'_>) -> ModalResult<EbnfExpr> {
    (
        one_of(|c: char| c.is_alphanumeric() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .map(|name: &str| EbnfExpr::Identifier(name.to_string()))
        .parse_next(input)
}

fn terminal(input: &mut Input<'_>) -> ModalResult<EbnfExpr> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .map(|text: &str| EbnfExpr::Terminal(text.to_string()))
    .parse_next(input)
}

fn special(input: &mut Input<'_>) -> ModalResult<EbnfExpr> {
    delimited('?', take_till(0.., '?'), '?')
        .map(|text: &str| EbnfExpr::Special(text.trim().to_string()))
        .parse_next(input)
}

fn repetition(input: &mut Input<'_>) -> ModalResult<EbnfExpr> {
    (delimited('{', alternation, '}'), opt('-'))
        .map(|(inner, one_or_more)| match one_or_more {
            Some(_) => EbnfExpr::OneOrMore(Box::new(inner)),
            None => EbnfExpr::ZeroOrMore(Box::new(inner)),
        })
        .parse_next(input)
}

fn factor(input: &mut Input<'_>) -> ModalResult<EbnfExpr> {
    delimited(
        multispace0,
        alt((
            delimited('(', alternation, ')'),
            delimited('[', alternation, ']').map(|inner| EbnfExpr::Optional(Box::new(inner))),
            repetition,
            terminal,
            special,
            identifier,
        )),
        multispace0,
    )
    .parse_next(input)
}

/// Single-element lists collapse into their element.
fn flatten(mut items: Vec<EbnfExpr>, wrap: fn(Vec<EbnfExpr>) -> EbnfExpr) -> EbnfExpr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

fn sequence(input: &mut Input<'_>) -> ModalResult<EbnfExpr> {
    separated(1.., factor, ',')
        .map(|items| flatten(items, EbnfExpr::Sequence))
        .parse_next(input)
}

fn alternation(input: &mut Input<'_>) -> ModalResult<EbnfExpr> {
    separated(1.., sequence, '|')
        .map(|items| flatten(items, EbnfExpr::Alternation))
        .parse_next(input)
}

/// Parses the right-hand side of a rule, without the trailing `;`.
pub fn parse_ebnf_expr(text: &str) -> Result<EbnfExpr, String> {
    let mut input = text;
    match alternation.parse_next(&mut input) {
        Ok(parsed) if input.trim().is_empty() => Ok(parsed),
        Ok(_) => Err(format!("Unexpected `{}` in `{}`", input.trim(), text.trim())),
        Err(_) => Err(format!("Cannot parse `{}`", text.trim())),
    }
}

fn add_rule(diagram: &mut EbnfDiagram, name: &str, body: &str) -> CommandResult {
    let expr = parse_ebnf_expr(body).map_err(CommandError::new)?;
    debug!(rule = name; "Adding EBNF rule");
    diagram.add_rule(EbnfRule::new(name.trim(), expr))?;
    Ok(())
}

fn rule(diagram: &mut EbnfDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    add_rule(
        diagram,
        arg.get("NAME").unwrap_or_default(),
        arg.get("EXPR").unwrap_or_default(),
    )
}

fn rule_block(diagram: &mut EbnfDiagram, matched: &MultiLineMatch<'_>) -> CommandResult {
    let text = matched.lines.join(" ");
    let (name, body) = text
        .split_once('=')
        .ok_or_else(|| CommandError::new("Missing `=` in rule"))?;
    let body = body.trim_end().strip_suffix(';').unwrap_or(body);
    add_rule(diagram, name, body)
}

fn comment(diagram: &mut EbnfDiagram, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    diagram.push_comment(arg.get("TEXT").unwrap_or_default().trim());
    Ok(())
}

fn comment_block(diagram: &mut EbnfDiagram, matched: &MultiLineMatch<'_>) -> CommandResult {
    let text = matched.lines.join("\n");
    let text = text.trim();
    let text = text.strip_prefix("(*").unwrap_or(text);
    let text = text.strip_suffix("*)").unwrap_or(text);
    diagram.push_comment(text.trim());
    Ok(())
}

pub struct EbnfFactory {
    commands: Vec<Box<dyn Command<EbnfDiagram>>>,
}

impl EbnfFactory {
    pub fn new() -> Self {
        let mut commands = common_commands::<EbnfDiagram>();
        commands.extend([
            SingleLineCommand::new("comment", r"^\(\*(?P<TEXT>.*)\*\)$", comment).boxed(),
            MultiLineCommand::new("comment_block", r"^\(\*", r"\*\)$", Trim::Both, comment_block)
                .keeping_start()
                .boxed(),
            SingleLineCommand::new(
                "rule",
                r"^(?P<NAME>[\p{L}\p{N}_][-\p{L}\p{N}_]*)\s*=\s*(?P<EXPR>.*?)\s*;$",
                rule,
            )
            .boxed(),
            MultiLineCommand::new(
                "rule_block",
                r"^[\p{L}\p{N}_][-\p{L}\p{N}_]*\s*=.*$",
                r"^(.*);$",
                Trim::Both,
                rule_block,
            )
            .keeping_start()
            .boxed(),
        ]);
        Self { commands }
    }
}

impl Default for EbnfFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramFactory for EbnfFactory {
    type Diagram = EbnfDiagram;

    fn kind(&self) -> DiagramKind {
        DiagramKind::Ebnf
    }

    fn block_kind(&self) -> BlockKind {
        BlockKind::Ebnf
    }

    fn commands(&self) -> &[Box<dyn Command<EbnfDiagram>>] {
        &self.commands
    }

    fn create_empty(&self) -> EbnfDiagram {
        EbnfDiagram::new()
    }

    fn finish(&self, diagram: EbnfDiagram) -> Result<Diagram, ModelError> {
        if diagram.rules().len() == 0 {
            return Err(ModelError::Empty);
        }
        Ok(Diagram::Ebnf(diagram))
    }
}
