//! The text preprocessor.
//!
//! Runs over the lines of one block before any diagram command sees them.
//! Lines starting with `!` are directives (variables, conditionals, loops,
//! functions and procedures); every other line is emitted after `$variable`,
//! `$function(...)` and `%builtin(...)` references are replaced by the string
//! form of their value.
//!
//! ```
//! # use tracery_parser::{preproc::preprocess, source::numbered_lines};
//! let text = "!$who = \"Bob\"\n!function $greet($name)\n!return \"hello \" + $name\n!endfunction\nAlice -> $who : $greet($who)";
//! let lines: Vec<_> = numbered_lines(text).collect();
//! let output = preprocess(&lines).unwrap();
//! assert_eq!(output.lines[0].text(), "Alice -> Bob : hello Bob");
//! ```

pub mod builtins;
pub mod expr;
mod value;

pub use value::TValue;

use std::cmp::Ordering;

use indexmap::IndexMap;
use log::{debug, info, trace};

use crate::{
    error::{Diagnostic, ErrorCode},
    source::SourceLine,
};

use builtins::BuiltinError;
use expr::{BinaryOp, Expr, Param, UnaryOp};

/// Upper bound on `!while` iterations.
pub const MAX_LOOP_ITERATIONS: usize = 10_000;
const MAX_CALL_DEPTH: usize = 100;

/// Result of preprocessing one block.
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub lines: Vec<SourceLine>,
    /// `!pragma` values, in declaration order.
    pub pragmas: IndexMap<String, String>,
}

/// Preprocesses the lines of one block.
///
/// # Errors
///
/// Returns the first problem found, as a diagnostic pointing at its line.
pub fn preprocess(lines: &[SourceLine]) -> Result<Preprocessed, Diagnostic> {
    let mut preprocessor = Preprocessor::default();
    let mut output = Vec::new();
    match preprocessor.run(lines, &mut output)? {
        Flow::Continue => {}
        Flow::Return(_, line) => {
            return Err(line_error(&line, ErrorCode::E107, "!return outside of a function"));
        }
    }
    debug!(input = lines.len(), output = output.len(); "Preprocessing done");
    Ok(Preprocessed {
        lines: output,
        pragmas: preprocessor.pragmas,
    })
}

fn line_error(line: &SourceLine, code: ErrorCode, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(message)
        .with_code(code)
        .with_label(line.span(), "in this line")
        .with_line(line.number())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallableKind {
    Function,
    Procedure,
}

#[derive(Debug, Clone)]
struct Callable {
    kind: CallableKind,
    params: Vec<Param>,
    body: Vec<SourceLine>,
    /// `!function $f($x) !return expr`
    inline: Option<Expr>,
}

#[derive(Debug)]
enum Flow {
    Continue,
    Return(TValue, SourceLine),
}

/// State of one `!if` ... `!endif` group.
#[derive(Debug)]
struct Conditional {
    parent_active: bool,
    active: bool,
    taken: bool,
    opened_at: SourceLine,
}

#[derive(Debug, Default)]
struct Preprocessor {
    globals: IndexMap<String, TValue>,
    scopes: Vec<IndexMap<String, TValue>>,
    callables: IndexMap<String, Callable>,
    pragmas: IndexMap<String, String>,
    depth: usize,
}

/// Splits `!word rest` into the directive word and its argument text.
/// Assignments (`!$x = 1`) yield the word `$`.
fn split_directive(text: &str) -> Option<(&str, &str)> {
    let rest = text.trim_start().strip_prefix('!')?;
    if rest.starts_with('$') {
        return Some(("$", rest));
    }
    let word_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let (word, args) = rest.split_at(word_len);
    Some((word, args.trim()))
}

/// Index of the line closing the block opened at `start`, honouring nesting.
fn find_block_end(lines: &[SourceLine], start: usize, opens: &[&str], close: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        let Some((word, args)) = split_directive(line.text()) else {
            continue;
        };
        if opens.contains(&word) && !(word == "function" && args.contains("!return")) {
            depth += 1;
        } else if word == close {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
        }
    }
    None
}

impl Preprocessor {
    fn lookup(&self, name: &str) -> Option<&TValue> {
        self.scopes
            .last()
            .and_then(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
    }

    fn assign(&mut self, name: &str, value: TValue, scope: Scope) {
        trace!(name = name, value:% = value; "Assigning variable");
        match (scope, self.scopes.last_mut()) {
            (Scope::Global, _) | (Scope::Default, None) => {
                self.globals.insert(name.to_string(), value);
            }
            (Scope::Local | Scope::Default, Some(locals)) => {
                locals.insert(name.to_string(), value);
            }
            (Scope::Local, None) => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    fn run(&mut self, lines: &[SourceLine], out: &mut Vec<SourceLine>) -> Result<Flow, Diagnostic> {
        let mut conditionals: Vec<Conditional> = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = &lines[index];
            let active = conditionals.last().is_none_or(|c| c.active);

            let Some((word, args)) = split_directive(line.text()) else {
                if active {
                    self.emit(line, out)?;
                }
                index += 1;
                continue;
            };

            match word {
                "if" | "ifdef" | "ifndef" => {
                    let value = if active {
                        self.condition(word, args, line)?
                    } else {
                        false
                    };
                    conditionals.push(Conditional {
                        parent_active: active,
                        active: value,
                        taken: value || !active,
                        opened_at: line.clone(),
                    });
                }
                "elseif" => {
                    let Some(frame) = conditionals.pop() else {
                        return Err(line_error(line, ErrorCode::E102, "!elseif without !if"));
                    };
                    let value = if frame.parent_active && !frame.taken {
                        self.condition("if", args, line)?
                    } else {
                        false
                    };
                    conditionals.push(Conditional {
                        active: value,
                        taken: frame.taken || value,
                        ..frame
                    });
                }
                "else" => {
                    let frame = conditionals
                        .last_mut()
                        .ok_or_else(|| line_error(line, ErrorCode::E102, "!else without !if"))?;
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                }
                "endif" => {
                    if conditionals.pop().is_none() {
                        return Err(line_error(line, ErrorCode::E102, "!endif without !if"));
                    }
                }
                _ if !active => {}
                "$" | "global" | "local" => self.assignment(word, args, line)?,
                "while" => {
                    let end = find_block_end(lines, index, &["while"], "endwhile")
                        .ok_or_else(|| line_error(line, ErrorCode::E102, "!while without !endwhile"))?;
                    if let Flow::Return(value, at) = self.run_loop(args, &lines[index + 1..end], line, out)? {
                        return Ok(Flow::Return(value, at));
                    }
                    index = end;
                }
                "function" | "procedure" => {
                    index = self.define(word, args, lines, index)?;
                }
                "return" => {
                    let value = self.eval_text(args, line)?;
                    return Ok(Flow::Return(value, line.clone()));
                }
                "log" => {
                    let text = self.substitute(args, line)?;
                    info!(line = line.number(); "{text}");
                }
                "assert" => self.assert(args, line)?,
                "pragma" => {
                    let (key, value) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                    self.pragmas.insert(key.to_string(), value.trim().to_string());
                }
                "endwhile" | "endfunction" | "endprocedure" => {
                    return Err(line_error(
                        line,
                        ErrorCode::E102,
                        format!("!{word} without its opening directive"),
                    ));
                }
                _ => {
                    return Err(line_error(
                        line,
                        ErrorCode::E101,
                        format!("Unknown directive `!{word}`"),
                    ));
                }
            }
            index += 1;
        }

        if let Some(open) = conditionals.pop() {
            return Err(line_error(&open.opened_at, ErrorCode::E102, "!if without !endif"));
        }
        Ok(Flow::Continue)
    }

    fn condition(&mut self, word: &str, args: &str, line: &SourceLine) -> Result<bool, Diagnostic> {
        match word {
            "ifdef" => Ok(self.lookup(args.trim()).is_some()),
            "ifndef" => Ok(self.lookup(args.trim()).is_none()),
            _ => Ok(self.eval_text(args, line)?.is_true()),
        }
    }

    fn assignment(&mut self, word: &str, args: &str, line: &SourceLine) -> Result<(), Diagnostic> {
        let scope = match word {
            "global" => Scope::Global,
            "local" => Scope::Local,
            _ => Scope::Default,
        };
        let args = args.trim_start();
        let name_len = args
            .char_indices()
            .skip(1)
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map_or(args.len(), |(i, _)| i);
        let (name, rest) = args.split_at(name_len);
        if !name.starts_with('$') || name.len() < 2 {
            return Err(line_error(line, ErrorCode::E100, format!("Invalid variable in `{}`", line.text().trim())));
        }
        let rest = rest.trim_start();
        let (conditional, value_text) = if let Some(value) = rest.strip_prefix("?=") {
            (true, value)
        } else if let Some(value) = rest.strip_prefix('=') {
            (false, value)
        } else {
            return Err(line_error(line, ErrorCode::E100, format!("Expected `=` after {name}")));
        };
        if conditional && self.lookup(name).is_some() {
            return Ok(());
        }
        let value = self.eval_text(value_text, line)?;
        self.assign(name, value, scope);
        Ok(())
    }

    fn run_loop(
        &mut self,
        condition: &str,
        body: &[SourceLine],
        line: &SourceLine,
        out: &mut Vec<SourceLine>,
    ) -> Result<Flow, Diagnostic> {
        let condition = expr::parse_expr(condition).map_err(|e| line_error(line, ErrorCode::E100, e))?;
        let mut iterations = 0;
        while self.eval(&condition, line)?.is_true() {
            iterations += 1;
            if iterations > MAX_LOOP_ITERATIONS {
                return Err(line_error(
                    line,
                    ErrorCode::E104,
                    format!("!while loop exceeded {MAX_LOOP_ITERATIONS} iterations"),
                ));
            }
            if let Flow::Return(value, at) = self.run(body, out)? {
                return Ok(Flow::Return(value, at));
            }
        }
        Ok(Flow::Continue)
    }

    /// Records a function or procedure and returns the index of its last line.
    fn define(&mut self, word: &str, args: &str, lines: &[SourceLine], index: usize) -> Result<usize, Diagnostic> {
        let line = &lines[index];
        let kind = if word == "function" {
            CallableKind::Function
        } else {
            CallableKind::Procedure
        };
        let (header, inline) = match args.split_once("!return") {
            Some((header, value)) if kind == CallableKind::Function => (header.trim(), Some(value)),
            _ => (args, None),
        };

        let open = header.find('(');
        let close = header.rfind(')');
        let (name, params) = match (open, close) {
            (Some(open), Some(close)) if open < close => (header[..open].trim(), &header[open + 1..close]),
            _ => (header.trim(), ""),
        };
        if !name.starts_with('$') || name.len() < 2 {
            return Err(line_error(line, ErrorCode::E100, format!("Invalid {word} name `{name}`")));
        }
        let params = expr::parse_params(params).map_err(|e| line_error(line, ErrorCode::E100, e))?;

        let (body, last, inline) = match inline {
            Some(value) => {
                let value = expr::parse_expr(value).map_err(|e| line_error(line, ErrorCode::E100, e))?;
                (Vec::new(), index, Some(value))
            }
            None => {
                let close_word = if kind == CallableKind::Function { "endfunction" } else { "endprocedure" };
                let end = find_block_end(lines, index, &[word], close_word).ok_or_else(|| {
                    line_error(line, ErrorCode::E102, format!("!{word} without !{close_word}"))
                })?;
                (lines[index + 1..end].to_vec(), end, None)
            }
        };

        debug!(name = name, kind = word, params = params.len(); "Defining callable");
        self.callables.insert(
            name.to_string(),
            Callable {
                kind,
                params,
                body,
                inline,
            },
        );
        Ok(last)
    }

    fn assert(&mut self, args: &str, line: &SourceLine) -> Result<(), Diagnostic> {
        // The message separator is the last colon outside quotes.
        let mut in_quote = None;
        let mut split = None;
        for (i, c) in args.char_indices() {
            match (in_quote, c) {
                (None, '"' | '\'') => in_quote = Some(c),
                (Some(q), c) if q == c => in_quote = None,
                (None, ':') => split = Some(i),
                _ => {}
            }
        }
        let (condition, message) = match split {
            Some(i) => (&args[..i], Some(args[i + 1..].trim())),
            None => (args, None),
        };
        if self.eval_text(condition, line)?.is_true() {
            return Ok(());
        }
        let message = match message {
            Some(message) => format!("Assertion error: {}", self.substitute(message, line)?),
            None => format!("Assertion error: {}", condition.trim()),
        };
        Err(line_error(line, ErrorCode::E105, message))
    }

    /// Emits a text line after substitution, expanding procedure calls.
    fn emit(&mut self, line: &SourceLine, out: &mut Vec<SourceLine>) -> Result<(), Diagnostic> {
        let trimmed = line.text().trim();
        if let Some((Expr::Call { name, args }, len)) = expr::parse_term(trimmed) {
            let is_procedure = self
                .callables
                .get(&name)
                .is_some_and(|c| c.kind == CallableKind::Procedure);
            if is_procedure && len == trimmed.len() {
                let args = self.eval_args(&args, line)?;
                return self.call_procedure(&name, args, line, out);
            }
        }

        let text = self.substitute(line.text(), line)?;
        for part in text.split('\n') {
            out.push(line.with_text(part));
        }
        Ok(())
    }

    /// Replaces every resolvable `$var`, `$f(...)` and `%builtin(...)`.
    fn substitute(&mut self, text: &str, line: &SourceLine) -> Result<String, Diagnostic> {
        if !text.contains(['$', '%']) {
            return Ok(text.to_string());
        }
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find(['$', '%']) {
            result.push_str(&rest[..pos]);
            let candidate = &rest[pos..];
            let replacement = match expr::parse_term(candidate) {
                Some((term, len)) if self.resolvable(&term) => {
                    Some((self.eval(&term, line)?.to_string(), len))
                }
                _ => None,
            };
            match replacement {
                Some((value, len)) => {
                    result.push_str(&value);
                    rest = &candidate[len..];
                }
                None => {
                    // `$` and `%` are single byte characters.
                    result.push_str(&candidate[..1]);
                    rest = &candidate[1..];
                }
            }
        }
        result.push_str(rest);
        Ok(result)
    }

    fn resolvable(&self, term: &Expr) -> bool {
        match term {
            Expr::Var(name) => self.lookup(name).is_some(),
            Expr::Call { name, .. } if name.starts_with('%') => builtins::exists(name),
            Expr::Call { name, .. } => self
                .callables
                .get(name)
                .is_some_and(|c| c.kind == CallableKind::Function),
            _ => false,
        }
    }

    fn eval_text(&mut self, text: &str, line: &SourceLine) -> Result<TValue, Diagnostic> {
        let parsed = expr::parse_expr(text).map_err(|e| line_error(line, ErrorCode::E100, e))?;
        self.eval(&parsed, line)
    }

    fn eval_args(&mut self, args: &[Expr], line: &SourceLine) -> Result<Vec<TValue>, Diagnostic> {
        args.iter().map(|arg| self.eval(arg, line)).collect()
    }

    fn eval(&mut self, expr: &Expr, line: &SourceLine) -> Result<TValue, Diagnostic> {
        let value = match expr {
            Expr::Int(value) => TValue::Int(*value),
            Expr::Str(value) => TValue::Str(value.clone()),
            Expr::Var(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| line_error(line, ErrorCode::E103, format!("Unknown variable {name}")))?,
            Expr::Call { name, args } => {
                let args = self.eval_args(args, line)?;
                self.call(name, args, line)?
            }
            Expr::Unary(UnaryOp::Not, inner) => TValue::from_bool(!self.eval(inner, line)?.is_true()),
            Expr::Unary(UnaryOp::Neg, inner) => {
                let value = self.eval(inner, line)?;
                TValue::Int(0)
                    .sub(&value)
                    .map_err(|e| line_error(line, ErrorCode::E100, e))?
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                TValue::from_bool(self.eval(left, line)?.is_true() && self.eval(right, line)?.is_true())
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                TValue::from_bool(self.eval(left, line)?.is_true() || self.eval(right, line)?.is_true())
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, line)?;
                let right = self.eval(right, line)?;
                let ordering = left.compare(&right);
                let result = match op {
                    BinaryOp::Add => Ok(left.add(&right)),
                    BinaryOp::Sub => left.sub(&right),
                    BinaryOp::Mul => left.mul(&right),
                    BinaryOp::Div => left.div(&right),
                    BinaryOp::Eq => Ok(TValue::from_bool(ordering == Ordering::Equal)),
                    BinaryOp::Ne => Ok(TValue::from_bool(ordering != Ordering::Equal)),
                    BinaryOp::Lt => Ok(TValue::from_bool(ordering == Ordering::Less)),
                    BinaryOp::Le => Ok(TValue::from_bool(ordering != Ordering::Greater)),
                    BinaryOp::Gt => Ok(TValue::from_bool(ordering == Ordering::Greater)),
                    BinaryOp::Ge => Ok(TValue::from_bool(ordering != Ordering::Less)),
                    BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                };
                result.map_err(|e| line_error(line, ErrorCode::E100, e))?
            }
        };
        Ok(value)
    }

    fn variable_name(value: &TValue) -> String {
        let name = value.to_string();
        if name.starts_with('$') { name } else { format!("${name}") }
    }

    fn call(&mut self, name: &str, args: Vec<TValue>, line: &SourceLine) -> Result<TValue, Diagnostic> {
        match name {
            "%variable_exists" | "%function_exists" | "%get_variable_value" => {
                let [arg] = args.as_slice() else {
                    return Err(line_error(
                        line,
                        ErrorCode::E106,
                        format!("{name} expects 1 argument, got {}", args.len()),
                    ));
                };
                let target = Self::variable_name(arg);
                return Ok(match name {
                    "%variable_exists" => TValue::from_bool(self.lookup(&target).is_some()),
                    "%function_exists" => TValue::from_bool(self.callables.contains_key(&target)),
                    _ => self.lookup(&target).cloned().unwrap_or_else(|| TValue::str("")),
                });
            }
            _ if name.starts_with('%') => {
                return builtins::call(name, &args).map_err(|err| match err {
                    BuiltinError::Unknown => {
                        line_error(line, ErrorCode::E103, format!("Unknown builtin function {name}"))
                    }
                    BuiltinError::Arity { name, expected, got } => line_error(
                        line,
                        ErrorCode::E106,
                        format!("{name} expects {expected} argument(s), got {got}"),
                    ),
                    BuiltinError::Invalid(message) => line_error(line, ErrorCode::E100, message),
                });
            }
            _ => {}
        }

        let callable = self
            .callables
            .get(name)
            .filter(|c| c.kind == CallableKind::Function)
            .cloned()
            .ok_or_else(|| line_error(line, ErrorCode::E103, format!("Unknown function {name}")))?;

        self.enter(name, &callable, args, line)?;
        let result = match &callable.inline {
            Some(value) => self.eval(value, line),
            None => {
                let mut discarded = Vec::new();
                self.run(&callable.body, &mut discarded).and_then(|flow| match flow {
                    Flow::Return(value, _) => Ok(value),
                    Flow::Continue => Err(line_error(
                        line,
                        ErrorCode::E107,
                        format!("Function {name} ended without !return"),
                    )),
                })
            }
        };
        self.leave();
        result
    }

    fn call_procedure(
        &mut self,
        name: &str,
        args: Vec<TValue>,
        line: &SourceLine,
        out: &mut Vec<SourceLine>,
    ) -> Result<(), Diagnostic> {
        let Some(callable) = self.callables.get(name).cloned() else {
            return Err(line_error(line, ErrorCode::E103, format!("Unknown procedure {name}")));
        };
        self.enter(name, &callable, args, line)?;
        let mut body = Vec::new();
        let result = self.run(&callable.body, &mut body);
        self.leave();
        match result? {
            Flow::Continue => {}
            Flow::Return(_, at) => {
                return Err(line_error(&at, ErrorCode::E107, format!("!return inside procedure {name}")));
            }
        }
        // Expanded lines point at the call site.
        out.extend(body.into_iter().map(|expanded| line.with_text(expanded.text())));
        Ok(())
    }

    /// Binds arguments to parameters in a fresh local scope.
    fn enter(&mut self, name: &str, callable: &Callable, args: Vec<TValue>, line: &SourceLine) -> Result<(), Diagnostic> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(line_error(
                line,
                ErrorCode::E104,
                format!("Too many nested calls while calling {name}"),
            ));
        }
        if args.len() > callable.params.len() {
            return Err(line_error(
                line,
                ErrorCode::E106,
                format!("{name} expects at most {} argument(s), got {}", callable.params.len(), args.len()),
            ));
        }

        let mut scope = IndexMap::new();
        let mut args = args.into_iter();
        for param in &callable.params {
            let value = match (args.next(), &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.eval(default, line)?,
                (None, None) => {
                    return Err(line_error(
                        line,
                        ErrorCode::E106,
                        format!("Missing argument {} when calling {name}", param.name),
                    ));
                }
            };
            scope.insert(param.name.clone(), value);
        }
        self.scopes.push(scope);
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.scopes.pop();
        self.depth = self.depth.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Default,
    Global,
    Local,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::numbered_lines;

    fn run(text: &str) -> Result<Vec<String>, Diagnostic> {
        let lines: Vec<SourceLine> = numbered_lines(text).collect();
        preprocess(&lines).map(|output| {
            output
                .lines
                .iter()
                .map(|line| line.text().to_string())
                .collect()
        })
    }

    #[test]
    fn test_plain_lines_pass_through() {
        assert_eq!(run("A -> B : costs $5 or 10%").unwrap(), ["A -> B : costs $5 or 10%"]);
    }

    #[test]
    fn test_variables_and_conditional_assignment() {
        let output = run("!$a = 1\n!$a ?= 2\n!$b ?= $a + 1\nvalue $a $b $unknown").unwrap();
        assert_eq!(output, ["value 1 2 $unknown"]);
    }

    #[test]
    fn test_if_elseif_else() {
        let text = "!$x = 2\n!if $x == 1\none\n!elseif $x == 2\ntwo\n!else\nother\n!endif";
        assert_eq!(run(text).unwrap(), ["two"]);
    }

    #[test]
    fn test_nested_if_in_inactive_branch() {
        let text = "!if 0\n!if 1\nhidden\n!endif\n!else\nshown\n!endif";
        assert_eq!(run(text).unwrap(), ["shown"]);
    }

    #[test]
    fn test_ifdef() {
        let text = "!$on = 1\n!ifdef $on\nyes\n!endif\n!ifndef $off\nno\n!endif";
        assert_eq!(run(text).unwrap(), ["yes", "no"]);
    }

    #[test]
    fn test_while_loop() {
        let text = "!$i = 0\n!while $i < 3\nline $i\n!$i = $i + 1\n!endwhile";
        assert_eq!(run(text).unwrap(), ["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn test_while_limit() {
        let err = run("!while 1\n!endwhile").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E104));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_functions_with_defaults_and_one_liners() {
        let text = "!function $twice($x) !return $x * 2\n!function $wrap($s, $l = \"[\", $r = \"]\")\n!return $l + $s + $r\n!endfunction\n$wrap($twice(21))";
        assert_eq!(run(text).unwrap(), ["[42]"]);
    }

    #[test]
    fn test_recursive_function() {
        let text = "!function $fact($n)\n!if $n <= 1\n!return 1\n!endif\n!return $n * $fact($n - 1)\n!endfunction\n$fact(5)";
        assert_eq!(run(text).unwrap(), ["120"]);
    }

    #[test]
    fn test_function_locals_do_not_leak() {
        let text = "!$v = \"outer\"\n!function $f()\n!$v = \"inner\"\n!return $v\n!endfunction\n$f() $v";
        assert_eq!(run(text).unwrap(), ["inner outer"]);
    }

    #[test]
    fn test_global_assignment_from_function() {
        let text = "!function $f()\n!global $g = 7\n!return 0\n!endfunction\n!$ignored = $f()\n$g";
        assert_eq!(run(text).unwrap(), ["7"]);
    }

    #[test]
    fn test_procedure_expansion_keeps_call_line() {
        let text = "!procedure $pair($a, $b)\n$a -> $b\n$b -> $a\n!endprocedure\nfirst\n$pair(\"A\", \"B\")";
        let lines: Vec<SourceLine> = numbered_lines(text).collect();
        let output = preprocess(&lines).unwrap();
        let texts: Vec<&str> = output.lines.iter().map(SourceLine::text).collect();
        assert_eq!(texts, ["first", "A -> B", "B -> A"]);
        assert_eq!(output.lines[1].number(), 6);
    }

    #[test]
    fn test_builtins_in_text() {
        let output = run("%hex2dec(\"ff\") %dec2hex(255) %upper(\"a\")%newline()next").unwrap();
        assert_eq!(output, ["255 ff A", "next"]);
    }

    #[test]
    fn test_hex2dec_without_argument_in_text() {
        assert_eq!(run("x %hex2dec()").unwrap(), ["x 0"]);
    }

    #[test]
    fn test_stateful_builtins() {
        let text = "!$x = 3\n%variable_exists(\"$x\") %variable_exists(\"y\") %get_variable_value(\"x\")";
        assert_eq!(run(text).unwrap(), ["1 0 3"]);
    }

    #[test]
    fn test_assert() {
        assert!(run("!assert 1 == 1").unwrap().is_empty());
        let err = run("!assert 1 == 2 : \"numbers: differ\"").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E105));
        assert_eq!(err.message(), "Assertion error: \"numbers: differ\"");
    }

    #[test]
    fn test_pragma_is_recorded() {
        let lines: Vec<SourceLine> = numbered_lines("!pragma teoz true\n!pragma layout").collect();
        let output = preprocess(&lines).unwrap();
        assert_eq!(output.pragmas.get("teoz").map(String::as_str), Some("true"));
        assert_eq!(output.pragmas.get("layout").map(String::as_str), Some(""));
        assert!(output.lines.is_empty());
    }

    #[test]
    fn test_errors() {
        assert_eq!(run("!endif").unwrap_err().code(), Some(ErrorCode::E102));
        assert_eq!(run("!if 1\nx").unwrap_err().code(), Some(ErrorCode::E102));
        assert_eq!(run("!frobnicate").unwrap_err().code(), Some(ErrorCode::E101));
        assert_eq!(run("!$x = (1").unwrap_err().code(), Some(ErrorCode::E100));
        assert_eq!(run("!$x = $nope").unwrap_err().code(), Some(ErrorCode::E103));
        assert_eq!(run("!return 1").unwrap_err().code(), Some(ErrorCode::E107));
        assert_eq!(
            run("!function $f($a)\n!return $a\n!endfunction\n!$x = $f(1, 2)")
                .unwrap_err()
                .code(),
            Some(ErrorCode::E106)
        );
    }
}
