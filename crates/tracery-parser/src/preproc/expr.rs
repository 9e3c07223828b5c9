//! Expression syntax of the preprocessor.
//!
//! ```text
//! expr    := and ( "||" and )*
//! and     := cmp ( "&&" cmp )*
//! cmp     := add ( ("==" | "!=" | "<=" | ">=" | "<" | ">") add )?
//! add     := mul ( ("+" | "-") mul )*
//! mul     := unary ( ("*" | "/") unary )*
//! unary   := "!" unary | "-" unary | primary
//! primary := int | string | "(" expr ")" | term
//! term    := ("$" | "%") ident ( "(" [ expr ( "," expr )* ] ")" )?
//! ```

use winnow::{
    ModalResult, Parser as _,
    ascii::{digit1, multispace0},
    combinator::{alt, delimited, not, opt, preceded, separated},
    token::{one_of, take_till, take_while},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Str(String),
    /// Variable reference, name including the `$`.
    Var(String),
    /// Function call, name including the `$` or `%` prefix.
    Call { name: String, args: Vec<Expr> },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// A parameter of a user function or procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

type Input<'a> = &'a str;

fn identifier<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn integer(input: &mut Input<'_>) -> ModalResult<Expr> {
    digit1
        .try_map(|digits: &str| digits.parse::<i64>())
        .map(Expr::Int)
        .parse_next(input)
}

fn string(input: &mut Input<'_>) -> ModalResult<Expr> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .map(|text: &str| Expr::Str(text.to_string()))
    .parse_next(input)
}

fn arguments(input: &mut Input<'_>) -> ModalResult<Vec<Expr>> {
    delimited(
        '(',
        delimited(multispace0, separated(0.., expr, ','), multispace0),
        ')',
    )
    .parse_next(input)
}

/// A variable or a call, without surrounding whitespace.
fn term(input: &mut Input<'_>) -> ModalResult<Expr> {
    (one_of(['$', '%']), identifier, opt(arguments))
        .map(|(prefix, name, args): (char, &str, Option<Vec<Expr>>)| {
            let name = format!("{prefix}{name}");
            match args {
                Some(args) => Expr::Call { name, args },
                None if prefix == '%' => Expr::Call {
                    name,
                    args: Vec::new(),
                },
                None => Expr::Var(name),
            }
        })
        .parse_next(input)
}

fn primary(input: &mut Input<'_>) -> ModalResult<Expr> {
    delimited(
        multispace0,
        alt((integer, string, delimited('(', expr, ')'), term)),
        multispace0,
    )
    .parse_next(input)
}

fn unary(input: &mut Input<'_>) -> ModalResult<Expr> {
    multispace0.parse_next(input)?;
    alt((
        preceded(('!', not('=')), unary).map(|e| Expr::Unary(UnaryOp::Not, Box::new(e))),
        preceded('-', unary).map(|e| Expr::Unary(UnaryOp::Neg, Box::new(e))),
        primary,
    ))
    .parse_next(input)
}

fn binary_chain(
    input: &mut Input<'_>,
    operand: fn(&mut Input<'_>) -> ModalResult<Expr>,
    operator: fn(&mut Input<'_>) -> ModalResult<BinaryOp>,
) -> ModalResult<Expr> {
    let mut left = operand(input)?;
    while let Some(op) = opt(delimited(multispace0, operator, multispace0)).parse_next(input)? {
        let right = operand(input)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn mul_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt(('*'.value(BinaryOp::Mul), '/'.value(BinaryOp::Div))).parse_next(input)
}

fn add_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt(('+'.value(BinaryOp::Add), '-'.value(BinaryOp::Sub))).parse_next(input)
}

fn cmp_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt((
        "==".value(BinaryOp::Eq),
        "!=".value(BinaryOp::Ne),
        "<=".value(BinaryOp::Le),
        ">=".value(BinaryOp::Ge),
        "<".value(BinaryOp::Lt),
        ">".value(BinaryOp::Gt),
    ))
    .parse_next(input)
}

fn and_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    "&&".value(BinaryOp::And).parse_next(input)
}

fn or_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    "||".value(BinaryOp::Or).parse_next(input)
}

fn multiplicative(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(input, unary, mul_op)
}

fn additive(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(input, multiplicative, add_op)
}

fn comparison(input: &mut Input<'_>) -> ModalResult<Expr> {
    let left = additive(input)?;
    match opt(delimited(multispace0, cmp_op, multispace0)).parse_next(input)? {
        Some(op) => {
            let right = additive(input)?;
            Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
        }
        None => Ok(left),
    }
}

fn conjunction(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(input, comparison, and_op)
}

fn expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(input, conjunction, or_op)
}

fn param(input: &mut Input<'_>) -> ModalResult<Param> {
    (
        delimited(multispace0, ('$', identifier).take(), multispace0),
        opt(preceded(('=', multispace0), expr)),
    )
        .map(|(name, default): (&str, Option<Expr>)| Param {
            name: name.to_string(),
            default,
        })
        .parse_next(input)
}

/// Parses a complete expression.
pub fn parse_expr(text: &str) -> Result<Expr, String> {
    let mut input = text;
    match expr.parse_next(&mut input) {
        Ok(parsed) if input.trim().is_empty() => Ok(parsed),
        Ok(_) => Err(format!(
            "Unexpected `{}` in expression `{}`",
            input.trim(),
            text.trim()
        )),
        Err(_) => Err(format!("Cannot parse expression `{}`", text.trim())),
    }
}

/// Parses a `$variable`, `$function(...)` or `%builtin(...)` at the start of
/// `text`. Returns the term and the number of bytes it spans.
pub fn parse_term(text: &str) -> Option<(Expr, usize)> {
    let mut input = text;
    let parsed = term.parse_next(&mut input).ok()?;
    Some((parsed, text.len() - input.len()))
}

/// Parses a parameter list such as `$a, $b = "x"` (without parentheses).
pub fn parse_params(text: &str) -> Result<Vec<Param>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut input = text;
    let params: Vec<Param> = separated(1.., param, ',')
        .parse_next(&mut input)
        .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
            format!("Cannot parse parameters `{}`", text.trim())
        })?;
    if !input.trim().is_empty() {
        return Err(format!("Cannot parse parameters `{}`", text.trim()));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    #[test]
    fn test_precedence() {
        let parsed = parse_expr("1 + 2 * 3").unwrap();
        assert_eq!(
            parsed,
            bin(
                BinaryOp::Add,
                Expr::Int(1),
                bin(BinaryOp::Mul, Expr::Int(2), Expr::Int(3))
            )
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let parsed = parse_expr("10 - 4 - 3").unwrap();
        assert_eq!(
            parsed,
            bin(
                BinaryOp::Sub,
                bin(BinaryOp::Sub, Expr::Int(10), Expr::Int(4)),
                Expr::Int(3)
            )
        );
    }

    #[test]
    fn test_comparison_and_logic() {
        let parsed = parse_expr("$a == \"x\" || !$b").unwrap();
        assert_eq!(
            parsed,
            bin(
                BinaryOp::Or,
                bin(
                    BinaryOp::Eq,
                    Expr::Var("$a".into()),
                    Expr::Str("x".into())
                ),
                Expr::Unary(UnaryOp::Not, Box::new(Expr::Var("$b".into())))
            )
        );
    }

    #[test]
    fn test_not_equal_is_not_negation() {
        let parsed = parse_expr("$a != 1").unwrap();
        assert!(matches!(parsed, Expr::Binary(BinaryOp::Ne, _, _)));
    }

    #[test]
    fn test_calls() {
        let parsed = parse_expr("%hex2dec('ff') + $f(1, \"a\")").unwrap();
        let Expr::Binary(BinaryOp::Add, left, right) = parsed else {
            panic!("expected addition");
        };
        assert_eq!(
            *left,
            Expr::Call {
                name: "%hex2dec".into(),
                args: vec![Expr::Str("ff".into())]
            }
        );
        assert_eq!(
            *right,
            Expr::Call {
                name: "$f".into(),
                args: vec![Expr::Int(1), Expr::Str("a".into())]
            }
        );
    }

    #[test]
    fn test_builtin_without_parentheses() {
        assert_eq!(
            parse_expr("%true").unwrap(),
            Expr::Call {
                name: "%true".into(),
                args: Vec::new()
            }
        );
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        assert!(parse_expr("1 2").is_err());
        assert!(parse_expr("(1").is_err());
        assert!(parse_expr("").is_err());
    }

    #[test]
    fn test_parse_term_reports_length() {
        let (term, len) = parse_term("$name is here").unwrap();
        assert_eq!(term, Expr::Var("$name".into()));
        assert_eq!(len, 5);

        let (_, len) = parse_term("$f(1, 2) rest").unwrap();
        assert_eq!(len, 8);

        assert!(parse_term("$5").is_none());
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params("$a, $b = \"x\"").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "$a");
        assert_eq!(params[1].default, Some(Expr::Str("x".into())));
        assert!(parse_params("").unwrap().is_empty());
        assert!(parse_params("a b").is_err());
    }
}
