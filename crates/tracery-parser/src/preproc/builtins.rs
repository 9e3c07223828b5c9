//! `%builtin` functions that only depend on their arguments.
//!
//! Builtins that inspect the preprocessor state (`%variable_exists` and
//! friends) are evaluated by the preprocessor itself.

use super::value::TValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinError {
    Unknown,
    Arity { name: &'static str, expected: &'static str, got: usize },
    Invalid(String),
}

struct Builtin {
    name: &'static str,
    min: usize,
    max: usize,
    arity: &'static str,
    call: fn(&[TValue]) -> Result<TValue, String>,
}

const BUILTINS: &[Builtin] = &[
    Builtin { name: "%hex2dec", min: 0, max: 1, arity: "0 or 1", call: hex2dec },
    Builtin { name: "%dec2hex", min: 1, max: 1, arity: "1", call: dec2hex },
    Builtin { name: "%strlen", min: 1, max: 1, arity: "1", call: strlen },
    Builtin { name: "%substr", min: 2, max: 3, arity: "2 or 3", call: substr },
    Builtin { name: "%strpos", min: 2, max: 2, arity: "2", call: strpos },
    Builtin { name: "%upper", min: 1, max: 1, arity: "1", call: upper },
    Builtin { name: "%lower", min: 1, max: 1, arity: "1", call: lower },
    Builtin { name: "%intval", min: 1, max: 1, arity: "1", call: intval },
    Builtin { name: "%string", min: 1, max: 1, arity: "1", call: string },
    Builtin { name: "%boolval", min: 1, max: 1, arity: "1", call: boolval },
    Builtin { name: "%not", min: 1, max: 1, arity: "1", call: not },
    Builtin { name: "%true", min: 0, max: 0, arity: "0", call: true_value },
    Builtin { name: "%false", min: 0, max: 0, arity: "0", call: false_value },
    Builtin { name: "%chr", min: 1, max: 1, arity: "1", call: chr },
    Builtin { name: "%ord", min: 1, max: 1, arity: "1", call: ord },
    Builtin { name: "%newline", min: 0, max: 0, arity: "0", call: newline },
];

/// Builtins answered by the preprocessor state rather than [`call`].
pub const STATEFUL: &[&str] = &[
    "%variable_exists",
    "%function_exists",
    "%get_variable_value",
];

pub fn exists(name: &str) -> bool {
    BUILTINS.iter().any(|b| b.name == name) || STATEFUL.contains(&name)
}

/// Calls a stateless builtin.
pub fn call(name: &str, args: &[TValue]) -> Result<TValue, BuiltinError> {
    let builtin = BUILTINS
        .iter()
        .find(|b| b.name == name)
        .ok_or(BuiltinError::Unknown)?;
    if args.len() < builtin.min || args.len() > builtin.max {
        return Err(BuiltinError::Arity {
            name: builtin.name,
            expected: builtin.arity,
            got: args.len(),
        });
    }
    (builtin.call)(args).map_err(BuiltinError::Invalid)
}

/// Reads the string form as a signed base-16 number; anything else,
/// including a missing argument, is 0.
fn hex2dec(args: &[TValue]) -> Result<TValue, String> {
    let Some(arg) = args.first() else {
        return Ok(TValue::Int(0));
    };
    Ok(TValue::Int(i64::from_str_radix(&arg.to_string(), 16).unwrap_or(0)))
}

fn dec2hex(args: &[TValue]) -> Result<TValue, String> {
    let value = args[0].as_int().unwrap_or(0);
    let hex = if value < 0 {
        format!("-{:x}", value.unsigned_abs())
    } else {
        format!("{value:x}")
    };
    Ok(TValue::Str(hex))
}

fn strlen(args: &[TValue]) -> Result<TValue, String> {
    let len = args[0].to_string().chars().count();
    Ok(TValue::Int(len as i64))
}

fn substr(args: &[TValue]) -> Result<TValue, String> {
    let text = args[0].to_string();
    let start = args[1]
        .as_int()
        .ok_or_else(|| format!("%substr start must be an integer, got \"{}\"", args[1]))?
        .max(0) as usize;
    let chars = text.chars().skip(start);
    let result: String = match args.get(2) {
        Some(len) => {
            let len = len
                .as_int()
                .ok_or_else(|| format!("%substr length must be an integer, got \"{len}\""))?
                .max(0) as usize;
            chars.take(len).collect()
        }
        None => chars.collect(),
    };
    Ok(TValue::Str(result))
}

fn strpos(args: &[TValue]) -> Result<TValue, String> {
    let text = args[0].to_string();
    let needle = args[1].to_string();
    let position = text
        .find(&needle)
        .map_or(-1, |byte| text[..byte].chars().count() as i64);
    Ok(TValue::Int(position))
}

fn upper(args: &[TValue]) -> Result<TValue, String> {
    Ok(TValue::Str(args[0].to_string().to_uppercase()))
}

fn lower(args: &[TValue]) -> Result<TValue, String> {
    Ok(TValue::Str(args[0].to_string().to_lowercase()))
}

fn intval(args: &[TValue]) -> Result<TValue, String> {
    args[0]
        .as_int()
        .map(TValue::Int)
        .ok_or_else(|| format!("\"{}\" is not an integer", args[0]))
}

fn string(args: &[TValue]) -> Result<TValue, String> {
    Ok(TValue::Str(args[0].to_string()))
}

fn boolval(args: &[TValue]) -> Result<TValue, String> {
    let value = match &args[0] {
        TValue::Int(value) => *value != 0,
        TValue::Str(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" | "" => false,
            other => other.parse::<i64>().is_ok_and(|value| value != 0),
        },
    };
    Ok(TValue::from_bool(value))
}

fn not(args: &[TValue]) -> Result<TValue, String> {
    Ok(TValue::from_bool(!args[0].is_true()))
}

fn true_value(_: &[TValue]) -> Result<TValue, String> {
    Ok(TValue::Int(1))
}

fn false_value(_: &[TValue]) -> Result<TValue, String> {
    Ok(TValue::Int(0))
}

fn newline(_: &[TValue]) -> Result<TValue, String> {
    Ok(TValue::str("\n"))
}

fn chr(args: &[TValue]) -> Result<TValue, String> {
    let code = args[0]
        .as_int()
        .ok_or_else(|| format!("%chr needs a character code, got \"{}\"", args[0]))?;
    let c = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("{code} is not a valid character code"))?;
    Ok(TValue::Str(c.to_string()))
}

fn ord(args: &[TValue]) -> Result<TValue, String> {
    let code = args[0].to_string().chars().next().map_or(0, |c| c as i64);
    Ok(TValue::Int(code))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn hex2dec_str(input: &str) -> TValue {
        call("%hex2dec", &[TValue::str(input)]).unwrap()
    }

    #[test]
    fn test_hex2dec_with_strings() {
        let cases = [
            ("0", 0),
            ("1", 1),
            ("a", 10),
            ("f", 15),
            ("10", 16),
            ("ff", 255),
            ("ffff", 65535),
            (" ", 0),
            ("g", 0),
            ("-g", 0),
            ("\u{e0}", 0),
            ("-1", -1),
            ("-a", -10),
        ];
        for (input, expected) in cases {
            assert_eq!(hex2dec_str(input), TValue::Int(expected), "input {input:?}");
        }
    }

    #[test]
    fn test_hex2dec_with_integers() {
        for (input, expected) in [(0, 0), (1, 1), (10, 16), (-1, -1)] {
            assert_eq!(
                call("%hex2dec", &[TValue::Int(input)]).unwrap(),
                TValue::Int(expected)
            );
        }
    }

    #[test]
    fn test_hex2dec_without_argument() {
        assert_eq!(call("%hex2dec", &[]).unwrap(), TValue::Int(0));
    }

    #[test]
    fn test_dec2hex() {
        assert_eq!(
            call("%dec2hex", &[TValue::Int(255)]).unwrap(),
            TValue::str("ff")
        );
        assert_eq!(
            call("%dec2hex", &[TValue::Int(-10)]).unwrap(),
            TValue::str("-a")
        );
    }

    #[test]
    fn test_string_builtins() {
        let text = TValue::str("h\u{e9}llo");
        assert_eq!(call("%strlen", &[text.clone()]).unwrap(), TValue::Int(5));
        assert_eq!(
            call("%substr", &[text.clone(), TValue::Int(1), TValue::Int(3)]).unwrap(),
            TValue::str("\u{e9}ll")
        );
        assert_eq!(
            call("%strpos", &[text.clone(), TValue::str("lo")]).unwrap(),
            TValue::Int(3)
        );
        assert_eq!(
            call("%strpos", &[text, TValue::str("z")]).unwrap(),
            TValue::Int(-1)
        );
    }

    #[test]
    fn test_boolval() {
        assert_eq!(
            call("%boolval", &[TValue::str("TRUE")]).unwrap(),
            TValue::Int(1)
        );
        assert_eq!(call("%boolval", &[TValue::str("0")]).unwrap(), TValue::Int(0));
    }

    #[test]
    fn test_chr_and_ord() {
        assert_eq!(call("%chr", &[TValue::Int(65)]).unwrap(), TValue::str("A"));
        assert_eq!(call("%ord", &[TValue::str("A")]).unwrap(), TValue::Int(65));
        assert!(matches!(
            call("%chr", &[TValue::Int(-1)]),
            Err(BuiltinError::Invalid(_))
        ));
    }

    #[test]
    fn test_arity_and_unknown() {
        assert_eq!(
            call("%strlen", &[]),
            Err(BuiltinError::Arity {
                name: "%strlen",
                expected: "1",
                got: 0
            })
        );
        assert_eq!(call("%nope", &[]), Err(BuiltinError::Unknown));
        assert!(exists("%variable_exists"));
    }

    proptest! {
        #[test]
        fn dec2hex_then_hex2dec_is_identity(value in -1_000_000_000i64..1_000_000_000) {
            let hex = call("%dec2hex", &[TValue::Int(value)]).unwrap();
            prop_assert_eq!(call("%hex2dec", &[hex]).unwrap(), TValue::Int(value));
        }
    }
}
