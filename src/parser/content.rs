//! Content-stream tokenizer (spec.md §4.B "iterator mode"): the same lexical grammar as the
//! document-mode parser, except a bare keyword that isn't `true`/`false`/`null` is an operator
//! token (`Operation`) rather than a parse error. Reuses the document-mode combinators for every
//! construct that doesn't differ between the two modes (strings, names, numbers, arrays, dicts).

use super::{direct_objects, is_regular, space, Span};
use crate::content::Operation;
use crate::error::{Error, Result};
use crate::object::Object;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::combinator::map;
use nom::{IResult, Parser};

enum Token {
    Operand(Object),
    Operator(String),
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((
        map(direct_objects, Token::Operand),
        map(take_while1(is_regular), |s: Span| Token::Operator(String::from_utf8_lossy(s.fragment()).into_owned())),
    ))
    .parse(input)
}

/// Lexes and groups a content stream's post-filter bytes into `(operands*, operator)` pairs
/// (spec.md §4.G "Execution model"). Trailing bytes that don't form a complete token are
/// tolerated and dropped, matching the crate's general leniency toward malformed tails.
pub fn operations(input: &[u8]) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();
    let mut operands: Vec<Object> = Vec::new();
    let mut rest = Span::new(input);

    loop {
        let (next, _) = space(rest).map_err(|_| Error::Parse { offset: rest.location_offset() })?;
        rest = next;
        if rest.fragment().is_empty() {
            break;
        }
        match token(rest) {
            Ok((next, Token::Operand(obj))) => {
                operands.push(obj);
                rest = next;
            }
            Ok((next, Token::Operator(op))) => {
                ops.push(Operation { operator: op, operands: std::mem::take(&mut operands) });
                rest = next;
            }
            Err(_) => break,
        }
    }

    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_operands_before_each_operator() {
        let ops = operations(b"q 2 w Q").unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].operator, "q");
        assert!(ops[0].operands.is_empty());
        assert_eq!(ops[1].operator, "w");
        assert_eq!(ops[1].operands[0].as_f32().unwrap_or_else(|_| ops[1].operands[0].as_i64().unwrap() as f32), 2.0);
        assert_eq!(ops[2].operator, "Q");
    }

    #[test]
    fn bt_tj_et_sequence() {
        let ops = operations(b"BT /F1 12 Tf 100 200 Td (Hello) Tj ET").unwrap();
        let operators: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(operators, vec!["BT", "Tf", "Td", "Tj", "ET"]);
        assert_eq!(ops[1].operands[0].as_name().unwrap(), b"F1");
    }

    #[test]
    fn array_operand_for_tj() {
        let ops = operations(b"[(Hello) -250 (World)] TJ").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operator, "TJ");
        let arr = ops[0].operands[0].as_array().unwrap();
        assert_eq!(arr.len(), 3);
    }
}
