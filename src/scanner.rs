//! The scanner lifts lexer tokens into runtime objects.
//!
//! `{ … }` folds recursively into executable arrays, `//name` resolves
//! against the dictionary stack at scan time, and the structural delimiters
//! `[ ] << >>` come through as executable names bound to operators. The
//! scanner also performs the DSC metadata pre-scan that yields the EPS
//! bounding box.

use anyhow::anyhow;

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    lexer::{parse_number, Lexer, Number, Token, TokenKind},
    object::{Name, Object, Value},
};

/// Reads the next object from `lexer`, or `None` at end of input
pub(crate) fn scan_object(
    interp: &mut Interpreter,
    lexer: &mut Lexer,
) -> PsResult<Option<Object>> {
    match next_significant_token(lexer)? {
        Some(token) => Ok(Some(scan_token(interp, lexer, token)?)),
        None => Ok(None),
    }
}

/// The next non-comment token
fn next_significant_token(lexer: &mut Lexer) -> PsResult<Option<Token>> {
    loop {
        match lexer.next_token()? {
            Some(token) if token.kind == TokenKind::Comment => continue,
            other => return Ok(other),
        }
    }
}

fn scan_token(interp: &mut Interpreter, lexer: &mut Lexer, token: Token) -> PsResult<Object> {
    Ok(match token.kind {
        // callers filter comments
        TokenKind::Comment => {
            return Err(anyhow!(PostScriptError::SyntaxError {
                span: Some(token.span),
            }))
        }
        TokenKind::Number => match parse_number(&token.content) {
            Some(Number::Integer(n)) => Object::integer(n),
            Some(Number::Real(r)) => Object::real(r),
            None => {
                return Err(anyhow!(PostScriptError::SyntaxError {
                    span: Some(token.span),
                }))
            }
        },
        TokenKind::Name => Object::executable_name(Name::from_bytes(token.content)),
        TokenKind::LiteralName => Object::literal_name(Name::from_bytes(token.content)),
        TokenKind::ImmediatelyEvaluatedName => {
            let name = Name::from_bytes(token.content);
            interp.symbol_lookup(&name)?
        }
        TokenKind::String => {
            let slice = interp.new_string(token.content);
            Object::literal(Value::String(slice))
        }
        TokenKind::ProcedureOpen => scan_procedure(interp, lexer, token)?,
        // an unmatched closing brace cannot be lifted into an object
        TokenKind::ProcedureClose => {
            return Err(anyhow!(PostScriptError::SyntaxError {
                span: Some(token.span),
            }))
        }
        TokenKind::ArrayOpen => Object::executable_name(Name::new("[")),
        TokenKind::ArrayClose => Object::executable_name(Name::new("]")),
        TokenKind::DictionaryOpen => Object::executable_name(Name::new("<<")),
        TokenKind::DictionaryClose => Object::executable_name(Name::new(">>")),
    })
}

/// Folds tokens up to the matching `}` into an executable array. Nested
/// procedures become nested executable array elements
fn scan_procedure(interp: &mut Interpreter, lexer: &mut Lexer, open: Token) -> PsResult<Object> {
    let mut elements = Vec::new();

    loop {
        let token = match next_significant_token(lexer)? {
            Some(token) => token,
            None => {
                return Err(anyhow!(PostScriptError::SyntaxError {
                    span: Some(open.span),
                }))
            }
        };

        if token.kind == TokenKind::ProcedureClose {
            break;
        }

        elements.push(scan_token(interp, lexer, token)?);
    }

    let slice = interp.new_array(elements);

    Ok(Object::executable(Value::Array(slice)))
}

/// EPS bounding box in PostScript user space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub lower_left_x: i64,
    pub lower_left_y: i64,
    pub upper_right_x: i64,
    pub upper_right_y: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub bounding_box: Option<BoundingBox>,
}

/// Walks the leading DSC comment block: `%%BoundingBox: llx lly urx ury`
/// populates the bounding box, `%%EndComments` (or the first non-comment
/// token) ends the sweep
pub(crate) fn scan_document_metadata(source: &[u8]) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::default();
    let mut lexer = Lexer::new(source.to_vec());

    loop {
        let token = match lexer.next_token() {
            Ok(Some(token)) => token,
            // a lex error this early is the program's problem, not the
            // metadata sweep's
            Ok(None) | Err(..) => break,
        };

        if token.kind != TokenKind::Comment {
            break;
        }

        // the lexer consumed the first `%`, so a DSC pragma starts `%Name:`
        let content = token.content.strip_prefix(b"%").unwrap_or(&token.content);

        if content == b"EndComments" {
            break;
        }

        if let Some(rest) = content.strip_prefix(b"BoundingBox:") {
            match parse_bounding_box(rest) {
                Some(bbox) => metadata.bounding_box = Some(bbox),
                None => log::warn!(
                    "ignoring malformed %%BoundingBox: {:?}",
                    String::from_utf8_lossy(rest)
                ),
            }
        }
    }

    metadata
}

fn parse_bounding_box(rest: &[u8]) -> Option<BoundingBox> {
    let rest = std::str::from_utf8(rest).ok()?;
    let mut coords = rest
        .split_ascii_whitespace()
        .map(|word| word.parse::<i64>());

    let bbox = BoundingBox {
        lower_left_x: coords.next()?.ok()?,
        lower_left_y: coords.next()?.ok()?,
        upper_right_x: coords.next()?.ok()?,
        upper_right_y: coords.next()?.ok()?,
    };

    coords.next().is_none().then_some(bbox)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounding_box_from_leading_comments() {
        let metadata = scan_document_metadata(
            b"%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 612 792\n%%EndComments\n1 2 add\n",
        );

        assert_eq!(
            metadata.bounding_box,
            Some(BoundingBox {
                lower_left_x: 0,
                lower_left_y: 0,
                upper_right_x: 612,
                upper_right_y: 792,
            })
        );
    }

    #[test]
    fn sweep_stops_at_first_non_comment() {
        let metadata =
            scan_document_metadata(b"%!PS-Adobe-3.0\n1 2 add\n%%BoundingBox: 0 0 10 10\n");

        assert_eq!(metadata.bounding_box, None);
    }

    #[test]
    fn sweep_stops_at_end_comments() {
        let metadata = scan_document_metadata(
            b"%!PS\n%%EndComments\n%%BoundingBox: 0 0 10 10\n",
        );

        assert_eq!(metadata.bounding_box, None);
    }

    #[test]
    fn malformed_bounding_box_is_ignored() {
        let metadata = scan_document_metadata(b"%%BoundingBox: (atend)\n%%EndComments\n");

        assert_eq!(metadata.bounding_box, None);
    }

    #[test]
    fn negative_coordinates_parse() {
        let metadata = scan_document_metadata(b"%%BoundingBox: -4 -8 15 16\n");

        let bbox = metadata.bounding_box.unwrap();
        assert_eq!(bbox.lower_left_x, -4);
        assert_eq!(bbox.lower_left_y, -8);
    }
}
