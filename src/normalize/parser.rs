//! Tolerant object grammar.
//!
//! Accepts what JSON accepts plus single and typographic quotes, leading zeros, bare words,
//! trailing commas and missing commas between members. Keys are lowercased and inner spaces
//! become underscores. Parsing stops at the brace closing the first object.

use crate::normalize::error::ParseError;
use crate::normalize::lexer::{Lexer, Token};
use serde_json::{Map, Number, Value};

/// Deepest nesting of objects and arrays accepted, counting the outer object.
pub(crate) const MAX_DEPTH: usize = 32;

/// Parses the first `{...}` object embedded in `text`.
pub(crate) fn parse_first_object(text: &str) -> Result<Map<String, Value>, ParseError> {
    let start = text.find('{').ok_or(ParseError::NoObjectFound)?;
    let mut parser = Parser {
        lexer: Lexer::new(&text[start..]),
        base: start,
        depth: 0,
    };
    let (offset, token) = parser.expect("'{'")?;
    match token {
        Token::LBrace => parser.nested(offset, Parser::object),
        other => Err(parser.unexpected(offset, "'{'", &other)),
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    base: usize,
    depth: usize,
}

impl Parser<'_> {
    /// Runs `parse` one nesting level down, refusing to go past [`MAX_DEPTH`].
    fn nested<T>(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep {
                offset: self.base + offset,
                limit: MAX_DEPTH,
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect(&mut self, expected: &'static str) -> Result<(usize, Token), ParseError> {
        self.lexer
            .next_token()?
            .ok_or(ParseError::UnexpectedEnd { expected })
    }

    fn peek(&mut self, expected: &'static str) -> Result<Token, ParseError> {
        self.lexer
            .peek()?
            .map(|(_, token)| token.clone())
            .ok_or(ParseError::UnexpectedEnd { expected })
    }

    fn unexpected(&self, offset: usize, expected: &'static str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            offset: self.base + offset,
            expected,
            found: found.describe(),
        }
    }

    /// Members after the opening brace, up to and including the closing one.
    fn object(&mut self) -> Result<Map<String, Value>, ParseError> {
        let mut map = Map::new();
        loop {
            let (offset, token) = self.expect("a key or '}'")?;
            let key = match token {
                Token::RBrace => return Ok(map),
                Token::Comma => continue,
                Token::Word(word) => normalize_key(&self.phrase(word)?),
                Token::Str(s) | Token::Number(s) => normalize_key(&s),
                other => return Err(self.unexpected(offset, "a key or '}'", &other)),
            };

            let (offset, token) = self.expect("':'")?;
            if token != Token::Colon {
                return Err(self.unexpected(offset, "':'", &token));
            }

            let value = self.value()?;
            map.insert(key, value);
        }
    }

    fn array(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek("a value or ']'")? {
                Token::RBracket => {
                    self.expect("']'")?;
                    return Ok(items);
                }
                Token::Comma => {
                    self.expect("','")?;
                }
                _ => items.push(self.value()?),
            }
        }
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let (offset, token) = self.expect("a value")?;
        match token {
            Token::LBrace => self.nested(offset, Self::object).map(Value::Object),
            Token::LBracket => self.nested(offset, Self::array).map(Value::Array),
            Token::Str(s) => Ok(text_value(s)),
            Token::Number(raw) => number_value(&raw).ok_or_else(|| ParseError::UnexpectedToken {
                offset: self.base + offset,
                expected: "a number",
                found: raw,
            }),
            Token::Word(word) => self.phrase(word).map(word_value),
            other => Err(self.unexpected(offset, "a value", &other)),
        }
    }

    /// Adjacent bare words form one phrase, so `Big Island` reads as a single name.
    fn phrase(&mut self, first: String) -> Result<String, ParseError> {
        let mut phrase = first;
        loop {
            let continues = matches!(self.lexer.peek()?, Some((_, Token::Word(_))));
            if !continues {
                break;
            }
            if let Some((_, Token::Word(next))) = self.lexer.next_token()? {
                phrase.push(' ');
                phrase.push_str(&next);
            }
        }
        Ok(phrase)
    }
}

fn word_value(phrase: String) -> Value {
    match phrase.to_ascii_lowercase().as_str() {
        "none" | "null" | "nil" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(phrase),
    }
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Quoted `None` and `null` are read as absent; models quote them about as often as not.
fn text_value(text: String) -> Value {
    match text.trim().to_ascii_lowercase().as_str() {
        "none" | "null" => Value::Null,
        _ => Value::String(text),
    }
}

fn number_value(raw: &str) -> Option<Value> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Some(Value::Number(integer.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_python_style_literal() -> Result<(), ParseError> {
        let map = parse_first_object(
            "{'island':'Kauai','product_type':'rainfall', 'year':[2020,2020], 'month':[01,07], 'aggregation':'mean'}",
        )?;
        assert_eq!(
            Value::Object(map),
            json!({
                "island": "Kauai",
                "product_type": "rainfall",
                "year": [2020, 2020],
                "month": [1, 7],
                "aggregation": "mean",
            })
        );
        Ok(())
    }

    #[test]
    fn test_surrounding_prose_is_ignored() -> Result<(), ParseError> {
        let map = parse_first_object(
            "Sure! Here's the query:\n{\"year\": 2015, \"month\": None}\nLet me know if that's right.",
        )?;
        assert_eq!(Value::Object(map), json!({"year": 2015, "month": null}));
        Ok(())
    }

    #[test]
    fn test_trailing_and_missing_commas() -> Result<(), ParseError> {
        let map = parse_first_object("{'year': [2001, 2002,] 'month': 'None',}")?;
        assert_eq!(Value::Object(map), json!({"year": [2001, 2002], "month": null}));
        Ok(())
    }

    #[test]
    fn test_keys_are_lowercased_and_bare_words_join() -> Result<(), ParseError> {
        let map = parse_first_object("{Product Type: Rainfall, island: Big Island, flag: True}")?;
        assert_eq!(
            Value::Object(map),
            json!({"product_type": "Rainfall", "island": "Big Island", "flag": true})
        );
        Ok(())
    }

    #[test]
    fn test_missing_object() {
        assert!(matches!(
            parse_first_object("I could not work out a query."),
            Err(ParseError::NoObjectFound)
        ));
    }

    #[test]
    fn test_unclosed_object() {
        assert!(matches!(
            parse_first_object("{'year': 2020"),
            Err(ParseError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_nesting_up_to_the_limit_is_accepted() -> Result<(), ParseError> {
        let inner = MAX_DEPTH - 1;
        let text = format!("{{'year': {}2020{}}}", "[".repeat(inner), "]".repeat(inner));
        let map = parse_first_object(&text)?;
        let mut value = &map["year"];
        for _ in 0..inner {
            value = &value[0];
        }
        assert_eq!(value, &json!(2020));
        Ok(())
    }

    #[test]
    fn test_deep_nesting_is_rejected_without_recursing() {
        let prefix = "{'product_type': 'rainfall', 'year': ";
        let text = format!("{}{}", prefix, "[".repeat(200_000));
        let err = parse_first_object(&text).unwrap_err();
        let offset = prefix.len() + MAX_DEPTH - 1;
        assert!(
            matches!(err, ParseError::TooDeep { offset: o, limit: MAX_DEPTH } if o == offset),
            "{err:?}"
        );

        let objects = format!("{}{{'a': ", "{'a': ".repeat(5_000));
        assert!(matches!(
            parse_first_object(&objects),
            Err(ParseError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_offsets_are_relative_to_full_text() {
        let err = parse_first_object("ok {year 2020}").unwrap_err();
        assert!(
            matches!(err, ParseError::UnexpectedToken { offset: 9, expected: "':'", .. }),
            "{err:?}"
        );
    }
}
