//! Tokenizer for the loosely formatted object literals language models produce.
//!
//! Tokens are produced on demand, so prose after the closing brace (which routinely contains
//! apostrophes) is never looked at.

use crate::normalize::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    /// Quoted text with escapes resolved.
    Str(String),
    /// Numeric literal as written, e.g. `07` or `-1.5e3`.
    Number(String),
    /// Bare identifier such as `None`, `true` or an unquoted word.
    Word(String),
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Str(s) => format!("string \"{s}\""),
            Token::Number(n) => format!("number {n}"),
            Token::Word(w) => format!("word {w}"),
        }
    }
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    peeked: Option<(usize, Token)>,
}

impl<'a> Lexer<'a> {
    /// Lexes `src`; offsets in tokens and errors are relative to its start.
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            peeked: None,
        }
    }

    pub(crate) fn peek(&mut self) -> Result<Option<&(usize, Token)>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = self.lex()?;
        }
        Ok(self.peeked.as_ref())
    }

    pub(crate) fn next_token(&mut self) -> Result<Option<(usize, Token)>, ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.lex(),
        }
    }

    fn current(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn lex(&mut self) -> Result<Option<(usize, Token)>, ParseError> {
        while self.current().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let start = self.pos;
        let Some(c) = self.current() else {
            return Ok(None);
        };

        let token = match c {
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            ':' => self.single(Token::Colon),
            ',' => self.single(Token::Comma),
            c if quote_family(c).is_some() => self.string(start)?,
            c if c.is_ascii_digit() => self.number(),
            '-' | '+' | '.' if self.next_is_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.word(),
            found => {
                return Err(ParseError::UnexpectedChar {
                    offset: start,
                    found,
                })
            }
        };
        Ok(Some((start, token)))
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn next_is_digit(&self) -> bool {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next().is_some_and(|c| c.is_ascii_digit())
    }

    fn number(&mut self) -> Token {
        let start = self.pos;
        let mut previous = None;
        while let Some(c) = self.current() {
            let sign_after_exponent = matches!(c, '-' | '+') && matches!(previous, Some('e' | 'E'));
            let leading_sign = matches!(c, '-' | '+') && self.pos == start;
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') || sign_after_exponent || leading_sign {
                previous = Some(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::Number(self.src[start..self.pos].to_string())
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        while self
            .current()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.bump();
        }
        Token::Word(self.src[start..self.pos].to_string())
    }

    /// A quote only closes the string when what follows could continue the object, so
    /// apostrophes inside single-quoted names survive.
    fn string(&mut self, start: usize) -> Result<Token, ParseError> {
        let family = self.bump().and_then(quote_family);
        let mut text = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ParseError::UnterminatedString { offset: start });
            };
            match c {
                '\\' => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(escaped) => text.push(escaped),
                    None => return Err(ParseError::UnterminatedString { offset: start }),
                },
                c if quote_family(c) == family && self.at_value_end() => break,
                c => text.push(c),
            }
        }
        Ok(Token::Str(text))
    }

    fn at_value_end(&self) -> bool {
        self.src[self.pos..]
            .chars()
            .find(|c| !c.is_whitespace())
            .map_or(true, |c| matches!(c, ',' | ':' | '}' | ']'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteFamily {
    Single,
    Double,
}

fn quote_family(c: char) -> Option<QuoteFamily> {
    match c {
        '\'' | '‘' | '’' => Some(QuoteFamily::Single),
        '"' | '“' | '”' => Some(QuoteFamily::Double),
        _ => None,
    }
}
