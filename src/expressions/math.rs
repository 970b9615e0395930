//! Recursive-descent arithmetic for $MATH[...] expressions.
//!
//! Grammar, by precedence:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '//' | '%') unary)*
//! unary   := ('+' | '-')? primary
//! primary := number | identifier | '(' expr ')'
//! ```
//!
//! Identifiers resolve through the property map and coerce to numbers.
//! Any failure (parse error, unknown identifier, division by zero) is
//! reported as `MathError` and the caller keeps the original text.

use crate::models::PropertyMap;

#[derive(Debug, Clone, PartialEq)]
pub enum MathError {
    UnexpectedCharacter(char),
    UnexpectedEnd,
    TrailingInput,
    UnknownIdentifier(String),
    DivisionByZero,
}

impl std::fmt::Display for MathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MathError::UnexpectedCharacter(ch) => write!(f, "unexpected character '{}'", ch),
            MathError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            MathError::TrailingInput => write!(f, "unexpected trailing input"),
            MathError::UnknownIdentifier(name) => write!(f, "unknown identifier '{}'", name),
            MathError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, MathError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    tokens.push(Token::SlashSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            c if c.is_ascii_digit() => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| MathError::UnexpectedCharacter(c))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Identifier(name));
            }
            c => return Err(MathError::UnexpectedCharacter(c)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    properties: &'a PropertyMap,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<f64, MathError> {
        let mut value = self.parse_term()?;
        loop {
            match self.current() {
                Some(Token::Plus) => {
                    self.advance();
                    value += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value -= self.parse_term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64, MathError> {
        let mut value = self.parse_unary()?;
        loop {
            match self.current() {
                Some(Token::Star) => {
                    self.advance();
                    value *= self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    let divisor = self.parse_unary()?;
                    if divisor == 0.0 {
                        return Err(MathError::DivisionByZero);
                    }
                    value /= divisor;
                }
                Some(Token::SlashSlash) => {
                    self.advance();
                    let divisor = self.parse_unary()?;
                    if divisor == 0.0 {
                        return Err(MathError::DivisionByZero);
                    }
                    value = (value / divisor).floor();
                }
                Some(Token::Percent) => {
                    self.advance();
                    let divisor = self.parse_unary()?;
                    if divisor == 0.0 {
                        return Err(MathError::DivisionByZero);
                    }
                    value = value.rem_euclid(divisor);
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<f64, MathError> {
        match self.current() {
            Some(Token::Minus) => {
                self.advance();
                Ok(-self.parse_primary()?)
            }
            Some(Token::Plus) => {
                self.advance();
                self.parse_primary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<f64, MathError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Identifier(name)) => {
                let raw = self
                    .properties
                    .get(&name)
                    .ok_or_else(|| MathError::UnknownIdentifier(name.clone()))?;
                raw.trim()
                    .parse::<f64>()
                    .map_err(|_| MathError::UnknownIdentifier(name))
            }
            Some(Token::LParen) => {
                let value = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(MathError::TrailingInput),
                    None => Err(MathError::UnexpectedEnd),
                }
            }
            Some(_) => Err(MathError::TrailingInput),
            None => Err(MathError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression against a property environment.
pub fn evaluate(expr: &str, properties: &PropertyMap) -> Result<String, MathError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(MathError::UnexpectedEnd);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        properties,
    };
    let value = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(MathError::TrailingInput);
    }

    Ok(format_number(value))
}

/// Integer results are formatted without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_basic_arithmetic() {
        let p = props(&[]);
        assert_eq!(evaluate("1 + 2 * 3", &p).unwrap(), "7");
        assert_eq!(evaluate("(1 + 2) * 3", &p).unwrap(), "9");
        assert_eq!(evaluate("10 - 4 - 3", &p).unwrap(), "3");
        assert_eq!(evaluate("-5 + 8", &p).unwrap(), "3");
    }

    #[test]
    fn test_division_forms() {
        let p = props(&[]);
        assert_eq!(evaluate("7 / 2", &p).unwrap(), "3.5");
        assert_eq!(evaluate("7 // 2", &p).unwrap(), "3");
        assert_eq!(evaluate("7 % 2", &p).unwrap(), "1");
        assert_eq!(evaluate("-7 % 2", &p).unwrap(), "1");
    }

    #[test]
    fn test_identifiers() {
        let p = props(&[("index", "3"), ("idprefix", "80")]);
        assert_eq!(evaluate("index * 100 + 50", &p).unwrap(), "350");
        assert_eq!(evaluate("idprefix + index", &p).unwrap(), "83");
    }

    #[test]
    fn test_suffixed_identifier() {
        let p = props(&[("width.2", "200")]);
        assert_eq!(evaluate("width.2 / 2", &p).unwrap(), "100");
    }

    #[test]
    fn test_errors() {
        let p = props(&[("text", "abc")]);
        assert_eq!(
            evaluate("missing + 1", &p),
            Err(MathError::UnknownIdentifier("missing".to_string()))
        );
        assert_eq!(
            evaluate("text + 1", &p),
            Err(MathError::UnknownIdentifier("text".to_string()))
        );
        assert_eq!(evaluate("1 / 0", &p), Err(MathError::DivisionByZero));
        assert_eq!(evaluate("1 +", &p), Err(MathError::UnexpectedEnd));
        assert_eq!(evaluate("1 1", &p), Err(MathError::TrailingInput));
        assert!(evaluate("@", &p).is_err());
    }

    #[test]
    fn test_integer_formatting() {
        let p = props(&[]);
        assert_eq!(evaluate("4 / 2", &p).unwrap(), "2");
        assert_eq!(evaluate("5 / 2", &p).unwrap(), "2.5");
    }
}
