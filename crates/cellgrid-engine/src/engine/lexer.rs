//! Formula tokenizer.

use super::eval::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Bang,
    Question,
    Colon,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    AndAnd,
    OrOr,
}

/// A token plus the byte offset it started at (for error messages).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, EvalError> {
    Lexer {
        input,
        chars: input.char_indices().collect(),
        idx: 0,
    }
    .run()
}

struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Spanned>, EvalError> {
        let mut out = Vec::new();
        while let Some((pos, c)) = self.peek() {
            if c.is_whitespace() {
                self.idx += 1;
                continue;
            }
            let token = self.scan(c, pos)?;
            out.push(Spanned { token, pos });
        }
        Ok(out)
    }

    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.idx).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.peek().map(|(p, _)| p).unwrap_or(self.input.len())
    }

    /// Consume `c` and, if the next char is `next`, that too.
    fn one_or_two(&mut self, next: char, single: Token, double: Token) -> Token {
        self.idx += 1;
        if self.peek_char_at(0) == Some(next) {
            self.idx += 1;
            double
        } else {
            single
        }
    }

    fn scan(&mut self, c: char, pos: usize) -> Result<Token, EvalError> {
        let token = match c {
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '/' => self.single(Token::Slash),
            '%' => self.single(Token::Percent),
            '?' => self.single(Token::Question),
            ':' => self.single(Token::Colon),
            ',' => self.single(Token::Comma),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            '*' => self.one_or_two('*', Token::Star, Token::StarStar),
            '<' => self.one_or_two('=', Token::Less, Token::LessEqual),
            '>' => self.one_or_two('=', Token::Greater, Token::GreaterEqual),
            '!' => {
                let token = self.one_or_two('=', Token::Bang, Token::NotEqual);
                // `!==` is the same as `!=`.
                if token == Token::NotEqual && self.peek_char_at(0) == Some('=') {
                    self.idx += 1;
                }
                token
            }
            '=' => {
                if self.peek_char_at(1) != Some('=') {
                    return Err(EvalError::Parse {
                        pos,
                        message: "assignment is not supported, use '=='".into(),
                    });
                }
                self.idx += 2;
                if self.peek_char_at(0) == Some('=') {
                    self.idx += 1;
                }
                Token::EqualEqual
            }
            '&' => self.pair('&', Token::AndAnd, pos)?,
            '|' => self.pair('|', Token::OrOr, pos)?,
            '"' | '\'' => self.scan_string(c, pos)?,
            c if c.is_ascii_digit() => self.scan_number(pos)?,
            '.' if self.peek_char_at(1).is_some_and(|n| n.is_ascii_digit()) => {
                self.scan_number(pos)?
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_ident(),
            other => {
                return Err(EvalError::Parse {
                    pos,
                    message: format!("unexpected character '{}'", other),
                });
            }
        };
        Ok(token)
    }

    fn single(&mut self, token: Token) -> Token {
        self.idx += 1;
        token
    }

    fn pair(&mut self, c: char, token: Token, pos: usize) -> Result<Token, EvalError> {
        if self.peek_char_at(1) == Some(c) {
            self.idx += 2;
            Ok(token)
        } else {
            Err(EvalError::Parse {
                pos,
                message: format!("unexpected character '{}'", c),
            })
        }
    }

    fn scan_string(&mut self, quote: char, pos: usize) -> Result<Token, EvalError> {
        self.idx += 1; // Skip opening quote
        let mut s = String::new();
        while let Some((_, c)) = self.peek() {
            self.idx += 1;
            match c {
                '\\' => {
                    let Some((_, escaped)) = self.peek() else {
                        break;
                    };
                    self.idx += 1;
                    s.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Ok(Token::Str(s)),
                c => s.push(c),
            }
        }
        Err(EvalError::Parse {
            pos,
            message: "unterminated string literal".into(),
        })
    }

    fn scan_number(&mut self, pos: usize) -> Result<Token, EvalError> {
        let start = self.offset();
        while self.peek_char_at(0).is_some_and(|c| c.is_ascii_digit()) {
            self.idx += 1;
        }
        if self.peek_char_at(0) == Some('.') {
            self.idx += 1;
            while self.peek_char_at(0).is_some_and(|c| c.is_ascii_digit()) {
                self.idx += 1;
            }
        }
        if self.peek_char_at(0).is_some_and(|c| c == 'e' || c == 'E') {
            let sign = self.peek_char_at(1).is_some_and(|c| c == '+' || c == '-');
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_char_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.idx += digit_at;
                while self.peek_char_at(0).is_some_and(|c| c.is_ascii_digit()) {
                    self.idx += 1;
                }
            }
        }
        let text = &self.input[start..self.offset()];
        text.parse::<f64>().map(Token::Number).map_err(|_| EvalError::Parse {
            pos,
            message: format!("invalid number '{}'", text),
        })
    }

    fn scan_ident(&mut self) -> Token {
        let start = self.offset();
        while self
            .peek_char_at(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.idx += 1;
        }
        Token::Ident(self.input[start..self.offset()].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("1 ** 2 >= 3 && !x"),
            vec![
                Token::Number(1.0),
                Token::StarStar,
                Token::Number(2.0),
                Token::GreaterEqual,
                Token::Number(3.0),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_strict_equality_collapses() {
        assert_eq!(tokens("a === b"), tokens("a == b"));
        assert_eq!(tokens("a !== b"), tokens("a != b"));
    }

    #[test]
    fn test_strings_both_quotes() {
        assert_eq!(
            tokens(r#"cell("A1") + cell('B2')"#),
            vec![
                Token::Ident("cell".into()),
                Token::LeftParen,
                Token::Str("A1".into()),
                Token::RightParen,
                Token::Plus,
                Token::Ident("cell".into()),
                Token::LeftParen,
                Token::Str("B2".into()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(tokens(".5 2e3 1.25"), vec![
            Token::Number(0.5),
            Token::Number(2000.0),
            Token::Number(1.25),
        ]);
    }

    #[test]
    fn test_single_equals_rejected() {
        assert!(tokenize("a = 1").is_err());
        assert!(tokenize("\"open").is_err());
        assert!(tokenize("1 # 2").is_err());
    }
}
