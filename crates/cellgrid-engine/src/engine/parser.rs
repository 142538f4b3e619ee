//! Formula parser
//!
//! A recursive descent parser over the token stream from [`super::lexer`].
//! Precedence, lowest first:
//!
//! | level       | operators                 |
//! |-------------|---------------------------|
//! | ternary     | `c ? a : b` (right assoc) |
//! | or          | `\|\|`                    |
//! | and         | `&&`                      |
//! | equality    | `==` `!=`                 |
//! | comparison  | `<` `<=` `>` `>=`         |
//! | additive    | `+` `-`                   |
//! | multiplic.  | `*` `/` `%`               |
//! | unary       | `-` `+` `!`               |
//! | power       | `**` (right assoc)        |
//! | postfix     | `x[i]`                    |
//!
//! Identifiers are only valid as function names (`sum(...)`) or the literals
//! `true`, `false` and `null`.

use super::eval::EvalError;
use super::lexer::{Spanned, Token, tokenize};

/// Deepest nesting of sub-expressions and prefix operators a formula may use.
pub const MAX_NESTING_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Array(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuiting `&&` / `||`.
    Logical {
        and: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Parse formula text. A leading `=` is accepted and skipped.
pub fn parse_formula(formula: &str) -> Result<Expr, EvalError> {
    let body = formula.trim();
    let body = body.strip_prefix('=').unwrap_or(body);

    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(EvalError::Parse {
            pos: 0,
            message: "empty formula".into(),
        });
    }

    let mut parser = Parser {
        tokens,
        idx: 0,
        end: body.len(),
        depth: 0,
    };
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if let Some(extra) = parser.tokens.get(parser.idx) {
        return Err(EvalError::Parse {
            pos: extra.pos,
            message: format!("unexpected {:?} after expression", extra.token),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    idx: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx).map(|s| &s.token)
    }

    fn pos(&self) -> usize {
        self.tokens.get(self.idx).map(|s| s.pos).unwrap_or(self.end)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), EvalError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", token)))
        }
    }

    fn error(&self, message: String) -> EvalError {
        let found = match self.peek() {
            Some(t) => format!("{:?}", t),
            None => "end of formula".to_string(),
        };
        EvalError::Parse {
            pos: self.pos(),
            message: format!("{}, found {}", message, found),
        }
    }

    /// Count one more level of tree depth, failing past [`MAX_NESTING_DEPTH`].
    fn deepen(&mut self) -> Result<(), EvalError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::Parse {
                pos: self.pos(),
                message: "formula nested too deeply".into(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one nesting level deeper.
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_expression(&mut self) -> Result<Expr, EvalError> {
        self.nested(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr, EvalError> {
        let cond = self.parse_or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.parse_expression()?;
        self.expect(Token::Colon)?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    // Operator chains build left-deep trees, so every extra operand counts
    // as one level of depth until the chain ends.

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let base = self.depth;
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            self.deepen()?;
            let right = self.parse_and()?;
            left = Expr::Logical {
                and: false,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let base = self.depth;
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            self.deepen()?;
            let right = self.parse_equality()?;
            left = Expr::Logical {
                and: true,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    /// Left-associative binary level driven by a token -> operator table.
    fn parse_binary_level(
        &mut self,
        table: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let base = self.depth;
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in table {
                if self.eat(token) {
                    self.deepen()?;
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            self.depth = base;
            return Ok(left);
        }
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[
                (Token::EqualEqual, BinaryOp::Equal),
                (Token::NotEqual, BinaryOp::NotEqual),
            ],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[
                (Token::Less, BinaryOp::Less),
                (Token::LessEqual, BinaryOp::LessEqual),
                (Token::Greater, BinaryOp::Greater),
                (Token::GreaterEqual, BinaryOp::GreaterEqual),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[
                (Token::Plus, BinaryOp::Add),
                (Token::Minus, BinaryOp::Subtract),
            ],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[
                (Token::Star, BinaryOp::Multiply),
                (Token::Slash, BinaryOp::Divide),
                (Token::Percent, BinaryOp::Remainder),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        self.idx += 1;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_postfix()?;
        if self.eat(&Token::StarStar) {
            // Right-associative: 2 ** 3 ** 2 == 2 ** 9
            let exponent = self.nested(Self::parse_unary)?;
            return Ok(Expr::Binary {
                op: BinaryOp::Power,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::LeftBracket) {
            let index = self.parse_expression()?;
            self.expect(Token::RightBracket)?;
            expr = Expr::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("expected a value".into()));
        };
        match token {
            Token::Number(n) => {
                self.idx += 1;
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.idx += 1;
                Ok(Expr::Str(s))
            }
            Token::LeftParen => {
                self.idx += 1;
                let inner = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::LeftBracket => {
                self.idx += 1;
                let items = self.parse_list(Token::RightBracket)?;
                Ok(Expr::Array(items))
            }
            Token::Ident(name) => {
                let pos = self.pos();
                self.idx += 1;
                if self.eat(&Token::LeftParen) {
                    let args = self.parse_list(Token::RightParen)?;
                    return Ok(Expr::Call {
                        name: name.to_ascii_lowercase(),
                        args,
                    });
                }
                match name.as_str() {
                    "true" | "TRUE" => Ok(Expr::Bool(true)),
                    "false" | "FALSE" => Ok(Expr::Bool(false)),
                    "null" => Ok(Expr::Null),
                    _ => Err(EvalError::Parse {
                        pos,
                        message: format!("unknown identifier '{}'", name),
                    }),
                }
            }
            _ => Err(self.error("expected a value".into())),
        }
    }

    /// Comma separated expressions up to (and consuming) `close`.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if self.eat(&close) {
                return Ok(items);
            }
            self.expect(Token::Comma)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_formula("=1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Multiply,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_formula("2 ** 3 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Power,
                left: num(2.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Power,
                    left: num(3.0),
                    right: num(2.0),
                }),
            }
        );
    }

    #[test]
    fn test_call_names_are_lowercased() {
        let expr = parse_formula("=SUM(1, 2)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                name: "sum".into(),
                args: vec![Expr::Number(1.0), Expr::Number(2.0)],
            }
        );
    }

    #[test]
    fn test_ternary_nests() {
        let expr = parse_formula("a() ? 1 : b() ? 2 : 3").unwrap();
        let Expr::Conditional { otherwise, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*otherwise, Expr::Conditional { .. }));
    }

    #[test]
    fn test_bare_reference_is_rejected() {
        let err = parse_formula("=A1 * 2").unwrap_err();
        assert!(err.to_string().contains("unknown identifier 'A1'"));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse_formula("=1 2").is_err());
        assert!(parse_formula("=sum(1,").is_err());
        assert!(parse_formula("=").is_err());
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let shallow = format!("={}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse_formula(&shallow), Ok(Expr::Number(1.0)));

        let deep = format!("={}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse_formula(&deep).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));

        let negations = format!("={}1", "-".repeat(10_000));
        assert!(parse_formula(&negations).is_err());
        assert!(parse_formula(&format!("={}1", "!".repeat(50))).is_ok());

        let long_sum = format!("=1{}", " + 1".repeat(10_000));
        assert!(parse_formula(&long_sum).is_err());
        assert!(parse_formula(&format!("=1{}", " + 1".repeat(50))).is_ok());
    }

    #[test]
    fn test_array_and_index() {
        let expr = parse_formula("=[1, 2][0]").unwrap();
        assert!(matches!(expr, Expr::Index { .. }));
    }
}
