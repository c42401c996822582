//! Output expressions: arithmetic over the input oscillator, constants,
//! stage values and earlier outputs.
//!
//! Expressions can be built with operator overloading or parsed from text:
//!
//! ```
//! use clocktree::Expr;
//!
//! let built = Expr::input() / Expr::var("M") * Expr::var("N");
//! let parsed: Expr = "input / M * N".parse().unwrap();
//! assert_eq!(built, parsed);
//! ```
//!
//! Grammar (left associative, `* /` bind tighter than `+ -`):
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := "-" unary | primary
//! primary := NUMBER | IDENT | "(" expr ")"
//! ```
//!
//! `input` is reserved for the oscillator frequency; every other identifier
//! names a stage or an output declared earlier in the tree.

use core::fmt;
use core::ops::{Add, Div, Mul, Range, Sub};
use core::str::FromStr;

use logos::Logos;
use num_traits::CheckedDiv;

use crate::error::ConfigError;
use crate::Rational;

/// Reserved identifier for the input oscillator frequency.
pub const INPUT: &str = "input";

/// An output expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// The input oscillator frequency.
    Input,
    /// An exact constant.
    Const(Rational),
    /// A stage value or a previously declared output, resolved at build time.
    Var(String),
    /// Sum.
    Add(Box<Expr>, Box<Expr>),
    /// Difference.
    Sub(Box<Expr>, Box<Expr>),
    /// Product.
    Mul(Box<Expr>, Box<Expr>),
    /// Quotient.
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// The input oscillator.
    pub fn input() -> Self {
        Self::Input
    }

    /// A named stage or output.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    /// An integer constant.
    pub fn int(value: i64) -> Self {
        Self::Const(Rational::from_integer(value))
    }

    /// An exact constant.
    pub fn constant(value: impl Into<Rational>) -> Self {
        Self::Const(value.into())
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Add(..) | Self::Sub(..) => 1,
            Self::Mul(..) | Self::Div(..) => 2,
            Self::Input | Self::Const(_) | Self::Var(_) => 3,
        }
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Const(Rational::from_integer(value))
    }
}

impl From<Rational> for Expr {
    fn from(value: Rational) -> Self {
        Self::Const(value)
    }
}

macro_rules! expr_binop {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(Box::new(self), Box::new(rhs))
            }
        }
    };
}

expr_binop!(Add, add, Add);
expr_binop!(Sub, sub, Sub);
expr_binop!(Mul, mul, Mul);
expr_binop!(Div, div, Div);

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lhs, op, rhs) = match self {
            Self::Input => return f.write_str(INPUT),
            Self::Var(name) => return f.write_str(name),
            Self::Const(c) if c.is_integer() => return write!(f, "{}", c.numer()),
            Self::Const(c) => return write!(f, "({}/{})", c.numer(), c.denom()),
            Self::Add(l, r) => (l, "+", r),
            Self::Sub(l, r) => (l, "-", r),
            Self::Mul(l, r) => (l, "*", r),
            Self::Div(l, r) => (l, "/", r),
        };
        let prec = self.precedence();
        if lhs.precedence() < prec {
            write!(f, "({lhs})")?;
        } else {
            write!(f, "{lhs}")?;
        }
        write!(f, " {op} ")?;
        // Right operand of a left-associative operator needs parentheses at
        // equal precedence too: a - (b - c), a / (b * c).
        if rhs.precedence() <= prec {
            write!(f, "({rhs})")
        } else {
            write!(f, "{rhs}")
        }
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Parse an exact rational from `"180000000"`, `"35156.25"`, `"-0.5"` or
/// `"1000000/3"`.
///
/// # Errors
///
/// [`ConfigError::Parse`] for malformed text, a zero denominator, or a value
/// that does not fit a 64-bit rational.
pub fn parse_rational(text: &str) -> Result<Rational, ConfigError> {
    let fail = |reason: &str| ConfigError::Parse { text: text.to_owned(), reason: reason.to_owned() };
    let trimmed = text.trim();
    match trimmed.split_once('/') {
        Some((num, den)) => {
            let num = parse_decimal(num.trim()).ok_or_else(|| fail("bad numerator"))?;
            let den = parse_decimal(den.trim()).ok_or_else(|| fail("bad denominator"))?;
            if den == Rational::from_integer(0) {
                return Err(fail("zero denominator"));
            }
            num.checked_div(&den).ok_or_else(|| fail("out of range"))
        }
        None => parse_decimal(trimmed).ok_or_else(|| fail("not a decimal number")),
    }
}

fn parse_decimal(text: &str) -> Option<Rational> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut numer: i64 = 0;
    for b in int_part.bytes().chain(frac_part.bytes()) {
        numer = numer.checked_mul(10)?.checked_add(i64::from(b - b'0'))?;
    }
    let exp = u32::try_from(frac_part.len()).ok()?;
    let denom = 10i64.checked_pow(exp)?;
    let value = Rational::new(numer, denom);
    Some(if negative { -value } else { value })
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_owned())]
    Number(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Result<Self, ConfigError> {
        let mut tokens = Vec::new();
        for (token, span) in Token::lexer(text).spanned() {
            match token {
                Ok(token) => tokens.push((token, span)),
                Err(()) => {
                    return Err(ConfigError::Parse {
                        text: text.to_owned(),
                        reason: format!("unexpected character at offset {}", span.start),
                    })
                }
            }
        }
        Ok(Self { text, tokens, pos: 0 })
    }

    fn error(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Parse { text: self.text.to_owned(), reason: reason.into() }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos = self.pos.saturating_add(1);
        }
        token
    }

    fn parse(mut self) -> Result<Expr, ConfigError> {
        let expr = self.expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some((_, span)) => Err(self.error(format!("trailing input at offset {}", span.start))),
        }
    }

    fn expr(&mut self) -> Result<Expr, ConfigError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.next();
                    lhs = lhs + self.term()?;
                }
                Some(Token::Minus) => {
                    self.next();
                    lhs = lhs - self.term()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ConfigError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.next();
                    lhs = lhs * self.unary()?;
                }
                Some(Token::Slash) => {
                    self.next();
                    lhs = lhs / self.unary()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ConfigError> {
        if self.peek() == Some(&Token::Minus) {
            self.next();
            return Ok(Expr::int(0) - self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ConfigError> {
        match self.next() {
            Some(Token::Number(text)) => parse_rational(&text).map(Expr::Const),
            Some(Token::Ident(name)) if name == INPUT => Ok(Expr::Input),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("expected ')'")),
                }
            }
            Some(other) => Err(self.error(format!("unexpected token {other:?}"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

impl FromStr for Expr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s)?.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n, d)
    }

    #[test]
    fn parses_integers_decimals_and_fractions() {
        assert_eq!(parse_rational("180000000").unwrap(), r(180_000_000, 1));
        assert_eq!(parse_rational("35156.25").unwrap(), r(140_625, 4));
        assert_eq!(parse_rational(" 1000000/3 ").unwrap(), r(1_000_000, 3));
        assert_eq!(parse_rational("-0.5").unwrap(), r(-1, 2));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(parse_rational("").is_err());
        assert!(parse_rational("12a").is_err());
        assert!(parse_rational("1/0").is_err());
        assert!(parse_rational("99999999999999999999").is_err());
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e: Expr = "2 * div + odd".parse().unwrap();
        assert_eq!(e, Expr::int(2) * Expr::var("div") + Expr::var("odd"));
    }

    #[test]
    fn division_is_left_associative() {
        let e: Expr = "input / M / P".parse().unwrap();
        assert_eq!(e, Expr::input() / Expr::var("M") / Expr::var("P"));
    }

    #[test]
    fn parentheses_and_unary_minus() {
        let e: Expr = "clk / (256 * (2*div + odd))".parse().unwrap();
        let expected = Expr::var("clk")
            / (Expr::int(256) * (Expr::int(2) * Expr::var("div") + Expr::var("odd")));
        assert_eq!(e, expected);

        let neg: Expr = "-M".parse().unwrap();
        assert_eq!(neg, Expr::int(0) - Expr::var("M"));
    }

    #[test]
    fn parse_errors_name_the_problem() {
        for bad in ["", "input /", "(M", "M N", "M $ N", ")"] {
            let err = bad.parse::<Expr>().unwrap_err();
            assert!(matches!(err, ConfigError::Parse { .. }), "{bad:?} gave {err:?}");
        }
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        for text in [
            "input / M * N",
            "vco / (P * AHB)",
            "mckoe * 256 + (1 - mckoe) * 2 * chlen",
            "a - (b - c)",
        ] {
            let e: Expr = text.parse().unwrap();
            assert_eq!(e.to_string(), text);
            assert_eq!(e.to_string().parse::<Expr>().unwrap(), e);
        }
    }

    #[test]
    fn fractional_constants_display_as_fractions() {
        let e = Expr::input() * Expr::constant(r(1, 3));
        assert_eq!(e.to_string(), "input * (1/3)");
        assert_eq!(e.to_string().parse::<Expr>().unwrap().to_string(), "input * (1 / 3)");
    }
}
