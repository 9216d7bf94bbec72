//! Rule expressions for the tag linter (made by FontLab https://www.fontlab.com/)
//!
//! A rule is a small boolean expression over a font's static tag scores and
//! its family name:
//!
//! ```text
//! tags["/Expressive/Loud"] > 80 && family == "Roboto"
//! !(tags["/Purpose/Easy Reading"] >= 50) || family in ["Inter" "Lato"]
//! tags["/Serif/Slab"] && family =~ "^Noto"
//! ```
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr        := and ( "||" and )*
//! and         := unary ( "&&" unary )*
//! unary       := "!" unary | primary
//! primary     := "(" expr ")" | "true" | "false" | family_test | score_test
//! family_test := "family" ( "==" | "!=" ) string
//!              | "family" "in" "[" string ( ","? string )* "]"
//!              | "family" "=~" string
//! score_test  := operand ( cmp operand )?
//! operand     := "tags" "[" string "]" | number
//! cmp         := ">" | ">=" | "<" | "<=" | "==" | "!="
//! ```
//!
//! A bare `tags["..."]` tests whether the font has a static score for that
//! tag. A tag the font does not have is "not present": every comparison it
//! takes part in is false, including `!=`. Evaluation never fails.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::ParseError;
use crate::tagging::Font;

/// Scores and family identity a rule is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct RuleContext<'a> {
    scores: HashMap<&'a str, f32>,
    family: &'a str,
}

impl<'a> RuleContext<'a> {
    pub fn new(family: &'a str) -> Self {
        Self {
            scores: HashMap::new(),
            family,
        }
    }

    pub fn with_score(mut self, tag: &'a str, score: f32) -> Self {
        self.scores.insert(tag, score);
        self
    }

    /// Context built from the font's static taggings.
    pub fn for_font(font: &'a Font) -> Self {
        Self {
            scores: font.static_scores(),
            family: &font.name,
        }
    }

    pub fn score(&self, tag: &str) -> Option<f32> {
        self.scores.get(tag).copied()
    }

    pub fn family(&self) -> &str {
        self.family
    }
}

/// A compiled rule expression.
#[derive(Debug, Clone)]
pub struct Rule {
    source: String,
    expr: Expr,
}

impl Rule {
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
            depth: 0,
        };
        let expr = parser.expr()?;
        if let Some(extra) = parser.peek() {
            return Err(ParseError::new(
                extra.offset,
                format!("unexpected {}", extra.token),
            ));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> bool {
        self.expr.eval(ctx)
    }
}

/// Compile and evaluate in one step.
pub fn evaluate(source: &str, ctx: &RuleContext<'_>) -> Result<bool, ParseError> {
    Ok(Rule::compile(source)?.evaluate(ctx))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl CmpOp {
    fn apply(self, lhs: f32, rhs: f32) -> bool {
        match self {
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Score(String),
    Number(f32),
}

impl Operand {
    fn resolve(&self, ctx: &RuleContext<'_>) -> Option<f32> {
        match self {
            Operand::Score(tag) => ctx.score(tag),
            Operand::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(bool),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Present(String),
    Compare {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
    FamilyEq(String),
    FamilyIn(Vec<String>),
    FamilyMatches(Regex),
}

impl Expr {
    fn eval(&self, ctx: &RuleContext<'_>) -> bool {
        match self {
            Expr::Literal(value) => *value,
            Expr::Not(inner) => !inner.eval(ctx),
            Expr::And(terms) => terms.iter().all(|t| t.eval(ctx)),
            Expr::Or(terms) => terms.iter().any(|t| t.eval(ctx)),
            Expr::Present(tag) => ctx.score(tag).is_some(),
            Expr::Compare { lhs, op, rhs } => match (lhs.resolve(ctx), rhs.resolve(ctx)) {
                (Some(l), Some(r)) => op.apply(l, r),
                _ => false,
            },
            Expr::FamilyEq(name) => ctx.family() == name,
            Expr::FamilyIn(names) => names.iter().any(|n| n == ctx.family()),
            Expr::FamilyMatches(re) => re.is_match(ctx.family()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(f32),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Bang,
    AndAnd,
    OrOr,
    Cmp(CmpOp),
    Matches,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier `{name}`"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::LBracket => f.write_str("`[`"),
            Token::RBracket => f.write_str("`]`"),
            Token::Comma => f.write_str("`,`"),
            Token::Bang => f.write_str("`!`"),
            Token::AndAnd => f.write_str("`&&`"),
            Token::OrOr => f.write_str("`||`"),
            Token::Cmp(op) => write!(f, "`{}`", op.symbol()),
            Token::Matches => f.write_str("`=~`"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            chars.next();
            tokens.push(Spanned { token, offset });
            continue;
        }

        let token = match ch {
            '!' | '=' | '<' | '>' | '&' | '|' => {
                chars.next();
                let next = chars.peek().map(|&(_, c)| c);
                let (token, wide) = match (ch, next) {
                    ('!', Some('=')) => (Token::Cmp(CmpOp::Ne), true),
                    ('!', _) => (Token::Bang, false),
                    ('=', Some('=')) => (Token::Cmp(CmpOp::Eq), true),
                    ('=', Some('~')) => (Token::Matches, true),
                    ('<', Some('=')) => (Token::Cmp(CmpOp::Le), true),
                    ('<', _) => (Token::Cmp(CmpOp::Lt), false),
                    ('>', Some('=')) => (Token::Cmp(CmpOp::Ge), true),
                    ('>', _) => (Token::Cmp(CmpOp::Gt), false),
                    ('&', Some('&')) => (Token::AndAnd, true),
                    ('|', Some('|')) => (Token::OrOr, true),
                    ('=', _) => return Err(ParseError::new(offset, "expected `==` or `=~`")),
                    ('&', _) => return Err(ParseError::new(offset, "expected `&&`")),
                    _ => return Err(ParseError::new(offset, "expected `||`")),
                };
                if wide {
                    chars.next();
                }
                token
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == ch {
                        closed = true;
                        break;
                    }
                    if c == '\\' {
                        match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        }
                    } else {
                        value.push(c);
                    }
                }
                if !closed {
                    return Err(ParseError::new(offset, "unterminated string"));
                }
                Token::Str(value)
            }
            c if starts_number(c, src, offset) => {
                let mut end = offset + c.len_utf8();
                chars.next();
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &src[offset..end];
                let value: f32 = text
                    .parse()
                    .map_err(|_| ParseError::new(offset, format!("invalid number `{text}`")))?;
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = offset + c.len_utf8();
                chars.next();
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(src[offset..end].to_string())
            }
            other => {
                return Err(ParseError::new(
                    offset,
                    format!("unexpected character `{other}`"),
                ))
            }
        };
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

// Digits, or a sign / decimal point directly followed by one.
fn starts_number(c: char, src: &str, offset: usize) -> bool {
    if c.is_ascii_digit() {
        return true;
    }
    if !matches!(c, '-' | '+' | '.') {
        return false;
    }
    src[offset + 1..]
        .chars()
        .next()
        .is_some_and(|next| next.is_ascii_digit() || (c != '.' && next == '.'))
}

/// Deepest `(` / `!` nesting a rule may use.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.peek().map(|s| s.offset).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(found) => ParseError::new(
                found.offset,
                format!("expected {expected}, found {}", found.token),
            ),
            None => ParseError::new(self.end, format!("expected {expected}, found end of rule")),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), ParseError> {
        if self.peek_token() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn string(&mut self) -> Result<(String, usize), ParseError> {
        match self.peek() {
            Some(Spanned {
                token: Token::Str(s),
                offset,
            }) => {
                let out = (s.clone(), *offset);
                self.pos += 1;
                Ok(out)
            }
            _ => Err(self.error_here("a quoted string")),
        }
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new(
                self.offset(),
                format!("nesting deeper than {MAX_DEPTH} levels"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.and()?];
        while self.peek_token() == Some(&Token::OrOr) {
            self.pos += 1;
            terms.push(self.and()?);
        }
        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => Expr::Or(terms),
        })
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.unary()?];
        while self.peek_token() == Some(&Token::AndAnd) {
            self.pos += 1;
            terms.push(self.unary()?);
        }
        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => Expr::And(terms),
        })
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek_token() == Some(&Token::Bang) {
            self.descend()?;
            self.pos += 1;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_token() {
            Some(Token::LParen) => {
                self.descend()?;
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Ident(name)) if name == "true" || name == "false" => {
                let value = name == "true";
                self.pos += 1;
                Ok(Expr::Literal(value))
            }
            Some(Token::Ident(name)) if name == "family" => {
                self.pos += 1;
                self.family_test()
            }
            Some(Token::Ident(name)) if name == "tags" => self.score_test(),
            Some(Token::Number(_)) => self.score_test(),
            _ => Err(self.error_here("an expression")),
        }
    }

    fn family_test(&mut self) -> Result<Expr, ParseError> {
        match self.peek_token() {
            Some(Token::Cmp(CmpOp::Eq)) => {
                self.pos += 1;
                let (name, _) = self.string()?;
                Ok(Expr::FamilyEq(name))
            }
            Some(Token::Cmp(CmpOp::Ne)) => {
                self.pos += 1;
                let (name, _) = self.string()?;
                Ok(Expr::Not(Box::new(Expr::FamilyEq(name))))
            }
            Some(Token::Ident(kw)) if kw == "in" => {
                self.pos += 1;
                self.expect(Token::LBracket, "`[`")?;
                let mut names = Vec::new();
                loop {
                    match self.peek_token() {
                        Some(Token::RBracket) if names.is_empty() => {
                            return Err(ParseError::new(self.offset(), "empty family list"));
                        }
                        Some(Token::RBracket) => {
                            self.pos += 1;
                            break;
                        }
                        Some(Token::Comma) if !names.is_empty() => self.pos += 1,
                        _ => {
                            let (name, _) = self.string()?;
                            names.push(name);
                        }
                    }
                }
                Ok(Expr::FamilyIn(names))
            }
            Some(Token::Matches) => {
                self.pos += 1;
                let (pattern, offset) = self.string()?;
                let re = Regex::new(&pattern)
                    .map_err(|e| ParseError::new(offset, format!("invalid pattern: {e}")))?;
                Ok(Expr::FamilyMatches(re))
            }
            _ => Err(self.error_here("`==`, `!=`, `in` or `=~` after `family`")),
        }
    }

    fn score_test(&mut self) -> Result<Expr, ParseError> {
        let start = self.offset();
        let lhs = self.operand()?;
        if let Some(Token::Cmp(op)) = self.peek_token() {
            let op = *op;
            self.pos += 1;
            let rhs = self.operand()?;
            return Ok(Expr::Compare { lhs, op, rhs });
        }
        match lhs {
            Operand::Score(tag) => Ok(Expr::Present(tag)),
            Operand::Number(_) => Err(ParseError::new(
                start,
                "a number on its own is not a condition",
            )),
        }
    }

    fn operand(&mut self) -> Result<Operand, ParseError> {
        match self.peek_token() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(Operand::Number(n))
            }
            Some(Token::Ident(name)) if name == "tags" => {
                self.advance();
                self.expect(Token::LBracket, "`[` after `tags`")?;
                let (tag, _) = self.string()?;
                self.expect(Token::RBracket, "`]`")?;
                Ok(Operand::Score(tag))
            }
            _ => Err(self.error_here("`tags[...]` or a number")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(family: &'a str, scores: &[(&'a str, f32)]) -> RuleContext<'a> {
        scores
            .iter()
            .fold(RuleContext::new(family), |c, &(tag, score)| c.with_score(tag, score))
    }

    fn eval(source: &str, family: &str, scores: &[(&str, f32)]) -> bool {
        evaluate(source, &ctx(family, scores)).expect("rule compiles")
    }

    #[test]
    fn compares_scores_and_family() {
        let rule = r#"tags["/Expressive/Loud"] > 80 && family == "Roboto""#;
        assert!(eval(rule, "Roboto", &[("/Expressive/Loud", 95.0)]));
        assert!(!eval(rule, "Comic Sans", &[("/Expressive/Loud", 95.0)]));
        assert!(!eval(rule, "Roboto", &[("/Expressive/Loud", 80.0)]));
    }

    #[test]
    fn absent_tag_fails_every_comparison() {
        let scores: &[(&str, f32)] = &[];
        for op in [">", ">=", "<", "<=", "==", "!="] {
            let rule = format!(r#"tags["/Missing"] {op} 10"#);
            assert!(!eval(&rule, "A", scores), "{rule} should be false");
        }
        assert!(eval(r#"!(tags["/Missing"] > 10)"#, "A", scores));
        assert!(!eval(r#"tags["/Missing"]"#, "A", scores));
    }

    #[test]
    fn presence_test_and_tag_to_tag_comparison() {
        let scores = [("/Sans/Geometric", 70.0), ("/Sans/Humanist", 40.0)];
        assert!(eval(r#"tags["/Sans/Geometric"]"#, "A", &scores));
        assert!(eval(r#"tags["/Sans/Geometric"] > tags["/Sans/Humanist"]"#, "A", &scores));
        assert!(eval(r#"50 <= tags["/Sans/Geometric"]"#, "A", &scores));
    }

    #[test]
    fn precedence_and_grouping() {
        // && binds tighter than ||
        assert!(eval("true || false && false", "A", &[]));
        assert!(!eval("(true || false) && false", "A", &[]));
        assert!(eval("!false && !(false || false)", "A", &[]));
    }

    #[test]
    fn short_circuit_skips_the_right_side() {
        // The right side would be false either way; what matters is that the
        // left side alone decides and evaluation never errors.
        assert!(eval(r#"true || tags["/Missing"] > 1"#, "A", &[]));
        assert!(!eval(r#"false && tags["/Missing"] < 1"#, "A", &[]));
    }

    #[test]
    fn family_membership_and_patterns() {
        assert!(eval(r#"family in ["Inter" "Roboto"]"#, "Roboto", &[]));
        assert!(eval(r#"family in ["Inter", 'Roboto']"#, "Roboto", &[]));
        assert!(!eval(r#"family in ["Inter"]"#, "Roboto", &[]));
        assert!(eval(r#"family != "Inter""#, "Roboto", &[]));
        assert!(eval(r#"family =~ "^Noto Sans""#, "Noto Sans Arabic", &[]));
        assert!(!eval(r#"family =~ "^Noto Sans""#, "Noto Serif", &[]));
    }

    #[test]
    fn numbers_accept_signs_and_decimals() {
        let scores = [("/Quality/Drawing", 80.5)];
        assert!(eval(r#"tags["/Quality/Drawing"] == 80.5"#, "A", &scores));
        assert!(eval(r#"tags["/Quality/Drawing"] > -1"#, "A", &scores));
        assert!(eval(r#"tags["/Quality/Drawing"]>.5"#, "A", &scores));
    }

    #[test]
    fn escaped_quotes_in_strings() {
        assert!(eval(r#"family == "Say \"Hi\"""#, r#"Say "Hi""#, &[]));
    }

    #[test]
    fn malformed_rules_report_offsets() {
        let cases = [
            (r#"tags["X"] >"#, 11),
            (r#"tags["X" > 5"#, 9),
            (r#"family = "A""#, 7),
            (r#"tags["X"] > 5 &&"#, 16),
            (r#"family == "A" extra"#, 14),
            ("42", 0),
            (r#"family in []"#, 11),
            (r#"family =~ "(""#, 10),
            (r#""unterminated"#, 0),
            ("tags[X] > 1", 5),
            ("family ~ 'A'", 7),
        ];
        for (source, offset) in cases {
            let err = Rule::compile(source).expect_err(source);
            assert_eq!(err.offset, offset, "{source}: {err}");
        }
    }

    #[test]
    fn nesting_is_capped() {
        let deep_not = format!("{}true", "!".repeat(100_000));
        let err = Rule::compile(&deep_not).expect_err("too deep");
        assert_eq!(err.offset, MAX_DEPTH);

        let parens = format!("{}true{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(Rule::compile(&parens).is_err());

        let allowed = format!("{}true{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(eval(&allowed, "A", &[]));
        assert!(eval(&format!("{}true", "!!".repeat(MAX_DEPTH / 2)), "A", &[]));
    }

    #[test]
    fn long_flat_chains_evaluate() {
        let chain = vec!["true"; 100_000].join(" && ");
        assert!(eval(&chain, "A", &[]));
        let either = format!("{} || true", vec!["false"; 100_000].join(" || "));
        assert!(eval(&either, "A", &[]));
    }

    #[test]
    fn compiled_rule_keeps_source() {
        let rule = Rule::compile(r#"tags["X"]>50"#).expect("compile");
        assert_eq!(rule.source(), r#"tags["X"]>50"#);
    }
}
