//! Expression ranker formula compiler (§4.5 "Expr/Export ranking modes",
//! §C5). A small recursive-descent parser turns a user-supplied formula
//! string into a [`CompiledExpr`] tree that the expression ranker state
//! evaluates once per document.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := ternary
//! ternary := or ( "?" expr ":" expr )?
//! or      := and ( "||" and )*
//! and     := cmp ( "&&" cmp )*
//! cmp     := add ( ("<"|"<="|">"|">="|"=="|"!=") add )?
//! add     := mul ( ("+"|"-") mul )*
//! mul     := unary ( ("*"|"/") unary )*
//! unary   := "-" unary | "!" unary | atom
//! atom    := number | ident "(" args? ")" | ident | "(" expr ")"
//! ```
//!
//! Per-field factors (`lcs`, `wlccs`, `atc`, `min_gaps`, `user_weight`, ...)
//! may only be named inside `sum(...)` or `top(...)` — they have no meaning
//! outside an aggregate over matched fields. The body of `sum`/`top` is its
//! own restricted arithmetic grammar (numbers, per-field factors, `+ - * /`,
//! parens, unary `-`) so formulas like `sum(lcs * user_weight)` work, but it
//! can't reference global factors or nest another `sum`/`top`. `max_window_hits`,
//! `bm25a` and `bm25f` take constant numeric arguments only, since they size
//! ranker-internal state that must be known at compile time.

use crate::error::{ParseError, Result, UserError};
use crate::expr::factors::Factors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerFieldFactor {
    HitCount,
    WordCount,
    TfIdf,
    MinIdf,
    MaxIdf,
    SumIdf,
    MinHitPos,
    MinBestSpanPos,
    MinGaps,
    Lcs,
    Lccs,
    Wlccs,
    Atc,
    UserWeight,
}

impl PerFieldFactor {
    fn by_name(name: &str) -> Option<PerFieldFactor> {
        use PerFieldFactor::*;
        Some(match name {
            "hit_count" => HitCount,
            "word_count" => WordCount,
            "tf_idf" => TfIdf,
            "min_idf" => MinIdf,
            "max_idf" => MaxIdf,
            "sum_idf" => SumIdf,
            "min_hit_pos" => MinHitPos,
            "min_best_span_pos" => MinBestSpanPos,
            "min_gaps" => MinGaps,
            "lcs" => Lcs,
            "lccs" => Lccs,
            "wlccs" => Wlccs,
            "atc" => Atc,
            "user_weight" => UserWeight,
            _ => return None,
        })
    }

    fn read(self, f: &crate::expr::factors::FieldFactors) -> f64 {
        use PerFieldFactor::*;
        match self {
            HitCount => f.hit_count as f64,
            WordCount => f.word_count() as f64,
            TfIdf => f.tf_idf as f64,
            MinIdf => f.min_idf as f64,
            MaxIdf => f.max_idf as f64,
            SumIdf => f.sum_idf as f64,
            MinHitPos => f.min_hit_pos as f64,
            MinBestSpanPos => f.min_best_span_pos as f64,
            MinGaps => f.min_gaps as f64,
            Lcs => f.lcs as f64,
            Lccs => f.lccs as f64,
            Wlccs => f.wlccs as f64,
            Atc => f.atc as f64,
            UserWeight => f.user_weight as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobalFactor {
    Bm25,
    DocWordCount,
    ExactHit,
    ExactOrder,
    MatchedFieldCount,
}

impl GlobalFactor {
    fn by_name(name: &str) -> Option<GlobalFactor> {
        use GlobalFactor::*;
        Some(match name {
            "bm25" => Bm25,
            "doc_word_count" => DocWordCount,
            "exact_hit" => ExactHit,
            "exact_order" => ExactOrder,
            "matched_field_count" => MatchedFieldCount,
            _ => return None,
        })
    }

    fn read(self, f: &Factors) -> f64 {
        use GlobalFactor::*;
        match self {
            Bm25 => f.bm25 as f64,
            DocWordCount => f.doc_word_count as f64,
            ExactHit => f.exact_hit.count_ones() as f64,
            ExactOrder => f.exact_order.count_ones() as f64,
            MatchedFieldCount => f.matched_fields.count_ones() as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggKind {
    Sum,
    Top,
}

/// The restricted arithmetic grammar allowed inside `sum(...)`/`top(...)`:
/// per-field factors and numbers combined with `+ - * /` and unary `-`.
/// No global factors, no nested aggregates.
#[derive(Debug, Clone, PartialEq)]
enum FieldExpr {
    Num(f64),
    Factor(PerFieldFactor),
    Neg(Box<FieldExpr>),
    BinOp(BinOp, Box<FieldExpr>, Box<FieldExpr>),
}

impl FieldExpr {
    fn eval(&self, f: &crate::expr::factors::FieldFactors) -> f64 {
        match self {
            FieldExpr::Num(n) => *n,
            FieldExpr::Factor(pf) => pf.read(f),
            FieldExpr::Neg(e) => -e.eval(f),
            FieldExpr::BinOp(op, l, r) => {
                let (a, b) = (l.eval(f), r.eval(f));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            0.0
                        } else {
                            a / b
                        }
                    }
                    _ => 0.0,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledExpr {
    Num(f64),
    Global(GlobalFactor),
    Agg(AggKind, FieldExpr),
    Bm25a(f64, f64),
    Bm25f(f64, f64, Vec<(String, f64)>),
    MaxWindowHits(u32),
    Neg(Box<CompiledExpr>),
    Not(Box<CompiledExpr>),
    BinOp(BinOp, Box<CompiledExpr>, Box<CompiledExpr>),
    If(Box<CompiledExpr>, Box<CompiledExpr>, Box<CompiledExpr>),
}

impl CompiledExpr {
    pub fn compile(source: &str) -> Result<CompiledExpr> {
        let tokens = lex(source)?;
        let mut p = Parser { tokens, pos: 0 };
        let expr = p.parse_expr()?;
        if p.pos != p.tokens.len() {
            return Err(UserError::Parse(ParseError::new("expr", format!("trailing input near token {}", p.pos))).into());
        }
        Ok(expr)
    }

    /// Evaluates the formula against a document's accumulated factors.
    /// `sum`/`top` range over the fields named in `factors.matched_field_indices()`.
    pub fn eval(&self, factors: &Factors) -> f64 {
        match self {
            CompiledExpr::Num(n) => *n,
            CompiledExpr::Global(g) => g.read(factors),
            CompiledExpr::Agg(AggKind::Sum, fe) => {
                factors.matched_field_indices().map(|i| fe.eval(&factors.fields[i])).sum()
            }
            CompiledExpr::Agg(AggKind::Top, fe) => factors
                .matched_field_indices()
                .map(|i| fe.eval(&factors.fields[i]))
                .fold(f64::NEG_INFINITY, f64::max)
                .max(0.0),
            CompiledExpr::Bm25a(_, _) => factors.bm25a as f64,
            CompiledExpr::Bm25f(_, _, _) => factors.bm25f as f64,
            CompiledExpr::MaxWindowHits(_) => {
                factors.matched_field_indices().map(|i| factors.fields[i].max_window_hits as f64).fold(0.0, f64::max)
            }
            CompiledExpr::Neg(e) => -e.eval(factors),
            CompiledExpr::Not(e) => bool_to_f64(e.eval(factors) == 0.0),
            CompiledExpr::BinOp(op, l, r) => {
                let (a, b) = (l.eval(factors), r.eval(factors));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            0.0
                        } else {
                            a / b
                        }
                    }
                    BinOp::Lt => bool_to_f64(a < b),
                    BinOp::Le => bool_to_f64(a <= b),
                    BinOp::Gt => bool_to_f64(a > b),
                    BinOp::Ge => bool_to_f64(a >= b),
                    BinOp::Eq => bool_to_f64(a == b),
                    BinOp::Ne => bool_to_f64(a != b),
                    BinOp::And => bool_to_f64(a != 0.0 && b != 0.0),
                    BinOp::Or => bool_to_f64(a != 0.0 || b != 0.0),
                }
            }
            CompiledExpr::If(c, t, e) => {
                if c.eval(factors) != 0.0 {
                    t.eval(factors)
                } else {
                    e.eval(factors)
                }
            }
        }
    }

    /// Which `bm25a`/`bm25f`/`max_window_hits` constant parameters this
    /// formula asked for, so the ranker can size its trackers at init
    /// instead of re-parsing the formula on every document.
    pub fn static_params(&self) -> StaticParams {
        let mut out = StaticParams::default();
        self.collect_static_params(&mut out);
        out
    }

    fn collect_static_params(&self, out: &mut StaticParams) {
        match self {
            CompiledExpr::Bm25a(k1, b) => out.bm25a = Some((*k1, *b)),
            CompiledExpr::Bm25f(k1, b, weights) => out.bm25f = Some((*k1, *b, weights.clone())),
            CompiledExpr::MaxWindowHits(w) => out.max_window_hits = Some(*w),
            CompiledExpr::Neg(e) | CompiledExpr::Not(e) => e.collect_static_params(out),
            CompiledExpr::BinOp(_, l, r) => {
                l.collect_static_params(out);
                r.collect_static_params(out);
            }
            CompiledExpr::If(c, t, e) => {
                c.collect_static_params(out);
                t.collect_static_params(out);
                e.collect_static_params(out);
            }
            CompiledExpr::Num(_) | CompiledExpr::Global(_) | CompiledExpr::Agg(_, _) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticParams {
    pub bm25a: Option<(f64, f64)>,
    /// `(k1, b, field_name -> weight)`, the mandatory third `bm25f` argument
    /// (§4.5 "bm25f's third argument is a map of field-name to integer
    /// weight").
    pub bm25f: Option<(f64, f64, Vec<(String, f64)>)>,
    pub max_window_hits: Option<u32>,
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Question,
    Colon,
    Op(String),
}

fn lex(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit()) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| UserError::Parse(ParseError::new("expr", format!("bad number literal `{text}`"))))?;
            tokens.push(Token::Num(n));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c.to_string()));
                i += 1;
            }
            '<' | '>' | '=' | '!' | '&' | '|' => {
                let mut op = c.to_string();
                if i + 1 < chars.len() && chars[i + 1] == '=' && (c == '<' || c == '>' || c == '=' || c == '!') {
                    op.push('=');
                    i += 2;
                } else if (c == '&' && chars.get(i + 1) == Some(&'&')) || (c == '|' && chars.get(i + 1) == Some(&'|')) {
                    op.push(c);
                    i += 2;
                } else {
                    i += 1;
                }
                tokens.push(Token::Op(op));
            }
            other => {
                return Err(UserError::Parse(ParseError::new("expr", format!("unexpected character `{other}`"))).into());
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect_op(&mut self, op: &str) -> Result<()> {
        match self.bump() {
            Some(Token::Op(ref s)) if s == op => Ok(()),
            other => Err(UserError::Parse(ParseError::new("expr", format!("expected `{op}`, found {other:?}"))).into()),
        }
    }

    fn expect(&mut self, tok: Token) -> Result<()> {
        match self.bump() {
            Some(ref t) if *t == tok => Ok(()),
            other => Err(UserError::Parse(ParseError::new("expr", format!("expected {tok:?}, found {other:?}"))).into()),
        }
    }

    fn parse_expr(&mut self) -> Result<CompiledExpr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<CompiledExpr> {
        let cond = self.parse_or()?;
        if matches!(self.peek(), Some(Token::Question)) {
            self.bump();
            let then_branch = self.parse_expr()?;
            self.expect(Token::Colon)?;
            let else_branch = self.parse_expr()?;
            return Ok(CompiledExpr::If(Box::new(cond), Box::new(then_branch), Box::new(else_branch)));
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<CompiledExpr> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Op(op)) if op == "||") {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = CompiledExpr::BinOp(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<CompiledExpr> {
        let mut lhs = self.parse_cmp()?;
        while matches!(self.peek(), Some(Token::Op(op)) if op == "&&") {
            self.bump();
            let rhs = self.parse_cmp()?;
            lhs = CompiledExpr::BinOp(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<CompiledExpr> {
        let lhs = self.parse_add()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            let bop = match op.as_str() {
                "<" => Some(BinOp::Lt),
                "<=" => Some(BinOp::Le),
                ">" => Some(BinOp::Gt),
                ">=" => Some(BinOp::Ge),
                "==" => Some(BinOp::Eq),
                "!=" => Some(BinOp::Ne),
                _ => None,
            };
            if let Some(bop) = bop {
                self.bump();
                let rhs = self.parse_add()?;
                return Ok(CompiledExpr::BinOp(bop, Box::new(lhs), Box::new(rhs)));
            }
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<CompiledExpr> {
        let mut lhs = self.parse_mul()?;
        loop {
            match self.peek().cloned() {
                Some(Token::Op(op)) if op == "+" => {
                    self.bump();
                    let rhs = self.parse_mul()?;
                    lhs = CompiledExpr::BinOp(BinOp::Add, Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Op(op)) if op == "-" => {
                    self.bump();
                    let rhs = self.parse_mul()?;
                    lhs = CompiledExpr::BinOp(BinOp::Sub, Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<CompiledExpr> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek().cloned() {
                Some(Token::Op(op)) if op == "*" => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = CompiledExpr::BinOp(BinOp::Mul, Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Op(op)) if op == "/" => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = CompiledExpr::BinOp(BinOp::Div, Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<CompiledExpr> {
        match self.peek().cloned() {
            Some(Token::Op(op)) if op == "-" => {
                self.bump();
                Ok(CompiledExpr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Op(op)) if op == "!" => {
                self.bump();
                Ok(CompiledExpr::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<CompiledExpr> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(CompiledExpr::Num(n)),
            Some(Token::LParen) => {
                let e = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) => self.parse_ident(name),
            other => Err(UserError::Parse(ParseError::new("expr", format!("unexpected token {other:?}"))).into()),
        }
    }

    fn parse_ident(&mut self, name: String) -> Result<CompiledExpr> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.bump();
            return self.parse_call(name);
        }
        if let Some(g) = GlobalFactor::by_name(&name) {
            return Ok(CompiledExpr::Global(g));
        }
        if PerFieldFactor::by_name(&name).is_some() {
            return Err(UserError::Parse(ParseError::new(
                "expr",
                format!("`{name}` is a per-field factor and must appear inside sum(...) or top(...)"),
            ))
            .into());
        }
        Err(UserError::UnknownFunction(name).into())
    }

    fn parse_call(&mut self, name: String) -> Result<CompiledExpr> {
        match name.as_str() {
            "sum" | "top" => {
                // the body grammar only knows per-field factors, numbers and
                // arithmetic, so sum(...)/top(...) can't nest syntactically
                let body = self.parse_field_expr()?;
                self.expect(Token::RParen)?;
                let kind = if name == "sum" { AggKind::Sum } else { AggKind::Top };
                Ok(CompiledExpr::Agg(kind, body))
            }
            "bm25a" => {
                let (k1, b) = self.parse_two_const_args()?;
                Ok(CompiledExpr::Bm25a(k1, b))
            }
            "bm25f" => {
                let k1 = self.parse_one_const_arg()?;
                self.expect(Token::Comma)?;
                let b = self.parse_one_const_arg()?;
                self.expect(Token::Comma)?;
                let weights = self.parse_field_weight_map()?;
                self.expect(Token::RParen)?;
                Ok(CompiledExpr::Bm25f(k1, b, weights))
            }
            "max_window_hits" => {
                let w = self.parse_one_const_arg()?;
                self.expect(Token::RParen)?;
                Ok(CompiledExpr::MaxWindowHits(w as u32))
            }
            "if" => {
                let cond = self.parse_expr()?;
                self.expect(Token::Comma)?;
                let then_branch = self.parse_expr()?;
                self.expect(Token::Comma)?;
                let else_branch = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(CompiledExpr::If(Box::new(cond), Box::new(then_branch), Box::new(else_branch)))
            }
            "min" | "max" => {
                let a = self.parse_expr()?;
                self.expect(Token::Comma)?;
                let b = self.parse_expr()?;
                self.expect(Token::RParen)?;
                let op = if name == "min" { BinOp::Lt } else { BinOp::Gt };
                Ok(CompiledExpr::If(
                    Box::new(CompiledExpr::BinOp(op, Box::new(a.clone()), Box::new(b.clone()))),
                    Box::new(a),
                    Box::new(b),
                ))
            }
            other => Err(UserError::UnknownFunction(other.to_string()).into()),
        }
    }

    fn parse_field_expr(&mut self) -> Result<FieldExpr> {
        self.parse_field_add()
    }

    fn parse_field_add(&mut self) -> Result<FieldExpr> {
        let mut lhs = self.parse_field_mul()?;
        loop {
            match self.peek().cloned() {
                Some(Token::Op(op)) if op == "+" => {
                    self.bump();
                    let rhs = self.parse_field_mul()?;
                    lhs = FieldExpr::BinOp(BinOp::Add, Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Op(op)) if op == "-" => {
                    self.bump();
                    let rhs = self.parse_field_mul()?;
                    lhs = FieldExpr::BinOp(BinOp::Sub, Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_field_mul(&mut self) -> Result<FieldExpr> {
        let mut lhs = self.parse_field_unary()?;
        loop {
            match self.peek().cloned() {
                Some(Token::Op(op)) if op == "*" => {
                    self.bump();
                    let rhs = self.parse_field_unary()?;
                    lhs = FieldExpr::BinOp(BinOp::Mul, Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Op(op)) if op == "/" => {
                    self.bump();
                    let rhs = self.parse_field_unary()?;
                    lhs = FieldExpr::BinOp(BinOp::Div, Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_field_unary(&mut self) -> Result<FieldExpr> {
        if matches!(self.peek(), Some(Token::Op(op)) if op == "-") {
            self.bump();
            return Ok(FieldExpr::Neg(Box::new(self.parse_field_unary()?)));
        }
        self.parse_field_atom()
    }

    fn parse_field_atom(&mut self) -> Result<FieldExpr> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(FieldExpr::Num(n)),
            Some(Token::LParen) => {
                let e = self.parse_field_expr()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    return Err(UserError::Parse(ParseError::new("expr", format!("`{name}` cannot be called inside sum(...)/top(...)"))).into());
                }
                let pf = PerFieldFactor::by_name(&name).ok_or_else(|| UserError::UnknownFunction(name.clone()))?;
                Ok(FieldExpr::Factor(pf))
            }
            other => Err(UserError::Parse(ParseError::new("expr", format!("unexpected token {other:?} inside sum(...)/top(...)"))).into()),
        }
    }

    fn parse_one_const_arg(&mut self) -> Result<f64> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            other => Err(UserError::Parse(ParseError::new("expr", format!("expected a constant number, found {other:?}"))).into()),
        }
    }

    fn parse_two_const_args(&mut self) -> Result<(f64, f64)> {
        let a = self.parse_one_const_arg()?;
        self.expect(Token::Comma)?;
        let b = self.parse_one_const_arg()?;
        self.expect(Token::RParen)?;
        Ok((a, b))
    }

    /// `{ ident: num (, ident: num)* }`, the mandatory third `bm25f`
    /// argument mapping field name to weight.
    fn parse_field_weight_map(&mut self) -> Result<Vec<(String, f64)>> {
        self.expect(Token::LBrace)?;
        let mut out = Vec::new();
        if matches!(self.peek(), Some(Token::RBrace)) {
            self.bump();
            return Ok(out);
        }
        loop {
            let name = match self.bump() {
                Some(Token::Ident(name)) => name,
                other => return Err(UserError::Parse(ParseError::new("expr", format!("expected a field name, found {other:?}"))).into()),
            };
            self.expect(Token::Colon)?;
            let weight = self.parse_one_const_arg()?;
            out.push((name, weight));
            match self.bump() {
                Some(Token::Comma) => continue,
                Some(Token::RBrace) => break,
                other => return Err(UserError::Parse(ParseError::new("expr", format!("expected `,` or `}}` in bm25f weight map, found {other:?}"))).into()),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::factors::FieldFactors;

    fn factors_with_one_field(mutate: impl FnOnce(&mut FieldFactors)) -> Factors {
        let mut f = Factors::new(1);
        f.matched_fields = 1;
        mutate(&mut f.fields[0]);
        f
    }

    #[test]
    fn plain_arithmetic_and_bm25() {
        let e = CompiledExpr::compile("bm25 * 2 + 1").unwrap();
        let mut f = Factors::new(1);
        f.bm25 = 3.0;
        assert_eq!(e.eval(&f), 7.0);
    }

    #[test]
    fn sum_and_top_aggregate_across_matched_fields() {
        let mut f = Factors::new(2);
        f.matched_fields = 0b11;
        f.fields[0].lcs = 2.0;
        f.fields[1].lcs = 5.0;
        let sum = CompiledExpr::compile("sum(lcs)").unwrap();
        let top = CompiledExpr::compile("top(lcs)").unwrap();
        assert_eq!(sum.eval(&f), 7.0);
        assert_eq!(top.eval(&f), 5.0);
    }

    #[test]
    fn lcs_and_lccs_are_distinct_factors() {
        let mut f = Factors::new(1);
        f.matched_fields = 1;
        f.fields[0].lcs = 2.0;
        f.fields[0].lccs = 9;
        let lcs = CompiledExpr::compile("sum(lcs)").unwrap();
        let lccs = CompiledExpr::compile("sum(lccs)").unwrap();
        assert_eq!(lcs.eval(&f), 2.0);
        assert_eq!(lccs.eval(&f), 9.0);
    }

    #[test]
    fn bare_per_field_factor_is_rejected() {
        let err = CompiledExpr::compile("lcs + 1");
        assert!(err.is_err());
    }

    #[test]
    fn sibling_aggregates_in_one_formula_are_allowed() {
        let err = CompiledExpr::compile("sum(lcs) + top(atc)");
        assert!(err.is_ok());
    }

    #[test]
    fn ternary_and_comparisons() {
        let e = CompiledExpr::compile("bm25 > 1 ? 10 : 0").unwrap();
        let mut f = Factors::new(1);
        f.bm25 = 2.0;
        assert_eq!(e.eval(&f), 10.0);
        f.bm25 = 0.5;
        assert_eq!(e.eval(&f), 0.0);
    }

    #[test]
    fn if_min_max_builtins() {
        let e = CompiledExpr::compile("max(bm25, doc_word_count)").unwrap();
        let mut f = Factors::new(1);
        f.bm25 = 3.0;
        f.doc_word_count = 9;
        assert_eq!(e.eval(&f), 9.0);
    }

    #[test]
    fn bm25a_requires_constant_args() {
        assert!(CompiledExpr::compile("bm25a(1.2, 0.75)").is_ok());
        assert!(CompiledExpr::compile("bm25a(bm25, 0.75)").is_err());
    }

    #[test]
    fn unknown_function_is_a_user_error() {
        assert!(CompiledExpr::compile("frobnicate(1)").is_err());
    }

    #[test]
    fn static_params_are_collected_from_anywhere_in_the_tree() {
        let e = CompiledExpr::compile("1 + (bm25a(1.5, 0.6) * max_window_hits(4))").unwrap();
        let p = e.static_params();
        assert_eq!(p.bm25a, Some((1.5, 0.6)));
        assert_eq!(p.max_window_hits, Some(4));
    }

    #[test]
    fn bm25f_parses_its_mandatory_field_weight_map() {
        let e = CompiledExpr::compile("bm25f(1.2, 0.75, {title: 3, body: 1})").unwrap();
        let p = e.static_params();
        assert_eq!(p.bm25f, Some((1.2, 0.75, vec![("title".to_string(), 3.0), ("body".to_string(), 1.0)])));
    }

    #[test]
    fn bm25f_rejects_an_empty_or_missing_weight_map() {
        assert!(CompiledExpr::compile("bm25f(1.2, 0.75, {})").is_ok());
        assert!(CompiledExpr::compile("bm25f(1.2, 0.75)").is_err());
    }

    #[test]
    fn sum_body_accepts_arithmetic_over_per_field_factors() {
        let f = factors_with_one_field(|ff| {
            ff.lcs = 2.0;
            ff.user_weight = 3;
        });
        let e = CompiledExpr::compile("sum(lcs * user_weight)").unwrap();
        assert_eq!(e.eval(&f), 6.0);
    }

    #[test]
    fn sum_body_rejects_global_factors_and_nested_aggregates() {
        assert!(CompiledExpr::compile("sum(bm25)").is_err());
        assert!(CompiledExpr::compile("sum(top(lcs))").is_err());
    }

    #[test]
    fn unclosed_per_field_usage_helper_field_factors_roundtrip() {
        let f = factors_with_one_field(|ff| ff.atc = 1.5);
        let e = CompiledExpr::compile("sum(atc)").unwrap();
        assert!((e.eval(&f) - 1.5).abs() < 1e-6);
    }
}
