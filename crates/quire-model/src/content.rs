//! Content expressions: the per-node grammar over child node types.
//!
//! Syntax: names of node types or groups, `(...)` grouping, whitespace
//! separated sequences, `|` alternatives and the postfix operators `*`, `+`,
//! `?`, `{n}`, `{n,}` and `{n,m}`.
//!
//! Matching works on child type ids. Each term maps a start index to the set
//! of indices where a match of that term can end; a child list matches when
//! its length is among the ends of the whole expression starting at zero.

use std::collections::BTreeSet;

use smol_str::SmolStr;

use crate::error::SchemaError;

#[derive(Clone, Debug, PartialEq)]
enum Term {
    Types(Vec<usize>),
    Seq(Vec<Term>),
    Choice(Vec<Term>),
    Repeat {
        term: Box<Term>,
        min: usize,
        max: Option<usize>,
    },
}

/// Compiled content expression of a node type.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentExpr {
    source: SmolStr,
    term: Option<Term>,
}

impl ContentExpr {
    /// The expression of leaf nodes: no children allowed.
    pub fn empty() -> Self {
        Self {
            source: SmolStr::default(),
            term: None,
        }
    }

    /// Parse `source`, resolving each name to the type ids it stands for.
    pub fn parse(
        node: &str,
        source: &str,
        resolve: impl Fn(&str) -> Option<Vec<usize>>,
    ) -> Result<Self, SchemaError> {
        let tokens = tokenize(source);
        if tokens.is_empty() {
            return Ok(Self::empty());
        }
        let mut parser = ExprParser {
            node,
            source,
            tokens,
            pos: 0,
            resolve: &resolve,
        };
        let term = parser.parse_choice()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error(format!(
                "unexpected token `{}`",
                parser.tokens[parser.pos]
            )));
        }
        Ok(Self {
            source: SmolStr::new(source),
            term: Some(term),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the expression admits no children at all.
    pub fn is_empty(&self) -> bool {
        self.term.is_none()
    }

    /// Whether the given child type sequence is valid content.
    pub fn matches(&self, types: &[usize]) -> bool {
        match &self.term {
            None => types.is_empty(),
            Some(term) => ends(term, types, 0).contains(&types.len()),
        }
    }

    /// Whether a child of type `ty` can be the first child.
    pub fn can_start_with(&self, ty: usize) -> bool {
        match &self.term {
            None => false,
            Some(term) => !ends(term, &[ty], 0).is_empty(),
        }
    }

    /// Whether `types` is a prefix of some valid child list.
    pub fn can_complete(&self, types: &[usize]) -> bool {
        if self.matches(types) {
            return true;
        }
        let referenced = self.referenced();
        (1..=MAX_FILL).any(|len| {
            sequences(&referenced, len).into_iter().any(|seq| {
                let mut ids = types.to_vec();
                ids.extend(seq);
                self.matches(&ids)
            })
        })
    }

    /// All type ids named anywhere in the expression, in order of appearance.
    pub fn referenced(&self) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(term) = &self.term {
            collect(term, &mut out);
        }
        out
    }

    /// Shortest sequence of fillable types satisfying the expression on its own.
    pub fn fill_empty(&self, fillable: &dyn Fn(usize) -> bool) -> Option<Vec<usize>> {
        match &self.term {
            None => Some(Vec::new()),
            Some(term) => fill(term, fillable),
        }
    }

    /// Find the shortest run of fillable types that, placed before (or after)
    /// `types`, makes the sequence valid. Returns `(before, after)`.
    pub fn fill_around(
        &self,
        types: &[usize],
        candidates: &[usize],
    ) -> Option<(Vec<usize>, Vec<usize>)> {
        if self.matches(types) {
            return Some((Vec::new(), Vec::new()));
        }
        for len in 1..=MAX_FILL {
            for seq in sequences(candidates, len) {
                let mut before = seq.clone();
                before.extend_from_slice(types);
                if self.matches(&before) {
                    return Some((seq, Vec::new()));
                }
                let mut after = types.to_vec();
                after.extend_from_slice(&seq);
                if self.matches(&after) {
                    return Some((Vec::new(), seq));
                }
            }
        }
        None
    }
}

const MAX_FILL: usize = 3;

fn sequences(candidates: &[usize], len: usize) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = vec![Vec::new()];
    for _ in 0..len {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                candidates.iter().map(move |c| {
                    let mut next = prefix.clone();
                    next.push(*c);
                    next
                })
            })
            .collect();
    }
    out
}

fn ends(term: &Term, types: &[usize], start: usize) -> BTreeSet<usize> {
    let mut out = BTreeSet::new();
    match term {
        Term::Types(ids) => {
            if let Some(ty) = types.get(start) {
                if ids.contains(ty) {
                    out.insert(start + 1);
                }
            }
        }
        Term::Seq(terms) => {
            let mut current = BTreeSet::from([start]);
            for t in terms {
                current = current.iter().flat_map(|p| ends(t, types, *p)).collect();
                if current.is_empty() {
                    break;
                }
            }
            out = current;
        }
        Term::Choice(terms) => {
            for t in terms {
                out.extend(ends(t, types, start));
            }
        }
        Term::Repeat { term, min, max } => {
            if *min == 0 {
                out.insert(start);
            }
            let limit = max.unwrap_or(min + types.len().saturating_sub(start) + 1);
            let mut frontier = BTreeSet::from([start]);
            for count in 1..=limit {
                let next: BTreeSet<usize> =
                    frontier.iter().flat_map(|p| ends(term, types, *p)).collect();
                if next.is_empty() {
                    break;
                }
                if count >= *min {
                    out.extend(next.iter().copied());
                }
                if next == frontier {
                    // The repeated term only matches empty here; further rounds change nothing.
                    if count < *min {
                        out.extend(next.iter().copied());
                    }
                    break;
                }
                frontier = next;
            }
        }
    }
    out
}

fn collect(term: &Term, out: &mut Vec<usize>) {
    match term {
        Term::Types(ids) => {
            for id in ids {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
        }
        Term::Seq(terms) | Term::Choice(terms) => terms.iter().for_each(|t| collect(t, out)),
        Term::Repeat { term, .. } => collect(term, out),
    }
}

fn fill(term: &Term, fillable: &dyn Fn(usize) -> bool) -> Option<Vec<usize>> {
    match term {
        Term::Types(ids) => ids.iter().copied().find(|id| fillable(*id)).map(|id| vec![id]),
        Term::Seq(terms) => {
            let mut out = Vec::new();
            for t in terms {
                out.extend(fill(t, fillable)?);
            }
            Some(out)
        }
        Term::Choice(terms) => terms
            .iter()
            .filter_map(|t| fill(t, fillable))
            .min_by_key(|seq| seq.len()),
        Term::Repeat { term, min, .. } => {
            if *min == 0 {
                return Some(Vec::new());
            }
            let once = fill(term, fillable)?;
            Some(once.repeat(*min))
        }
    }
}

fn tokenize(source: &str) -> Vec<SmolStr> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in source.chars() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            tokens.push(SmolStr::new(&word));
            word.clear();
        }
        if !c.is_whitespace() {
            tokens.push(SmolStr::new(c.encode_utf8(&mut [0; 4])));
        }
    }
    if !word.is_empty() {
        tokens.push(SmolStr::new(&word));
    }
    tokens
}

struct ExprParser<'a> {
    node: &'a str,
    source: &'a str,
    tokens: Vec<SmolStr>,
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<Vec<usize>>,
}

impl ExprParser<'_> {
    fn error(&self, message: String) -> SchemaError {
        SchemaError::ContentSyntax {
            node: SmolStr::new(self.node),
            expr: SmolStr::new(self.source),
            message,
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|t| t.as_str())
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_choice(&mut self) -> Result<Term, SchemaError> {
        let mut alts = vec![self.parse_seq()?];
        while self.eat("|") {
            alts.push(self.parse_seq()?);
        }
        Ok(if alts.len() == 1 {
            alts.remove(0)
        } else {
            Term::Choice(alts)
        })
    }

    fn parse_seq(&mut self) -> Result<Term, SchemaError> {
        let mut items = Vec::new();
        while let Some(tok) = self.peek() {
            if tok == ")" || tok == "|" {
                break;
            }
            items.push(self.parse_subscript()?);
        }
        match items.len() {
            0 => Err(self.error("expected a name or `(`".into())),
            1 => Ok(items.remove(0)),
            _ => Ok(Term::Seq(items)),
        }
    }

    fn parse_subscript(&mut self) -> Result<Term, SchemaError> {
        let mut term = self.parse_atom()?;
        loop {
            let (min, max) = if self.eat("+") {
                (1, None)
            } else if self.eat("*") {
                (0, None)
            } else if self.eat("?") {
                (0, Some(1))
            } else if self.eat("{") {
                self.parse_range()?
            } else {
                break;
            };
            term = Term::Repeat {
                term: Box::new(term),
                min,
                max,
            };
        }
        Ok(term)
    }

    fn parse_number(&mut self) -> Result<usize, SchemaError> {
        let tok = self
            .peek()
            .ok_or_else(|| self.error("expected a number".into()))?;
        let n = tok
            .parse::<usize>()
            .map_err(|_| self.error(format!("expected a number, found `{tok}`")))?;
        self.pos += 1;
        Ok(n)
    }

    fn parse_range(&mut self) -> Result<(usize, Option<usize>), SchemaError> {
        let min = self.parse_number()?;
        let max = if self.eat(",") {
            if self.peek() == Some("}") {
                None
            } else {
                Some(self.parse_number()?)
            }
        } else {
            Some(min)
        };
        if !self.eat("}") {
            return Err(self.error("unclosed `{`".into()));
        }
        if max.is_some_and(|m| m < min) {
            return Err(self.error(format!("range maximum below minimum {min}")));
        }
        Ok((min, max))
    }

    fn parse_atom(&mut self) -> Result<Term, SchemaError> {
        if self.eat("(") {
            let inner = self.parse_choice()?;
            if !self.eat(")") {
                return Err(self.error("missing closing `)`".into()));
            }
            return Ok(inner);
        }
        let tok = self
            .peek()
            .ok_or_else(|| self.error("unexpected end of expression".into()))?
            .to_owned();
        if !tok.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(self.error(format!("unexpected token `{tok}`")));
        }
        self.pos += 1;
        match (self.resolve)(&tok) {
            Some(ids) if !ids.is_empty() => Ok(Term::Types(ids)),
            _ => Err(SchemaError::UnknownContentName {
                node: SmolStr::new(self.node),
                name: SmolStr::new(&tok),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // paragraph = 0, heading = 1, text = 2, image = 3; group block = [0, 1], inline = [2, 3]
    fn resolve(name: &str) -> Option<Vec<usize>> {
        match name {
            "paragraph" => Some(vec![0]),
            "heading" => Some(vec![1]),
            "text" => Some(vec![2]),
            "image" => Some(vec![3]),
            "block" => Some(vec![0, 1]),
            "inline" => Some(vec![2, 3]),
            _ => None,
        }
    }

    fn expr(src: &str) -> ContentExpr {
        ContentExpr::parse("test", src, resolve).unwrap()
    }

    #[test]
    fn test_star_and_plus() {
        let star = expr("inline*");
        assert!(star.matches(&[]));
        assert!(star.matches(&[2, 3, 2]));
        assert!(!star.matches(&[0]));

        let plus = expr("block+");
        assert!(!plus.matches(&[]));
        assert!(plus.matches(&[1, 0, 0]));
    }

    #[test]
    fn test_sequence_and_choice() {
        let e = expr("paragraph block*");
        assert!(e.matches(&[0]));
        assert!(e.matches(&[0, 1, 0]));
        assert!(!e.matches(&[1, 0]));
        assert!(!e.matches(&[]));

        let c = expr("(heading | paragraph) text?");
        assert!(c.matches(&[1]));
        assert!(c.matches(&[0, 2]));
        assert!(!c.matches(&[0, 2, 2]));
    }

    #[test]
    fn test_ranges() {
        let e = expr("paragraph{2,3}");
        assert!(!e.matches(&[0]));
        assert!(e.matches(&[0, 0]));
        assert!(e.matches(&[0, 0, 0]));
        assert!(!e.matches(&[0, 0, 0, 0]));

        let open = expr("paragraph{2,}");
        assert!(open.matches(&[0, 0, 0, 0, 0]));
        let exact = expr("heading{1}");
        assert!(exact.matches(&[1]));
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = ContentExpr::parse("doc", "widget+", resolve).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownContentName {
                node: "doc".into(),
                name: "widget".into()
            }
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(ContentExpr::parse("doc", "(block", resolve).is_err());
        assert!(ContentExpr::parse("doc", "block{3,1}", resolve).is_err());
        assert!(ContentExpr::parse("doc", "| block", resolve).is_err());
    }

    #[test]
    fn test_fill() {
        let e = expr("paragraph block*");
        let fillable = |id: usize| id != 2;
        assert_eq!(e.fill_empty(&fillable), Some(vec![0]));
        assert_eq!(e.fill_around(&[1], &[0]), Some((vec![0], vec![])));
        assert_eq!(expr("inline*").fill_empty(&fillable), Some(vec![]));
    }
}
