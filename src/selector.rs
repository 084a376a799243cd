//! The label selector grammar: comma-separated `key OP value` terms, `OP`
//! in `{=, ==, !=}`, keys/values restricted to `[A-Za-z0-9._/-]`, at most
//! 20 terms, empty selector matches all.

use logos::Logos;

use crate::error::{Error, Result};

const MAX_TERMS: usize = 20;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\n\f]+")]
enum Token {
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,
    #[regex(r"[A-Za-z0-9._/-]+", |lex| lex.slice().to_owned())]
    Ident(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Equal,
    NotEqual,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Term {
    key: String,
    op: Op,
    value: String,
}

#[derive(Clone, Debug, Default)]
pub struct Selector {
    terms: Vec<Term>,
}

impl Selector {
    /// An empty selector matches everything.
    pub fn parse(text: &str) -> Result<Self> {
        let bail = |reason: &str| Error::BadSelector { selector: text.to_string(), reason: reason.to_string() };

        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw_terms: Vec<&str> = text.split(',').map(str::trim).collect();
        if raw_terms.len() > MAX_TERMS {
            return Err(bail(&format!("more than {MAX_TERMS} terms")));
        }

        let mut terms = Vec::with_capacity(raw_terms.len());
        for raw in raw_terms {
            if raw.is_empty() {
                return Err(bail("empty term"));
            }
            terms.push(parse_term(raw).ok_or_else(|| bail(&format!("malformed term {raw:?}")))?);
        }

        Ok(Self { terms })
    }

    pub fn matches(&self, labels: &[(&str, &str)]) -> bool {
        self.terms.iter().all(|term| {
            let found = labels.iter().find(|(k, _)| *k == term.key).map(|(_, v)| *v);
            match term.op {
                Op::Equal => found == Some(term.value.as_str()),
                Op::NotEqual => found != Some(term.value.as_str()),
            }
        })
    }
}

fn parse_term(raw: &str) -> Option<Term> {
    let mut lexer = Token::lexer(raw);

    let key = match lexer.next()?.ok()? {
        Token::Ident(key) => key,
        _ => return None,
    };
    let op = match lexer.next()?.ok()? {
        Token::Eq | Token::EqEq => Op::Equal,
        Token::NotEq => Op::NotEqual,
        Token::Ident(_) => return None,
    };
    let value = match lexer.next()?.ok()? {
        Token::Ident(value) => value,
        _ => return None,
    };

    if lexer.next().is_some() {
        return None;
    }

    Some(Term { key, op, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selector_matches_everything() {
        let selector = Selector::parse("").unwrap();
        assert!(selector.matches(&[]));
        assert!(selector.matches(&[("app", "x")]));
    }

    #[test]
    fn equality_and_inequality_terms_combine_with_and() {
        let selector = Selector::parse("app=x,tier!=frontend").unwrap();
        assert!(selector.matches(&[("app", "x"), ("tier", "backend")]));
        assert!(!selector.matches(&[("app", "x"), ("tier", "frontend")]));
        assert!(!selector.matches(&[("app", "y"), ("tier", "backend")]));
    }

    #[test]
    fn double_equals_is_accepted() {
        let selector = Selector::parse("app==x").unwrap();
        assert!(selector.matches(&[("app", "x")]));
    }

    #[test]
    fn set_based_syntax_is_rejected() {
        assert!(matches!(Selector::parse("app in (x,y)"), Err(Error::BadSelector { .. })));
        assert!(matches!(Selector::parse("app"), Err(Error::BadSelector { .. })));
    }

    #[test]
    fn more_than_twenty_terms_is_rejected() {
        let text: Vec<String> = (0..21).map(|i| format!("k{i}=v")).collect();
        assert!(matches!(
            Selector::parse(&text.join(",")),
            Err(Error::BadSelector { .. })
        ));
    }

    #[test]
    fn disallowed_characters_are_rejected() {
        assert!(matches!(Selector::parse("app=x y"), Err(Error::BadSelector { .. })));
    }
}
