//! Textual filters of the form `Name eq 'bob' and (Age ge 21 or Active eq true)`.
//!
//! ```text
//! expr   := and ("or" and)*
//! and    := term ("and" term)*
//! term   := "(" expr ")" | clause
//! clause := field op value
//! value  := 'quoted text' | bare-word
//! ```
use super::{CompareOp, Predicate};
use crate::Entity;
use crate::error::{FilterError, FilterResult};
use crate::field::{FieldDescriptor, FieldValue};
use error_stack::{Report, ResultExt};
use std::iter::Peekable;
use std::vec::IntoIter;
use tracing::trace;

/// Deepest parenthesis nesting a filter may use.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word(String),
    Quoted(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Open => "(".to_owned(),
            Token::Close => ")".to_owned(),
            Token::Word(w) => w.clone(),
            Token::Quoted(q) => format!("'{q}'"),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

/// Parse `filter` into a predicate over `E`. Field names and values are checked
/// against `E`'s registry here, so a bad filter fails before any data is touched.
/// A blank filter matches everything.
pub fn parse<E: Entity>(filter: &str) -> FilterResult<Predicate<E>> {
    if filter.trim().is_empty() {
        return Ok(Predicate::All);
    }

    let tokens = tokenize(filter)?;
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        depth: 0,
    };
    let predicate = parser.expr::<E>()?;

    if let Some(token) = parser.tokens.next() {
        return Err(Report::new(FilterError::UnexpectedToken(token.describe())));
    }

    trace!(entity = E::NAME, %predicate, "parsed filter");
    Ok(predicate)
}

fn tokenize(input: &str) -> FilterResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        // '' is an escaped quote
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            text.push('\'');
                        }
                        Some('\'') => break,
                        Some(c) => text.push(c),
                        None => return Err(Report::new(FilterError::UnterminatedString)),
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '\'' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    depth: usize,
}

impl Parser {
    fn expr<E: Entity>(&mut self) -> FilterResult<Predicate<E>> {
        let mut left = self.and::<E>()?;
        while self.tokens.next_if(|t| t.is_keyword("or")).is_some() {
            let right = self.and::<E>()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and<E: Entity>(&mut self) -> FilterResult<Predicate<E>> {
        let mut left = self.term::<E>()?;
        while self.tokens.next_if(|t| t.is_keyword("and")).is_some() {
            let right = self.term::<E>()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term<E: Entity>(&mut self) -> FilterResult<Predicate<E>> {
        match self.next()? {
            Token::Open => {
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    return Err(Report::new(FilterError::TooDeep(MAX_DEPTH)));
                }
                let inner = self.expr::<E>()?;
                self.depth -= 1;
                match self.next()? {
                    Token::Close => Ok(inner),
                    other => Err(Report::new(FilterError::UnexpectedToken(other.describe()))),
                }
            }
            Token::Word(field) => self.clause::<E>(field),
            other => Err(Report::new(FilterError::UnexpectedToken(other.describe()))),
        }
    }

    fn clause<E: Entity>(&mut self, field_name: String) -> FilterResult<Predicate<E>> {
        let field = E::fields().get(&field_name).ok_or_else(|| {
            Report::new(FilterError::UnknownField {
                field: field_name.clone(),
                entity: E::NAME,
            })
        })?;

        let op: CompareOp = match self.next()? {
            Token::Word(op) => op.parse()?,
            other => return Err(Report::new(FilterError::UnexpectedToken(other.describe()))),
        };

        let value = match self.next()? {
            Token::Quoted(raw) => convert(field, &raw, false)?,
            Token::Word(raw) => convert(field, &raw, true)?,
            other => return Err(Report::new(FilterError::UnexpectedToken(other.describe()))),
        };

        Predicate::compare(field.name(), op, value)
    }

    fn next(&mut self) -> FilterResult<Token> {
        self.tokens
            .next()
            .ok_or_else(|| Report::new(FilterError::UnexpectedEnd))
    }
}

fn convert<E>(
    field: &FieldDescriptor<E>,
    raw: &str,
    bare: bool,
) -> FilterResult<FieldValue> {
    field.convert(raw, bare).change_context(FilterError::Conversion {
        field: field.name().to_owned(),
        raw: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;
    use crate::field::Fields;
    use rstest::rstest;
    use serde::{Deserialize, Serialize};
    use std::sync::LazyLock;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Person {
        id: i64,
        name: String,
        nickname: Option<String>,
        age: i32,
        active: bool,
        born: Timestamp,
    }

    impl Entity for Person {
        type Id = i64;
        const NAME: &'static str = "Person";

        fn id(&self) -> &i64 {
            &self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }

        fn fields() -> &'static Fields<Self> {
            static FIELDS: LazyLock<Fields<Person>> = LazyLock::new(|| {
                Fields::builder()
                    .identity("Id", |p: &Person| &p.id, |p: &mut Person| &mut p.id)
                    .field("Name", |p: &Person| &p.name, |p: &mut Person| &mut p.name)
                    .field(
                        "Nickname",
                        |p: &Person| &p.nickname,
                        |p: &mut Person| &mut p.nickname,
                    )
                    .field("Age", |p: &Person| &p.age, |p: &mut Person| &mut p.age)
                    .field("Active", |p: &Person| &p.active, |p: &mut Person| &mut p.active)
                    .field("Born", |p: &Person| &p.born, |p: &mut Person| &mut p.born)
                    .build()
            });
            &FIELDS
        }
    }

    fn person(name: &str, age: i32, active: bool) -> Person {
        Person {
            id: 1,
            name: name.to_owned(),
            nickname: None,
            age,
            active,
            born: "1990-06-15T00:00:00".parse().unwrap(),
        }
    }

    #[rstest]
    #[case("Name eq 'bob'", true)]
    #[case("Name ne 'bob'", false)]
    #[case("name EQ 'bob'", true)]
    #[case("Age gt 30", true)]
    #[case("Age ge 31", true)]
    #[case("Age lt 31", false)]
    #[case("Age le 31", true)]
    #[case("Name contains 'o'", true)]
    #[case("Name startswith 'b'", true)]
    #[case("Name endswith 'x'", false)]
    #[case("Active eq true", true)]
    #[case("Nickname eq null", true)]
    #[case("Nickname ne null", false)]
    #[case("Born lt 2000-01-01T00:00:00", true)]
    #[case("Born gt 1990-06-14", true)]
    #[case("Born eq 1990-06-15", true)]
    #[case("Name eq 'bob' and Age lt 30", false)]
    #[case("Name eq 'bob' or Age lt 30", true)]
    #[case("Age lt 30 or Name eq 'alice' and Active eq true", false)]
    #[case("(Age lt 30 or Name eq 'bob') and Active eq true", true)]
    #[case("   ", true)]
    fn evaluates_against_entity(#[case] filter: &str, #[case] expected: bool) {
        let predicate = parse::<Person>(filter).unwrap();
        assert_eq!(expected, predicate.matches(&person("bob", 31, true)), "{filter}");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let predicate = parse::<Person>("Age eq 1 or Age eq 2 and Active eq false").unwrap();
        assert_eq!(
            "(Age eq 1 or (Age eq 2 and Active eq false))",
            predicate.to_string()
        );
    }

    #[test]
    fn escaped_quote_in_string() {
        let predicate = parse::<Person>("Name eq 'o''brien'").unwrap();
        assert!(predicate.matches(&person("o'brien", 1, true)));
    }

    #[test]
    fn quoted_null_is_text() {
        let predicate = parse::<Person>("Nickname eq 'null'").unwrap();
        assert!(!predicate.matches(&person("bob", 1, true)));
    }

    #[rstest]
    #[case("Shoe eq 'x'", FilterError::UnknownField { field: "Shoe".into(), entity: "Person" })]
    #[case("Age eq 'old'", FilterError::Conversion { field: "Age".into(), raw: "old".into() })]
    #[case("Active eq maybe", FilterError::Conversion { field: "Active".into(), raw: "maybe".into() })]
    #[case("Age contains 3", FilterError::UnsupportedOperator { field: "Age".into(), op: "contains".into() })]
    #[case("Age like 3", FilterError::UnknownOperator("like".into()))]
    #[case("Name eq 'bob", FilterError::UnterminatedString)]
    #[case("Name eq", FilterError::UnexpectedEnd)]
    #[case("(Name eq 'bob'", FilterError::UnexpectedEnd)]
    #[case("Name eq 'bob')", FilterError::UnexpectedToken(")".into()))]
    #[case("Name eq 'bob' Age eq 1", FilterError::UnexpectedToken("Age".into()))]
    fn rejects_bad_filters(#[case] filter: &str, #[case] expected: FilterError) {
        let err = parse::<Person>(filter).unwrap_err();
        assert_eq!(&expected, err.current_context(), "{filter}");
    }

    #[rstest]
    #[case(MAX_DEPTH + 1)]
    #[case(8000)]
    fn rejects_deep_nesting(#[case] depth: usize) {
        let filter = "(".repeat(depth) + "Age eq 1" + &")".repeat(depth);
        let err = parse::<Person>(&filter).unwrap_err();
        assert_eq!(&FilterError::TooDeep(MAX_DEPTH), err.current_context());
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let filter = "(".repeat(MAX_DEPTH) + "Age eq 31" + &")".repeat(MAX_DEPTH);
        let predicate = parse::<Person>(&filter).unwrap();
        assert!(predicate.matches(&person("bob", 31, true)));
    }

    #[test]
    fn sibling_groups_do_not_add_up() {
        let group = "(".repeat(MAX_DEPTH) + "Age eq 31" + &")".repeat(MAX_DEPTH);
        let filter = format!("{group} and {group}");
        assert!(parse::<Person>(&filter).is_ok());
    }
}
