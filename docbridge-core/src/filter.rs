//! Exact-match filters and the `field=value` expression syntax.
//!
//! A [`Filter`] is a set of field predicates that must all hold. Filters are usually parsed from
//! an expression such as `name=Alice&city=Lisbon`:
//!
//! - pairs are joined by `&` and split on `=`;
//! - a segment that does not split into exactly two parts maps its first part to null;
//! - empty segments are ignored, so the empty expression matches every document.
//!
//! Parsed values are always strings. A null predicate matches documents where the field is null
//! or absent. [`FilterParser`] supports other separator characters and regular expression
//! separators.

use bson::{Bson, Document};
use regex::Regex;

use crate::error::{AdapterError, AdapterResult};

/// A conjunction of exact-match field predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Document,
}

impl Filter {
    /// Creates a filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an expression with the default `&` and `=` separators.
    pub fn parse(expression: &str) -> Self {
        FilterParser::default().parse(expression)
    }

    /// Adds a predicate requiring `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.predicates.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &Document {
        &self.predicates
    }

    pub fn into_document(self) -> Document {
        self.predicates
    }

    /// Returns `true` if `document` satisfies every predicate.
    pub fn matches(&self, document: &Document) -> bool {
        self.predicates
            .iter()
            .all(|(field, expected)| match (expected, document.get(field)) {
                (Bson::Null, None) => true,
                (expected, Some(actual)) => expected == actual,
                (_, None) => false,
            })
    }
}

impl From<Document> for Filter {
    fn from(predicates: Document) -> Self {
        Self { predicates }
    }
}

impl From<&str> for Filter {
    fn from(expression: &str) -> Self {
        Filter::parse(expression)
    }
}

/// Parser for filter expressions with configurable separators.
///
/// Separators are either single characters ([`FilterParser::new`]) or regular expressions
/// ([`FilterParser::with_patterns`]).
///
/// # Example
///
/// ```ignore
/// let filter = FilterParser::new(';', ':').parse("name:Alice;city:Lisbon");
/// assert_eq!(filter, Filter::new().eq("name", "Alice").eq("city", "Lisbon"));
///
/// let parser = FilterParser::with_patterns(r"\s*[;&]\s*", "[=:]")?;
/// let filter = parser.parse("name:Alice ; city=Lisbon");
/// assert_eq!(filter, Filter::new().eq("name", "Alice").eq("city", "Lisbon"));
/// ```
#[derive(Debug, Clone)]
pub struct FilterParser {
    separator: Separator,
    assignment: Separator,
}

#[derive(Debug, Clone)]
enum Separator {
    Char(char),
    Pattern(Regex),
}

impl Separator {
    fn pattern(pattern: &str) -> AdapterResult<Self> {
        Regex::new(pattern).map(Separator::Pattern).map_err(|e| {
            AdapterError::Configuration(format!("Invalid separator pattern '{pattern}': {e}"))
        })
    }

    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Separator::Char(c) => text.split(*c).collect(),
            Separator::Pattern(regex) => regex.split(text).collect(),
        }
    }
}

impl FilterParser {
    /// Creates a parser splitting pairs on `separator` and fields from values on `assignment`.
    pub fn new(separator: char, assignment: char) -> Self {
        Self {
            separator: Separator::Char(separator),
            assignment: Separator::Char(assignment),
        }
    }

    /// Creates a parser whose separators are regular expressions.
    ///
    /// # Errors
    ///
    /// [`AdapterError::Configuration`] if either pattern does not compile.
    pub fn with_patterns(separator: &str, assignment: &str) -> AdapterResult<Self> {
        Ok(Self {
            separator: Separator::pattern(separator)?,
            assignment: Separator::pattern(assignment)?,
        })
    }

    pub fn parse(&self, expression: &str) -> Filter {
        let mut predicates = Document::new();

        for segment in self.separator.split(expression) {
            if segment.is_empty() {
                continue;
            }

            let parts = self.assignment.split(segment);
            let value = match parts.as_slice() {
                [_, value] => Bson::String((*value).to_string()),
                _ => Bson::Null,
            };

            predicates.insert(parts[0], value);
        }

        Filter { predicates }
    }
}

impl Default for FilterParser {
    fn default() -> Self {
        Self::new('&', '=')
    }
}
