//! Selector parsing and matching.
//!
//! Supported grammar:
//!
//! ```text
//! list      := complex ( "," complex )*
//! complex   := compound ( combinator compound )*
//! combinator:= whitespace | ">"
//! compound  := ( "*" | tag )? ( "." class | "#" id | "[" attr ( "=" value )? "]" )*
//! value     := ident | '"' .. '"' | "'" .. "'"
//! ```
//!
//! Matching runs right to left: the last compound is tested against the
//! candidate, and combinators walk outwards through parent links.

use std::fmt;

use super::element::Element;
use crate::error::SelectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Class(String),
    Id(String),
    Attribute { name: String, value: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    /// `None` for `*` or when no type selector is given.
    tag: Option<String>,
    simples: Vec<Simple>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.simples.is_empty()
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag() != tag {
                return false;
            }
        }
        self.simples.iter().all(|simple| match simple {
            Simple::Class(class) => element.has_class(class),
            Simple::Id(id) => element.id().as_deref() == Some(id.as_str()),
            Simple::Attribute { name, value: None } => element.has_attribute(name),
            Simple::Attribute {
                name,
                value: Some(expected),
            } => element.attribute(name).as_deref() == Some(expected.as_str()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// `parts[0] combinators[0] parts[1] ... parts[n]`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, element: &Element) -> bool {
        self.matches_from(element, self.parts.len() - 1)
    }

    fn matches_from(&self, element: &Element, index: usize) -> bool {
        if !self.parts[index].matches(element) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => element
                .parent()
                .is_some_and(|parent| self.matches_from(&parent, index - 1)),
            Combinator::Descendant => {
                let mut ancestor = element.parent();
                while let Some(current) = ancestor {
                    if self.matches_from(&current, index - 1) {
                        return true;
                    }
                    ancestor = current.parent();
                }
                false
            }
        }
    }
}

/// A parsed, comma-separated selector list.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let selectors = Parser::new(source).parse_list()?;
        Ok(Self {
            source: source.to_string(),
            selectors,
        })
    }

    /// The selector text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, element: &Element) -> bool {
        self.selectors.iter().any(|complex| complex.matches(element))
    }
}

impl fmt::Debug for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SelectorList").field(&self.source).finish()
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        if self.source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut selectors = vec![self.parse_complex()?];
        while let Some(&(_, ',')) = self.chars.peek() {
            self.chars.next();
            selectors.push(self.parse_complex()?);
        }
        Ok(selectors)
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut parts = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.chars.peek() {
                None | Some(&(_, ',')) => break,
                Some(&(_, '>')) => {
                    self.chars.next();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(&(offset, found)) => {
                    return Err(SelectorError::UnexpectedChar { found, offset })
                }
            };
            combinators.push(combinator);
            parts.push(self.parse_compound()?);
        }

        Ok(Complex { parts, combinators })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.chars.peek() {
            Some(&(_, '*')) => {
                self.chars.next();
                universal = true;
            }
            Some(&(_, c)) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        while let Some(&(offset, c)) = self.chars.peek() {
            match c {
                '.' => {
                    self.chars.next();
                    compound.simples.push(Simple::Class(self.parse_ident()?));
                }
                '#' => {
                    self.chars.next();
                    compound.simples.push(Simple::Id(self.parse_ident()?));
                }
                '[' => {
                    self.chars.next();
                    compound.simples.push(self.parse_attribute(offset)?);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return match self.chars.peek() {
                Some(&(offset, found)) => Err(SelectorError::UnexpectedChar { found, offset }),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }
        Ok(compound)
    }

    fn parse_attribute(&mut self, start: usize) -> Result<Simple, SelectorError> {
        self.skip_whitespace();
        let name = self
            .parse_ident()
            .map_err(|_| SelectorError::UnterminatedAttribute { offset: start })?
            .to_ascii_lowercase();
        self.skip_whitespace();

        let value = match self.chars.next() {
            Some((_, ']')) => return Ok(Simple::Attribute { name, value: None }),
            Some((_, '=')) => {
                self.skip_whitespace();
                self.parse_value(start)?
            }
            Some((offset, found)) => return Err(SelectorError::UnexpectedChar { found, offset }),
            None => return Err(SelectorError::UnterminatedAttribute { offset: start }),
        };

        self.skip_whitespace();
        match self.chars.next() {
            Some((_, ']')) => Ok(Simple::Attribute {
                name,
                value: Some(value),
            }),
            Some((offset, found)) => Err(SelectorError::UnexpectedChar { found, offset }),
            None => Err(SelectorError::UnterminatedAttribute { offset: start }),
        }
    }

    fn parse_value(&mut self, start: usize) -> Result<String, SelectorError> {
        match self.chars.peek() {
            Some(&(_, quote @ ('"' | '\''))) => {
                self.chars.next();
                let mut value = String::new();
                for (_, c) in self.chars.by_ref() {
                    if c == quote {
                        return Ok(value);
                    }
                    value.push(c);
                }
                Err(SelectorError::UnterminatedAttribute { offset: start })
            }
            _ => self.parse_ident(),
        }
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !is_ident_char(c) {
                break;
            }
            ident.push(c);
            self.chars.next();
        }
        if ident.is_empty() {
            return match self.chars.peek() {
                Some(&(offset, found)) => Err(SelectorError::UnexpectedChar { found, offset }),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }
        Ok(ident)
    }

    /// Returns whether any whitespace was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            skipped = true;
            self.chars.next();
        }
        skipped
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
