//! Selector parsing.

use super::{Combinator, ComplexSelector, CompoundSelector, SelectorList, SimpleSelector};

/// Byte cursor over a selector string.
struct Cursor<'src> {
    input: &'src str,
    index: usize,
}

impl<'src> Cursor<'src> {
    const fn new(input: &'src str) -> Self {
        Self { input, index: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.index).copied()
    }

    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Skip whitespace, returning whether any was present.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.index;
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.bump();
        }
        self.index != start
    }

    fn is_ident_byte(byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
    }

    /// Consume an identifier; `None` if there is none at the cursor.
    fn ident(&mut self) -> Option<&'src str> {
        let start = self.index;
        while self.peek().is_some_and(Self::is_ident_byte) {
            self.bump();
        }
        if self.index == start {
            return None;
        }
        self.input.get(start..self.index)
    }

    /// Consume a quoted string or a bare identifier inside `[name=value]`.
    fn attribute_value(&mut self) -> Option<&'src str> {
        match self.peek()? {
            quote @ (b'"' | b'\'') => {
                self.bump();
                let start = self.index;
                while self.peek()? != quote {
                    self.bump();
                }
                let value = self.input.get(start..self.index)?;
                self.bump();
                Some(value)
            }
            _ => self.ident(),
        }
    }

    fn attribute(&mut self) -> Option<SimpleSelector> {
        // Cursor sits on '['.
        self.bump();
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.peek()? {
            b']' => None,
            b'=' => {
                self.bump();
                self.skip_whitespace();
                let value = self.attribute_value()?.to_owned();
                self.skip_whitespace();
                Some(value)
            }
            _ => return None,
        };
        if self.peek()? != b']' {
            return None;
        }
        self.bump();
        Some(SimpleSelector::Attribute { name, value })
    }

    fn compound(&mut self) -> Option<CompoundSelector> {
        let mut simples = Vec::new();
        while let Some(byte) = self.peek() {
            let simple = match byte {
                b'*' => {
                    self.bump();
                    SimpleSelector::Universal
                }
                b'.' => {
                    self.bump();
                    SimpleSelector::Class(self.ident()?.to_owned())
                }
                b'#' => {
                    self.bump();
                    SimpleSelector::Id(self.ident()?.to_owned())
                }
                b'[' => self.attribute()?,
                _ if Self::is_ident_byte(byte) && simples.is_empty() => {
                    SimpleSelector::Type(self.ident()?.to_ascii_lowercase())
                }
                _ => break,
            };
            simples.push(simple);
        }
        (!simples.is_empty()).then_some(CompoundSelector { simples })
    }
}

/// Parse one complex selector such as `div.card > button[type=submit]`.
pub fn parse_complex_selector(input: &str) -> Option<ComplexSelector> {
    let mut cursor = Cursor::new(input);
    cursor.skip_whitespace();
    let first = cursor.compound()?;
    let mut rest = Vec::new();
    loop {
        let saw_whitespace = cursor.skip_whitespace();
        let combinator = match cursor.peek() {
            None => break,
            Some(b'>') => {
                cursor.bump();
                cursor.skip_whitespace();
                Combinator::Child
            }
            Some(_) if saw_whitespace => Combinator::Descendant,
            Some(_) => return None,
        };
        rest.push((combinator, cursor.compound()?));
    }
    Some(ComplexSelector { first, rest })
}

/// Split on top-level commas, ignoring commas inside quotes or brackets.
fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<u8> = None;
    let mut depth = 0_usize;
    for (index, byte) in input.bytes().enumerate() {
        match (quote, byte) {
            (Some(open), _) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'[') => depth = depth.saturating_add(1),
            (None, b']') => depth = depth.saturating_sub(1),
            (None, b',') if depth == 0 => {
                parts.push(input.get(start..index).unwrap_or_default());
                start = index.saturating_add(1);
            }
            (None, _) => {}
        }
    }
    parts.push(input.get(start..).unwrap_or_default());
    parts
}

/// Parse a comma-separated selector list. Any unsupported part fails the whole list.
pub fn parse_selector_list(input: &str) -> Option<SelectorList> {
    let selectors = split_list(input)
        .into_iter()
        .map(parse_complex_selector)
        .collect::<Option<Vec<_>>>()?;
    (!selectors.is_empty()).then_some(SelectorList { selectors })
}
