//! CSS selector subset used to locate internal elements.
//! Reference: <https://www.w3.org/TR/selectors-3/>
//!
//! Supported:
//! - Type, universal, class, id, `[attr]` and `[attr=value]` selectors
//! - Descendant and child combinators
//! - Selector lists separated by commas
//!
//! Anything else fails to parse, and an unparsable selector matches nothing.

mod matcher;
mod parser;

pub(crate) use matcher::matches_selector_list;
pub use parser::{parse_complex_selector, parse_selector_list};

/// Simple selectors (subset).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    /// Section 5: type selector, stored in ASCII lowercase.
    Type(String),
    /// Section 6: class selector.
    Class(String),
    /// Section 7: id selector.
    Id(String),
    /// Section 8: `[name]` or `[name=value]`. The name is ASCII lowercase.
    Attribute { name: String, value: Option<String> },
    /// Section 5: universal selector `*`.
    Universal,
}

/// A sequence of simple selectors with no combinator in between.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

/// Section 11: combinators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// One or more compounds separated by combinators, written left to right.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

/// Section 4: groups of selectors.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}
