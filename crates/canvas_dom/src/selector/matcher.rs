//! Selector matching against the document arena.

use indextree::NodeId;

use super::{Combinator, ComplexSelector, CompoundSelector, SelectorList, SimpleSelector};
use crate::document::DomTree;

/// Match a selector list against an element.
pub(crate) fn matches_selector_list(tree: &DomTree, element: NodeId, list: &SelectorList) -> bool {
    list.selectors
        .iter()
        .any(|selector_item| matches_complex(tree, element, selector_item))
}

/// Match a complex selector right-to-left, backtracking over descendant combinators.
fn matches_complex(tree: &DomTree, element: NodeId, sel: &ComplexSelector) -> bool {
    match_at(tree, element, sel, sel.rest.len())
}

/// Compound at `index` (0 = `first`, n = `rest[n - 1]`) must match `element`,
/// and everything to its left must match some ancestor chain.
fn match_at(tree: &DomTree, element: NodeId, sel: &ComplexSelector, index: usize) -> bool {
    let (compound, combinator) = match index.checked_sub(1) {
        None => (&sel.first, None),
        Some(pair_index) => match sel.rest.get(pair_index) {
            Some((combinator, compound)) => (compound, Some(*combinator)),
            None => return false,
        },
    };
    if !matches_compound(tree, element, compound) {
        return false;
    }
    let Some(combinator) = combinator else {
        return true;
    };
    let left = index.saturating_sub(1);
    match combinator {
        Combinator::Child => tree
            .parent_element(element)
            .is_some_and(|parent| match_at(tree, parent, sel, left)),
        Combinator::Descendant => {
            let mut ancestor = tree.parent_element(element);
            while let Some(current) = ancestor {
                if match_at(tree, current, sel, left) {
                    return true;
                }
                ancestor = tree.parent_element(current);
            }
            false
        }
    }
}

/// Match a compound selector against a single element.
fn matches_compound(tree: &DomTree, element: NodeId, compound: &CompoundSelector) -> bool {
    let Some(tag) = tree.tag(element) else {
        return false;
    };
    compound.simples.iter().all(|simple| match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(type_name) => tag == type_name,
        SimpleSelector::Class(class) => tree.attr(element, "class").is_some_and(|classes| {
            classes
                .split_ascii_whitespace()
                .any(|token| token == class)
        }),
        SimpleSelector::Id(id) => tree.attr(element, "id") == Some(id.as_str()),
        SimpleSelector::Attribute { name, value } => match (tree.attr(element, name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        },
    })
}
