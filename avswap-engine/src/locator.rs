//! Playback element discovery
//!
//! Search order under a root:
//! 1. The root's ordinary tree, depth-first in document order
//! 2. The nested root of the first player wrapper in that tree
//! 3. Every nested root in the ordinary tree, recursively (full search)
//!
//! Absence is the common case (player not mounted yet, ad overlay, teardown)
//! and is reported as `None`.

use crate::error::{Error, Result};
use crate::host::{ElementRef, NodeRef};

/// Stateless playback element search
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementLocator;

impl ElementLocator {
    pub fn locate(root: &NodeRef) -> Option<ElementRef> {
        if let Some(element) = find_in_tree(root) {
            return Some(element);
        }

        if let Some(nested) = find_player_wrapper(root).and_then(|w| w.nested_root()) {
            if let Some(element) = find_in_tree(&nested) {
                return Some(element);
            }
        }

        let mut hosts = Vec::new();
        collect_nested_roots(root, &mut hosts);
        hosts.iter().find_map(Self::locate)
    }

    /// Like `locate`, for callers that treat absence as an error
    pub fn require(root: &NodeRef) -> Result<ElementRef> {
        Self::locate(root).ok_or(Error::ElementNotFound)
    }
}

/// Descendants of `root` (not `root` itself) in document order,
/// without entering nested roots
fn for_each_descendant<F>(root: &NodeRef, visit: &mut F) -> bool
where
    F: FnMut(&NodeRef) -> bool,
{
    for child in root.children() {
        if visit(&child) || for_each_descendant(&child, visit) {
            return true;
        }
    }
    false
}

fn find_in_tree(root: &NodeRef) -> Option<ElementRef> {
    let mut found = None;
    for_each_descendant(root, &mut |node| {
        found = node.playback_element();
        found.is_some()
    });
    found
}

fn find_player_wrapper(root: &NodeRef) -> Option<NodeRef> {
    let mut found = None;
    for_each_descendant(root, &mut |node| {
        if node.is_player_wrapper() {
            found = Some(node.clone());
        }
        found.is_some()
    });
    found
}

fn collect_nested_roots(root: &NodeRef, out: &mut Vec<NodeRef>) {
    for_each_descendant(root, &mut |node| {
        if let Some(nested) = node.nested_root() {
            out.push(nested);
        }
        false
    });
}
