// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Element tree normalisation
//!
//! Grammar-described segments arrive as loosely nested trees. Before use the
//! group references are resolved against the group definitions, bare data
//! elements are wrapped in their own DEG, and unset trailing fields are
//! trimmed (the wire format is positional, so trailing empties are dropped).

#[cfg(feature = "log")]
use log::{debug, trace};

use crate::{Element, ElementKind, ElementTree, Error, NodeId};

/// Maximum nesting of group references
pub const MAX_GROUP_DEPTH: usize = 32;

/// Wrap every bare data element in a new DEG, recursing into groups
pub fn normalize(tree: &mut ElementTree) -> Result<(), Error> {
    let root = tree.root();
    normalize_sequence(tree, root)
}

fn normalize_sequence(tree: &mut ElementTree, parent: NodeId) -> Result<(), Error> {
    let children = tree.children(parent).to_vec();

    for id in children {
        let e = match tree.get(id) {
            Some(e) => e,
            None => continue,
        };

        match e.kind {
            ElementKind::Group => normalize_sequence(tree, id)?,
            ElementKind::De => {
                let deg = Element::deg("").with_bounds(e.min_num, e.max_num);

                #[cfg(feature = "log")]
                trace!("Wrapping DE '{}'", e.name);

                let wrapper = tree.replace(id, deg)?;
                tree.append(wrapper, id)?;
            }
            ElementKind::Deg => (),
        }
    }

    Ok(())
}

/// Resolve typed group references against `groups`
///
/// Each group's children become a deep copy of the matching definition's
/// children. Missing definitions return [Error::UnresolvedGroup].
pub fn resolve_groups(tree: &mut ElementTree, groups: &ElementTree) -> Result<(), Error> {
    let root = tree.root();
    resolve(tree, root, groups, 0)
}

fn resolve(
    tree: &mut ElementTree,
    parent: NodeId,
    groups: &ElementTree,
    depth: usize,
) -> Result<(), Error> {
    if depth > MAX_GROUP_DEPTH {
        return Err(Error::GroupDepth(MAX_GROUP_DEPTH));
    }

    let children = tree.children(parent).to_vec();

    for id in children {
        let (kind, type_name, version) = match tree.get(id) {
            Some(e) => (e.kind, e.type_name.clone(), e.version),
            None => continue,
        };

        if kind == ElementKind::Group && !type_name.is_empty() && tree.children(id).is_empty() {
            let def = groups
                .find_group(&type_name, version)
                .ok_or_else(|| Error::UnresolvedGroup {
                    name: type_name.clone(),
                    version,
                })?;

            #[cfg(feature = "log")]
            debug!("Resolved group {}:{}", type_name, version);

            for c in groups.children(def) {
                tree.copy_from(id, groups, *c);
            }
        }

        resolve(tree, id, groups, depth + 1)?;
    }

    Ok(())
}

/// Trim trailing empty data elements and data element groups
pub fn remove_trailing_empty(tree: &mut ElementTree) {
    let root = tree.root();

    for id in tree.children(root).to_vec() {
        if tree.kind(id) == Some(ElementKind::Deg) {
            trim(tree, id);
        }
    }

    trim(tree, root);
}

fn trim(tree: &mut ElementTree, parent: NodeId) {
    while let Some(last) = tree.last_child(parent) {
        let empty = match tree.get(last) {
            Some(e) if e.kind == ElementKind::Deg => tree.children(last).is_empty(),
            Some(e) if e.kind == ElementKind::De => e.is_empty_de(),
            _ => false,
        };

        if !empty {
            break;
        }

        tree.remove(last);
    }
}
