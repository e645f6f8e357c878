// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Element trees describing segments
//!
//! Trees are arena allocated. Nodes are addressed by [NodeId] and children
//! are kept as ordered lists of ids, so wrapping a node or splicing a copied
//! subtree only rewrites indices.

use alloc::{string::String, vec::Vec};
use core::fmt;

use strum::{Display, EnumIter, EnumString};

/// Element node kinds
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
pub enum ElementKind {
    /// Data element, a leaf carrying raw bytes
    #[strum(serialize = "DE")]
    De,
    /// Data element group, an ordered container
    #[strum(serialize = "DEG")]
    Deg,
    /// Named and versioned group, or an anonymous sequence when untyped
    #[strum(serialize = "GROUP")]
    Group,
}

/// Index of a node within an [ElementTree]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(usize);

/// Element definition / value
#[derive(Clone, PartialEq, Debug)]
pub struct Element {
    pub kind: ElementKind,
    /// Element name, used for argument paths
    pub name: String,
    /// Referenced group type (groups only, empty for none)
    pub type_name: String,
    /// Referenced group version (groups only)
    pub version: u32,
    pub min_num: u32,
    pub max_num: u32,
    /// Encode data as `@len@` binary
    pub binary: bool,
    pub data: Option<Vec<u8>>,
}

impl Element {
    fn new(kind: ElementKind, name: &str) -> Self {
        Self {
            kind,
            name: name.into(),
            type_name: String::new(),
            version: 0,
            min_num: 1,
            max_num: 1,
            binary: false,
            data: None,
        }
    }

    /// Create a new data element
    pub fn de(name: &str) -> Self {
        Self::new(ElementKind::De, name)
    }

    /// Create a new data element group
    pub fn deg(name: &str) -> Self {
        Self::new(ElementKind::Deg, name)
    }

    /// Create a group referencing the definition `type_name` at `version`
    pub fn group(name: &str, type_name: &str, version: u32) -> Self {
        Self {
            type_name: type_name.into(),
            version,
            ..Self::new(ElementKind::Group, name)
        }
    }

    pub fn with_bounds(mut self, min_num: u32, max_num: u32) -> Self {
        self.min_num = min_num;
        self.max_num = max_num;
        self
    }

    pub fn with_data(mut self, data: impl AsRef<[u8]>) -> Self {
        self.data = Some(data.as_ref().to_vec());
        self
    }

    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    /// Check whether this is a data element without content
    pub fn is_empty_de(&self) -> bool {
        self.kind == ElementKind::De && self.data.as_ref().map_or(true, |d| d.is_empty())
    }
}

#[derive(Clone, Debug)]
struct Node {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena allocated element tree
#[derive(Clone, Debug)]
pub struct ElementTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTree {
    /// Create a new tree with an anonymous sequence as root
    pub fn new() -> Self {
        Self::with_root(Element::new(ElementKind::Group, ""))
    }

    /// Create a new tree with the provided root element
    pub fn with_root(root: Element) -> Self {
        Self {
            nodes: alloc::vec![Some(Node {
                element: root,
                parent: None,
                children: Vec::new(),
            })],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes (including the root)
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(|n| n.as_mut())
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.node(id).map(|n| &n.element)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.node_mut(id).map(|n| &mut n.element)
    }

    /// Fetch the kind of a node
    pub fn kind(&self, id: NodeId) -> Option<ElementKind> {
        self.get(id).map(|e| e.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Ordered children of a node, empty for unknown ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| &n.children[..]).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Allocate a new node and append it to `parent`
    pub fn add_child(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            element,
            parent: Some(parent),
            children: Vec::new(),
        }));

        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }

        id
    }

    /// Move an unlinked node under `parent`
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), crate::Error> {
        match self.node(child) {
            Some(n) if n.parent.is_none() && child != self.root => (),
            _ => return Err(crate::Error::InvalidNode),
        }
        if self.node(parent).is_none() {
            return Err(crate::Error::InvalidNode);
        }

        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }

        Ok(())
    }

    /// Detach a node (and its subtree) from its parent, keeping it allocated
    pub fn unlink(&mut self, id: NodeId) {
        let parent = match self.node_mut(id) {
            Some(n) => n.parent.take(),
            None => return,
        };

        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.retain(|c| *c != id);
        }
    }

    /// Detach a node and free its subtree
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }

        self.unlink(id);

        let mut pending = alloc::vec![id];
        while let Some(n) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(n.0).and_then(|n| n.take()) {
                pending.extend(node.children);
            }
        }
    }

    /// Insert a new node in place of `old`, leaving `old` allocated but unlinked
    pub fn replace(&mut self, old: NodeId, element: Element) -> Result<NodeId, crate::Error> {
        let parent = self.parent(old).ok_or(crate::Error::InvalidNode)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            element,
            parent: Some(parent),
            children: Vec::new(),
        }));

        if let Some(p) = self.node_mut(parent) {
            for c in p.children.iter_mut() {
                if *c == old {
                    *c = id;
                }
            }
        }
        if let Some(o) = self.node_mut(old) {
            o.parent = None;
        }

        Ok(id)
    }

    /// Deep copy the subtree at `src_id` in `src` and append it to `parent`
    pub fn copy_from(&mut self, parent: NodeId, src: &ElementTree, src_id: NodeId) -> NodeId {
        let element = match src.get(src_id) {
            Some(e) => e.clone(),
            None => return parent,
        };

        let id = self.add_child(parent, element);
        for c in src.children(src_id) {
            self.copy_from(id, src, *c);
        }

        id
    }

    /// Find a top-level group definition by type name and version
    pub fn find_group(&self, name: &str, version: u32) -> Option<NodeId> {
        self.children(self.root).iter().copied().find(|id| {
            self.get(*id).map_or(false, |e| {
                e.kind == ElementKind::Group && e.name == name && e.version == version
            })
        })
    }

    /// Resolve a `/` separated path of element names from the root
    ///
    /// Unnamed wrapper nodes are transparent.
    pub fn find_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = self.find_named(current, part)?;
        }
        Some(current)
    }

    fn find_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        for c in self.children(parent) {
            match self.get(*c) {
                Some(e) if e.name == name => return Some(*c),
                Some(e) if e.name.is_empty() => {
                    if let Some(n) = self.find_named(*c, name) {
                        return Some(n);
                    }
                }
                _ => (),
            }
        }
        None
    }

    /// Data elements below `id` in depth first order
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.kind(id) {
            Some(ElementKind::De) => out.push(id),
            Some(_) => {
                for c in self.children(id) {
                    self.collect_leaves(*c, out);
                }
            }
            None => (),
        }
    }

    /// Build the `/` separated path of named ancestors for a node
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);

        while let Some(n) = current {
            if n == self.root {
                break;
            }
            if let Some(e) = self.get(n) {
                if !e.name.is_empty() {
                    names.push(e.name.as_str());
                }
            }
            current = self.parent(n);
        }

        names.reverse();
        names.join("/")
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let e = match self.get(id) {
            Some(e) => e,
            None => return Ok(()),
        };

        match e.kind {
            ElementKind::De => write!(f, "DE"),
            ElementKind::Deg => {
                write!(f, "DEG")?;
                self.fmt_children(f, id)
            }
            ElementKind::Group => {
                write!(f, "GROUP({})", e.type_name)?;
                self.fmt_children(f, id)
            }
        }
    }

    fn fmt_children(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.children(id).iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            self.fmt_node(f, *c)?;
        }
        write!(f, "]")
    }
}

/// Display the node shape below the root, eg. `[DEG[DE],DEG[DE]]`
impl fmt::Display for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_children(f, self.root)
    }
}
