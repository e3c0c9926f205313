//! Prefix tree of registered mount roots.
//!
//! Nodes live in an arena and are addressed by [`NodeId`], a small index
//! handed out at insertion time. Nodes carry no payload: the mount table
//! keeps its own per-node side tables indexed by the same ids.
//!
//! The tree only ever contains the segments of registered mount roots. A
//! path deeper than a mount root is not resolved node by node here; it is
//! handed to that mount's backend as a native sub-path.

use mountspace_types::fold_eq;

use crate::path;

/// Stable index of a node in a [`MountTrie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every trie.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct TrieNode {
    segment: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Result of walking a path down the trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    /// Every node matched, root first.
    pub nodes: Vec<NodeId>,
    /// True if every segment of the path matched a node.
    pub complete: bool,
}

impl Walk {
    /// The deepest node matched.
    pub fn last(&self) -> NodeId {
        self.nodes.last().copied().unwrap_or(NodeId::ROOT)
    }
}

/// Prefix tree of mount roots, keyed by case-insensitive segment.
#[derive(Debug, Clone)]
pub struct MountTrie {
    separator: char,
    nodes: Vec<TrieNode>,
}

impl MountTrie {
    /// Create a trie containing only the root node.
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            nodes: vec![TrieNode {
                segment: String::new(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Insert `path`, creating one node per missing segment.
    ///
    /// Idempotent: inserting the same path (in any case) again returns the
    /// same node. Inserting the root path returns [`NodeId::ROOT`].
    pub fn insert(&mut self, path: &str) -> NodeId {
        let mut current = NodeId::ROOT;
        for segment in path::split(path, self.separator) {
            current = match self.child(current, segment) {
                Some(child) => child,
                None => {
                    let id = NodeId(self.nodes.len());
                    self.nodes.push(TrieNode {
                        segment: segment.to_string(),
                        parent: Some(current),
                        children: Vec::new(),
                    });
                    self.nodes[current.0].children.push(id);
                    id
                }
            };
        }
        current
    }

    /// Best partial match: the deepest node whose path is a prefix of `path`.
    ///
    /// Never fails. If not even the first segment matches, the root is
    /// returned.
    pub fn find(&self, path: &str) -> NodeId {
        self.walk(path).last()
    }

    /// Walk `path` from the root, recording every node matched.
    pub fn walk(&self, path: &str) -> Walk {
        let mut nodes = vec![NodeId::ROOT];
        let mut current = NodeId::ROOT;
        for segment in path::split(path, self.separator) {
            match self.child(current, segment) {
                Some(child) => {
                    current = child;
                    nodes.push(child);
                }
                None => return Walk { nodes, complete: false },
            }
        }
        Walk { nodes, complete: true }
    }

    /// The segment a node was inserted with (empty for the root).
    pub fn segment(&self, node: NodeId) -> &str {
        &self.nodes[node.0].segment
    }

    /// Children of a node, in insertion order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Full folder path of a node, rebuilt from its ancestors.
    pub fn path_of(&self, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut target = node;
        while let Some(parent) = self.nodes[target.0].parent {
            segments.push(self.segment(target));
            target = parent;
        }
        let mut out = String::new();
        out.push(self.separator);
        for segment in segments.iter().rev() {
            out.push_str(segment);
            out.push(self.separator);
        }
        out
    }

    fn child(&self, node: NodeId, segment: &str) -> Option<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .find(|c| fold_eq(&self.nodes[c.0].segment, segment))
    }
}
