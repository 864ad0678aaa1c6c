//! In-memory left-child/right-sibling trie used while building a generation
//!
//! Nodes live in an arena and reference each other by index. Children are
//! always allocated after their parent, which lets subtree weights be
//! computed in a single reverse pass over the arena.

use super::types::{BlockAddress, TrieNode};

/// Index of a node in the arena
pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Clone, Debug)]
struct Node {
    value: char,
    left_child: Option<NodeId>,
    right_sibling: Option<NodeId>,
    end_of_word: bool,
    address: Option<BlockAddress>,
}

impl Node {
    fn new(value: char) -> Self {
        Self {
            value,
            left_child: None,
            right_sibling: None,
            end_of_word: false,
            address: None,
        }
    }
}

/// Build-time trie. Sibling chains are kept in ascending character order.
#[derive(Clone, Debug)]
pub struct LcrsTrie {
    nodes: Vec<Node>,
    word_count: usize,
}

impl LcrsTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new('\0')],
            word_count: 0,
        }
    }

    /// Insert a token and return the node that ends it.
    ///
    /// Returns `None` for the empty token, which the trie cannot hold.
    pub fn insert(&mut self, token: &str) -> Option<NodeId> {
        let mut parent = ROOT;
        for c in token.chars() {
            parent = self.child_or_insert(parent, c);
        }
        if parent == ROOT {
            return None;
        }
        if !self.nodes[parent].end_of_word {
            self.nodes[parent].end_of_word = true;
            self.word_count += 1;
        }
        Some(parent)
    }

    fn child_or_insert(&mut self, parent: NodeId, c: char) -> NodeId {
        let mut prev: Option<NodeId> = None;
        let mut cur = self.nodes[parent].left_child;
        while let Some(id) = cur {
            if self.nodes[id].value >= c {
                break;
            }
            prev = Some(id);
            cur = self.nodes[id].right_sibling;
        }

        if let Some(id) = cur {
            if self.nodes[id].value == c {
                return id;
            }
        }

        let id = self.nodes.len();
        let mut node = Node::new(c);
        node.right_sibling = cur;
        self.nodes.push(node);
        match prev {
            Some(p) => self.nodes[p].right_sibling = Some(id),
            None => self.nodes[parent].left_child = Some(id),
        }
        id
    }

    /// Attach a postings address to a word-ending node
    pub fn set_address(&mut self, node: NodeId, address: BlockAddress) {
        self.nodes[node].address = Some(address);
    }

    /// Find the node ending `token`, if the token was inserted
    pub fn find(&self, token: &str) -> Option<NodeId> {
        let mut node = ROOT;
        for c in token.chars() {
            let mut cur = self.nodes[node].left_child;
            loop {
                match cur {
                    Some(id) if self.nodes[id].value == c => break,
                    Some(id) if self.nodes[id].value < c => cur = self.nodes[id].right_sibling,
                    _ => return None,
                }
            }
            node = cur?;
        }
        (node != ROOT && self.nodes[node].end_of_word).then_some(node)
    }

    /// Check if a token was inserted
    pub fn contains(&self, token: &str) -> bool {
        self.find(token).is_some()
    }

    /// Number of distinct words
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Number of character nodes (excluding the root)
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// Subtree weight of every node, indexed by `NodeId`
    fn weights(&self) -> Vec<u32> {
        let mut weights = vec![0u32; self.nodes.len()];
        for id in (0..self.nodes.len()).rev() {
            let mut weight = 1u32;
            let mut child = self.nodes[id].left_child;
            while let Some(c) = child {
                weight += weights[c];
                child = self.nodes[c].right_sibling;
            }
            weights[id] = weight;
        }
        weights
    }

    /// Flatten the trie into serialized records, depth-first, children
    /// before siblings.
    pub fn preorder(&self) -> Vec<TrieNode> {
        let weights = self.weights();
        let mut records = Vec::with_capacity(self.node_count());
        let mut stack: Vec<(NodeId, u32)> = Vec::new();
        if let Some(first) = self.nodes[ROOT].left_child {
            stack.push((first, 0));
        }

        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            records.push(TrieNode {
                value: node.value,
                has_sibling: node.right_sibling.is_some(),
                has_child: node.left_child.is_some(),
                end_of_word: node.end_of_word,
                depth,
                weight: weights[id],
                address: node.address,
            });
            if let Some(sibling) = node.right_sibling {
                stack.push((sibling, depth));
            }
            if let Some(child) = node.left_child {
                stack.push((child, depth + 1));
            }
        }

        records
    }
}

impl Default for LcrsTrie {
    fn default() -> Self {
        Self::new()
    }
}
