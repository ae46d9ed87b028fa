//! Exploration tree for planning mode.
//!
//! Nodes live in one arena and refer to each other by [`NodeId`]. The first
//! child of a node is its main line; later children are variations. A
//! cursor marks the node currently shown, and is always a real node.

use crate::board::{Color, PlayedMove};
use crate::sgf::encode_move;

/// Index of a node in its [`GameTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    /// `None` only for the root.
    mv: Option<PlayedMove>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct GameTree {
    nodes: Vec<Node>,
    current: NodeId,
}

impl Default for GameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                mv: None,
                parent: None,
                children: Vec::new(),
            }],
            current: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn is_at_root(&self) -> bool {
        self.current == self.root()
    }

    /// Move stored at `id`; `None` for the root.
    pub fn move_at(&self, id: NodeId) -> Option<PlayedMove> {
        self.nodes[id.0].mv
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Play `mv` after the current node and move the cursor onto it.
    ///
    /// If the current node already has a child with the same move, the
    /// cursor moves there instead and no node is created.
    pub fn add_move(&mut self, mv: PlayedMove) -> NodeId {
        let parent = self.current;
        if let Some(&existing) = self.nodes[parent.0]
            .children
            .iter()
            .find(|c| self.nodes[c.0].mv == Some(mv))
        {
            self.current = existing;
            return existing;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            mv: Some(mv),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        self.current = id;
        id
    }

    /// Step to the parent. Returns false at the root.
    pub fn back(&mut self) -> bool {
        match self.nodes[self.current.0].parent {
            Some(parent) => {
                self.current = parent;
                true
            }
            None => false,
        }
    }

    /// Step to child `index` (0 is the main line). Returns false if there is
    /// no such child.
    pub fn forward(&mut self, index: usize) -> bool {
        match self.nodes[self.current.0].children.get(index) {
            Some(&child) => {
                self.current = child;
                true
            }
            None => false,
        }
    }

    fn siblings(&self) -> &[NodeId] {
        match self.nodes[self.current.0].parent {
            Some(parent) => &self.nodes[parent.0].children,
            None => &[],
        }
    }

    fn cycle_variation(&mut self, step: isize) -> bool {
        let siblings = self.siblings();
        let count = siblings.len();
        if count < 2 {
            return false;
        }
        let index = self.variation_index() as isize;
        let next = siblings[(index + step).rem_euclid(count as isize) as usize];
        self.current = next;
        true
    }

    /// Switch to the next sibling, wrapping around. No-op at the root or
    /// without alternatives.
    pub fn next_variation(&mut self) -> bool {
        self.cycle_variation(1)
    }

    pub fn prev_variation(&mut self) -> bool {
        self.cycle_variation(-1)
    }

    /// Number of alternatives at the current node's position, itself
    /// included. The root counts as one.
    pub fn num_variations(&self) -> usize {
        self.siblings().len().max(1)
    }

    /// Position of the current node among its siblings.
    pub fn variation_index(&self) -> usize {
        let current = self.current;
        self.siblings()
            .iter()
            .position(|&s| s == current)
            .unwrap_or(0)
    }

    pub fn has_children(&self) -> bool {
        !self.nodes[self.current.0].children.is_empty()
    }

    /// Moves from the root down to the cursor.
    pub fn path_from_root(&self) -> Vec<PlayedMove> {
        let mut path = Vec::new();
        let mut id = Some(self.current);
        while let Some(node) = id.map(|i| &self.nodes[i.0]) {
            if let Some(mv) = node.mv {
                path.push(mv);
            }
            id = node.parent;
        }
        path.reverse();
        path
    }

    /// Colour to play after the cursor, given who moved first.
    pub fn next_color(&self, first: Color) -> Color {
        self.nodes[self.current.0]
            .mv
            .map_or(first, |m| m.color.opponent())
    }

    /// Serialise the whole tree, variations included, as an SGF game tree
    /// for a `size` board.
    pub fn to_sgf(&self, size: usize) -> String {
        let mut out = format!("(;GM[1]FF[4]SZ[{size}]");
        self.write_line(self.root(), &mut out);
        out.push_str(")\n");
        out
    }

    /// Write the children of `id`: a single child continues the sequence,
    /// several open one parenthesised sub-tree each.
    fn write_line(&self, mut id: NodeId, out: &mut String) {
        loop {
            let children = &self.nodes[id.0].children;
            match children.len() {
                0 => return,
                1 => {
                    id = children[0];
                    self.write_node(id, out);
                }
                _ => {
                    for &child in children {
                        out.push('(');
                        self.write_node(child, out);
                        self.write_line(child, out);
                        out.push(')');
                    }
                    return;
                }
            }
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        if let Some(mv) = self.nodes[id.0].mv {
            out.push(';');
            out.push_str(&encode_move(mv));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Move;

    fn b(x: usize, y: usize) -> PlayedMove {
        PlayedMove::new(Color::Black, Move::Place((x, y)))
    }

    fn w(x: usize, y: usize) -> PlayedMove {
        PlayedMove::new(Color::White, Move::Place((x, y)))
    }

    #[test]
    fn test_add_and_navigate() {
        let mut tree = GameTree::new();
        assert!(tree.is_at_root());
        assert!(!tree.back());

        let first = tree.add_move(b(3, 3));
        let second = tree.add_move(w(4, 4));
        assert_eq!(tree.current(), second);
        assert_eq!(tree.path_from_root(), vec![b(3, 3), w(4, 4)]);

        assert!(tree.back());
        assert_eq!(tree.current(), first);
        assert!(tree.has_children());
        assert!(tree.forward(0));
        assert_eq!(tree.current(), second);
        assert!(!tree.forward(0));
    }

    #[test]
    fn test_dedup() {
        let mut tree = GameTree::new();
        tree.add_move(b(3, 3));
        let a = tree.add_move(w(4, 4));
        tree.back();
        let again = tree.add_move(w(4, 4));
        assert_eq!(a, again);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.num_variations(), 1);
    }

    #[test]
    fn test_variations_cycle() {
        let mut tree = GameTree::new();
        tree.add_move(b(3, 3));
        let main = tree.add_move(w(4, 4));
        tree.back();
        let alt = tree.add_move(w(5, 5));
        tree.back();
        let third = tree.add_move(w(6, 6));

        assert_eq!(tree.num_variations(), 3);
        assert_eq!(tree.variation_index(), 2);
        assert!(tree.next_variation());
        assert_eq!(tree.current(), main);
        assert!(tree.prev_variation());
        assert_eq!(tree.current(), third);
        assert!(tree.prev_variation());
        assert_eq!(tree.current(), alt);
        assert_eq!(tree.variation_index(), 1);
    }

    #[test]
    fn test_variation_noop_cases() {
        let mut tree = GameTree::new();
        assert!(!tree.next_variation());
        assert_eq!(tree.num_variations(), 1);
        let only = tree.add_move(b(0, 0));
        assert!(!tree.next_variation());
        assert!(!tree.prev_variation());
        assert_eq!(tree.current(), only);
    }

    #[test]
    fn test_next_color() {
        let mut tree = GameTree::new();
        assert_eq!(tree.next_color(Color::White), Color::White);
        tree.add_move(w(0, 0));
        assert_eq!(tree.next_color(Color::White), Color::Black);
        tree.add_move(PlayedMove::new(Color::Black, Move::Pass));
        assert_eq!(tree.next_color(Color::White), Color::White);
    }

    #[test]
    fn test_to_sgf() {
        let mut tree = GameTree::new();
        assert_eq!(tree.to_sgf(9), "(;GM[1]FF[4]SZ[9])\n");

        tree.add_move(b(0, 0));
        tree.add_move(w(1, 1));
        tree.add_move(b(2, 2));
        tree.back();
        tree.back();
        tree.add_move(w(3, 3));
        assert_eq!(
            tree.to_sgf(9),
            "(;GM[1]FF[4]SZ[9];B[aa](;W[bb];B[cc])(;W[dd]))\n"
        );
    }
}
