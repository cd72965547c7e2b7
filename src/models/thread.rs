// src/models/thread.rs

//! Reply nodes and flattened threads.
//!
//! A [`Thread`] stores its nodes in depth-first pre-order: the head post
//! first, and every reply immediately followed by all of its descendants
//! before any of its siblings. That order plus `parent_id` is enough to
//! rebuild the nesting, see [`Thread::into_tree`].

use serde::{Deserialize, Serialize};

use crate::models::TopicMeta;
use crate::utils::date::PostDate;

/// Id used when a node carries no readable id.
pub const UNKNOWN_ID: i64 = -1;

/// One post of a thread (the head post or a reply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyNode {
    pub id: i64,

    /// Id of the topic's head post
    pub head_id: i64,

    /// Id of the replied-to post; `None` for the head and top-level replies
    pub parent_id: Option<i64>,

    pub is_head: bool,

    /// Written by the topic starter; `None` when the author IP is unknown
    pub by_owner: Option<bool>,

    pub date: Option<PostDate>,
    pub rating: i64,
    pub author_name: String,

    #[serde(default)]
    pub title: Vec<String>,

    /// Paragraphs of the post body
    #[serde(default)]
    pub text: Vec<String>,
}

/// A thread flattened in pre-order, head first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thread {
    nodes: Vec<ReplyNode>,
}

/// A node with its children, rebuilt from a flat [`Thread`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTree {
    pub node: ReplyNode,
    pub children: Vec<ReplyTree>,
}

impl Thread {
    pub fn new(head: ReplyNode) -> Self {
        Self { nodes: vec![head] }
    }

    pub fn from_nodes(nodes: Vec<ReplyNode>) -> Self {
        Self { nodes }
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = ReplyNode>) {
        self.nodes.extend(nodes);
    }

    pub fn head(&self) -> Option<&ReplyNode> {
        self.nodes.first()
    }

    /// Every node except the head.
    pub fn replies(&self) -> &[ReplyNode] {
        self.nodes.get(1..).unwrap_or_default()
    }

    pub fn nodes(&self) -> &[ReplyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check the pre-order layout.
    ///
    /// The first node must be the head; every other node must name as parent
    /// a node on the current ancestor chain (or no parent, meaning the head),
    /// so descendants sit contiguously after their ancestor.
    pub fn is_preorder(&self) -> bool {
        let Some((head, rest)) = self.nodes.split_first() else {
            return true;
        };
        if !head.is_head || rest.iter().any(|n| n.is_head) {
            return false;
        }

        let mut chain: Vec<i64> = Vec::new();
        for node in rest {
            if let Some(parent) = node.parent_id {
                match chain.iter().rposition(|id| *id == parent) {
                    Some(pos) => chain.truncate(pos + 1),
                    None if parent == head.id => chain.clear(),
                    None => return false,
                }
            } else {
                chain.clear();
            }
            chain.push(node.id);
        }
        true
    }

    /// Depth of the deepest node; the head alone is depth 1.
    pub fn max_depth(&self) -> usize {
        self.clone().into_tree().map_or(0, |tree| tree.depth())
    }

    /// Rebuild the nested tree using only order and `parent_id`.
    ///
    /// Parentless replies, and replies whose parent is not on the current
    /// ancestor chain, hang directly under the head.
    pub fn into_tree(self) -> Option<ReplyTree> {
        let mut nodes = self.nodes.into_iter();
        let head = nodes.next()?;

        let mut arena: Vec<Option<ReplyNode>> = vec![Some(head)];
        let mut children: Vec<Vec<usize>> = vec![Vec::new()];
        let mut chain: Vec<usize> = Vec::new();

        for node in nodes {
            let index = arena.len();
            let parent = node.parent_id.and_then(|pid| {
                chain
                    .iter()
                    .rposition(|&i| arena[i].as_ref().is_some_and(|n| n.id == pid))
            });
            let parent_index = match parent {
                Some(pos) => {
                    chain.truncate(pos + 1);
                    chain[pos]
                }
                None => {
                    chain.clear();
                    0
                }
            };

            children[parent_index].push(index);
            children.push(Vec::new());
            arena.push(Some(node));
            chain.push(index);
        }

        Self::assemble(0, &mut arena, &children)
    }

    fn assemble(
        index: usize,
        arena: &mut [Option<ReplyNode>],
        children: &[Vec<usize>],
    ) -> Option<ReplyTree> {
        let node = arena[index].take()?;
        let children = children[index]
            .iter()
            .filter_map(|&child| Self::assemble(child, arena, children))
            .collect();
        Some(ReplyTree { node, children })
    }
}

impl ReplyTree {
    /// Levels in this subtree, counting this node.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(ReplyTree::depth).max().unwrap_or(0)
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ReplyTree::size).sum::<usize>()
    }

    /// Flatten back into pre-order.
    pub fn flatten(self) -> Thread {
        fn walk(tree: ReplyTree, out: &mut Vec<ReplyNode>) {
            out.push(tree.node);
            for child in tree.children {
                walk(child, out);
            }
        }

        let mut nodes = Vec::new();
        walk(self, &mut nodes);
        Thread::from_nodes(nodes)
    }
}

/// Topic metadata together with its reconstructed thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    #[serde(flatten)]
    pub topic: TopicMeta,

    pub replies: Thread,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, parent_id: Option<i64>) -> ReplyNode {
        ReplyNode {
            id,
            head_id: 1,
            parent_id,
            is_head: id == 1,
            by_owner: None,
            date: None,
            rating: 0,
            author_name: format!("user{id}"),
            title: vec![],
            text: vec![],
        }
    }

    /// head(1)
    /// ├── 10
    /// │   ├── 11
    /// │   │   └── 12
    /// │   └── 13
    /// └── 20
    ///     └── 21
    fn sample() -> Thread {
        Thread::from_nodes(vec![
            node(1, None),
            node(10, None),
            node(11, Some(10)),
            node(12, Some(11)),
            node(13, Some(10)),
            node(20, None),
            node(21, Some(20)),
        ])
    }

    #[test]
    fn test_sample_is_preorder() {
        assert!(sample().is_preorder());
    }

    #[test]
    fn test_sibling_before_descendant_is_not_preorder() {
        let thread = Thread::from_nodes(vec![
            node(1, None),
            node(10, None),
            node(20, None),
            node(11, Some(10)),
        ]);
        assert!(!thread.is_preorder());
    }

    #[test]
    fn test_parent_after_child_is_not_preorder() {
        let thread = Thread::from_nodes(vec![node(1, None), node(11, Some(10)), node(10, None)]);
        assert!(!thread.is_preorder());
    }

    #[test]
    fn test_reply_to_head_id_is_preorder() {
        let thread = Thread::from_nodes(vec![node(1, None), node(10, Some(1)), node(11, Some(10))]);
        assert!(thread.is_preorder());
    }

    #[test]
    fn test_into_tree_shape() {
        let tree = sample().into_tree().unwrap();
        assert_eq!(tree.node.id, 1);
        assert_eq!(tree.size(), 7);
        assert_eq!(tree.depth(), 4);

        let top: Vec<i64> = tree.children.iter().map(|c| c.node.id).collect();
        assert_eq!(top, vec![10, 20]);

        let under_10: Vec<i64> = tree.children[0].children.iter().map(|c| c.node.id).collect();
        assert_eq!(under_10, vec![11, 13]);
    }

    #[test]
    fn test_round_trip_keeps_order_and_depth() {
        let thread = sample();
        let depth = thread.max_depth();
        let rebuilt = thread.clone().into_tree().unwrap().flatten();

        assert_eq!(rebuilt, thread);
        assert_eq!(rebuilt.max_depth(), depth);
    }

    #[test]
    fn test_unknown_ids_attach_to_nearest_ancestor() {
        let thread = Thread::from_nodes(vec![
            node(1, None),
            node(UNKNOWN_ID, None),
            node(5, Some(UNKNOWN_ID)),
            node(UNKNOWN_ID, None),
        ]);
        let tree = thread.into_tree().unwrap();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].children[0].node.id, 5);
    }

    #[test]
    fn test_empty_thread() {
        assert!(Thread::default().into_tree().is_none());
        assert_eq!(Thread::default().max_depth(), 0);
        assert!(Thread::default().replies().is_empty());
    }

    #[test]
    fn test_thread_serializes_as_list() {
        let thread = Thread::new(node(1, None));
        let value = serde_json::to_value(&thread).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["is_head"], true);
    }
}
