//! Navigation tree document model and structure engine.
//!
//! # Responsibility
//! - Define the persisted tree document shape (`TreeStructure`).
//! - Provide pure structural mutations: add child, remove subtree, rename,
//!   move with reparenting, and subtree-id enumeration.
//!
//! # Invariants
//! - Every node id appears at most once in the forest.
//! - Child ordering is significant and preserved by all mutations.
//! - Mutations never touch the input value; they return a new structure
//!   with `version` advanced by exactly 1, or fail leaving input intact.
//! - All id lookups use depth-first pre-order, first match wins.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Distinguished id of the initial root node.
///
/// The root is a real node: it is a valid `parent_id` target for inserts
/// and moves. Passing `None` as a parent targets the top-level list
/// instead (the root's own sibling level).
pub const ROOT_NODE_ID: &str = "root";

/// Display title of the initial root node.
pub const ROOT_NODE_TITLE: &str = "Home";

/// Stable article/node identifier.
///
/// Kept as a string alias: freshly created articles use UUID v4 text, but
/// the distinguished root id is not a UUID.
pub type NodeId = String;

/// Errors from structural tree mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// `add_child` target parent exists nowhere in the forest.
    ParentNotFound(NodeId),
    /// `update_title` target node does not exist.
    NodeNotFound(NodeId),
    /// `move_node` source node does not exist.
    NodeToMoveNotFound(NodeId),
    /// `move_node` destination parent does not exist after detachment.
    NewParentNotFound(NodeId),
    /// `move_node` destination parent lies inside the moved subtree.
    CyclicMoveRejected { node_id: NodeId, new_parent_id: NodeId },
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParentNotFound(id) => write!(f, "parent node not found: {id}"),
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::NodeToMoveNotFound(id) => write!(f, "node to move not found: {id}"),
            Self::NewParentNotFound(id) => write!(f, "new parent node not found: {id}"),
            Self::CyclicMoveRejected {
                node_id,
                new_parent_id,
            } => write!(
                f,
                "move would place node {node_id} inside its own subtree under {new_parent_id}"
            ),
        }
    }
}

impl Error for TreeError {}

/// One node of the navigation forest.
///
/// `title` is a denormalized copy of the article title; the transaction
/// coordinator keeps it in sync on rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Article id backing this node (or the distinguished root id).
    pub id: NodeId,
    /// Cached display title.
    pub title: String,
    /// Ordered child nodes.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Creates a leaf node with no children.
    pub fn leaf(id: impl Into<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            children: Vec::new(),
        }
    }
}

/// The whole persisted navigation document.
///
/// Serialized field names (`tree`, `version`, `updatedAt`) are the wire
/// format of the stored JSON payload and must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStructure {
    /// Top-level nodes in display order.
    pub tree: Vec<TreeNode>,
    /// Monotonic document version; +1 per committed mutation.
    pub version: u64,
    /// Epoch ms timestamp of the last mutation.
    pub updated_at: i64,
}

impl TreeStructure {
    /// Returns the initial document: a single root node at version 0.
    pub fn initial() -> Self {
        Self {
            tree: vec![TreeNode::leaf(ROOT_NODE_ID, ROOT_NODE_TITLE)],
            version: 0,
            updated_at: now_epoch_ms(),
        }
    }

    /// Returns whether a node with `id` exists anywhere in the forest.
    pub fn contains(&self, id: &str) -> bool {
        find_node(&self.tree, id).is_some()
    }

    /// Appends a new leaf node under `parent_id`, or to the top-level list
    /// when `parent_id` is `None`.
    ///
    /// # Errors
    /// - `TreeError::ParentNotFound` when `parent_id` is given but absent.
    pub fn add_child(
        &self,
        parent_id: Option<&str>,
        new_id: impl Into<NodeId>,
        title: impl Into<String>,
    ) -> Result<TreeStructure, TreeError> {
        let child = TreeNode::leaf(new_id, title);
        let mut nodes = self.tree.clone();

        match parent_id {
            None => nodes.push(child),
            Some(parent_id) => match find_node_mut(&mut nodes, parent_id) {
                Some(parent) => parent.children.push(child),
                None => return Err(TreeError::ParentNotFound(parent_id.to_string())),
            },
        }

        Ok(self.next_with(nodes))
    }

    /// Removes the node with `id` and its whole subtree.
    ///
    /// Removing a missing id is a documented no-op (double-delete
    /// tolerance): the input document is returned unchanged, version
    /// included, and no error is raised.
    pub fn remove_subtree(&self, id: &str) -> TreeStructure {
        let mut nodes = self.tree.clone();
        if detach_node(&mut nodes, id).is_none() {
            return self.clone();
        }
        self.next_with(nodes)
    }

    /// Returns `id` plus every descendant id in pre-order.
    ///
    /// Empty when `id` is not present; callers use this to compute the
    /// cascade-delete set before removing the subtree.
    pub fn subtree_ids(&self, id: &str) -> Vec<NodeId> {
        let mut ids = Vec::new();
        if let Some(node) = find_node(&self.tree, id) {
            collect_ids(node, &mut ids);
        }
        ids
    }

    /// Replaces the title of the node with `id`.
    ///
    /// # Errors
    /// - `TreeError::NodeNotFound` when no node with `id` exists.
    pub fn update_title(
        &self,
        id: &str,
        new_title: impl Into<String>,
    ) -> Result<TreeStructure, TreeError> {
        let mut nodes = self.tree.clone();
        match find_node_mut(&mut nodes, id) {
            Some(node) => node.title = new_title.into(),
            None => return Err(TreeError::NodeNotFound(id.to_string())),
        }
        Ok(self.next_with(nodes))
    }

    /// Moves the subtree rooted at `node_id` under `new_parent_id` (or to
    /// the top-level list when `None`) at sibling position `index`.
    ///
    /// Two-phase on one structural copy: detach the subtree, then reinsert
    /// it, so no intermediate state holds the node twice. An absent `index`
    /// appends; an out-of-range `index` is clamped to the sibling count.
    ///
    /// # Errors
    /// - `TreeError::NodeToMoveNotFound` when `node_id` is absent.
    /// - `TreeError::CyclicMoveRejected` when the destination parent lies
    ///   inside the moved subtree.
    /// - `TreeError::NewParentNotFound` when `new_parent_id` is given but
    ///   absent after detachment.
    pub fn move_node(
        &self,
        node_id: &str,
        new_parent_id: Option<&str>,
        index: Option<usize>,
    ) -> Result<TreeStructure, TreeError> {
        let mut nodes = self.tree.clone();
        let moved = match detach_node(&mut nodes, node_id) {
            Some(node) => node,
            None => return Err(TreeError::NodeToMoveNotFound(node_id.to_string())),
        };

        match new_parent_id {
            None => insert_at(&mut nodes, moved, index),
            Some(parent_id) => {
                if subtree_contains(&moved, parent_id) {
                    return Err(TreeError::CyclicMoveRejected {
                        node_id: node_id.to_string(),
                        new_parent_id: parent_id.to_string(),
                    });
                }
                match find_node_mut(&mut nodes, parent_id) {
                    Some(parent) => insert_at(&mut parent.children, moved, index),
                    None => return Err(TreeError::NewParentNotFound(parent_id.to_string())),
                }
            }
        }

        Ok(self.next_with(nodes))
    }

    fn next_with(&self, nodes: Vec<TreeNode>) -> TreeStructure {
        TreeStructure {
            tree: nodes,
            version: self.version + 1,
            updated_at: now_epoch_ms(),
        }
    }
}

/// Returns the current time as epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

fn find_node<'forest>(nodes: &'forest [TreeNode], id: &str) -> Option<&'forest TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut<'forest>(
    nodes: &'forest mut [TreeNode],
    id: &str,
) -> Option<&'forest mut TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn detach_node(nodes: &mut Vec<TreeNode>, id: &str) -> Option<TreeNode> {
    let mut cursor = 0;
    while cursor < nodes.len() {
        if nodes[cursor].id == id {
            return Some(nodes.remove(cursor));
        }
        if let Some(found) = detach_node(&mut nodes[cursor].children, id) {
            return Some(found);
        }
        cursor += 1;
    }
    None
}

fn insert_at(siblings: &mut Vec<TreeNode>, node: TreeNode, index: Option<usize>) {
    match index {
        Some(index) => siblings.insert(index.min(siblings.len()), node),
        None => siblings.push(node),
    }
}

fn subtree_contains(node: &TreeNode, id: &str) -> bool {
    node.id == id || node.children.iter().any(|child| subtree_contains(child, id))
}

fn collect_ids(node: &TreeNode, ids: &mut Vec<NodeId>) {
    ids.push(node.id.clone());
    for child in &node.children {
        collect_ids(child, ids);
    }
}
