use std::fmt;

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node<P>>` where children are referenced by
/// [`NodeIndex`] rather than pointers. `P` is the leaf prediction: a class
/// label (`String`) or a continuous value (`f64`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node<P> {
    /// An interior split node.
    Split {
        /// Feature column used for the split.
        feature: String,
        /// Rows with `value < threshold` go left, all others go right.
        threshold: f64,
        /// Split quality reported by the feature selector (Gini gain or squared error).
        quality: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Distance from the root (root is 0).
        depth: usize,
        /// Training rows that reached this node.
        rows: Vec<usize>,
    },
    /// A terminal leaf node.
    Leaf {
        /// Majority label or mean response of the rows in this leaf.
        prediction: P,
        /// Distance from the root (root is 0).
        depth: usize,
        /// Training rows that reached this leaf.
        rows: Vec<usize>,
    },
}

impl<P> Node<P> {
    /// Return the depth of this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Node::Split { depth, .. } | Node::Leaf { depth, .. } => *depth,
        }
    }

    /// Return the training rows that reached this node.
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        match self {
            Node::Split { rows, .. } | Node::Leaf { rows, .. } => rows,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
