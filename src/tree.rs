//! # Taproot Script Trees
//!
//! Script trees are stored as an arena of nodes addressed by [`NodeId`].
//! A [`TreeBuilder`] appends leaves and branches; every branch refers to two
//! nodes created before it, and each node may be attached to one parent only,
//! so the arena is always a forest of acyclic trees. Branch hashes are
//! computed the moment a branch is added, children first, without recursion.
//!
//! [`TreeBuilder::finalize`] seals the arena into a [`ScriptTree`], which only
//! offers read-only traversal and can be shared between threads.
//!
//! Every arena gets its own tag and each [`NodeId`] carries the tag of the
//! arena that issued it, so an id handed to a different tree is rejected
//! instead of silently naming one of that tree's nodes.
//!
//! Trees are described either as a nested [`TreeShape`] or as a [`FlatTree`]
//! listing the arena itself. The flat form has the same JSON nesting at any
//! depth and is the one written to commitment records.
//!
//! ## Branch Hashing
//!
//! ```text
//! branch_hash(a, b) = tagged_hash("TapBranch", min(a, b) || max(a, b))
//! ```
//!
//! Swapping two children never changes a hash above them; regrouping leaves
//! or changing the depth of a leaf does.

use crate::config::taproot::MAX_TREE_DEPTH;
use crate::error::{TaprootError, TaprootResult};
use crate::leaf::{Leaf, LeafVersion};
use crate::tagged_hash::TapNodeHash;
use bitcoin::Script;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ARENA: AtomicU64 = AtomicU64::new(1);

fn next_arena() -> u64 {
    NEXT_ARENA.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a node of one particular tree.
///
/// Only meaningful for the builder that issued it and the tree sealed from
/// that builder (and its clones); any other tree rejects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    arena: u64,
    index: usize,
}

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

#[derive(Clone, Debug)]
enum Node {
    Leaf {
        leaf: Leaf,
        hash: TapNodeHash,
    },
    Branch {
        left: NodeId,
        right: NodeId,
        hash: TapNodeHash,
        height: usize,
    },
}

impl Node {
    fn hash(&self) -> TapNodeHash {
        match self {
            Node::Leaf { hash, .. } | Node::Branch { hash, .. } => *hash,
        }
    }

    fn height(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Branch { height, .. } => *height,
        }
    }
}

/// Sibling hashes proving a leaf's membership, ordered leaf-to-root
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MerklePath(Vec<TapNodeHash>);

impl MerklePath {
    /// Wrap sibling hashes that are already in leaf-to-root order
    pub fn from_hashes(hashes: Vec<TapNodeHash>) -> TaprootResult<Self> {
        if hashes.len() > MAX_TREE_DEPTH {
            return Err(TaprootError::TreeTooDeep {
                depth: hashes.len(),
                max: MAX_TREE_DEPTH,
            });
        }
        Ok(MerklePath(hashes))
    }

    /// Number of siblings, equal to the depth of the leaf
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path is empty (single-leaf tree)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate siblings from the leaf upwards
    pub fn iter(&self) -> std::slice::Iter<'_, TapNodeHash> {
        self.0.iter()
    }

    /// Sibling hashes as a slice
    pub fn as_slice(&self) -> &[TapNodeHash] {
        &self.0
    }

    /// Fold the path into a starting hash, reconstructing the root
    pub fn fold_root(&self, start: TapNodeHash) -> TapNodeHash {
        self.0
            .iter()
            .fold(start, |acc, sibling| TapNodeHash::from_node_hashes(acc, *sibling))
    }
}

impl<'a> IntoIterator for &'a MerklePath {
    type Item = &'a TapNodeHash;
    type IntoIter = std::slice::Iter<'a, TapNodeHash>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Nested description of a tree shape.
///
/// In JSON a leaf is an object and a branch is a two-element array.
///
/// ```json
/// [[{"script": "51"}, {"script": "52"}], {"script": "53"}]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeShape {
    /// A single leaf
    Leaf(Leaf),
    /// Two subtrees joined by a branch
    Branch(Box<TreeShape>, Box<TreeShape>),
}

impl TreeShape {
    /// Join two shapes under a new branch
    pub fn branch(left: TreeShape, right: TreeShape) -> Self {
        TreeShape::Branch(Box::new(left), Box::new(right))
    }

    /// Parse a nested shape from JSON.
    ///
    /// serde_json stops at 128 nested values, fewer than a full-depth tree
    /// needs, so nesting is measured first and the parser's own limit is
    /// lifted only for documents that fit within the tree depth limit.
    ///
    /// # Errors
    /// - `TreeTooDeep` if the document nests deeper than a valid tree can
    /// - `Json` for anything serde_json rejects
    pub fn from_json(json: &str) -> TaprootResult<Self> {
        // One extra level for the leaf objects
        let nesting = json_nesting(json);
        if nesting > MAX_TREE_DEPTH + 1 {
            return Err(TaprootError::TreeTooDeep {
                depth: nesting - 1,
                max: MAX_TREE_DEPTH,
            });
        }
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let shape = TreeShape::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(shape)
    }
}

/// Deepest bracket nesting in a JSON document, ignoring string contents
fn json_nesting(json: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in json.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// One arena slot of a [`FlatTree`]: a leaf object or a pair of child indices
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatNode {
    /// A leaf
    Leaf(Leaf),
    /// Positions of the left and right children
    Branch([usize; 2]),
}

/// Arena listing of a tree.
///
/// Children come before the branch joining them and the root is the last
/// entry. A branch names its children by position in the list:
///
/// ```json
/// [{"script": "51"}, {"script": "52"}, [0, 1], {"script": "53"}, [2, 3]]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatTree(pub Vec<FlatNode>);

/// Mutable construction phase of a script tree
#[derive(Debug)]
pub struct TreeBuilder {
    arena: u64,
    nodes: Vec<Node>,
    attached: Vec<bool>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            arena: next_arena(),
            nodes: Vec::new(),
            attached: Vec::new(),
        }
    }
}

impl TreeBuilder {
    /// Start an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf and return its id
    pub fn leaf(&mut self, leaf: Leaf) -> NodeId {
        let hash = TapNodeHash::from(leaf.leaf_hash());
        self.push(Node::Leaf { leaf, hash })
    }

    /// Join two existing subtrees under a new branch.
    ///
    /// # Errors
    /// - `PreconditionViolated` if either id is unknown or issued by another
    ///   builder, already attached to a parent, or both ids are the same node
    /// - `TreeTooDeep` if the new subtree would be more than 128 levels deep
    pub fn branch(&mut self, left: NodeId, right: NodeId) -> TaprootResult<NodeId> {
        if left == right {
            return Err(TaprootError::precondition(
                "two distinct subtrees",
                format!("{} used for both children", left),
            ));
        }
        for id in [left, right] {
            if id.arena != self.arena {
                return Err(TaprootError::precondition(
                    "a node of this builder",
                    format!("node {} from another tree", id),
                ));
            }
            match self.attached.get(id.index) {
                None => {
                    return Err(TaprootError::precondition(
                        "a node of this builder",
                        format!("unknown node {}", id),
                    ))
                }
                Some(true) => {
                    return Err(TaprootError::precondition(
                        "an unattached subtree",
                        format!("node {} already has a parent", id),
                    ))
                }
                Some(false) => {}
            }
        }

        let left_node = &self.nodes[left.index];
        let right_node = &self.nodes[right.index];
        let height = 1 + left_node.height().max(right_node.height());
        if height > MAX_TREE_DEPTH {
            return Err(TaprootError::TreeTooDeep {
                depth: height,
                max: MAX_TREE_DEPTH,
            });
        }
        let hash = TapNodeHash::from_node_hashes(left_node.hash(), right_node.hash());

        self.attached[left.index] = true;
        self.attached[right.index] = true;
        Ok(self.push(Node::Branch {
            left,
            right,
            hash,
            height,
        }))
    }

    /// Hash of a node added to this builder
    pub fn node_hash(&self, id: NodeId) -> Option<TapNodeHash> {
        if id.arena != self.arena {
            return None;
        }
        self.nodes.get(id.index).map(Node::hash)
    }

    /// Seal the arena with `root` as the tree root.
    ///
    /// # Errors
    /// - `PreconditionViolated` if `root` is unknown or has a parent, or if
    ///   any other node is left outside the tree
    pub fn finalize(self, root: NodeId) -> TaprootResult<ScriptTree> {
        if root.arena != self.arena {
            return Err(TaprootError::precondition(
                "a node of this builder",
                format!("root {} from another tree", root),
            ));
        }
        match self.attached.get(root.index) {
            None => {
                return Err(TaprootError::precondition(
                    "a node of this builder",
                    format!("unknown root {}", root),
                ))
            }
            Some(true) => {
                return Err(TaprootError::precondition(
                    "a root without a parent",
                    format!("node {} is attached to a branch", root),
                ))
            }
            Some(false) => {}
        }
        let dangling = self
            .attached
            .iter()
            .enumerate()
            .filter(|(index, attached)| !**attached && *index != root.index)
            .count();
        if dangling > 0 {
            return Err(TaprootError::precondition(
                "every node reachable from the root",
                format!("{} detached subtree(s)", dangling),
            ));
        }

        let mut parents = vec![None; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if let Node::Branch { left, right, .. } = node {
                let parent = NodeId {
                    arena: self.arena,
                    index,
                };
                parents[left.index] = Some(parent);
                parents[right.index] = Some(parent);
            }
        }

        let tree = ScriptTree {
            arena: self.arena,
            nodes: self.nodes,
            parents,
            root: Some(root),
        };
        log::debug!(
            "Sealed script tree: {} leaves, depth {}, root {}",
            tree.leaf_count(),
            tree.depth(),
            root
        );
        Ok(tree)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.attached.push(false);
        NodeId {
            arena: self.arena,
            index: self.nodes.len() - 1,
        }
    }
}

/// Sealed, read-only script tree
#[derive(Clone, Debug)]
pub struct ScriptTree {
    arena: u64,
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
    root: Option<NodeId>,
}

impl ScriptTree {
    /// Tree with no leaves; commits to the internal key alone
    pub fn empty() -> Self {
        Self {
            arena: next_arena(),
            nodes: Vec::new(),
            parents: Vec::new(),
            root: None,
        }
    }

    /// Tree holding exactly one leaf at depth 0
    pub fn single(leaf: Leaf) -> Self {
        let mut builder = TreeBuilder::new();
        let root = builder.leaf(leaf);
        Self {
            arena: builder.arena,
            nodes: builder.nodes,
            parents: vec![None],
            root: Some(root),
        }
    }

    /// Rebuild a tree from its arena listing.
    ///
    /// # Errors
    /// - `PreconditionViolated` if a branch names itself, a later entry or an
    ///   already used child, or if an entry is left outside the tree
    /// - `TreeTooDeep` if any branch exceeds the depth limit
    pub fn from_flat(flat: &FlatTree) -> TaprootResult<Self> {
        let mut builder = TreeBuilder::new();
        let mut ids: Vec<NodeId> = Vec::with_capacity(flat.0.len());
        for node in &flat.0 {
            let id = match node {
                FlatNode::Leaf(leaf) => builder.leaf(leaf.clone()),
                FlatNode::Branch([left, right]) => match (ids.get(*left), ids.get(*right)) {
                    (Some(left), Some(right)) => builder.branch(*left, *right)?,
                    _ => {
                        return Err(TaprootError::precondition(
                            "children listed before their branch",
                            format!("entry {} joins [{}, {}]", ids.len(), left, right),
                        ))
                    }
                },
            };
            ids.push(id);
        }
        match ids.last() {
            Some(root) => builder.finalize(*root),
            None => Ok(ScriptTree::empty()),
        }
    }

    /// Build a tree from a nested shape description.
    ///
    /// Walks the shape with an explicit stack so deep trees do not recurse.
    pub fn from_shape(shape: &TreeShape) -> TaprootResult<Self> {
        enum Step<'a> {
            Visit(&'a TreeShape),
            Join,
        }

        let mut builder = TreeBuilder::new();
        let mut steps = vec![Step::Visit(shape)];
        let mut built: Vec<NodeId> = Vec::new();

        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(TreeShape::Leaf(leaf)) => built.push(builder.leaf(leaf.clone())),
                Step::Visit(TreeShape::Branch(left, right)) => {
                    steps.push(Step::Join);
                    steps.push(Step::Visit(right.as_ref()));
                    steps.push(Step::Visit(left.as_ref()));
                }
                Step::Join => {
                    let (right, left) = match (built.pop(), built.pop()) {
                        (Some(right), Some(left)) => (right, left),
                        _ => unreachable!("every join follows two visited subtrees"),
                    };
                    built.push(builder.branch(left, right)?);
                }
            }
        }

        match built.pop() {
            Some(root) => builder.finalize(root),
            None => Ok(ScriptTree::empty()),
        }
    }

    /// Build the most balanced tree over `leaves`, pairing neighbours level by level.
    ///
    /// An empty list yields the key-only tree.
    pub fn balanced(leaves: Vec<Leaf>) -> TaprootResult<Self> {
        let mut builder = TreeBuilder::new();
        let mut level: Vec<NodeId> = leaves.into_iter().map(|leaf| builder.leaf(leaf)).collect();
        if level.is_empty() {
            return Ok(ScriptTree::empty());
        }
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                match pair {
                    [left, right] => next.push(builder.branch(*left, *right)?),
                    [odd] => next.push(*odd),
                    _ => unreachable!("chunks(2) yields one or two ids"),
                }
            }
            level = next;
        }
        builder.finalize(level[0])
    }

    /// Merkle root, or `None` for a key-only tree
    pub fn merkle_root(&self) -> Option<TapNodeHash> {
        self.root.map(|root| self.nodes[root.index].hash())
    }

    /// Whether the tree has no leaves
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Root node id
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Height of the tree; the depth of its deepest leaf
    pub fn depth(&self) -> usize {
        self.root.map_or(0, |root| self.nodes[root.index].height())
    }

    /// Iterate leaves in arena order
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Leaf)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(index, node)| match node {
            Node::Leaf { leaf, .. } => Some((
                NodeId {
                    arena: self.arena,
                    index,
                },
                leaf,
            )),
            Node::Branch { .. } => None,
        })
    }

    /// Look up a leaf by id
    pub fn leaf(&self, id: NodeId) -> Option<&Leaf> {
        match self.slot(id) {
            Some(Node::Leaf { leaf, .. }) => Some(leaf),
            _ => None,
        }
    }

    /// Find the first leaf holding `script` under `version`
    pub fn find_leaf(&self, script: &Script, version: LeafVersion) -> Option<NodeId> {
        self.leaves()
            .find(|(_, leaf)| leaf.script() == script && leaf.version() == version)
            .map(|(id, _)| id)
    }

    /// Hash of any node
    pub fn node_hash(&self, id: NodeId) -> Option<TapNodeHash> {
        self.slot(id).map(Node::hash)
    }

    /// Depth of a leaf: the number of branches between it and the root
    pub fn leaf_depth(&self, id: NodeId) -> TaprootResult<usize> {
        self.require_leaf(id)?;
        Ok(self.ancestors(id).count())
    }

    /// Sibling hashes for `id`, ordered leaf-to-root as the control block
    /// carries them.
    ///
    /// # Errors
    /// - `PreconditionViolated` if `id` is not a leaf of this tree, including
    ///   ids issued for another tree
    pub fn sibling_path(&self, id: NodeId) -> TaprootResult<MerklePath> {
        self.require_leaf(id)?;
        let mut siblings = Vec::new();
        let mut child = id;
        for parent in self.ancestors(id) {
            let sibling = match &self.nodes[parent.index] {
                Node::Branch { left, right, .. } if *left == child => *right,
                Node::Branch { left, .. } => *left,
                Node::Leaf { .. } => unreachable!("a parent is always a branch"),
            };
            siblings.push(self.nodes[sibling.index].hash());
            child = parent;
        }
        MerklePath::from_hashes(siblings)
    }

    /// Nested description of this tree, `None` when empty
    pub fn shape(&self) -> Option<TreeShape> {
        let root = self.root?;
        let mut shapes: Vec<Option<TreeShape>> = vec![None; self.nodes.len()];
        // Children always precede their parent in the arena
        for (index, node) in self.nodes.iter().enumerate() {
            let shape = match node {
                Node::Leaf { leaf, .. } => TreeShape::Leaf(leaf.clone()),
                Node::Branch { left, right, .. } => TreeShape::branch(
                    shapes[left.index].take()?,
                    shapes[right.index].take()?,
                ),
            };
            shapes[index] = Some(shape);
        }
        shapes[root.index].take()
    }

    /// Arena listing of this tree, `None` when empty
    pub fn flatten(&self) -> Option<FlatTree> {
        self.root?;
        // The root is the only node without a parent, so it is always last
        let nodes = self
            .nodes
            .iter()
            .map(|node| match node {
                Node::Leaf { leaf, .. } => FlatNode::Leaf(leaf.clone()),
                Node::Branch { left, right, .. } => FlatNode::Branch([left.index, right.index]),
            })
            .collect();
        Some(FlatTree(nodes))
    }

    fn slot(&self, id: NodeId) -> Option<&Node> {
        if id.arena != self.arena {
            return None;
        }
        self.nodes.get(id.index)
    }

    fn require_leaf(&self, id: NodeId) -> TaprootResult<()> {
        if id.arena != self.arena {
            return Err(TaprootError::precondition(
                "a leaf of this tree",
                format!("node {} from another tree", id),
            ));
        }
        match self.nodes.get(id.index) {
            Some(Node::Leaf { .. }) => Ok(()),
            Some(Node::Branch { .. }) => Err(TaprootError::precondition(
                "a leaf node",
                format!("branch {}", id),
            )),
            None => Err(TaprootError::precondition(
                "a leaf of this tree",
                format!("unknown node {}", id),
            )),
        }
    }

    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parents[id.index], move |node| self.parents[node.index])
    }
}
