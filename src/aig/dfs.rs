//! Provides a DFS visitor to allow simple AIG traversal.
//!
//! See [`Dfs`] for details.
//!
//! [`Dfs`]: Dfs

use rustc_hash::FxHashSet;

use crate::{Aig, NodeId};

/// A simple DFS visitor.
///
/// Nodes are yielded in preorder. You can:
/// - start a DFS from a node using [`from_node`]
/// - or visit all the AIG reachable from the outputs using [`from_outputs`].
///
/// In the latter case, it will start by the first output terminal,
/// then explore all non-previously-explored nodes from the second output,
/// and so on until all the outputs have been processed.
///
/// [`from_node`]: Dfs::from_node
/// [`from_outputs`]: Dfs::from_outputs
///
/// Example:
///
/// ```rust
/// use aigclass::{Aig, dfs::Dfs};
/// let mut aig = Aig::new();
/// // You can modify the aig here
/// let mut dfs = Dfs::from_outputs(&aig);
/// while let Some(id) = dfs.next(&aig) {
///     // You can still borrow mut aig here
///     // ...
/// }
/// ```
pub struct Dfs {
    /// Must maintain the following invariant:
    /// - all nodes on the stack have not been visited yet
    /// - their `seen` flag is set to avoid adding them one more time to the stack
    /// - the different outputs from which to start a DFS are in starts
    ///   (they might have been visited already by the time we start the DFS from them,
    ///   and will simply be discarded if that's the case).
    stack: Vec<NodeId>,
    seen: FxHashSet<NodeId>,
    starts: Vec<NodeId>,
}

impl Dfs {
    /// Create a DFS from the initial start node.
    /// You will only browse the fanin cone of this node.
    pub fn from_node(start: NodeId) -> Self {
        let mut seen = FxHashSet::default();
        seen.insert(start);
        Dfs {
            stack: vec![start],
            seen,
            starts: Vec::new(),
        }
    }

    /// Create a DFS from the output terminals of the given AIG.
    pub fn from_outputs(aig: &Aig) -> Self {
        let mut starts: Vec<NodeId> = aig.get_outputs().to_vec();
        starts.reverse();
        let mut dfs = Dfs {
            stack: Vec::new(),
            seen: FxHashSet::default(),
            starts,
        };
        dfs.new_start();
        dfs
    }

    /// Returns true if we are ready to start again! Else false, we are done.
    /// Should only be called when stack is empty (ie we are done with the current fanin).
    fn new_start(&mut self) -> bool {
        debug_assert!(self.stack.is_empty());

        while let Some(id) = self.starts.pop() {
            if self.seen.insert(id) {
                self.stack.push(id);
                return true;
            }
        }
        false
    }

    /// Returns true if the node has already been pushed by this DFS.
    pub fn has_seen(&self, id: NodeId) -> bool {
        self.seen.contains(&id)
    }

    /// Yield the next node of the DFS, or None if it is done.
    /// If you created the DFS with the [`from_outputs`] method,
    /// this might be a new output if the current fanin has been fully explored.
    ///
    /// Ids that do not belong to `aig` are yielded but not expanded.
    ///
    /// [`from_outputs`]: Dfs::from_outputs
    pub fn next(&mut self, aig: &Aig) -> Option<NodeId> {
        loop {
            if let Some(id) = self.stack.pop() {
                if let Some(node) = aig.get_node(id) {
                    // Pushing in reverse so fanin0 is explored first
                    for fanin in node.get_fanins().into_iter().rev() {
                        let child = fanin.get_node_id();
                        if self.seen.insert(child) {
                            self.stack.push(child);
                        }
                    }
                }
                return Some(id);
            }

            // Maybe we can start from a different output?
            if !self.new_start() {
                return None;
            }
        }
    }
}
