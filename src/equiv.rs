//! Equivalence classes over the nodes of an [`Aig`].
//!
//! A [`Partition`] stores candidate equivalences with two mirrored encodings:
//! - `repr[i]`, the class head node `i` is conjectured (or proved) equivalent to, always
//!   strictly smaller than `i`;
//! - `next[i]`, the next member of the class of `i`, always strictly greater than `i`.
//!
//! Heads have no representative. Members whose representative is node 0 form the
//! constant class: they are conjectured constant (up to their phase).
//!
//! Every `(member, head)` pair carries a `proved` flag (the pair was shown equivalent by an
//! external prover) and a `failed` flag (the pair must not be used). Two more color bits are
//! left to algorithms, see [`crate::choice`].
//!
//! Node polarity is implicit: two nodes are equivalent up to complementation, the
//! complementation being given by their [phases](Aig::phases).

mod colors;
mod improve;
mod remap;

use std::fmt::Display;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::{Aig, AigNode, NodeId};

pub use colors::SideColors;

/// Error returned when an operation on equivalence classes fails.
#[derive(Debug, Error)]
pub enum EquivError {
    /// The partition was built for an AIG of a different size.
    #[error("partition covers {partition} nodes but the AIG has {aig} nodes")]
    PartitionSizeMismatch { partition: usize, aig: usize },

    /// A node id does not fit in the partition.
    #[error("node {node} is out of range (partition has {len} nodes)")]
    NodeOutOfRange { node: NodeId, len: usize },

    /// Representatives must be class heads with a strictly smaller id.
    #[error("node {repr} cannot be the representative of node {node}")]
    InvalidRepresentative { node: NodeId, repr: NodeId },

    /// Next links must point to strictly greater ids, each node being linked at most once.
    #[error("node {next} cannot follow node {node}")]
    InvalidNext { node: NodeId, next: NodeId },

    /// The two encodings of the partition disagree.
    #[error("broken partition invariant: {0}")]
    BrokenInvariant(String),

    /// Only the constant, inputs and and gates can belong to classes.
    #[error("node {0} is an output terminal and cannot belong to a class")]
    OutputInClass(NodeId),

    /// Dual-output operations need outputs paired two by two.
    #[error("dual-output mode needs an even number of primary outputs, got {0}")]
    OddDualOutputs(usize),

    /// Substituting representatives would create a combinational loop.
    #[error("substitution creates a combinational cycle through node {0}")]
    CombinationalCycle(NodeId),
}

/// Kind of a node with respect to its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Member of the constant class (its representative is node 0).
    Const,
    /// Smallest member of a class with at least two members.
    Head,
    /// Member of a class that is not the head.
    Follower,
    /// Not in any class.
    None,
}

/// Per-node flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub proved: bool,
    pub failed: bool,
    pub color_a: bool,
    pub color_b: bool,
}

/// Counters describing a partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionStats {
    /// Members of the constant class.
    pub constants: usize,
    /// Classes, constant class excluded.
    pub classes: usize,
    /// Nodes with a representative.
    pub candidates: usize,
    pub proved: usize,
    pub failed: usize,
    pub largest_class: usize,
}

impl Display for PartitionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "const = {}  class = {}  lit = {}  proved = {}  failed = {}  max = {}",
            self.constants,
            self.classes,
            self.candidates,
            self.proved,
            self.failed,
            self.largest_class
        )
    }
}

/// Equivalence classes over the nodes of an AIG, see the [module documentation](self).
///
/// ```rust
/// use aigclass::equiv::{ClassKind, Partition};
/// let mut p = Partition::with_len(8);
/// p.merge_pair(6, 3).unwrap();
/// p.merge_pair(5, 6).unwrap();
/// assert_eq!(p.repr(6), Some(3));
/// assert_eq!(p.repr(5), Some(3));
/// assert_eq!(p.class_members(3).collect::<Vec<_>>(), vec![3, 5, 6]);
/// assert_eq!(p.class_kind(3), ClassKind::Head);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    repr: Vec<Option<NodeId>>,
    next: Vec<Option<NodeId>>,
    flags: Vec<NodeFlags>,
    /// Preferred implementation of every class (see [`Partition::improve_representative`]).
    leaders: FxHashMap<NodeId, NodeId>,
    improved: bool,
}

/// Iterator over the members of a class, head first.
pub struct ClassMembers<'a> {
    partition: &'a Partition,
    current: Option<NodeId>,
}

impl Iterator for ClassMembers<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.partition.next(id);
        Some(id)
    }
}

impl Partition {
    /// A partition without any class.
    pub fn with_len(len: usize) -> Self {
        Partition {
            repr: vec![None; len],
            next: vec![None; len],
            flags: vec![NodeFlags::default(); len],
            leaders: FxHashMap::default(),
            improved: false,
        }
    }

    /// Builds a partition from representatives. Every representative must be strictly
    /// smaller than its node and be a head itself (no representative).
    pub fn from_representatives(repr: Vec<Option<NodeId>>) -> Result<Self, EquivError> {
        for (i, r) in repr.iter().enumerate() {
            if let Some(r) = *r {
                if r as usize >= i || repr[r as usize].is_some() {
                    return Err(EquivError::InvalidRepresentative {
                        node: i as NodeId,
                        repr: r,
                    });
                }
            }
        }
        let mut partition = Partition::with_len(repr.len());
        partition.repr = repr;
        partition.derive_next_from_representative();
        Ok(partition)
    }

    /// Builds a partition from next links. Every link must point to a strictly greater id,
    /// and every node can be pointed at only once.
    pub fn from_next(next: Vec<Option<NodeId>>) -> Result<Self, EquivError> {
        let mut linked = vec![false; next.len()];
        for (i, n) in next.iter().enumerate() {
            if let Some(n) = *n {
                if n as usize <= i
                    || n as usize >= next.len()
                    || std::mem::replace(&mut linked[n as usize], true)
                {
                    return Err(EquivError::InvalidNext {
                        node: i as NodeId,
                        next: n,
                    });
                }
            }
        }
        let mut partition = Partition::with_len(next.len());
        partition.next = next;
        partition.derive_representative_from_next();
        Ok(partition)
    }

    /// Builds a partition by merging every pair, see [`Partition::merge_pair`].
    pub fn from_pairs(len: usize, pairs: &[(NodeId, NodeId)]) -> Result<Self, EquivError> {
        let mut partition = Partition::with_len(len);
        for &(a, b) in pairs {
            partition.merge_pair(a, b)?;
        }
        Ok(partition)
    }

    pub fn len(&self) -> usize {
        self.repr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repr.is_empty()
    }

    fn check_range(&self, node: NodeId) -> Result<(), EquivError> {
        if (node as usize) < self.len() {
            Ok(())
        } else {
            Err(EquivError::NodeOutOfRange {
                node,
                len: self.len(),
            })
        }
    }

    /// The class head of `id`, `None` for heads and nodes outside classes.
    pub fn repr(&self, id: NodeId) -> Option<NodeId> {
        self.repr.get(id as usize).copied().flatten()
    }

    /// The next member of the class of `id`.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.next.get(id as usize).copied().flatten()
    }

    pub fn representatives(&self) -> &[Option<NodeId>] {
        &self.repr
    }

    pub fn nexts(&self) -> &[Option<NodeId>] {
        &self.next
    }

    /// The head of the class containing `id` (`id` itself for heads and unclassified nodes).
    pub fn class_of(&self, id: NodeId) -> NodeId {
        self.repr(id).unwrap_or(id)
    }

    pub fn class_kind(&self, id: NodeId) -> ClassKind {
        match self.repr(id) {
            Some(0) => ClassKind::Const,
            Some(_) => ClassKind::Follower,
            None if self.next(id).is_some() => ClassKind::Head,
            None => ClassKind::None,
        }
    }

    /// Returns true if `id` heads a class (the constant class headed by node 0 included).
    pub fn is_head(&self, id: NodeId) -> bool {
        self.class_kind(id) == ClassKind::Head
    }

    /// Returns true if `id` has a representative.
    pub fn is_candidate(&self, id: NodeId) -> bool {
        self.repr(id).is_some()
    }

    /// Members of the class headed by `head`, head first and in increasing id order.
    pub fn class_members(&self, head: NodeId) -> ClassMembers<'_> {
        ClassMembers {
            partition: self,
            current: Some(head).filter(|&h| (h as usize) < self.len()),
        }
    }

    /// Heads of non-constant classes, in increasing id order.
    pub fn heads(&self) -> impl Iterator<Item = NodeId> + '_ {
        (1..self.len() as NodeId).filter(|&id| self.is_head(id))
    }

    /// Nodes with a representative (live candidates), in increasing id order.
    pub fn live_candidates(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.len() as NodeId).filter(|&id| self.is_candidate(id))
    }

    /// Members of the constant class, node 0 excluded.
    pub fn constant_candidates(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.len() as NodeId).filter(|&id| self.repr(id) == Some(0))
    }

    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.flags.get(id as usize).copied().unwrap_or_default()
    }

    pub fn is_proved(&self, id: NodeId) -> bool {
        self.flags(id).proved
    }

    pub fn is_failed(&self, id: NodeId) -> bool {
        self.flags(id).failed
    }

    /// Marks the pair `(id, repr(id))` as proved (or not).
    pub fn set_proved(&mut self, id: NodeId, proved: bool) -> Result<(), EquivError> {
        self.check_range(id)?;
        self.flags[id as usize].proved = proved;
        Ok(())
    }

    /// Marks the pair `(id, repr(id))` as failed: it will never be used for reduction.
    pub fn set_failed(&mut self, id: NodeId, failed: bool) -> Result<(), EquivError> {
        self.check_range(id)?;
        self.flags[id as usize].failed = failed;
        Ok(())
    }

    pub fn set_color_a(&mut self, id: NodeId, color: bool) -> Result<(), EquivError> {
        self.check_range(id)?;
        self.flags[id as usize].color_a = color;
        Ok(())
    }

    pub fn set_color_b(&mut self, id: NodeId, color: bool) -> Result<(), EquivError> {
        self.check_range(id)?;
        self.flags[id as usize].color_b = color;
        Ok(())
    }

    /// Clears both color bits of every node.
    pub fn clear_colors(&mut self) {
        for flags in &mut self.flags {
            flags.color_a = false;
            flags.color_b = false;
        }
    }

    /// Leaders only make sense for the classes they were computed on.
    fn forget_leaders(&mut self) {
        if self.improved {
            debug!("class structure changed, dropping improved representatives");
        }
        self.leaders.clear();
        self.improved = false;
    }

    /// Rebuilds `next` from `repr`: every follower is appended to the chain of its head,
    /// in increasing id order.
    pub fn derive_next_from_representative(&mut self) {
        self.next = self.derived_next();
        self.forget_leaders();
    }

    fn derived_next(&self) -> Vec<Option<NodeId>> {
        let mut tail: Vec<NodeId> = (0..self.len() as NodeId).collect();
        let mut next = vec![None; self.len()];
        for i in 0..self.len() {
            if let Some(r) = self.repr[i] {
                let last = tail[r as usize];
                next[last as usize] = Some(i as NodeId);
                tail[r as usize] = i as NodeId;
            }
        }
        next
    }

    /// Rebuilds `repr` from `next`: every node reachable from a head through next links
    /// gets that head as representative.
    pub fn derive_representative_from_next(&mut self) {
        self.repr.iter_mut().for_each(|r| *r = None);
        for head in 0..self.len() {
            if self.repr[head].is_some() {
                continue;
            }
            let mut current = self.next[head];
            while let Some(member) = current {
                self.repr[member as usize] = Some(head as NodeId);
                current = self.next[member as usize];
            }
        }
        self.forget_leaders();
    }

    /// Unions the classes of `a` and `b`.
    ///
    /// The class with the greater head is attached under the smaller head, so the merged
    /// class is headed by its smallest member whatever the order of the calls.
    /// Proved flags of the re-homed members are cleared, their new pairing being a conjecture.
    ///
    /// Returns true if two different classes were merged.
    pub fn merge_pair(&mut self, a: NodeId, b: NodeId) -> Result<bool, EquivError> {
        self.check_range(a)?;
        self.check_range(b)?;
        let (root_a, root_b) = (self.class_of(a), self.class_of(b));
        if root_a == root_b {
            return Ok(false);
        }
        let (lo, hi) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };

        let moved: Vec<NodeId> = self.class_members(hi).collect();
        for &m in &moved {
            self.repr[m as usize] = Some(lo);
            self.flags[m as usize].proved = false;
        }

        // Both chains are sorted, merging them keeps the merged chain sorted
        let kept: Vec<NodeId> = self.class_members(lo).collect();
        let (mut i, mut j) = (0, 0);
        let mut merged = Vec::with_capacity(kept.len() + moved.len());
        while i < kept.len() || j < moved.len() {
            if j == moved.len() || (i < kept.len() && kept[i] < moved[j]) {
                merged.push(kept[i]);
                i += 1;
            } else {
                merged.push(moved[j]);
                j += 1;
            }
        }
        for pair in merged.windows(2) {
            self.next[pair[0] as usize] = Some(pair[1]);
        }
        if let Some(&last) = merged.last() {
            self.next[last as usize] = None;
        }

        self.forget_leaders();
        Ok(true)
    }

    /// Removes a follower from its class. Returns false if `id` has no representative.
    pub fn excise(&mut self, id: NodeId) -> bool {
        let Some(head) = self.repr(id) else {
            return false;
        };
        let mut prev = head;
        while let Some(n) = self.next(prev) {
            if n == id {
                break;
            }
            prev = n;
        }
        self.next[prev as usize] = self.next[id as usize];
        self.next[id as usize] = None;
        self.repr[id as usize] = None;
        self.flags[id as usize].proved = false;
        self.flags[id as usize].failed = false;
        self.forget_leaders();
        true
    }

    /// Number of nodes with a representative.
    pub fn count_live_candidates(&self) -> usize {
        self.repr.iter().filter(|r| r.is_some()).count()
    }

    /// Number of classes, the constant class excluded.
    pub fn count_classes(&self) -> usize {
        self.heads().count()
    }

    /// Returns true if no node has a representative.
    pub fn has_no_classes(&self) -> bool {
        self.repr.iter().all(Option::is_none)
    }

    pub fn stats(&self) -> PartitionStats {
        let mut stats = PartitionStats {
            constants: self.constant_candidates().count(),
            ..Default::default()
        };
        for id in self.live_candidates() {
            stats.candidates += 1;
            stats.proved += self.is_proved(id) as usize;
            stats.failed += self.is_failed(id) as usize;
        }
        for head in self.heads() {
            stats.classes += 1;
            stats.largest_class = stats.largest_class.max(self.class_members(head).count());
        }
        stats
    }

    /// Checks that `repr` and `next` are well formed and mirror each other.
    pub fn check(&self) -> Result<(), EquivError> {
        if self.next.len() != self.len() || self.flags.len() != self.len() {
            return Err(EquivError::BrokenInvariant(
                "arrays of different lengths".to_string(),
            ));
        }
        for i in 0..self.len() as NodeId {
            if let Some(r) = self.repr(i) {
                if r >= i || self.repr(r).is_some() {
                    return Err(EquivError::InvalidRepresentative { node: i, repr: r });
                }
            }
            if let Some(n) = self.next(i) {
                if n <= i || (n as usize) >= self.len() {
                    return Err(EquivError::InvalidNext { node: i, next: n });
                }
                if self.repr(n) != Some(self.class_of(i)) {
                    return Err(EquivError::BrokenInvariant(format!(
                        "node {} follows {} but is not in its class",
                        n, i
                    )));
                }
            }
        }
        if self.derived_next() != self.next {
            return Err(EquivError::BrokenInvariant(
                "next links do not list every class member in order".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks that the partition can be used with `aig`: same size, and no output terminal
    /// belongs to a class.
    pub fn validate_for(&self, aig: &Aig) -> Result<(), EquivError> {
        if self.len() != aig.len() {
            return Err(EquivError::PartitionSizeMismatch {
                partition: self.len(),
                aig: aig.len(),
            });
        }
        for (id, node) in aig.iter() {
            if let AigNode::Output { .. } = node {
                if self.is_candidate(id) || self.is_head(id) {
                    return Err(EquivError::OutputInClass(id));
                }
            }
        }
        Ok(())
    }
}
