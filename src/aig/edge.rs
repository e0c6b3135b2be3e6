//! An [`AigEdge`] points at an [`AigNode`] and can be complemented (indicates the presence of a NOT gate).
//!
//! Edges are packed literals: `2 * id + complement`. Literal `0` is the constant false,
//! literal `1` the constant true.
//!
//! [`AigNode`]: crate::AigNode

use std::{fmt::Display, ops::Not};

use crate::NodeId;

/// A directed edge representing a fanin for AIG nodes.
///
/// The edge can carry an inverter according to its complement bit.
///
/// For example:
///
/// ```rust
/// use aigclass::AigEdge;
/// let fanin_false = AigEdge::new(0, false);
/// let fanin_true = AigEdge::new(0, true);
/// assert_eq!(fanin_false, !fanin_true);
/// assert_eq!(fanin_false, AigEdge::FALSE);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AigEdge(u32);

impl Not for AigEdge {
    type Output = Self;

    fn not(self) -> Self::Output {
        AigEdge(self.0 ^ 1)
    }
}

impl From<&AigEdge> for (NodeId, bool) {
    fn from(edge: &AigEdge) -> Self {
        (edge.get_node_id(), edge.get_complement())
    }
}

impl Display for AigEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.get_complement() {
            write!(f, "!{}", self.get_node_id())
        } else {
            write!(f, "{}", self.get_node_id())
        }
    }
}

impl AigEdge {
    /// The constant false literal.
    pub const FALSE: AigEdge = AigEdge(0);
    /// The constant true literal.
    pub const TRUE: AigEdge = AigEdge(1);

    pub fn new(node: NodeId, complement: bool) -> Self {
        AigEdge((node << 1) | complement as u32)
    }

    /// Rebuilds an edge from its packed literal value.
    pub fn from_lit(lit: u32) -> Self {
        AigEdge(lit)
    }

    /// The packed literal value, `2 * id + complement`.
    pub fn lit(&self) -> u32 {
        self.0
    }

    pub fn get_node_id(&self) -> NodeId {
        self.0 >> 1
    }

    pub fn get_complement(&self) -> bool {
        self.0 & 1 == 1
    }

    /// The non-complemented edge pointing at the same node.
    pub fn regular(&self) -> Self {
        AigEdge(self.0 & !1)
    }

    /// Complements the edge iff `complement` is set.
    pub fn not_if(self, complement: bool) -> Self {
        AigEdge(self.0 ^ complement as u32)
    }

    pub fn is_cst_false(&self) -> bool {
        self.0 == 0
    }

    pub fn is_cst_true(&self) -> bool {
        self.0 == 1
    }

    pub fn is_cst(&self) -> bool {
        self.get_node_id() == 0
    }

    pub fn is_complement_of(&self, other: &AigEdge) -> bool {
        self.0 ^ other.0 == 1
    }
}
