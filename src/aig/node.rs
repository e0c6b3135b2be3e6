use super::AigEdge;

/// A node id.
///
/// The constant node [`AigNode::False`] has id 0 by convention. Ids are dense indices
/// into the node arena of an [`Aig`].
///
/// [`Aig`]: super::Aig
pub type NodeId = u32;

/// An AIG node.
///
/// Nodes do not carry their id, it is their position in the arena.
/// AND fanins are always stored sorted, `fanin0 <= fanin1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AigNode {
    /// The constant low/false signal.
    False,
    /// A combinational input (primary input or register output).
    Input,
    /// An AND gate with two fanins.
    And { fanin0: AigEdge, fanin1: AigEdge },
    /// An output terminal (primary output or register input), driven by `fanin`.
    Output { fanin: AigEdge },
}

impl AigNode {
    /// Returns a new and gate with sorted fanins.
    pub fn and(a: AigEdge, b: AigEdge) -> Self {
        let (fanin0, fanin1) = if a <= b { (a, b) } else { (b, a) };
        AigNode::And { fanin0, fanin1 }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, AigNode::False)
    }

    pub fn is_input(&self) -> bool {
        matches!(self, AigNode::Input)
    }

    pub fn is_and(&self) -> bool {
        matches!(self, AigNode::And { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self, AigNode::Output { .. })
    }

    /// Fanins of the node: two for AND gates, one for outputs, none otherwise.
    pub fn get_fanins(&self) -> Vec<AigEdge> {
        match *self {
            AigNode::And { fanin0, fanin1 } => vec![fanin0, fanin1],
            AigNode::Output { fanin } => vec![fanin],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn and_sorts_fanins_test() {
        let a = AigEdge::new(5, true);
        let b = AigEdge::new(2, false);
        assert_eq!(
            AigNode::and(a, b),
            AigNode::And {
                fanin0: b,
                fanin1: a
            }
        );
        assert_eq!(AigNode::and(a, b), AigNode::and(b, a));
    }

    #[test]
    fn fanins_test() {
        assert!(AigNode::False.get_fanins().is_empty());
        assert!(AigNode::Input.get_fanins().is_empty());
        let out = AigNode::Output {
            fanin: AigEdge::new(3, true),
        };
        assert_eq!(out.get_fanins(), vec![AigEdge::new(3, true)]);
        assert!(out.is_output());
    }
}
