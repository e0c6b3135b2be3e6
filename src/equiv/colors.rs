use crate::{Aig, AigNode, NodeId};

use super::EquivError;

const SIDE_A: u8 = 0b01;
const SIDE_B: u8 = 0b10;

/// Side coloring of a dual-output AIG.
///
/// Primary outputs are paired `(a0, b0, a1, b1, ...)`: even outputs belong to side A, odd
/// ones to side B. Every node gets the colors of the outputs whose cone contains it. The
/// constant and primary inputs are shared by both sides, register outputs take the colors
/// of their register input.
///
/// The coloring is computed per operation and passed explicitly.
#[derive(Debug, Clone)]
pub struct SideColors {
    colors: Vec<u8>,
}

impl SideColors {
    pub fn compute(aig: &Aig) -> Result<Self, EquivError> {
        let pos = aig.primary_output_count();
        if pos % 2 != 0 {
            return Err(EquivError::OddDualOutputs(pos));
        }

        let mut colors = vec![0u8; aig.len()];
        colors[0] = SIDE_A | SIDE_B;
        for &id in &aig.get_inputs()[..aig.primary_input_count()] {
            colors[id as usize] = SIDE_A | SIDE_B;
        }
        // Register output k is driven by register input k
        let mut next_state = vec![None; aig.len()];
        for (&ro, &ri) in aig.register_outputs().iter().zip(aig.register_inputs()) {
            next_state[ro as usize] = Some(ri);
        }

        let mut stack: Vec<(NodeId, u8)> = Vec::new();
        for (k, &po) in aig.get_outputs()[..pos].iter().enumerate() {
            let side = if k % 2 == 0 { SIDE_A } else { SIDE_B };
            stack.push((po, side));
            while let Some((id, side)) = stack.pop() {
                if colors[id as usize] & side != 0 {
                    continue;
                }
                colors[id as usize] |= side;
                match aig.get_node(id) {
                    Some(AigNode::Input) => {
                        if let Some(ri) = next_state[id as usize] {
                            stack.push((ri, side));
                        }
                    }
                    Some(node) => {
                        for fanin in node.get_fanins() {
                            stack.push((fanin.get_node_id(), side));
                        }
                    }
                    None => (),
                }
            }
        }
        Ok(SideColors { colors })
    }

    pub fn is_side_a(&self, id: NodeId) -> bool {
        self.color(id) & SIDE_A != 0
    }

    pub fn is_side_b(&self, id: NodeId) -> bool {
        self.color(id) & SIDE_B != 0
    }

    fn color(&self, id: NodeId) -> u8 {
        self.colors.get(id as usize).copied().unwrap_or(0)
    }

    /// Returns true if one node belongs only to side A and the other only to side B.
    /// Such pairs are never merged in dual-output mode.
    ///
    /// The check is made per `(member, representative)` pair, not per class: in a class
    /// spanning both sides, the members on the side of their representative are still used.
    pub fn crosses_sides(&self, a: NodeId, b: NodeId) -> bool {
        let (ca, cb) = (self.color(a), self.color(b));
        (ca == SIDE_A && cb == SIDE_B) || (ca == SIDE_B && cb == SIDE_A)
    }
}
