use std::fmt::Display;

use crate::{Aig, AigNode, NodeId};

/// Summary of an AIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AigStats {
    pub inputs: usize,
    pub outputs: usize,
    pub registers: usize,
    pub ands: usize,
    pub levels: u32,
}

impl Display for AigStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "i/o = {}/{}  ff = {}  and = {}  lev = {}",
            self.inputs, self.outputs, self.registers, self.ands, self.levels
        )
    }
}

impl Aig {
    /// Logic level of every node. Constant and inputs are at level 0,
    /// output terminals inherit the level of their driver.
    pub fn levels(&self) -> Vec<u32> {
        let mut levels = vec![0u32; self.len()];
        for (id, node) in self.iter() {
            let level = match *node {
                AigNode::And { fanin0, fanin1 } => {
                    1 + levels[fanin0.get_node_id() as usize]
                        .max(levels[fanin1.get_node_id() as usize])
                }
                AigNode::Output { fanin } => levels[fanin.get_node_id() as usize],
                _ => 0,
            };
            levels[id as usize] = level;
        }
        levels
    }

    /// Number of references of every node (as an AND fanin or as an output driver).
    pub fn fanout_counts(&self) -> Vec<u32> {
        let mut refs = vec![0u32; self.len()];
        for (_, node) in self.iter() {
            for fanin in node.get_fanins() {
                refs[fanin.get_node_id() as usize] += 1;
            }
        }
        refs
    }

    /// Size of the maximum fanout-free cone of `root` (root included), ie the number of
    /// AND gates that would become dangling if `root` was removed.
    ///
    /// `refs` must hold the reference counts of [`Aig::fanout_counts`]; it is restored
    /// before returning.
    pub fn mffc_size(&self, root: NodeId, refs: &mut [u32]) -> usize {
        if !self.get_node(root).is_some_and(AigNode::is_and) {
            return 0;
        }

        // Dereferencing
        let mut stack = vec![root];
        let mut cone = vec![root];
        while let Some(id) = stack.pop() {
            for fanin in self.nodes[id as usize].get_fanins() {
                let child = fanin.get_node_id();
                refs[child as usize] -= 1;
                if refs[child as usize] == 0 && self.nodes[child as usize].is_and() {
                    cone.push(child);
                    stack.push(child);
                }
            }
        }

        // Referencing back
        for &id in &cone {
            for fanin in self.nodes[id as usize].get_fanins() {
                refs[fanin.get_node_id() as usize] += 1;
            }
        }
        cone.len()
    }

    pub fn stats(&self) -> AigStats {
        AigStats {
            inputs: self.input_count(),
            outputs: self.output_count(),
            registers: self.register_count(),
            ands: self.and_count(),
            levels: self.levels().into_iter().max().unwrap_or(0),
        }
    }
}
