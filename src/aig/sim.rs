//! Bit-parallel simulation of the combinational part of an AIG.

use crate::{Aig, AigEdge, AigError, AigNode, Result};

/// Exhaustive simulation is limited to this many inputs (`2^16` patterns).
pub const MAX_EXHAUSTIVE_INPUTS: usize = 16;

fn edge_value(values: &[u64], edge: AigEdge) -> u64 {
    let v = values[edge.get_node_id() as usize];
    if edge.get_complement() { !v } else { v }
}

impl Aig {
    /// Phase of every node: its value when every input is set to true.
    ///
    /// The phase is used to compensate polarity when substituting a node by an
    /// equivalent (or complement-equivalent) representative.
    pub fn phases(&self) -> Vec<bool> {
        let mut phases = vec![false; self.len()];
        for (id, node) in self.iter() {
            let phase_of =
                |edge: AigEdge| phases[edge.get_node_id() as usize] ^ edge.get_complement();
            let phase = match *node {
                AigNode::False => false,
                AigNode::Input => true,
                AigNode::And { fanin0, fanin1 } => phase_of(fanin0) && phase_of(fanin1),
                AigNode::Output { fanin } => phase_of(fanin),
            };
            phases[id as usize] = phase;
        }
        phases
    }

    /// Simulates 64 patterns at once. `inputs[k]` holds the patterns of the `k`-th input.
    /// Returns the value of every node (output terminals included).
    pub fn simulate_words(&self, inputs: &[u64]) -> Result<Vec<u64>> {
        if inputs.len() != self.input_count() {
            return Err(AigError::InputCountMismatch {
                expected: self.input_count(),
                actual: inputs.len(),
            });
        }
        let mut values = vec![0u64; self.len()];
        for (&id, &word) in self.inputs.iter().zip(inputs) {
            values[id as usize] = word;
        }
        for (id, node) in self.iter() {
            match *node {
                AigNode::And { fanin0, fanin1 } => {
                    values[id as usize] = edge_value(&values, fanin0) & edge_value(&values, fanin1)
                }
                AigNode::Output { fanin } => values[id as usize] = edge_value(&values, fanin),
                _ => (),
            }
        }
        Ok(values)
    }

    /// Simulates one input pattern, returns the value of every output.
    pub fn simulate(&self, inputs: &[bool]) -> Result<Vec<bool>> {
        let words: Vec<u64> = inputs.iter().map(|&b| if b { !0 } else { 0 }).collect();
        let values = self.simulate_words(&words)?;
        Ok(self
            .outputs
            .iter()
            .map(|&id| values[id as usize] & 1 == 1)
            .collect())
    }

    /// Truth table of every output over all input patterns.
    ///
    /// Pattern `p` assigns bit `k` of `p` to the `k`-th input, and is stored at bit `p % 64`
    /// of word `p / 64`.
    pub fn truth_tables(&self) -> Result<Vec<Vec<u64>>> {
        let n = self.input_count();
        if n > MAX_EXHAUSTIVE_INPUTS {
            return Err(AigError::TooManyInputs {
                max: MAX_EXHAUSTIVE_INPUTS,
                actual: n,
            });
        }
        let patterns = 1usize << n;
        let words = patterns.div_ceil(64);
        let mask = if patterns < 64 { (1u64 << patterns) - 1 } else { !0 };

        let mut tables = vec![Vec::with_capacity(words); self.output_count()];
        let mut inputs = vec![0u64; n];
        for w in 0..words {
            for (k, word) in inputs.iter_mut().enumerate() {
                *word = (0..64)
                    .filter(|b| ((w * 64 + b) >> k) & 1 == 1)
                    .fold(0u64, |acc, b| acc | (1u64 << b));
            }
            let values = self.simulate_words(&inputs)?;
            for (table, &id) in tables.iter_mut().zip(&self.outputs) {
                table.push(values[id as usize] & mask);
            }
        }
        Ok(tables)
    }
}
