use crate::{Aig, AigError, AigNode, NodeId, Result};

impl Aig {
    fn check_fanin_order(&self, id: NodeId, node: &AigNode) -> Result<()> {
        for fanin in node.get_fanins() {
            let fanin_id = fanin.get_node_id();
            if fanin_id >= id {
                return Err(AigError::InvalidState(format!(
                    "node {} has fanin {} which is not strictly before it",
                    id, fanin_id
                )));
            }
            if self.nodes[fanin_id as usize].is_output() {
                return Err(AigError::OutputAsFanin(fanin_id));
            }
        }
        Ok(())
    }

    /// Checks the structural invariants of the AIG:
    /// - node 0 is the only constant node
    /// - nodes are in topological order (every fanin id is strictly smaller than the node id)
    /// - output terminals are never used as fanins
    /// - the input and output lists match the input and output nodes, in increasing id order
    /// - AND fanins are sorted
    /// - registers fit in the inputs and outputs.
    pub fn check_integrity(&self) -> Result<()> {
        if self.nodes.first() != Some(&AigNode::False) {
            return Err(AigError::UnexpectedNode {
                id: 0,
                expected: "the constant node",
            });
        }

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for (id, node) in self.iter() {
            match node {
                AigNode::False if id != 0 => {
                    return Err(AigError::InvalidState(format!(
                        "constant node found at id={}",
                        id
                    )));
                }
                AigNode::Input => inputs.push(id),
                AigNode::Output { .. } => outputs.push(id),
                AigNode::And { fanin0, fanin1 } if fanin0 > fanin1 => {
                    return Err(AigError::InvalidState(format!(
                        "fanins of and gate {} are not sorted",
                        id
                    )));
                }
                _ => (),
            }
            self.check_fanin_order(id, node)?;
        }

        if inputs != self.inputs {
            return Err(AigError::InvalidState(
                "input list does not match input nodes".to_string(),
            ));
        }
        if outputs != self.outputs {
            return Err(AigError::InvalidState(
                "output list does not match output nodes".to_string(),
            ));
        }
        if self.register_count > self.inputs.len() || self.register_count > self.outputs.len() {
            return Err(AigError::InvalidRegisterCount {
                registers: self.register_count,
                inputs: self.inputs.len(),
                outputs: self.outputs.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{Aig, AigEdge, AigError, AigNode};

    #[test]
    fn valid_aig_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let x = aig.add_xor(a, b).unwrap();
        aig.add_output(x).unwrap();
        aig.check_integrity().unwrap();
    }

    #[test]
    fn invalid_order_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        aig.add_output(a).unwrap();
        // Forging a forward reference
        aig.nodes.push(AigNode::And {
            fanin0: a,
            fanin1: AigEdge::new(5, false),
        });
        assert!(matches!(
            aig.check_integrity(),
            Err(AigError::InvalidState(_))
        ));
    }

    #[test]
    fn output_as_fanin_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let o = aig.add_output(a).unwrap();
        aig.nodes.push(AigNode::And {
            fanin0: a,
            fanin1: AigEdge::new(o, false),
        });
        assert!(matches!(
            aig.check_integrity(),
            Err(AigError::OutputAsFanin(_))
        ));
    }
}
