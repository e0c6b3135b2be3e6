use crate::{Aig, AigEdge, AigError, AigNode, Result, dfs::Dfs};

/// Maps every node of a source AIG to its image (an edge) in a derived AIG,
/// `None` if the node was not copied.
pub type NodeMap = Vec<Option<AigEdge>>;

/// Translates `edge` through `map`, complementing the image as needed.
pub(crate) fn translate(map: &NodeMap, edge: AigEdge) -> Option<AigEdge> {
    map.get(edge.get_node_id() as usize)
        .copied()
        .flatten()
        .map(|image| image.not_if(edge.get_complement()))
}

impl Aig {
    /// Marks every node reachable from an output terminal (outputs included).
    pub fn mark_used(&self) -> Vec<bool> {
        let mut used = vec![false; self.len()];
        let mut dfs = Dfs::from_outputs(self);
        while let Some(id) = dfs.next(self) {
            used[id as usize] = true;
        }
        used
    }

    /// Copies the AIG, keeping only the marked AND gates.
    ///
    /// Constant, inputs and outputs are always kept, in the same relative order.
    /// Every kept AND gate must only depend on kept nodes.
    pub fn dup_marked(&self, keep: &[bool]) -> Result<(Aig, NodeMap)> {
        let mut aig = Aig::new();
        let mut map: NodeMap = vec![None; self.len()];
        map[0] = Some(AigEdge::FALSE);

        for (id, node) in self.iter() {
            let image = match *node {
                AigNode::False => continue,
                AigNode::Input => AigEdge::new(aig.add_input(), false),
                AigNode::And { fanin0, fanin1 } => {
                    if !keep.get(id as usize).copied().unwrap_or(false) {
                        continue;
                    }
                    let f0 = translate(&map, fanin0).ok_or(AigError::InvalidState(
                        format!("fanin {} of kept node {} was dropped", fanin0, id),
                    ))?;
                    let f1 = translate(&map, fanin1).ok_or(AigError::InvalidState(
                        format!("fanin {} of kept node {} was dropped", fanin1, id),
                    ))?;
                    aig.add_and(f0, f1)?
                }
                AigNode::Output { fanin } => {
                    let f = translate(&map, fanin).ok_or(AigError::InvalidState(
                        format!("fanin {} of output {} was dropped", fanin, id),
                    ))?;
                    AigEdge::new(aig.add_output(f)?, false)
                }
            };
            map[id as usize] = Some(image);
        }

        aig.set_register_count(self.register_count)?;
        if self.is_hashing() {
            aig.start_hashing();
        }
        Ok((aig, map))
    }

    /// Structural duplicate: every node is copied, dangling ones included.
    pub fn dup(&self) -> Result<Aig> {
        Ok(self.dup_marked(&vec![true; self.len()])?.0)
    }

    /// Returns a copy without the AND gates that are not reachable from any output,
    /// together with the map from old nodes to new edges.
    ///
    /// All inputs are kept, even if no output depends on them.
    pub fn cleanup(&self) -> Result<(Aig, NodeMap)> {
        self.dup_marked(&self.mark_used())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::NodeId;

    fn sample() -> (Aig, NodeId) {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let dangling = aig.add_and(a, !b).unwrap();
        let x = aig.add_and(a, b).unwrap();
        let _unused_input = aig.add_input();
        aig.add_output(!x).unwrap();
        (aig, dangling.get_node_id())
    }

    #[test]
    fn cleanup_test() {
        let (aig, dangling) = sample();
        let (clean, map) = aig.cleanup().unwrap();
        assert_eq!(clean.and_count(), 1);
        assert_eq!(clean.input_count(), 3);
        assert_eq!(clean.output_count(), 1);
        assert_eq!(map[dangling as usize], None);
        assert_eq!(map[4], Some(AigEdge::new(3, false)));
        assert_eq!(clean.output_fanin(0), Some(AigEdge::new(3, true)));
        clean.check_integrity().unwrap();
    }

    #[test]
    fn dup_test() {
        let (aig, _) = sample();
        let copy = aig.dup().unwrap();
        assert_eq!(copy.len(), aig.len());
        for (id, node) in aig.iter() {
            assert_eq!(copy.get_node(id), Some(node));
        }
    }

    #[test]
    fn dup_marked_missing_fanin_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let x = aig.add_and(a, a).unwrap();
        let y = aig.add_and(x, a).unwrap();
        aig.add_output(y).unwrap();
        let mut keep = vec![true; aig.len()];
        keep[x.get_node_id() as usize] = false;
        assert!(aig.dup_marked(&keep).is_err());
    }
}
