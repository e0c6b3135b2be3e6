use tracing::debug;

use crate::{Aig, NodeId};

use super::{EquivError, Partition};

impl Partition {
    /// Chooses, for every class, the member reduction should keep: the one with the
    /// smallest logic level, ties broken by the smallest fanout-free cone, then by class order.
    ///
    /// Leaders do not change `repr` and `next`: proof status stays attached to the
    /// `(member, head)` pairs. Any later change of the classes drops the leaders.
    ///
    /// Returns the number of classes whose leader is not the head.
    pub fn improve_representative(&mut self, aig: &Aig) -> Result<usize, EquivError> {
        self.validate_for(aig)?;
        let levels = aig.levels();
        let mut refs = aig.fanout_counts();

        self.leaders.clear();
        let heads: Vec<NodeId> = self.heads().collect();
        for head in heads {
            let mut best = head;
            let mut best_cost = (levels[head as usize], aig.mffc_size(head, &mut refs));
            for member in self.class_members(head).skip(1) {
                let cost = (levels[member as usize], aig.mffc_size(member, &mut refs));
                if cost < best_cost {
                    best = member;
                    best_cost = cost;
                }
            }
            if best != head {
                self.leaders.insert(head, best);
            }
        }
        self.improved = true;
        debug!(
            "improved representatives: {} of {} classes changed",
            self.leaders.len(),
            self.count_classes()
        );
        Ok(self.leaders.len())
    }

    /// Returns true if [`Partition::improve_representative`] was called since the last
    /// change of the classes.
    pub fn is_improved(&self) -> bool {
        self.improved
    }

    /// The member reduction keeps for the class headed by `head`.
    pub fn leader(&self, head: NodeId) -> NodeId {
        self.leaders.get(&head).copied().unwrap_or(head)
    }
}

#[cfg(test)]
mod test {
    use crate::{Aig, AigEdge, equiv::Partition};

    #[test]
    fn improve_representative_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let c = AigEdge::new(aig.add_input(), false);
        // deep and flat are duplicates, deeper sits one level above them
        let ab = aig.add_and(a, b).unwrap();
        let deep = aig.add_and(ab, c).unwrap();
        let deeper = aig.add_and(deep, deep).unwrap();
        let flat = aig.add_and(ab, c).unwrap();
        aig.add_output(deeper).unwrap();
        aig.add_output(flat).unwrap();

        let mut p = Partition::with_len(aig.len());
        p.merge_pair(deep.get_node_id(), deeper.get_node_id())
            .unwrap();
        p.merge_pair(deeper.get_node_id(), flat.get_node_id())
            .unwrap();
        let head = deep.get_node_id();
        assert_eq!(p.class_members(head).count(), 3);

        // deep and flat are both at level 2 with a single-node cone, deep comes first
        assert_eq!(p.improve_representative(&aig).unwrap(), 0);
        assert_eq!(p.leader(head), head);
        assert!(p.is_improved());

        // Changing classes drops the improvement
        p.excise(flat.get_node_id());
        assert!(!p.is_improved());
    }

    #[test]
    fn improve_picks_lower_level_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let ab = aig.add_and(a, b).unwrap();
        let high = aig.add_and(ab, ab).unwrap();
        let low = aig.add_and(a, b).unwrap();
        aig.add_output(high).unwrap();
        aig.add_output(low).unwrap();

        let mut p = Partition::with_len(aig.len());
        p.merge_pair(high.get_node_id(), low.get_node_id()).unwrap();
        p.set_proved(low.get_node_id(), true).unwrap();
        assert_eq!(p.improve_representative(&aig).unwrap(), 1);
        assert_eq!(p.leader(high.get_node_id()), low.get_node_id());
        // Classes and proofs are untouched
        assert_eq!(p.repr(low.get_node_id()), Some(high.get_node_id()));
        assert!(p.is_proved(low.get_node_id()));
    }
}
