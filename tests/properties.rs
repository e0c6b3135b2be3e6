//! Property-based tests over random partitions and random small AIGs.

use std::collections::BTreeMap;

use aigclass::{
    Aig, AigEdge, AigNode, NodeId,
    choice::{ChoiceOptions, equiv_to_choices},
    equiv::Partition,
    miter::{SpecReduceOptions, spec_reduce, spec_reduce_guided},
    reduce::{ReduceOptions, reduce},
};
use proptest::{prelude::*, sample::Index};

const PARTITION_LEN: u32 = 24;

fn pairs_strategy() -> impl Strategy<Value = Vec<(NodeId, NodeId)>> {
    prop::collection::vec((0..PARTITION_LEN, 0..PARTITION_LEN), 0..20)
}

/// A random AIG: every gate picks two earlier nodes (constant and inputs included).
fn aig_strategy() -> impl Strategy<Value = Aig> {
    (
        2usize..6,
        prop::collection::vec((any::<Index>(), any::<bool>(), any::<Index>(), any::<bool>()), 1..24),
        prop::collection::vec((any::<Index>(), any::<bool>()), 1..4),
    )
        .prop_map(|(inputs, gates, outputs)| {
            let mut aig = Aig::new();
            let mut nodes: Vec<NodeId> = vec![0];
            for _ in 0..inputs {
                nodes.push(aig.add_input());
            }
            for (i, ci, j, cj) in gates {
                let a = AigEdge::new(*i.get(&nodes), ci);
                let b = AigEdge::new(*j.get(&nodes), cj);
                let x = aig.add_and(a, b).unwrap();
                nodes.push(x.get_node_id());
            }
            for (k, c) in outputs {
                aig.add_output(AigEdge::new(*k.get(&nodes), c)).unwrap();
            }
            aig
        })
}

/// Groups the nodes computing the same function up to complementation, using exhaustive
/// simulation.
fn exact_classes(aig: &Aig) -> Partition {
    let n = aig.input_count();
    let patterns = 1usize << n;
    let mask = if patterns < 64 { (1u64 << patterns) - 1 } else { !0 };
    let words: Vec<u64> = (0..n)
        .map(|k| {
            (0..patterns)
                .filter(|p| (p >> k) & 1 == 1)
                .fold(0u64, |acc, p| acc | (1u64 << p))
        })
        .collect();
    let values = aig.simulate_words(&words).unwrap();

    let mut groups: BTreeMap<u64, Vec<NodeId>> = BTreeMap::new();
    for (id, node) in aig.iter() {
        if let AigNode::Output { .. } = node {
            continue;
        }
        let value = values[id as usize] & mask;
        let phase = (value >> (patterns - 1)) & 1 == 1;
        let key = if phase { !value & mask } else { value };
        groups.entry(key).or_default().push(id);
    }

    let mut pairs = Vec::new();
    for members in groups.values() {
        for &member in &members[1..] {
            pairs.push((members[0], member));
        }
    }
    Partition::from_pairs(aig.len(), &pairs).unwrap()
}

fn literal_count(p: &Partition) -> usize {
    let heads = std::iter::once(0).chain(p.heads());
    heads.map(|head| p.class_members(head).count() - 1).sum()
}

proptest! {
    #[test]
    fn next_representative_round_trip(pairs in pairs_strategy()) {
        let p = Partition::from_pairs(PARTITION_LEN as usize, &pairs).unwrap();
        let from_next = Partition::from_next(p.nexts().to_vec()).unwrap();
        let from_repr = Partition::from_representatives(p.representatives().to_vec()).unwrap();
        prop_assert_eq!(&from_next, &p);
        prop_assert_eq!(&from_repr, &p);
        prop_assert!(p.check().is_ok());
    }

    #[test]
    fn merge_order_does_not_matter(pairs in pairs_strategy()) {
        let forward = Partition::from_pairs(PARTITION_LEN as usize, &pairs).unwrap();
        let reversed: Vec<(NodeId, NodeId)> = pairs.iter().rev().map(|&(a, b)| (b, a)).collect();
        let backward = Partition::from_pairs(PARTITION_LEN as usize, &reversed).unwrap();
        prop_assert_eq!(forward.representatives(), backward.representatives());
    }

    #[test]
    fn literal_count_is_conserved(pairs in pairs_strategy(), excised in 0..PARTITION_LEN) {
        let mut p = Partition::from_pairs(PARTITION_LEN as usize, &pairs).unwrap();
        prop_assert_eq!(p.count_live_candidates(), literal_count(&p));
        p.excise(excised);
        prop_assert_eq!(p.count_live_candidates(), literal_count(&p));
        p.merge_pair(1, PARTITION_LEN - 1).unwrap();
        prop_assert_eq!(p.count_live_candidates(), literal_count(&p));
    }

    #[test]
    fn reduction_preserves_semantics(aig in aig_strategy(), improve in any::<bool>()) {
        let mut p = exact_classes(&aig);
        let candidates: Vec<NodeId> = p.live_candidates().collect();
        for id in candidates {
            p.set_proved(id, true).unwrap();
        }
        if improve {
            p.improve_representative(&aig).unwrap();
        }
        let reduced = reduce(&aig, &p, &ReduceOptions::default()).unwrap();
        prop_assert!(reduced.check_integrity().is_ok());
        prop_assert_eq!(reduced.truth_tables().unwrap(), aig.truth_tables().unwrap());
        prop_assert!(reduced.and_count() <= aig.and_count());
    }

    #[test]
    fn trace_is_aligned(
        aig in aig_strategy(),
        pairs in prop::collection::vec((any::<Index>(), any::<Index>()), 0..8),
    ) {
        let ids: Vec<NodeId> = aig
            .iter()
            .filter(|(_, node)| !node.is_output())
            .map(|(id, _)| id)
            .collect();
        let pairs: Vec<(NodeId, NodeId)> = pairs
            .iter()
            .map(|(a, b)| (*a.get(&ids), *b.get(&ids)))
            .collect();
        let p = Partition::from_pairs(aig.len(), &pairs).unwrap();

        let options = SpecReduceOptions::default();
        let srm = spec_reduce(&aig, &p, &options).unwrap();
        prop_assert_eq!(srm.trace.len(), p.count_live_candidates());
        prop_assert_eq!(srm.trace.emitted_count(), srm.comparisons);

        let guided = spec_reduce_guided(&aig, &p, &options, &srm.trace).unwrap();
        prop_assert_eq!(&guided.trace, &srm.trace);
        prop_assert_eq!(guided.aig.output_count(), srm.aig.output_count());
    }

    #[test]
    fn choices_are_acyclic(aig in aig_strategy(), tfi_limit in 0usize..50) {
        let mut p = exact_classes(&aig);
        let options = ChoiceOptions { tfi_limit, ..Default::default() };
        let choices = equiv_to_choices(&aig, &mut p, &options).unwrap();
        prop_assert!(choices.check_acyclic().is_ok());
        prop_assert!(choices.aig().check_integrity().is_ok());
        prop_assert_eq!(choices.aig().truth_tables().unwrap(), aig.truth_tables().unwrap());
    }
}
