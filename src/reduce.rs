//! Reduction of an AIG by merging equivalent nodes.
//!
//! [`reduce`] rebuilds the AIG from its outputs. A node with a usable representative is not
//! rebuilt: it takes the image of its representative, complemented when their phases differ.
//! Everything else is structurally hashed in the new AIG.

use tracing::{debug, trace};

use crate::{
    Aig, AigEdge, AigError, AigNode, NodeId, NodeMap, Result,
    aig::translate,
    equiv::{ClassKind, EquivError, Partition, SideColors},
};

/// Options for [`reduce`].
#[derive(Debug, Clone, Default)]
pub struct ReduceOptions {
    /// Use every candidate pair, proved or not (the result is then only conjectured
    /// equivalent to the original AIG).
    pub use_all: bool,
    /// The AIG is a dual-output miter: pairs crossing sides are never merged.
    pub dual_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Fresh,
    Active,
    Done,
}

enum Step {
    Visit(NodeId),
    Substitute(NodeId, NodeId),
    Combine(NodeId),
}

/// Rebuilds an AIG, substituting nodes by their class target.
pub(crate) struct Reducer<'a> {
    aig: &'a Aig,
    partition: &'a Partition,
    options: &'a ReduceOptions,
    colors: Option<SideColors>,
    phases: Vec<bool>,
    marks: Vec<Mark>,
    map: NodeMap,
    new: Aig,
}

impl<'a> Reducer<'a> {
    pub(crate) fn new(
        aig: &'a Aig,
        partition: &'a Partition,
        options: &'a ReduceOptions,
    ) -> Result<Self> {
        partition.validate_for(aig)?;
        let colors = if options.dual_output {
            Some(SideColors::compute(aig)?)
        } else {
            None
        };
        Ok(Reducer {
            aig,
            partition,
            options,
            colors,
            phases: aig.phases(),
            marks: vec![Mark::Fresh; aig.len()],
            map: vec![None; aig.len()],
            new: Aig::with_hashing(),
        })
    }

    /// The pair `(member, head)` may be used.
    fn pair_usable(&self, member: NodeId, head: NodeId) -> bool {
        if self.partition.is_failed(member) {
            return false;
        }
        member == head || self.options.use_all || self.partition.is_proved(member)
    }

    fn sides_compatible(&self, a: NodeId, b: NodeId) -> bool {
        self.colors
            .as_ref()
            .is_none_or(|colors| !colors.crosses_sides(a, b))
    }

    /// The node `id` should be replaced with, if any.
    ///
    /// Without improvement, followers are replaced by their head. After
    /// [`Partition::improve_representative`], every class member is replaced by the class
    /// leader, provided both the member and the leader are usable against the head. A usable
    /// follower whose leader is not falls back on the head, if the head is kept as is.
    fn target(&self, id: NodeId) -> Option<NodeId> {
        let partition = self.partition;
        match partition.class_kind(id) {
            ClassKind::Const => {
                (self.pair_usable(id, 0) && self.sides_compatible(id, 0)).then_some(0)
            }
            ClassKind::Follower => {
                let head = partition.repr(id)?;
                if !partition.is_improved() {
                    return (self.pair_usable(id, head) && self.sides_compatible(id, head))
                        .then_some(head);
                }
                let leader = partition.leader(head);
                if leader == id || !self.pair_usable(id, head) {
                    return None;
                }
                if self.pair_usable(leader, head) && self.sides_compatible(id, leader) {
                    return Some(leader);
                }
                (self.target(head).is_none() && self.sides_compatible(id, head)).then_some(head)
            }
            ClassKind::Head if partition.is_improved() => {
                let leader = partition.leader(id);
                (leader != id && self.pair_usable(leader, id) && self.sides_compatible(id, leader))
                    .then_some(leader)
            }
            _ => None,
        }
    }

    fn image(&self, edge: AigEdge) -> Result<AigEdge> {
        translate(&self.map, edge).ok_or(AigError::InvalidState(format!(
            "node {} was used before being built",
            edge.get_node_id()
        )))
    }

    fn map_inputs(&mut self) {
        self.map[0] = Some(AigEdge::FALSE);
        self.marks[0] = Mark::Done;
        for &id in self.aig.get_inputs() {
            self.map[id as usize] = Some(AigEdge::new(self.new.add_input(), false));
            self.marks[id as usize] = Mark::Done;
        }
    }

    /// Builds the image of `root` and of its transitive fanin.
    fn build(&mut self, root: NodeId) -> Result<()> {
        let mut stack = vec![Step::Visit(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(id) => {
                    match self.marks[id as usize] {
                        Mark::Done => continue,
                        Mark::Active => return Err(EquivError::CombinationalCycle(id).into()),
                        Mark::Fresh => self.marks[id as usize] = Mark::Active,
                    }
                    if let Some(target) = self.target(id) {
                        stack.push(Step::Substitute(id, target));
                        stack.push(Step::Visit(target));
                        continue;
                    }
                    match *self.aig.node(id)? {
                        AigNode::And { fanin0, fanin1 } => {
                            stack.push(Step::Combine(id));
                            stack.push(Step::Visit(fanin1.get_node_id()));
                            stack.push(Step::Visit(fanin0.get_node_id()));
                        }
                        _ => {
                            return Err(AigError::UnexpectedNode {
                                id,
                                expected: "an and gate",
                            });
                        }
                    }
                }
                Step::Substitute(id, target) => {
                    let complement = self.phases[id as usize] ^ self.phases[target as usize];
                    let edge = self.image(AigEdge::new(target, complement))?;
                    trace!("node {} replaced by {} ({})", id, target, edge);
                    self.map[id as usize] = Some(edge);
                    self.marks[id as usize] = Mark::Done;
                }
                Step::Combine(id) => {
                    if let AigNode::And { fanin0, fanin1 } = *self.aig.node(id)? {
                        let (f0, f1) = (self.image(fanin0)?, self.image(fanin1)?);
                        self.map[id as usize] = Some(self.new.add_and(f0, f1)?);
                    }
                    self.marks[id as usize] = Mark::Done;
                }
            }
        }
        Ok(())
    }

    /// Builds every output, returns the new AIG and the image of every old node.
    pub(crate) fn run(mut self) -> Result<(Aig, NodeMap)> {
        self.map_inputs();
        let fanins = self.aig.get_output_fanins();
        for fanin in &fanins {
            self.build(fanin.get_node_id())?;
        }
        for (&fanin, &id) in fanins.iter().zip(self.aig.get_outputs()) {
            let edge = self.image(fanin)?;
            self.map[id as usize] = Some(AigEdge::new(self.new.add_output(edge)?, false));
        }
        self.new.set_register_count(self.aig.register_count())?;
        Ok((self.new, self.map))
    }
}

/// Returns a functionally equivalent AIG where nodes are replaced by their representative.
///
/// Only proved pairs are used unless [`ReduceOptions::use_all`] is set, and failed pairs are
/// never used. Inputs are kept even if they have a representative. An empty partition
/// yields a structural duplicate.
pub fn reduce(aig: &Aig, partition: &Partition, options: &ReduceOptions) -> Result<Aig> {
    let reducer = Reducer::new(aig, partition, options)?;
    if partition.has_no_classes() {
        debug!("no equivalence classes, duplicating");
        return aig.dup();
    }
    let (reduced, _) = reducer.run()?;
    debug!(
        "reduced {} and gates into {}",
        aig.and_count(),
        reduced.and_count()
    );
    Ok(reduced)
}

/// Reduces the AIG with its proved pairs, removes the dangling logic, and carries the
/// remaining classes over to the reduced AIG.
pub fn reduce_and_remap(
    aig: &Aig,
    partition: &Partition,
    options: &ReduceOptions,
) -> Result<(Aig, Partition)> {
    let (reduced, map) = Reducer::new(aig, partition, options)?.run()?;
    let (clean, clean_map) = reduced.cleanup()?;
    let composed: NodeMap = map
        .iter()
        .map(|image| image.and_then(|edge| translate(&clean_map, edge)))
        .collect();
    let remapped = partition.remap(&composed, clean.len())?;
    debug!(
        "reduced and remapped: {} -> {} and gates, {} -> {} candidates",
        aig.and_count(),
        clean.and_count(),
        partition.count_live_candidates(),
        remapped.count_live_candidates()
    );
    Ok((clean, remapped))
}

/// Reduces the AIG using pairs of nodes known to be equivalent (up to their phase).
pub fn reduce_pairs(aig: &Aig, pairs: &[(NodeId, NodeId)], options: &ReduceOptions) -> Result<Aig> {
    let mut partition = Partition::from_pairs(aig.len(), pairs)?;
    let candidates: Vec<NodeId> = partition.live_candidates().collect();
    for id in candidates {
        partition.set_proved(id, true)?;
    }
    reduce(aig, &partition, options)
}
