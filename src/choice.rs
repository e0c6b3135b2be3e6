//! Choice construction: keeping equivalent implementations side by side.
//!
//! [`reduce`](crate::reduce::reduce) collapses every class onto a single node.
//! [`equiv_to_choices`] instead keeps the other implementations of a class as *choices*:
//! nodes no gate refers to, linked to the representative through the sibling chain of a
//! [`Partition`] over the new AIG. A mapper may then pick, for every class, the
//! implementation that suits it best.
//!
//! A choice is only kept if the representative does not lie in its fanin cone (siblings
//! included), otherwise selecting the choice would create a combinational loop.

mod independent;

use tracing::{debug, trace};

use crate::{
    Aig, AigEdge, AigError, AigNode, NodeId, NodeMap, Result,
    aig::translate,
    dfs::Dfs,
    dot::GraphvizStyle,
    equiv::{EquivError, Partition},
};

pub use independent::mark_independent_classes;

#[derive(Debug, Clone)]
pub struct ChoiceOptions {
    /// Nodes visited when checking that a choice is acyclic. Larger cones are assumed cyclic.
    pub tfi_limit: usize,
    /// Only keep every `snapshots`-th primary output (`0` and `1` keep them all).
    pub snapshots: usize,
    /// Only members marked by [`mark_independent_classes`] become choices, the others are
    /// substituted.
    pub independent_only: bool,
}

impl Default for ChoiceOptions {
    fn default() -> Self {
        ChoiceOptions {
            tfi_limit: 1000,
            snapshots: 1,
            independent_only: false,
        }
    }
}

/// An AIG with structural choices.
#[derive(Debug, Clone)]
pub struct ChoiceAig {
    aig: Aig,
    choices: Partition,
}

enum Step {
    Visit(NodeId),
    Combine(NodeId),
    Choose(NodeId, NodeId),
}

struct ChoiceBuilder<'a> {
    aig: &'a Aig,
    partition: &'a Partition,
    options: &'a ChoiceOptions,
    phases: Vec<bool>,
    map: NodeMap,
    new: Aig,
    /// Sibling structure over the ids of `new`, grown on demand.
    choice_repr: Vec<Option<NodeId>>,
    choice_next: Vec<Option<NodeId>>,
    marks: Vec<bool>,
    /// `(representative, member)` pairs over the ids of `new`.
    links: Vec<(NodeId, NodeId)>,
    /// Members of the original AIG that were kept as choices.
    linked: Vec<NodeId>,
}

fn image(map: &NodeMap, edge: AigEdge) -> Result<AigEdge> {
    translate(map, edge).ok_or(AigError::InvalidState(format!(
        "node {} was used before being built",
        edge.get_node_id()
    )))
}

impl<'a> ChoiceBuilder<'a> {
    fn new(aig: &'a Aig, partition: &'a Partition, options: &'a ChoiceOptions) -> Self {
        ChoiceBuilder {
            aig,
            partition,
            options,
            phases: aig.phases(),
            map: vec![None; aig.len()],
            new: Aig::with_hashing(),
            choice_repr: Vec::new(),
            choice_next: Vec::new(),
            marks: Vec::new(),
            links: Vec::new(),
            linked: Vec::new(),
        }
    }

    fn target(&self, id: NodeId) -> Option<NodeId> {
        let head = self.partition.repr(id)?;
        if self.partition.is_failed(id) {
            return None;
        }
        if head != 0 && self.options.independent_only && !self.partition.flags(id).color_a {
            return None;
        }
        Some(head)
    }

    fn grow(&mut self) {
        let len = self.new.len();
        self.choice_repr.resize(len, None);
        self.choice_next.resize(len, None);
        self.marks.resize(len, false);
    }

    /// Returns true if `target` may be in the fanin cone of `from`, siblings included.
    /// Cones larger than the limit count as reaching.
    fn reaches(&mut self, from: NodeId, target: NodeId) -> Result<bool> {
        let mut stack = vec![from];
        let mut visited = Vec::new();
        let mut found = false;
        while let Some(id) = stack.pop() {
            if id == target || visited.len() >= self.options.tfi_limit {
                found = true;
                break;
            }
            if std::mem::replace(&mut self.marks[id as usize], true) {
                continue;
            }
            visited.push(id);
            for fanin in self.new.node(id)?.get_fanins() {
                stack.push(fanin.get_node_id());
            }
            if let Some(next) = self.choice_next[id as usize] {
                stack.push(next);
            }
        }
        for id in visited {
            self.marks[id as usize] = false;
        }
        Ok(found)
    }

    fn link(&mut self, head: NodeId, member: NodeId) {
        let mut last = head;
        while let Some(next) = self.choice_next[last as usize] {
            last = next;
        }
        self.choice_next[last as usize] = Some(member);
        self.choice_repr[member as usize] = Some(head);
        self.links.push((head, member));
    }

    /// Builds `id` (an AND gate) next to its representative `head`, and keeps it as a choice
    /// when possible. `id` then takes the image of `head`, unless its own image comes first.
    fn choose(&mut self, id: NodeId, head: NodeId) -> Result<()> {
        let AigNode::And { fanin0, fanin1 } = *self.aig.node(id)? else {
            return Err(AigError::UnexpectedNode {
                id,
                expected: "an and gate",
            });
        };
        let own = self
            .new
            .add_and(image(&self.map, fanin0)?, image(&self.map, fanin1)?)?;
        let repr = image(&self.map, AigEdge::new(head, false))?;
        let substitute = repr.not_if(self.phases[id as usize] ^ self.phases[head as usize]);
        let (own_node, repr_node) = (own.get_node_id(), repr.get_node_id());

        if own_node != repr_node && repr.lit() > own.lit() {
            self.map[id as usize] = Some(own);
            return Ok(());
        }
        self.map[id as usize] = Some(substitute);
        if own_node == repr_node || repr.is_cst() {
            return Ok(());
        }

        self.grow();
        let both_ands = self.new.node(own_node)?.is_and() && self.new.node(repr_node)?.is_and();
        let free = self.choice_repr[own_node as usize].is_none()
            && self.choice_next[own_node as usize].is_none()
            && self.choice_repr[repr_node as usize].is_none();
        if !both_ands || !free {
            return Ok(());
        }
        if self.reaches(own_node, repr_node)? || self.reaches(repr_node, own_node)? {
            trace!("choice {} of {} would create a cycle", id, head);
            return Ok(());
        }
        self.link(repr_node, own_node);
        self.linked.push(id);
        Ok(())
    }

    fn build(&mut self, root: NodeId) -> Result<()> {
        let mut stack = vec![Step::Visit(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(id) => {
                    if self.map[id as usize].is_some() {
                        continue;
                    }
                    let AigNode::And { fanin0, fanin1 } = *self.aig.node(id)? else {
                        return Err(AigError::UnexpectedNode {
                            id,
                            expected: "an and gate",
                        });
                    };
                    match self.target(id) {
                        Some(0) => {
                            self.map[id as usize] =
                                Some(AigEdge::FALSE.not_if(self.phases[id as usize]));
                        }
                        // The representative is built first
                        Some(head) => {
                            stack.push(Step::Choose(id, head));
                            stack.push(Step::Visit(fanin1.get_node_id()));
                            stack.push(Step::Visit(fanin0.get_node_id()));
                            stack.push(Step::Visit(head));
                        }
                        None => {
                            stack.push(Step::Combine(id));
                            stack.push(Step::Visit(fanin1.get_node_id()));
                            stack.push(Step::Visit(fanin0.get_node_id()));
                        }
                    }
                }
                Step::Combine(id) => {
                    if self.map[id as usize].is_some() {
                        continue;
                    }
                    if let AigNode::And { fanin0, fanin1 } = *self.aig.node(id)? {
                        let (f0, f1) = (image(&self.map, fanin0)?, image(&self.map, fanin1)?);
                        self.map[id as usize] = Some(self.new.add_and(f0, f1)?);
                    }
                }
                Step::Choose(id, head) => {
                    if self.map[id as usize].is_none() {
                        self.choose(id, head)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn run(mut self) -> Result<(Aig, Vec<(NodeId, NodeId)>, Vec<NodeId>)> {
        self.map[0] = Some(AigEdge::FALSE);
        for &id in self.aig.get_inputs() {
            self.map[id as usize] = Some(AigEdge::new(self.new.add_input(), false));
        }

        let snapshots = self.options.snapshots.max(1);
        let primary = self.aig.primary_output_count();
        let kept: Vec<AigEdge> = self
            .aig
            .get_output_fanins()
            .into_iter()
            .enumerate()
            .filter(|&(k, _)| k >= primary || k % snapshots == 0)
            .map(|(_, fanin)| fanin)
            .collect();
        for fanin in &kept {
            self.build(fanin.get_node_id())?;
        }
        // Dangling logic may still provide choices
        let ands: Vec<NodeId> = self.aig.and_ids().collect();
        for id in ands {
            self.build(id)?;
        }

        for &fanin in &kept {
            let edge = image(&self.map, fanin)?;
            self.new.add_output(edge)?;
        }
        self.new.set_register_count(self.aig.register_count())?;
        Ok((self.new, self.links, self.linked))
    }
}

/// Removes from their class the choices referenced by a gate or an output: a choice must
/// only be reachable through its sibling link. Returns the number of removed choices.
pub fn remove_bad_choices(aig: &Aig, choices: &mut Partition) -> usize {
    let refs = aig.fanout_counts();
    let bad: Vec<NodeId> = choices
        .live_candidates()
        .filter(|&id| refs.get(id as usize).is_some_and(|&r| r > 0))
        .collect();
    bad.into_iter().filter(|&id| choices.excise(id)).count()
}

/// Marks the nodes reachable from the outputs, and the choices of kept classes with their
/// fanin cone.
fn mark_used_with_choices(aig: &Aig, choices: &Partition) -> Vec<bool> {
    let mut keep = aig.mark_used();
    let mut heads: Vec<NodeId> = choices
        .heads()
        .filter(|&head| keep[head as usize])
        .collect();
    while let Some(head) = heads.pop() {
        for member in choices.class_members(head).skip(1) {
            if keep[member as usize] {
                continue;
            }
            let mut dfs = Dfs::from_node(member);
            while let Some(id) = dfs.next(aig) {
                if !std::mem::replace(&mut keep[id as usize], true) && choices.is_head(id) {
                    heads.push(id);
                }
            }
        }
    }
    keep
}

/// Builds an AIG with choices from the classes of `partition`.
///
/// Failed pairs are ignored and members of the constant class are replaced by the
/// constant. Colors of `partition` are overwritten: `color_a` by
/// [`mark_independent_classes`] if [`ChoiceOptions::independent_only`] is set, `color_b` on
/// every member that was linked as a choice during construction.
///
/// ```rust
/// use aigclass::{Aig, AigEdge, choice::{ChoiceOptions, equiv_to_choices}, equiv::Partition};
/// let mut aig = Aig::new();
/// let a = AigEdge::new(aig.add_input(), false);
/// let b = AigEdge::new(aig.add_input(), false);
/// let c = AigEdge::new(aig.add_input(), false);
/// let ab = aig.add_and(a, b).unwrap();
/// let left = aig.add_and(ab, c).unwrap();
/// let bc = aig.add_and(b, c).unwrap();
/// let right = aig.add_and(a, bc).unwrap();
/// aig.add_output(left).unwrap();
/// aig.add_output(right).unwrap();
///
/// let mut p = Partition::from_pairs(aig.len(), &[(left.get_node_id(), right.get_node_id())]).unwrap();
/// let choices = equiv_to_choices(&aig, &mut p, &ChoiceOptions::default()).unwrap();
/// assert_eq!(choices.count_choices(), 1);
/// assert!(choices.check_acyclic().is_ok());
/// ```
pub fn equiv_to_choices(
    aig: &Aig,
    partition: &mut Partition,
    options: &ChoiceOptions,
) -> Result<ChoiceAig> {
    partition.validate_for(aig)?;
    partition.clear_colors();
    if options.independent_only {
        mark_independent_classes(aig, partition)?;
    }

    let (new, links, linked) = ChoiceBuilder::new(aig, partition, options).run()?;
    for id in linked {
        partition.set_color_b(id, true)?;
    }

    let mut choices = Partition::from_pairs(new.len(), &links)?;
    let bad = remove_bad_choices(&new, &mut choices);
    let keep = mark_used_with_choices(&new, &choices);
    let (clean, map) = new.dup_marked(&keep)?;
    let choices = choices.remap(&map, clean.len())?;

    debug!(
        "choices: {} linked, {} bad, {} kept in {} classes, {}",
        links.len(),
        bad,
        choices.count_live_candidates(),
        choices.count_classes(),
        clean.stats()
    );
    Ok(ChoiceAig {
        aig: clean,
        choices,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Fresh,
    Active,
    Done,
}

impl ChoiceAig {
    pub fn aig(&self) -> &Aig {
        &self.aig
    }

    /// Classes of choices, over the ids of [`ChoiceAig::aig`].
    pub fn choices(&self) -> &Partition {
        &self.choices
    }

    pub fn into_parts(self) -> (Aig, Partition) {
        (self.aig, self.choices)
    }

    /// The other implementations of `id`.
    pub fn siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let head = self.choices.class_of(id);
        let members = self
            .choices
            .is_head(head)
            .then(|| self.choices.class_members(head));
        members.into_iter().flatten().filter(move |&member| member != id)
    }

    /// Number of nodes having choices.
    pub fn count_choice_nodes(&self) -> usize {
        self.choices.count_classes()
    }

    /// Number of choices, representatives excluded.
    pub fn count_choices(&self) -> usize {
        self.choices.count_live_candidates()
    }

    /// Fanins of a whole class, each given by its class.
    fn class_fanins(&self, head: NodeId) -> Result<Vec<NodeId>> {
        let mut fanins = Vec::new();
        for member in self.choices.class_members(head) {
            for fanin in self.aig.node(member)?.get_fanins() {
                fanins.push(self.choices.class_of(fanin.get_node_id()));
            }
        }
        Ok(fanins)
    }

    /// Checks the choice structure: classes are well formed, no choice is referenced, and
    /// the AIG stays acyclic when every class is seen as a single node.
    pub fn check_acyclic(&self) -> Result<()> {
        self.choices.check()?;
        if self.choices.len() != self.aig.len() {
            return Err(EquivError::PartitionSizeMismatch {
                partition: self.choices.len(),
                aig: self.aig.len(),
            }
            .into());
        }
        let refs = self.aig.fanout_counts();
        if let Some(id) = self
            .choices
            .live_candidates()
            .find(|&id| refs[id as usize] > 0)
        {
            return Err(
                EquivError::BrokenInvariant(format!("choice {} is referenced", id)).into(),
            );
        }

        let mut marks = vec![Mark::Fresh; self.aig.len()];
        for start in 0..self.aig.len() as NodeId {
            let start = self.choices.class_of(start);
            if marks[start as usize] != Mark::Fresh {
                continue;
            }
            marks[start as usize] = Mark::Active;
            let mut stack = vec![(start, self.class_fanins(start)?, 0)];
            while let Some((id, fanins, pos)) = stack.last_mut() {
                let Some(&child) = fanins.get(*pos) else {
                    marks[*id as usize] = Mark::Done;
                    stack.pop();
                    continue;
                };
                *pos += 1;
                match marks[child as usize] {
                    Mark::Done => (),
                    Mark::Active => return Err(EquivError::CombinationalCycle(child).into()),
                    Mark::Fresh => {
                        marks[child as usize] = Mark::Active;
                        let fanins = self.class_fanins(child)?;
                        stack.push((child, fanins, 0));
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns a DOT representation, choices being linked to their representative with a
    /// [sibling edge](GraphvizStyle::edge_sibling).
    pub fn to_dot(&self, graphviz_style: GraphvizStyle) -> String {
        let siblings: Vec<(NodeId, NodeId)> = self
            .choices
            .live_candidates()
            .filter_map(|id| self.choices.repr(id).map(|head| (head, id)))
            .collect();
        self.aig.to_dot_with_siblings(&graphviz_style, &siblings)
    }
}
