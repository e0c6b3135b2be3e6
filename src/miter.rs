//! Speculative reduction: building miters for an external prover.
//!
//! Where [`crate::reduce`] replaces nodes by their representative, [`spec_reduce`] keeps the
//! original structure and appends one comparison output `node ^ representative` per unproved
//! candidate. A prover then tries to show every comparison output is constant 0, and its
//! answer is fed back with [`crate::verdict`].
//!
//! Outputs of the miter are laid out as:
//! - the original primary outputs (unless [`SpecReduceOptions::synthesis`] is set);
//! - the comparison outputs, in [trace](SpecTrace) order (a single constant 0 output if there
//!   is none);
//! - the register inputs.

mod frames;

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    Aig, AigEdge, AigError, AigNode, NodeId, NodeMap, Result,
    aig::translate,
    equiv::{Partition, SideColors},
};

pub use frames::{FramesOptions, FramesOutcome, spec_reduce_frames, spec_reduce_frames_exact};

/// Error returned when building a miter, or when reading a prover answer back, fails.
#[derive(Debug, Error)]
pub enum MiterError {
    /// A guide must have one entry per live candidate.
    #[error("guide has {guide} entries but the partition has {candidates} live candidates")]
    GuideLengthMismatch { guide: usize, candidates: usize },

    /// A guide entry does not refer to the expected candidate.
    #[error("guide entry {index} refers to node {guide}, expected candidate {candidate}")]
    GuideNodeMismatch {
        index: usize,
        guide: NodeId,
        candidate: NodeId,
    },

    /// The prover answer does not have the outputs of the miter.
    #[error("expected {expected} outputs, got {actual}")]
    OutputCountMismatch { expected: usize, actual: usize },

    /// The partition changed since the miter was built.
    #[error("trace does not match the partition anymore: {0}")]
    StaleTrace(String),

    /// Output index given by a prover is out of bounds.
    #[error("output index {index} is out of range (miter has {count} outputs)")]
    OutputIndexOutOfRange { index: usize, count: usize },

    /// The same output was reported twice.
    #[error("output index {0} was given more than once")]
    DuplicateOutputIndex(usize),

    /// Unrolling only makes sense for sequential AIGs.
    #[error("the AIG has no register to unroll")]
    NotSequential,

    /// The initial state must give a value to every register.
    #[error("initial state has {actual} values but the AIG has {expected} registers")]
    InitialStateMismatch { expected: usize, actual: usize },

    /// At least one frame is needed.
    #[error("the number of frames must be positive")]
    NoFrames,
}

/// What happens to a candidate once its comparison is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpecMode {
    /// The candidate is replaced by its representative in its fanout, exposing more
    /// comparisons downstream.
    #[default]
    Speculate,
    /// The candidate keeps its own implementation.
    TraceOnly,
}

#[derive(Debug, Clone, Default)]
pub struct SpecReduceOptions {
    pub mode: SpecMode,
    /// Pairs crossing the sides of a dual-output miter are not compared.
    pub dual_output: bool,
    /// Only keep comparison outputs (and register inputs).
    pub synthesis: bool,
}

/// One candidate met during speculative reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub node: NodeId,
    /// A comparison output was emitted for this candidate.
    pub emitted: bool,
}

/// The candidates met during speculative reduction, one entry per live candidate in
/// increasing id order.
///
/// The `k`-th emitted entry owns the `k`-th comparison output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecTrace(Vec<TraceEntry>);

impl SpecTrace {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.0.iter()
    }

    /// Candidates with a comparison output, in output order.
    pub fn emitted(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().filter(|e| e.emitted).map(|e| e.node)
    }

    pub fn emitted_count(&self) -> usize {
        self.0.iter().filter(|e| e.emitted).count()
    }

    fn push(&mut self, entry: TraceEntry) {
        self.0.push(entry);
    }

    /// Checks that the trace lists exactly the live candidates of `partition`.
    pub(crate) fn check_against(&self, partition: &Partition) -> std::result::Result<(), MiterError> {
        let candidates = partition.count_live_candidates();
        if self.len() != candidates {
            return Err(MiterError::StaleTrace(format!(
                "{} entries for {} live candidates",
                self.len(),
                candidates
            )));
        }
        for (entry, candidate) in self.iter().zip(partition.live_candidates()) {
            if entry.node != candidate {
                return Err(MiterError::StaleTrace(format!(
                    "node {} is not a candidate anymore",
                    entry.node
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<TraceEntry> for SpecTrace {
    fn from_iter<T: IntoIterator<Item = TraceEntry>>(iter: T) -> Self {
        SpecTrace(iter.into_iter().collect())
    }
}

/// A miter together with what is needed to read the prover answer back.
#[derive(Debug, Clone)]
pub struct SpecReduction {
    pub aig: Aig,
    pub trace: SpecTrace,
    /// Index of the first comparison output.
    pub first_comparison: usize,
    /// Number of comparison outputs (the constant 0 placeholder excluded).
    pub comparisons: usize,
}

impl SpecReduction {
    /// Indices of the comparison outputs.
    pub fn comparison_outputs(&self) -> std::ops::Range<usize> {
        self.first_comparison..self.first_comparison + self.comparisons
    }

    /// The candidate compared by output `index`, if it is a comparison output.
    pub fn candidate_of_output(&self, index: usize) -> Option<NodeId> {
        let k = index.checked_sub(self.first_comparison)?;
        if k >= self.comparisons {
            return None;
        }
        self.trace.emitted().nth(k)
    }
}

/// Builds copies of an AIG, comparing every candidate with its representative.
pub(crate) struct Speculator<'a> {
    aig: &'a Aig,
    partition: &'a Partition,
    mode: SpecMode,
    phases: Vec<bool>,
    colors: Option<SideColors>,
}

fn image(map: &NodeMap, edge: AigEdge) -> Result<AigEdge> {
    translate(map, edge).ok_or(AigError::InvalidState(format!(
        "node {} was used before being built",
        edge.get_node_id()
    )))
}

impl<'a> Speculator<'a> {
    pub(crate) fn new(
        aig: &'a Aig,
        partition: &'a Partition,
        mode: SpecMode,
        dual_output: bool,
    ) -> Result<Self> {
        partition.validate_for(aig)?;
        let colors = if dual_output {
            Some(SideColors::compute(aig)?)
        } else {
            None
        };
        Ok(Speculator {
            aig,
            partition,
            mode,
            phases: aig.phases(),
            colors,
        })
    }

    fn comparable(&self, id: NodeId, head: NodeId) -> bool {
        !self.partition.is_failed(id)
            && self
                .colors
                .as_ref()
                .is_none_or(|colors| !colors.crosses_sides(id, head))
    }

    /// Builds one copy of every AND gate into `new`, the constant and inputs being already
    /// mapped. Comparisons are appended to `comparisons`, one trace entry per candidate.
    pub(crate) fn build_copy(
        &self,
        new: &mut Aig,
        map: &mut NodeMap,
        guide: Option<&SpecTrace>,
        trace: &mut SpecTrace,
        comparisons: &mut Vec<AigEdge>,
    ) -> Result<()> {
        for (id, node) in self.aig.iter() {
            if let AigNode::And { fanin0, fanin1 } = *node {
                let (f0, f1) = (image(map, fanin0)?, image(map, fanin1)?);
                map[id as usize] = Some(new.add_and(f0, f1)?);
            }
            let Some(head) = self.partition.repr(id) else {
                continue;
            };
            let index = trace.len();
            if !self.comparable(id, head) {
                trace.push(TraceEntry { node: id, emitted: false });
                continue;
            }

            let actual = image(map, AigEdge::new(id, false))?;
            let complement = self.phases[id as usize] ^ self.phases[head as usize];
            let candidate = image(map, AigEdge::new(head, complement))?;
            let wanted = guide.is_none_or(|g| g.entries().get(index).is_some_and(|e| e.emitted));
            let emitted = actual != candidate && !self.partition.is_proved(id) && wanted;
            if emitted {
                trace!("comparing node {} with {}", id, head);
                comparisons.push(new.add_xor(actual, candidate)?);
            }
            trace.push(TraceEntry { node: id, emitted });
            if self.mode == SpecMode::Speculate {
                map[id as usize] = Some(candidate);
            }
        }
        Ok(())
    }
}

fn check_guide(partition: &Partition, guide: &SpecTrace) -> std::result::Result<(), MiterError> {
    let candidates = partition.count_live_candidates();
    if guide.len() != candidates {
        return Err(MiterError::GuideLengthMismatch {
            guide: guide.len(),
            candidates,
        });
    }
    for (index, (entry, candidate)) in guide.iter().zip(partition.live_candidates()).enumerate() {
        if entry.node != candidate {
            return Err(MiterError::GuideNodeMismatch {
                index,
                guide: entry.node,
                candidate,
            });
        }
    }
    Ok(())
}

fn spec_reduce_with(
    aig: &Aig,
    partition: &Partition,
    options: &SpecReduceOptions,
    guide: Option<&SpecTrace>,
) -> Result<SpecReduction> {
    let speculator = Speculator::new(aig, partition, options.mode, options.dual_output)?;

    let mut new = Aig::with_hashing();
    let mut map: NodeMap = vec![None; aig.len()];
    map[0] = Some(AigEdge::FALSE);
    for &id in aig.get_inputs() {
        map[id as usize] = Some(AigEdge::new(new.add_input(), false));
    }

    let mut trace = SpecTrace::default();
    let mut comparisons = Vec::new();
    speculator.build_copy(&mut new, &mut map, guide, &mut trace, &mut comparisons)?;

    let fanins = aig.get_output_fanins();
    let (primary, next_state) = fanins.split_at(aig.primary_output_count());
    let mut first_comparison = 0;
    if !options.synthesis {
        for &fanin in primary {
            new.add_output(image(&map, fanin)?)?;
        }
        first_comparison = primary.len();
    }
    for &comparison in &comparisons {
        new.add_output(comparison)?;
    }
    if comparisons.is_empty() {
        new.add_output(AigEdge::FALSE)?;
    }
    for &fanin in next_state {
        new.add_output(image(&map, fanin)?)?;
    }
    new.set_register_count(aig.register_count())?;
    let (miter, _) = new.cleanup()?;

    debug!(
        "speculative reduction: {} candidates, {} comparisons, {}",
        trace.len(),
        comparisons.len(),
        miter.stats()
    );
    Ok(SpecReduction {
        aig: miter,
        trace,
        first_comparison,
        comparisons: comparisons.len(),
    })
}

/// Builds a miter comparing every unproved candidate with its representative.
///
/// The trace has one entry per live candidate. Failed pairs, and pairs crossing sides in
/// dual-output mode, are recorded as not emitted and never speculated.
///
/// ```rust
/// use aigclass::{Aig, AigEdge, equiv::Partition, miter::{SpecReduceOptions, spec_reduce}};
/// let mut aig = Aig::new();
/// let a = AigEdge::new(aig.add_input(), false);
/// let b = AigEdge::new(aig.add_input(), false);
/// let x = aig.add_and(a, b).unwrap();
/// let y = aig.add_and(a, !b).unwrap();
/// aig.add_output(x).unwrap();
/// aig.add_output(y).unwrap();
///
/// let p = Partition::from_pairs(aig.len(), &[(x.get_node_id(), y.get_node_id())]).unwrap();
/// let srm = spec_reduce(&aig, &p, &SpecReduceOptions::default()).unwrap();
/// assert_eq!(srm.aig.output_count(), 3);
/// assert_eq!(srm.comparison_outputs(), 2..3);
/// assert_eq!(srm.candidate_of_output(2), Some(y.get_node_id()));
/// ```
pub fn spec_reduce(
    aig: &Aig,
    partition: &Partition,
    options: &SpecReduceOptions,
) -> Result<SpecReduction> {
    spec_reduce_with(aig, partition, options, None)
}

/// Same as [`spec_reduce`], but a comparison is only emitted for candidates flagged as emitted
/// in `guide`, typically the trace of a previous pass. The trace still gets one entry per
/// candidate.
pub fn spec_reduce_guided(
    aig: &Aig,
    partition: &Partition,
    options: &SpecReduceOptions,
    guide: &SpecTrace,
) -> Result<SpecReduction> {
    check_guide(partition, guide)?;
    spec_reduce_with(aig, partition, options, Some(guide))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::equiv::EquivError;

    /// `x = a & b`, `y = a & b & c` (not equivalent), `z = a & b` (equivalent to `x`).
    fn sample() -> (Aig, [NodeId; 3]) {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let c = AigEdge::new(aig.add_input(), false);
        let x = aig.add_and(a, b).unwrap();
        let y = aig.add_and(x, c).unwrap();
        let z = aig.add_and(b, a).unwrap();
        let top = aig.add_and(y, z).unwrap();
        aig.add_output(top).unwrap();
        (aig, [x, y, z].map(|e| e.get_node_id()))
    }

    #[test]
    fn spec_reduce_test() {
        let (aig, [x, y, z]) = sample();
        let p = Partition::from_pairs(aig.len(), &[(x, y), (x, z)]).unwrap();
        let srm = spec_reduce(&aig, &p, &SpecReduceOptions::default()).unwrap();

        // z is hashed onto x, only y needs a comparison
        assert_eq!(
            srm.trace.entries(),
            &[
                TraceEntry { node: y, emitted: true },
                TraceEntry { node: z, emitted: false }
            ]
        );
        assert_eq!(srm.first_comparison, 1);
        assert_eq!(srm.comparisons, 1);
        assert_eq!(srm.aig.output_count(), 2);

        // Primary output is speculated: top = x & x = a & b, the comparison
        // is x ^ (x & c) = a & b & !c
        let tables = srm.aig.truth_tables().unwrap();
        assert_eq!(tables[0], vec![0x88]);
        assert_eq!(tables[1], vec![0x08]);
    }

    #[test]
    fn trace_only_test() {
        let (aig, [x, y, _]) = sample();
        let p = Partition::from_pairs(aig.len(), &[(x, y)]).unwrap();
        let options = SpecReduceOptions {
            mode: SpecMode::TraceOnly,
            ..Default::default()
        };
        let srm = spec_reduce(&aig, &p, &options).unwrap();
        assert_eq!(srm.comparisons, 1);
        // Original behavior is kept
        assert_eq!(
            srm.aig.truth_tables().unwrap()[0],
            aig.truth_tables().unwrap()[0]
        );
    }

    #[test]
    fn proved_and_failed_test() {
        let (aig, [x, y, _]) = sample();
        let mut p = Partition::from_pairs(aig.len(), &[(x, y)]).unwrap();
        p.set_proved(y, true).unwrap();
        let srm = spec_reduce(&aig, &p, &SpecReduceOptions::default()).unwrap();
        assert_eq!(srm.trace.emitted_count(), 0);
        // Constant 0 placeholder
        assert_eq!(srm.aig.output_count(), 2);
        assert_eq!(srm.aig.output_fanin(1), Some(AigEdge::FALSE));
        assert_eq!(srm.comparison_outputs(), 1..1);

        let mut p = Partition::from_pairs(aig.len(), &[(x, y)]).unwrap();
        p.set_failed(y, true).unwrap();
        let srm = spec_reduce(&aig, &p, &SpecReduceOptions::default()).unwrap();
        assert_eq!(srm.trace.entries(), &[TraceEntry { node: y, emitted: false }]);
    }

    #[test]
    fn synthesis_test() {
        let (aig, [x, y, _]) = sample();
        let p = Partition::from_pairs(aig.len(), &[(x, y)]).unwrap();
        let options = SpecReduceOptions {
            synthesis: true,
            ..Default::default()
        };
        let srm = spec_reduce(&aig, &p, &options).unwrap();
        assert_eq!(srm.first_comparison, 0);
        assert_eq!(srm.aig.output_count(), 1);
        assert_eq!(srm.candidate_of_output(0), Some(y));
    }

    #[test]
    fn registers_last_test() {
        let mut aig = Aig::new();
        let i = AigEdge::new(aig.add_input(), false);
        let r = AigEdge::new(aig.add_input(), false);
        let x = aig.add_and(i, r).unwrap();
        let y = aig.add_and(i, !r).unwrap();
        aig.add_output(x).unwrap();
        aig.add_output(y).unwrap();
        aig.set_register_count(1).unwrap();

        let p = Partition::from_pairs(aig.len(), &[(x.get_node_id(), y.get_node_id())]).unwrap();
        let srm = spec_reduce(&aig, &p, &SpecReduceOptions::default()).unwrap();
        assert_eq!(srm.aig.register_count(), 1);
        assert_eq!(srm.aig.output_count(), 3);
        assert_eq!(srm.comparison_outputs(), 1..2);
        // The register input is speculated too: y became !x
        let x_new = srm.aig.output_fanin(0).unwrap();
        assert_eq!(srm.aig.output_fanin(2), Some(!x_new));
    }

    #[test]
    fn guided_test() {
        let (aig, [x, y, z]) = sample();
        let p = Partition::from_pairs(aig.len(), &[(x, y), (x, z)]).unwrap();
        let options = SpecReduceOptions::default();
        let first = spec_reduce(&aig, &p, &options).unwrap();

        let guided = spec_reduce_guided(&aig, &p, &options, &first.trace).unwrap();
        assert_eq!(guided.trace, first.trace);
        assert_eq!(guided.aig.output_count(), first.aig.output_count());

        let nothing: SpecTrace = first
            .trace
            .iter()
            .map(|e| TraceEntry { node: e.node, emitted: false })
            .collect();
        let guided = spec_reduce_guided(&aig, &p, &options, &nothing).unwrap();
        assert_eq!(guided.comparisons, 0);
        assert_eq!(guided.trace.len(), 2);

        let short: SpecTrace = first.trace.iter().take(1).copied().collect();
        assert!(matches!(
            spec_reduce_guided(&aig, &p, &options, &short),
            Err(AigError::MiterError(MiterError::GuideLengthMismatch { guide: 1, candidates: 2 }))
        ));
        let shifted: SpecTrace = first
            .trace
            .iter()
            .map(|e| TraceEntry { node: e.node + 1, emitted: e.emitted })
            .collect();
        assert!(matches!(
            spec_reduce_guided(&aig, &p, &options, &shifted),
            Err(AigError::MiterError(MiterError::GuideNodeMismatch { index: 0, .. }))
        ));
    }

    /// `(a & b) & c` on side A and `a & (b & c)` on side B.
    fn associativity_miter() -> (Aig, Partition, NodeId) {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let c = AigEdge::new(aig.add_input(), false);
        let ab = aig.add_and(a, b).unwrap();
        let left = aig.add_and(ab, c).unwrap();
        let bc = aig.add_and(b, c).unwrap();
        let right = aig.add_and(a, bc).unwrap();
        aig.add_output(left).unwrap();
        aig.add_output(right).unwrap();
        let p = Partition::from_pairs(aig.len(), &[(left.get_node_id(), right.get_node_id())])
            .unwrap();
        (aig, p, right.get_node_id())
    }

    #[test]
    fn dual_output_test() {
        let (aig, p, right) = associativity_miter();

        let srm = spec_reduce(&aig, &p, &SpecReduceOptions::default()).unwrap();
        assert_eq!(srm.comparisons, 1);
        assert_eq!(srm.trace.entries(), &[TraceEntry { node: right, emitted: true }]);

        // The pair crosses sides: recorded, but neither compared nor speculated
        let options = SpecReduceOptions {
            dual_output: true,
            ..Default::default()
        };
        let srm = spec_reduce(&aig, &p, &options).unwrap();
        assert_eq!(srm.trace.entries(), &[TraceEntry { node: right, emitted: false }]);
        assert_eq!(srm.comparisons, 0);
        assert_eq!(srm.aig.output_count(), 3);
        assert_eq!(srm.aig.output_fanin(2), Some(AigEdge::FALSE));
        assert_ne!(srm.aig.output_fanin(0), srm.aig.output_fanin(1));
        assert_eq!(srm.aig.and_count(), 4);
    }

    #[test]
    fn spec_reduce_errors_test() {
        let (aig, _) = sample();
        assert!(matches!(
            spec_reduce(&aig, &Partition::with_len(2), &SpecReduceOptions::default()),
            Err(AigError::EquivError(EquivError::PartitionSizeMismatch { .. }))
        ));
        let options = SpecReduceOptions {
            dual_output: true,
            ..Default::default()
        };
        assert!(spec_reduce(&aig, &Partition::with_len(aig.len()), &options).is_err());
    }
}
