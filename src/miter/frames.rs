//! Speculative reduction over several time frames of a sequential AIG.

use tracing::{debug, info};

use crate::{Aig, AigEdge, NodeId, NodeMap, Result, equiv::Partition};

use super::{MiterError, SpecMode, SpecTrace, Speculator, image};

#[derive(Debug, Clone)]
pub struct FramesOptions {
    /// Never unroll more frames than this.
    pub max_frames: usize,
    /// Stop once this many comparisons are built, `0` meaning half the live candidates plus one.
    pub min_outputs: usize,
    /// Give up when another frame is needed but the unrolled AIG already has more AND gates.
    pub and_budget: usize,
    pub dual_output: bool,
}

impl Default for FramesOptions {
    fn default() -> Self {
        FramesOptions {
            max_frames: 16,
            min_outputs: 0,
            and_budget: 500_000,
            dual_output: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FramesOutcome {
    /// A combinational miter with one comparison output per `(frame, candidate)` in
    /// `compared` (or a single constant 0 output when `compared` is empty).
    Unrolled {
        aig: Aig,
        frames: usize,
        compared: Vec<(usize, NodeId)>,
    },
    /// The unrolled AIG grew over the AND budget.
    GaveUp { frames: usize, and_count: usize },
}

struct Unroller<'a> {
    aig: &'a Aig,
    speculator: Speculator<'a>,
    new: Aig,
    /// Values of the register outputs in the next frame.
    state: Vec<AigEdge>,
    comparisons: Vec<AigEdge>,
    compared: Vec<(usize, NodeId)>,
    frames: usize,
}

impl<'a> Unroller<'a> {
    fn new(
        aig: &'a Aig,
        partition: &'a Partition,
        init: &[bool],
        options: &FramesOptions,
    ) -> Result<Self> {
        if aig.is_combinational() {
            return Err(MiterError::NotSequential.into());
        }
        if init.len() != aig.register_count() {
            return Err(MiterError::InitialStateMismatch {
                expected: aig.register_count(),
                actual: init.len(),
            }
            .into());
        }
        let speculator = Speculator::new(aig, partition, SpecMode::Speculate, options.dual_output)?;
        Ok(Unroller {
            aig,
            speculator,
            new: Aig::with_hashing(),
            state: init
                .iter()
                .map(|&value| if value { AigEdge::TRUE } else { AigEdge::FALSE })
                .collect(),
            comparisons: Vec::new(),
            compared: Vec::new(),
            frames: 0,
        })
    }

    fn add_frame(&mut self) -> Result<()> {
        let mut map: NodeMap = vec![None; self.aig.len()];
        map[0] = Some(AigEdge::FALSE);
        let primary = &self.aig.get_inputs()[..self.aig.primary_input_count()];
        for &id in primary {
            map[id as usize] = Some(AigEdge::new(self.new.add_input(), false));
        }
        for (&id, &value) in self.aig.register_outputs().iter().zip(&self.state) {
            map[id as usize] = Some(value);
        }

        let mut trace = SpecTrace::default();
        self.speculator
            .build_copy(&mut self.new, &mut map, None, &mut trace, &mut self.comparisons)?;
        self.compared
            .extend(trace.emitted().map(|node| (self.frames, node)));

        let fanins = self.aig.get_output_fanins();
        self.state = fanins[self.aig.primary_output_count()..]
            .iter()
            .map(|&fanin| image(&map, fanin))
            .collect::<Result<_>>()?;
        self.frames += 1;
        debug!(
            "frame {}: {} comparisons, {} and gates",
            self.frames,
            self.comparisons.len(),
            self.new.and_count()
        );
        Ok(())
    }

    fn over_budget(&self, options: &FramesOptions) -> Option<FramesOutcome> {
        let and_count = self.new.and_count();
        (and_count > options.and_budget).then(|| {
            info!(
                "giving up after {} frames: {} and gates exceed the budget of {}",
                self.frames, and_count, options.and_budget
            );
            FramesOutcome::GaveUp {
                frames: self.frames,
                and_count,
            }
        })
    }

    fn finish(mut self) -> Result<FramesOutcome> {
        for &comparison in &self.comparisons {
            self.new.add_output(comparison)?;
        }
        if self.comparisons.is_empty() {
            self.new.add_output(AigEdge::FALSE)?;
        }
        let (aig, _) = self.new.cleanup()?;
        Ok(FramesOutcome::Unrolled {
            aig,
            frames: self.frames,
            compared: self.compared,
        })
    }
}

/// Unrolls the AIG from the initial register state `init`, comparing every unproved
/// candidate with its representative in every frame.
///
/// Frames are added until there are enough comparisons (see [`FramesOptions::min_outputs`])
/// or [`FramesOptions::max_frames`] is reached. Register outputs of the first frame are the
/// constants of `init`, those of the next frames are the register inputs of the previous one.
/// Primary inputs are fresh in every frame.
pub fn spec_reduce_frames(
    aig: &Aig,
    partition: &Partition,
    init: &[bool],
    options: &FramesOptions,
) -> Result<FramesOutcome> {
    if options.max_frames == 0 {
        return Err(MiterError::NoFrames.into());
    }
    let mut unroller = Unroller::new(aig, partition, init, options)?;
    let wanted = match options.min_outputs {
        0 => partition.count_live_candidates() / 2 + 1,
        n => n,
    };

    loop {
        unroller.add_frame()?;
        if unroller.comparisons.len() >= wanted {
            break;
        }
        if unroller.frames == options.max_frames {
            info!(
                "stopping at the frame cap ({}) with {} of {} wanted comparisons",
                options.max_frames,
                unroller.comparisons.len(),
                wanted
            );
            break;
        }
        if let Some(outcome) = unroller.over_budget(options) {
            return Ok(outcome);
        }
    }
    unroller.finish()
}

/// Same as [`spec_reduce_frames`] with exactly `frames` frames.
pub fn spec_reduce_frames_exact(
    aig: &Aig,
    partition: &Partition,
    init: &[bool],
    frames: usize,
    options: &FramesOptions,
) -> Result<FramesOutcome> {
    if frames == 0 {
        return Err(MiterError::NoFrames.into());
    }
    let mut unroller = Unroller::new(aig, partition, init, options)?;
    for frame in 0..frames {
        if frame > 0 {
            if let Some(outcome) = unroller.over_budget(options) {
                return Ok(outcome);
            }
        }
        unroller.add_frame()?;
    }
    unroller.finish()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::AigError;

    /// Inputs `i`, `j` and register `r` with next state `i & !r`.
    /// Candidates `x = i & r` and `y = i & !r` are not equivalent.
    fn sequential() -> (Aig, Partition) {
        let mut aig = Aig::new();
        let i = AigEdge::new(aig.add_input(), false);
        let j = AigEdge::new(aig.add_input(), false);
        let r = AigEdge::new(aig.add_input(), false);
        let x = aig.add_and(i, r).unwrap();
        let y = aig.add_and(i, !r).unwrap();
        let g = aig.add_and(i, j).unwrap();
        aig.add_output(g).unwrap();
        aig.add_output(y).unwrap();
        aig.set_register_count(1).unwrap();
        let p = Partition::from_pairs(aig.len(), &[(x.get_node_id(), y.get_node_id())]).unwrap();
        (aig, p)
    }

    #[test]
    fn frames_stop_when_enough_test() {
        let (aig, p) = sequential();
        let outcome = spec_reduce_frames(&aig, &p, &[false], &FramesOptions::default()).unwrap();
        let FramesOutcome::Unrolled {
            aig: unrolled,
            frames,
            compared,
        } = outcome
        else {
            panic!("unexpected give up");
        };
        // One live candidate: a single comparison is enough
        assert_eq!(frames, 1);
        assert_eq!(compared, vec![(0, 5)]);
        assert_eq!(unrolled.output_count(), 1);
        assert_eq!(unrolled.register_count(), 0);
        assert_eq!(unrolled.input_count(), 2);
    }

    #[test]
    fn frames_min_outputs_and_cap_test() {
        let (aig, p) = sequential();
        let options = FramesOptions {
            min_outputs: 2,
            ..Default::default()
        };
        let outcome = spec_reduce_frames(&aig, &p, &[false], &options).unwrap();
        assert!(matches!(outcome, FramesOutcome::Unrolled { frames: 2, .. }));

        let options = FramesOptions {
            min_outputs: 10,
            max_frames: 3,
            ..Default::default()
        };
        let outcome = spec_reduce_frames(&aig, &p, &[false], &options).unwrap();
        let FramesOutcome::Unrolled { aig: unrolled, frames, compared } = outcome else {
            panic!("unexpected give up");
        };
        assert_eq!(frames, 3);
        assert_eq!(compared, vec![(0, 5), (1, 5), (2, 5)]);
        assert_eq!(unrolled.output_count(), 3);
        assert_eq!(unrolled.input_count(), 6);
    }

    #[test]
    fn frames_exact_test() {
        let (aig, p) = sequential();
        let outcome =
            spec_reduce_frames_exact(&aig, &p, &[false], 2, &FramesOptions::default()).unwrap();
        let FramesOutcome::Unrolled { aig: unrolled, frames, .. } = outcome else {
            panic!("unexpected give up");
        };
        assert_eq!(frames, 2);
        // Frame 0 compares !i0 (y = i0, x = 0), frame 1 compares !i1 (y = 0, x = i1)
        let tables = unrolled.truth_tables().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(unrolled.input_count(), 4);
    }

    #[test]
    fn frames_budget_test() {
        let (aig, p) = sequential();
        let options = FramesOptions {
            and_budget: 0,
            ..Default::default()
        };
        // The first frame is already enough, the budget only matters for the next one
        let outcome = spec_reduce_frames(&aig, &p, &[false], &options).unwrap();
        assert!(matches!(outcome, FramesOutcome::Unrolled { frames: 1, .. }));
        let outcome = spec_reduce_frames_exact(&aig, &p, &[false], 1, &options).unwrap();
        assert!(matches!(outcome, FramesOutcome::Unrolled { frames: 1, .. }));

        let options = FramesOptions {
            and_budget: 0,
            min_outputs: 2,
            ..Default::default()
        };
        let outcome = spec_reduce_frames(&aig, &p, &[false], &options).unwrap();
        assert!(matches!(
            outcome,
            FramesOutcome::GaveUp { frames: 1, and_count: 1 }
        ));
        let outcome = spec_reduce_frames_exact(&aig, &p, &[false], 2, &options).unwrap();
        assert!(matches!(
            outcome,
            FramesOutcome::GaveUp { frames: 1, and_count: 1 }
        ));
    }

    #[test]
    fn frames_dual_output_test() {
        // Side A computes (a & b) & c, side B a & (b & c), the register only holds itself
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let c = AigEdge::new(aig.add_input(), false);
        let r = AigEdge::new(aig.add_input(), false);
        let ab = aig.add_and(a, b).unwrap();
        let left = aig.add_and(ab, c).unwrap();
        let bc = aig.add_and(b, c).unwrap();
        let right = aig.add_and(a, bc).unwrap();
        aig.add_output(left).unwrap();
        aig.add_output(right).unwrap();
        aig.add_output(r).unwrap();
        aig.set_register_count(1).unwrap();
        let right = right.get_node_id();
        let p = Partition::from_pairs(aig.len(), &[(left.get_node_id(), right)]).unwrap();

        let options = FramesOptions {
            max_frames: 2,
            ..Default::default()
        };
        let outcome = spec_reduce_frames(&aig, &p, &[false], &options).unwrap();
        let FramesOutcome::Unrolled { frames, compared, .. } = outcome else {
            panic!("unexpected give up");
        };
        assert_eq!(frames, 1);
        assert_eq!(compared, vec![(0, right)]);

        let options = FramesOptions {
            dual_output: true,
            ..options
        };
        let outcome = spec_reduce_frames(&aig, &p, &[false], &options).unwrap();
        let FramesOutcome::Unrolled { aig: unrolled, frames, compared } = outcome else {
            panic!("unexpected give up");
        };
        assert_eq!(frames, 2);
        assert!(compared.is_empty());
        assert_eq!(unrolled.output_count(), 1);
        assert_eq!(unrolled.output_fanin(0), Some(AigEdge::FALSE));
    }

    #[test]
    fn frames_errors_test() {
        let (aig, p) = sequential();
        let options = FramesOptions::default();
        assert!(matches!(
            spec_reduce_frames(&aig, &p, &[], &options),
            Err(AigError::MiterError(MiterError::InitialStateMismatch { expected: 1, actual: 0 }))
        ));
        assert!(matches!(
            spec_reduce_frames_exact(&aig, &p, &[false], 0, &options),
            Err(AigError::MiterError(MiterError::NoFrames))
        ));

        let mut comb = Aig::new();
        let a = AigEdge::new(comb.add_input(), false);
        comb.add_output(a).unwrap();
        let p = Partition::with_len(comb.len());
        assert!(matches!(
            spec_reduce_frames(&comb, &p, &[], &options),
            Err(AigError::MiterError(MiterError::NotSequential))
        ));
    }
}
