//! Reading prover answers back into a [`Partition`].
//!
//! A prover gets the miter of a [`SpecReduction`] and answers with an AIG of the same shape
//! where every comparison output it proved is driven by the constant 0. Both functions here
//! validate everything before touching the partition: on error, the partition is unchanged.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::{
    Aig, NodeId, Result,
    equiv::Partition,
    miter::{MiterError, SpecReduction},
};

/// Marks proved every candidate whose comparison output is the constant 0 in `verdict`.
///
/// Returns the number of newly proved candidates.
pub fn mark_proved(partition: &mut Partition, srm: &SpecReduction, verdict: &Aig) -> Result<usize> {
    if verdict.output_count() != srm.aig.output_count() {
        return Err(MiterError::OutputCountMismatch {
            expected: srm.aig.output_count(),
            actual: verdict.output_count(),
        }
        .into());
    }
    srm.trace.check_against(partition)?;
    if srm.trace.emitted_count() != srm.comparisons {
        return Err(MiterError::StaleTrace(format!(
            "{} emitted entries for {} comparison outputs",
            srm.trace.emitted_count(),
            srm.comparisons
        ))
        .into());
    }

    let proved: Vec<NodeId> = srm
        .trace
        .emitted()
        .zip(srm.comparison_outputs())
        .filter(|&(_, index)| verdict.output_fanin(index).is_some_and(|f| f.is_cst_false()))
        .map(|(node, _)| node)
        .filter(|&node| !partition.is_proved(node))
        .collect();
    for &node in &proved {
        partition.set_proved(node, true)?;
    }
    debug!(
        "{} of {} comparisons proved",
        proved.len(),
        srm.comparisons
    );
    Ok(proved.len())
}

/// Removes from their class the candidates whose comparison output was disproved.
///
/// `outputs` are output indices of the miter. Indices of other outputs are ignored with a
/// warning. Returns the number of removed candidates.
pub fn excise_disproved(
    partition: &mut Partition,
    srm: &SpecReduction,
    outputs: &[usize],
) -> Result<usize> {
    srm.trace.check_against(partition)?;
    let count = srm.aig.output_count();
    let mut seen = FxHashSet::default();
    for &index in outputs {
        if index >= count {
            return Err(MiterError::OutputIndexOutOfRange { index, count }.into());
        }
        if !seen.insert(index) {
            return Err(MiterError::DuplicateOutputIndex(index).into());
        }
    }

    let mut disproved = Vec::new();
    for &index in outputs {
        match srm.candidate_of_output(index) {
            Some(node) => disproved.push(node),
            None if index < srm.first_comparison => {
                warn!("original output {} was disproved", index)
            }
            None => warn!("output {} is not a comparison output, ignoring it", index),
        }
    }
    let removed = disproved
        .into_iter()
        .filter(|&node| partition.excise(node))
        .count();
    debug!("{} disproved candidates removed from their class", removed);
    Ok(removed)
}
