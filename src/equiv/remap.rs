use tracing::debug;

use crate::{NodeId, NodeMap};

use super::{EquivError, Partition};

impl Partition {
    /// Carries the classes to another id space, typically after the AIG was rebuilt.
    ///
    /// `map` gives the image of every old node (`None` for dropped nodes). Members mapped to
    /// the same new node merge, members mapped to the constant join the constant class, and
    /// every class is headed by its smallest new id. Proof flags are not carried.
    pub fn remap(&self, map: &NodeMap, new_len: usize) -> Result<Partition, EquivError> {
        if map.len() != self.len() {
            return Err(EquivError::PartitionSizeMismatch {
                partition: self.len(),
                aig: map.len(),
            });
        }
        let mut remapped = Partition::with_len(new_len);

        let image = |id: NodeId| map[id as usize].map(|edge| edge.get_node_id());
        let heads = std::iter::once(0).chain(self.heads());
        for head in heads {
            let mut images = self.class_members(head).filter_map(image);
            let Some(first) = images.next() else {
                continue;
            };
            for other in images {
                remapped.merge_pair(first, other)?;
            }
        }

        debug!(
            "remapped {} candidates into {} candidates",
            self.count_live_candidates(),
            remapped.count_live_candidates()
        );
        Ok(remapped)
    }
}
