use tracing::debug;

use crate::{
    Aig, NodeId,
    equiv::{EquivError, Partition},
};

/// Returns true if the fanin cone of `root` (`root` excluded) contains a marked node.
/// `seen` is left cleared.
fn cone_has_marked(aig: &Aig, root: NodeId, marked: &[bool], seen: &mut [bool]) -> bool {
    let mut stack: Vec<NodeId> = aig
        .get_node(root)
        .map(|node| node.get_fanins().iter().map(|f| f.get_node_id()).collect())
        .unwrap_or_default();
    let mut visited = Vec::new();
    let mut found = false;
    while let Some(id) = stack.pop() {
        if std::mem::replace(&mut seen[id as usize], true) {
            continue;
        }
        visited.push(id);
        if marked[id as usize] {
            found = true;
            break;
        }
        if let Some(node) = aig.get_node(id) {
            stack.extend(node.get_fanins().iter().map(|f| f.get_node_id()));
        }
    }
    for id in visited {
        seen[id as usize] = false;
    }
    found
}

/// Sets `color_a` on the class members that can be kept side by side: every head, and
/// every member whose fanin cone contains neither its head nor a previously marked member
/// of its class. The constant class is left alone.
///
/// Returns the number of marked members, heads excluded.
pub fn mark_independent_classes(aig: &Aig, partition: &mut Partition) -> Result<usize, EquivError> {
    partition.validate_for(aig)?;
    let mut marked = vec![false; aig.len()];
    let mut seen = vec![false; aig.len()];
    let mut count = 0;

    let heads: Vec<NodeId> = partition.heads().collect();
    for head in heads {
        let members: Vec<NodeId> = partition.class_members(head).collect();
        let mut independent = vec![head];
        marked[head as usize] = true;
        partition.set_color_a(head, true)?;
        for &member in &members[1..] {
            if !cone_has_marked(aig, member, &marked, &mut seen) {
                marked[member as usize] = true;
                independent.push(member);
                partition.set_color_a(member, true)?;
                count += 1;
            }
        }
        for id in independent {
            marked[id as usize] = false;
        }
    }
    debug!("{} independent class members", count);
    Ok(count)
}
