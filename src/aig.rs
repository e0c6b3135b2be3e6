//! Module defining the [`Aig`] struct, as well as [`AigNode`], [`AigEdge`] and some others relevant structs.
//!
//! Nodes live in a dense arena indexed by [`NodeId`], in topological order: every fanin of a
//! node has a strictly smaller id than the node itself. Node 0 is always the constant
//! [`AigNode::False`].
//!
//! To reduce a graph using known equivalences, check [`crate::equiv`] and [`crate::reduce`].

mod clone;
pub mod dfs;
pub mod dot;
pub mod edge;
pub mod error;
mod integrity;
mod metrics;
pub mod node;
mod sim;

use rustc_hash::FxHashMap;

pub use clone::NodeMap;
pub(crate) use clone::translate;
pub use edge::AigEdge;
pub use error::{AigError, Result};
pub use metrics::AigStats;
pub use node::{AigNode, NodeId};

/// A whole AIG.
///
/// The graph is built incrementally with [`add_input`], [`add_and`] and [`add_output`].
/// Two construction modes are available:
/// - append-only (the default): every call to [`add_and`] creates a new node, even if an
///   identical one exists;
/// - hashed (after [`start_hashing`]): AND gates are simplified (`x & x = x`, `x & !x = 0`,
///   `x & 0 = 0`, `x & 1 = x`) and structurally hashed so identical gates are created once.
///
/// Registers are modeled at the boundary: the last `register_count` inputs are register
/// outputs, and the last `register_count` outputs are register inputs (next state).
///
/// [`add_input`]: Aig::add_input
/// [`add_and`]: Aig::add_and
/// [`add_output`]: Aig::add_output
/// [`start_hashing`]: Aig::start_hashing
#[derive(Debug, Clone)]
pub struct Aig {
    nodes: Vec<AigNode>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    register_count: usize,
    strash: Option<FxHashMap<(AigEdge, AigEdge), NodeId>>,
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Aig {
    /// Create a brand new AIG (constant node [`AigNode::False`] included), in append-only mode.
    pub fn new() -> Self {
        Aig {
            nodes: vec![AigNode::False],
            inputs: Vec::new(),
            outputs: Vec::new(),
            register_count: 0,
            strash: None,
        }
    }

    /// Create a new AIG already in hashed mode.
    pub fn with_hashing() -> Self {
        let mut aig = Aig::new();
        aig.start_hashing();
        aig
    }

    /// Number of nodes, constant and output terminals included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// An AIG always contains the constant node, so it is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Retrieves a node from its id.
    pub fn get_node(&self, id: NodeId) -> Option<&AigNode> {
        self.nodes.get(id as usize)
    }

    /// Retrieves a node from its id, failing with [`AigError::NodeDoesNotExist`].
    pub fn node(&self, id: NodeId) -> Result<&AigNode> {
        self.get_node(id).ok_or(AigError::NodeDoesNotExist(id))
    }

    /// Iterates over all nodes in topological (id) order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AigNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(id, node)| (id as NodeId, node))
    }

    /// Ids of the AND gates, in topological order.
    pub fn and_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, node)| node.is_and())
            .map(|(id, _)| id)
    }

    /// Retrieves inputs id (primary inputs first, then register outputs).
    pub fn get_inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Retrieves output terminals id (primary outputs first, then register inputs).
    pub fn get_outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// The edge driving the `index`-th output.
    pub fn output_fanin(&self, index: usize) -> Option<AigEdge> {
        let id = *self.outputs.get(index)?;
        match self.nodes[id as usize] {
            AigNode::Output { fanin } => Some(fanin),
            _ => None,
        }
    }

    /// The edges driving every output, in order.
    pub fn get_output_fanins(&self) -> Vec<AigEdge> {
        self.outputs
            .iter()
            .filter_map(|&id| match self.nodes[id as usize] {
                AigNode::Output { fanin } => Some(fanin),
                _ => None,
            })
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn and_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_and()).count()
    }

    pub fn register_count(&self) -> usize {
        self.register_count
    }

    pub fn primary_input_count(&self) -> usize {
        self.inputs.len() - self.register_count
    }

    pub fn primary_output_count(&self) -> usize {
        self.outputs.len() - self.register_count
    }

    /// Register outputs, ie the last `register_count` inputs.
    pub fn register_outputs(&self) -> &[NodeId] {
        &self.inputs[self.primary_input_count()..]
    }

    /// Register inputs, ie the last `register_count` output terminals.
    pub fn register_inputs(&self) -> &[NodeId] {
        &self.outputs[self.primary_output_count()..]
    }

    /// Declares the last `count` inputs and outputs as registers.
    pub fn set_register_count(&mut self, count: usize) -> Result<()> {
        if count > self.inputs.len() || count > self.outputs.len() {
            return Err(AigError::InvalidRegisterCount {
                registers: count,
                inputs: self.inputs.len(),
                outputs: self.outputs.len(),
            });
        }
        self.register_count = count;
        Ok(())
    }

    /// Returns true if combinational.
    pub fn is_combinational(&self) -> bool {
        self.register_count == 0
    }

    pub fn is_hashing(&self) -> bool {
        self.strash.is_some()
    }

    /// Switches to hashed mode. Existing AND gates are registered in the hash table,
    /// the first occurrence of duplicated gates wins.
    pub fn start_hashing(&mut self) {
        if self.strash.is_some() {
            return;
        }
        let mut table = FxHashMap::default();
        for (id, node) in self.nodes.iter().enumerate() {
            if let AigNode::And { fanin0, fanin1 } = *node {
                table.entry((fanin0, fanin1)).or_insert(id as NodeId);
            }
        }
        self.strash = Some(table);
    }

    /// Switches back to append-only mode.
    pub fn stop_hashing(&mut self) {
        self.strash = None;
    }

    fn check_fanin(&self, edge: AigEdge) -> Result<()> {
        let id = edge.get_node_id();
        match self.get_node(id) {
            None => Err(AigError::NodeDoesNotExist(id)),
            Some(AigNode::Output { .. }) => Err(AigError::OutputAsFanin(id)),
            Some(_) => Ok(()),
        }
    }

    fn push_node(&mut self, node: AigNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Create a new input.
    pub fn add_input(&mut self) -> NodeId {
        let id = self.push_node(AigNode::Input);
        self.inputs.push(id);
        id
    }

    /// Create a new and gate (or retrieve an equivalent edge in hashed mode).
    ///
    /// ```rust
    /// use aigclass::{Aig, AigEdge};
    /// let mut aig = Aig::with_hashing();
    /// let a = AigEdge::new(aig.add_input(), false);
    /// let b = AigEdge::new(aig.add_input(), false);
    /// let ab = aig.add_and(a, b).unwrap();
    /// assert_eq!(aig.add_and(b, a).unwrap(), ab);
    /// assert_eq!(aig.add_and(a, !a).unwrap(), AigEdge::FALSE);
    /// assert_eq!(aig.add_and(a, AigEdge::TRUE).unwrap(), a);
    /// // Fanins must exist
    /// assert!(aig.add_and(a, AigEdge::new(42, false)).is_err());
    /// ```
    pub fn add_and(&mut self, a: AigEdge, b: AigEdge) -> Result<AigEdge> {
        self.check_fanin(a)?;
        self.check_fanin(b)?;
        let (a, b) = if a <= b { (a, b) } else { (b, a) };

        let Some(table) = &self.strash else {
            let id = self.push_node(AigNode::And {
                fanin0: a,
                fanin1: b,
            });
            return Ok(AigEdge::new(id, false));
        };

        // Constants are sorted first
        if a == b || a.is_cst_true() {
            return Ok(b);
        }
        if a.is_cst_false() || a.is_complement_of(&b) {
            return Ok(AigEdge::FALSE);
        }
        if let Some(&id) = table.get(&(a, b)) {
            return Ok(AigEdge::new(id, false));
        }

        let id = self.push_node(AigNode::And {
            fanin0: a,
            fanin1: b,
        });
        if let Some(table) = self.strash.as_mut() {
            table.insert((a, b), id);
        }
        Ok(AigEdge::new(id, false))
    }

    pub fn add_or(&mut self, a: AigEdge, b: AigEdge) -> Result<AigEdge> {
        Ok(!self.add_and(!a, !b)?)
    }

    pub fn add_xor(&mut self, a: AigEdge, b: AigEdge) -> Result<AigEdge> {
        let left = self.add_and(a, !b)?;
        let right = self.add_and(!a, b)?;
        self.add_or(left, right)
    }

    /// `if sel { then } else { otherwise }`
    pub fn add_mux(&mut self, sel: AigEdge, then: AigEdge, otherwise: AigEdge) -> Result<AigEdge> {
        let left = self.add_and(sel, then)?;
        let right = self.add_and(!sel, otherwise)?;
        self.add_or(left, right)
    }

    /// Create a new output terminal driven by `fanin`.
    pub fn add_output(&mut self, fanin: AigEdge) -> Result<NodeId> {
        self.check_fanin(fanin)?;
        let id = self.push_node(AigNode::Output { fanin });
        self.outputs.push(id);
        Ok(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn append_only_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let x = aig.add_and(a, b).unwrap();
        let y = aig.add_and(b, a).unwrap();
        assert_ne!(x, y);
        assert_eq!(aig.get_node(x.get_node_id()), aig.get_node(y.get_node_id()));
        // No simplification either
        let z = aig.add_and(a, a).unwrap();
        assert_eq!(z.get_node_id(), 5);
        assert_eq!(aig.and_count(), 3);
    }

    #[test]
    fn hashing_test() {
        let mut aig = Aig::with_hashing();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let x = aig.add_and(a, !b).unwrap();
        assert_eq!(aig.add_and(!b, a).unwrap(), x);
        assert_eq!(aig.add_and(a, a).unwrap(), a);
        assert_eq!(aig.add_and(!a, a).unwrap(), AigEdge::FALSE);
        assert_eq!(aig.add_and(AigEdge::FALSE, a).unwrap(), AigEdge::FALSE);
        assert_eq!(aig.add_and(b, AigEdge::TRUE).unwrap(), b);
        assert_eq!(aig.and_count(), 1);
    }

    #[test]
    fn start_hashing_registers_existing_gates_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        let b = AigEdge::new(aig.add_input(), false);
        let x = aig.add_and(a, b).unwrap();
        let _ = aig.add_and(a, b).unwrap();
        aig.start_hashing();
        assert_eq!(aig.add_and(b, a).unwrap(), x);
        aig.stop_hashing();
        assert_ne!(aig.add_and(b, a).unwrap(), x);
    }

    #[test]
    fn invalid_fanin_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        assert!(matches!(
            aig.add_and(a, AigEdge::new(7, false)),
            Err(AigError::NodeDoesNotExist(7))
        ));
        let o = aig.add_output(a).unwrap();
        assert!(matches!(
            aig.add_and(a, AigEdge::new(o, false)),
            Err(AigError::OutputAsFanin(_))
        ));
        assert!(aig.add_output(AigEdge::new(o, true)).is_err());
    }

    #[test]
    fn registers_test() {
        let mut aig = Aig::new();
        let i = AigEdge::new(aig.add_input(), false);
        let r = AigEdge::new(aig.add_input(), false);
        let x = aig.add_xor(i, r).unwrap();
        aig.add_output(x).unwrap();
        aig.add_output(x).unwrap();
        aig.set_register_count(1).unwrap();
        assert_eq!(aig.primary_input_count(), 1);
        assert_eq!(aig.register_outputs(), &[r.get_node_id()]);
        assert_eq!(aig.register_inputs().len(), 1);
        assert!(!aig.is_combinational());
        assert!(aig.set_register_count(3).is_err());
    }

    #[test]
    fn gate_helpers_test() {
        let mut aig = Aig::with_hashing();
        let s = AigEdge::new(aig.add_input(), false);
        let t = AigEdge::new(aig.add_input(), false);
        let e = AigEdge::new(aig.add_input(), false);
        let or = aig.add_or(t, e).unwrap();
        let xor = aig.add_xor(s, t).unwrap();
        let mux = aig.add_mux(s, t, e).unwrap();
        aig.add_output(or).unwrap();
        aig.add_output(xor).unwrap();
        aig.add_output(mux).unwrap();
        assert_eq!(aig.add_mux(AigEdge::TRUE, t, e).unwrap(), t);

        let tables = aig.truth_tables().unwrap();
        assert_eq!(tables, vec![vec![0xfc], vec![0x66], vec![0xd8]]);
    }

    #[test]
    fn output_fanin_test() {
        let mut aig = Aig::new();
        let a = AigEdge::new(aig.add_input(), false);
        aig.add_output(!a).unwrap();
        aig.add_output(AigEdge::TRUE).unwrap();
        assert_eq!(aig.output_fanin(0), Some(!a));
        assert_eq!(aig.get_output_fanins(), vec![!a, AigEdge::TRUE]);
        assert_eq!(aig.output_fanin(2), None);
    }
}
