//! You can also export AIGs and choice graphs to the Graphviz dot format using their `to_dot`
//! methods: [`Aig::to_dot`], [`ChoiceAig::to_dot`].
//!
//! ```rust
//! use aigclass::{Aig, AigEdge};
//! use aigclass::dot::GraphvizStyle;
//!
//! let mut aig = Aig::new();
//! let a = AigEdge::new(aig.add_input(), false);
//! let b = AigEdge::new(aig.add_input(), false);
//! let x = aig.add_xor(a, b).unwrap();
//! aig.add_output(x).unwrap();
//! println!("{}", aig.to_dot(GraphvizStyle::default()));
//! ```
//!
//! You can then render the graphs using the DOT engine.
//!
//! [`ChoiceAig::to_dot`]: crate::choice::ChoiceAig::to_dot

use std::{fmt::Display, ops::Add};

use crate::{Aig, AigEdge, AigNode, NodeId, dfs::Dfs};

// Definining default global style.
const DEFAULT_RANKDIR: &str = "BT";

// Defining default style for nodes.
const DEFAULT_FALSE_NODE_FORMAT: &str = "[shape=point, label=\"GND\", width=1.5]";
const DEFAULT_INPUT_NODE_FORMAT: &str = "[shape=box]";
const DEFAULT_REGISTER_NODE_FORMAT: &str = "[shape=diamond]";
const DEFAULT_AND_NODE_FORMAT: &str = "[shape=circle]";
/// See https://stackoverflow.com/questions/50822798/how-to-use-graphviz-to-draw-a-node-pointed-by-an-arrow.
const DEFAULT_OUTPUT_NODE_FORMAT: &str = "[shape=none, height=.0, width=.0]";

// Defining default style for edges.
const DEFAULT_EDGE_ALL_FORMAT: &str = "[arrowsize=0.3]";
const DEFAULT_EDGE_COMPLEMENT_FORMAT: &str = "[headlabel=\"●\", labelangle=.0, labeldistance=1.5]";
const DEFAULT_EDGE_OUTPUT_FORMAT: &str = "[arrowhead=none]";
const DEFAULT_EDGE_SIBLING_FORMAT: &str = "[style=\"dashed\", constraint=false, color=\"gray\"]";

/// String containing the graphviz node style (you must manually include square brackets).
///
/// See [`GraphvizStyle`] for what kind of nodes can be described.
#[derive(Debug, Clone)]
pub struct GraphvizNodeStyle(String);

impl Display for GraphvizNodeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// String containing the graphviz edge style (you must manually include square brackets).
///
/// See [`GraphvizStyle`] for what kind of edges can be described.
#[derive(Debug, Clone, Default)]
pub struct GraphvizEdgeStyle(String);

impl Display for GraphvizEdgeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for GraphvizEdgeStyle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        GraphvizEdgeStyle(format!("{}{}", self.0, rhs.0))
    }
}

/// Parameters for Graphviz rendering.
///
/// ### Nodes
/// The following nodes can be rendered using [`GraphvizNodeStyle`]:
/// - [`AigNode::False`]
/// - [`AigNode::Input`] (primary inputs and register outputs are styled differently)
/// - [`AigNode::And`]
/// - [`AigNode::Output`] (by default, invisible node just to get an arrow).
///
/// ### Edges
/// Edge styles are additive. All edges implement the `edge_all` style. To that can be added:
/// - `edge_complement` if the edge is complemented
/// - `edge_output` if the edge is directed to an output.
///
/// Sibling links of a choice graph use the `edge_sibling` style.
#[derive(Debug, Clone)]
pub struct GraphvizStyle {
    // Global
    pub rankdir: String,

    // Nodes
    pub cst_false: GraphvizNodeStyle,
    pub input: GraphvizNodeStyle,
    pub register: GraphvizNodeStyle,
    pub and: GraphvizNodeStyle,
    pub output: GraphvizNodeStyle,

    // Edges
    pub edge_all: GraphvizEdgeStyle,
    pub edge_complement: GraphvizEdgeStyle,
    pub edge_output: GraphvizEdgeStyle,
    pub edge_sibling: GraphvizEdgeStyle,
}

impl Default for GraphvizStyle {
    fn default() -> Self {
        GraphvizStyle {
            rankdir: DEFAULT_RANKDIR.to_string(),

            cst_false: GraphvizNodeStyle(DEFAULT_FALSE_NODE_FORMAT.to_string()),
            input: GraphvizNodeStyle(DEFAULT_INPUT_NODE_FORMAT.to_string()),
            register: GraphvizNodeStyle(DEFAULT_REGISTER_NODE_FORMAT.to_string()),
            and: GraphvizNodeStyle(DEFAULT_AND_NODE_FORMAT.to_string()),
            output: GraphvizNodeStyle(DEFAULT_OUTPUT_NODE_FORMAT.to_string()),

            edge_all: GraphvizEdgeStyle(DEFAULT_EDGE_ALL_FORMAT.to_string()),
            edge_complement: GraphvizEdgeStyle(DEFAULT_EDGE_COMPLEMENT_FORMAT.to_string()),
            edge_output: GraphvizEdgeStyle(DEFAULT_EDGE_OUTPUT_FORMAT.to_string()),
            edge_sibling: GraphvizEdgeStyle(DEFAULT_EDGE_SIBLING_FORMAT.to_string()),
        }
    }
}

fn edge_decl(edge: AigEdge, to: NodeId, to_output: bool, style: &GraphvizStyle) -> String {
    let mut edge_style = GraphvizEdgeStyle::default();
    if edge.get_complement() {
        edge_style = edge_style + style.edge_complement.clone();
    }
    if to_output {
        edge_style = edge_style + style.edge_output.clone();
    }
    format!("{} -> {} {}\n", edge.get_node_id(), to, edge_style)
}

impl Aig {
    /// Returns a DOT representation of the AIG.
    pub fn to_dot(&self, graphviz_style: GraphvizStyle) -> String {
        self.to_dot_with_siblings(&graphviz_style, &[])
    }

    /// Returns a DOT representation of the AIG, with an extra dashed edge for every
    /// `(node, sibling)` pair. Nodes only reachable through a sibling edge are drawn too.
    pub(crate) fn to_dot_with_siblings(
        &self,
        graphviz_style: &GraphvizStyle,
        siblings: &[(NodeId, NodeId)],
    ) -> String {
        let mut decl_edges = String::new();

        // Creating different subgraphs for node declarations
        let mut decl_false_node_optional = "".to_string();
        let mut decl_inputs = format!("subgraph inputs {{\n node {}\n", graphviz_style.input);
        let mut decl_registers = format!(
            "subgraph registers {{\n node {}\n",
            graphviz_style.register
        );
        let mut decl_outputs = format!("subgraph outputs {{\n node {}\n", graphviz_style.output);
        let mut decl_ands = format!("subgraph ands {{\n node {}\n", graphviz_style.and);

        let first_register = self.primary_input_count();
        let mut input_index = vec![None; self.len()];
        for (k, &id) in self.inputs.iter().enumerate() {
            input_index[id as usize] = Some(k);
        }

        // DFS from outputs, then from every sibling
        let mut seen = vec![false; self.len()];
        let mut dfs = Dfs::from_outputs(self);
        let mut pending: Vec<NodeId> = siblings.iter().flat_map(|&(a, b)| [b, a]).collect();
        loop {
            let Some(id) = dfs.next(self) else {
                match pending.pop() {
                    Some(start) if !seen[start as usize] => {
                        dfs = Dfs::from_node(start);
                        continue;
                    }
                    Some(_) => continue,
                    None => break,
                }
            };
            if std::mem::replace(&mut seen[id as usize], true) {
                continue;
            }
            let node = self.nodes[id as usize];
            match node {
                AigNode::False => decl_false_node_optional
                    .push_str(&format!("0 {}\n", graphviz_style.cst_false)),
                AigNode::Input => match input_index[id as usize] {
                    Some(k) if k >= first_register => decl_registers
                        .push_str(&format!("{} [label=\"r{}\"]\n", id, k - first_register)),
                    Some(k) => decl_inputs.push_str(&format!("{} [label=\"i{}\"]\n", id, k)),
                    None => (),
                },
                AigNode::And { .. } => decl_ands.push_str(&format!("{} [label=\"{}\"]\n", id, id)),
                AigNode::Output { .. } => {
                    let k = self.outputs.iter().position(|&o| o == id).unwrap_or(0);
                    decl_outputs.push_str(&format!("{} [label=\"o{}\"]\n", id, k));
                }
            }
            for fanin in node.get_fanins() {
                decl_edges.push_str(&edge_decl(fanin, id, node.is_output(), graphviz_style));
            }
        }

        for &(node, sibling) in siblings {
            decl_edges.push_str(&format!(
                "{} -> {} {}\n",
                sibling, node, graphviz_style.edge_sibling
            ));
        }

        // Concatenating everything together
        format!(
            "
strict digraph {{
    rankdir=\"{}\"
    edge {}
    {}
    {}
    }}
    {}
    }}
    {}
    }}
    {}
    }}
    {}
}}",
            graphviz_style.rankdir,
            graphviz_style.edge_all,
            decl_false_node_optional,
            decl_inputs,
            decl_registers,
            decl_ands,
            decl_outputs,
            decl_edges
        )
    }
}
