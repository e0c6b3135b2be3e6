pub mod aig;
pub mod choice;
pub mod equiv;
pub mod miter;
pub mod reduce;
pub mod verdict;

// Re-exporting symbols and modules.
pub use aig::dfs;
pub use aig::dot;
pub use aig::{Aig, AigEdge, AigError, AigNode, AigStats, NodeId, NodeMap, Result};
