use thiserror::Error;

use crate::{equiv::EquivError, miter::MiterError};

use super::NodeId;

/// The result of an AIG operation.
pub type Result<T> = std::result::Result<T, AigError>;

/// Error returned when an AIG operation failed.
#[derive(Debug, Error)]
pub enum AigError {
    /// The node with given id does not exist (yet).
    #[error("node with id={0} does not exist")]
    NodeDoesNotExist(NodeId),

    /// Output terminals cannot drive other nodes.
    #[error("node {0} is an output terminal and cannot be used as a fanin")]
    OutputAsFanin(NodeId),

    /// The node was expected to be of another kind.
    #[error("node {id} is not {expected}")]
    UnexpectedNode { id: NodeId, expected: &'static str },

    /// Wrong number of values supplied for the inputs of the AIG.
    #[error("expected {expected} input values, got {actual}")]
    InputCountMismatch { expected: usize, actual: usize },

    /// Exhaustive simulation is limited to small input counts.
    #[error("exhaustive simulation supports up to {max} inputs, got {actual}")]
    TooManyInputs { max: usize, actual: usize },

    /// There are more registers than inputs or outputs.
    #[error("{registers} registers declared but the AIG has {inputs} inputs and {outputs} outputs")]
    InvalidRegisterCount {
        registers: usize,
        inputs: usize,
        outputs: usize,
    },

    /// The AIG has reached an invalid state. This should never happen.
    #[error("the AIG has reached an invalid state - this should not happen - error: {0}")]
    InvalidState(String),

    /// Just forwarding an [`EquivError`].
    #[error("{0}")]
    EquivError(#[from] EquivError),

    /// Just forwarding a [`MiterError`].
    #[error("{0}")]
    MiterError(#[from] MiterError),
}
