/// These errors are for internal CFA failures, not designed to be useful to a program author, but
/// more for users of the `jcfa-ir` crate, i.e., developers of the lowering.
#[derive(Debug)]
pub enum IrError {
    DuplicateFunction(String),
    FunctionNotFound(String),
    EdgeNotFound(String),
    NodeNotFound(String),
    RemoveEntryOrExit(String, String),

    VerifyEdgeEndpointMismatch(String, String),
    VerifyEdgeLeavesFunction(String, String, String),
    VerifyEntryHasEnteringEdges(String),
    VerifyExitHasLeavingEdges(String),
    VerifyTerminalNodeHasLeavingEdges(String, String),
    VerifyTooManyLeavingEdges(String, String, usize),
    VerifyBranchNotPaired(String, String),
    VerifyBranchTruthMismatch(String, String),
    VerifyBranchConditionMismatch(String, String),
    VerifyReturnNotToExit(String, String),
    VerifyNodeNotInFunction(String, String),
}

impl IrError {
    pub(crate) fn node_name(id: u64) -> String {
        format!("N{id}")
    }
}

impl std::error::Error for IrError {}

use std::fmt;

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            IrError::DuplicateFunction(name) => {
                write!(f, "Function '{name}' already exists in the context.")
            }
            IrError::FunctionNotFound(name) => write!(f, "Function '{name}' not found."),
            IrError::EdgeNotFound(desc) => write!(f, "Edge '{desc}' not found."),
            IrError::NodeNotFound(node) => write!(f, "Node '{node}' not found."),
            IrError::RemoveEntryOrExit(fn_name, node) => write!(
                f,
                "Attempted to remove entry or exit node '{node}' of function '{fn_name}'."
            ),

            // Verification failures:
            IrError::VerifyEdgeEndpointMismatch(fn_name, node) => write!(
                f,
                "Verification failed: In function '{fn_name}', node {node} lists an edge \
                which does not connect to it."
            ),
            IrError::VerifyEdgeLeavesFunction(fn_name, node, target_fn) => write!(
                f,
                "Verification failed: In function '{fn_name}', node {node} has an edge into \
                function '{target_fn}'."
            ),
            IrError::VerifyEntryHasEnteringEdges(fn_name) => write!(
                f,
                "Verification failed: Entry node of function '{fn_name}' has entering edges."
            ),
            IrError::VerifyExitHasLeavingEdges(fn_name) => write!(
                f,
                "Verification failed: Exit node of function '{fn_name}' has leaving edges."
            ),
            IrError::VerifyTerminalNodeHasLeavingEdges(fn_name, node) => write!(
                f,
                "Verification failed: In function '{fn_name}', terminal node {node} has \
                leaving edges."
            ),
            IrError::VerifyTooManyLeavingEdges(fn_name, node, count) => write!(
                f,
                "Verification failed: In function '{fn_name}', non-branching node {node} has \
                {count} leaving edges."
            ),
            IrError::VerifyBranchNotPaired(fn_name, node) => write!(
                f,
                "Verification failed: In function '{fn_name}', branch node {node} must have \
                exactly two assume edges."
            ),
            IrError::VerifyBranchTruthMismatch(fn_name, node) => write!(
                f,
                "Verification failed: In function '{fn_name}', the assume edges of branch node \
                {node} must have complementary truth values."
            ),
            IrError::VerifyBranchConditionMismatch(fn_name, node) => write!(
                f,
                "Verification failed: In function '{fn_name}', the assume edges of branch node \
                {node} test different conditions."
            ),
            IrError::VerifyReturnNotToExit(fn_name, node) => write!(
                f,
                "Verification failed: In function '{fn_name}', the return edge leaving {node} \
                does not enter the exit node."
            ),
            IrError::VerifyNodeNotInFunction(fn_name, node) => write!(
                f,
                "Verification failed: Node {node} is reachable in function '{fn_name}' but not \
                part of it."
            ),
        }
    }
}
