//! Code to validate the CFA in a [`Context`].
//!
//! After construction and after every rewriting pass the graph should be verified to be in a
//! consistent, well-formed state using the functions in this module.

use crate::{
    context::Context,
    edge::{Edge, EdgeKind},
    error::IrError,
    function::Function,
    node::{Node, NodeKind},
};

impl Context {
    /// Verify the contents of this [`Context`] are valid.
    pub fn verify(&self) -> Result<(), IrError> {
        for function in self.functions() {
            self.verify_function(&function)?;
        }
        Ok(())
    }

    pub fn verify_function(&self, function: &Function) -> Result<(), IrError> {
        let fn_name = function.get_name(self);
        let entry = function.get_entry(self);
        let exit = function.get_exit(self);

        if entry.num_entering_edges(self) != 0 {
            return Err(IrError::VerifyEntryHasEnteringEdges(fn_name.to_string()));
        }
        if exit.num_leaving_edges(self) != 0 {
            return Err(IrError::VerifyExitHasLeavingEdges(fn_name.to_string()));
        }

        for node in function.nodes(self) {
            self.verify_node(function, node)?;
        }

        for node in function.reachable_nodes(self) {
            if !function.contains_node(self, &node) {
                return Err(IrError::VerifyNodeNotInFunction(
                    fn_name.to_string(),
                    node.name(self),
                ));
            }
        }
        Ok(())
    }

    fn verify_node(&self, function: &Function, node: Node) -> Result<(), IrError> {
        let fn_name = function.get_name(self);
        let leaving = node.leaving_edges(self);

        for edge in leaving {
            if !edge.exists(self) || edge.get_predecessor(self) != node {
                return Err(IrError::VerifyEdgeEndpointMismatch(
                    fn_name.to_string(),
                    node.name(self),
                ));
            }
            let succ = edge.get_successor(self);
            if !succ.exists(self) {
                return Err(IrError::VerifyEdgeEndpointMismatch(
                    fn_name.to_string(),
                    node.name(self),
                ));
            }
            let succ_fn = succ.get_function_name(self);
            if succ_fn != fn_name {
                return Err(IrError::VerifyEdgeLeavesFunction(
                    fn_name.to_string(),
                    node.name(self),
                    succ_fn.to_string(),
                ));
            }
            if matches!(edge.get_kind(self), EdgeKind::Return { .. })
                && succ != function.get_exit(self)
            {
                return Err(IrError::VerifyReturnNotToExit(
                    fn_name.to_string(),
                    node.name(self),
                ));
            }
        }
        for edge in node.entering_edges(self) {
            if !edge.exists(self) || edge.get_successor(self) != node {
                return Err(IrError::VerifyEdgeEndpointMismatch(
                    fn_name.to_string(),
                    node.name(self),
                ));
            }
        }

        if *node.get_kind(self) == NodeKind::AssertionFailure && !leaving.is_empty() {
            return Err(IrError::VerifyTerminalNodeHasLeavingEdges(
                fn_name.to_string(),
                node.name(self),
            ));
        }

        if node.is_branch(self) {
            self.verify_branch(fn_name, node, leaving)
        } else if leaving.len() > 1 {
            Err(IrError::VerifyTooManyLeavingEdges(
                fn_name.to_string(),
                node.name(self),
                leaving.len(),
            ))
        } else {
            Ok(())
        }
    }

    fn verify_branch(&self, fn_name: &str, node: Node, leaving: &[Edge]) -> Result<(), IrError> {
        let [first, second] = leaving else {
            return Err(IrError::VerifyBranchNotPaired(
                fn_name.to_string(),
                node.name(self),
            ));
        };
        match (first.get_kind(self), second.get_kind(self)) {
            (
                EdgeKind::Assume {
                    expression: first_expr,
                    truth: first_truth,
                },
                EdgeKind::Assume {
                    expression: second_expr,
                    truth: second_truth,
                },
            ) => {
                if first_truth == second_truth {
                    Err(IrError::VerifyBranchTruthMismatch(
                        fn_name.to_string(),
                        node.name(self),
                    ))
                } else if first_expr != second_expr {
                    Err(IrError::VerifyBranchConditionMismatch(
                        fn_name.to_string(),
                        node.name(self),
                    ))
                } else {
                    Ok(())
                }
            }
            _ => Err(IrError::VerifyBranchNotPaired(
                fn_name.to_string(),
                node.name(self),
            )),
        }
    }
}
