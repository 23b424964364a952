use crate::{error::CompileError, warning::CompileWarning};

use core::cell::RefCell;

/// A handler with which you can emit diagnostics.
#[derive(Default, Debug)]
pub struct Handler {
    /// The inner handler.
    /// This construction is used to avoid `&mut` all over the compiler.
    inner: RefCell<HandlerInner>,
}

/// Contains the actual data for `Handler`.
/// Modelled this way to afford an API using interior mutability.
#[derive(Default, Debug)]
struct HandlerInner {
    /// The sink through which errors will be emitted.
    errors: Vec<CompileError>,
    /// The sink through which warnings will be emitted.
    warnings: Vec<CompileWarning>,
}

impl Handler {
    /// Emit the error `err`.
    pub fn emit_err(&self, err: CompileError) -> ErrorEmitted {
        self.inner.borrow_mut().errors.push(err);
        ErrorEmitted { _priv: () }
    }

    /// Emit the warning `warn`.
    pub fn emit_warn(&self, warn: CompileWarning) {
        self.inner.borrow_mut().warnings.push(warn);
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.borrow().errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.inner.borrow().warnings.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.inner.borrow().warnings.len()
    }

    /// Runs `f` with a fresh handler and folds its diagnostics into `self`.
    ///
    /// If `f` succeeded but emitted errors, the result is turned into an error.
    pub fn scope<T>(
        &self,
        f: impl FnOnce(&Handler) -> Result<T, ErrorEmitted>,
    ) -> Result<T, ErrorEmitted> {
        let scoped_handler = Handler::default();
        let closure_res = f(&scoped_handler);
        let had_errors = scoped_handler.has_errors();
        self.append(scoped_handler);
        match closure_res {
            Ok(_) if had_errors => Err(ErrorEmitted { _priv: () }),
            res => res,
        }
    }

    /// Extract all the errors from this handler.
    pub fn consume(self) -> (Vec<CompileError>, Vec<CompileWarning>) {
        let inner = self.inner.into_inner();
        (inner.errors, inner.warnings)
    }

    pub fn append(&self, other: Handler) {
        let (errors, warnings) = other.consume();
        let mut inner = self.inner.borrow_mut();
        inner.errors.extend(errors);
        inner.warnings.extend(warnings);
    }
}

/// Proof that an error was emitted through a `Handler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorEmitted {
    _priv: (),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::Warning;
    use jcfa_types::Span;

    #[test]
    fn scope_turns_emitted_errors_into_failure() {
        let handler = Handler::default();
        let res = handler.scope(|handler| {
            handler.emit_warn(CompileWarning {
                span: Span::dummy(),
                warning_content: Warning::ExternalTypeQueued {
                    name: "a.B".to_string(),
                },
            });
            handler.emit_err(CompileError::BreakOutsideLoop {
                span: Span::dummy(),
            });
            Ok(())
        });
        assert!(res.is_err());
        assert!(handler.has_errors());
        let (errors, warnings) = handler.consume();
        assert_eq!(errors.len(), 1);
        assert_eq!(warnings.len(), 1);
    }
}
