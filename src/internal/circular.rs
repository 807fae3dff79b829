//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::{Contract, ExportKey};
use crate::strategy::StrategyId;

// Path of the activation whose activator is running on this thread, so
// producers invoked from inside it continue that path.
thread_local! {
    static ACTIVATING: RefCell<Option<ResolutionPath>> = RefCell::new(None);
}

#[derive(Debug, Clone)]
struct Frame {
    contract: Contract,
    key: Option<ExportKey>,
    strategy: Option<StrategyId>,
}

/// Contracts currently being resolved or planned, outermost first.
///
/// Lives inside an `InjectionContext` (runtime activation) or a plan walk
/// (static dependency graph); never shared between threads. Each frame may
/// also carry the strategy chosen for it, so a strategy reached again
/// through a different contract is reported as a cycle too.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolutionPath {
    stack: Vec<Frame>,
}

impl ResolutionPath {
    /// Path to continue from: the activation running on this thread, if
    /// any, otherwise empty.
    pub(crate) fn inherited() -> Self {
        ACTIVATING
            .try_with(|activating| activating.borrow().clone())
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Publish this path as the running activation until the guard drops.
    pub(crate) fn activating(&self) -> ActivatingGuard {
        let previous = ACTIVATING
            .try_with(|activating| activating.replace(Some(self.clone())))
            .ok()
            .flatten();
        ActivatingGuard { previous }
    }

    /// Push `contract` under `key`, failing if the same pair is already on
    /// the path or the path is `max_depth` deep.
    pub(crate) fn enter(
        &mut self,
        contract: &Contract,
        key: Option<&ExportKey>,
        max_depth: usize,
    ) -> DiResult<()> {
        // Cycle check precedes the depth guard
        if let Some(start) = self
            .stack
            .iter()
            .position(|f| &f.contract == contract && f.key.as_ref() == key)
        {
            let mut cycle = self.contracts_from(start);
            cycle.push(contract.clone());
            return Err(DiError::CircularDependency(cycle));
        }

        if self.stack.len() >= max_depth {
            return Err(DiError::DepthExceeded(self.stack.len()));
        }

        self.stack.push(Frame {
            contract: contract.clone(),
            key: key.cloned(),
            strategy: None,
        });
        Ok(())
    }

    /// Record the strategy selected for the innermost contract.
    pub(crate) fn bind(&mut self, strategy: StrategyId) -> DiResult<()> {
        let Some(last) = self.stack.len().checked_sub(1) else {
            return Ok(());
        };

        if let Some(start) = self.stack[..last]
            .iter()
            .position(|f| f.strategy == Some(strategy))
        {
            return Err(DiError::CircularDependency(self.contracts_from(start)));
        }

        self.stack[last].strategy = Some(strategy);
        Ok(())
    }

    pub(crate) fn unbind(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.strategy = None;
        }
    }

    pub(crate) fn leave(&mut self, contract: &Contract) {
        let last = self.stack.pop();
        debug_assert_eq!(last.map(|f| f.contract).as_ref(), Some(contract));
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    fn contracts_from(&self, start: usize) -> Vec<Contract> {
        self.stack[start..].iter().map(|f| f.contract.clone()).collect()
    }
}

/// Restores the previously running activation's path on drop.
pub(crate) struct ActivatingGuard {
    previous: Option<ResolutionPath>,
}

impl Drop for ActivatingGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = ACTIVATING.try_with(|activating| *activating.borrow_mut() = previous);
    }
}
