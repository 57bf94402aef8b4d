//! Lowering traversal contract.
//!
//! A backend implements [`Visitor`]; [`walk`] drives it over a finished
//! compilation exactly once. Builders are discovered breadth-first from the
//! entry points: each builder's operations are visited in program order and
//! every builder an operation references is queued, so each reachable
//! builder is visited once no matter how many operations reference it.

use std::collections::VecDeque;

use crate::{BuilderId, Compilation, CompilationError, Operation};

/// Callbacks for one pass over a compilation. Every method defaults to
/// doing nothing.
pub trait Visitor {
    fn pre_compilation(&mut self, _comp: &Compilation<'_>) -> Result<(), CompilationError> {
        Ok(())
    }

    fn builder_pre_ops(&mut self, _comp: &Compilation<'_>, _builder: BuilderId) -> Result<(), CompilationError> {
        Ok(())
    }

    fn operation(&mut self, _comp: &Compilation<'_>, _op: &Operation) -> Result<(), CompilationError> {
        Ok(())
    }

    fn builder_post_ops(&mut self, _comp: &Compilation<'_>, _builder: BuilderId) -> Result<(), CompilationError> {
        Ok(())
    }

    fn post_compilation(&mut self, _comp: &Compilation<'_>) -> Result<(), CompilationError> {
        Ok(())
    }
}

/// Visitor that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullVisitor;

impl Visitor for NullVisitor {}

/// Drive `visitor` over every builder reachable from `comp`'s entry points.
pub fn walk(comp: &Compilation<'_>, visitor: &mut dyn Visitor) -> Result<(), CompilationError> {
    let mut visited = vec![false; comp.num_builders()];
    let mut queue: VecDeque<BuilderId> = VecDeque::new();
    for &entry in comp.entry_points() {
        if !visited[entry.index()] {
            visited[entry.index()] = true;
            queue.push_back(entry);
        }
    }

    visitor.pre_compilation(comp)?;
    while let Some(b) = queue.pop_front() {
        visitor.builder_pre_ops(comp, b)?;
        for &op in comp.builder(b).operations() {
            visitor.operation(comp, comp.operation(op))?;
            for (target, _) in comp.referenced_builders(op) {
                if !visited[target.index()] {
                    visited[target.index()] = true;
                    queue.push_back(target);
                }
            }
        }
        visitor.builder_post_ops(comp, b)?;
    }
    visitor.post_compilation(comp)?;
    tracing::debug!(compilation = comp.name(), builders = visited.iter().filter(|&&v| v).count(), "walk finished");
    Ok(())
}

#[cfg(test)]
mod tests;
