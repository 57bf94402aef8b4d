//! Worklist-driven graph rewriting.
//!
//! # Algorithm
//!
//! 1. Visit builders depth-first from the entry points. Within a builder,
//!    operations are offered to the transformation in program order.
//! 2. Builders an operation binds or places (`Bound`/`Label` roles) are
//!    visited right after that operation, before the rest of its builder,
//!    so values flow in program order. `Goto` targets are visited after
//!    everything else.
//! 3. A replacement is a scratch builder. Once accepted, its operations are
//!    spliced in place of the original, which is detached; the spliced
//!    operations are not offered again, but builders they reference are
//!    queued.
//! 4. Each builder is visited at most once (a visited vector indexed by
//!    builder id, grown as transformations create builders).
//!
//! The configured transformation cutoff may reject a replacement: its
//! binding changes are rolled back, the scratch builder is dropped and the
//! original operation stays.

use crate::{
    BuilderId, BuilderRole, Compilation, CompilerConfig, OperationId, TransformError,
};

/// A rewrite the [`Transformer`] drives.
pub trait Transformation {
    fn name(&self) -> &str;

    /// Called once before any operation is offered.
    fn prepare(&mut self, _comp: &mut Compilation<'_>) -> Result<(), TransformError> {
        Ok(())
    }

    /// A scratch builder holding the replacement for `op`, or `None` to
    /// keep it.
    fn transform_operation(
        &mut self,
        comp: &mut Compilation<'_>,
        op: OperationId,
    ) -> Result<Option<BuilderId>, TransformError>;

    /// The replacement for `op` was rejected by the cutoff.
    fn rejected(&mut self, _comp: &mut Compilation<'_>, _op: OperationId) {}

    /// Called once after the last operation.
    fn finish(&mut self, _comp: &mut Compilation<'_>) -> Result<(), TransformError> {
        Ok(())
    }
}

/// Counters from one [`Transformer::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub visited_builders: usize,
    pub transformed: usize,
    pub skipped: usize,
}

/// Drives a [`Transformation`] over a compilation.
#[derive(Clone, Debug)]
pub struct Transformer {
    config: CompilerConfig,
}

struct Frame {
    builder: BuilderId,
    index: usize,
}

impl Transformer {
    pub fn new(config: &CompilerConfig) -> Self {
        Transformer {
            config: config.clone(),
        }
    }

    pub fn run(
        &self,
        comp: &mut Compilation<'_>,
        t: &mut dyn Transformation,
    ) -> Result<TransformStats, TransformError> {
        t.prepare(comp)?;
        let mut stats = TransformStats::default();
        let mut visited = vec![false; comp.num_builders()];
        let mut deferred: Vec<BuilderId> = comp.entry_points().iter().rev().copied().collect();
        let mut stack: Vec<Frame> = Vec::new();

        loop {
            let Some(frame) = stack.last_mut() else {
                let Some(next) = deferred.pop() else {
                    break;
                };
                if mark(&mut visited, next) {
                    stats.visited_builders += 1;
                    stack.push(Frame {
                        builder: next,
                        index: 0,
                    });
                }
                continue;
            };
            let (b, index) = (frame.builder, frame.index);
            let Some(&op) = comp.builder(b).operations().get(index) else {
                stack.pop();
                continue;
            };

            comp.begin_replacement(op);
            let answer = t.transform_operation(comp, op);
            let journal = comp.end_replacement();
            let replacement = match answer {
                Ok(r) => r,
                Err(err) => {
                    comp.rollback(&journal);
                    return Err(err);
                }
            };

            let (advance, scanned_from) = match replacement {
                None => (1, index),
                Some(scratch) => {
                    let seq = comp.next_transformation_index();
                    if self.config.accepts_transformation(seq) {
                        let before = comp.describe_operation(op);
                        let n = comp.splice(b, index, scratch);
                        tracing::debug!(
                            transformation = t.name(),
                            index = seq,
                            builder = b.raw(),
                            ops = n,
                            op = %before,
                            "replaced operation"
                        );
                        stats.transformed += 1;
                        (n, index)
                    } else {
                        tracing::info!(
                            transformation = t.name(),
                            index = seq,
                            op = %comp.describe_operation(op),
                            "skipped transformation past cutoff"
                        );
                        comp.rollback(&journal);
                        comp.discard(scratch);
                        t.rejected(comp, op);
                        stats.skipped += 1;
                        (1, index)
                    }
                }
            };

            if let Some(frame) = stack.last_mut() {
                frame.index = index + advance;
            }
            let ops: Vec<OperationId> =
                comp.builder(b).operations()[scanned_from..index + advance].to_vec();
            let mut nested = Vec::new();
            for op in ops {
                for (target, role) in comp.referenced_builders(op) {
                    match role {
                        BuilderRole::Jump => deferred.push(target),
                        BuilderRole::Bound | BuilderRole::Label => nested.push(target),
                    }
                }
            }
            for target in nested.into_iter().rev() {
                if mark(&mut visited, target) {
                    stats.visited_builders += 1;
                    stack.push(Frame {
                        builder: target,
                        index: 0,
                    });
                }
            }
        }

        t.finish(comp)?;
        tracing::debug!(
            transformation = t.name(),
            visited = stats.visited_builders,
            transformed = stats.transformed,
            skipped = stats.skipped,
            "transformer finished"
        );
        Ok(stats)
    }
}

/// Mark `b` visited; `false` if it already was.
fn mark(visited: &mut Vec<bool>, b: BuilderId) -> bool {
    if visited.len() <= b.index() {
        visited.resize(b.index() + 1, false);
    }
    !std::mem::replace(&mut visited[b.index()], true)
}

#[cfg(test)]
mod tests;
