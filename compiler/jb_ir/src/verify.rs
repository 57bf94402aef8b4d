//! Structural verification of a finished graph.
//!
//! # Checks
//!
//! Over every builder reachable from the entry points:
//!
//! - a `Must` builder is the `Bound` target of exactly one reachable
//!   operation, any other builder of none;
//! - each operation listed in a builder names that builder as its parent;
//! - every operand's producer is still attached to a builder;
//! - the operation's result types are what the typing rules derive.
//!
//! And over the whole value arena: every value appears in exactly one
//! operation's results.

use std::collections::VecDeque;

use crate::{BuilderRole, Boundness, Compilation, OpInput, VerifyError};

/// Check the graph invariants the lowering stage relies on.
pub fn verify(comp: &Compilation<'_>) -> Result<(), VerifyError> {
    let mut visited = vec![false; comp.num_builders()];
    let mut bound_refs = vec![0usize; comp.num_builders()];
    let mut queue = VecDeque::new();
    for &entry in comp.entry_points() {
        if !visited[entry.index()] {
            visited[entry.index()] = true;
            queue.push_back(entry);
        }
    }

    let mut checked_ops = 0usize;
    while let Some(b) = queue.pop_front() {
        for &id in comp.builder(b).operations() {
            let op = comp.operation(id);
            if op.parent() != Some(b) {
                return Err(VerifyError::Orphan { op: id, builder: b });
            }
            for &v in op.operands() {
                let producer = comp.value(v).producer();
                if comp.operation(producer).parent().is_none() {
                    return Err(VerifyError::DetachedProducer {
                        op: id,
                        value: v,
                        producer,
                    });
                }
            }
            check_typing(comp, id)?;
            for (target, role) in comp.referenced_builders(id) {
                if role == BuilderRole::Bound {
                    bound_refs[target.index()] += 1;
                }
                if !visited[target.index()] {
                    visited[target.index()] = true;
                    queue.push_back(target);
                }
            }
            checked_ops += 1;
        }
    }

    for (builder, &reachable) in comp.builders().zip(&visited) {
        if !reachable {
            continue;
        }
        let references = bound_refs[builder.id().index()];
        let expected = usize::from(builder.boundness() == Boundness::Must);
        if references != expected {
            return Err(VerifyError::Boundness {
                builder: builder.id(),
                boundness: builder.boundness(),
                references,
            });
        }
    }

    let mut producers = vec![0usize; comp.num_values()];
    for op in comp.operations() {
        for &r in op.results() {
            producers[r.index()] += 1;
        }
    }
    if let Some((value, &count)) = comp.values().zip(&producers).find(|(_, &n)| n != 1) {
        return Err(VerifyError::Producers {
            value: value.id(),
            producers: count,
        });
    }

    tracing::debug!(compilation = comp.name(), ops = checked_ops, "verified");
    Ok(())
}

fn check_typing(comp: &Compilation<'_>, id: crate::OperationId) -> Result<(), VerifyError> {
    let op = comp.operation(id);
    let derived = comp
        .derive_result_types(op.action(), &OpInput::from_slots(op.slots()))
        .map_err(|err| VerifyError::Typing {
            op: id,
            reason: err.to_string(),
        })?;
    let actual: Vec<_> = op.results().iter().map(|&r| comp.value_type(r)).collect();
    if derived.as_slice() != actual.as_slice() {
        return Err(VerifyError::Typing {
            op: id,
            reason: format!(
                "results typed ({}) but rules derive ({})",
                actual.iter().map(|&t| comp.type_name(t)).collect::<Vec<_>>().join(", "),
                derived.iter().map(|&t| comp.type_name(t)).collect::<Vec<_>>().join(", "),
            ),
        });
    }
    Ok(())
}
