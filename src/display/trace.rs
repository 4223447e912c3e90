use crate::graph::trace::ReversalCandidate;
use crate::store::{EntityId, NumberRole, Registry};
use std::fmt::Write;

/// Short label for one path entry, e.g. `#4 out(+)=1.000+0.000i` or `#7 wire`.
pub fn describe(registry: &Registry, id: EntityId) -> String {
    if let Some(node) = registry.number(id) {
        let role = match node.role {
            NumberRole::Naked => "num",
            NumberRole::Input => "in",
            NumberRole::Output => "out",
        };
        match registry.owner_of(id) {
            Some(op) => format!("{} {}({})={}", id, role, op.kind.symbol(), node.value),
            None => format!("{} {}={}", id, role, node.value),
        }
    } else if let Some(op) = registry.operator(id) {
        format!("{} [{}]", id, op.kind.symbol())
    } else if registry.wire(id).is_some() {
        format!("{} wire", id)
    } else {
        format!("{} ?", id)
    }
}

pub fn format_path(registry: &Registry, path: &[EntityId]) -> String {
    path.iter().map(|&id| describe(registry, id)).collect::<Vec<_>>().join(" <- ")
}

/// Multi-line listing of trace results, one candidate per line.
pub fn format_candidates(
    registry: &Registry,
    start: EntityId,
    candidates: &[ReversalCandidate],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "REVERSAL CANDIDATES from {}:", describe(registry, start));
    if candidates.is_empty() {
        let _ = writeln!(out, "  (no free nodes)");
    }
    for (i, candidate) in candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. free {}: {}",
            i + 1,
            candidate.free_node,
            format_path(registry, &candidate.path)
        );
    }
    out
}
