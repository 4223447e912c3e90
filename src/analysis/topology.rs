//! Value-flow topology of a registry.
//!
//! Nodes are numbers. Edges follow the direction values move in: along each
//! finalized wire's effective direction, and inside each operator from both
//! independent slots to the dependent one.
use crate::store::{EntityId, Registry};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use std::collections::BTreeSet;

pub type FlowGraph = DiGraphMap<EntityId, ()>;

pub fn flow_graph(registry: &Registry) -> FlowGraph {
    let mut graph = FlowGraph::new();
    for &id in registry.numbers.keys() {
        graph.add_node(id);
    }
    for wire in registry.wires.values() {
        if let Some((src, dst)) = wire.effective_ends() {
            graph.add_edge(src, dst, ());
        }
    }
    for op in registry.operators.values() {
        let dependent = op.dependent();
        for slot in op.independents() {
            graph.add_edge(slot, dependent, ());
        }
    }
    graph
}

/// Groups of numbers whose values feed back into themselves, each sorted by id.
/// A tick evaluates such a loop once around, so it settles over several ticks.
pub fn feedback_loops(registry: &Registry) -> Vec<Vec<EntityId>> {
    let graph = flow_graph(registry);
    let mut loops: Vec<Vec<EntityId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort();
            scc
        })
        .collect();
    loops.sort();
    loops
}

/// Every number whose value depends on `start`, `start` included.
pub fn downstream_from(registry: &Registry, start: EntityId) -> BTreeSet<EntityId> {
    let graph = flow_graph(registry);
    let mut reached = BTreeSet::new();
    if !graph.contains_node(start) {
        return reached;
    }
    let mut dfs = Dfs::new(&graph, start);
    while let Some(id) = dfs.next(&graph) {
        reached.insert(id);
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NumberRole, OperatorKind, OperatorMode, Position, Value};

    fn connect(reg: &mut Registry, from: EntityId, to: EntityId) -> EntityId {
        let w = reg.add_pending_wire(from);
        reg.attach_wire(w, to);
        w
    }

    #[test]
    fn test_open_chain_has_no_loops() {
        let mut reg = Registry::new();
        let src = reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None);
        let [_, in1, in2, out] = reg.add_operator(OperatorKind::Adder, Position::default());
        connect(&mut reg, src, in1);

        assert!(feedback_loops(&reg).is_empty());
        assert_eq!(downstream_from(&reg, src), BTreeSet::from([src, in1, out]));
        assert_eq!(downstream_from(&reg, in2), BTreeSet::from([in2, out]));
        assert!(downstream_from(&reg, EntityId(99)).is_empty());
    }

    #[test]
    fn test_feedback_wire_forms_loop() {
        let mut reg = Registry::new();
        let [_, in1, _, out] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        let relay = reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None);
        connect(&mut reg, out, relay);
        connect(&mut reg, relay, in1);

        assert_eq!(feedback_loops(&reg), vec![vec![in1, out, relay]]);
    }

    #[test]
    fn test_edges_follow_operator_mode() {
        let mut reg = Registry::new();
        let [op, in1, in2, out] = reg.add_operator(OperatorKind::Adder, Position::default());
        reg.operator_mut(op).unwrap().set_mode(OperatorMode::SolveInput2);

        let graph = flow_graph(&reg);
        assert!(graph.contains_edge(out, in2));
        assert!(graph.contains_edge(in1, in2));
        assert!(!graph.contains_edge(in1, out));
    }
}
