//! Directed graph of the entities of a class or component diagram.
//!
//! Nodes are entities in declaration order and edges are links. The graph
//! assigns every entity a layer: the longest path from a root, counting
//! only vertical links, after cycles have been broken by dropping the back
//! edges found by a depth-first search.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};
use petgraph::{
    Direction,
    algo::toposort,
    graph::{DiGraph, NodeIndex},
    visit::{DfsEvent, EdgeRef, depth_first_search},
};

use tracery_core::{
    identifier::Id,
    model::{Entity, EntityDiagram, Link},
};

use crate::TraceryError;

#[derive(Debug)]
pub struct EntityGraph<'a> {
    graph: DiGraph<&'a Entity, &'a Link>,
}

impl<'a> EntityGraph<'a> {
    /// # Errors
    ///
    /// Fails when a link refers to an entity the diagram does not contain.
    pub fn new(diagram: &'a EntityDiagram) -> Result<Self, TraceryError> {
        let mut graph = DiGraph::new();
        let mut indices = IndexMap::new();
        for entity in diagram.entities() {
            indices.insert(entity.code(), graph.add_node(entity));
        }

        for link in diagram.links() {
            let endpoint = |code: Id| {
                indices
                    .get(&code)
                    .copied()
                    .ok_or_else(|| TraceryError::Layout(format!("Unknown entity `{code}`")))
            };
            let (from, to) = (endpoint(link.from)?, endpoint(link.to)?);
            graph.add_edge(from, to, link);
        }

        debug!(nodes = graph.node_count(), edges = graph.edge_count(); "Entity graph built");
        Ok(Self { graph })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Edges that close a cycle when visiting from the entities in
    /// declaration order. Self links are included.
    fn back_edges(&self) -> HashSet<(NodeIndex, NodeIndex)> {
        let mut back = HashSet::new();
        depth_first_search(&self.graph, self.graph.node_indices(), |event| {
            if let DfsEvent::BackEdge(from, to) = event {
                back.insert((from, to));
            }
        });
        back
    }

    /// Layer of every entity, in declaration order.
    fn ranks(&self) -> Vec<usize> {
        let back = self.back_edges();
        let mut acyclic: DiGraph<(), bool> = DiGraph::with_capacity(self.node_count(), 0);
        for _ in self.graph.node_indices() {
            acyclic.add_node(());
        }
        for edge in self.graph.edge_references() {
            let (from, to) = (edge.source(), edge.target());
            if back.contains(&(from, to)) {
                trace!(from:% = self.graph[from].code(), to:% = self.graph[to].code(); "Ignoring back edge");
                continue;
            }
            acyclic.add_edge(from, to, edge.weight().vertical);
        }

        let order = toposort(&acyclic, None).unwrap_or_else(|_| acyclic.node_indices().collect());
        let mut ranks = vec![0; self.node_count()];
        for node in order {
            let rank = acyclic
                .edges_directed(node, Direction::Incoming)
                .map(|edge| ranks[edge.source().index()] + usize::from(*edge.weight()))
                .max()
                .unwrap_or(0);
            ranks[node.index()] = rank;
        }
        ranks
    }

    /// Entities grouped by layer, top layer first. Inside a layer entities
    /// keep their declaration order.
    pub fn layers(&self) -> Vec<Vec<&'a Entity>> {
        let ranks = self.ranks();
        let count = ranks.iter().max().map_or(0, |max| max + 1);
        let mut layers = vec![Vec::new(); count];
        for node in self.graph.node_indices() {
            layers[ranks[node.index()]].push(self.graph[node]);
        }
        layers
    }
}

#[cfg(test)]
mod tests {
    use tracery_core::{
        label::Label,
        model::{DiagramKind, EntityKind, LineStyle, LinkDecor},
    };

    use super::*;

    fn link(from: &str, to: &str, vertical: bool) -> Link {
        Link {
            from: Id::new(from),
            to: Id::new(to),
            from_decor: LinkDecor::None,
            to_decor: LinkDecor::Arrow,
            style: LineStyle::Solid,
            label: Label::default(),
            vertical,
        }
    }

    fn diagram(codes: &[&str], links: &[(&str, &str, bool)]) -> EntityDiagram {
        let mut diagram = EntityDiagram::new(DiagramKind::Class);
        for code in codes {
            diagram.get_or_create(Id::new(code), EntityKind::Class, true);
        }
        for &(from, to, vertical) in links {
            diagram.add_link(link(from, to, vertical));
        }
        diagram
    }

    fn layer_codes(diagram: &EntityDiagram) -> Vec<Vec<String>> {
        EntityGraph::new(diagram)
            .unwrap()
            .layers()
            .iter()
            .map(|layer| layer.iter().map(|entity| entity.code().to_string()).collect())
            .collect()
    }

    #[test]
    fn test_chain_gets_one_layer_per_entity() {
        let diagram = diagram(&["A", "B", "C"], &[("A", "B", true), ("B", "C", true)]);
        assert_eq!(layer_codes(&diagram), [["A"], ["B"], ["C"]]);
    }

    #[test]
    fn test_longest_path_wins() {
        let diagram = diagram(
            &["A", "B", "C"],
            &[("A", "C", true), ("A", "B", true), ("B", "C", true)],
        );
        assert_eq!(layer_codes(&diagram), [["A"], ["B"], ["C"]]);
    }

    #[test]
    fn test_horizontal_links_share_a_layer() {
        let diagram = diagram(&["A", "B", "C"], &[("A", "B", false), ("B", "C", true)]);
        assert_eq!(
            layer_codes(&diagram),
            [vec!["A".to_string(), "B".to_string()], vec!["C".to_string()]]
        );
    }

    #[test]
    fn test_cycles_are_broken() {
        let diagram = diagram(
            &["A", "B"],
            &[("A", "B", true), ("B", "A", true), ("A", "A", true)],
        );
        assert_eq!(layer_codes(&diagram), [["A"], ["B"]]);
    }

    #[test]
    fn test_unknown_endpoint_is_an_error() {
        let diagram = diagram(&["A"], &[("A", "missing", true)]);
        let err = EntityGraph::new(&diagram).unwrap_err();
        assert!(matches!(err, TraceryError::Layout(message) if message.contains("missing")));
    }

    #[test]
    fn test_unlinked_entities_share_the_top_layer() {
        let diagram = diagram(&["A", "B"], &[]);
        let graph = EntityGraph::new(&diagram).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.layers().len(), 1);
    }
}
