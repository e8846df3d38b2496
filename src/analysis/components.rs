//! Strongly connected components.
//!
//! Iterative Tarjan so that long import chains cannot overflow the call stack.

use crate::graph::TradeGraph;

use super::types::ComponentSummary;

const UNVISITED: usize = usize::MAX;

/// Strongly connected components of `graph`.
///
/// Members are sorted; components are ordered largest first, equal sizes by
/// their member lists. Isolated nodes are singleton components.
pub fn strongly_connected_components(graph: &TradeGraph) -> Vec<Vec<String>> {
    let adjacency = graph.adjacency();

    let mut components: Vec<Vec<String>> = tarjan(&adjacency.outgoing)
        .into_iter()
        .map(|members| {
            let mut names: Vec<String> = members
                .into_iter()
                .map(|i| adjacency.ids[i].to_string())
                .collect();
            names.sort();
            names
        })
        .collect();

    components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    components
}

/// Component structure of `graph` as a report value
pub fn summarize_components(graph: &TradeGraph) -> ComponentSummary {
    let components = strongly_connected_components(graph);
    ComponentSummary {
        node_count: graph.node_count(),
        component_count: components.len(),
        component_sizes: components.iter().map(Vec::len).collect(),
        components,
    }
}

/// True when every node reaches every other node
pub fn is_strongly_connected(graph: &TradeGraph) -> bool {
    !graph.is_empty() && strongly_connected_components(graph).len() == 1
}

/// Tarjan's algorithm over an index adjacency list
pub(crate) fn tarjan(outgoing: &[Vec<(usize, f64)>]) -> Vec<Vec<usize>> {
    let n = outgoing.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut next_index = 0usize;

    // (node, position of the next outgoing edge to explore)
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }

        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;

            if let Some(&(w, _)) = outgoing[v].get(frame.1) {
                frame.1 += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from(edges: &[(&str, &str)], isolated: &[&str]) -> TradeGraph {
        let mut graph = TradeGraph::new();
        for (source, target) in edges {
            graph.set_edge(source, target, 1.0);
        }
        for node in isolated {
            graph.add_node(node);
        }
        graph
    }

    #[test]
    fn test_cycle_is_one_component() {
        let graph = graph_from(&[("US", "CN"), ("CN", "HK"), ("HK", "US")], &[]);
        let components = strongly_connected_components(&graph);
        assert_eq!(components, vec![vec!["CN", "HK", "US"]]);
        assert!(is_strongly_connected(&graph));
    }

    #[test]
    fn test_chain_splits_into_singletons() {
        let graph = graph_from(&[("CN", "HK")], &[]);
        let components = strongly_connected_components(&graph);
        assert_eq!(components, vec![vec!["CN"], vec!["HK"]]);
        assert!(!is_strongly_connected(&graph));
    }

    #[test]
    fn test_mixed_components_are_ordered_by_size() {
        let graph = graph_from(
            &[("A", "B"), ("B", "A"), ("B", "C"), ("C", "D"), ("D", "E"), ("E", "C")],
            &["Z"],
        );
        let summary = summarize_components(&graph);

        assert_eq!(summary.node_count, 6);
        assert_eq!(summary.component_count, 3);
        assert_eq!(summary.component_sizes, vec![3, 2, 1]);
        assert_eq!(summary.components[0], vec!["C", "D", "E"]);
        assert_eq!(summary.components[1], vec!["A", "B"]);
        assert_eq!(summary.components[2], vec!["Z"]);
    }

    #[test]
    fn test_self_loop_does_not_join_anything() {
        let graph = graph_from(&[("BE", "BE"), ("BE", "FR")], &[]);
        assert_eq!(strongly_connected_components(&graph).len(), 2);
    }

    #[test]
    fn test_empty_graph() {
        let graph = TradeGraph::new();
        assert!(strongly_connected_components(&graph).is_empty());
        assert!(!is_strongly_connected(&graph));
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let mut graph = TradeGraph::new();
        let names: Vec<String> = (0..50_000).map(|i| format!("N{:05}", i)).collect();
        for pair in names.windows(2) {
            graph.set_edge(&pair[0], &pair[1], 1.0);
        }
        graph.set_edge(&names[names.len() - 1], &names[0], 1.0);

        assert!(is_strongly_connected(&graph));
    }
}
