use std::collections::BTreeSet;

/// Evaluation order for the gates of one circuit level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Every gate index exactly once.
    pub order: Vec<usize>,
    /// Gates on a feedback loop, ascending. A loop is scheduled as one block
    /// in discovery order once everything feeding it has run; its gates read
    /// the values carried around the loop from the previous tick. Gates
    /// behind a loop are ordered normally.
    pub feedback: Vec<usize>,
}

/// Kahn's algorithm over the strongly connected components of `successors`,
/// where `successors[i]` lists the gates fed by gate `i`. Ties are broken by
/// the lowest index, so a graph without cross dependencies keeps discovery
/// order.
pub fn topological_order(successors: &[Vec<usize>]) -> Schedule {
    let (component, component_count) = strongly_connected(successors);

    let mut members = vec![Vec::new(); component_count];
    for (gate, &c) in component.iter().enumerate() {
        members[c].push(gate);
    }

    let mut in_degree = vec![0usize; component_count];
    for (gate, targets) in successors.iter().enumerate() {
        for &target in targets {
            if component[target] != component[gate] {
                in_degree[component[target]] += 1;
            }
        }
    }

    // keyed by the lowest member so ties follow discovery order
    let mut ready: BTreeSet<(usize, usize)> = (0..component_count)
        .filter(|&c| in_degree[c] == 0)
        .map(|c| (members[c][0], c))
        .collect();
    let mut order = Vec::with_capacity(successors.len());
    let mut feedback = Vec::new();

    while let Some((first, c)) = ready.pop_first() {
        let gates = &members[c];
        if gates.len() > 1 || successors[first].contains(&first) {
            feedback.extend(gates);
        }
        order.extend(gates);

        for &gate in gates {
            for &target in &successors[gate] {
                let next = component[target];
                if next == c {
                    continue;
                }
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert((members[next][0], next));
                }
            }
        }
    }

    feedback.sort_unstable();
    Schedule { order, feedback }
}

/// Tarjan's algorithm without recursion. Returns the component of every gate
/// and the number of components.
fn strongly_connected(successors: &[Vec<usize>]) -> (Vec<usize>, usize) {
    const UNVISITED: usize = usize::MAX;

    let count = successors.len();
    let mut index = vec![UNVISITED; count];
    let mut low = vec![0usize; count];
    let mut on_stack = vec![false; count];
    let mut stack = Vec::new();
    let mut component = vec![UNVISITED; count];
    let mut components = 0;
    let mut next_index = 0;

    for root in 0..count {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        low[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        // (gate, position of the next successor to visit)
        let mut calls = vec![(root, 0usize)];
        while let Some((gate, edge)) = calls.last().copied() {
            if let Some(&next) = successors[gate].get(edge) {
                if let Some(frame) = calls.last_mut() {
                    frame.1 += 1;
                }
                if index[next] == UNVISITED {
                    index[next] = next_index;
                    low[next] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next] = true;
                    calls.push((next, 0));
                } else if on_stack[next] {
                    low[gate] = low[gate].min(index[next]);
                }
                continue;
            }

            calls.pop();
            if let Some(&(parent, _)) = calls.last() {
                low[parent] = low[parent].min(low[gate]);
            }
            if low[gate] == index[gate] {
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component[member] = components;
                    if member == gate {
                        break;
                    }
                }
                components += 1;
            }
        }
    }

    (component, components)
}
