//! Node forest construction and cycle detection.

use glaze_core::{Document, ValidationError, ValidationReport};

/// Parent lookup for a validated node forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    parents: Vec<Option<usize>>,
    roots: Vec<usize>,
}

impl Hierarchy {
    /// Parent of `node`, or `None` for roots and unknown nodes.
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    /// Nodes without a parent, ascending.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn is_root(&self, node: usize) -> bool {
        node < self.parents.len() && self.parents[node].is_none()
    }

    /// Chain from `node` up to its root, starting with `node` itself.
    pub fn ancestors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(node), move |&n| self.parent(n)).take(self.parents.len())
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Build the parent table and check that nodes form a forest.
///
/// A node listed twice by the same parent is fine; a node claimed by two
/// different parents is not. Out-of-range children are skipped here.
pub fn build_hierarchy(doc: &Document, report: &mut ValidationReport) -> Hierarchy {
    let count = doc.nodes.len();
    let mut parents: Vec<Option<usize>> = vec![None; count];

    for (i, node) in doc.nodes.iter().enumerate() {
        for &child in &node.children {
            if child >= count {
                continue;
            }
            match parents[child] {
                Some(first) if first != i => report.push(ValidationError::MultipleParents {
                    node: child,
                    first,
                    second: i,
                }),
                Some(_) => {}
                None => parents[child] = Some(i),
            }
        }
    }

    for cycle in find_cycles(doc) {
        report.push(ValidationError::CyclicHierarchy { cycle });
    }

    let roots = (0..count).filter(|&n| parents[n].is_none()).collect();
    Hierarchy { parents, roots }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Depth-first search over child edges with white/grey/black marking.
///
/// Each back edge yields one cycle, written as the path from the revisited
/// node back to itself. Converging paths reach a black node and are not
/// reported.
fn find_cycles(doc: &Document) -> Vec<Vec<usize>> {
    let count = doc.nodes.len();
    let mut marks = vec![Mark::White; count];
    let mut cycles = Vec::new();

    for start in 0..count {
        if marks[start] != Mark::White {
            continue;
        }
        // (node, next child position)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::Grey;

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let children = &doc.nodes[node].children;
            if top.1 == children.len() {
                marks[node] = Mark::Black;
                stack.pop();
                continue;
            }
            let child = children[top.1];
            top.1 += 1;
            if child >= count {
                continue;
            }
            match marks[child] {
                Mark::White => {
                    marks[child] = Mark::Grey;
                    stack.push((child, 0));
                }
                Mark::Grey => {
                    let from = stack.iter().position(|&(n, _)| n == child).unwrap_or(0);
                    let mut cycle: Vec<usize> = stack[from..].iter().map(|&(n, _)| n).collect();
                    cycle.push(child);
                    cycles.push(cycle);
                }
                Mark::Black => {}
            }
        }
    }
    cycles
}
