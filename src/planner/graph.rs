// src/planner/graph.rs

//! Graph structures backing plan serialization.
//!
//! [`PlanGraph`] is the insertion-ordered digraph the mark engine records
//! install and remove intents into. [`topological_sort`] is the lazy-vertex
//! variant used by the simple planners, which discover their vertices while
//! walking adjacency.
//!
//! Both sorts are iterative depth-first, emitting a vertex after all of its
//! successors. Vertices and adjacency lists are visited in insertion order,
//! so equal inputs produce byte-identical orders.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{Error, Result};
use crate::planner::cluster::ClusterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Insertion-ordered directed graph over cluster handles.
#[derive(Debug, Default)]
pub struct PlanGraph {
    vertices: Vec<ClusterId>,
    adjacency: HashMap<ClusterId, Vec<ClusterId>>,
}

impl PlanGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. Re-adding an existing vertex is a no-op.
    pub fn add_vertex(&mut self, id: ClusterId) {
        if !self.adjacency.contains_key(&id) {
            self.adjacency.insert(id, Vec::new());
            self.vertices.push(id);
        }
    }

    /// Add an edge, registering both endpoints as vertices.
    pub fn add_edge(&mut self, from: ClusterId, to: ClusterId) {
        self.add_vertex(from);
        self.add_vertex(to);
        let successors = self.adjacency.entry(from).or_default();
        if !successors.contains(&to) {
            successors.push(to);
        }
    }

    /// Depth-first topological sort: every vertex appears after all of its
    /// successors. Ties are broken by vertex insertion order.
    pub fn topological_sort<F>(&self, describe: F) -> Result<Vec<ClusterId>>
    where
        F: Fn(ClusterId) -> String,
    {
        let mut states: HashMap<ClusterId, VisitState> = HashMap::new();
        let mut sorted = Vec::with_capacity(self.vertices.len());

        for &root in &self.vertices {
            if states.contains_key(&root) {
                continue;
            }
            states.insert(root, VisitState::InProgress);
            let mut stack: Vec<(ClusterId, usize)> = vec![(root, 0)];

            while let Some(&mut (id, ref mut next)) = stack.last_mut() {
                let successors = self
                    .adjacency
                    .get(&id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();

                if *next < successors.len() {
                    let successor = successors[*next];
                    *next += 1;
                    match states.get(&successor) {
                        None => {
                            states.insert(successor, VisitState::InProgress);
                            stack.push((successor, 0));
                        }
                        Some(VisitState::InProgress) => {
                            return Err(Error::CircularDependency(describe(successor)));
                        }
                        Some(VisitState::Done) => {}
                    }
                } else {
                    states.insert(id, VisitState::Done);
                    sorted.push(id);
                    stack.pop();
                }
            }
        }

        Ok(sorted)
    }
}

/// Adjacency source for the lazy-vertex topological sort.
///
/// Vertices are materialized on first visit from their key; adjacency is
/// read off the materialized vertex. This lets the remove and export
/// planners discover their graphs while sorting them.
pub trait AdjacencyProvider {
    type Key: Clone + Eq + Hash;
    type Vertex;

    fn load_vertex(&self, key: &Self::Key) -> Result<Self::Vertex>;
    fn adjacency_list(&self, vertex: &Self::Vertex) -> Vec<Self::Key>;
    fn describe(&self, key: &Self::Key) -> String;
}

struct Frame<P: AdjacencyProvider> {
    key: P::Key,
    vertex: P::Vertex,
    successors: Vec<P::Key>,
    next: usize,
}

/// Depth-first topological sort over lazily loaded vertices, starting from
/// `starts` in order. Every vertex appears after all of its successors.
pub fn topological_sort<P: AdjacencyProvider>(
    starts: &[P::Key],
    provider: &P,
) -> Result<Vec<P::Vertex>> {
    let mut states: HashMap<P::Key, VisitState> = HashMap::new();
    let mut sorted = Vec::new();

    for root in starts {
        if states.contains_key(root) {
            continue;
        }
        states.insert(root.clone(), VisitState::InProgress);
        let mut stack = vec![new_frame(root.clone(), provider)?];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.successors.len() {
                let successor = frame.successors[frame.next].clone();
                frame.next += 1;
                match states.get(&successor) {
                    None => {
                        states.insert(successor.clone(), VisitState::InProgress);
                        stack.push(new_frame(successor, provider)?);
                    }
                    Some(VisitState::InProgress) => {
                        return Err(Error::CircularDependency(provider.describe(&successor)));
                    }
                    Some(VisitState::Done) => {}
                }
            } else if let Some(frame) = stack.pop() {
                states.insert(frame.key, VisitState::Done);
                sorted.push(frame.vertex);
            }
        }
    }

    Ok(sorted)
}

fn new_frame<P: AdjacencyProvider>(key: P::Key, provider: &P) -> Result<Frame<P>> {
    let vertex = provider.load_vertex(&key)?;
    let successors = provider.adjacency_list(&vertex);
    Ok(Frame {
        key,
        vertex,
        successors,
        next: 0,
    })
}
