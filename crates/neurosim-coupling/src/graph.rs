// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Coupling Graph
// ─────────────────────────────────────────────────────────────────────
//! Undirected graph of coupling edges over declared source names.
//! Every declaration error (unknown endpoint, self loop, duplicate
//! edge, unresolvable method or parameters) surfaces at `add_edge`
//! time; the forest invariant is checked against the finished graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use neurosim_types::{NeurosimError, NeurosimResult};

use crate::kernels::{CouplingKernel, CouplingMethod};

/// Coupling parameters as declared, before validation: an optional
/// method tag plus named numeric values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouplingSpec {
    pub method: Option<CouplingMethod>,
    pub params: BTreeMap<String, f64>,
}

impl CouplingSpec {
    pub fn new(method: CouplingMethod) -> Self {
        Self {
            method: Some(method),
            params: BTreeMap::new(),
        }
    }

    /// Add one named parameter (builder style).
    pub fn param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    /// Merge this spec over a shared one: edge-specific values win,
    /// shared values fill the gaps.
    pub fn merged_over(&self, common: &CouplingSpec) -> CouplingSpec {
        let mut params = common.params.clone();
        for (k, v) in &self.params {
            params.insert(k.clone(), *v);
        }
        CouplingSpec {
            method: self.method.or(common.method),
            params,
        }
    }
}

/// One validated coupling edge.
///
/// `params` keeps the merged declaration record for introspection;
/// `kernel` is the resolved executable form. Neither changes after
/// `add_edge` accepts the declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingEdge {
    pub source: usize,
    pub target: usize,
    pub method: CouplingMethod,
    pub kernel: CouplingKernel,
    pub params: BTreeMap<String, f64>,
}

/// Incremental builder: declare sources, then edges. All checks run
/// eagerly so a bad declaration fails in the call that made it.
#[derive(Debug, Clone, Default)]
pub struct CouplingGraphBuilder {
    names: Vec<String>,
    index: BTreeMap<String, usize>,
    edges: Vec<CouplingEdge>,
    common: CouplingSpec,
}

impl CouplingGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with shared parameters applied under every edge.
    pub fn with_common(common: CouplingSpec) -> Self {
        Self {
            common,
            ..Self::default()
        }
    }

    /// Replace the shared parameters for subsequently declared edges.
    pub fn set_common(&mut self, common: CouplingSpec) {
        self.common = common;
    }

    /// Declare a source name. Names must be unique.
    pub fn declare_source(&mut self, name: &str) -> NeurosimResult<usize> {
        if self.index.contains_key(name) {
            return Err(NeurosimError::Config(format!(
                "source name '{name}' is already taken"
            )));
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Declare a coupling edge between two sources.
    ///
    /// Checks, in order: both endpoints are declared, the edge is not a
    /// self loop, the pair is not already coupled in either direction,
    /// a method is resolvable, and the merged parameters satisfy the
    /// method's schema.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        spec: &CouplingSpec,
    ) -> NeurosimResult<()> {
        let s = *self
            .index
            .get(source)
            .ok_or_else(|| NeurosimError::UnknownSource(source.to_string()))?;
        let t = *self
            .index
            .get(target)
            .ok_or_else(|| NeurosimError::UnknownSource(target.to_string()))?;
        if s == t {
            return Err(NeurosimError::SelfLoop(source.to_string()));
        }
        if self
            .edges
            .iter()
            .any(|e| (e.source, e.target) == (s, t) || (e.source, e.target) == (t, s))
        {
            return Err(NeurosimError::DuplicateEdge {
                source: source.to_string(),
                target: target.to_string(),
            });
        }

        let merged = spec.merged_over(&self.common);
        let method = merged.method.ok_or_else(|| NeurosimError::MissingMethod {
            source: source.to_string(),
            target: target.to_string(),
        })?;
        let kernel = CouplingKernel::resolve(method, &merged.params, source, target)?;

        self.edges.push(CouplingEdge {
            source: s,
            target: t,
            method,
            kernel,
            params: merged.params,
        });
        Ok(())
    }

    /// Snapshot the declarations into an immutable graph.
    pub fn build(&self) -> CouplingGraph {
        let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); self.names.len()];
        for (idx, edge) in self.edges.iter().enumerate() {
            adjacency[edge.source].push((edge.target, idx));
            adjacency[edge.target].push((edge.source, idx));
        }
        for list in adjacency.iter_mut() {
            list.sort_unstable();
        }
        CouplingGraph {
            names: self.names.clone(),
            edges: self.edges.clone(),
            adjacency,
        }
    }
}

/// Immutable coupling graph: the arena of declared names, the validated
/// edges, and sorted adjacency for deterministic traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingGraph {
    names: Vec<String>,
    edges: Vec<CouplingEdge>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl CouplingGraph {
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn name(&self, id: usize) -> &str {
        &self.names[id]
    }

    pub fn node_id(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn edges(&self) -> &[CouplingEdge] {
        &self.edges
    }

    /// Neighbors of `id` with the connecting edge index, ascending.
    pub fn adjacency(&self, id: usize) -> &[(usize, usize)] {
        &self.adjacency[id]
    }

    /// The edge connecting `a` and `b`, regardless of the direction it
    /// was declared in.
    pub fn edge_between(&self, a: usize, b: usize) -> Option<&CouplingEdge> {
        self.edges
            .iter()
            .find(|e| (e.source, e.target) == (a, b) || (e.source, e.target) == (b, a))
    }

    /// Verify that the graph is a forest.
    ///
    /// Runs union-find over the edges; the edge that closes a cycle
    /// trips the error.
    pub fn validate_forest(&self) -> NeurosimResult<()> {
        let mut ds = DisjointSet::new(self.names.len());
        for edge in &self.edges {
            if !ds.union(edge.source, edge.target) {
                return Err(NeurosimError::CycleDetected);
            }
        }
        Ok(())
    }

    /// Connected components among nodes with at least one edge.
    ///
    /// Components are ordered by their smallest node id, members
    /// ascending, so traversal decisions depend only on the graph.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.names.len();
        let mut seen = vec![false; n];
        let mut out = Vec::new();
        for start in 0..n {
            if seen[start] || self.adjacency[start].is_empty() {
                continue;
            }
            let mut members = Vec::new();
            let mut stack = vec![start];
            seen[start] = true;
            while let Some(node) = stack.pop() {
                members.push(node);
                for &(nb, _) in &self.adjacency[node] {
                    if !seen[nb] {
                        seen[nb] = true;
                        stack.push(nb);
                    }
                }
            }
            members.sort_unstable();
            out.push(members);
        }
        out
    }
}

/// Union-find with path halving and union by size.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`. Returns false if they were
    /// already connected (the new edge closes a cycle).
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

// ── Tests ────────────────────────────────────────────────────────────
