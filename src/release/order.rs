// src/release/order.rs

//! Essential-graph construction and ordering.
//!
//! Slices are ordered with their essentials first. The walk starts from
//! the requested keys and pulls in every transitively essential slice;
//! Tarjan's algorithm then emits the strongly connected components, and
//! any component larger than one slice is a dependency loop.
//!
//! The output is deterministic: nodes are visited in insertion order and
//! successor lists keep declaration order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::names::SliceKey;
use crate::release::Package;

/// Order the given slices so that every essential precedes its
/// dependents, pulling in transitive essentials along the way.
pub(crate) fn order(pkgs: &BTreeMap<String, Package>, keys: &[SliceKey]) -> Result<Vec<SliceKey>> {
    // Check the input keys upfront for friendlier messages.
    for key in keys {
        match pkgs.get(&key.package) {
            None => {
                return Err(Error::Selection(format!(
                    "slices of package {:?} not found",
                    key.package
                )))
            }
            Some(pkg) if !pkg.slices.contains_key(&key.slice) => {
                return Err(Error::Selection(format!("slice {key} not found")))
            }
            Some(_) => {}
        }
    }

    // Collect every relevant slice, keeping insertion order.
    let mut node_order: Vec<String> = Vec::new();
    let mut edges: HashMap<String, Vec<String>> = HashMap::new();
    let mut key_of: HashMap<String, SliceKey> = HashMap::new();
    let mut seen: HashSet<SliceKey> = HashSet::new();
    let mut pending: Vec<SliceKey> = keys.to_vec();
    let mut i = 0;
    while i < pending.len() {
        let key = pending[i].clone();
        i += 1;
        if !seen.insert(key.clone()) {
            continue;
        }
        let slice = &pkgs[&key.package].slices[&key.slice];
        let fqslice = slice.to_string();
        let mut essentials = Vec::with_capacity(slice.essential.len());
        for req in &slice.essential {
            let found = pkgs
                .get(&req.package)
                .is_some_and(|pkg| pkg.slices.contains_key(&req.slice));
            if !found {
                return Err(Error::Dependency(format!(
                    "{fqslice} requires {req}, but slice is missing"
                )));
            }
            essentials.push(req.to_string());
        }
        node_order.push(fqslice.clone());
        key_of.insert(fqslice.clone(), key);
        edges.insert(fqslice, essentials);
        pending.extend(slice.essential.iter().cloned());
    }

    // Emit the components. A slice can reach its essentials, so each
    // component comes out only after everything it depends on.
    let mut sorted = Vec::with_capacity(node_order.len());
    for component in tarjan(&node_order, &edges) {
        if component.len() > 1 {
            return Err(Error::Cycle(component.join(", ")));
        }
        if let Some(key) = key_of.get(component[0]) {
            sorted.push(key.clone());
        }
    }
    Ok(sorted)
}

/// Tarjan's strongly-connected-components algorithm over the slice
/// graph. `nodes` fixes the visiting order; edges point from a slice to
/// its essentials in declaration order.
fn tarjan<'a>(nodes: &'a [String], edges: &'a HashMap<String, Vec<String>>) -> Vec<Vec<&'a str>> {
    struct State<'a> {
        edges: &'a HashMap<String, Vec<String>>,
        index: HashMap<&'a str, usize>,
        lowlink: HashMap<&'a str, usize>,
        on_stack: HashSet<&'a str>,
        stack: Vec<&'a str>,
        next_index: usize,
        components: Vec<Vec<&'a str>>,
    }

    fn strongconnect<'a>(state: &mut State<'a>, v: &'a str) {
        state.index.insert(v, state.next_index);
        state.lowlink.insert(v, state.next_index);
        state.next_index += 1;
        state.stack.push(v);
        state.on_stack.insert(v);

        if let Some(successors) = state.edges.get(v) {
            for w in successors {
                let w = w.as_str();
                if !state.index.contains_key(w) {
                    strongconnect(state, w);
                    let low = state.lowlink[w].min(state.lowlink[v]);
                    state.lowlink.insert(v, low);
                } else if state.on_stack.contains(w) {
                    let low = state.index[w].min(state.lowlink[v]);
                    state.lowlink.insert(v, low);
                }
            }
        }

        if state.lowlink[v] == state.index[v] {
            let mut component = Vec::new();
            while let Some(w) = state.stack.pop() {
                state.on_stack.remove(w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            component.reverse();
            state.components.push(component);
        }
    }

    let mut state = State {
        edges,
        index: HashMap::new(),
        lowlink: HashMap::new(),
        on_stack: HashSet::new(),
        stack: Vec::new(),
        next_index: 0,
        components: Vec::new(),
    };
    for v in nodes {
        if !state.index.contains_key(v.as_str()) {
            strongconnect(&mut state, v);
        }
    }
    state.components
}
