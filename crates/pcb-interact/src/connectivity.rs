//! Net membership and the rats nest.
//!
//! Ids are joined with a union-find: pads and holes to their port, traces to
//! the ports their wires start and end on, ports to their source port, and
//! source traces to every source port and net they connect.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{AnyCircuitElement, CircuitElement, PcbPort, Point, TraceRoutePoint};

#[derive(Debug, Default)]
struct DisjointSet {
    index: HashMap<String, usize>,
    names: Vec<String>,
    parent: Vec<usize>,
}

impl DisjointSet {
    fn node(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.parent.len();
        self.index.insert(name.to_string(), i);
        self.names.push(name.to_string());
        self.parent.push(i);
        i
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union_indices(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        // lower index wins so roots are stable in insertion order
        if ra < rb {
            self.parent[rb] = ra;
        } else {
            self.parent[ra] = rb;
        }
        true
    }

    fn union(&mut self, a: &str, b: &str) {
        let (a, b) = (self.node(a), self.node(b));
        self.union_indices(a, b);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityMap {
    net_of: BTreeMap<String, String>,
    members: BTreeMap<String, Vec<String>>,
}

impl ConnectivityMap {
    pub fn net_id_of(&self, id: &str) -> Option<&str> {
        self.net_of.get(id).map(String::as_str)
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        match (self.net_id_of(a), self.net_id_of(b)) {
            (Some(na), Some(nb)) => na == nb,
            _ => false,
        }
    }

    pub fn members(&self, net_id: &str) -> &[String] {
        self.members.get(net_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nets(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.members.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn wire_ports(route: &[TraceRoutePoint]) -> impl Iterator<Item = &str> {
    route
        .iter()
        .flat_map(|p| match p {
            TraceRoutePoint::Wire {
                start_pcb_port_id,
                end_pcb_port_id,
                ..
            } => [start_pcb_port_id.as_deref(), end_pcb_port_id.as_deref()],
            TraceRoutePoint::Via { .. } => [None, None],
        })
        .flatten()
}

pub fn compute_connectivity(elements: &[AnyCircuitElement]) -> ConnectivityMap {
    let mut set = DisjointSet::default();
    for element in elements {
        let Some(known) = element.known() else {
            continue;
        };
        match known {
            CircuitElement::PcbSmtpad(pad) => {
                set.node(&pad.pcb_smtpad_id);
                if let Some(port) = &pad.pcb_port_id {
                    set.union(&pad.pcb_smtpad_id, port);
                }
            }
            CircuitElement::PcbPlatedHole(hole) => {
                set.node(&hole.pcb_plated_hole_id);
                if let Some(port) = &hole.pcb_port_id {
                    set.union(&hole.pcb_plated_hole_id, port);
                }
            }
            CircuitElement::PcbPort(port) => {
                set.node(&port.pcb_port_id);
                if let Some(source) = &port.source_port_id {
                    set.union(&port.pcb_port_id, source);
                }
            }
            CircuitElement::PcbTrace(trace) => {
                set.node(&trace.pcb_trace_id);
                for port in wire_ports(&trace.route) {
                    set.union(&trace.pcb_trace_id, port);
                }
                if let Some(source) = &trace.source_trace_id {
                    set.union(&trace.pcb_trace_id, source);
                }
            }
            CircuitElement::PcbVia(via) => {
                if let Some(trace) = &via.pcb_trace_id {
                    set.union(&via.pcb_via_id, trace);
                }
            }
            CircuitElement::SourceTrace(trace) => {
                set.node(&trace.source_trace_id);
                for id in trace
                    .connected_source_port_ids
                    .iter()
                    .chain(&trace.connected_source_net_ids)
                {
                    set.union(&trace.source_trace_id, id);
                }
            }
            CircuitElement::PcbCopperPour(pour) => {
                if let Some(net) = &pour.source_net_id {
                    set.union(&pour.pcb_copper_pour_id, net);
                }
            }
            _ => {}
        }
    }

    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for i in 0..set.names.len() {
        let root = set.find(i);
        groups.entry(root).or_default().push(set.names[i].clone());
    }

    let mut map = ConnectivityMap::default();
    for (n, (_, mut ids)) in groups.into_iter().enumerate() {
        let net_id = format!("connectivity_net{n}");
        ids.sort();
        for id in &ids {
            map.net_of.insert(id.clone(), net_id.clone());
        }
        map.members.insert(net_id, ids);
    }
    map
}

// ─── Rats nest ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatsNestLine {
    pub net_id: String,
    pub start_pcb_port_id: String,
    pub end_pcb_port_id: String,
    pub start: Point,
    pub end: Point,
}

/// Unrouted connections: for each net, the shortest set of port-to-port
/// lines that joins every port not already joined by a trace.
pub fn compute_rats_nest(elements: &[AnyCircuitElement], map: &ConnectivityMap) -> Vec<RatsNestLine> {
    let ports: Vec<&PcbPort> = elements
        .iter()
        .filter_map(AnyCircuitElement::as_port)
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    let port_index: HashMap<&str, usize> = ports
        .iter()
        .enumerate()
        .map(|(i, p)| (p.pcb_port_id.as_str(), i))
        .collect();

    // ports already joined by copper start out in the same island
    let mut islands = DisjointSet::default();
    for p in &ports {
        islands.node(&p.pcb_port_id);
    }
    for element in elements {
        let Some(CircuitElement::PcbTrace(trace)) = element.known() else {
            continue;
        };
        let routed: Vec<&str> = wire_ports(&trace.route)
            .filter(|id| port_index.contains_key(id))
            .collect();
        for pair in routed.windows(2) {
            islands.union(pair[0], pair[1]);
        }
    }

    let mut by_net: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, p) in ports.iter().enumerate() {
        if let Some(net) = map.net_id_of(&p.pcb_port_id) {
            by_net.entry(net).or_default().push(i);
        }
    }

    let mut lines = Vec::new();
    for (net_id, members) in by_net {
        let mut candidates = Vec::new();
        for (k, &a) in members.iter().enumerate() {
            for &b in &members[k + 1..] {
                let pa = Point::new(ports[a].x, ports[a].y);
                let pb = Point::new(ports[b].x, ports[b].y);
                candidates.push((pa.distance(pb), a, b));
            }
        }
        candidates.sort_by(|x, y| x.0.total_cmp(&y.0));
        for (_, a, b) in candidates {
            let ia = islands.node(&ports[a].pcb_port_id);
            let ib = islands.node(&ports[b].pcb_port_id);
            if islands.union_indices(ia, ib) {
                lines.push(RatsNestLine {
                    net_id: net_id.to_string(),
                    start_pcb_port_id: ports[a].pcb_port_id.clone(),
                    end_pcb_port_id: ports[b].pcb_port_id.clone(),
                    start: Point::new(ports[a].x, ports[a].y),
                    end: Point::new(ports[b].x, ports[b].y),
                });
            }
        }
    }
    lines
}
