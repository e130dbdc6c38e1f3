// F10: Fault-Tolerant Fabric Routing
// Copyright (C) 2021  The F10 Developers
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Topology Builder
//!
//! This module constructs the fabric: all switches and hosts, their addresses, the links between
//! them, and the port numbers of every link on both endpoints. The result is an immutable
//! [`Topology`] record, which is the only contract with the emulation harness and the persistence
//! layer.
//!
//! ## Layout
//!
//! With `p = k / 2`, the fabric has `2 p^2` switches on each of the two lower levels, and `p^2`
//! switches on the top level. Level 1 is split into `2p` groups of `p` switches. Even groups
//! (subtree `A`) are wired to the top level in block layout, odd groups (subtree `B`) in column
//! layout:
//!
//! ```text
//! A group, switch j  --->  top switches j*p + 0, j*p + 1, ..., j*p + (p-1)
//! B group, switch j  --->  top switches 0*p + j, 1*p + j, ..., (p-1)*p + j
//! ```
//!
//! Every top switch is therefore connected to exactly one switch of every group, and two level-1
//! switches are connected by two edge-disjoint alternate routes through the other subtree type.
//! In the [`Layout::FatTree`] layout, every group uses the block layout.

use crate::fabric::address::{Address, AddressCodec, SubtreeTag};
use crate::fabric::types::{
    FabricGraph, FabricNode, HostInfo, Neighbor, NodeId, Port, RoutingError, SwitchInfo,
    TopologyError,
};
use crate::Error;

use log::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Number of levels below the top, the only depth supported by this design.
pub const SUPPORTED_LEVELS: usize = 2;

/// How the level-1 groups are wired to the top level.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Layout {
    /// Even groups in block layout, odd groups in column layout
    AbTree,
    /// All groups in block layout (plain fat tree)
    FatTree,
}

impl Default for Layout {
    fn default() -> Self {
        Self::AbTree
    }
}

fn default_levels() -> usize {
    SUPPORTED_LEVELS
}

/// Parameters of the fabric.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct FabricParams {
    /// Number of servers (hosts)
    pub n_servers: usize,
    /// Number of ports per switch
    pub k: usize,
    /// Number of levels below the top
    #[serde(default = "default_levels")]
    pub levels: usize,
    /// Wiring of level 1 to the top level
    #[serde(default)]
    pub layout: Layout,
}

impl FabricParams {
    /// AB tree parameters with two levels below the top.
    pub fn new(n_servers: usize, k: usize) -> Self {
        Self { n_servers, k, levels: SUPPORTED_LEVELS, layout: Layout::AbTree }
    }

    /// Change the layout
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Parse the parameters from a JSON document.
    pub fn from_json(json: impl AsRef<str>) -> Result<Self, Error> {
        Ok(serde_json::from_str(json.as_ref())?)
    }

    /// Validate the parameters and compute the dimensions of the fabric.
    pub fn dimensions(&self) -> Result<FabricDimensions, TopologyError> {
        if self.levels != SUPPORTED_LEVELS {
            return Err(TopologyError::UnsupportedDepth(self.levels));
        }
        if self.k < 4 || self.k % 2 != 0 {
            return Err(TopologyError::InvalidPortCount(self.k));
        }
        let p = self.k / 2;
        let switches_per_layer = 2 * p.pow(self.levels as u32);
        let servers_per_switch = self.n_servers / switches_per_layer;
        if self.n_servers == 0
            || self.n_servers % switches_per_layer != 0
            || servers_per_switch > p
        {
            return Err(TopologyError::InvalidServerCount(self.n_servers, switches_per_layer, p));
        }
        let top_switches = switches_per_layer / 2;
        Ok(FabricDimensions {
            k: self.k,
            p,
            levels: self.levels,
            switches_per_layer,
            servers_per_switch,
            top_switches,
            total_switches: switches_per_layer * self.levels + top_switches,
        })
    }
}

/// Derived sizes of the fabric.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FabricDimensions {
    /// Ports per switch
    pub k: usize,
    /// Half the ports per switch
    pub p: usize,
    /// Levels below the top
    pub levels: usize,
    /// Number of switches on each level below the top
    pub switches_per_layer: usize,
    /// Number of servers attached to each edge switch
    pub servers_per_switch: usize,
    /// Number of switches on the top level
    pub top_switches: usize,
    /// Total number of switches
    pub total_switches: usize,
}

impl FabricDimensions {
    /// Number of groups on the given level below the top.
    pub fn num_groups(&self, level: usize) -> usize {
        2 * self.p.pow((self.levels - level) as u32)
    }

    /// Number of switches in every group of the given level below the top.
    pub fn group_size(&self, level: usize) -> usize {
        self.p.pow(level as u32)
    }

    /// Switch number of the switch `index` in group `group` on level `level`.
    pub fn switch_num(&self, level: usize, group: usize, index: usize) -> usize {
        if level == self.levels {
            level * self.switches_per_layer + index
        } else {
            level * self.switches_per_layer + group * self.group_size(level) + index
        }
    }
}

/// # Topology
///
/// Immutable record of the fabric. Switches `s0 ... s<n-1>` occupy the node indices `0 .. n` in
/// the order of their switch number, the hosts follow in the order of their host number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub(crate) params: FabricParams,
    pub(crate) dims: FabricDimensions,
    pub(crate) codec: AddressCodec,
    pub(crate) graph: FabricGraph,
    pub(crate) switches: Vec<NodeId>,
    pub(crate) hosts: Vec<NodeId>,
    #[serde(skip)]
    pub(crate) by_addr: HashMap<Address, NodeId>,
}

impl Topology {
    /// Build the topology for the given parameters.
    pub fn build(params: FabricParams) -> Result<Self, TopologyError> {
        let mut builder = TopologyBuilder::new(params)?;
        builder.add_nodes()?;
        builder.wire()?;
        builder.finish()
    }

    /// Build an AB tree with two levels below the top.
    pub fn ab_tree(n_servers: usize, k: usize) -> Result<Self, TopologyError> {
        Self::build(FabricParams::new(n_servers, k))
    }

    /// Build a plain fat tree with two levels below the top.
    pub fn fat_tree(n_servers: usize, k: usize) -> Result<Self, TopologyError> {
        Self::build(FabricParams::new(n_servers, k).with_layout(Layout::FatTree))
    }

    /// Serialize the topology to JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a topology from JSON. The record is validated again, and the address index is
    /// rebuilt.
    pub fn from_json(json: impl AsRef<str>) -> Result<Self, Error> {
        let mut topo: Self = serde_json::from_str(json.as_ref())?;
        if topo.params.dimensions()? != topo.dims
            || topo.codec != AddressCodec::new(topo.dims.k)
            || topo.switches.len() != topo.dims.total_switches
            || topo.hosts.len() != topo.params.n_servers
            || topo.graph.node_count() != topo.switches.len() + topo.hosts.len()
        {
            return Err(TopologyError::Malformed("dimensions do not match the parameters").into());
        }
        topo.validate()?;
        Ok(topo)
    }

    /// Check the port mapping and the address assignment, and rebuild the address index.
    pub(crate) fn validate(&mut self) -> Result<(), TopologyError> {
        let k = self.dims.k as Port;
        let mut by_addr = HashMap::new();
        for id in self.graph.node_indices() {
            let node = &self.graph[id];
            if by_addr.insert(node.addr(), id).is_some() {
                return Err(TopologyError::DuplicateAddress(node.addr()));
            }
            match node {
                FabricNode::Switch(s) => {
                    if s.id != id {
                        return Err(TopologyError::Malformed("switch id does not match its index"));
                    }
                    let mut used: HashSet<Port> = HashSet::new();
                    let mut known: HashSet<NodeId> = HashSet::new();
                    for n in s.neighbors.iter() {
                        if n.port == 0 || n.port > k || !used.insert(n.port) {
                            return Err(TopologyError::PortCollision(id, n.port));
                        }
                        if !known.insert(n.id)
                            || !self.graph.contains_edge(id, n.id)
                            || !self.links_back(n.id, id)
                        {
                            return Err(TopologyError::NonBijective(id, n.id));
                        }
                    }
                    if s.neighbors.len() != self.graph.neighbors(id).count() {
                        return Err(TopologyError::NonBijective(id, id));
                    }
                }
                FabricNode::Host(h) => {
                    if h.id != id {
                        return Err(TopologyError::Malformed("host id does not match its index"));
                    }
                    if self.graph.neighbors(id).count() != 1
                        || !self.graph.contains_edge(id, h.uplink)
                        || !self.links_back(h.uplink, id)
                    {
                        return Err(TopologyError::NonBijective(id, h.uplink));
                    }
                }
            }
        }
        self.by_addr = by_addr;
        Ok(())
    }

    /// Returns true if `from` knows a port towards `to`.
    fn links_back(&self, from: NodeId, to: NodeId) -> bool {
        match self.graph.node_weight(from) {
            Some(FabricNode::Switch(s)) => s.neighbor(to).is_some(),
            Some(FabricNode::Host(h)) => h.uplink == to,
            None => false,
        }
    }

    // ********************
    // * Helper Functions *
    // ********************

    /// Returns the parameters used to build the topology.
    pub fn params(&self) -> &FabricParams {
        &self.params
    }

    /// Returns the derived dimensions of the fabric.
    pub fn dimensions(&self) -> &FabricDimensions {
        &self.dims
    }

    /// Returns the address codec of the fabric.
    pub fn codec(&self) -> &AddressCodec {
        &self.codec
    }

    /// Returns a reference to the graph (PetGraph struct).
    pub fn graph(&self) -> &FabricGraph {
        &self.graph
    }

    /// Number of ports per switch
    pub fn n_ports(&self) -> usize {
        self.dims.k
    }

    /// Number of hosts
    pub fn n_hosts(&self) -> usize {
        self.hosts.len()
    }

    /// Number of switches
    pub fn n_switches(&self) -> usize {
        self.switches.len()
    }

    /// Level of the top switches
    pub fn top_level(&self) -> u8 {
        self.dims.levels as u8
    }

    /// All switches, ordered by switch number
    pub fn switches(&self) -> &[NodeId] {
        &self.switches
    }

    /// All hosts, ordered by host number
    pub fn hosts(&self) -> &[NodeId] {
        &self.hosts
    }

    /// Returns the node
    pub fn node(&self, id: NodeId) -> Result<&FabricNode, RoutingError> {
        self.graph.node_weight(id).ok_or(RoutingError::UnknownNode(id))
    }

    /// Returns the switch. Fails if the node does not exist or is a host.
    pub fn switch(&self, id: NodeId) -> Result<&SwitchInfo, RoutingError> {
        self.node(id)?.switch().ok_or(RoutingError::NotASwitch(id))
    }

    /// Returns the host. Fails if the node does not exist or is a switch.
    pub fn host(&self, id: NodeId) -> Result<&HostInfo, RoutingError> {
        self.node(id)?.host().ok_or(RoutingError::NotAHost(id))
    }

    /// Returns the address of a node.
    pub fn addr(&self, id: NodeId) -> Result<Address, RoutingError> {
        Ok(self.node(id)?.addr())
    }

    /// Returns the node carrying the address.
    pub fn node_by_addr(&self, addr: Address) -> Result<NodeId, RoutingError> {
        self.by_addr.get(&addr).copied().ok_or(RoutingError::UnknownAddress(addr))
    }

    /// Get the NodeId with the given name (`s<n>` or `h<n>`).
    pub fn node_by_name(&self, name: impl AsRef<str>) -> Result<NodeId, RoutingError> {
        self.graph
            .node_indices()
            .find(|id| self.graph[*id].name() == name.as_ref())
            .ok_or_else(|| RoutingError::UnknownName(name.as_ref().to_string()))
    }

    /// Returns the name of a node.
    pub fn name(&self, id: NodeId) -> Result<&str, RoutingError> {
        Ok(self.node(id)?.name())
    }

    /// Returns the switch a host is attached to.
    pub fn attached_switch(&self, host: NodeId) -> Result<NodeId, RoutingError> {
        Ok(self.host(host)?.uplink)
    }

    /// Returns the level of a switch.
    pub fn level(&self, switch: NodeId) -> Result<u8, RoutingError> {
        Ok(self.switch(switch)?.level())
    }

    /// Subtree tag of a level-1 switch, or None for switches on other levels.
    pub fn subtree_tag(&self, switch: NodeId) -> Result<Option<SubtreeTag>, RoutingError> {
        let s = self.switch(switch)?;
        Ok(if s.level() == 1 { Some(self.codec.subtree_tag(s.addr)) } else { None })
    }

    /// Returns the port on `from` that leads to `to`.
    pub fn port(&self, from: NodeId, to: NodeId) -> Result<Port, RoutingError> {
        match self.node(from)? {
            FabricNode::Switch(s) => s.neighbor(to).map(|n| n.port),
            FabricNode::Host(h) if h.uplink == to => Some(1),
            FabricNode::Host(_) => None,
        }
        .ok_or(RoutingError::NotConnected(from, to))
    }

    /// Returns the neighbor behind a port.
    pub fn neighbor_at(&self, node: NodeId, port: Port) -> Option<NodeId> {
        match self.graph.node_weight(node)? {
            FabricNode::Switch(s) => s.neighbor_at(port).map(|n| n.id),
            FabricNode::Host(h) if port == 1 => Some(h.uplink),
            FabricNode::Host(_) => None,
        }
    }

    /// Returns the complete port mapping, keyed by ordered neighbor pairs, sorted by the key.
    pub fn port_map(&self) -> Vec<((NodeId, NodeId), Port)> {
        let mut map: Vec<((NodeId, NodeId), Port)> = self
            .graph
            .node_indices()
            .flat_map(|id| match &self.graph[id] {
                FabricNode::Switch(s) => {
                    s.neighbors.iter().map(|n| ((id, n.id), n.port)).collect::<Vec<_>>()
                }
                FabricNode::Host(h) => vec![((id, h.uplink), 1)],
            })
            .collect();
        map.sort();
        map
    }

    /// Returns all links as pairs `(a, b)` with `a < b`, sorted.
    pub fn links(&self) -> Vec<(NodeId, NodeId)> {
        let mut links: Vec<(NodeId, NodeId)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect();
        links.sort();
        links
    }
}

/// Builder keeping track of the open ports of every node while the links are created.
#[derive(Debug)]
pub(crate) struct TopologyBuilder {
    pub(crate) params: FabricParams,
    pub(crate) dims: FabricDimensions,
    pub(crate) codec: AddressCodec,
    pub(crate) graph: FabricGraph,
    pub(crate) open_ports: Vec<Port>,
    pub(crate) switches: Vec<NodeId>,
    pub(crate) hosts: Vec<NodeId>,
}

impl TopologyBuilder {
    /// Validate the parameters and prepare an empty graph.
    pub(crate) fn new(params: FabricParams) -> Result<Self, TopologyError> {
        let dims = params.dimensions()?;
        let codec = AddressCodec::new(dims.k);
        Ok(Self {
            params,
            dims,
            codec,
            graph: FabricGraph::default(),
            open_ports: Vec::new(),
            switches: Vec::new(),
            hosts: Vec::new(),
        })
    }

    /// Address of the switch with the given switch number.
    fn switch_address(&self, num: usize) -> Result<Address, TopologyError> {
        let d = &self.dims;
        let b = self.codec.bits();
        let top = d.levels * d.switches_per_layer;
        if num >= top {
            return Address::new(0, d.levels as u8, (num - top) as u32);
        }
        let level = num / d.switches_per_layer;
        let offset = num % d.switches_per_layer;
        let group = offset / d.group_size(level);
        let index = offset % d.group_size(level);
        let location = match level {
            0 => ((group / d.p) << b) | (group % d.p),
            _ => group << (b as usize * level),
        };
        Address::new(location as u32, level as u8, index as u32)
    }

    /// Add all switches (in the order of the switch number) and all hosts.
    pub(crate) fn add_nodes(&mut self) -> Result<(), TopologyError> {
        for num in 0..self.dims.total_switches {
            let addr = self.switch_address(num)?;
            let id = self.graph.add_node(FabricNode::Switch(SwitchInfo {
                name: format!("s{}", num),
                id: NodeId::end(),
                addr,
                neighbors: Vec::new(),
            }));
            if let FabricNode::Switch(s) = &mut self.graph[id] {
                s.id = id;
            }
            self.open_ports.push(self.dims.k as Port);
            self.switches.push(id);
        }
        let spsw = self.dims.servers_per_switch;
        for num in 0..self.params.n_servers {
            let edge = self.switches[num / spsw];
            let location = self.graph[edge].addr().location();
            let addr = Address::new(location, 0, (num % spsw + 1) as u32)?;
            let id = self.graph.add_node(FabricNode::Host(HostInfo {
                name: format!("h{}", num),
                id: NodeId::end(),
                addr,
                uplink: NodeId::end(),
            }));
            if let FabricNode::Host(h) = &mut self.graph[id] {
                h.id = id;
            }
            self.open_ports.push(1);
            self.hosts.push(id);
        }
        Ok(())
    }

    /// Create all links, level by level starting below the top, group by group.
    pub(crate) fn wire(&mut self) -> Result<(), TopologyError> {
        let d = self.dims;
        let top = d.levels * d.switches_per_layer;
        for level in (0..d.levels).rev() {
            for group in 0..d.num_groups(level) {
                let tag = SubtreeTag::of_prefix(group as u32);
                for index in 0..d.group_size(level) {
                    let num = d.switch_num(level, group, index);
                    if level == 0 {
                        for c in 0..d.servers_per_switch {
                            let host = self.hosts[num * d.servers_per_switch + c];
                            self.connect(self.switches[num], host)?;
                        }
                        // uplinks always use the ports p..1
                        self.close_ports(self.switches[num], d.p as Port);
                    }
                    for n in 0..d.p {
                        let to = if level == 0 {
                            d.switches_per_layer + (num / d.p) * d.p + n
                        } else if tag == SubtreeTag::A || self.params.layout == Layout::FatTree {
                            top + index * d.p + n
                        } else {
                            top + n * d.p + index
                        };
                        self.connect(self.switches[num], self.switches[to])?;
                    }
                }
            }
            debug!("Wired level {} ({} groups)", level, d.num_groups(level));
        }
        Ok(())
    }

    /// Take the next open port of a node, counting down from `k`.
    fn take_port(&mut self, node: NodeId) -> Result<Port, TopologyError> {
        let open = self
            .open_ports
            .get_mut(node.index())
            .ok_or(TopologyError::Malformed("unknown node"))?;
        if *open == 0 {
            return Err(TopologyError::PortsExhausted(node));
        }
        let port = *open;
        *open -= 1;
        Ok(port)
    }

    /// Close all ports above `remaining`, such that the next port taken is `remaining`.
    pub(crate) fn close_ports(&mut self, node: NodeId, remaining: Port) {
        if let Some(open) = self.open_ports.get_mut(node.index()) {
            *open = (*open).min(remaining);
        }
    }

    /// Create a link between `a` and `b`, assigning a port on both endpoints.
    pub(crate) fn connect(&mut self, a: NodeId, b: NodeId) -> Result<(), TopologyError> {
        let port_a = self.take_port(a)?;
        let port_b = self.take_port(b)?;
        let towards_b =
            Neighbor { port: port_a, id: b, addr: self.graph[b].addr(), kind: self.graph[b].kind() };
        let towards_a =
            Neighbor { port: port_b, id: a, addr: self.graph[a].addr(), kind: self.graph[a].kind() };
        self.insert_neighbor(a, towards_b)?;
        self.insert_neighbor(b, towards_a)?;
        self.graph.add_edge(a, b, ());
        Ok(())
    }

    fn insert_neighbor(&mut self, node: NodeId, neighbor: Neighbor) -> Result<(), TopologyError> {
        match &mut self.graph[node] {
            FabricNode::Switch(s) => {
                if s.neighbor_at(neighbor.port).is_some() {
                    return Err(TopologyError::PortCollision(node, neighbor.port));
                }
                s.neighbors.push(neighbor);
            }
            FabricNode::Host(h) => {
                if h.uplink != NodeId::end() {
                    return Err(TopologyError::PortCollision(node, neighbor.port));
                }
                h.uplink = neighbor.id;
            }
        }
        Ok(())
    }

    /// Sort the neighbor tables and validate the result.
    pub(crate) fn finish(mut self) -> Result<Topology, TopologyError> {
        for id in self.switches.iter() {
            if let FabricNode::Switch(s) = &mut self.graph[*id] {
                s.neighbors.sort_by_key(|n| n.port);
            }
        }
        let mut topo = Topology {
            params: self.params,
            dims: self.dims,
            codec: self.codec,
            graph: self.graph,
            switches: self.switches,
            hosts: self.hosts,
            by_addr: HashMap::new(),
        };
        topo.validate()?;
        info!(
            "Built fabric with {} switches and {} hosts (k = {})",
            topo.n_switches(),
            topo.n_hosts(),
            topo.n_ports()
        );
        Ok(topo)
    }
}
