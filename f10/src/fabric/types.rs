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

//! Module containing all type definitions

use crate::fabric::address::Address;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use serde::{Deserialize, Serialize};
use thiserror::Error;

type IndexType = u32;
/// Node Identification (and index into the graph)
pub type NodeId = NodeIndex<IndexType>;
/// Port number on a switch, in the range `[1, k]`. Hosts only have port 1.
pub type Port = u32;
/// Graph of all switches and hosts
pub type FabricGraph = Graph<FabricNode, (), Undirected, IndexType>;

/// Whether a node is a switch or a host.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum NodeKind {
    /// Switch
    Switch,
    /// Host (server)
    Host,
}

/// Entry of the per-port neighbor table.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Neighbor {
    /// Local port leading to the neighbor
    pub port: Port,
    /// Identifier of the neighbor
    pub id: NodeId,
    /// Address of the neighbor
    pub addr: Address,
    /// Kind of the neighbor
    pub kind: NodeKind,
}

/// Static description of a switch: its name, address, and the neighbor table.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct SwitchInfo {
    /// Name of the switch (`s<n>`)
    pub name: String,
    /// Identifier of the switch
    pub id: NodeId,
    /// Address of the switch
    pub addr: Address,
    /// Neighbor table, sorted by port number
    pub neighbors: Vec<Neighbor>,
}

impl SwitchInfo {
    /// Tree level of the switch
    pub fn level(&self) -> u8 {
        self.addr.level()
    }

    /// Returns the neighbor at the given port
    pub fn neighbor_at(&self, port: Port) -> Option<&Neighbor> {
        self.neighbors.iter().find(|n| n.port == port)
    }

    /// Returns the table entry of a neighbor
    pub fn neighbor(&self, id: NodeId) -> Option<&Neighbor> {
        self.neighbors.iter().find(|n| n.id == id)
    }

    /// Iterator over all neighboring switches one level above.
    pub fn upper_neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        let level = self.level();
        self.neighbors
            .iter()
            .filter(move |n| n.kind == NodeKind::Switch && n.addr.level() == level + 1)
    }

    /// Iterator over all neighboring switches one level below.
    pub fn lower_neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        let level = self.level();
        self.neighbors
            .iter()
            .filter(move |n| n.kind == NodeKind::Switch && level > 0 && n.addr.level() == level - 1)
    }

    /// Iterator over all neighboring switches.
    pub fn switch_neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.iter().filter(|n| n.kind == NodeKind::Switch)
    }
}

/// Static description of a host.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    /// Name of the host (`h<n>`)
    pub name: String,
    /// Identifier of the host
    pub id: NodeId,
    /// Address of the host
    pub addr: Address,
    /// The switch the host is attached to (on host port 1)
    pub uplink: NodeId,
}

/// Node weight in the fabric graph.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub enum FabricNode {
    /// Switch
    Switch(SwitchInfo),
    /// Host
    Host(HostInfo),
}

impl FabricNode {
    /// Name of the node
    pub fn name(&self) -> &str {
        match self {
            Self::Switch(s) => &s.name,
            Self::Host(h) => &h.name,
        }
    }

    /// Address of the node
    pub fn addr(&self) -> Address {
        match self {
            Self::Switch(s) => s.addr,
            Self::Host(h) => h.addr,
        }
    }

    /// Kind of the node
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Switch(_) => NodeKind::Switch,
            Self::Host(_) => NodeKind::Host,
        }
    }

    /// Returns the switch, or None if the node is a host
    pub fn switch(&self) -> Option<&SwitchInfo> {
        match self {
            Self::Switch(s) => Some(s),
            Self::Host(_) => None,
        }
    }

    /// Returns the host, or None if the node is a switch
    pub fn host(&self) -> Option<&HostInfo> {
        match self {
            Self::Switch(_) => None,
            Self::Host(h) => Some(h),
        }
    }
}

/// Errors while building, validating or loading a topology
#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    /// Only trees with exactly two levels below the top are supported
    #[error("Unsupported number of levels: {0} (only 2 levels are supported)")]
    UnsupportedDepth(usize),
    /// The number of ports per switch must be even and at least 4
    #[error("Invalid number of ports per switch: {0}")]
    InvalidPortCount(usize),
    /// The servers cannot be evenly distributed on the edge switches
    #[error("Cannot attach {0} servers to {1} edge switches with {2} host ports each")]
    InvalidServerCount(usize, usize, usize),
    /// A value does not fit into its address field
    #[error("Value {1} does not fit into the address field `{0}`")]
    FieldOverflow(&'static str, u32),
    /// All ports of a switch are already used
    #[error("No free port left on {0:?}")]
    PortsExhausted(NodeId),
    /// Two neighbors of the same node share a port
    #[error("Port {1} is assigned twice on {0:?}")]
    PortCollision(NodeId, Port),
    /// The port mapping of an edge is missing or inconsistent on one endpoint
    #[error("Port mapping of the link {0:?} -- {1:?} is not bijective")]
    NonBijective(NodeId, NodeId),
    /// Two nodes carry the same address
    #[error("Address {0} is assigned twice")]
    DuplicateAddress(Address),
    /// Stored topology is malformed
    #[error("Malformed topology: {0}")]
    Malformed(&'static str),
}

/// Errors of the path selection
#[derive(Error, Debug, PartialEq)]
pub enum RoutingError {
    /// The node is not part of the topology
    #[error("Node was not found in the topology: {0:?}")]
    UnknownNode(NodeId),
    /// No node carries this address
    #[error("No node with address {0}")]
    UnknownAddress(Address),
    /// No node carries this name
    #[error("No node with name {0}")]
    UnknownName(String),
    /// The two nodes are not connected by a link
    #[error("No link between {0:?} and {1:?}")]
    NotConnected(NodeId, NodeId),
    /// The node must be a host
    #[error("Node is not a host: {0:?}")]
    NotAHost(NodeId),
    /// The node must be a switch
    #[error("Node is not a switch: {0:?}")]
    NotASwitch(NodeId),
    /// No viable port survives the exclusions
    #[error("No route! path: {0:?}")]
    NoRoute(Vec<NodeId>),
    /// Forwarding loop detected
    #[error("Forwarding Loop occurred! path: {0:?}")]
    ForwardingLoop(Vec<NodeId>),
    /// The packet was forwarded into a switch that is down
    #[error("Black hole occurred! path: {0:?}")]
    BlackHole(Vec<NodeId>),
}

/// Errors of a switch agent
#[derive(Error, Debug, PartialEq)]
pub enum DeviceError {
    /// The event is addressed to a different switch
    #[error("Event is addressed to {0:?}")]
    WrongRecipient(NodeId),
    /// The message was received from a node that is not a neighbor
    #[error("Received a message from a non-neighbor: {0:?}")]
    NotANeighbor(NodeId),
}

/// Errors of the online fabric
#[derive(Error, Debug, PartialEq)]
pub enum FabricError {
    /// Device Error which cannot be handled
    #[error("Device Error: {0}")]
    DeviceError(#[from] DeviceError),
    /// Routing error
    #[error("Routing Error: {0}")]
    RoutingError(#[from] RoutingError),
    /// Topology error
    #[error("Topology Error: {0}")]
    TopologyError(#[from] TopologyError),
    /// Switch is not present in the fabric
    #[error("Switch was not found in the fabric: {0:?}")]
    SwitchNotFound(NodeId),
    /// The switch is already down
    #[error("Switch has already failed: {0:?}")]
    AlreadyFailed(NodeId),
    /// The pushback messages did not settle within the message limit
    #[error("Fabric cannot converge in the given time!")]
    NoConvergence,
}
