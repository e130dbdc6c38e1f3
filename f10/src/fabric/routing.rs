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

//! # Path Selection
//!
//! The next hop is computed at every switch using only the address of the destination, the
//! address of the switch and its neighbors, and a local view of failures. When the destination is
//! below the current switch, the packet is routed down towards the unique neighbor covering the
//! destination. Otherwise, it is routed up (or down, if no parent is usable). When the neighbor
//! below is unusable, the [`RoutingPolicy`] picks the failover candidates.
//!
//! Ties are broken uniformly at random, using an injected random number generator.

use crate::fabric::address::{Address, AddressCodec};
use crate::fabric::policy::{Direction, Reroute, RoutingPolicy};
use crate::fabric::topology::Topology;
use crate::fabric::types::{Neighbor, NodeId, NodeKind, Port, RoutingError};

use log::*;
use rand::prelude::*;
use std::collections::HashSet;
use std::iter::FromIterator;

/// Local view of the failures, as seen by the switch that takes the decision.
pub trait ForwardingView {
    /// Returns true if the switch `at` considers `node` to be down.
    fn is_failed(&self, at: NodeId, node: NodeId) -> bool;

    /// Returns true if the switch `at` must not send traffic for `dst` to its neighbor `neighbor`.
    fn is_excluded(
        &self,
        _at: NodeId,
        _neighbor: NodeId,
        _dst: Address,
        _codec: &AddressCodec,
    ) -> bool {
        false
    }

    /// Returns true if `node` is actually down, independent of what any switch knows.
    fn is_down(&self, node: NodeId) -> bool;
}

/// Set of failed switches. Switches are only ever added.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct FailedSet {
    failed: HashSet<NodeId>,
}

impl FailedSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the switch as failed. Returns true if it was not failed before.
    pub fn insert(&mut self, switch: NodeId) -> bool {
        self.failed.insert(switch)
    }

    /// Returns true if the switch is failed
    pub fn contains(&self, switch: NodeId) -> bool {
        self.failed.contains(&switch)
    }

    /// Number of failed switches
    pub fn len(&self) -> usize {
        self.failed.len()
    }

    /// Returns true if no switch is failed
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }

    /// Iterate over all failed switches
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.failed.iter()
    }
}

impl FromIterator<NodeId> for FailedSet {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        Self { failed: iter.into_iter().collect() }
    }
}

impl Extend<NodeId> for FailedSet {
    fn extend<T: IntoIterator<Item = NodeId>>(&mut self, iter: T) {
        self.failed.extend(iter)
    }
}

impl ForwardingView for FailedSet {
    fn is_failed(&self, _at: NodeId, node: NodeId) -> bool {
        self.contains(node)
    }

    fn is_down(&self, node: NodeId) -> bool {
        self.contains(node)
    }
}

/// Kind of a single forwarding decision
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum HopKind {
    /// Deliver to the attached destination host
    Deliver,
    /// Regular hop towards the top level
    Up,
    /// Regular hop towards the destination
    Down,
    /// Failover, because the neighbor towards the destination is unusable
    Reroute(Reroute),
}

/// Result of a single forwarding decision
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct NextHop {
    /// Output port
    pub port: Port,
    /// Neighbor behind the output port
    pub node: NodeId,
    /// Kind of the decision
    pub kind: HopKind,
}

impl NextHop {
    fn new(neighbor: &Neighbor, kind: HopKind) -> Self {
        Self { port: neighbor.port, node: neighbor.id, kind }
    }
}

/// Path from the switch of the source to the switch of the destination.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Path {
    /// Sequence of switches, starting at the switch of the source
    pub switches: Vec<NodeId>,
    /// All reroutes taken along the path, in order
    pub reroutes: Vec<Reroute>,
}

impl Path {
    /// Number of links traversed between the two edge switches
    pub fn hop_count(&self) -> usize {
        self.switches.len().saturating_sub(1)
    }
}

/// Compute the next hop at switch `current`, for a packet destined to `dst`, that was received
/// from `prev` (or `None` if the packet enters the fabric at `current`). Fails with
/// [`RoutingError::UnknownAddress`] if no host carries the address `dst`.
pub fn select_next_hop<R, V>(
    topo: &Topology,
    policy: RoutingPolicy,
    view: &V,
    current: NodeId,
    prev: Option<NodeId>,
    dst: Address,
    rng: &mut R,
) -> Result<NextHop, RoutingError>
where
    R: Rng + ?Sized,
    V: ForwardingView + ?Sized,
{
    let sw = topo.switch(current)?;
    topo.host(topo.node_by_addr(dst)?)?;
    let codec = topo.codec();
    let level = sw.level();
    let failed = |n: &Neighbor| view.is_failed(current, n.id);
    let excluded = |n: &Neighbor| view.is_excluded(current, n.id, dst, codec);
    let back = prev.and_then(|p| sw.neighbor(p)).map(|n| n.port);

    // the destination is attached to this switch
    if level == 0 && sw.addr.location() == dst.location() {
        return sw
            .neighbors
            .iter()
            .find(|n| n.kind == NodeKind::Host && n.addr == dst)
            .map(|n| NextHop::new(n, HopKind::Deliver))
            .ok_or(RoutingError::UnknownAddress(dst));
    }

    if level == topo.top_level() || codec.same_subtree(sw.addr, dst, level) {
        // route down
        let below = level.saturating_sub(1);
        let expected = sw
            .lower_neighbors()
            .find(|n| codec.same_subtree(n.addr, dst, below))
            .ok_or_else(|| RoutingError::NoRoute(vec![current]))?;
        if !failed(expected) && !excluded(expected) {
            return Ok(NextHop::new(expected, HopKind::Down));
        }
        if below == 0 && failed(expected) {
            debug!("Destination {} is unreachable, its switch is down", dst);
            return Err(RoutingError::NoRoute(vec![current]));
        }
        let unusable: HashSet<Port> =
            sw.neighbors.iter().filter(|n| failed(*n) || excluded(*n)).map(|n| n.port).collect();
        let (candidates, reroute) = policy.failover(sw, expected.port, &unusable, back);
        let choice = candidates.choose(rng).ok_or_else(|| RoutingError::NoRoute(vec![current]))?;
        debug!("{}: {:?} reroute via port {} towards {}", sw.name, reroute, choice.port, dst);
        Ok(NextHop::new(choice, HopKind::Reroute(reroute)))
    } else {
        // route up or down
        let parents: Vec<&Neighbor> = sw
            .upper_neighbors()
            .filter(|n| !failed(*n) && Some(n.port) != back && !excluded(*n))
            .collect();
        let children: Vec<&Neighbor> = sw
            .lower_neighbors()
            .filter(|n| !failed(*n) && Some(n.port) != back && !excluded(*n))
            .collect();
        let descending = prev.map(|p| sw.upper_neighbors().any(|n| n.id == p)).unwrap_or(false);
        match policy.direction(!parents.is_empty(), !children.is_empty(), descending) {
            Some(Direction::Up) => parents.choose(rng).map(|n| NextHop::new(n, HopKind::Up)),
            Some(Direction::Down) => children.choose(rng).map(|n| NextHop::new(n, HopKind::Down)),
            None => None,
        }
        .ok_or_else(|| RoutingError::NoRoute(vec![current]))
    }
}

/// # Path Selector
///
/// Walks through the fabric by repeatedly computing the next hop, until the switch of the
/// destination is reached.
#[derive(Debug)]
pub struct PathSelector<'a, R> {
    topo: &'a Topology,
    policy: RoutingPolicy,
    rng: R,
}

impl<'a> PathSelector<'a, StdRng> {
    /// Create a path selector with a deterministic random number generator.
    pub fn seeded(topo: &'a Topology, policy: RoutingPolicy, seed: u64) -> Self {
        Self::new(topo, policy, StdRng::seed_from_u64(seed))
    }
}

impl<'a, R: Rng> PathSelector<'a, R> {
    /// Create a new path selector
    pub fn new(topo: &'a Topology, policy: RoutingPolicy, rng: R) -> Self {
        Self { topo, policy, rng }
    }

    /// Returns the policy used for the decisions
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Compute a single forwarding decision. See [`select_next_hop`].
    pub fn next_hop<V: ForwardingView + ?Sized>(
        &mut self,
        view: &V,
        current: NodeId,
        prev: Option<NodeId>,
        dst: Address,
    ) -> Result<NextHop, RoutingError> {
        select_next_hop(self.topo, self.policy, view, current, prev, dst, &mut self.rng)
    }

    /// Compute the path from host `src` to host `dst`. The path starts at the switch of the source
    /// and ends at the switch of the destination.
    pub fn route<V: ForwardingView + ?Sized>(
        &mut self,
        view: &V,
        src: NodeId,
        dst: NodeId,
    ) -> Result<Path, RoutingError> {
        let start = self.topo.attached_switch(src)?;
        let target = self.topo.attached_switch(dst)?;
        let dst_addr = self.topo.addr(dst)?;

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut path = Path { switches: vec![start], reroutes: Vec::new() };
        visited.insert(start);
        if view.is_down(start) {
            return Err(RoutingError::BlackHole(path.switches));
        }

        let mut prev = None;
        let mut current = start;
        while current != target {
            let hop = match self.next_hop(view, current, prev, dst_addr) {
                Ok(hop) => hop,
                Err(RoutingError::NoRoute(_)) => return Err(RoutingError::NoRoute(path.switches)),
                Err(e) => return Err(e),
            };
            if let HopKind::Reroute(reroute) = hop.kind {
                path.reroutes.push(reroute);
            }
            path.switches.push(hop.node);
            if view.is_down(hop.node) {
                debug!("Black hole detected: {:?}", path.switches);
                return Err(RoutingError::BlackHole(path.switches));
            }
            if !visited.insert(hop.node) {
                debug!("Forwarding Loop detected: {:?}", path.switches);
                return Err(RoutingError::ForwardingLoop(path.switches));
            }
            prev = Some(current);
            current = hop.node;
        }
        Ok(path)
    }
}

/// Number of links between the switches of two hosts when no switch is failed. This is `0` if
/// both hosts share their edge switch, and `2l` for the lowest level `l` at which both hosts are in
/// the same subtree.
pub fn tree_distance(topo: &Topology, src: NodeId, dst: NodeId) -> Result<usize, RoutingError> {
    let a = topo.host(src)?.addr;
    let b = topo.host(dst)?.addr;
    let top = topo.top_level();
    Ok((0..top)
        .find(|l| topo.codec().same_subtree(a, b, *l))
        .map(|l| 2 * l as usize)
        .unwrap_or(2 * top as usize))
}
