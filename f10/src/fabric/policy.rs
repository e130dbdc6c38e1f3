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

//! # Routing Policies
//!
//! The path selection is a single skeleton, and the policy decides the two points where the
//! variants differ: which ports are candidates when the intended downward port is unusable, and
//! in which direction to continue when the destination is not below the current switch.

use crate::fabric::address::SubtreeTag;
use crate::fabric::types::{Neighbor, NodeKind, Port, SwitchInfo};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Failover behavior of the path selection.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RoutingPolicy {
    /// Reroute through the other subtree type (short reroute), and only if everything of that type
    /// is unusable, through another branch of the same type (long reroute).
    AbTreeFailover,
    /// Reroute through any live neighbor, and keep descending once going down.
    FatTreeFailover,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::AbTreeFailover
    }
}

impl fmt::Display for RoutingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbTreeFailover => write!(f, "AB tree failover"),
            Self::FatTreeFailover => write!(f, "fat tree failover"),
        }
    }
}

/// Kind of reroute taken at a failover decision.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Reroute {
    /// Through a subtree of the other type (3-hop reroute)
    Short,
    /// Through another subtree of the same type (5-hop reroute)
    Long,
    /// Through any live neighbor
    Detour,
}

/// Direction of a hop in the tree.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Direction {
    /// Towards the top level
    Up,
    /// Towards the hosts
    Down,
}

impl RoutingPolicy {
    /// Compute the failover candidates at switch `sw`, when the port `intended` cannot be used.
    /// `unusable` contains the ports towards failed or pushback-excluded neighbors, and `back` is
    /// the port towards the previous hop, which is never a candidate. The long reroute is only
    /// taken when no port of the other subtree type is left. The returned candidates are sorted
    /// by port number.
    pub fn failover<'a>(
        &self,
        sw: &'a SwitchInfo,
        intended: Port,
        unusable: &HashSet<Port>,
        back: Option<Port>,
    ) -> (Vec<&'a Neighbor>, Reroute) {
        let usable = |n: &&'a Neighbor| {
            n.kind == NodeKind::Switch && !unusable.contains(&n.port) && Some(n.port) != back
        };
        match self {
            Self::AbTreeFailover => {
                let tag = SubtreeTag::of_port(intended);
                let covered = sw
                    .neighbors
                    .iter()
                    .all(|n| SubtreeTag::of_port(n.port) == tag || !usable(&n));
                let (wanted, reroute) =
                    if covered { (tag, Reroute::Long) } else { (tag.other(), Reroute::Short) };
                let candidates = sw
                    .neighbors
                    .iter()
                    .filter(|n| SubtreeTag::of_port(n.port) == wanted)
                    .filter(usable)
                    .collect();
                (candidates, reroute)
            }
            Self::FatTreeFailover => {
                (sw.neighbors.iter().filter(usable).collect(), Reroute::Detour)
            }
        }
    }

    /// Decide the direction when the destination is not below the current switch. `parents` and
    /// `children` tell if any upward or downward candidate remains, and `descending` is true if
    /// the packet arrived from an upper neighbor.
    pub fn direction(&self, parents: bool, children: bool, descending: bool) -> Option<Direction> {
        let prefer_down = match self {
            Self::AbTreeFailover => false,
            Self::FatTreeFailover => descending,
        };
        match (prefer_down, parents, children) {
            (true, _, true) => Some(Direction::Down),
            (_, true, _) => Some(Direction::Up),
            (_, false, true) => Some(Direction::Down),
            (_, false, false) => None,
        }
    }
}
