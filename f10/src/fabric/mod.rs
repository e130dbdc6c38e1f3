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

#![deny(missing_docs, missing_debug_implementations)]

//! # Fabric
//!
//! Model of an AB fat-tree fabric: addressing, topology construction, path selection with local
//! failover, and the pushback protocol running on one agent per switch.
//!
//! ## Example usage
//!
//! The following example builds a fabric with 4-port switches and 16 servers. Without failures,
//! the path between two servers in different groups traverses four links. After the level-1
//! switch `s8` fails, switch `s10` learns through pushback not to send traffic for the group of
//! `s8` towards `s16`.
//!
//! ```rust
//! use f10::fabric::{Fabric, FailedSet, PathSelector, RoutingPolicy, Topology};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let topo = Topology::ab_tree(16, 4)?;
//!     let h0 = topo.node_by_name("h0")?;
//!     let h15 = topo.node_by_name("h15")?;
//!
//!     let mut selector = PathSelector::seeded(&topo, RoutingPolicy::AbTreeFailover, 42);
//!     let path = selector.route(&FailedSet::new(), h0, h15)?;
//!     assert_eq!(path.hop_count(), 4);
//!
//!     let s8 = topo.node_by_name("s8")?;
//!     let s10 = topo.node_by_name("s10")?;
//!     let s16 = topo.node_by_name("s16")?;
//!     let mut fabric = Fabric::new(topo, RoutingPolicy::AbTreeFailover, 42);
//!     fabric.fail_switch(s8)?;
//!     assert_eq!(fabric.agent(s10)?.record(1, 0).map(|r| r.from), Some(s16));
//!
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod event;
mod network;
pub mod policy;
pub mod printer;
pub mod routing;
mod switch;
pub mod topology;
mod types;

pub use address::{Address, AddressCodec, SubtreeTag, ADDRESS_TAG};
pub use event::{Event, PushbackMsg};
pub use network::Fabric;
pub use policy::{Direction, Reroute, RoutingPolicy};
pub use routing::{
    select_next_hop, tree_distance, FailedSet, ForwardingView, HopKind, NextHop, Path,
    PathSelector,
};
pub use switch::{FailedPrefix, PushbackRecord, PushbackStats, SwitchAgent};
pub use topology::{FabricDimensions, FabricParams, Layout, Topology};
pub use types::*;
