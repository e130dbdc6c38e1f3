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

#![deny(missing_docs)]

//! # F10: Fault-Tolerant Fabric Routing
//! This is a library for computing and maintaining forwarding paths in a data-center fabric built
//! as an AB fat tree, while individual switches fail. No central recomputation takes place: every
//! switch decides locally, using only address comparisons and what it learned from its neighbors.
//!
//! ## Structure
//!
//! - **[Address codec](fabric::address)**: Every switch and host carries a synthetic address that
//!   encodes its position in the tree. Prefix comparisons on these addresses are the only way
//!   any component reasons about the position of a node.
//!
//! - **[Topology](fabric::topology)**: Construction of the fabric from the number of servers and
//!   the number of ports per switch. The result is an immutable [`Topology`](fabric::Topology)
//!   record, which can be stored as JSON.
//!
//! - **[Path selection](fabric::routing)**: Computes the next hop at a switch, or the complete
//!   path between two hosts, given a local view of failures. The failover behavior is chosen with
//!   a [`RoutingPolicy`](fabric::RoutingPolicy).
//!
//! - **[Pushback protocol](fabric::Fabric)**: One [`SwitchAgent`](fabric::SwitchAgent) per
//!   switch, exchanging failure notifications over a simulated network. Switches far away from a
//!   failure learn to avoid sending traffic into it.
//!
//! - **[Printer](fabric::printer)**: Formatted strings of paths, events and pushback tables.
//!
//! ## Limitations
//!
//! Only trees with two levels below the top level are supported. Failed switches never recover,
//! and pushback records are never withdrawn.

mod error;
pub mod fabric;
mod test;

pub use error::Error;
