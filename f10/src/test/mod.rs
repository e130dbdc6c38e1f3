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

#[cfg(test)]
mod test_address;
#[cfg(test)]
mod test_printer;
#[cfg(test)]
mod test_switch;

#[cfg(test)]
use crate::fabric::{NodeId, Topology};

/// Enable the log output (with `RUST_LOG=debug`) for the test that calls this function.
#[cfg(test)]
pub(crate) fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// Id of the switch `s<n>`
#[cfg(test)]
pub(crate) fn s(n: usize) -> NodeId {
    NodeId::new(n)
}

/// Id of the host `h<n>`
#[cfg(test)]
pub(crate) fn h(topo: &Topology, n: usize) -> NodeId {
    topo.hosts()[n]
}

/// # Test fabric
///
/// AB tree with 4-port switches and 16 servers. Level-1 groups `A` are wired in block layout,
/// groups `B` in column layout.
///
/// ```text
///              s16          s17          s18          s19
///         (s8 s10 s12 s14)(s8 s11 s12 s15)(s9 s10 s13 s14)(s9 s11 s13 s15)
///
///   group:   0 (A)      1 (B)      2 (A)      3 (B)
///          s8   s9    s10  s11   s12  s13   s14  s15
///          s0   s1    s2   s3    s4   s5    s6   s7
///         h0 h1 h2 h3 ...                         h14 h15
/// ```
#[cfg(test)]
pub(crate) fn ab_tree_k4() -> Topology {
    Topology::ab_tree(16, 4).unwrap()
}
