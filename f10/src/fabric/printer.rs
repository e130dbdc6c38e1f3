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

//! # Helper (printer) functions for the Fabric
//! Module containing helper functions to get formatted strings of paths, events and pushback
//! tables, with the names of the switches inserted.

use crate::fabric::event::Event;
use crate::fabric::routing::Path;
use crate::fabric::switch::SwitchAgent;
use crate::fabric::topology::Topology;
use crate::fabric::types::{NodeId, RoutingError};

use itertools::Itertools;

/// Returns the name of the node, followed by its address, like `s8 (10.0.1.0)`.
pub fn node(topo: &Topology, id: NodeId) -> Result<String, RoutingError> {
    let node = topo.node(id)?;
    Ok(format!("{} ({})", node.name(), node.addr()))
}

/// Returns the path as a sequence of switch names, like `s0 => s8 => s16 => s10 => s2`.
pub fn path(topo: &Topology, path: &Path) -> Result<String, RoutingError> {
    Ok(path.switches.iter().map(|id| topo.name(*id)).collect::<Result<Vec<_>, _>>()?.join(" => "))
}

/// Returns a formatted string for the event.
pub fn event(topo: &Topology, event: &Event) -> Result<String, RoutingError> {
    Ok(match event {
        Event::SwitchDown { to, failed, pushback_id } => format!(
            "{}: {} is down (pushback id {})",
            topo.name(*to)?,
            topo.name(*failed)?,
            pushback_id
        ),
        Event::Pushback { from, to, msg } => format!(
            "{} -> {}: Pushback {} prefix {} at level {}, tag {}",
            topo.name(*from)?,
            topo.name(*to)?,
            msg.id,
            msg.failed_prefix,
            msg.failed_level,
            msg.tag.map(|t| t.to_string()).unwrap_or_else(|| String::from("-"))
        ),
    })
}

/// Get a vector of strings, which represent the pushback table of the switch, sorted by the
/// failed prefix. Each line has the form `level 1 prefix 0: from s16 (tag A)`.
pub fn pushback_table(topo: &Topology, agent: &SwitchAgent) -> Result<Vec<String>, RoutingError> {
    agent
        .records()
        .iter()
        .sorted_by_key(|(key, _)| **key)
        .map(|(key, rec)| {
            Ok(format!(
                "level {} prefix {}: from {} (tag {})",
                key.level,
                key.prefix,
                topo.name(rec.from)?,
                rec.tag.map(|t| t.to_string()).unwrap_or_else(|| String::from("-"))
            ))
        })
        .collect()
}
