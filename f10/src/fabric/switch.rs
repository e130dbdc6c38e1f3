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

//! # Switch Agent
//!
//! Every switch runs its own agent, which keeps a private view of the fabric: the switches it
//! knows to be down, the pushback messages it has already seen, and the pushback records it
//! installed. Agents never look at each other; everything they learn arrives as an [`Event`].
//!
//! When a switch learns that one of its lower neighbors failed, it originates a pushback message
//! describing the failed prefix. The message travels through the subtree containing the failure,
//! and down into the branches of the same subtree type. Where it cannot travel any further, a
//! [`PushbackRecord`] is installed, which keeps traffic for the failed prefix away from the
//! neighbor that sent the message.

use crate::fabric::address::{Address, AddressCodec, SubtreeTag};
use crate::fabric::event::{Event, EventQueue, PushbackMsg};
use crate::fabric::policy::RoutingPolicy;
use crate::fabric::routing::{select_next_hop, ForwardingView, NextHop};
use crate::fabric::topology::Topology;
use crate::fabric::types::{DeviceError, Neighbor, NodeId, Port, RoutingError, SwitchInfo};

use log::*;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Key of a pushback record: the prefix of the failed switch, together with the level it was
/// computed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FailedPrefix {
    /// Level of the failed switch
    pub level: u8,
    /// Prefix of the failed switch at its level
    pub prefix: u32,
}

/// Installed pushback record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushbackRecord {
    /// Neighbor from which the pushback message was received
    pub from: NodeId,
    /// Level of the failed switch
    pub failed_level: u8,
    /// Subtree tag of the failed prefix
    pub tag: Option<SubtreeTag>,
}

/// Counters of the pushback protocol, per switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushbackStats {
    /// Number of pushback messages received from a neighbor
    pub received: usize,
    /// Number of messages discarded because their id was already seen
    pub duplicates: usize,
    /// Number of messages sent to neighbors
    pub forwarded: usize,
    /// Number of records installed (including replaced ones)
    pub installed: usize,
    /// Number of pushback messages originated
    pub originated: usize,
}

/// Per-switch agent of the pushback protocol
#[derive(Debug, Clone)]
pub struct SwitchAgent {
    info: SwitchInfo,
    codec: AddressCodec,
    top_level: u8,
    alive: bool,
    dead: HashSet<NodeId>,
    seen: HashSet<u64>,
    records: HashMap<FailedPrefix, PushbackRecord>,
    stats: PushbackStats,
}

impl SwitchAgent {
    pub(crate) fn new(info: SwitchInfo, codec: AddressCodec, top_level: u8) -> Self {
        Self {
            info,
            codec,
            top_level,
            alive: true,
            dead: HashSet::new(),
            seen: HashSet::new(),
            records: HashMap::new(),
            stats: PushbackStats::default(),
        }
    }

    /// Return the id of the switch
    pub fn id(&self) -> NodeId {
        self.info.id
    }

    /// Return the name of the switch
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Return the address of the switch
    pub fn addr(&self) -> Address {
        self.info.addr
    }

    /// Return the level of the switch
    pub fn level(&self) -> u8 {
        self.info.level()
    }

    /// Returns false if the switch is down
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Switches this agent knows to be down
    pub fn known_dead(&self) -> &HashSet<NodeId> {
        &self.dead
    }

    /// Pushback ids this agent has already processed
    pub fn seen_ids(&self) -> &HashSet<u64> {
        &self.seen
    }

    /// All installed pushback records
    pub fn records(&self) -> &HashMap<FailedPrefix, PushbackRecord> {
        &self.records
    }

    /// Returns the record installed for the given prefix
    pub fn record(&self, level: u8, prefix: u32) -> Option<&PushbackRecord> {
        self.records.get(&FailedPrefix { level, prefix })
    }

    /// Returns the protocol counters
    pub fn stats(&self) -> &PushbackStats {
        &self.stats
    }

    /// Returns true if traffic towards `dst` must not be sent to `neighbor`, because a pushback
    /// record for a prefix covering `dst` was received from it.
    pub fn excludes(&self, neighbor: NodeId, dst: Address) -> bool {
        self.records
            .iter()
            .any(|(key, rec)| rec.from == neighbor && self.codec.prefix(dst, key.level) == key.prefix)
    }

    /// Take the switch down. The agent will not handle any event anymore.
    pub(crate) fn shutdown(&mut self) {
        self.alive = false;
    }

    /// Compute the output port for a packet from `src` to `dst`, received on `in_port`, using the
    /// local view of this switch.
    pub fn forward<R: Rng + ?Sized>(
        &self,
        topo: &Topology,
        policy: RoutingPolicy,
        src: Address,
        dst: Address,
        in_port: Port,
        rng: &mut R,
    ) -> Result<NextHop, RoutingError> {
        let prev = topo.neighbor_at(self.id(), in_port);
        let hop = select_next_hop(topo, policy, self, self.id(), prev, dst, rng)?;
        trace!("{}: {} -> {} from port {} to port {}", self.name(), src, dst, in_port, hop.port);
        Ok(hop)
    }

    /// handle an `Event`, and enqueue the resulting events.
    pub(crate) fn handle_event(
        &mut self,
        event: Event,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        match event {
            Event::SwitchDown { to, failed, pushback_id } if to == self.id() => {
                self.handle_switch_down(failed, pushback_id, queue)
            }
            Event::Pushback { from, to, msg } if to == self.id() => {
                if self.info.neighbor(from).is_none() {
                    return Err(DeviceError::NotANeighbor(from));
                }
                self.stats.received += 1;
                self.handle_pushback(from, msg, queue);
                Ok(())
            }
            e => Err(DeviceError::WrongRecipient(e.recipient())),
        }
    }

    fn handle_switch_down(
        &mut self,
        failed: NodeId,
        pushback_id: u64,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        if !self.dead.insert(failed) {
            return Ok(());
        }
        let level = self.level();
        let failed_addr = match self.info.lower_neighbors().find(|n| n.id == failed) {
            Some(n) => n.addr,
            None => return Ok(()),
        };
        let failed_level = failed_addr.level();
        let failed_prefix = self.codec.prefix(failed_addr, failed_level);
        let msg = PushbackMsg {
            id: pushback_id,
            failed_prefix,
            failed_level,
            tag: if failed_level == self.top_level {
                None
            } else {
                Some(SubtreeTag::of_prefix(failed_prefix))
            },
        };
        debug!(
            "{} (level {}): originate pushback {} for prefix {} at level {}",
            self.name(),
            level,
            pushback_id,
            failed_prefix,
            failed_level
        );
        self.stats.originated += 1;
        self.handle_pushback(failed, msg, queue);
        Ok(())
    }

    fn handle_pushback(&mut self, from: NodeId, msg: PushbackMsg, queue: &mut EventQueue) {
        if !self.seen.insert(msg.id) {
            debug!("{}: drop duplicate pushback {}", self.name(), msg.id);
            self.stats.duplicates += 1;
            return;
        }

        let level = self.level();
        let mut targets: Vec<NodeId> = Vec::new();
        if level >= msg.failed_level {
            let own_prefix = self.codec.prefix(self.addr(), level);
            let inside = level == self.top_level
                || own_prefix == self.codec.shift(msg.failed_prefix, level - msg.failed_level);
            let gate =
                level == self.top_level || msg.tag == Some(SubtreeTag::of_prefix(own_prefix));
            if gate {
                let dead = &self.dead;
                let usable = |n: &&Neighbor| n.id != from && !dead.contains(&n.id);
                targets = if inside {
                    self.info.switch_neighbors().filter(usable).map(|n| n.id).collect()
                } else {
                    self.info.lower_neighbors().filter(usable).map(|n| n.id).collect()
                };
            }
        }

        if targets.is_empty() {
            let key = FailedPrefix { level: msg.failed_level, prefix: msg.failed_prefix };
            let record = PushbackRecord { from, failed_level: msg.failed_level, tag: msg.tag };
            debug!(
                "{}: install pushback record for prefix {} at level {} (from {:?})",
                self.name(),
                key.prefix,
                key.level,
                from
            );
            self.records.insert(key, record);
            self.stats.installed += 1;
        } else {
            for to in targets {
                queue.push_back(Event::Pushback { from: self.id(), to, msg: msg.clone() });
                self.stats.forwarded += 1;
            }
        }
    }
}

impl ForwardingView for SwitchAgent {
    fn is_failed(&self, _at: NodeId, node: NodeId) -> bool {
        self.dead.contains(&node)
    }

    fn is_excluded(
        &self,
        _at: NodeId,
        neighbor: NodeId,
        dst: Address,
        _codec: &AddressCodec,
    ) -> bool {
        self.excludes(neighbor, dst)
    }

    fn is_down(&self, node: NodeId) -> bool {
        self.dead.contains(&node)
    }
}
