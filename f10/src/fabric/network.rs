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

//! # Online Fabric
//!
//! This module simulates the fabric with one [`SwitchAgent`] per switch. The agents only
//! communicate through the event queue, which is processed in FIFO order. Events addressed to a
//! switch that is down are dropped.

use crate::fabric::address::{Address, AddressCodec};
use crate::fabric::event::{Event, EventQueue};
use crate::fabric::policy::RoutingPolicy;
use crate::fabric::printer;
use crate::fabric::routing::{FailedSet, ForwardingView, NextHop, Path, PathSelector};
use crate::fabric::switch::SwitchAgent;
use crate::fabric::topology::Topology;
use crate::fabric::types::{FabricError, NodeId, Port, RoutingError};

use log::*;
use rand::prelude::*;
use std::collections::HashMap;

static DEFAULT_STOP_AFTER: usize = 100_000;

/// # Fabric
///
/// The fabric owns the topology, all switch agents and the event queue. Failures are injected
/// with [`Fabric::fail_switch`], which runs the pushback protocol until no message is left, or with
/// [`Fabric::inject_failure`], which only enqueues the notifications. In the latter case, the
/// queue can be processed stepwise with [`Fabric::step`], and forwarding decisions in between use
/// the possibly outdated view of each switch.
#[derive(Debug, Clone)]
pub struct Fabric {
    topo: Topology,
    policy: RoutingPolicy,
    agents: HashMap<NodeId, SwitchAgent>,
    queue: EventQueue,
    rng: StdRng,
    stop_after: Option<usize>,
    num_msg: usize,
}

impl Fabric {
    /// Create a fabric with one live agent per switch. The seed controls both the pushback ids
    /// and the random decisions of the path selection.
    pub fn new(topo: Topology, policy: RoutingPolicy, seed: u64) -> Self {
        let codec = *topo.codec();
        let top_level = topo.top_level();
        let agents = topo
            .switches()
            .iter()
            .filter_map(|id| topo.switch(*id).ok())
            .map(|s| (s.id, SwitchAgent::new(s.clone(), codec, top_level)))
            .collect();
        Self {
            topo,
            policy,
            agents,
            queue: EventQueue::new(),
            rng: StdRng::seed_from_u64(seed),
            stop_after: Some(DEFAULT_STOP_AFTER),
            num_msg: 0,
        }
    }

    /// Returns the topology
    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    /// Returns the routing policy
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Returns the agent of a switch
    pub fn agent(&self, switch: NodeId) -> Result<&SwitchAgent, FabricError> {
        self.agents.get(&switch).ok_or(FabricError::SwitchNotFound(switch))
    }

    /// Iterate over all agents, in arbitrary order
    pub fn agents(&self) -> impl Iterator<Item = &SwitchAgent> {
        self.agents.values()
    }

    /// Returns all switches that are down
    pub fn failed_set(&self) -> FailedSet {
        self.agents.values().filter(|a| !a.is_alive()).map(|a| a.id()).collect()
    }

    /// Number of events waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of events processed so far
    pub fn num_msg_exchanged(&self) -> usize {
        self.num_msg
    }

    /// Configure the maximum number of events processed by a single call to [`Fabric::run`].
    /// `None` removes the limit.
    pub fn set_msg_limit(&mut self, stop_after: Option<usize>) {
        self.stop_after = stop_after;
    }

    /// Take the switch down and notify every live switch, without processing the queue. Returns
    /// the pushback id of the failure.
    pub fn inject_failure(&mut self, switch: NodeId) -> Result<u64, FabricError> {
        let agent = self.agents.get_mut(&switch).ok_or(FabricError::SwitchNotFound(switch))?;
        if !agent.is_alive() {
            return Err(FabricError::AlreadyFailed(switch));
        }
        agent.shutdown();
        let pushback_id: u64 = self.rng.gen();
        info!("{} failed (pushback id {})", self.topo.name(switch)?, pushback_id);
        for to in self.topo.switches() {
            if self.agents.get(to).map(|a| a.is_alive()).unwrap_or(false) {
                self.queue.push_back(Event::SwitchDown { to: *to, failed: switch, pushback_id });
            }
        }
        Ok(pushback_id)
    }

    /// Take the switch down, and process the queue until no message is left.
    pub fn fail_switch(&mut self, switch: NodeId) -> Result<u64, FabricError> {
        let pushback_id = self.inject_failure(switch)?;
        self.run()?;
        Ok(pushback_id)
    }

    /// Take all switches down, one after the other, each time processing the queue until no
    /// message is left.
    pub fn fail_switches<I>(&mut self, switches: I) -> Result<(), FabricError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        for switch in switches {
            self.fail_switch(switch)?;
        }
        Ok(())
    }

    /// Executes one single event. If the result is Ok(true), then an event was processed. If the
    /// result is Ok(false), then the queue was empty.
    pub fn step(&mut self) -> Result<bool, FabricError> {
        if let Some(event) = self.queue.pop_front() {
            self.num_msg += 1;
            trace!("{}", printer::event(&self.topo, &event)?);
            let to = event.recipient();
            let agent = self.agents.get_mut(&to).ok_or(FabricError::SwitchNotFound(to))?;
            if agent.is_alive() {
                agent.handle_event(event, &mut self.queue)?;
            } else {
                debug!("Drop event for {}, which is down", agent.name());
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Process the queue until it is empty.
    pub fn run(&mut self) -> Result<(), FabricError> {
        let mut remaining_iter = self.stop_after;
        while !self.queue.is_empty() {
            if let Some(rem) = remaining_iter {
                if rem == 0 {
                    debug!("Fabric cannot converge! {} events left", self.queue.len());
                    return Err(FabricError::NoConvergence);
                }
                remaining_iter = Some(rem - 1);
            }
            self.step()?;
        }
        Ok(())
    }

    /// Ask the switch for the output port of a packet from `src` to `dst`, received on `in_port`.
    /// The decision uses the current view of that switch.
    pub fn forward(
        &mut self,
        switch: NodeId,
        src: Address,
        dst: Address,
        in_port: Port,
    ) -> Result<NextHop, FabricError> {
        let agent = self.agents.get(&switch).ok_or(FabricError::SwitchNotFound(switch))?;
        if !agent.is_alive() {
            return Err(RoutingError::BlackHole(vec![switch]).into());
        }
        Ok(agent.forward(&self.topo, self.policy, src, dst, in_port, &mut self.rng)?)
    }

    /// Compute the path from host `src` to host `dst`, where every switch on the way decides with
    /// its own view.
    pub fn route(&mut self, src: NodeId, dst: NodeId) -> Result<Path, FabricError> {
        let view = AgentView { agents: &self.agents };
        let mut selector = PathSelector::new(&self.topo, self.policy, &mut self.rng);
        Ok(selector.route(&view, src, dst)?)
    }
}

/// View of the fabric where every decision is taken with the knowledge of the deciding switch.
struct AgentView<'a> {
    agents: &'a HashMap<NodeId, SwitchAgent>,
}

impl<'a> ForwardingView for AgentView<'a> {
    fn is_failed(&self, at: NodeId, node: NodeId) -> bool {
        self.agents.get(&at).map(|a| a.known_dead().contains(&node)).unwrap_or(false)
    }

    fn is_excluded(&self, at: NodeId, neighbor: NodeId, dst: Address, _codec: &AddressCodec) -> bool {
        self.agents.get(&at).map(|a| a.excludes(neighbor, dst)).unwrap_or(false)
    }

    fn is_down(&self, node: NodeId) -> bool {
        self.agents.get(&node).map(|a| !a.is_alive()).unwrap_or(false)
    }
}
