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

//! Module for defining events

use crate::fabric::address::SubtreeTag;
use crate::fabric::types::NodeId;
use std::collections::VecDeque;

/// Pushback notification about a failed switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushbackMsg {
    /// Identifier of the failure event, shared by all copies of the message
    pub id: u64,
    /// Prefix of the failed switch at its own level
    pub failed_prefix: u32,
    /// Level of the failed switch
    pub failed_level: u8,
    /// Subtree tag of the failed prefix, or None if a top-level switch failed
    pub tag: Option<SubtreeTag>,
}

/// Event to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Switch `to` is informed that `failed` went down.
    SwitchDown {
        /// Recipient
        to: NodeId,
        /// Switch that went down
        failed: NodeId,
        /// Identifier of the pushback messages caused by this failure
        pushback_id: u64,
    },
    /// Pushback message from `from` to `to`.
    Pushback {
        /// Sender
        from: NodeId,
        /// Recipient
        to: NodeId,
        /// The message
        msg: PushbackMsg,
    },
}

impl Event {
    /// Returns the switch that should handle the event.
    pub fn recipient(&self) -> NodeId {
        match self {
            Event::SwitchDown { to, .. } => *to,
            Event::Pushback { to, .. } => *to,
        }
    }

    /// Returns true if the event is a pushback message
    pub fn is_pushback(&self) -> bool {
        matches!(self, Event::Pushback { .. })
    }
}

/// Event queue for enqueuing events.
pub(crate) type EventQueue = VecDeque<Event>;
