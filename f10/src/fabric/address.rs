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

//! # Address Codec
//!
//! Every node in the fabric carries a synthetic 32-bit address, which encodes its position in the
//! tree. The top byte is the constant [`ADDRESS_TAG`], the remaining 24 bits are packed as
//!
//! ```text
//!  31      24 23                 10 9   8 7        0
//! +----------+---------------------+-----+----------+
//! |   tag    |      location       | lvl |  index   |
//! +----------+---------------------+-----+----------+
//! ```
//!
//! The [`AddressCodec`] knows the number of bits `b` that distinguish siblings at one tree level.
//! It is the only primitive used to reason about the position of a node in the tree.

use crate::fabric::types::TopologyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Constant high-order byte of every address in the fabric.
pub const ADDRESS_TAG: u32 = 10;

const INDEX_MASK: u32 = 0xff;
const LEVEL_MASK: u32 = 0b11;
const LOCATION_MASK: u32 = 0x3fff;
const LEVEL_SHIFT: u32 = 8;
const LOCATION_SHIFT: u32 = 10;

/// Synthetic network address of a switch or host.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Address(pub u32);

impl Address {
    /// Pack the three fields into an address, tagged with [`ADDRESS_TAG`]. Fails if any field does
    /// not fit into its bit range.
    pub fn new(location: u32, level: u8, index: u32) -> Result<Self, TopologyError> {
        if location > LOCATION_MASK {
            return Err(TopologyError::FieldOverflow("location", location));
        }
        if level as u32 > LEVEL_MASK {
            return Err(TopologyError::FieldOverflow("level", level as u32));
        }
        if index > INDEX_MASK {
            return Err(TopologyError::FieldOverflow("index", index));
        }
        Ok(Self(
            ADDRESS_TAG << 24
                | location << LOCATION_SHIFT
                | (level as u32) << LEVEL_SHIFT
                | index,
        ))
    }

    /// Index of the node inside its group (low 8 bits).
    pub fn index(&self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Tree level of the node (0 is the level facing the hosts).
    pub fn level(&self) -> u8 {
        ((self.0 >> LEVEL_SHIFT) & LEVEL_MASK) as u8
    }

    /// Location bits of the node.
    pub fn location(&self) -> u32 {
        (self.0 >> LOCATION_SHIFT) & LOCATION_MASK
    }

    /// High-order tag byte.
    pub fn tag(&self) -> u32 {
        self.0 >> 24
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Self(u32::from(ip))
    }
}

impl From<Address> for Ipv4Addr {
    fn from(addr: Address) -> Self {
        Ipv4Addr::from(addr.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv4Addr::from(*self))
    }
}

/// Classification of a level-1 branch into one of the two overlapping spanning substructures.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SubtreeTag {
    /// Even prefix, wired in block layout
    A,
    /// Odd prefix, wired in column layout
    B,
}

impl SubtreeTag {
    /// Tag of a prefix, by its parity.
    pub fn of_prefix(prefix: u32) -> Self {
        if prefix % 2 == 0 {
            Self::A
        } else {
            Self::B
        }
    }

    /// Tag of the direction behind a port, by the parity of the port number. At a top-level
    /// switch, the port towards group `m` is `k - m`, which makes this the same as the tag of the
    /// group.
    pub fn of_port(port: u32) -> Self {
        Self::of_prefix(port)
    }

    /// Returns the other tag.
    pub fn other(&self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for SubtreeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Codec for the prefix computations, parametrized by the number of ports per switch.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddressCodec {
    bits: u32,
}

impl AddressCodec {
    /// Create the codec for switches with `k` ports. The number of bits per level is
    /// `ceil(log2(k / 2))`.
    pub fn new(k: usize) -> Self {
        let p = (k / 2) as u32;
        let bits = if p <= 1 { 0 } else { 32 - (p - 1).leading_zeros() };
        Self { bits }
    }

    /// Number of bits distinguishing siblings at one tree level.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Prefix of the address at the given level.
    pub fn prefix(&self, addr: Address, level: u8) -> u32 {
        self.shift(addr.location(), level)
    }

    /// Shift a location (or a prefix) up by `levels` tree levels.
    pub fn shift(&self, location: u32, levels: u8) -> u32 {
        let shift = self.bits * levels as u32;
        if shift >= 32 {
            0
        } else {
            location >> shift
        }
    }

    /// Returns true if both addresses are in the same subtree at the given level.
    pub fn same_subtree(&self, a: Address, b: Address, level: u8) -> bool {
        self.prefix(a, level) == self.prefix(b, level)
    }

    /// Subtree tag of the address, using its own prefix at its own level.
    pub fn subtree_tag(&self, addr: Address) -> SubtreeTag {
        SubtreeTag::of_prefix(self.prefix(addr, addr.level()))
    }
}
