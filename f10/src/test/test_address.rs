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

use crate::fabric::{Address, AddressCodec, SubtreeTag, TopologyError, ADDRESS_TAG};
use std::net::Ipv4Addr;

#[test]
fn test_pack_fields() {
    let addr = Address::new(5, 1, 3).unwrap();
    assert_eq!(addr.0, 10 << 24 | 5 << 10 | 1 << 8 | 3);
    assert_eq!(addr.location(), 5);
    assert_eq!(addr.level(), 1);
    assert_eq!(addr.index(), 3);
    assert_eq!(addr.tag(), ADDRESS_TAG);
    assert_eq!(addr.to_string(), "10.0.21.3");

    let max = Address::new(0x3fff, 3, 0xff).unwrap();
    assert_eq!(max.location(), 0x3fff);
    assert_eq!(max.level(), 3);
    assert_eq!(max.index(), 0xff);
    assert_eq!(max.tag(), ADDRESS_TAG);
}

#[test]
fn test_field_overflow() {
    assert_eq!(Address::new(0x4000, 0, 0), Err(TopologyError::FieldOverflow("location", 0x4000)));
    assert_eq!(Address::new(0, 4, 0), Err(TopologyError::FieldOverflow("level", 4)));
    assert_eq!(Address::new(0, 0, 256), Err(TopologyError::FieldOverflow("index", 256)));
}

#[test]
fn test_ipv4() {
    let addr = Address::new(5, 1, 3).unwrap();
    let ip: Ipv4Addr = addr.into();
    assert_eq!(ip, Ipv4Addr::new(10, 0, 21, 3));
    assert_eq!(Address::from(Ipv4Addr::new(10, 0, 21, 3)), addr);
}

#[test]
fn test_codec_bits() {
    assert_eq!(AddressCodec::new(2).bits(), 0);
    assert_eq!(AddressCodec::new(4).bits(), 1);
    assert_eq!(AddressCodec::new(6).bits(), 2);
    assert_eq!(AddressCodec::new(8).bits(), 2);
    assert_eq!(AddressCodec::new(10).bits(), 3);
    assert_eq!(AddressCodec::new(16).bits(), 3);
    assert_eq!(AddressCodec::new(18).bits(), 4);
}

#[test]
fn test_prefix() {
    let codec = AddressCodec::new(8);
    let a = Address::new(0b1011, 0, 0).unwrap();
    let b = Address::new(0b1001, 0, 1).unwrap();
    let c = Address::new(0b0111, 0, 1).unwrap();

    assert_eq!(codec.prefix(a, 0), 0b1011);
    assert_eq!(codec.prefix(a, 1), 0b10);
    assert_eq!(codec.prefix(a, 2), 0);
    assert_eq!(codec.shift(0b1011, 1), 0b10);

    assert!(!codec.same_subtree(a, b, 0));
    assert!(codec.same_subtree(a, b, 1));
    assert!(!codec.same_subtree(a, c, 1));
    assert!(codec.same_subtree(a, c, 2));
}

#[test]
fn test_subtree_tag() {
    assert_eq!(SubtreeTag::of_prefix(0), SubtreeTag::A);
    assert_eq!(SubtreeTag::of_prefix(3), SubtreeTag::B);
    assert_eq!(SubtreeTag::of_port(4), SubtreeTag::A);
    assert_eq!(SubtreeTag::of_port(1), SubtreeTag::B);
    assert_eq!(SubtreeTag::A.other(), SubtreeTag::B);
    assert_eq!(SubtreeTag::B.other(), SubtreeTag::A);

    let codec = AddressCodec::new(4);
    // level-1 switch of group 3
    let addr = Address::new(3 << 1, 1, 0).unwrap();
    assert_eq!(codec.subtree_tag(addr), SubtreeTag::B);
    // level-1 switch of group 2
    let addr = Address::new(2 << 1, 1, 1).unwrap();
    assert_eq!(codec.subtree_tag(addr), SubtreeTag::A);
}
