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

//! Test the formatting helpers.

use super::{ab_tree_k4, h, s};
use crate::fabric::printer;
use crate::fabric::{Event, Fabric, Path, PushbackMsg, RoutingError, RoutingPolicy, SubtreeTag};

#[test]
fn test_print_node() {
    let topo = ab_tree_k4();
    assert_eq!(printer::node(&topo, s(8)).unwrap(), "s8 (10.0.1.0)");
    assert_eq!(printer::node(&topo, s(16)).unwrap(), "s16 (10.0.2.0)");
    assert_eq!(printer::node(&topo, s(17)).unwrap(), "s17 (10.0.2.1)");
    assert!(printer::node(&topo, h(&topo, 0)).unwrap().starts_with("h0 (10."));
}

#[test]
fn test_print_path() {
    let topo = ab_tree_k4();
    let path = Path { switches: vec![s(0), s(9), s(1)], reroutes: Vec::new() };
    assert_eq!(printer::path(&topo, &path).unwrap(), "s0 => s9 => s1");
    let path = Path { switches: vec![s(0), s(1000)], reroutes: Vec::new() };
    assert_eq!(printer::path(&topo, &path), Err(RoutingError::UnknownNode(s(1000))));
}

#[test]
fn test_print_event() {
    let topo = ab_tree_k4();
    let down = Event::SwitchDown { to: s(16), failed: s(8), pushback_id: 42 };
    assert_eq!(printer::event(&topo, &down).unwrap(), "s16: s8 is down (pushback id 42)");

    let msg = PushbackMsg { id: 42, failed_prefix: 0, failed_level: 1, tag: Some(SubtreeTag::A) };
    let pushback = Event::Pushback { from: s(16), to: s(12), msg };
    assert_eq!(
        printer::event(&topo, &pushback).unwrap(),
        "s16 -> s12: Pushback 42 prefix 0 at level 1, tag A"
    );

    let msg = PushbackMsg { id: 7, failed_prefix: 3, failed_level: 2, tag: None };
    let pushback = Event::Pushback { from: s(16), to: s(14), msg };
    assert_eq!(
        printer::event(&topo, &pushback).unwrap(),
        "s16 -> s14: Pushback 7 prefix 3 at level 2, tag -"
    );
}

#[test]
fn test_print_pushback_table() {
    let mut fabric = Fabric::new(ab_tree_k4(), RoutingPolicy::AbTreeFailover, 0);
    fabric.fail_switch(s(8)).unwrap();
    let topo = fabric.topology();

    let table = printer::pushback_table(topo, fabric.agent(s(10)).unwrap()).unwrap();
    assert_eq!(table, vec![String::from("level 1 prefix 0: from s16 (tag A)")]);

    let table = printer::pushback_table(topo, fabric.agent(s(4)).unwrap()).unwrap();
    assert_eq!(table, vec![String::from("level 1 prefix 0: from s12 (tag A)")]);

    let table = printer::pushback_table(topo, fabric.agent(s(16)).unwrap()).unwrap();
    assert!(table.is_empty());
}
