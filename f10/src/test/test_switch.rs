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

//! Test a single switch agent, handling events directly.

use super::{ab_tree_k4, s};
use crate::fabric::event::EventQueue;
use crate::fabric::{
    DeviceError, Event, Fabric, PushbackMsg, PushbackStats, RoutingPolicy, SubtreeTag,
};

fn pushback(from: usize, to: usize, id: u64) -> Event {
    Event::Pushback {
        from: s(from),
        to: s(to),
        msg: PushbackMsg { id, failed_prefix: 0, failed_level: 1, tag: Some(SubtreeTag::A) },
    }
}

#[test]
fn test_originate_pushback() {
    let fabric = Fabric::new(ab_tree_k4(), RoutingPolicy::AbTreeFailover, 0);
    let mut agent = fabric.agent(s(16)).unwrap().clone();
    let mut queue = EventQueue::new();

    agent.handle_event(Event::SwitchDown { to: s(16), failed: s(8), pushback_id: 42 }, &mut queue).unwrap();

    assert!(agent.known_dead().contains(&s(8)));
    assert!(agent.seen_ids().contains(&42));
    assert!(agent.records().is_empty());
    assert_eq!(
        agent.stats(),
        &PushbackStats { received: 0, duplicates: 0, forwarded: 3, installed: 0, originated: 1 }
    );
    // forwarded to all other level-1 neighbors, in the order of the ports
    let msg = PushbackMsg { id: 42, failed_prefix: 0, failed_level: 1, tag: Some(SubtreeTag::A) };
    assert_eq!(
        queue.into_iter().collect::<Vec<_>>(),
        vec![
            Event::Pushback { from: s(16), to: s(14), msg: msg.clone() },
            Event::Pushback { from: s(16), to: s(12), msg: msg.clone() },
            Event::Pushback { from: s(16), to: s(10), msg },
        ]
    );
}

#[test]
fn test_upper_failure_does_not_originate() {
    let fabric = Fabric::new(ab_tree_k4(), RoutingPolicy::AbTreeFailover, 0);
    let mut agent = fabric.agent(s(0)).unwrap().clone();
    let mut queue = EventQueue::new();

    agent.handle_event(Event::SwitchDown { to: s(0), failed: s(8), pushback_id: 42 }, &mut queue).unwrap();
    assert!(agent.known_dead().contains(&s(8)));
    assert!(agent.seen_ids().is_empty());
    assert!(queue.is_empty());
    assert_eq!(agent.stats(), &PushbackStats::default());
}

#[test]
fn test_forward_same_type() {
    let fabric = Fabric::new(ab_tree_k4(), RoutingPolicy::AbTreeFailover, 0);
    let mut agent = fabric.agent(s(12)).unwrap().clone();
    let mut queue = EventQueue::new();

    agent.handle_event(pushback(16, 12, 7), &mut queue).unwrap();
    assert!(agent.records().is_empty());
    assert_eq!(queue.len(), 2);
    assert!(queue.iter().all(|e| e.is_pushback()));
    let mut recipients: Vec<_> = queue.iter().map(|e| e.recipient()).collect();
    recipients.sort();
    assert_eq!(recipients, vec![s(4), s(5)]);
    assert_eq!(agent.stats().received, 1);
    assert_eq!(agent.stats().forwarded, 2);
}

#[test]
fn test_install_other_type() {
    let fabric = Fabric::new(ab_tree_k4(), RoutingPolicy::AbTreeFailover, 0);
    let mut agent = fabric.agent(s(10)).unwrap().clone();
    let mut queue = EventQueue::new();

    agent.handle_event(pushback(16, 10, 7), &mut queue).unwrap();
    assert!(queue.is_empty());
    let record = agent.record(1, 0).unwrap();
    assert_eq!(record.from, s(16));
    assert_eq!(record.failed_level, 1);
    assert_eq!(record.tag, Some(SubtreeTag::A));
    assert_eq!(agent.stats().installed, 1);

    // a newer record for the same prefix replaces the old one
    agent.handle_event(pushback(18, 10, 8), &mut queue).unwrap();
    assert!(queue.is_empty());
    assert_eq!(agent.records().len(), 1);
    assert_eq!(agent.record(1, 0).map(|r| r.from), Some(s(18)));
    assert_eq!(agent.stats().installed, 2);
}

#[test]
fn test_replay_is_idempotent() {
    let fabric = Fabric::new(ab_tree_k4(), RoutingPolicy::AbTreeFailover, 0);
    for (from, to) in vec![(16, 12), (16, 10), (12, 4)] {
        let mut agent = fabric.agent(s(to)).unwrap().clone();
        let mut queue = EventQueue::new();
        agent.handle_event(pushback(from, to, 99), &mut queue).unwrap();
        queue.clear();

        let seen = agent.seen_ids().clone();
        let records = agent.records().clone();
        let stats = *agent.stats();
        agent.handle_event(pushback(from, to, 99), &mut queue).unwrap();

        assert!(queue.is_empty());
        assert_eq!(agent.seen_ids(), &seen);
        assert_eq!(agent.records(), &records);
        assert_eq!(agent.stats().duplicates, stats.duplicates + 1);
        assert_eq!(agent.stats().forwarded, stats.forwarded);
        assert_eq!(agent.stats().installed, stats.installed);
    }
}

#[test]
fn test_invalid_events() {
    let fabric = Fabric::new(ab_tree_k4(), RoutingPolicy::AbTreeFailover, 0);
    let mut agent = fabric.agent(s(12)).unwrap().clone();
    let mut queue = EventQueue::new();

    assert_eq!(
        agent.handle_event(pushback(16, 13, 1), &mut queue),
        Err(DeviceError::WrongRecipient(s(13)))
    );
    assert_eq!(
        agent.handle_event(Event::SwitchDown { to: s(0), failed: s(8), pushback_id: 1 }, &mut queue),
        Err(DeviceError::WrongRecipient(s(0)))
    );
    assert_eq!(
        agent.handle_event(pushback(0, 12, 1), &mut queue),
        Err(DeviceError::NotANeighbor(s(0)))
    );
    assert!(queue.is_empty());
    assert!(agent.seen_ids().is_empty());
}
