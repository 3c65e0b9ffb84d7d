//! §8 scenario 5: broadcasting a word to every open channel is
//! all-or-nothing, and the blocking form waits only as long as it takes for
//! the fullest channel to free up.

use std::rc::Rc;

use fiberbus::sim::{SharedBus, SimScheduler};
use fiberbus::{Bus, ErrorKind};
use pretty_assertions::assert_eq;

#[test]
fn try_broadcast_is_all_or_nothing_across_every_channel() {
    let scheduler = Rc::new(SimScheduler::new());
    let mut bus = Bus::new(scheduler);
    let a = bus.channel_open(1).unwrap();
    let b = bus.channel_open(1).unwrap();
    let c = bus.channel_open(1).unwrap();

    bus.try_send(b, 99).unwrap(); // fill just one of the three

    assert_eq!(bus.try_broadcast(1), Err(ErrorKind::WouldBlock));
    // None of the other channels should have been touched.
    assert_eq!(bus.try_recv(a), Err(ErrorKind::WouldBlock));
    assert_eq!(bus.try_recv(b), Ok(99));
    assert_eq!(bus.try_recv(c), Err(ErrorKind::WouldBlock));

    assert_eq!(bus.try_broadcast(7), Ok(()));
    assert_eq!(bus.try_recv(a), Ok(7));
    assert_eq!(bus.try_recv(b), Ok(7));
    assert_eq!(bus.try_recv(c), Ok(7));
}

#[test]
fn try_broadcast_with_no_open_channels_is_no_channel() {
    let scheduler = Rc::new(SimScheduler::new());
    let mut bus = Bus::new(scheduler);
    assert_eq!(bus.try_broadcast(1), Err(ErrorKind::NoChannel));
}

#[test]
fn blocking_broadcast_waits_for_the_fullest_channel_to_drain() {
    let scheduler = Rc::new(SimScheduler::new());
    let bus = SharedBus::new(Bus::new(scheduler.clone()));
    let a = bus.get().channel_open(1).unwrap();
    let b = bus.get().channel_open(1).unwrap();
    bus.get().try_send(a, 1).unwrap(); // a is full, b is empty

    let broadcaster_bus = bus.clone();
    scheduler.spawn(move || {
        broadcaster_bus.get().broadcast(42).unwrap();
    });

    scheduler.run_until_blocked();
    // The broadcaster is parked waiting for `a` to drain.
    assert_eq!(bus.get().try_recv(a), Ok(1));

    scheduler.run_until_idle();

    assert_eq!(bus.get().try_recv(a), Ok(42));
    assert_eq!(bus.get().try_recv(b), Ok(42));
}

#[test]
fn blocking_broadcast_waits_on_a_capacity_zero_blocker_until_a_receiver_parks() {
    let scheduler = Rc::new(SimScheduler::new());
    let bus = SharedBus::new(Bus::new(scheduler.clone()));
    let rendezvous = bus.get().channel_open(0).unwrap();
    let buffered = bus.get().channel_open(1).unwrap();

    let broadcaster_bus = bus.clone();
    scheduler.spawn(move || {
        broadcaster_bus.get().broadcast(7).unwrap();
    });

    scheduler.run_until_blocked();
    // Nobody is parked to receive on `rendezvous` yet, so that's the
    // broadcaster's only blocker. It must be parked somewhere that an
    // ordinary recv on this channel can't stumble into and panic.
    let receiver_bus = bus.clone();
    scheduler.spawn(move || {
        let word = receiver_bus.get().recv(rendezvous).unwrap();
        assert_eq!(word, 7);
    });

    scheduler.run_until_idle();

    assert_eq!(bus.get().try_recv(buffered), Ok(7));
}
