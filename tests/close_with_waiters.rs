//! §8 scenario 3: closing a channel while coroutines are parked on it wakes
//! every one of them with `NO_CHANNEL` rather than leaving them stuck
//! forever.

use std::rc::Rc;

use fiberbus::sim::{SharedBus, SimScheduler};
use fiberbus::{Bus, ErrorKind};
use pretty_assertions::assert_eq;

#[test]
fn closing_a_full_channel_wakes_a_parked_sender() {
    let scheduler = Rc::new(SimScheduler::new());
    let bus = SharedBus::new(Bus::new(scheduler.clone()));
    let desc = bus.get().channel_open(1).unwrap();
    bus.get().try_send(desc, 1).unwrap(); // fill the one slot

    let sender_bus = bus.clone();
    scheduler.spawn(move || {
        let result = sender_bus.get().send(desc, 2);
        assert_eq!(result, Err(ErrorKind::NoChannel));
    });

    scheduler.run_until_blocked();
    bus.get().channel_close(desc);
    scheduler.run_until_idle();
}

#[test]
fn closing_an_empty_channel_wakes_a_parked_receiver() {
    let scheduler = Rc::new(SimScheduler::new());
    let bus = SharedBus::new(Bus::new(scheduler.clone()));
    let desc = bus.get().channel_open(4).unwrap();

    let receiver_bus = bus.clone();
    scheduler.spawn(move || {
        let result = receiver_bus.get().recv(desc);
        assert_eq!(result, Err(ErrorKind::NoChannel));
    });

    scheduler.run_until_blocked();
    bus.get().channel_close(desc);
    scheduler.run_until_idle();
}

#[test]
fn closing_a_capacity_zero_channel_wakes_a_parked_sender_without_delivery() {
    let scheduler = Rc::new(SimScheduler::new());
    let bus = SharedBus::new(Bus::new(scheduler.clone()));
    let desc = bus.get().channel_open(0).unwrap();

    let sender_bus = bus.clone();
    scheduler.spawn(move || {
        let result = sender_bus.get().send(desc, 7);
        assert_eq!(result, Err(ErrorKind::NoChannel));
    });

    scheduler.run_until_blocked();
    bus.get().channel_close(desc);
    scheduler.run_until_idle();
}

#[test]
fn operations_on_a_closed_descriptor_report_no_channel() {
    let scheduler = Rc::new(SimScheduler::new());
    let mut bus = Bus::new(scheduler);
    let desc = bus.channel_open(4).unwrap();
    bus.channel_close(desc);

    assert_eq!(bus.try_send(desc, 1), Err(ErrorKind::NoChannel));
    assert_eq!(bus.try_recv(desc), Err(ErrorKind::NoChannel));

    // Closing twice, or closing an out-of-range descriptor, is harmless.
    bus.channel_close(desc);
    bus.channel_close(999);
}
