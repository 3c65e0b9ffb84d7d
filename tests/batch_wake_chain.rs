//! §8 scenario 4: draining a full channel one word at a time wakes exactly
//! one parked sender per drain, in the order they parked — not a thundering
//! herd, and not reshuffled by scheduler interleaving. Also covers the
//! vectorised primitives.

use std::cell::RefCell;
use std::rc::Rc;

use fiberbus::sim::{SharedBus, SimScheduler};
use fiberbus::Bus;
use pretty_assertions::assert_eq;

#[test]
fn blocked_senders_are_woken_in_fifo_order_one_per_drain() {
    let scheduler = Rc::new(SimScheduler::new());
    let bus = SharedBus::new(Bus::new(scheduler.clone()));
    let desc = bus.get().channel_open(1).unwrap();
    bus.get().try_send(desc, 0).unwrap(); // fill the only slot

    let order = Rc::new(RefCell::new(Vec::new()));
    for i in 1..=3u64 {
        let sender_bus = bus.clone();
        let sender_order = order.clone();
        scheduler.spawn(move || {
            sender_bus.get().send(desc, i).unwrap();
            sender_order.borrow_mut().push(i);
        });
    }

    scheduler.run_until_blocked();
    assert!(order.borrow().is_empty());

    assert_eq!(bus.get().try_recv(desc), Ok(0));
    scheduler.run_until_blocked();
    assert_eq!(*order.borrow(), vec![1]);

    assert_eq!(bus.get().try_recv(desc), Ok(1));
    scheduler.run_until_blocked();
    assert_eq!(*order.borrow(), vec![1, 2]);

    assert_eq!(bus.get().try_recv(desc), Ok(2));
    scheduler.run_until_blocked();
    assert_eq!(*order.borrow(), vec![1, 2, 3]);

    assert_eq!(bus.get().try_recv(desc), Ok(3));
}

#[test]
fn vectorised_send_and_recv_move_several_words_per_call() {
    let scheduler = Rc::new(SimScheduler::new());
    let mut bus = Bus::new(scheduler);
    let desc = bus.channel_open(4).unwrap();

    let n = bus.try_send_v(desc, &[10, 20, 30]).unwrap();
    assert_eq!(n, 3);

    let mut out = [0u64; 4];
    let n = bus.try_recv_v(desc, &mut out).unwrap();
    assert_eq!(n, 3);
    assert_eq!(&out[..3], &[10, 20, 30]);
}
