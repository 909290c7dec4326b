// Selective wait: policies, guards, barriers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sequent::alt::barrier::alting_barrier;
use sequent::alt::{Alternative, Guard, SkipGuard, TimeoutGuard};
use sequent::channel;
use sequent::store::Buffer;

#[test]
fn timeout_guard_fires_when_channel_is_silent() {
  let (_tx, rx) = channel::one2one::<i32>();
  let timeout = TimeoutGuard::after(Duration::from_millis(100));
  let guards: Vec<&dyn Guard> = vec![&rx, &timeout];
  let mut alt = Alternative::new(guards);

  let started = Instant::now();
  let chosen = alt.select();
  assert_eq!(chosen, 1);
  assert!(started.elapsed() >= Duration::from_millis(100));
}

#[test]
fn pri_select_takes_the_deposited_channel() {
  let (_tx_a, rx_a) = channel::one2one::<i32>();
  let (tx_b, rx_b) = channel::one2one();

  let writer = thread::spawn(move || tx_b.write(42).unwrap());

  let guards: Vec<&dyn Guard> = vec![&rx_a, &rx_b];
  let mut alt = Alternative::new(guards);
  let chosen = alt.pri_select();
  assert_eq!(chosen, 1);
  assert_eq!(rx_b.read().unwrap(), 42);
  writer.join().unwrap();
}

#[test]
fn pri_select_prefers_the_lowest_ready_index() {
  let (tx_a, rx_a) = channel::buffered_one2one(&Buffer::new(8));
  let (tx_b, rx_b) = channel::buffered_one2one(&Buffer::new(8));
  for i in 0..5 {
    tx_a.write(i).unwrap();
    tx_b.write(i).unwrap();
  }

  let guards: Vec<&dyn Guard> = vec![&rx_a, &rx_b];
  let mut alt = Alternative::new(guards);
  for _ in 0..5 {
    let chosen = alt.pri_select();
    assert_eq!(chosen, 0);
    rx_a.read().unwrap();
  }
}

#[test]
fn fair_select_alternates_between_ready_guards() {
  let (tx_a, rx_a) = channel::buffered_one2one(&Buffer::new(4));
  let (tx_b, rx_b) = channel::buffered_one2one(&Buffer::new(4));
  for i in 0..2 {
    tx_a.write(i).unwrap();
    tx_b.write(i).unwrap();
  }

  let guards: Vec<&dyn Guard> = vec![&rx_a, &rx_b];
  let mut alt = Alternative::new(guards);
  let mut chosen = Vec::new();
  for _ in 0..4 {
    let index = alt.fair_select();
    chosen.push(index);
    match index {
      0 => {
        rx_a.read().unwrap();
      }
      1 => {
        rx_b.read().unwrap();
      }
      _ => unreachable!(),
    }
  }
  assert_eq!(chosen, vec![0, 1, 0, 1]);
}

#[test]
fn select_does_not_starve_either_guard() {
  let (tx_a, rx_a) = channel::buffered_one2one(&Buffer::new(512));
  let (tx_b, rx_b) = channel::buffered_one2one(&Buffer::new(512));
  for i in 0..400 {
    tx_a.write(i).unwrap();
    tx_b.write(i).unwrap();
  }

  let guards: Vec<&dyn Guard> = vec![&rx_a, &rx_b];
  let mut alt = Alternative::new(guards);
  let mut counts = [0usize; 2];
  for _ in 0..400 {
    let index = alt.select();
    counts[index] += 1;
    match index {
      0 => {
        rx_a.read().unwrap();
      }
      1 => {
        rx_b.read().unwrap();
      }
      _ => unreachable!(),
    }
  }
  // Uniform rotation: a heavily lopsided split means starvation.
  assert!(counts[0] >= 50, "guard 0 starved: {:?}", counts);
  assert!(counts[1] >= 50, "guard 1 starved: {:?}", counts);
}

#[test]
fn skip_guard_turns_selection_into_a_poll() {
  let (_tx, rx) = channel::one2one::<i32>();
  let skip = SkipGuard::new();
  let guards: Vec<&dyn Guard> = vec![&rx, &skip];
  let mut alt = Alternative::new(guards);
  assert_eq!(alt.pri_select(), 1);
}

#[test]
fn preconditions_mask_ready_guards() {
  let (tx_a, rx_a) = channel::buffered_one2one(&Buffer::new(2));
  let (tx_b, rx_b) = channel::buffered_one2one(&Buffer::new(2));
  tx_a.write(1).unwrap();
  tx_b.write(2).unwrap();

  let guards: Vec<&dyn Guard> = vec![&rx_a, &rx_b];
  let mut alt = Alternative::new(guards);
  // Guard 0 is ready but masked out.
  assert_eq!(alt.pri_select_pre(&[false, true]), 1);
  assert_eq!(rx_b.read().unwrap(), 2);
}

#[test]
fn selection_wakes_on_a_late_writer() {
  let (tx, rx) = channel::one2one();
  let timeout = TimeoutGuard::after(Duration::from_secs(10));

  let writer = thread::spawn(move || {
    thread::sleep(Duration::from_millis(100));
    tx.write(7).unwrap();
  });

  let guards: Vec<&dyn Guard> = vec![&rx, &timeout];
  let mut alt = Alternative::new(guards);
  let started = Instant::now();
  let chosen = alt.select();
  assert_eq!(chosen, 0);
  assert!(started.elapsed() < Duration::from_secs(5));
  assert_eq!(rx.read().unwrap(), 7);
  writer.join().unwrap();
}

#[test]
fn poisoned_channel_guard_reports_ready() {
  let (tx, rx) = channel::one2one::<i32>();
  tx.poison(2);

  let timeout = TimeoutGuard::after(Duration::from_secs(10));
  let guards: Vec<&dyn Guard> = vec![&rx, &timeout];
  let mut alt = Alternative::new(guards);
  assert_eq!(alt.pri_select(), 0);
  assert_eq!(rx.read().unwrap_err().strength, 2);
}

#[test]
fn barrier_keeps_three_parties_in_lockstep() {
  let mut step = alting_barrier(3).into_iter();
  let mut check = alting_barrier(3).into_iter();
  let counter = Arc::new(AtomicUsize::new(0));
  let rounds = 100;

  let mut handles = Vec::new();
  for _ in 0..3 {
    let step = step.next().unwrap();
    let check = check.next().unwrap();
    let counter = Arc::clone(&counter);
    handles.push(thread::spawn(move || {
      for round in 0..rounds {
        counter.fetch_add(1, Ordering::SeqCst);
        step.sync();
        // Between the two barriers every party has bumped the counter for
        // this round and nobody has started the next one.
        assert_eq!(counter.load(Ordering::SeqCst), 3 * (round + 1));
        check.sync();
      }
    }));
  }
  for handle in handles {
    handle.join().unwrap();
  }
}

#[test]
fn barrier_completes_a_selecting_party() {
  let mut ends = alting_barrier(2).into_iter();
  let selecting = ends.next().unwrap();
  let blocking = ends.next().unwrap();

  let other = thread::spawn(move || {
    thread::sleep(Duration::from_millis(50));
    blocking.sync();
  });

  let guards: Vec<&dyn Guard> = vec![&selecting];
  let mut alt = Alternative::new(guards);
  assert_eq!(alt.select(), 0);
  other.join().unwrap();
}

#[test]
fn resigned_party_is_not_waited_for() {
  let mut ends = alting_barrier(2).into_iter();
  let active = ends.next().unwrap();
  let resigning = ends.next().unwrap();

  resigning.resign();
  // With one enrolled party left, sync completes alone.
  active.sync();
  active.sync();

  resigning.enroll();
  let rejoin = thread::spawn(move || resigning.sync());
  thread::sleep(Duration::from_millis(20));
  active.sync();
  rejoin.join().unwrap();
}
