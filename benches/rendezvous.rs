// benches/rendezvous.rs

use std::thread;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use sequent::alt::{Alternative, Guard, TimeoutGuard};
use sequent::channel;
use sequent::store::Buffer;

const ITEMS: u64 = 10_000;

fn bench_one2one_rendezvous(c: &mut Criterion) {
  let mut group = c.benchmark_group("one2one_rendezvous");
  group.throughput(Throughput::Elements(ITEMS));
  group.bench_function("write_read_pair", |b| {
    b.iter(|| {
      let (tx, rx) = channel::one2one();
      let writer = thread::spawn(move || {
        for i in 0..ITEMS {
          tx.write(i).unwrap();
        }
      });
      for i in 0..ITEMS {
        assert_eq!(rx.read().unwrap(), i);
      }
      writer.join().unwrap();
    })
  });
  group.finish();
}

fn bench_buffered_throughput(c: &mut Criterion) {
  let mut group = c.benchmark_group("buffered_one2one");
  group.throughput(Throughput::Elements(ITEMS));
  for capacity in [1usize, 16, 256] {
    group.bench_function(format!("capacity_{}", capacity), |b| {
      b.iter(|| {
        let (tx, rx) = channel::buffered_one2one(&Buffer::new(capacity));
        let writer = thread::spawn(move || {
          for i in 0..ITEMS {
            tx.write(i).unwrap();
          }
        });
        for _ in 0..ITEMS {
          rx.read().unwrap();
        }
        writer.join().unwrap();
      })
    });
  }
  group.finish();
}

fn bench_alt_turnaround(c: &mut Criterion) {
  let mut group = c.benchmark_group("alternative");
  group.bench_function("pri_select_ready", |b| {
    let (tx, rx) = channel::buffered_one2one(&Buffer::new(1));
    let timeout = TimeoutGuard::after(Duration::from_secs(3600));
    b.iter(|| {
      tx.write(1).unwrap();
      let guards: Vec<&dyn Guard> = vec![&rx, &timeout];
      let mut alt = Alternative::new(guards);
      assert_eq!(alt.pri_select(), 0);
      rx.read().unwrap();
    })
  });
  group.finish();
}

criterion_group!(
  benches,
  bench_one2one_rendezvous,
  bench_buffered_throughput,
  bench_alt_turnaround
);
criterion_main!(benches);
