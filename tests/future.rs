use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc
    },
    thread,
    time::{Duration, Instant}
};

use cl_stream::{
    executor::ThreadPool,
    future::{make_ready_future, Future, Promise, SharedFuture}
};
use crossbeam_channel::Sender;

fn pool(n_threads: usize) -> Arc<ThreadPool> {
    Arc::new(ThreadPool::with_threads(n_threads).start().unwrap())
}

#[test]
fn get_returns_written_value() {
    let mut promise = Promise::new();
    let future = promise.get_future();
    assert!(future.is_valid());
    assert!(!future.is_ready());
    assert!(!promise.is_fulfilled());

    promise.set_value(String::from("hello"));
    assert!(promise.is_fulfilled());
    assert!(future.is_ready());
    assert_eq!(future.get(), "hello");
}

#[test]
fn unit_promise() {
    let mut promise = Promise::<()>::new();
    let future = promise.get_future();
    promise.set_value(());
    future.wait();
    assert!(future.is_ready());
}

#[test]
fn emplace_converts() {
    let mut promise = Promise::<String>::new();
    let future = promise.get_future();
    promise.emplace_value("converted");
    assert_eq!(future.get(), "converted");
}

#[test]
fn ready_future() {
    let future = make_ready_future(7u8);
    assert!(future.is_ready());
    assert_eq!(future.get(), 7);
}

#[test]
fn wait_for_times_out_without_value() {
    let mut promise = Promise::<u32>::new();
    let future = promise.get_future();

    let started = Instant::now();
    assert!(!future.wait_for(Duration::from_millis(20)));
    assert!(started.elapsed() >= Duration::from_millis(20));

    promise.set_value(3);
    assert!(future.wait_for(Duration::from_millis(20)));
}

#[test]
fn value_written_from_another_thread() {
    let mut promise = Promise::new();
    let future = promise.get_future();

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        promise.set_value(99u64);
    });

    assert_eq!(future.get(), 99);
    writer.join().unwrap();
}

#[test]
fn default_and_taken_futures_are_invalid() {
    let future = Future::<u32>::default();
    assert!(!future.is_valid());

    let mut future = make_ready_future(1u32);
    let moved = future.take();
    assert!(!future.is_valid());
    assert!(moved.is_valid());
    assert_eq!(moved.get(), 1);

    assert!(!SharedFuture::<u32>::default().is_valid());
    assert!(!Future::<u32>::default().share().is_valid());
}

#[test]
fn next_runs_on_writer_before_set_value_returns() {
    let mut promise = Promise::new();
    let writer = thread::current().id();
    let ran_on_writer = Arc::new(AtomicBool::new(false));

    let flag = ran_on_writer.clone();
    let doubled = promise.get_future().next(move |v: u32| {
        flag.store(thread::current().id() == writer, Ordering::SeqCst);
        v * 2
    });
    assert!(!doubled.is_ready());

    promise.set_value(21);
    assert!(doubled.is_ready());
    assert!(ran_on_writer.load(Ordering::SeqCst));
    assert_eq!(doubled.get(), 42);
}

#[test]
fn next_on_ready_future_runs_immediately() {
    let future = make_ready_future(5i32).next(|v| v + 1);
    assert!(future.is_ready());
    assert_eq!(future.get(), 6);
}

#[test]
fn then_receives_ready_source() {
    let mut promise = Promise::new();
    let length = promise.get_future().then(|source: Future<String>| {
        assert!(source.is_ready());
        source.get().len()
    });

    promise.set_value(String::from("four"));
    assert!(length.is_ready());
    assert_eq!(length.get(), 4);

    let ready = make_ready_future(1u8).then(|source: Future<u8>| source.get() + 1);
    assert!(ready.is_ready());
    assert_eq!(ready.get(), 2);
}

#[test]
fn chained_continuations() {
    let mut promise = Promise::new();
    let result = promise.get_future()
        .next(|v: i32| v + 1)
        .next(|v| v * 10)
        .then(|f: Future<i32>| format!("{}", f.get()));

    promise.set_value(1);
    assert_eq!(result.get(), "20");
}

#[test]
fn next_on_runs_on_executor() {
    let pool = pool(2);
    let caller = thread::current().id();

    let ready = make_ready_future(3u32).next_on(pool.clone(), move |v| {
        (v, thread::current().id() != caller)
    });
    assert_eq!(ready.get(), (3, true));

    let mut promise = Promise::new();
    let pending = promise.get_future().then_on(pool.clone(), move |f: Future<u32>| {
        (f.get(), thread::current().id() != caller)
    });
    promise.set_value(4);
    assert!(pending.wait_for(Duration::from_secs(1)));
    assert_eq!(pending.get(), (4, true));

    pool.shutdown();
}

#[test]
fn shared_future_is_read_by_every_copy() {
    let mut promise = Promise::new();
    let shared = promise.get_future().share();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let copy = shared.clone();
            thread::spawn(move || copy.get())
        })
        .collect();

    promise.set_value(vec![1, 2, 3]);
    for reader in readers {
        assert_eq!(reader.join().unwrap(), vec![1, 2, 3]);
    }
    assert!(shared.is_ready());
    assert_eq!(shared.get(), vec![1, 2, 3]);
}

#[test]
fn await_future() {
    let pool = pool(2);
    let mut promise = Promise::new();
    let future = promise.get_future();

    pool.spawn(move || {
        thread::sleep(Duration::from_millis(10));
        promise.set_value(11u32);
    }).unwrap();

    let value = futures::executor::block_on(async move { future.await + 1 });
    assert_eq!(value, 12);
    pool.shutdown();
}

fn run_chain(pool: Arc<ThreadPool>, remaining: u32, finished: Sender<()>) {
    let mut promise = Promise::new();
    let next_pool = pool.clone();
    let _chained = promise.get_future().then(move |f: Future<u32>| {
        match f.get() {
            0 => finished.send(()).unwrap(),
            left => run_chain(next_pool, left - 1, finished),
        }
    });
    pool.spawn(move || promise.set_value(remaining)).unwrap();
}

#[test]
fn recursive_then_chains_terminate() {
    let pool = pool(4);
    let (tx, rx) = crossbeam_channel::unbounded();

    for _ in 0..50 {
        run_chain(pool.clone(), 20, tx.clone());
    }

    for _ in 0..50 {
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
    pool.shutdown();
}

#[test]
fn concurrent_pairs_resolve() {
    const PAIRS: usize = 2000;
    let pool = pool(4);
    let (tx, rx) = crossbeam_channel::unbounded();

    let started = Instant::now();
    for i in 0..PAIRS {
        let mut promise = Promise::new();
        let future = promise.get_future();
        let tx = tx.clone();

        pool.spawn(move || promise.set_value(i)).unwrap();
        pool.spawn(move || {
            let resolved = future.wait_for(Duration::from_millis(100));
            tx.send(resolved && future.get() == i).unwrap();
        }).unwrap();
    }

    for _ in 0..PAIRS {
        assert!(rx.recv_timeout(Duration::from_millis(200)).unwrap());
    }
    assert!(started.elapsed() < Duration::from_millis(200));
    pool.shutdown();
}

#[test]
#[should_panic(expected = "written twice")]
fn double_set_panics() {
    let mut promise = Promise::new();
    let _future = promise.get_future();
    promise.set_value(1);
    promise.set_value(2);
}

#[test]
#[should_panic(expected = "get_future was called twice")]
fn second_get_future_panics() {
    let mut promise = Promise::<u32>::new();
    let _first = promise.get_future();
    let _second = promise.get_future();
}

#[test]
#[should_panic(expected = "invalid future")]
fn get_on_invalid_future_panics() {
    Future::<u32>::default().get();
}

#[test]
fn handles_cross_threads() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    fn assert_clone<T: Clone>() {}

    assert_send::<Promise<String>>();
    assert_send::<Future<String>>();
    assert_send::<SharedFuture<String>>();
    assert_sync::<SharedFuture<String>>();
    assert_clone::<SharedFuture<String>>();
}
