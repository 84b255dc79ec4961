use super::common::*;
use crate::*;
use crossbeam::sync::WaitGroup;
use log::*;
use rstest::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn setter(value: &Arc<AtomicI32>) -> impl FnOnce(i32) + Send + 'static {
    let value = value.clone();
    move |v| value.store(v, Ordering::SeqCst)
}

fn adder(value: &Arc<AtomicI32>) -> impl FnOnce(i32) + Send + 'static {
    let value = value.clone();
    move |v| {
        value.fetch_add(v, Ordering::SeqCst);
    }
}

fn incr(value: &Arc<AtomicI32>) -> impl FnOnce() + Send + 'static {
    let value = value.clone();
    move || {
        value.fetch_add(1, Ordering::SeqCst);
    }
}

#[rstest]
fn test_case_runs_not_default(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    ch.send(1).unwrap();
    let set_default = setter(&value);
    let selected =
        select().add_recv(&ch, setter(&value)).add_default(move || set_default(2)).run();
    assert_eq!(selected, Selected::Case(0));
    assert_eq!(value.load(Ordering::SeqCst), 1);
    assert!(ch.is_empty());
}

#[rstest]
fn test_default_runs(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    let set_default = setter(&value);
    let selected =
        select().add_recv(&ch, setter(&value)).add_default(move || set_default(2)).run();
    assert_eq!(selected, Selected::Default);
    assert_eq!(value.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_default_with_full_or_closed_output(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let full = Channel::<i32>::make();
    full.send(0).unwrap();
    let closed = Channel::<i32>::make();
    closed.close();
    let selected = select()
        .add_send(&full, 1, incr(&value))
        .add_send(&closed, 1, incr(&value))
        .add_timeout(Duration::from_millis(1), incr(&value))
        .add_default(|| {})
        .run();
    assert_eq!(selected, Selected::Default);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(value.load(Ordering::SeqCst), 0);
    assert_eq!(full.len(), 1);
}

#[rstest]
fn test_only_one_case_one_input_channel(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    ch.send(4).unwrap();
    select().add_recv(&ch, adder(&value)).add_recv(&ch, adder(&value)).run();
    assert_eq!(value.load(Ordering::SeqCst), 4);
}

#[rstest]
fn test_only_one_case_two_input_channels(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch1 = Channel::<i32>::make();
    let ch2 = Channel::<i32>::make();
    ch1.send(2).unwrap();
    ch2.send(2).unwrap();
    let selected = select().add_recv(&ch1, adder(&value)).add_recv(&ch2, adder(&value)).run();
    assert_eq!(value.load(Ordering::SeqCst), 2);
    // the losing channel keeps its message
    match selected {
        Selected::Case(0) => assert_eq!(ch2.try_recv(), Ok(2)),
        Selected::Case(1) => assert_eq!(ch1.try_recv(), Ok(2)),
        other => unreachable!("{:?}", other),
    }
}

#[rstest]
fn test_cancelled_loser_leaves_channel(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ready = Channel::<i32>::make();
    let idle = Channel::<i32>::make();
    ready.send(1).unwrap();
    let selected = select().add_recv(&idle, setter(&value)).add_recv(&ready, setter(&value)).run();
    assert_eq!(selected, Selected::Case(1));
    idle.send(9).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(idle.try_recv(), Ok(9));
    assert_eq!(value.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_closed_input_with_data(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    ch.send(1).unwrap();
    ch.close();
    let set_default = setter(&value);
    select().add_recv(&ch, setter(&value)).add_default(move || set_default(2)).run();
    assert_eq!(value.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_closed_drained_input_never_wins(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    ch.close();
    let set_default = setter(&value);
    let selected =
        select().add_recv(&ch, setter(&value)).add_default(move || set_default(2)).run();
    assert_eq!(selected, Selected::Default);

    let set_timer = setter(&value);
    let selected = select()
        .add_recv(&ch, setter(&value))
        .add_timeout(Duration::from_millis(50), move || set_timer(3))
        .run();
    assert_eq!(selected, Selected::Case(1));
    assert_eq!(value.load(Ordering::SeqCst), 3);
}

#[rstest]
fn test_timer_cancelled(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    ch.send(1).unwrap();
    let set_timer = setter(&value);
    let selected = select()
        .add_recv(&ch, setter(&value))
        .add_timeout(Duration::from_millis(500), move || set_timer(2))
        .run();
    assert_eq!(selected, Selected::Case(0));
    thread::sleep(Duration::from_millis(1000));
    assert_eq!(value.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_timer_runs(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    let tx = ch.clone();
    go(move || {
        thread::sleep(Duration::from_millis(2000));
        tx.send(1).expect("send");
    });
    let set_timer = setter(&value);
    let start = Instant::now();
    let selected = select()
        .add_recv(&ch, setter(&value))
        .add_timeout(Duration::from_millis(500), move || set_timer(2))
        .run();
    assert_eq!(selected, Selected::Case(1));
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_millis(2000));
    assert_eq!(value.load(Ordering::SeqCst), 2);
    // the late message is left for someone else
    assert_eq!(ch.recv(), Ok(1));
    assert_eq!(value.load(Ordering::SeqCst), 2);
}

#[rstest]
#[case(1)]
#[case(3)]
fn test_shortest_timer_wins(setup_log: (), #[case] extra: usize) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let mut sel = select();
    for i in 0..extra {
        let _value = value.clone();
        sel = sel.add_timeout(Duration::from_secs(5 + i as u64), move || {
            _value.store(-1, Ordering::SeqCst);
        });
    }
    let set_timer = setter(&value);
    let start = Instant::now();
    let selected = sel.add_timeout(Duration::from_millis(100), move || set_timer(7)).run();
    assert_eq!(selected, Selected::Case(extra));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(value.load(Ordering::SeqCst), 7);
}

#[rstest]
fn test_only_one_case_one_output_channel(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    select().add_send(&ch, 1, incr(&value)).add_send(&ch, 1, incr(&value)).run();
    ch.close();
    let total: i32 = ch.iter().sum();
    assert_eq!(value.load(Ordering::SeqCst), 1);
    assert_eq!(total, 1);
}

#[rstest]
fn test_only_one_case_two_output_channels(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch1 = Channel::<i32>::make();
    let ch2 = Channel::<i32>::make();
    select().add_send(&ch1, 1, incr(&value)).add_send(&ch2, 1, incr(&value)).run();
    ch1.close();
    ch2.close();
    let total: i32 = ch1.iter().sum::<i32>() + ch2.iter().sum::<i32>();
    assert_eq!(value.load(Ordering::SeqCst), 1);
    assert_eq!(total, 1);
}

#[rstest]
fn test_send_waits_for_space(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let ch = Channel::<i32>::make();
    ch.send(1).unwrap();
    let rx = ch.clone();
    go(move || {
        thread::sleep(Duration::from_millis(100));
        rx.recv().expect("recv");
    });
    let selected = select()
        .add_send(&ch, 2, incr(&value))
        .add_timeout(Duration::from_secs(5), || panic!("send never got room"))
        .run();
    assert_eq!(selected, Selected::Case(0));
    assert_eq!(ch.recv(), Ok(2));
    assert_eq!(value.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_mixed_recv_send(setup_log: ()) {
    let _ = setup_log;
    let value = Arc::new(AtomicI32::new(0));
    let input = Channel::<i32>::make();
    let output = Channel::<i32>::make();
    output.send(0).unwrap();
    input.send(5).unwrap();
    // output is full, only the receive can complete
    let selected = select().add_send(&output, 1, incr(&value)).add_recv(&input, adder(&value)).run();
    assert_eq!(selected, Selected::Case(1));
    assert_eq!(value.load(Ordering::SeqCst), 5);
    assert_eq!(output.len(), 1);
    assert_eq!(output.recv(), Ok(0));
    thread::sleep(Duration::from_millis(50));
    assert!(output.is_empty());
}

#[rstest]
fn test_callback_panic_propagates(setup_log: ()) {
    let _ = setup_log;
    let ch = Channel::<i32>::make();
    ch.send(1).unwrap();
    let _ch = ch.clone();
    let res = catch_unwind(AssertUnwindSafe(move || {
        select().add_recv(&_ch, |_| panic!("boom")).run();
    }));
    assert!(res.is_err());
    // nothing left behind, later selects still work
    ch.send(2).unwrap();
    let value = Arc::new(AtomicI32::new(0));
    select().add_recv(&ch, setter(&value)).run();
    assert_eq!(value.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_run_returns_after_callback(setup_log: ()) {
    let _ = setup_log;
    // run() waits for both reports of the winner, so the slow callback is always done
    let ch = Channel::<i32>::make();
    let value = Arc::new(AtomicI32::new(0));
    for i in 1..=20 {
        ch.send(i).unwrap();
        let _value = value.clone();
        let selected = select()
            .add_recv(&ch, move |v| {
                thread::sleep(Duration::from_millis(5));
                _value.store(v, Ordering::SeqCst);
            })
            .add_timeout(Duration::from_secs(5), incr(&value))
            .run();
        assert_eq!(selected, Selected::Case(0));
        assert_eq!(value.load(Ordering::SeqCst), i);
    }
}

#[rstest]
#[case(1, 2, 100)]
#[case(4, 4, 1000)]
#[case(16, 8, 200)]
fn test_exactly_once_under_contention(
    setup_log: (), #[case] capacity: usize, #[case] selector_count: usize, #[case] total: usize,
) {
    let _ = setup_log;
    let ch1 = Channel::<usize>::new(capacity).unwrap();
    let ch2 = Channel::<usize>::new(capacity).unwrap();
    let sum = Arc::new(AtomicUsize::new(0));
    let count = Arc::new(AtomicUsize::new(0));
    let wg = WaitGroup::new();
    for _ in 0..selector_count {
        let (_ch1, _ch2) = (ch1.clone(), ch2.clone());
        let (_sum, _count) = (sum.clone(), count.clone());
        let _wg = wg.clone();
        go(move || {
            loop {
                let (s1, c1, s2, c2) = (_sum.clone(), _count.clone(), _sum.clone(), _count.clone());
                let selected = select()
                    .add_recv(&_ch1, move |v| {
                        s1.fetch_add(v, Ordering::SeqCst);
                        c1.fetch_add(1, Ordering::SeqCst);
                    })
                    .add_recv(&_ch2, move |v| {
                        s2.fetch_add(v, Ordering::SeqCst);
                        c2.fetch_add(1, Ordering::SeqCst);
                    })
                    .add_timeout(Duration::from_millis(200), || {})
                    .run();
                let drained = |ch: &Channel<usize>| ch.is_closed() && ch.is_empty();
                if selected == Selected::Case(2) && drained(&_ch1) && drained(&_ch2) {
                    break;
                }
            }
            drop(_wg);
        });
    }
    for i in 0..total {
        if i % 2 == 0 {
            ch1.send(i).unwrap();
        } else {
            ch2.send(i).unwrap();
        }
    }
    ch1.close();
    ch2.close();
    wg.wait();
    debug!("received {}", count.load(Ordering::SeqCst));
    assert_eq!(count.load(Ordering::SeqCst), total);
    assert_eq!(sum.load(Ordering::SeqCst), total * (total - 1) / 2);
}
