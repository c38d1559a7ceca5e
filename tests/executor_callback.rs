// tests/executor_callback.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use action_executor::errors::ExecutorError;
use action_executor::{ActionExecutor, DeliveryContext, EventLoop, Priority, Scheduler};
use action_executor_test_utils::builders::ConfigFileBuilder;
use action_executor_test_utils::recording_scheduler::RecordingScheduler;
use action_executor_test_utils::{Observation, Probe, init_tracing, spawn_main_loop, test_pool};

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn execute_returns_before_completion_is_invoked() {
    init_tracing();
    let pool = test_pool(2);

    // The action blocks until the test opens the gate.
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let gate_rx = Arc::new(Mutex::new(gate_rx));
    let sut = ActionExecutor::new(pool, move |x: i32| {
        gate_rx.lock().unwrap().recv().unwrap();
        x * 2
    });

    let completed = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = mpsc::channel();
    let flag = Arc::clone(&completed);
    sut.execute(21, move |out| {
        flag.fetch_add(1, Ordering::SeqCst);
        done_tx.send(out).unwrap();
    })
    .unwrap();

    // We got here while the action is still parked on the gate.
    assert_eq!(completed.load(Ordering::SeqCst), 0);

    gate_tx.send(()).unwrap();
    assert_eq!(done_rx.recv_timeout(WAIT).unwrap(), 42);
}

#[test]
fn action_runs_off_the_calling_thread() {
    init_tracing();
    let pool = test_pool(2);
    let probe = Probe::new();

    let action_probe = probe.clone();
    let sut = ActionExecutor::from_fn(pool.clone(), move || action_probe.record());

    let (done_tx, done_rx) = mpsc::channel();
    sut.execute_unit(move |()| done_tx.send(()).unwrap()).unwrap();
    done_rx.recv_timeout(WAIT).unwrap();

    let caller = Observation::here();
    let seen = probe.observations();
    assert_eq!(seen.len(), 1);
    assert_ne!(seen[0].thread, caller.thread);
    assert_eq!(seen[0].context, Some(pool.id()));
}

#[test]
fn completion_fires_exactly_once_with_the_action_output() {
    init_tracing();
    let pool = test_pool(2);
    let sut = ActionExecutor::new(pool, |request: u32| request + 9);

    let calls = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = mpsc::channel();
    let counter = Arc::clone(&calls);
    sut.execute(1, move |result| {
        counter.fetch_add(1, Ordering::SeqCst);
        done_tx.send(result).unwrap();
    })
    .unwrap();

    assert_eq!(done_rx.recv_timeout(WAIT).unwrap(), 10);

    // Give a duplicate delivery the chance to show up.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(done_rx.try_recv().is_err());
}

#[test]
fn without_delivery_context_completion_runs_on_execution_context() {
    init_tracing();
    let pool = test_pool(2);
    let sut = ActionExecutor::new(pool.clone(), |x: u8| x);

    let (done_tx, done_rx) = mpsc::channel();
    let observer = pool.clone();
    sut.execute(7, move |_| done_tx.send(observer.is_current()).unwrap())
        .unwrap();

    assert!(done_rx.recv_timeout(WAIT).unwrap());
}

#[test]
fn configured_delivery_context_is_observed_from_background_caller() {
    init_tracing();
    let pool = test_pool(2);
    let (main, main_thread) = spawn_main_loop();

    let sut = ActionExecutor::builder(pool, |x: i64| -x)
        .deliver_on(main.clone())
        .build();

    let (done_tx, done_rx) = mpsc::channel();
    let observer = main.clone();
    let background = thread::spawn(move || {
        sut.execute(5, move |out| {
            let here = Observation::here();
            done_tx
                .send((out, observer.is_current(), here.thread_name))
                .unwrap();
        })
        .unwrap();
    });
    background.join().unwrap();

    let (out, on_main, thread_name) = done_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(out, -5);
    assert!(on_main, "completion did not run on the configured context");
    assert_eq!(thread_name.as_deref(), Some("main"));

    main.shutdown();
    main_thread.join().unwrap();
}

#[test]
fn execute_and_deliver_on_main_delivers_on_main_without_configured_context() {
    init_tracing();
    let pool = test_pool(2);
    let (main, main_thread) = spawn_main_loop();

    let sut = ActionExecutor::from_fn(pool, || ());
    let (done_tx, done_rx) = mpsc::channel();

    let caller_main = main.clone();
    let observer = main.clone();
    thread::spawn(move || {
        sut.run_and_deliver_on_main(&caller_main, move || {
            done_tx.send(observer.is_current()).unwrap();
        })
        .unwrap();
    })
    .join()
    .unwrap();

    assert!(done_rx.recv_timeout(WAIT).unwrap());

    main.shutdown();
    main_thread.join().unwrap();
}

#[test]
fn execute_and_deliver_on_main_overrides_configured_context() {
    init_tracing();
    let pool = test_pool(2);
    let (main, main_thread) = spawn_main_loop();
    let serial = EventLoop::spawn("serial-output").unwrap();

    let sut = ActionExecutor::builder(pool, |s: String| s.len())
        .deliver_on(serial.clone())
        .build();

    let (done_tx, done_rx) = mpsc::channel();
    let on_main = main.clone();
    let on_serial = serial.clone();
    sut.execute_and_deliver_on_main(&main, "hello".to_string(), move |len| {
        done_tx
            .send((len, on_main.is_current(), on_serial.is_current()))
            .unwrap();
    })
    .unwrap();

    assert_eq!(done_rx.recv_timeout(WAIT).unwrap(), (5, true, false));

    serial.shutdown();
    main.shutdown();
    main_thread.join().unwrap();
}

#[test]
fn all_completion_forms_deliver_a_result() {
    init_tracing();
    let pool = test_pool(2);
    let (done_tx, done_rx) = mpsc::channel::<&'static str>();

    let tx = done_tx.clone();
    ActionExecutor::from_fn(pool.clone(), || ())
        .run(move || tx.send("void -> void").unwrap())
        .unwrap();

    let tx = done_tx.clone();
    ActionExecutor::from_fn(pool.clone(), || 10)
        .execute_unit(move |_| tx.send("void -> result").unwrap())
        .unwrap();

    let tx = done_tx.clone();
    ActionExecutor::new(pool.clone(), |_: i32| ())
        .execute_notify(1, move || tx.send("request -> void").unwrap())
        .unwrap();

    let tx = done_tx;
    ActionExecutor::new(pool, |_: i32| 10)
        .execute(1, move |_| tx.send("request -> result").unwrap())
        .unwrap();

    let mut seen: Vec<_> = (0..4).map(|_| done_rx.recv_timeout(WAIT).unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(
        seen,
        vec!["request -> result", "request -> void", "void -> result", "void -> void"]
    );
}

#[test]
fn unit_forms_match_the_general_form() {
    init_tracing();
    let pool = test_pool(2);
    let sut = ActionExecutor::from_fn(pool.clone(), || 10);

    let (tx, rx) = mpsc::channel();
    let general = tx.clone();
    sut.execute((), move |out| general.send(("general", out)).unwrap())
        .unwrap();
    sut.execute_unit(move |out| tx.send(("unit", out)).unwrap())
        .unwrap();

    let mut seen: Vec<_> = (0..2).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![("general", 10), ("unit", 10)]);

    let notify = ActionExecutor::new(pool, |_: ()| ());
    let (tx, rx) = mpsc::channel();
    let general = tx.clone();
    notify
        .execute((), move |()| general.send("general").unwrap())
        .unwrap();
    notify.run(move || tx.send("run").unwrap()).unwrap();

    let mut seen: Vec<_> = (0..2).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec!["general", "run"]);
}

#[test]
fn failures_travel_inside_the_output_value() {
    init_tracing();
    let pool = test_pool(1);
    let sut = ActionExecutor::new(pool, |raw: String| raw.parse::<u16>());

    let (tx, rx) = mpsc::channel();
    let ok = tx.clone();
    sut.execute("8080".to_string(), move |res| ok.send(res.is_ok()).unwrap())
        .unwrap();
    sut.execute("not a port".to_string(), move |res| tx.send(res.is_ok()).unwrap())
        .unwrap();

    let mut outcomes: Vec<_> = (0..2).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
    outcomes.sort_unstable();
    assert_eq!(outcomes, vec![false, true]);
}

#[test]
fn priority_is_handed_to_the_scheduler() {
    init_tracing();
    let recorder = Arc::new(RecordingScheduler::new(test_pool(1)));

    let high = ActionExecutor::builder(recorder.clone(), |x: u8| x)
        .priority(Priority::High)
        .build();
    let default = ActionExecutor::new(recorder.clone(), |x: u8| x);
    assert_eq!(high.priority(), Priority::High);
    assert_eq!(default.priority(), Priority::Default);

    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();
    high.execute(1, move |x| tx.send(x).unwrap()).unwrap();
    default.execute(2, move |x| tx2.send(x).unwrap()).unwrap();
    rx.recv_timeout(WAIT).unwrap();
    rx.recv_timeout(WAIT).unwrap();

    assert_eq!(recorder.priorities(), vec![Priority::High, Priority::Default]);
}

#[test]
fn config_section_seeds_default_priority() {
    let cfg = ConfigFileBuilder::new()
        .worker_threads(1)
        .default_priority(Priority::Low)
        .build();

    let pool = test_pool(1);
    let seeded = ActionExecutor::builder(pool.clone(), |x: u8| x)
        .with_config(&cfg.executor)
        .build();
    let overridden = ActionExecutor::builder(pool, |x: u8| x)
        .with_config(&cfg.executor)
        .priority(Priority::High)
        .build();

    assert_eq!(seeded.priority(), Priority::Low);
    assert_eq!(overridden.priority(), Priority::High);
}

#[test]
fn refused_work_returns_error_and_never_completes() {
    init_tracing();
    let pool = test_pool(1);
    let sut = ActionExecutor::new(pool.clone(), |x: u8| x);
    pool.shutdown();

    let (tx, rx) = mpsc::channel();
    let result = sut.execute(1, move |x| tx.send(x).unwrap());

    assert!(matches!(result, Err(ExecutorError::SchedulerUnavailable(_))));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn closed_delivery_context_drops_the_completion() {
    init_tracing();
    let pool = test_pool(1);
    let (main, main_thread) = spawn_main_loop();
    main.shutdown();
    main_thread.join().unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let sut = ActionExecutor::builder(pool.clone(), {
        let ran = Arc::clone(&ran);
        move |x: u8| {
            ran.fetch_add(1, Ordering::SeqCst);
            x
        }
    })
    .deliver_on(main.clone())
    .build();

    let (tx, rx) = mpsc::channel();
    sut.execute(3, move |x| tx.send(x).unwrap()).unwrap();

    // The completion sender is dropped unrun, so the channel disconnects.
    assert!(matches!(
        rx.recv_timeout(WAIT),
        Err(mpsc::RecvTimeoutError::Disconnected)
    ));
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(main.is_closed());
}

#[test]
fn executor_clones_share_configuration() {
    let pool = test_pool(1);
    let (main, main_thread) = spawn_main_loop();

    let sut = ActionExecutor::builder(pool, |x: u8| x)
        .priority(Priority::Low)
        .deliver_on(main.clone())
        .build();
    let copy = sut.clone();

    assert_eq!(copy.priority(), Priority::Low);
    assert_eq!(
        copy.delivery_context().map(|c| c.label().to_string()),
        Some("main".to_string())
    );

    main.shutdown();
    main_thread.join().unwrap();
}
