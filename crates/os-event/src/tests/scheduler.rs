use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{FailurePolicy, SchedulerConfig};
use crate::error::EventError;
use crate::handle::{EventContext, EventHandle, Registration};
use crate::mock::MockTimerDriver;
use crate::resource::Lifecycle;
use crate::scheduler::EventScheduler;
use crate::timespec::{Timespec, TimerSpec};

fn scheduler_with(driver: &MockTimerDriver, timeout: Duration) -> EventScheduler {
    let config = SchedulerConfig::builder()
        .readiness_timeout(timeout)
        .failure_policy(FailurePolicy::Report)
        .build();
    EventScheduler::with_config(driver.clone(), config)
}

fn ready_scheduler(driver: &MockTimerDriver) -> (EventScheduler, Arc<EventHandle>) {
    let scheduler = scheduler_with(driver, Duration::from_millis(50));
    let handle = scheduler.create(None).unwrap();
    (scheduler, handle)
}

/// Registration that bumps the counter passed as its context.
fn counting(counter: &Arc<AtomicUsize>) -> Registration {
    Registration::new(
        |ctx| {
            if let Some(counter) = ctx.downcast_ref::<AtomicUsize>() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        },
        Arc::clone(counter) as EventContext,
    )
}

#[test]
fn create_with_registration_starts_event() {
    let driver = MockTimerDriver::new();
    let scheduler = scheduler_with(&driver, Duration::from_millis(50));
    let hits = Arc::new(AtomicUsize::new(0));

    let handle = scheduler.create(Some(counting(&hits))).unwrap();

    assert!(handle.is_triggered());
    assert!(handle.is_registered());
    assert_eq!(
        driver.last_spec(),
        Some(TimerSpec::oneshot(Timespec::new(0, 1_000_000)))
    );

    assert!(driver.fire());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!handle.is_registered());
}

#[test]
fn second_start_keeps_first_registration() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    scheduler.start(&handle, counting(&first)).unwrap();
    scheduler.start(&handle, counting(&second)).unwrap();

    assert_eq!(driver.history().len(), 1);
    assert!(scheduler.trigger_registered_callback());
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

#[test]
fn start_after_stop_registers_again() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    scheduler.start(&handle, counting(&first)).unwrap();
    scheduler.stop(&handle);
    assert!(!handle.is_triggered());
    scheduler.start(&handle, counting(&second)).unwrap();

    assert!(handle.is_triggered());
    assert!(scheduler.trigger_registered_callback());
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_does_not_cancel_pending_oneshot() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let hits = Arc::new(AtomicUsize::new(0));

    scheduler.start(&handle, counting(&hits)).unwrap();
    scheduler.stop(&handle);

    assert!(!driver.current_spec().unwrap().is_disarm());
    assert!(driver.fire());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn oneshot_delay_is_split_into_seconds_and_nanos() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let hits = Arc::new(AtomicUsize::new(0));

    scheduler
        .register_oneshot(&handle, counting(&hits), 1_500_000)
        .unwrap();

    let spec = driver.last_spec().unwrap();
    assert_eq!(spec.value, Timespec::new(1, 500_000_000));
    assert_eq!(spec.interval, Timespec::ZERO);
}

#[test]
fn invalid_delay_leaves_timer_and_handle_unchanged() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let kept = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    scheduler
        .register_oneshot(&handle, counting(&kept), 2_000)
        .unwrap();
    let before = driver.current_spec();
    let programmed = driver.history().len();

    let err = scheduler
        .register_oneshot_after(&handle, counting(&rejected), Timespec::new(0, 1_000_000_000))
        .unwrap_err();

    assert!(matches!(err, EventError::InvalidDelay(_)));
    assert!(!err.is_unrecoverable());
    assert_eq!(driver.current_spec(), before);
    assert_eq!(driver.history().len(), programmed);

    scheduler.trigger_registered_callback();
    assert_eq!(kept.load(Ordering::SeqCst), 1);
    assert_eq!(rejected.load(Ordering::SeqCst), 0);
}

#[test]
fn trigger_delivers_at_most_once() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let hits = Arc::new(AtomicUsize::new(0));

    assert!(!scheduler.trigger_registered_callback());
    scheduler
        .register_oneshot(&handle, counting(&hits), 1_000)
        .unwrap();

    assert!(scheduler.trigger_registered_callback());
    assert!(!scheduler.trigger_registered_callback());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // The timer still expires, but there is nothing left to deliver.
    assert!(driver.fire());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(handle.expirations(), 1);
}

#[test]
fn reregistering_callback_is_not_fired_by_same_expiry() {
    let driver = MockTimerDriver::new();
    let scheduler = Arc::new(scheduler_with(&driver, Duration::from_millis(50)));
    let handle = scheduler.create(None).unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let again = {
        let scheduler = Arc::clone(&scheduler);
        let handle = Arc::clone(&handle);
        let hits = Arc::clone(&hits);
        Registration::new(
            move |ctx| {
                hits.fetch_add(1, Ordering::SeqCst);
                let _ = scheduler.register_oneshot(
                    &handle,
                    Registration::new(|_| {}, ctx),
                    1_000,
                );
            },
            Arc::new(()) as EventContext,
        )
    };
    scheduler.register_oneshot(&handle, again, 1_000).unwrap();

    assert!(driver.fire());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(handle.is_registered());
    assert_eq!(handle.expirations(), 1);
}

#[test]
fn arm_and_disarm_program_poll_schedule() {
    let driver = MockTimerDriver::new();
    let (scheduler, _handle) = ready_scheduler(&driver);

    scheduler.arm().unwrap();
    assert_eq!(
        driver.current_spec(),
        Some(TimerSpec::periodic(
            Timespec::new(0, 1_000_000),
            Timespec::new(0, 294_967_296)
        ))
    );

    assert!(driver.fire());
    assert!(driver.fire());
    assert!(driver.current_spec().unwrap().is_periodic());

    scheduler.disarm().unwrap();
    assert_eq!(driver.current_spec(), Some(TimerSpec::DISARMED));
    assert!(!driver.fire());
}

#[test]
fn arm_times_out_softly_without_timer() {
    let driver = MockTimerDriver::new();
    let scheduler = scheduler_with(&driver, Duration::from_millis(30));
    let started = Instant::now();

    let err = scheduler.arm().unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(30));
    assert!(matches!(
        err,
        EventError::NotReady {
            state: Lifecycle::Uninitialized,
            ..
        }
    ));
    assert!(!err.is_unrecoverable());
    assert!(driver.history().is_empty());
}

#[test]
fn arm_waits_for_concurrent_create() {
    let driver = MockTimerDriver::new();
    let scheduler = Arc::new(scheduler_with(&driver, Duration::from_secs(2)));

    let armer = {
        let scheduler = Arc::clone(&scheduler);
        thread::spawn(move || scheduler.arm())
    };
    thread::sleep(Duration::from_millis(20));
    scheduler.create(None).unwrap();

    armer.join().unwrap().unwrap();
    assert_eq!(driver.current_spec(), Some(TimerSpec::POLL));
}

#[test]
fn set_time_failure_on_arm_is_unrecoverable() {
    let driver = MockTimerDriver::new();
    let (scheduler, _handle) = ready_scheduler(&driver);
    driver.fail_set_time(true);

    let arm = scheduler.arm().unwrap_err();
    let disarm = scheduler.disarm().unwrap_err();

    assert!(matches!(arm, EventError::SetTime(_)));
    assert!(arm.is_unrecoverable());
    assert!(disarm.is_unrecoverable());
}

#[test]
fn set_time_failure_on_oneshot_is_soft() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let hits = Arc::new(AtomicUsize::new(0));
    driver.fail_set_time(true);

    let err = scheduler
        .register_oneshot(&handle, counting(&hits), 1_000)
        .unwrap_err();

    assert!(matches!(err, EventError::OneshotFailed(_)));
    assert!(!err.is_unrecoverable());
    assert_eq!(scheduler.lifecycle(), Lifecycle::Ready);
}

#[test]
fn concurrent_starts_register_once() {
    let driver = MockTimerDriver::new();
    let (scheduler, handle) = ready_scheduler(&driver);
    let scheduler = Arc::new(scheduler);
    let hits = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            let handle = Arc::clone(&handle);
            let hits = Arc::clone(&hits);
            thread::spawn(move || scheduler.start(&handle, counting(&hits)))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap().unwrap();
    }

    assert_eq!(driver.history().len(), 1);
    assert!(scheduler.trigger_registered_callback());
    driver.fire();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn foreign_handle_is_not_reached_by_expiry() {
    let driver = MockTimerDriver::new();
    let (scheduler, _handle) = ready_scheduler(&driver);
    let other_driver = MockTimerDriver::new();
    let (_other, foreign) = ready_scheduler(&other_driver);
    let hits = Arc::new(AtomicUsize::new(0));

    scheduler
        .register_oneshot(&foreign, counting(&hits), 1_000)
        .unwrap();
    assert!(driver.fire());

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(foreign.is_registered());
}
