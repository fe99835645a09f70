// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Many threads at once, through an injected runtime so the registry can be inspected
//! without interference from other test binaries.

use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use r3bl_winthread::{CloseOutcome, CreationMode, Handle, ThreadRegistry, ThreadRuntime,
                     ThreadRuntimeConfig, WaitMode, WaitOutcome, close_handle,
                     wait_for_handle, wait_for_handles};
use serial_test::serial;

const THREAD_COUNT: u32 = 48;
const CREATOR_COUNT: u32 = 8;
const THREADS_PER_CREATOR: u32 = 25;
const LONG: Option<Duration> = Some(Duration::from_secs(30));

fn wait_until_empty(registry: &ThreadRegistry) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    while !registry.is_empty() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    registry.is_empty()
}

fn runtime_with_registry() -> (Arc<ThreadRuntime>, Arc<ThreadRegistry>) {
    let registry = Arc::new(ThreadRegistry::new());
    let runtime = ThreadRuntime::with_registry(
        ThreadRuntimeConfig::default(),
        Arc::clone(&registry),
    )
    .unwrap();
    (Arc::new(runtime), registry)
}

#[test]
#[serial]
fn test_many_threads_exit_with_distinct_codes() {
    let (runtime, registry) = runtime_with_registry();

    let handles: Vec<Handle> = (0..THREAD_COUNT)
        .map(|index| {
            let worker_rt = Arc::clone(&runtime);
            runtime
                .create_thread(
                    move || {
                        worker_rt.switch_to_thread();
                        worker_rt.exit_thread(index + 1);
                    },
                    0,
                    CreationMode::RunImmediately,
                )
                .unwrap()
        })
        .collect();

    // At most 64 handles per wait.
    assert_eq!(
        wait_for_handles(&handles, WaitMode::All, LONG).unwrap(),
        WaitOutcome::Signaled(0)
    );

    let mut exit_codes: Vec<u32> = handles
        .iter()
        .map(|handle| runtime.get_exit_code_thread(handle).unwrap())
        .collect();
    exit_codes.sort_unstable();
    assert_eq!(exit_codes, (1..=THREAD_COUNT).collect::<Vec<_>>());

    for handle in handles {
        assert_eq!(close_handle(handle).unwrap(), CloseOutcome::Destroyed);
    }
    assert!(registry.is_empty());
}

#[test]
#[serial]
fn test_repeated_create_and_close_leaves_nothing_behind() {
    let (runtime, registry) = runtime_with_registry();

    for round in 0..THREAD_COUNT {
        let mode = if round % 2 == 0 {
            CreationMode::RunImmediately
        } else {
            CreationMode::Suspended
        };
        let handle = runtime.create_thread(move || round, 0, mode).unwrap();
        if mode == CreationMode::Suspended {
            runtime.resume_thread(&handle).unwrap();
        }
        assert_eq!(wait_for_handle(&handle, LONG).unwrap(), WaitOutcome::Signaled(0));
        assert_eq!(runtime.get_exit_code_thread(&handle).unwrap(), round);
        assert_eq!(close_handle(handle).unwrap(), CloseOutcome::Destroyed);
    }
    assert!(registry.is_empty());
}

#[test]
#[serial]
fn test_closing_running_threads_detaches_them() {
    let (runtime, registry) = runtime_with_registry();

    for _ in 0..THREAD_COUNT {
        let handle = runtime
            .create_thread(
                || {
                    std::thread::sleep(Duration::from_millis(20));
                    0
                },
                0,
                CreationMode::RunImmediately,
            )
            .unwrap();
        // The thread may or may not have finished by now.
        let outcome = close_handle(handle).unwrap();
        assert!(matches!(outcome, CloseOutcome::Detached | CloseOutcome::Destroyed));
    }

    assert!(wait_until_empty(&registry));
}

#[test]
#[serial]
fn test_concurrent_creators_race_create_exit_and_close() {
    let (runtime, registry) = runtime_with_registry();

    let creators: Vec<_> = (0..CREATOR_COUNT)
        .map(|creator| {
            let runtime = Arc::clone(&runtime);
            std::thread::spawn(move || {
                let mut observed = vec![];
                for index in 0..THREADS_PER_CREATOR {
                    let exit_code = creator * 1_000 + index + 1;
                    let worker_rt = Arc::clone(&runtime);
                    let handle = runtime
                        .create_thread(
                            move || worker_rt.exit_thread(exit_code),
                            0,
                            CreationMode::RunImmediately,
                        )
                        .unwrap();

                    if index % 2 == 0 {
                        // Closed right away, racing the thread's own exit.
                        let outcome = close_handle(handle).unwrap();
                        assert!(matches!(
                            outcome,
                            CloseOutcome::Detached | CloseOutcome::Destroyed
                        ));
                    } else {
                        assert_eq!(
                            wait_for_handle(&handle, LONG).unwrap(),
                            WaitOutcome::Signaled(0)
                        );
                        let actual = runtime.get_exit_code_thread(&handle).unwrap();
                        observed.push((exit_code, actual));
                        assert_eq!(close_handle(handle).unwrap(), CloseOutcome::Destroyed);
                    }
                }
                observed
            })
        })
        .collect();

    let mut observed_count = 0;
    for creator in creators {
        for (expected, actual) in creator.join().unwrap() {
            assert_eq!(actual, expected);
            observed_count += 1;
        }
    }
    assert_eq!(observed_count, CREATOR_COUNT * (THREADS_PER_CREATOR / 2));
    assert!(wait_until_empty(&registry));
}
