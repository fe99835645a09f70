// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End to end scenarios against the Win32-shaped surface, which shares the process
//! wide runtime. Everything here runs `#[serial]` so that last-error values and the
//! global registry aren't observed mid-way through another scenario.

use std::{sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
          thread,
          time::Duration};

use pretty_assertions::assert_eq;
use r3bl_winthread::win32_api::{self, CREATE_SUSPENDED, ERROR_CALL_NOT_IMPLEMENTED,
                                ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER,
                                EXIT_CODE_PANICKED, INFINITE, STILL_ACTIVE,
                                WAIT_FAILED, WAIT_IO_COMPLETION, WAIT_OBJECT_0,
                                WAIT_TIMEOUT};
use serial_test::serial;

const WAIT_MS: u32 = 10_000;

fn return_parameter(parameter: u32) -> u32 { parameter }

fn exit_with_parameter(parameter: u32) -> u32 {
    win32_api::exit_thread(parameter);
}

fn panic_in_start_routine(_: ()) -> u32 { panic!("start routine failure") }

fn sleep_then_return(milliseconds: u64) -> u32 {
    thread::sleep(Duration::from_millis(milliseconds));
    u32::try_from(milliseconds).unwrap_or(u32::MAX)
}

fn exit_code_of(handle: &r3bl_winthread::Handle) -> u32 {
    let mut exit_code = 0;
    assert!(win32_api::get_exit_code_thread(handle, &mut exit_code));
    exit_code
}

#[test]
#[serial]
fn test_exit_code_from_returning_start_routine() {
    create_wait_and_check_exit_code(return_parameter, 42);
}

#[test]
#[serial]
fn test_exit_code_from_exit_thread() { create_wait_and_check_exit_code(exit_with_parameter, 7); }

fn create_wait_and_check_exit_code(start: fn(u32) -> u32, expected: u32) {
    let mut thread_id = 0;
    let handle = win32_api::create_thread(0, start, expected, 0, Some(&mut thread_id))
        .unwrap();
    assert_ne!(thread_id, 0);
    assert_eq!(win32_api::get_thread_id(&handle), thread_id);

    assert_eq!(win32_api::wait_for_single_object(&handle, WAIT_MS), WAIT_OBJECT_0);
    assert_eq!(exit_code_of(&handle), expected);
    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_panicking_thread_reports_panicked_exit_code() {
    let handle =
        win32_api::create_thread(0, panic_in_start_routine, (), 0, None).unwrap();
    assert_eq!(win32_api::wait_for_single_object(&handle, INFINITE), WAIT_OBJECT_0);
    assert_eq!(exit_code_of(&handle), EXIT_CODE_PANICKED);
    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_suspended_thread_then_resume() {
    static RAN: AtomicBool = AtomicBool::new(false);
    fn mark_ran(parameter: u32) -> u32 {
        RAN.store(true, Ordering::SeqCst);
        parameter
    }
    RAN.store(false, Ordering::SeqCst);

    let handle = win32_api::create_thread(0, mark_ran, 3, CREATE_SUSPENDED, None).unwrap();

    // Looks signaled before it ever ran.
    assert_eq!(win32_api::wait_for_single_object(&handle, 0), WAIT_OBJECT_0);
    assert_eq!(exit_code_of(&handle), STILL_ACTIVE);
    assert!(!RAN.load(Ordering::SeqCst));

    assert_eq!(win32_api::resume_thread(&handle), 1);
    assert_eq!(win32_api::wait_for_single_object(&handle, WAIT_MS), WAIT_OBJECT_0);
    assert!(RAN.load(Ordering::SeqCst));
    assert_eq!(exit_code_of(&handle), 3);
    assert_eq!(win32_api::resume_thread(&handle), 0);
    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_timeout_on_running_thread() {
    let handle = win32_api::create_thread(0, sleep_then_return, 300, 0, None).unwrap();
    assert_eq!(win32_api::wait_for_single_object(&handle, 10), WAIT_TIMEOUT);
    assert_eq!(exit_code_of(&handle), STILL_ACTIVE);
    assert_eq!(win32_api::wait_for_single_object(&handle, WAIT_MS), WAIT_OBJECT_0);
    assert_eq!(exit_code_of(&handle), 300);
    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_wait_for_multiple_objects() {
    let slow = win32_api::create_thread(0, sleep_then_return, 500, 0, None).unwrap();
    let fast = win32_api::create_thread(0, return_parameter, 1, 0, None).unwrap();
    let handles = [slow, fast];

    assert_eq!(
        win32_api::wait_for_multiple_objects(&handles, false, WAIT_MS),
        WAIT_OBJECT_0 + 1
    );
    assert_eq!(
        win32_api::wait_for_multiple_objects(&handles, true, WAIT_MS),
        WAIT_OBJECT_0
    );

    win32_api::set_last_error(0);
    assert_eq!(win32_api::wait_for_multiple_objects(&[], false, 0), WAIT_FAILED);
    assert_eq!(win32_api::get_last_error(), ERROR_INVALID_PARAMETER);

    for handle in handles {
        assert!(win32_api::close_handle(handle));
    }
}

#[test]
#[serial]
fn test_terminate_suspended_thread() {
    let handle =
        win32_api::create_thread(0, return_parameter, 1, CREATE_SUSPENDED, None).unwrap();
    assert!(win32_api::terminate_thread(&handle, 77));
    assert_eq!(exit_code_of(&handle), 77);
    assert_eq!(win32_api::resume_thread(&handle), 0);
    assert_eq!(exit_code_of(&handle), 77);
    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_alertable_sleep_runs_queued_callbacks_on_target() {
    static SEEN_ON: AtomicU32 = AtomicU32::new(0);
    static SEEN_DATA: AtomicUsize = AtomicUsize::new(0);
    fn record(data: usize) {
        SEEN_ON.store(win32_api::get_current_thread_id(), Ordering::SeqCst);
        SEEN_DATA.store(data, Ordering::SeqCst);
    }
    fn sleep_alertable(_: ()) -> u32 { win32_api::sleep_ex(INFINITE, true) }

    let handle =
        win32_api::create_thread(0, sleep_alertable, (), CREATE_SUSPENDED, None).unwrap();
    assert_eq!(win32_api::queue_user_apc(record, &handle, 0xBEEF), 1);
    assert_eq!(win32_api::resume_thread(&handle), 1);

    assert_eq!(win32_api::wait_for_single_object(&handle, WAIT_MS), WAIT_OBJECT_0);
    assert_eq!(exit_code_of(&handle), WAIT_IO_COMPLETION);
    assert_eq!(SEEN_ON.load(Ordering::SeqCst), win32_api::get_thread_id(&handle));
    assert_eq!(SEEN_DATA.load(Ordering::SeqCst), 0xBEEF);

    win32_api::set_last_error(0);
    assert_eq!(win32_api::queue_user_apc(record, &handle, 1), 0);
    assert_eq!(win32_api::get_last_error(), ERROR_INVALID_PARAMETER);
    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_current_thread_inside_created_thread() {
    fn compare_ids(_: ()) -> u32 {
        let Some(me) = win32_api::get_current_thread() else {
            return 0;
        };
        u32::from(win32_api::get_thread_id(&me) == win32_api::get_current_thread_id())
    }

    let handle = win32_api::create_thread(0, compare_ids, (), 0, None).unwrap();
    assert_eq!(win32_api::wait_for_single_object(&handle, WAIT_MS), WAIT_OBJECT_0);
    assert_eq!(exit_code_of(&handle), 1);
    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_unsupported_operations_fail_with_last_error() {
    let handle =
        win32_api::create_thread(0, return_parameter, 0, CREATE_SUSPENDED, None).unwrap();

    win32_api::set_last_error(0);
    assert_eq!(win32_api::suspend_thread(&handle), u32::MAX);
    assert_eq!(win32_api::get_last_error(), ERROR_CALL_NOT_IMPLEMENTED);

    win32_api::set_last_error(0);
    assert!(win32_api::create_remote_thread(1, 0, |_| 0, 0, 0, None).is_none());
    assert_eq!(win32_api::get_last_error(), ERROR_CALL_NOT_IMPLEMENTED);

    assert!(win32_api::close_handle(handle));
}

#[test]
#[serial]
fn test_closed_handle_is_invalid() {
    let handle = win32_api::create_thread(0, return_parameter, 0, 0, None).unwrap();
    assert_eq!(win32_api::wait_for_single_object(&handle, WAIT_MS), WAIT_OBJECT_0);
    assert!(win32_api::close_handle(handle.clone()));

    win32_api::set_last_error(0);
    assert!(!win32_api::close_handle(handle.clone()));
    assert_eq!(win32_api::get_last_error(), ERROR_INVALID_HANDLE);

    let mut exit_code = 0;
    assert!(!win32_api::get_exit_code_thread(&handle, &mut exit_code));
    assert_eq!(win32_api::get_thread_id(&handle), 0);
    assert_eq!(win32_api::resume_thread(&handle), u32::MAX);
    assert!(!win32_api::terminate_thread(&handle, 1));
    assert_eq!(win32_api::wait_for_single_object(&handle, 0), WAIT_FAILED);
}

#[test]
#[serial]
fn test_switch_to_thread_and_dump() {
    assert!(win32_api::switch_to_thread());
    let handle = win32_api::create_thread(0, sleep_then_return, 50, 0, None).unwrap();
    win32_api::dump_thread_handles();
    assert_eq!(win32_api::wait_for_single_object(&handle, WAIT_MS), WAIT_OBJECT_0);
    assert!(win32_api::close_handle(handle));
}
