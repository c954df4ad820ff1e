//! FFI bindings for dwell-rank
//!
//! This module provides C-compatible functions so a host data-processing
//! framework can hand one session at a time to the ranker. All functions use
//! C strings (null-terminated) and return allocated memory that must be freed
//! by the caller using `dwell_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::{rank_session_json, DwellProcessor};
use crate::types::{RankerConfig, SessionViews};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Rank one session JSON document and return the ranking payload JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `dwell_free_string`.
/// - Returns NULL on error; call `dwell_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn dwell_rank_session_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match rank_session_json(json_str) {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Rank one session JSON document using a JSON ranker config.
///
/// `config` may be NULL, in which case the defaults are used.
///
/// # Safety
/// - `json` must be a valid null-terminated C string; `config` must be one or NULL.
/// - Returns a newly allocated string that must be freed with `dwell_free_string`.
/// - Returns NULL on error; call `dwell_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn dwell_rank_session_json_with_config(
    json: *const c_char,
    config: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config.is_null() {
        RankerConfig::default()
    } else {
        let parsed = cstr_to_string(config)
            .ok_or_else(|| "Invalid config string pointer".to_string())
            .and_then(|s| RankerConfig::from_json(&s).map_err(|e| format!("Invalid config: {}", e)));
        match parsed {
            Ok(config) => config,
            Err(msg) => {
                set_last_error(&msg);
                return ptr::null_mut();
            }
        }
    };

    let session = match serde_json::from_str::<SessionViews>(&json_str) {
        Ok(session) => session,
        Err(e) => {
            set_last_error(&format!("Failed to parse session: {}", e));
            return ptr::null_mut();
        }
    };

    let mut processor = DwellProcessor::with_config(config);
    let result = processor
        .rank_views(&session)
        .and_then(|payload| serde_json::to_string(&payload).map_err(Into::into));

    match result {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by dwell-rank functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a dwell-rank function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn dwell_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next dwell-rank call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn dwell_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn dwell_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
