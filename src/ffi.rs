//! FFI bindings for Lifestyle Insights
//!
//! This module provides C-compatible functions for calling Insights from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `insights_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::ingest::RecordAdapter;
use crate::pipeline::{records_to_insights, InsightsProcessor};
use crate::types::DailyRecord;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Parse and validate a record snapshot
fn load_records(json: &str) -> Result<Vec<DailyRecord>, AnalyticsError> {
    let records = RecordAdapter::parse_auto(json)?;
    RecordAdapter::ensure_valid(&records)?;
    Ok(records)
}

/// Serialize a result into a caller-owned string, or record the error and return NULL
fn respond<T: Serialize>(result: Result<T, AnalyticsError>) -> *mut c_char {
    let encoded = result.and_then(|value| {
        serde_json::to_string(&value).map_err(|e| AnalyticsError::EncodingError(e.to_string()))
    });
    match encoded {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a records JSON array (or NDJSON) and return the report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_analyze_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match records_to_insights(json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Configured Processor API
// ============================================================================

/// Opaque handle to an InsightsProcessor
pub struct InsightsProcessorHandle {
    processor: InsightsProcessor,
}

/// Create a new InsightsProcessor from a configuration JSON object.
///
/// # Safety
/// - `config_json` may be NULL for the default configuration, otherwise it must be
///   a valid null-terminated C string.
/// - Must be freed with `insights_processor_free`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_processor_new(
    config_json: *const c_char,
) -> *mut InsightsProcessorHandle {
    clear_last_error();

    let processor = if config_json.is_null() {
        Ok(InsightsProcessor::new())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => AnalyticsConfig::from_json(&s).and_then(InsightsProcessor::with_config),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match processor {
        Ok(processor) => Box::into_raw(Box::new(InsightsProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an InsightsProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `insights_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn insights_processor_free(processor: *mut InsightsProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Run every analysis with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `insights_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_processor_analyze(
    processor: *const InsightsProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    respond(load_records(&json_str).map(|records| handle.processor.analyze(&records)))
}

/// Compute the daily composition with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `insights_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_processor_composition(
    processor: *const InsightsProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    respond(load_records(&json_str).map(|records| handle.processor.composition(&records)))
}

/// Bin one factor with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `insights_processor_new`.
/// - `json` and `factor_id` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_processor_histogram(
    processor: *const InsightsProcessorHandle,
    json: *const c_char,
    factor_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let factor = match cstr_to_string(factor_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid factor_id string pointer");
            return ptr::null_mut();
        }
    };

    respond(
        load_records(&json_str).and_then(|records| handle.processor.histogram(&records, &factor)),
    )
}

/// Collapse one factor onto a daily series with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `insights_processor_new`.
/// - `json` and `factor_id` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_processor_series(
    processor: *const InsightsProcessorHandle,
    json: *const c_char,
    factor_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let factor = match cstr_to_string(factor_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid factor_id string pointer");
            return ptr::null_mut();
        }
    };

    respond(load_records(&json_str).and_then(|records| handle.processor.series(&records, &factor)))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Insights functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an Insights function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn insights_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Insights function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn insights_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Insights library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn insights_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_records_json() -> CString {
        let records: Vec<serde_json::Value> = (1..=6)
            .map(|day| {
                serde_json::json!({
                    "id": format!("r{day}"),
                    "date": format!("2024-03-{:02}", day),
                    "sleep_hours": 5.0 + day as f64,
                    "sleep_quality": 6,
                    "exercise": day % 2 == 0,
                    "exercise_minutes": 40,
                    "alcohol": false,
                    "substance": false,
                    "meditation": false,
                    "social_hours": 2,
                    "work_hours": 8,
                    "meals": 3,
                    "food_quality": 7,
                    "stress_level": 8 - day,
                    "happiness": 2 + day
                })
            })
            .collect();
        CString::new(serde_json::Value::Array(records).to_string()).unwrap()
    }

    #[test]
    fn test_ffi_analyze_json() {
        let json = sample_records_json();

        unsafe {
            let result = insights_analyze_json(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.starts_with('{'));
            assert!(result_str.contains("correlations"));
            assert!(result_str.contains("sleep_hours"));

            insights_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = insights_processor_new(ptr::null());
            assert!(!processor.is_null());

            let json = sample_records_json();
            let factor = CString::new("sleep_hours").unwrap();

            let report = insights_processor_analyze(processor, json.as_ptr());
            assert!(!report.is_null());
            insights_free_string(report);

            let frames = insights_processor_composition(processor, json.as_ptr());
            assert!(!frames.is_null());
            let frames_str = CStr::from_ptr(frames).to_str().unwrap();
            assert!(frames_str.starts_with('['));
            insights_free_string(frames);

            let hist = insights_processor_histogram(processor, json.as_ptr(), factor.as_ptr());
            assert!(!hist.is_null());
            let hist_value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(hist).to_str().unwrap()).unwrap();
            assert_eq!(hist_value["total"], 6);
            insights_free_string(hist);

            let series = insights_processor_series(processor, json.as_ptr(), factor.as_ptr());
            assert!(!series.is_null());
            insights_free_string(series);

            insights_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_processor_with_config() {
        let config = CString::new(r#"{ "min_samples": 7 }"#).unwrap();
        let json = sample_records_json();

        unsafe {
            let processor = insights_processor_new(config.as_ptr());
            assert!(!processor.is_null());

            let report = insights_processor_analyze(processor, json.as_ptr());
            let report_value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(report).to_str().unwrap()).unwrap();
            assert_eq!(report_value["correlations"].as_array().unwrap().len(), 0);

            insights_free_string(report);
            insights_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = insights_analyze_json(invalid_json.as_ptr());
            assert!(result.is_null());

            let error = insights_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let bad_config = CString::new(r#"{ "min_samples": 0 }"#).unwrap();
            assert!(insights_processor_new(bad_config.as_ptr()).is_null());

            let processor = insights_processor_new(ptr::null());
            let json = sample_records_json();
            let unknown = CString::new("mood").unwrap();
            let hist = insights_processor_histogram(processor, json.as_ptr(), unknown.as_ptr());
            assert!(hist.is_null());
            let error_str = CStr::from_ptr(insights_last_error()).to_str().unwrap();
            assert!(error_str.contains("mood"));
            insights_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = insights_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
