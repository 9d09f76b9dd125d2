// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Helper macros for the native C ABI.
//!
//! Every macro that can leave the calling function early carries `_or_return`
//! in its name so control flow stays visible at the call site. Failures are
//! recorded with `Error::set_last` before returning.

/// Checks a pointer is not null or early-returns the given value.
macro_rules! ptr_or_return {
    ($ptr:expr, $err_val:expr) => {
        if $ptr.is_null() {
            Error::NullParameter(stringify!($ptr).to_string()).set_last();
            return $err_val;
        }
    };
}

/// Returns -1 when the pointer is null.
macro_rules! ptr_or_return_int {
    ($ptr:expr) => {
        ptr_or_return!($ptr, -1)
    };
}

/// Returns null when the pointer is null.
macro_rules! ptr_or_return_null {
    ($ptr:expr) => {
        ptr_or_return!($ptr, std::ptr::null_mut())
    };
}

/// Converts a NUL-terminated C string to a `String` or early-returns the given value.
macro_rules! cstr_or_return {
    ($ptr:expr, $err_val:expr) => {{
        let ptr = $ptr;
        if ptr.is_null() {
            Error::NullParameter(stringify!($ptr).to_string()).set_last();
            return $err_val;
        }
        std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }};
}

macro_rules! cstr_or_return_int {
    ($ptr:expr) => {
        cstr_or_return!($ptr, -1)
    };
}

macro_rules! cstr_or_return_null {
    ($ptr:expr) => {
        cstr_or_return!($ptr, std::ptr::null_mut())
    };
}

/// Converts a possibly null C string to an `Option<String>`.
macro_rules! cstr_option {
    ($ptr:expr) => {{
        let ptr = $ptr;
        if ptr.is_null() {
            None
        } else {
            Some(std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }};
}

/// Unwraps a `c2pa::Result` or records the error and early-returns the given value.
macro_rules! ok_or_return {
    // For results that already carry our Error type.
    (@local $result:expr, $transform:expr, $err_val:expr) => {
        match $result {
            Ok(value) => $transform(value),
            Err(err) => {
                err.set_last();
                return $err_val;
            }
        }
    };
    ($result:expr, $transform:expr, $err_val:expr) => {
        match $result {
            Ok(value) => $transform(value),
            Err(err) => {
                Error::from_c2pa_error(err).set_last();
                return $err_val;
            }
        }
    };
}

macro_rules! ok_or_return_int {
    ($result:expr, $transform:expr) => {
        ok_or_return!($result, $transform, -1)
    };
}

/// Boxes a successful result and hands ownership to the caller as a raw pointer.
macro_rules! return_boxed {
    ($result:expr) => {
        ok_or_return!(
            $result,
            |value| Box::into_raw(Box::new(value)),
            std::ptr::null_mut()
        )
    };
}

/// Borrows the object behind a caller-owned pointer or early-returns the given value.
macro_rules! deref_mut_or_return {
    ($ptr:expr, $err_val:expr) => {{
        ptr_or_return!($ptr, $err_val);
        &mut *$ptr
    }};
}

macro_rules! deref_mut_or_return_int {
    ($ptr:expr) => {
        deref_mut_or_return!($ptr, -1)
    };
}
