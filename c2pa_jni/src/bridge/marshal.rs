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

//! Conversions between Java strings and byte arrays and their native forms.

use std::{
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr,
};

use jni::{
    objects::{JByteArray, JObject, JString},
    sys::jsize,
    JNIEnv,
};

use super::exception::{Error, Result};
use crate::{c2pa_manifest_bytes_free, c2pa_string_free};

/// Copies a Java string into a C string. A null Java string gives `None`.
///
/// The JVM's UTF-8 view is released as soon as the copy is made, on every path.
pub fn to_native_string(env: &mut JNIEnv, value: &JString) -> Result<Option<CString>> {
    if value.is_null() {
        return Ok(None);
    }
    let value: String = env.get_string(value)?.into();
    CString::new(value)
        .map(Some)
        .map_err(|_| Error::DomainArgument("String cannot contain NUL characters".to_string()))
}

/// Like [to_native_string] but a null Java string is a domain failure with `message`.
pub fn required_string(env: &mut JNIEnv, value: &JString, message: &str) -> Result<CString> {
    to_native_string(env, value)?.ok_or_else(|| Error::DomainArgument(message.to_string()))
}

/// Pointer for an optional C string, null when absent.
pub fn optional_ptr(value: &Option<CString>) -> *const c_char {
    value.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

/// Moves a string returned by the native library into a Java string.
///
/// Null gives a null Java string. The native string is freed with
/// [c2pa_string_free] whether or not the copy succeeds.
pub fn to_host_string<'local>(env: &mut JNIEnv<'local>, value: *mut c_char) -> Result<JString<'local>> {
    if value.is_null() {
        return Ok(JObject::null().into());
    }
    let value = scopeguard::guard(value, |value| unsafe { c2pa_string_free(value) });
    let text = unsafe { CStr::from_ptr(*value) }.to_string_lossy();
    Ok(env.new_string(text)?)
}

/// Allocates a Java byte array of `size` bytes.
pub fn new_host_byte_array<'local>(env: &mut JNIEnv<'local>, size: i64) -> Result<JByteArray<'local>> {
    if size < 0 {
        return Err(Error::DomainArgument(
            "Array size cannot be negative".to_string(),
        ));
    }
    let size = jsize::try_from(size).map_err(|_| Error::BufferTooLarge {
        requested: size as usize,
    })?;
    Ok(env.new_byte_array(size)?)
}

/// Copies native bytes into a new Java byte array.
pub fn byte_array_from_slice<'local>(env: &mut JNIEnv<'local>, bytes: &[u8]) -> Result<JByteArray<'local>> {
    if bytes.len() > jsize::MAX as usize {
        return Err(Error::BufferTooLarge {
            requested: bytes.len(),
        });
    }
    Ok(env.byte_array_from_slice(bytes)?)
}

/// Copies a Java byte array into native memory.
pub fn from_host_byte_array(env: &mut JNIEnv, array: &JByteArray) -> Result<Vec<u8>> {
    Ok(env.convert_byte_array(array)?)
}

/// Fills `dest` from the start of a Java byte array.
pub fn copy_to_native(env: &mut JNIEnv, array: &JByteArray, dest: &mut [u8]) -> Result<()> {
    // i8 and u8 share size and alignment.
    let dest = unsafe { std::slice::from_raw_parts_mut(dest.as_mut_ptr() as *mut i8, dest.len()) };
    Ok(env.get_byte_array_region(array, 0, dest)?)
}

/// Moves a manifest buffer returned by the native library into a Java byte array.
///
/// The native buffer is released with [c2pa_manifest_bytes_free] on every path.
pub fn manifest_bytes_to_host<'local>(
    env: &mut JNIEnv<'local>,
    bytes: *const u8,
    size: i64,
) -> Result<JByteArray<'local>> {
    let len = usize::try_from(size).map_err(|_| {
        Error::DomainArgument("Array size cannot be negative".to_string())
    })?;
    let bytes = scopeguard::guard(bytes, |bytes| unsafe { c2pa_manifest_bytes_free(bytes, len) });
    if bytes.is_null() {
        return Err(Error::NativeFailure("Manifest bytes are missing".to_string()));
    }
    let slice = unsafe { std::slice::from_raw_parts(*bytes, len) };
    byte_array_from_slice(env, slice)
}

#[cfg(all(test, feature = "invocation"))]
mod tests {
    use super::*;
    use crate::bridge::test_jvm::jvm;

    #[test]
    fn test_string_round_trip() {
        let mut env = jvm().attach_current_thread().unwrap();

        let java = env.new_string("héllo wörld").unwrap();
        let native = to_native_string(&mut env, &java).unwrap().unwrap();
        assert_eq!(native.to_str().unwrap(), "héllo wörld");

        let back = to_host_string(&mut env, native.into_raw()).unwrap();
        let back: String = env.get_string(&back).unwrap().into();
        assert_eq!(back, "héllo wörld");
    }

    #[test]
    fn test_null_strings() {
        let mut env = jvm().attach_current_thread().unwrap();

        let null = JString::from(JObject::null());
        assert!(to_native_string(&mut env, &null).unwrap().is_none());
        assert!(to_host_string(&mut env, ptr::null_mut()).unwrap().is_null());

        let err = required_string(&mut env, &null, "Manifest JSON cannot be null").unwrap_err();
        assert!(matches!(err, Error::DomainArgument(_)));
        assert_eq!(err.to_string(), "Manifest JSON cannot be null");
    }

    #[test]
    fn test_negative_array_size() {
        let mut env = jvm().attach_current_thread().unwrap();
        let err = new_host_byte_array(&mut env, -1).unwrap_err();
        assert_eq!(err.to_string(), "Array size cannot be negative");
        assert!(!env.exception_check().unwrap());
    }

    #[test]
    fn test_byte_arrays() {
        let mut env = jvm().attach_current_thread().unwrap();

        let array = byte_array_from_slice(&mut env, &[1, 2, 3, 250]).unwrap();
        assert_eq!(from_host_byte_array(&mut env, &array).unwrap(), [1, 2, 3, 250]);

        let mut dest = [0u8; 2];
        copy_to_native(&mut env, &array, &mut dest).unwrap();
        assert_eq!(dest, [1, 2]);
    }

    #[test]
    fn test_manifest_bytes_are_moved() {
        let mut env = jvm().attach_current_thread().unwrap();

        let native = vec![7u8; 16].into_boxed_slice();
        let ptr = Box::into_raw(native) as *const u8;
        let array = manifest_bytes_to_host(&mut env, ptr, 16).unwrap();
        assert_eq!(env.get_array_length(&array).unwrap(), 16);
    }
}
