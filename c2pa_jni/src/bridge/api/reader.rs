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

//! Native methods of `org.contentauth.c2pa.Reader`.

use std::ptr;

use jni::{
    objects::{JByteArray, JClass, JObject, JString},
    sys::{jboolean, jlong, jstring, JNI_FALSE, JNI_TRUE},
    JNIEnv,
};

use super::{from_handle, initialized, require, to_handle};
use crate::{
    bridge::{
        exception::{native_failure, run_jni_safe, Error},
        marshal,
    },
    c2pa_reader_detailed_json, c2pa_reader_free, c2pa_reader_from_manifest_data_and_stream,
    c2pa_reader_from_stream, c2pa_reader_is_embedded, c2pa_reader_json, c2pa_reader_remote_url,
    c2pa_reader_resource_to_stream, C2paReader,
};

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_fromStreamNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    format: JString<'local>,
    stream_ptr: jlong,
) -> jlong {
    run_jni_safe(&mut env, 0, |env| {
        const MESSAGE: &str = "Format and stream cannot be null";
        let stream = from_handle(stream_ptr)
            .ok_or_else(|| Error::DomainArgument(MESSAGE.to_string()))?;
        let format = marshal::required_string(env, &format, MESSAGE)?;

        let reader = unsafe { c2pa_reader_from_stream(format.as_ptr(), stream) };
        if reader.is_null() {
            return Err(native_failure("Failed to create reader from stream"));
        }
        Ok(to_handle(reader))
    })
}

/// Reads a detached manifest store against the asset in `stream`.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_fromManifestDataAndStreamNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    format: JString<'local>,
    stream_ptr: jlong,
    manifest_data: JByteArray<'local>,
) -> jlong {
    run_jni_safe(&mut env, 0, |env| {
        const MESSAGE: &str = "Format, stream, and manifest data cannot be null";
        require(&[stream_ptr != 0, !manifest_data.is_null()], MESSAGE)?;
        let format = marshal::required_string(env, &format, MESSAGE)?;
        let manifest_data = marshal::from_host_byte_array(env, &manifest_data)?;
        if manifest_data.is_empty() {
            return Err(Error::DomainArgument(
                "Manifest data cannot be empty".to_string(),
            ));
        }

        let reader = unsafe {
            c2pa_reader_from_manifest_data_and_stream(
                format.as_ptr(),
                stream_ptr as usize as *mut _,
                manifest_data.as_ptr(),
                manifest_data.len(),
            )
        };
        if reader.is_null() {
            return Err(native_failure(
                "Failed to create reader from manifest data and stream",
            ));
        }
        Ok(to_handle(reader))
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_free<'local>(
    _env: JNIEnv<'local>,
    _obj: JObject<'local>,
    reader_ptr: jlong,
) {
    if let Some(reader) = from_handle::<C2paReader>(reader_ptr) {
        unsafe { c2pa_reader_free(reader) };
    }
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_toJsonNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    reader_ptr: jlong,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        let reader = initialized::<C2paReader>(reader_ptr, "Reader")?;
        let json = unsafe { c2pa_reader_json(reader) };
        if json.is_null() {
            return Err(native_failure("Failed to generate JSON from reader"));
        }
        Ok(marshal::to_host_string(env, json)?.into_raw())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_toDetailedJsonNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    reader_ptr: jlong,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        let reader = initialized::<C2paReader>(reader_ptr, "Reader")?;
        let json = unsafe { c2pa_reader_detailed_json(reader) };
        if json.is_null() {
            return Err(native_failure(
                "Failed to generate detailed JSON from reader",
            ));
        }
        Ok(marshal::to_host_string(env, json)?.into_raw())
    })
}

/// Returns the remote manifest URL, or null when the manifest was embedded.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_remoteUrlNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    reader_ptr: jlong,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        let reader = initialized::<C2paReader>(reader_ptr, "Reader")?;
        let url = unsafe { c2pa_reader_remote_url(reader) };
        Ok(marshal::to_host_string(env, url)?.into_raw())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_isEmbeddedNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    reader_ptr: jlong,
) -> jboolean {
    run_jni_safe(&mut env, JNI_FALSE, |_| {
        let reader = initialized::<C2paReader>(reader_ptr, "Reader")?;
        Ok(if unsafe { c2pa_reader_is_embedded(reader) } {
            JNI_TRUE
        } else {
            JNI_FALSE
        })
    })
}

/// Writes the resource named by `uri` to the stream.
///
/// The native result is returned unchanged, including negative values.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Reader_resourceToStreamNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    reader_ptr: jlong,
    uri: JString<'local>,
    stream_ptr: jlong,
) -> jlong {
    run_jni_safe(&mut env, -1, |env| {
        const MESSAGE: &str = "Reader, URI, and stream cannot be null";
        require(&[reader_ptr != 0, stream_ptr != 0], MESSAGE)?;
        let uri = marshal::required_string(env, &uri, MESSAGE)?;
        Ok(unsafe {
            c2pa_reader_resource_to_stream(
                reader_ptr as usize as *mut C2paReader,
                uri.as_ptr(),
                stream_ptr as usize as *mut _,
            )
        })
    })
}
