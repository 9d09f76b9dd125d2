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

//! Native methods of `org.contentauth.c2pa.Builder`.

use std::ptr;

use jni::{
    objects::{JByteArray, JClass, JObject, JString},
    sys::{jbyteArray, jint, jlong, jobject},
    JNIEnv,
};

use super::{from_handle, initialized, require, to_handle};
use crate::{
    bridge::{
        bindings,
        exception::{native_failure, run_jni_safe, Error},
        marshal,
    },
    c2pa_builder_add_action, c2pa_builder_add_ingredient_from_stream, c2pa_builder_add_resource,
    c2pa_builder_data_hashed_placeholder, c2pa_builder_free, c2pa_builder_from_archive,
    c2pa_builder_from_json, c2pa_builder_set_intent, c2pa_builder_set_no_embed,
    c2pa_builder_set_remote_url, c2pa_builder_sign, c2pa_builder_sign_data_hashed_embeddable,
    c2pa_builder_to_archive, C2paBuilder, C2paBuilderIntent, C2paDigitalSourceType, C2paSigner,
    C2paStream,
};

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_nativeFromJson<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    manifest_json: JString<'local>,
) -> jlong {
    run_jni_safe(&mut env, 0, |env| {
        let manifest_json =
            marshal::required_string(env, &manifest_json, "Manifest JSON cannot be null")?;
        let builder = unsafe { c2pa_builder_from_json(manifest_json.as_ptr()) };
        if builder.is_null() {
            return Err(native_failure("Failed to create builder from JSON"));
        }
        Ok(to_handle(builder))
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_nativeFromArchive<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    stream_ptr: jlong,
) -> jlong {
    run_jni_safe(&mut env, 0, |_| {
        let stream = from_handle::<C2paStream>(stream_ptr)
            .ok_or_else(|| Error::DomainArgument("Stream cannot be null".to_string()))?;
        let builder = unsafe { c2pa_builder_from_archive(stream) };
        if builder.is_null() {
            return Err(native_failure("Failed to create builder from archive"));
        }
        Ok(to_handle(builder))
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_free<'local>(
    _env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
) {
    if let Some(builder) = from_handle::<C2paBuilder>(builder_ptr) {
        unsafe { c2pa_builder_free(builder) };
    }
}

/// Sets the builder intent; `digital_source_type` only matters for create.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_setIntentNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    intent: jint,
    digital_source_type: jint,
) -> jint {
    run_jni_safe(&mut env, -1, |_| {
        let builder = initialized::<C2paBuilder>(builder_ptr, "Builder")?;
        let intent = C2paBuilderIntent::try_from(intent)
            .map_err(|err| Error::DomainArgument(err.to_string()))?;
        let digital_source_type = C2paDigitalSourceType::try_from(digital_source_type)
            .map_err(|err| Error::DomainArgument(err.to_string()))?;
        Ok(unsafe { c2pa_builder_set_intent(builder, intent, digital_source_type) })
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_addActionNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    action_json: JString<'local>,
) -> jint {
    run_jni_safe(&mut env, -1, |env| {
        const MESSAGE: &str = "Builder and action JSON cannot be null";
        require(&[builder_ptr != 0], MESSAGE)?;
        let action_json = marshal::required_string(env, &action_json, MESSAGE)?;
        Ok(unsafe {
            c2pa_builder_add_action(builder_ptr as usize as *mut C2paBuilder, action_json.as_ptr())
        })
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_setNoEmbedNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
) {
    run_jni_safe(&mut env, (), |_| {
        let builder = initialized::<C2paBuilder>(builder_ptr, "Builder")?;
        unsafe { c2pa_builder_set_no_embed(builder) };
        Ok(())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_setRemoteUrlNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    remote_url: JString<'local>,
) -> jint {
    run_jni_safe(&mut env, -1, |env| {
        const MESSAGE: &str = "Builder and remote URL cannot be null";
        require(&[builder_ptr != 0], MESSAGE)?;
        let remote_url = marshal::required_string(env, &remote_url, MESSAGE)?;
        Ok(unsafe {
            c2pa_builder_set_remote_url(
                builder_ptr as usize as *mut C2paBuilder,
                remote_url.as_ptr(),
            )
        })
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_addResourceNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    uri: JString<'local>,
    stream_ptr: jlong,
) -> jint {
    run_jni_safe(&mut env, -1, |env| {
        const MESSAGE: &str = "Builder, URI, and stream cannot be null";
        require(&[builder_ptr != 0, stream_ptr != 0], MESSAGE)?;
        let uri = marshal::required_string(env, &uri, MESSAGE)?;
        Ok(unsafe {
            c2pa_builder_add_resource(
                builder_ptr as usize as *mut C2paBuilder,
                uri.as_ptr(),
                stream_ptr as usize as *mut C2paStream,
            )
        })
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_addIngredientFromStreamNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    ingredient_json: JString<'local>,
    format: JString<'local>,
    stream_ptr: jlong,
) -> jint {
    run_jni_safe(&mut env, -1, |env| {
        const MESSAGE: &str = "Builder, ingredient JSON, format, and stream cannot be null";
        require(&[builder_ptr != 0, stream_ptr != 0], MESSAGE)?;
        let ingredient_json = marshal::required_string(env, &ingredient_json, MESSAGE)?;
        let format = marshal::required_string(env, &format, MESSAGE)?;
        Ok(unsafe {
            c2pa_builder_add_ingredient_from_stream(
                builder_ptr as usize as *mut C2paBuilder,
                ingredient_json.as_ptr(),
                format.as_ptr(),
                stream_ptr as usize as *mut C2paStream,
            )
        })
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_toArchiveNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    stream_ptr: jlong,
) -> jint {
    run_jni_safe(&mut env, -1, |_| {
        require(
            &[builder_ptr != 0, stream_ptr != 0],
            "Builder and stream cannot be null",
        )?;
        Ok(unsafe {
            c2pa_builder_to_archive(
                builder_ptr as usize as *mut C2paBuilder,
                stream_ptr as usize as *mut C2paStream,
            )
        })
    })
}

/// Signs the manifest into `dest` and returns a `Builder.SignResult`.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_signNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    format: JString<'local>,
    source_ptr: jlong,
    dest_ptr: jlong,
    signer_ptr: jlong,
) -> jobject {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        const MESSAGE: &str = "Builder, format, streams, and signer cannot be null";
        require(
            &[builder_ptr != 0, source_ptr != 0, dest_ptr != 0, signer_ptr != 0],
            MESSAGE,
        )?;
        let format = marshal::required_string(env, &format, MESSAGE)?;

        let mut manifest_bytes: *const u8 = ptr::null();
        let size = unsafe {
            c2pa_builder_sign(
                builder_ptr as usize as *mut C2paBuilder,
                format.as_ptr(),
                source_ptr as usize as *mut C2paStream,
                dest_ptr as usize as *mut C2paStream,
                signer_ptr as usize as *mut C2paSigner,
                &mut manifest_bytes,
            )
        };
        if size < 0 {
            return Err(native_failure("Failed to sign builder"));
        }

        let manifest_array = if size > 0 && !manifest_bytes.is_null() {
            marshal::manifest_bytes_to_host(env, manifest_bytes, size)?
        } else {
            if !manifest_bytes.is_null() {
                unsafe { crate::c2pa_manifest_bytes_free(manifest_bytes, 0) };
            }
            JByteArray::from(JObject::null())
        };
        Ok(bindings::new_sign_result(env, size, &manifest_array)?.into_raw())
    })
}

/// Returns placeholder manifest bytes sized for `reserved_size` of signature.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_dataHashedPlaceholderNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    reserved_size: jlong,
    format: JString<'local>,
) -> jbyteArray {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        const MESSAGE: &str = "Builder, format cannot be null and reserved size must be positive";
        require(&[builder_ptr != 0, reserved_size > 0], MESSAGE)?;
        let format = marshal::required_string(env, &format, MESSAGE)?;

        let mut manifest_bytes: *const u8 = ptr::null();
        let size = unsafe {
            c2pa_builder_data_hashed_placeholder(
                builder_ptr as usize as *mut C2paBuilder,
                reserved_size as usize,
                format.as_ptr(),
                &mut manifest_bytes,
            )
        };
        if size < 0 || manifest_bytes.is_null() {
            return Err(native_failure("Failed to create data hashed placeholder"));
        }
        Ok(marshal::manifest_bytes_to_host(env, manifest_bytes, size)?.into_raw())
    })
}

/// Signs a data hashed manifest and returns it ready to embed.
///
/// `asset_ptr` may be zero when the data hash already carries its hash.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Builder_signDataHashedEmbeddableNative<
    'local,
>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    builder_ptr: jlong,
    signer_ptr: jlong,
    data_hash: JString<'local>,
    format: JString<'local>,
    asset_ptr: jlong,
) -> jbyteArray {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        const MESSAGE: &str = "Builder, signer, data hash, and format cannot be null";
        require(&[builder_ptr != 0, signer_ptr != 0], MESSAGE)?;
        let data_hash = marshal::required_string(env, &data_hash, MESSAGE)?;
        let format = marshal::required_string(env, &format, MESSAGE)?;
        let asset = from_handle::<C2paStream>(asset_ptr).unwrap_or(ptr::null_mut());

        let mut manifest_bytes: *const u8 = ptr::null();
        let size = unsafe {
            c2pa_builder_sign_data_hashed_embeddable(
                builder_ptr as usize as *mut C2paBuilder,
                signer_ptr as usize as *mut C2paSigner,
                data_hash.as_ptr(),
                format.as_ptr(),
                asset,
                &mut manifest_bytes,
            )
        };
        if size < 0 || manifest_bytes.is_null() {
            return Err(native_failure(
                "Failed to sign data hashed embeddable manifest",
            ));
        }
        Ok(marshal::manifest_bytes_to_host(env, manifest_bytes, size)?.into_raw())
    })
}
