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

//! Static methods of `org.contentauth.c2pa.C2PA`.

use std::ptr;

use jni::{
    objects::{JByteArray, JClass, JString},
    sys::{jbyteArray, jint, jstring},
    JNIEnv,
};

use super::require;
use crate::{
    bridge::{
        exception::{native_failure, run_jni_safe, Error},
        marshal,
    },
    c2pa_ed25519_sign, c2pa_error, c2pa_load_settings, c2pa_signature_free, c2pa_version,
    ED25519_SIGNATURE_LEN,
};
#[cfg(feature = "file_io")]
use crate::{c2pa_read_file, c2pa_read_ingredient_file, c2pa_sign_file, C2paSignerInfo};

/// Returns the library version string.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_C2PA_version<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        let version = unsafe { c2pa_version() };
        Ok(marshal::to_host_string(env, version)?.into_raw())
    })
}

/// Returns the last native error for this thread, or an empty string.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_C2PA_getError<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        let error = unsafe { c2pa_error() };
        Ok(marshal::to_host_string(env, error)?.into_raw())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_C2PA_loadSettingsNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    settings: JString<'local>,
    format: JString<'local>,
) -> jint {
    run_jni_safe(&mut env, -1, |env| {
        let settings = marshal::to_native_string(env, &settings)?;
        let format = marshal::to_native_string(env, &format)?;
        Ok(unsafe {
            c2pa_load_settings(
                marshal::optional_ptr(&settings),
                marshal::optional_ptr(&format),
            )
        })
    })
}

#[cfg(feature = "file_io")]
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_C2PA_readFileNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
    data_dir: JString<'local>,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        let path = marshal::to_native_string(env, &path)?;
        let data_dir = marshal::to_native_string(env, &data_dir)?;
        let json = unsafe {
            c2pa_read_file(marshal::optional_ptr(&path), marshal::optional_ptr(&data_dir))
        };
        if json.is_null() {
            return Err(native_failure("Failed to read file"));
        }
        Ok(marshal::to_host_string(env, json)?.into_raw())
    })
}

#[cfg(feature = "file_io")]
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_C2PA_readIngredientFileNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
    data_dir: JString<'local>,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        let path = marshal::to_native_string(env, &path)?;
        let data_dir = marshal::to_native_string(env, &data_dir)?;
        let json = unsafe {
            c2pa_read_ingredient_file(
                marshal::optional_ptr(&path),
                marshal::optional_ptr(&data_dir),
            )
        };
        if json.is_null() {
            return Err(native_failure("Failed to read ingredient file"));
        }
        Ok(marshal::to_host_string(env, json)?.into_raw())
    })
}

/// Signs `source_path` into `dest_path` with a signer built from PEM strings.
#[cfg(feature = "file_io")]
#[allow(clippy::too_many_arguments)]
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_C2PA_signFileNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    source_path: JString<'local>,
    dest_path: JString<'local>,
    manifest: JString<'local>,
    algorithm: JString<'local>,
    certificate_pem: JString<'local>,
    private_key_pem: JString<'local>,
    tsa_url: JString<'local>,
    data_dir: JString<'local>,
) -> jstring {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        const MESSAGE: &str = "Required parameters cannot be null";
        let source_path = marshal::required_string(env, &source_path, MESSAGE)?;
        let dest_path = marshal::required_string(env, &dest_path, MESSAGE)?;
        let manifest = marshal::required_string(env, &manifest, MESSAGE)?;
        let algorithm = marshal::required_string(env, &algorithm, MESSAGE)?;
        let certificate_pem = marshal::required_string(env, &certificate_pem, MESSAGE)?;
        let private_key_pem = marshal::required_string(env, &private_key_pem, MESSAGE)?;
        let tsa_url = marshal::to_native_string(env, &tsa_url)?;
        let data_dir = marshal::to_native_string(env, &data_dir)?;

        let signer_info = C2paSignerInfo {
            alg: algorithm.as_ptr(),
            sign_cert: certificate_pem.as_ptr(),
            private_key: private_key_pem.as_ptr(),
            ta_url: marshal::optional_ptr(&tsa_url),
        };
        let result = unsafe {
            c2pa_sign_file(
                source_path.as_ptr(),
                dest_path.as_ptr(),
                manifest.as_ptr(),
                &signer_info,
                marshal::optional_ptr(&data_dir),
            )
        };
        if result.is_null() {
            return Err(native_failure("Failed to sign file"));
        }
        Ok(marshal::to_host_string(env, result)?.into_raw())
    })
}

/// Signs `data` with an Ed25519 private key in PEM form; returns 64 bytes.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_C2PA_ed25519SignNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    data: JByteArray<'local>,
    private_key: JString<'local>,
) -> jbyteArray {
    run_jni_safe(&mut env, ptr::null_mut(), |env| {
        require(
            &[!data.is_null(), !private_key.is_null()],
            "Data and private key cannot be null",
        )?;
        if env.get_array_length(&data)? <= 0 {
            return Err(Error::DomainArgument("Data cannot be empty".to_string()));
        }
        let data = marshal::from_host_byte_array(env, &data)?;
        let private_key =
            marshal::required_string(env, &private_key, "Data and private key cannot be null")?;

        let signature =
            unsafe { c2pa_ed25519_sign(data.as_ptr(), data.len(), private_key.as_ptr()) };
        if signature.is_null() {
            return Err(native_failure("Failed to sign data with Ed25519"));
        }
        let signature =
            scopeguard::guard(signature, |signature| unsafe { c2pa_signature_free(signature) });
        let bytes = unsafe { std::slice::from_raw_parts(*signature, ED25519_SIGNATURE_LEN) };
        Ok(marshal::byte_array_from_slice(env, bytes)?.into_raw())
    })
}
