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

//! Native methods of `org.contentauth.c2pa.Signer`.

use jni::{
    objects::{JClass, JObject, JString},
    sys::jlong,
    JNIEnv,
};

use super::{from_handle, initialized, to_handle};
use crate::{
    bridge::{
        exception::{native_failure, run_jni_safe, Error},
        marshal,
        signer::{self, JavaSigner, SignerContext},
    },
    c2pa_signer_free, c2pa_signer_from_info, c2pa_signer_reserve_size, C2paSigner,
    C2paSignerInfo,
};

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Signer_nativeFromInfo<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    algorithm: JString<'local>,
    certificate_pem: JString<'local>,
    private_key_pem: JString<'local>,
    tsa_url: JString<'local>,
) -> jlong {
    run_jni_safe(&mut env, 0, |env| {
        if algorithm.is_null() || certificate_pem.is_null() || private_key_pem.is_null() {
            return Err(Error::DomainArgument(
                "Required parameters cannot be null".to_string(),
            ));
        }
        const MESSAGE: &str = "Required signer info fields cannot be null";
        let algorithm = marshal::required_string(env, &algorithm, MESSAGE)?;
        let certificate_pem = marshal::required_string(env, &certificate_pem, MESSAGE)?;
        let private_key_pem = marshal::required_string(env, &private_key_pem, MESSAGE)?;
        let tsa_url = marshal::to_native_string(env, &tsa_url)?;

        let signer_info = C2paSignerInfo {
            alg: algorithm.as_ptr(),
            sign_cert: certificate_pem.as_ptr(),
            private_key: private_key_pem.as_ptr(),
            ta_url: marshal::optional_ptr(&tsa_url),
        };
        let signer = unsafe { c2pa_signer_from_info(&signer_info) };
        if signer.is_null() {
            return Err(native_failure("Failed to create signer from info"));
        }
        Ok(to_handle(signer))
    })
}

/// Creates a signer that hands each payload to `callback.sign(byte[])`.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Signer_nativeFromCallback<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    algorithm: JString<'local>,
    certificate_chain: JString<'local>,
    tsa_url: JString<'local>,
    callback: JObject<'local>,
) -> jlong {
    run_jni_safe(&mut env, 0, |env| {
        const MESSAGE: &str = "Required parameters cannot be null";
        if callback.is_null() {
            return Err(Error::DomainArgument(MESSAGE.to_string()));
        }
        let algorithm = marshal::required_string(env, &algorithm, MESSAGE)?;
        let certificate_chain = marshal::required_string(env, &certificate_chain, MESSAGE)?;
        let tsa_url = marshal::to_native_string(env, &tsa_url)?;

        let alg = signer::parse_algorithm(&algorithm.to_string_lossy())?;
        let host = JavaSigner::new(env, &callback)?;
        let signer = signer::create_callback_signer(
            SignerContext::new(Box::new(host)),
            alg,
            &certificate_chain,
            marshal::optional_ptr(&tsa_url),
        );
        if signer.is_null() {
            return Err(native_failure("Failed to create callback signer"));
        }
        log::debug!("created callback signer ({algorithm:?})");
        Ok(to_handle(signer))
    })
}

#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Signer_reserveSizeNative<'local>(
    mut env: JNIEnv<'local>,
    _obj: JObject<'local>,
    signer_ptr: jlong,
) -> jlong {
    run_jni_safe(&mut env, -1, |_| {
        let signer = initialized::<C2paSigner>(signer_ptr, "Signer")?;
        Ok(unsafe { c2pa_signer_reserve_size(signer) })
    })
}

/// Frees the signer. A callback context is deactivated first and dropped
/// only once the native signer is gone.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Signer_free<'local>(
    _env: JNIEnv<'local>,
    _obj: JObject<'local>,
    signer_ptr: jlong,
) {
    if let Some(native) = from_handle::<C2paSigner>(signer_ptr) {
        let context = signer::unregister(native);
        unsafe { c2pa_signer_free(native) };
        drop(context);
    }
}
