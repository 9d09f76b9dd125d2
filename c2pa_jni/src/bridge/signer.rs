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

//! Native signers that call back into a Java `sign(byte[])` method.
//!
//! Every callback signer is registered with its [SignerContext]. Freeing the
//! signer, or unloading the library, clears the context's active flag while
//! holding the registry lock, so a callback that has not started yet fails
//! instead of touching a released object. A callback already inside the host
//! holds its own reference to the host and finishes normally; the Java
//! reference is dropped once both sides are done, never under a lock.

use std::{
    os::raw::{c_uchar, c_void},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use jni::{
    objects::{GlobalRef, JByteArray, JMethodID, JObject, JValue},
    signature::ReturnType,
    sys::jint,
    JNIEnv,
};

use super::{
    exception::{run_callback_safe, Error, Result},
    marshal, runtime,
};
use crate::{c2pa_signer_create, C2paSigner, C2paSigningAlg};

/// Produces signatures on behalf of a native signer.
pub trait HostSigner: Send + Sync {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub struct SignerContext {
    active: AtomicBool,
    // Only locked long enough to clone or take the host.
    host: Mutex<Option<Arc<dyn HostSigner>>>,
}

impl SignerContext {
    pub fn new(host: Box<dyn HostSigner>) -> Box<Self> {
        Box::new(Self {
            active: AtomicBool::new(true),
            host: Mutex::new(Some(Arc::from(host))),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Detaches the host. It is dropped when the last in-flight sign returns.
    fn release_host(&self) -> Option<Arc<dyn HostSigner>> {
        self.host.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn host(&self) -> Result<Arc<dyn HostSigner>> {
        self.host
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::Lifecycle("Signer has been released".to_string()))
    }
}

unsafe extern "C" fn sign_callback(
    context: *const (),
    data: *const c_uchar,
    len: usize,
    signed_bytes: *mut c_uchar,
    signed_len: usize,
) -> isize {
    let Some(context) = (context as *const SignerContext).as_ref() else {
        return -1;
    };
    if !context.is_active() {
        return -1;
    }
    run_callback_safe("sign", crate::Error::Signature, || {
        if len > jint::MAX as usize {
            return Err(Error::BufferTooLarge { requested: len });
        }
        let data: &[u8] = if len == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(data, len)
        };
        // No lock is held while the host signs, so it may free signers itself.
        let signature = context.host()?.sign(data)?;
        if signature.len() > signed_len {
            return Err(Error::NativeFailure(format!(
                "Signature of {} bytes exceeds the {signed_len} byte buffer",
                signature.len()
            )));
        }
        std::ptr::copy_nonoverlapping(signature.as_ptr(), signed_bytes, signature.len());
        Ok(signature.len() as isize)
    })
}

/// Creates a native signer that signs through `context`.
///
/// On success the pair is registered; on failure the context is dropped.
pub fn create_callback_signer(
    context: Box<SignerContext>,
    alg: C2paSigningAlg,
    certs: &std::ffi::CStr,
    tsa_url: *const std::os::raw::c_char,
) -> *mut C2paSigner {
    let context_ptr = &*context as *const SignerContext as *const c_void;
    let signer =
        unsafe { c2pa_signer_create(context_ptr, sign_callback, alg, certs.as_ptr(), tsa_url) };
    if !signer.is_null() {
        register(signer, context);
    }
    signer
}

struct Entry {
    signer: usize,
    context: Box<SignerContext>,
}

static REGISTRY: Mutex<Vec<Entry>> = Mutex::new(Vec::new());

fn registry() -> MutexGuard<'static, Vec<Entry>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn register(signer: *mut C2paSigner, context: Box<SignerContext>) {
    registry().push(Entry {
        signer: signer as usize,
        context,
    });
}

/// Removes and deactivates the context of `signer`, if it has one.
///
/// The context is returned so the caller can drop it after the native signer
/// that points at it has been freed.
pub fn unregister(signer: *mut C2paSigner) -> Option<Box<SignerContext>> {
    let context = {
        let mut entries = registry();
        let index = entries
            .iter()
            .position(|entry| entry.signer == signer as usize)?;
        let entry = entries.swap_remove(index);
        entry.context.deactivate();
        entry.context
    };
    drop(context.release_host());
    Some(context)
}

/// Deactivates every registered context. Called from `JNI_OnUnload`.
///
/// Native signers the host never freed may still call back later, so their
/// contexts are leaked rather than freed; the callbacks see them inactive.
pub fn drain_all() -> usize {
    let drained: Vec<Entry> = {
        let mut entries = registry();
        entries
            .drain(..)
            .inspect(|entry| entry.context.deactivate())
            .collect()
    };
    let count = drained.len();
    for entry in drained {
        drop(entry.context.release_host());
        let _ = Box::leak(entry.context);
    }
    count
}

/// Maps the algorithm names accepted from Java. Matching is exact.
pub fn parse_algorithm(name: &str) -> Result<C2paSigningAlg> {
    match name {
        "es256" => Ok(C2paSigningAlg::Es256),
        "es384" => Ok(C2paSigningAlg::Es384),
        "es512" => Ok(C2paSigningAlg::Es512),
        "ps256" => Ok(C2paSigningAlg::Ps256),
        "ps384" => Ok(C2paSigningAlg::Ps384),
        "ps512" => Ok(C2paSigningAlg::Ps512),
        "ed25519" => Ok(C2paSigningAlg::Ed25519),
        _ => Err(Error::DomainArgument(
            "Unknown signing algorithm".to_string(),
        )),
    }
}

/// A Java object with a `byte[] sign(byte[])` method.
pub struct JavaSigner {
    callback: GlobalRef,
    sign_method: JMethodID,
}

impl JavaSigner {
    pub fn new(env: &mut JNIEnv, callback: &JObject) -> Result<Self> {
        let callback_ref = env.new_global_ref(callback)?;
        let class = env.get_object_class(callback)?;
        let sign_method = env.get_method_id(&class, "sign", "([B)[B")?;
        env.delete_local_ref(class)?;
        Ok(Self {
            callback: callback_ref,
            sign_method,
        })
    }
}

impl HostSigner for JavaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut env = runtime::callback_env()?;
        let array = marshal::byte_array_from_slice(&mut env, data)?;
        let array = env.auto_local(array);

        let result = unsafe {
            env.call_method_unchecked(
                self.callback.as_obj(),
                self.sign_method,
                ReturnType::Array,
                &[JValue::Object(&array).as_jni()],
            )
        }?
        .l()?;
        if result.is_null() {
            return Err(Error::NativeFailure(
                "Signer callback returned null".to_string(),
            ));
        }
        let signature = env.auto_local(JByteArray::from(result));
        marshal::from_host_byte_array(&mut env, &signature)
    }
}
