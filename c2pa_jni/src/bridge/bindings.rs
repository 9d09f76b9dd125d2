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

//! Class references and method IDs resolved once in `JNI_OnLoad`.

use std::sync::{PoisonError, RwLock};

use jni::{
    objects::{GlobalRef, JByteArray, JClass, JMethodID, JObject, JValue},
    sys::jlong,
    JNIEnv,
};

use super::exception::Result;

pub const STREAM_CLASS: &str = "org/contentauth/c2pa/Stream";
pub const SIGN_RESULT_CLASS: &str = "org/contentauth/c2pa/Builder$SignResult";
const SIGN_RESULT_CTOR: &str = "(J[B)V";

/// Methods of `org.contentauth.c2pa.Stream` called from the stream callbacks.
#[derive(Clone, Copy, Debug)]
pub struct StreamMethods {
    /// `long read(byte[] data, long length)`
    pub read: JMethodID,
    /// `long seek(long offset, int mode)`
    pub seek: JMethodID,
    /// `long write(byte[] data, long length)`
    pub write: JMethodID,
    /// `long flush()`
    pub flush: JMethodID,
}

pub struct CachedBindings {
    // Held so the method IDs stay valid while the class could otherwise unload.
    _stream_class: Option<GlobalRef>,
    stream_methods: Option<StreamMethods>,
    sign_result: Option<(GlobalRef, JMethodID)>,
}

static BINDINGS: RwLock<Option<CachedBindings>> = RwLock::new(None);

// Missing classes are tolerated; the lookup leaves a pending exception that must be cleared.
fn lookup<T>(env: &mut JNIEnv, what: &str, f: impl FnOnce(&mut JNIEnv) -> Result<T>) -> Option<T> {
    match f(env) {
        Ok(value) => Some(value),
        Err(err) => {
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_clear();
            }
            log::info!("{what} is unavailable: {err}");
            None
        }
    }
}

fn resolve_stream(env: &mut JNIEnv) -> Result<(GlobalRef, StreamMethods)> {
    let class = env.find_class(STREAM_CLASS)?;
    let methods = StreamMethods {
        read: env.get_method_id(&class, "read", "([BJ)J")?,
        seek: env.get_method_id(&class, "seek", "(JI)J")?,
        write: env.get_method_id(&class, "write", "([BJ)J")?,
        flush: env.get_method_id(&class, "flush", "()J")?,
    };
    let global = env.new_global_ref(&class)?;
    env.delete_local_ref(class)?;
    Ok((global, methods))
}

fn resolve_sign_result(env: &mut JNIEnv) -> Result<(GlobalRef, JMethodID)> {
    let class = env.find_class(SIGN_RESULT_CLASS)?;
    let ctor = env.get_method_id(&class, "<init>", SIGN_RESULT_CTOR)?;
    let global = env.new_global_ref(&class)?;
    env.delete_local_ref(class)?;
    Ok((global, ctor))
}

/// Looks up everything the bridge caches. Never leaves an exception pending.
pub fn resolve(env: &mut JNIEnv) -> CachedBindings {
    let stream = lookup(env, STREAM_CLASS, resolve_stream);
    let sign_result = lookup(env, SIGN_RESULT_CLASS, resolve_sign_result);
    let (stream_class, stream_methods) = match stream {
        Some((class, methods)) => (Some(class), Some(methods)),
        None => (None, None),
    };
    CachedBindings {
        _stream_class: stream_class,
        stream_methods,
        sign_result,
    }
}

pub fn install(bindings: CachedBindings) {
    *BINDINGS.write().unwrap_or_else(PoisonError::into_inner) = Some(bindings);
}

/// Drops the cached class references.
pub fn clear() {
    BINDINGS.write().unwrap_or_else(PoisonError::into_inner).take();
}

/// The cached `Stream` methods, if the class was found at load time.
pub fn stream_methods() -> Option<StreamMethods> {
    BINDINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .and_then(|bindings| bindings.stream_methods)
}

/// Constructs `Builder.SignResult(size, manifestBytes)`.
///
/// Falls back to a class lookup when nothing was cached at load time.
pub fn new_sign_result<'local>(
    env: &mut JNIEnv<'local>,
    size: jlong,
    manifest_bytes: &JByteArray,
) -> Result<JObject<'local>> {
    let cached = BINDINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .and_then(|bindings| bindings.sign_result.clone());

    let result = match cached {
        Some((class, ctor)) => {
            let class: &JClass = class.as_obj().into();
            unsafe {
                env.new_object_unchecked(
                    class,
                    ctor,
                    &[
                        JValue::Long(size).as_jni(),
                        JValue::Object(manifest_bytes).as_jni(),
                    ],
                )
            }?
        }
        None => env.new_object(
            SIGN_RESULT_CLASS,
            SIGN_RESULT_CTOR,
            &[JValue::Long(size), JValue::Object(manifest_bytes)],
        )?,
    };
    Ok(result)
}

#[cfg(all(test, feature = "invocation"))]
mod tests {
    use super::*;
    use crate::bridge::test_jvm::jvm;

    #[test]
    fn test_resolve_finds_classes() {
        let mut env = jvm().attach_current_thread().unwrap();

        let bindings = resolve(&mut env);
        assert!(bindings.stream_methods.is_some());
        assert!(bindings.sign_result.is_some());
        assert!(!env.exception_check().unwrap());
    }

    #[test]
    fn test_lookup_tolerates_missing_class() {
        let mut env = jvm().attach_current_thread().unwrap();

        let found = lookup(&mut env, "org/contentauth/c2pa/Missing", |env| {
            env.find_class("org/contentauth/c2pa/Missing")?;
            Ok(())
        });
        assert!(found.is_none());
        assert!(!env.exception_check().unwrap());
    }

    #[test]
    fn test_new_sign_result() {
        let mut env = jvm().attach_current_thread().unwrap();

        let bytes = env.byte_array_from_slice(&[1, 2, 3]).unwrap();
        let result = new_sign_result(&mut env, 3, &bytes).unwrap();
        assert!(env.is_instance_of(&result, SIGN_RESULT_CLASS).unwrap());
        assert_eq!(env.get_field(&result, "size", "J").unwrap().j().unwrap(), 3);

        let manifest = env.get_field(&result, "manifestBytes", "[B").unwrap().l().unwrap();
        let manifest = env.convert_byte_array(JByteArray::from(manifest)).unwrap();
        assert_eq!(manifest, [1, 2, 3]);
    }
}
