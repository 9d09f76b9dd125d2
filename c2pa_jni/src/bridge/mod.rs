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

//! JNI bridge from `org.contentauth.c2pa` to the native C ABI.
//!
//! Entry points live in [api]. Stream and signer callbacks may arrive on any
//! native thread; they reach the JVM through [runtime], which attaches
//! foreign threads on demand and detaches them when they exit.

pub(crate) mod api;
pub(crate) mod bindings;
pub(crate) mod exception;
pub mod lifecycle;
pub(crate) mod marshal;
pub(crate) mod runtime;
pub(crate) mod signer;
pub(crate) mod stream;

/// An in-process JVM shared by the tests that need a real `JNIEnv`.
///
/// The class path holds the Java classes compiled from `tests/fixtures/java`,
/// and the bridge is loaded through `JNI_OnLoad` as it would be on a device.
#[cfg(all(test, feature = "invocation"))]
pub(crate) mod test_jvm {
    use std::{
        ptr,
        sync::{Mutex, MutexGuard, OnceLock, PoisonError},
    };

    use jni::{
        objects::{JByteArray, JObject, JString, JValue},
        InitArgsBuilder, JNIEnv, JNIVersion, JavaVM,
    };

    pub const SAMPLE_JPEG: &[u8] = include_bytes!("../../tests/fixtures/sample.jpg");
    pub const ES256_CERTS: &str = include_str!("../../tests/fixtures/certs/es256.pub");
    pub const ES256_KEY: &str = include_str!("../../tests/fixtures/certs/es256.pem");

    const CLASS_PATH: &str = concat!(
        "-Djava.class.path=",
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/classes"
    );

    pub fn jvm() -> &'static JavaVM {
        static JVM: OnceLock<JavaVM> = OnceLock::new();
        JVM.get_or_init(|| {
            let args = InitArgsBuilder::new()
                .version(JNIVersion::V8)
                .option("-Xcheck:jni")
                .option(CLASS_PATH)
                .build()
                .unwrap();
            let vm = JavaVM::new(args).unwrap();
            {
                let _env = vm.attach_current_thread().unwrap();
                let version =
                    super::lifecycle::JNI_OnLoad(vm.get_java_vm_pointer(), ptr::null_mut());
                assert_eq!(version, jni::sys::JNI_VERSION_1_6);
            }
            vm
        })
    }

    /// Serializes tests that count the threads the bridge attaches.
    pub fn attach_lock() -> MutexGuard<'static, ()> {
        static LOCK: Mutex<()> = Mutex::new(());
        LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A second local reference to `obj`, for entry points that take ownership.
    pub fn local<'local>(obj: &JObject<'local>) -> JObject<'local> {
        unsafe { JObject::from_raw(obj.as_raw()) }
    }

    pub fn string<'local>(env: &mut JNIEnv<'local>, value: &str) -> JString<'local> {
        env.new_string(value).unwrap()
    }

    /// An `org.contentauth.c2pa.Stream` over a copy of `bytes`.
    pub fn new_stream<'local>(env: &mut JNIEnv<'local>, bytes: &[u8]) -> JObject<'local> {
        let array = env.byte_array_from_slice(bytes).unwrap();
        env.new_object(
            "org/contentauth/c2pa/Stream",
            "([B)V",
            &[JValue::Object(&array)],
        )
        .unwrap()
    }

    pub fn stream_bytes(env: &mut JNIEnv, stream: &JObject) -> Vec<u8> {
        let array = env
            .call_method(stream, "toByteArray", "()[B", &[])
            .unwrap()
            .l()
            .unwrap();
        env.convert_byte_array(JByteArray::from(array)).unwrap()
    }

    /// An ES256 `KeySigner` over the test key.
    pub fn new_key_signer<'local>(env: &mut JNIEnv<'local>) -> JObject<'local> {
        let pem = string(env, ES256_KEY);
        env.new_object(
            "org/contentauth/c2pa/testing/KeySigner",
            "(Ljava/lang/String;)V",
            &[JValue::Object(&pem)],
        )
        .unwrap()
    }

    /// Clears the pending exception, checks its class and returns its message.
    pub fn take_exception(env: &mut JNIEnv, class: &str) -> String {
        assert!(env.exception_check().unwrap(), "expected a pending {class}");
        let throwable = env.exception_occurred().unwrap();
        env.exception_clear().unwrap();
        assert!(env.is_instance_of(&throwable, class).unwrap());
        let message = env
            .call_method(&throwable, "getMessage", "()Ljava/lang/String;", &[])
            .unwrap()
            .l()
            .unwrap();
        env.get_string(&JString::from(message)).unwrap().into()
    }
}
