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

//! Translation of bridge failures into Java exceptions.
//!
//! Entry points throw immediately. Callbacks cannot throw across the native
//! library, so they leave the exception pending and return -1; the pending
//! exception is what the Java caller sees once the entry point returns.

use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
};

use jni::JNIEnv;
use thiserror::Error;

use super::runtime;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by the bridge itself.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller supplied argument was missing or out of range.
    #[error("{0}")]
    DomainArgument(String),

    /// A handle or the runtime was used outside its lifetime.
    #[error("{0}")]
    Lifecycle(String),

    #[error("Requested buffer too large for JNI")]
    BufferTooLarge { requested: usize },

    #[error("{0}")]
    HostAllocation(String),

    /// The native library reported a failure.
    #[error("{0}")]
    NativeFailure(String),

    /// A JNI call failed. If the JVM raised an exception it is still pending.
    #[error("JNI call failed: {0}")]
    Jni(#[from] jni::errors::Error),

    #[error("unexpected panic: {0}")]
    Panic(String),
}

impl Error {
    /// The Java class thrown for this failure.
    pub fn exception_class(&self) -> &'static str {
        match self {
            Error::DomainArgument(_) | Error::BufferTooLarge { .. } => {
                "java/lang/IllegalArgumentException"
            }
            Error::Lifecycle(_) => "java/lang/IllegalStateException",
            Error::HostAllocation(_) => "java/lang/OutOfMemoryError",
            Error::NativeFailure(_) | Error::Jni(_) | Error::Panic(_) => {
                "java/lang/RuntimeException"
            }
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Error::Panic(message)
    }
}

/// Builds a native failure from the native last error, or `default` if there is none.
pub fn native_failure(default: &str) -> Error {
    match crate::Error::last_message() {
        Some(message) if !message.is_empty() => Error::NativeFailure(message),
        _ => Error::NativeFailure(default.to_string()),
    }
}

/// Throws `error` unless an exception is already pending.
#[cold]
pub fn throw(env: &mut JNIEnv, error: Error) {
    if env.exception_check().unwrap_or(true) {
        log::debug!("exception already pending, not throwing for {error}");
        return;
    }
    if let Err(failure) = env.throw_new(error.exception_class(), error.to_string()) {
        log::error!("failed to throw exception for {error}: {failure}");
    }
}

/// Throws a [native_failure] carrying the native last error, or `default`.
pub fn raise_native_failure(env: &mut JNIEnv, default: &str) {
    throw(env, native_failure(default));
}

/// Runs an entry point body, turning errors and panics into Java exceptions.
///
/// `on_failure` is returned to Java whenever an exception was thrown.
pub fn run_jni_safe<'local, F, R>(env: &mut JNIEnv<'local>, on_failure: R, f: F) -> R
where
    F: FnOnce(&mut JNIEnv<'local>) -> Result<R>,
{
    // The env may be unusable after a panic; throwing is the best that can be done.
    match catch_unwind(AssertUnwindSafe(|| f(env))) {
        Ok(Ok(value)) => value,
        Ok(Err(error)) => {
            throw(env, error);
            on_failure
        }
        Err(payload) => {
            throw(env, Error::from_panic(payload));
            on_failure
        }
    }
}

/// Runs a native callback body, returning -1 on any failure.
///
/// The failure is recorded as the native last error through `record`. On a
/// thread the JVM already knows it is also thrown if nothing is pending yet,
/// then logged and cleared if the bridge attached that thread, since no Java
/// frame is there to receive it.
pub fn run_callback_safe<F>(operation: &str, record: fn(String) -> crate::Error, f: F) -> isize
where
    F: FnOnce() -> Result<isize>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(error)) => {
            settle_callback_failure(operation, error, record);
            -1
        }
        Err(payload) => {
            let error = Error::from_panic(payload);
            log::error!("{operation} callback panicked: {error}");
            record(format!("{operation} callback panicked")).set_last();
            -1
        }
    }
}

fn settle_callback_failure(operation: &str, error: Error, record: fn(String) -> crate::Error) {
    log::warn!("{operation} callback failed: {error}");
    record(format!("{operation} callback failed: {error}")).set_last();

    // A thread the JVM has never seen has nowhere to deliver an exception.
    let Some(mut env) = runtime::attached_thread_env() else {
        return;
    };
    throw(&mut env, error);

    if runtime::is_bridge_attached() && env.exception_check().unwrap_or(false) {
        log::warn!("clearing exception from {operation} callback on a bridge attached thread");
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_classes() {
        assert_eq!(
            Error::DomainArgument("x".into()).exception_class(),
            "java/lang/IllegalArgumentException"
        );
        assert_eq!(
            Error::BufferTooLarge { requested: 1 << 32 }.exception_class(),
            "java/lang/IllegalArgumentException"
        );
        assert_eq!(
            Error::Lifecycle("x".into()).exception_class(),
            "java/lang/IllegalStateException"
        );
        assert_eq!(
            Error::HostAllocation("x".into()).exception_class(),
            "java/lang/OutOfMemoryError"
        );
        assert_eq!(
            Error::NativeFailure("x".into()).exception_class(),
            "java/lang/RuntimeException"
        );
    }

    #[test]
    fn test_buffer_too_large_message() {
        let err = Error::BufferTooLarge {
            requested: i32::MAX as usize + 1,
        };
        assert_eq!(err.to_string(), "Requested buffer too large for JNI");
    }

    #[test]
    fn test_native_failure_prefers_last_error() {
        crate::Error::Signature("bad key".into()).set_last();
        let err = native_failure("Failed to sign builder");
        assert_eq!(err.to_string(), "Signature: bad key");

        crate::Error::take_last();
        let err = native_failure("Failed to sign builder");
        assert_eq!(err.to_string(), "Failed to sign builder");
    }

    #[test]
    fn test_panic_payloads() {
        let err = Error::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "unexpected panic: boom");
        let err = Error::from_panic(Box::new(String::from("bang")));
        assert_eq!(err.to_string(), "unexpected panic: bang");
    }

    #[test]
    fn test_callback_failure_returns_minus_one() {
        let result = run_callback_safe("read", crate::Error::Io, || {
            Err(Error::BufferTooLarge {
                requested: usize::MAX,
            })
        });
        assert_eq!(result, -1);
        assert_eq!(
            crate::Error::take_last().unwrap().to_string(),
            "Io: read callback failed: Requested buffer too large for JNI"
        );
    }

    #[test]
    fn test_callback_panic_returns_minus_one() {
        let result = run_callback_safe("sign", crate::Error::Signature, || panic!("lost"));
        assert_eq!(result, -1);
        assert_eq!(
            crate::Error::take_last().unwrap().to_string(),
            "Signature: sign callback panicked"
        );
    }

    #[test]
    fn test_callback_success_passes_value() {
        assert_eq!(run_callback_safe("seek", crate::Error::Io, || Ok(42)), 42);
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_run_jni_safe_throws_and_returns_failure_value() {
        let vm = crate::bridge::test_jvm::jvm();
        let mut env = vm.attach_current_thread().unwrap();

        let value = run_jni_safe(&mut env, -1, |_| {
            Err(Error::Lifecycle("Builder is not initialized".into()))
        });
        assert_eq!(value, -1);

        let throwable = env.exception_occurred().unwrap();
        env.exception_clear().unwrap();
        assert!(env
            .is_instance_of(&throwable, "java/lang/IllegalStateException")
            .unwrap());
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_raise_native_failure_uses_last_error() {
        let vm = crate::bridge::test_jvm::jvm();
        let mut env = vm.attach_current_thread().unwrap();

        crate::Error::Io("stream closed".to_string()).set_last();
        raise_native_failure(&mut env, "Failed to sign builder");

        let throwable = env.exception_occurred().unwrap();
        env.exception_clear().unwrap();
        assert!(env
            .is_instance_of(&throwable, "java/lang/RuntimeException")
            .unwrap());
        let message = env
            .call_method(&throwable, "getMessage", "()Ljava/lang/String;", &[])
            .unwrap()
            .l()
            .unwrap();
        let message = jni::objects::JString::from(message);
        let message: String = env.get_string(&message).unwrap().into();
        assert_eq!(message, "Io: stream closed");
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_throw_keeps_pending_exception() {
        let vm = crate::bridge::test_jvm::jvm();
        let mut env = vm.attach_current_thread().unwrap();

        env.throw_new("java/lang/ArithmeticException", "first").unwrap();
        throw(&mut env, Error::DomainArgument("second".into()));

        let throwable = env.exception_occurred().unwrap();
        env.exception_clear().unwrap();
        assert!(env
            .is_instance_of(&throwable, "java/lang/ArithmeticException")
            .unwrap());
    }
}
