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

//! Access to the JVM from arbitrary native threads.
//!
//! The VM handle is set by `JNI_OnLoad` and cleared by `JNI_OnUnload`.
//! Threads that the JVM does not know about are attached on first use and
//! detached by a thread-local destructor when they exit, but only if the
//! bridge attached them and the VM is still registered at that point.
//!
//! Attachment goes through the raw invocation interface rather than
//! [JavaVM::attach_current_thread_permanently]; the latter detaches through
//! its own thread-local even after the library has been unloaded.

use std::{
    cell::Cell,
    ffi::c_void,
    ptr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use jni::{sys, JNIEnv, JavaVM};

use super::exception::{Error, Result};

static RUNTIME: Mutex<Option<JavaVM>> = Mutex::new(None);

static ATTACHED_THREADS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static ATTACHMENT: ThreadAttachment = const {
        ThreadAttachment {
            attached: Cell::new(false),
        }
    };
}

/// Marks a thread the bridge attached; detaches it when the thread exits.
struct ThreadAttachment {
    attached: Cell<bool>,
}

impl Drop for ThreadAttachment {
    fn drop(&mut self) {
        if !self.attached.replace(false) {
            return;
        }
        ATTACHED_THREADS.fetch_sub(1, Ordering::AcqRel);
        match vm_pointer() {
            Some(vm) => {
                let status = unsafe { detach_current_thread(vm) };
                log::debug!("detached native thread from the JVM (status {status})");
            }
            None => log::debug!("runtime already torn down, leaving thread attached"),
        }
    }
}

fn lock() -> MutexGuard<'static, Option<JavaVM>> {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner)
}

fn vm_pointer() -> Option<*mut sys::JavaVM> {
    lock().as_ref().map(JavaVM::get_java_vm_pointer)
}

fn unavailable() -> Error {
    Error::Lifecycle("Host runtime is not available".to_string())
}

unsafe fn invoke_interface<'a>(vm: *mut sys::JavaVM) -> &'a sys::JNIInvokeInterface_ {
    &**vm
}

unsafe fn detach_current_thread(vm: *mut sys::JavaVM) -> sys::jint {
    match invoke_interface(vm).DetachCurrentThread {
        Some(detach) => detach(vm),
        None => sys::JNI_ERR,
    }
}

/// Registers the VM. Called once from `JNI_OnLoad`.
pub fn initialize(vm: JavaVM) {
    *lock() = Some(vm);
    log::debug!("c2pa runtime initialized");
}

/// Clears the VM. Callbacks that arrive afterwards fail without touching it.
pub fn teardown() -> Option<JavaVM> {
    let vm = lock().take();
    log::debug!(
        "c2pa runtime torn down with {} bridge attached threads",
        attached_thread_count()
    );
    vm
}

pub fn is_initialized() -> bool {
    lock().is_some()
}

/// Returns the `JNIEnv` for the calling thread, attaching it if needed.
///
/// A thread that is already attached gets its env back unchanged and is never
/// detached by the bridge.
pub fn current_thread_env() -> Result<JNIEnv<'static>> {
    let vm = vm_pointer().ok_or_else(unavailable)?;
    let interface = unsafe { invoke_interface(vm) };

    let get_env = interface.GetEnv.ok_or_else(unavailable)?;
    let mut env: *mut c_void = ptr::null_mut();
    let status = unsafe { get_env(vm, &mut env, sys::JNI_VERSION_1_6) };
    match status {
        sys::JNI_OK => {}
        sys::JNI_EDETACHED => {
            let attach = interface.AttachCurrentThread.ok_or_else(unavailable)?;
            let status = unsafe { attach(vm, &mut env, ptr::null_mut()) };
            if status != sys::JNI_OK {
                return Err(Error::Lifecycle(format!(
                    "Failed to attach thread to the host runtime ({status})"
                )));
            }
            let marked = ATTACHMENT.try_with(|attachment| attachment.attached.set(true));
            if marked.is_err() {
                // Thread-local storage is already gone, so nothing would detach later.
                unsafe { detach_current_thread(vm) };
                return Err(Error::Lifecycle("Thread is exiting".to_string()));
            }
            let count = ATTACHED_THREADS.fetch_add(1, Ordering::AcqRel) + 1;
            log::debug!("attached native thread to the JVM ({count} bridge attached)");
        }
        other => {
            return Err(Error::Lifecycle(format!(
                "Failed to get JNIEnv for the current thread ({other})"
            )))
        }
    }

    Ok(unsafe { JNIEnv::from_raw(env as *mut sys::JNIEnv) }?)
}

/// Returns the env of a thread that is already attached, without attaching it.
pub fn attached_thread_env() -> Option<JNIEnv<'static>> {
    let vm = vm_pointer()?;
    let get_env = unsafe { invoke_interface(vm) }.GetEnv?;
    let mut env: *mut c_void = ptr::null_mut();
    let status = unsafe { get_env(vm, &mut env, sys::JNI_VERSION_1_6) };
    if status != sys::JNI_OK {
        return None;
    }
    unsafe { JNIEnv::from_raw(env as *mut sys::JNIEnv) }.ok()
}

/// Returns the env for a callback, or fails if a host exception is already pending.
///
/// A pending exception means an earlier callback on this thread failed; the
/// JVM forbids most calls until it is handled, so the new callback fails too.
pub fn callback_env() -> Result<JNIEnv<'static>> {
    let mut env = current_thread_env()?;
    if env.exception_check()? {
        return Err(Error::Jni(jni::errors::Error::JavaException));
    }
    Ok(env)
}

/// Number of threads currently attached by the bridge.
pub fn attached_thread_count() -> usize {
    ATTACHED_THREADS.load(Ordering::Acquire)
}

/// True if the bridge attached the calling thread.
pub fn is_bridge_attached() -> bool {
    ATTACHMENT
        .try_with(|attachment| attachment.attached.get())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "invocation"))]
    #[test]
    fn test_env_without_runtime() {
        assert!(!is_initialized());
        let err = current_thread_env().unwrap_err();
        assert!(matches!(err, Error::Lifecycle(_)));
        assert_eq!(err.to_string(), "Host runtime is not available");
        assert!(attached_thread_env().is_none());
        assert!(!is_bridge_attached());
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_foreign_thread_is_attached_and_marked() {
        crate::bridge::test_jvm::jvm();
        let _lock = crate::bridge::test_jvm::attach_lock();
        let baseline = attached_thread_count();

        std::thread::spawn(move || {
            assert!(!is_bridge_attached());
            let mut env = current_thread_env().unwrap();
            assert!(is_bridge_attached());
            assert_eq!(attached_thread_count(), baseline + 1);
            assert!(!env.exception_check().unwrap());

            // a second lookup reuses the attachment
            current_thread_env().unwrap();
            assert_eq!(attached_thread_count(), baseline + 1);
        })
        .join()
        .unwrap();

        // detached by the thread-local destructor before join returns
        assert_eq!(attached_thread_count(), baseline);
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_attached_env_never_attaches() {
        crate::bridge::test_jvm::jvm();
        let _lock = crate::bridge::test_jvm::attach_lock();
        let baseline = attached_thread_count();

        std::thread::spawn(move || {
            assert!(attached_thread_env().is_none());
            assert_eq!(attached_thread_count(), baseline);

            current_thread_env().unwrap();
            assert!(attached_thread_env().is_some());
        })
        .join()
        .unwrap();
        assert_eq!(attached_thread_count(), baseline);
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_host_thread_is_not_marked() {
        let vm = crate::bridge::test_jvm::jvm();

        std::thread::spawn(move || {
            vm.attach_current_thread_permanently().unwrap();
            current_thread_env().unwrap();
            assert!(!is_bridge_attached());
        })
        .join()
        .unwrap();
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_callback_env_refuses_pending_exception() {
        crate::bridge::test_jvm::jvm();
        let _lock = crate::bridge::test_jvm::attach_lock();

        std::thread::spawn(|| {
            let mut env = current_thread_env().unwrap();
            env.throw_new("java/lang/IllegalStateException", "pending")
                .unwrap();
            assert!(matches!(
                callback_env(),
                Err(Error::Jni(jni::errors::Error::JavaException))
            ));
            env.exception_clear().unwrap();
            assert!(callback_env().is_ok());
        })
        .join()
        .unwrap();
    }
}
