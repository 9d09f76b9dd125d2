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

//! Library load and unload hooks called by the JVM.

use std::ffi::c_void;

use jni::{
    sys::{self, jint, JNI_ERR, JNI_VERSION_1_6},
    JavaVM,
};

use super::{bindings, runtime, signer};

/// Registers the VM and caches class bindings.
///
/// A missing `Stream` class only disables stream construction.
#[allow(non_snake_case)]
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: *mut sys::JavaVM, _reserved: *mut c_void) -> jint {
    let vm = match unsafe { JavaVM::from_raw(vm) } {
        Ok(vm) => vm,
        Err(err) => {
            log::error!("JNI_OnLoad called without a VM: {err}");
            return JNI_ERR;
        }
    };
    let cached = match vm.get_env() {
        Ok(mut env) => bindings::resolve(&mut env),
        Err(err) => {
            log::error!("JNI_OnLoad could not get an env: {err}");
            return JNI_ERR;
        }
    };
    bindings::install(cached);
    runtime::initialize(vm);
    log::info!("c2pa JNI bridge loaded, c2pa {}", c2pa::VERSION);
    JNI_VERSION_1_6
}

/// Deactivates outstanding callback signers, then releases cached classes
/// and the VM.
#[allow(non_snake_case)]
#[no_mangle]
pub extern "system" fn JNI_OnUnload(_vm: *mut sys::JavaVM, _reserved: *mut c_void) {
    let drained = signer::drain_all();
    if drained > 0 {
        log::info!("deactivated {drained} callback signers that were never freed");
    }
    bindings::clear();
    runtime::teardown();
    log::info!("c2pa JNI bridge unloaded");
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;

    #[test]
    fn test_load_without_vm() {
        assert_eq!(JNI_OnLoad(ptr::null_mut(), ptr::null_mut()), JNI_ERR);
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_load_registers_runtime() {
        let vm = crate::bridge::test_jvm::jvm();
        let _guard = vm.attach_current_thread().unwrap();

        let version = JNI_OnLoad(vm.get_java_vm_pointer(), ptr::null_mut());
        assert_eq!(version, JNI_VERSION_1_6);
        assert!(runtime::is_initialized());
        assert!(bindings::stream_methods().is_some());
    }
}
