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

//! `Java_org_contentauth_c2pa_*` entry points, one module per Java class.
//!
//! Native objects cross into Java as `long` handles holding the raw pointer;
//! zero means absent. Status codes from the native library are returned as
//! is, while null and negative results from constructors and signing raise
//! an exception carrying the native last error.

pub(crate) mod builder;
pub(crate) mod c2pa;
pub(crate) mod reader;
pub(crate) mod signer;
pub(crate) mod stream;

use jni::sys::jlong;

use super::exception::{Error, Result};

/// Decodes a handle, `None` for zero.
pub(crate) fn from_handle<T>(handle: jlong) -> Option<*mut T> {
    (handle != 0).then_some(handle as usize as *mut T)
}

/// Decodes a handle that must be live.
pub(crate) fn initialized<T>(handle: jlong, what: &str) -> Result<*mut T> {
    from_handle(handle).ok_or_else(|| Error::Lifecycle(format!("{what} is not initialized")))
}

pub(crate) fn to_handle<T>(ptr: *mut T) -> jlong {
    ptr as usize as jlong
}

/// Fails with `message` unless every check holds.
pub(crate) fn require(checks: &[bool], message: &str) -> Result<()> {
    if checks.iter().all(|ok| *ok) {
        Ok(())
    } else {
        Err(Error::DomainArgument(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles() {
        assert!(from_handle::<u8>(0).is_none());

        let mut value = 7u8;
        let handle = to_handle(&mut value as *mut u8);
        assert_ne!(handle, 0);
        assert_eq!(unsafe { *from_handle::<u8>(handle).unwrap() }, 7);

        let err = initialized::<u8>(0, "Reader").unwrap_err();
        assert!(matches!(err, Error::Lifecycle(_)));
        assert_eq!(err.to_string(), "Reader is not initialized");
    }

    #[test]
    fn test_require() {
        assert!(require(&[true, true], "unused").is_ok());
        let err = require(&[true, false], "Format and stream cannot be null").unwrap_err();
        assert!(matches!(err, Error::DomainArgument(_)));
        assert_eq!(err.to_string(), "Format and stream cannot be null");
    }

    #[cfg(feature = "invocation")]
    #[test]
    fn test_zero_handles_free_twice() {
        use jni::objects::JObject;

        use super::{
            builder::Java_org_contentauth_c2pa_Builder_free,
            reader::Java_org_contentauth_c2pa_Reader_free,
            signer::Java_org_contentauth_c2pa_Signer_free,
            stream::Java_org_contentauth_c2pa_Stream_releaseStreamNative,
        };

        let env = crate::bridge::test_jvm::jvm().attach_current_thread().unwrap();
        for _ in 0..2 {
            Java_org_contentauth_c2pa_Reader_free(unsafe { env.unsafe_clone() }, JObject::null(), 0);
            Java_org_contentauth_c2pa_Builder_free(unsafe { env.unsafe_clone() }, JObject::null(), 0);
            Java_org_contentauth_c2pa_Signer_free(unsafe { env.unsafe_clone() }, JObject::null(), 0);
            Java_org_contentauth_c2pa_Stream_releaseStreamNative(
                unsafe { env.unsafe_clone() },
                JObject::null(),
                0,
            );
        }
        assert!(!env.exception_check().unwrap());
    }
}
