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

use jni::{objects::JObject, sys::jlong, JNIEnv};

use super::{from_handle, to_handle};
use crate::bridge::{
    bindings,
    exception::{run_jni_safe, Error},
    stream::{create_host_stream, release_host_stream, JavaStream},
};

/// Wraps this `Stream` in a native stream and returns its handle.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Stream_createStreamNative<'local>(
    mut env: JNIEnv<'local>,
    obj: JObject<'local>,
) -> jlong {
    run_jni_safe(&mut env, 0, |env| {
        let methods = bindings::stream_methods()
            .ok_or_else(|| Error::Lifecycle("Stream method IDs not cached".to_string()))?;
        let host = JavaStream::new(env, &obj, methods)?;
        let stream = create_host_stream(Box::new(host));
        if stream.is_null() {
            return Err(Error::NativeFailure(
                "Failed to create C2PA stream".to_string(),
            ));
        }
        Ok(to_handle(stream))
    })
}

/// Releases the Java reference, then the native stream. Zero is ignored.
#[no_mangle]
pub extern "system" fn Java_org_contentauth_c2pa_Stream_releaseStreamNative<'local>(
    _env: JNIEnv<'local>,
    _obj: JObject<'local>,
    stream_ptr: jlong,
) {
    if let Some(stream) = from_handle(stream_ptr) {
        unsafe { release_host_stream(stream) };
    }
}

#[cfg(all(test, feature = "invocation"))]
mod tests {
    use std::{
        io::{Read, Seek, SeekFrom, Write},
        thread,
    };

    use jni::objects::{JClass, JObject, JValue};

    use super::*;
    use crate::{
        bridge::{
            api::reader::Java_org_contentauth_c2pa_Reader_fromStreamNative,
            runtime,
            test_jvm::{attach_lock, jvm, local, new_stream, stream_bytes, string, take_exception},
        },
        C2paStream,
    };

    fn native<'a>(handle: jlong) -> &'a mut C2paStream {
        unsafe { &mut *from_handle::<C2paStream>(handle).unwrap() }
    }

    #[test]
    fn test_native_stream_reads_java_stream() {
        let mut env = jvm().attach_current_thread().unwrap();
        let stream = new_stream(&mut env, b"c2pa stream bytes");

        let handle = Java_org_contentauth_c2pa_Stream_createStreamNative(
            unsafe { env.unsafe_clone() },
            local(&stream),
        );
        assert_ne!(handle, 0);

        let mut buf = [0u8; 4];
        native(handle).read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"c2pa");
        assert_eq!(native(handle).seek(SeekFrom::End(-5)).unwrap(), 12);
        let mut rest = String::new();
        native(handle).read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "bytes");

        native(handle).seek(SeekFrom::Start(0)).unwrap();
        native(handle).write_all(b"C2PA").unwrap();
        native(handle).flush().unwrap();
        assert_eq!(stream_bytes(&mut env, &stream), b"C2PA stream bytes");

        Java_org_contentauth_c2pa_Stream_releaseStreamNative(
            unsafe { env.unsafe_clone() },
            local(&stream),
            handle,
        );
        assert!(!env.exception_check().unwrap());
    }

    #[test]
    fn test_foreign_thread_detached_after_join() {
        let _lock = attach_lock();
        let mut env = jvm().attach_current_thread().unwrap();
        let stream = new_stream(&mut env, &[9; 32]);
        let handle = Java_org_contentauth_c2pa_Stream_createStreamNative(
            unsafe { env.unsafe_clone() },
            local(&stream),
        );
        assert_ne!(handle, 0);

        let baseline = runtime::attached_thread_count();
        thread::spawn(move || {
            let mut buf = [0u8; 16];
            assert_eq!(native(handle).read(&mut buf).unwrap(), 16);
            assert_eq!(buf, [9; 16]);
            assert!(runtime::is_bridge_attached());
            assert_eq!(runtime::attached_thread_count(), baseline + 1);
        })
        .join()
        .unwrap();
        assert_eq!(runtime::attached_thread_count(), baseline);

        Java_org_contentauth_c2pa_Stream_releaseStreamNative(
            unsafe { env.unsafe_clone() },
            local(&stream),
            handle,
        );
    }

    #[test]
    fn test_host_read_exception_reaches_caller() {
        let mut env = jvm().attach_current_thread().unwrap();
        let stream = new_stream(&mut env, &[0; 64]);
        let message = string(&mut env, "disk unavailable");
        env.call_method(
            &stream,
            "failReads",
            "(Ljava/lang/String;)V",
            &[JValue::Object(&message)],
        )
        .unwrap();
        let handle = Java_org_contentauth_c2pa_Stream_createStreamNative(
            unsafe { env.unsafe_clone() },
            local(&stream),
        );
        assert_ne!(handle, 0);

        let format = string(&mut env, "image/jpeg");
        let reader = Java_org_contentauth_c2pa_Reader_fromStreamNative(
            unsafe { env.unsafe_clone() },
            JClass::from(JObject::null()),
            format,
            handle,
        );
        assert_eq!(reader, 0);
        assert_eq!(
            take_exception(&mut env, "java/lang/IllegalStateException"),
            "disk unavailable"
        );

        Java_org_contentauth_c2pa_Stream_releaseStreamNative(
            unsafe { env.unsafe_clone() },
            local(&stream),
            handle,
        );
    }
}
