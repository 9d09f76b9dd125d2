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

//! Native streams backed by `org.contentauth.c2pa.Stream` objects.
//!
//! Each native stream owns a [HostStreamContext] that keeps a global
//! reference to its Java stream until the stream is released.

use std::os::raw::c_int;

use jni::{
    objects::{GlobalRef, JMethodID, JObject, JValue},
    signature::{Primitive, ReturnType},
    sys::{jint, jlong},
    JNIEnv,
};

use super::{
    bindings::StreamMethods,
    exception::{run_callback_safe, Error, Result},
    marshal, runtime,
};
use crate::{c2pa_create_stream, c2pa_release_stream, C2paStream, StreamContext};

/// The operations a native stream delegates to its host.
///
/// Each returns the host's own result, unchecked; the callbacks validate it.
pub trait HostStream: Send {
    /// Fills `buf` and returns the count the host reports.
    fn read(&mut self, buf: &mut [u8]) -> Result<i64>;
    fn seek(&mut self, offset: i64, mode: i32) -> Result<i64>;
    fn write(&mut self, data: &[u8]) -> Result<i64>;
    fn flush(&mut self) -> Result<i64>;
}

/// Owned by exactly one native stream.
pub struct HostStreamContext {
    host: Box<dyn HostStream>,
}

unsafe fn host_from_context<'a>(
    context: *mut StreamContext,
) -> Option<&'a mut (dyn HostStream + 'static)> {
    (context as *mut HostStreamContext)
        .as_mut()
        .map(|context| context.host.as_mut())
}

fn check_len(len: isize) -> Result<usize> {
    let requested = usize::try_from(len).map_err(|_| {
        Error::DomainArgument(format!("Invalid buffer length {len}"))
    })?;
    if requested > jint::MAX as usize {
        return Err(Error::BufferTooLarge { requested });
    }
    Ok(requested)
}

unsafe extern "C" fn read_callback(context: *mut StreamContext, data: *mut u8, len: isize) -> isize {
    let Some(host) = host_from_context(context) else {
        return -1;
    };
    run_callback_safe("read", crate::Error::Io, || {
        let len = check_len(len)?;
        let buf: &mut [u8] = if len == 0 {
            &mut []
        } else {
            std::slice::from_raw_parts_mut(data, len)
        };
        let read = host.read(buf)?;
        if read < 0 || read as u64 > len as u64 {
            return Err(Error::NativeFailure(format!(
                "Stream read returned {read} for a {len} byte buffer"
            )));
        }
        Ok(read as isize)
    })
}

unsafe extern "C" fn seek_callback(context: *mut StreamContext, offset: isize, mode: c_int) -> isize {
    let Some(host) = host_from_context(context) else {
        return -1;
    };
    // The mode is forwarded as is; the host rejects values it does not know.
    run_callback_safe("seek", crate::Error::Io, || {
        let position = host.seek(offset as i64, mode)?;
        Ok(position as isize)
    })
}

unsafe extern "C" fn write_callback(context: *mut StreamContext, data: *const u8, len: isize) -> isize {
    let Some(host) = host_from_context(context) else {
        return -1;
    };
    run_callback_safe("write", crate::Error::Io, || {
        let len = check_len(len)?;
        let data: &[u8] = if len == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(data, len)
        };
        let written = host.write(data)?;
        Ok(written as isize)
    })
}

unsafe extern "C" fn flush_callback(context: *mut StreamContext) -> isize {
    let Some(host) = host_from_context(context) else {
        return -1;
    };
    run_callback_safe("flush", crate::Error::Io, || {
        let result = host.flush()?;
        Ok(result as isize)
    })
}

/// Creates a native stream whose callbacks call `host`.
///
/// The result must be released with [release_host_stream].
pub fn create_host_stream(host: Box<dyn HostStream>) -> *mut C2paStream {
    let context = Box::into_raw(Box::new(HostStreamContext { host }));
    let stream = unsafe {
        c2pa_create_stream(
            context as *mut StreamContext,
            read_callback,
            seek_callback,
            write_callback,
            flush_callback,
        )
    };
    if stream.is_null() {
        drop(unsafe { Box::from_raw(context) });
    }
    stream
}

/// Releases the host first, then the native stream.
///
/// # Safety
/// `stream` must come from [create_host_stream] and not be used again.
pub unsafe fn release_host_stream(stream: *mut C2paStream) {
    let Some(native) = stream.as_mut() else {
        return;
    };
    let context = native.take_context() as *mut HostStreamContext;
    if !context.is_null() {
        drop(Box::from_raw(context));
    }
    c2pa_release_stream(stream);
}

/// A `org.contentauth.c2pa.Stream` held through a global reference.
pub struct JavaStream {
    object: GlobalRef,
    methods: StreamMethods,
}

impl JavaStream {
    pub fn new(env: &mut JNIEnv, object: &JObject, methods: StreamMethods) -> Result<Self> {
        let object = env.new_global_ref(object).map_err(|err| {
            log::warn!("new_global_ref failed for stream: {err}");
            Error::HostAllocation("Failed to create global reference".to_string())
        })?;
        Ok(Self { object, methods })
    }

    fn call_long(
        env: &mut JNIEnv,
        object: &GlobalRef,
        method: JMethodID,
        args: &[JValue],
    ) -> Result<i64> {
        let args: Vec<_> = args.iter().map(|arg| arg.as_jni()).collect();
        let value = unsafe {
            env.call_method_unchecked(
                object.as_obj(),
                method,
                ReturnType::Primitive(Primitive::Long),
                &args,
            )
        }?;
        Ok(value.j()?)
    }
}

impl HostStream for JavaStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<i64> {
        let mut env = runtime::callback_env()?;
        let len = buf.len() as jlong;
        let array = marshal::new_host_byte_array(&mut env, len)?;
        let array = env.auto_local(array);

        let read = Self::call_long(
            &mut env,
            &self.object,
            self.methods.read,
            &[JValue::Object(&array), JValue::Long(len)],
        )?;
        if read > 0 && read <= len {
            marshal::copy_to_native(&mut env, &array, &mut buf[..read as usize])?;
        }
        Ok(read)
    }

    fn seek(&mut self, offset: i64, mode: i32) -> Result<i64> {
        let mut env = runtime::callback_env()?;
        Self::call_long(
            &mut env,
            &self.object,
            self.methods.seek,
            &[JValue::Long(offset), JValue::Int(mode)],
        )
    }

    fn write(&mut self, data: &[u8]) -> Result<i64> {
        let mut env = runtime::callback_env()?;
        let array = marshal::byte_array_from_slice(&mut env, data)?;
        let array = env.auto_local(array);

        Self::call_long(
            &mut env,
            &self.object,
            self.methods.write,
            &[JValue::Object(&array), JValue::Long(data.len() as jlong)],
        )
    }

    fn flush(&mut self) -> Result<i64> {
        let mut env = runtime::callback_env()?;
        Self::call_long(&mut env, &self.object, self.methods.flush, &[])
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Seek, SeekFrom, Write},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex,
        },
    };

    use super::*;

    /// Records calls and serves reads from a fixed buffer.
    #[derive(Default)]
    struct MockHost {
        data: Vec<u8>,
        position: usize,
        read_override: Option<i64>,
        seeks: Arc<Mutex<Vec<(i64, i32)>>>,
        written: Arc<Mutex<Vec<u8>>>,
        released: ReleaseFlag,
    }

    /// Set once the host that owns it is dropped.
    #[derive(Default)]
    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl HostStream for MockHost {
        fn read(&mut self, buf: &mut [u8]) -> Result<i64> {
            if let Some(n) = self.read_override {
                return Ok(n);
            }
            let n = buf.len().min(self.data.len() - self.position);
            buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
            self.position += n;
            Ok(n as i64)
        }

        fn seek(&mut self, offset: i64, mode: i32) -> Result<i64> {
            self.seeks.lock().unwrap().push((offset, mode));
            match mode {
                0 => self.position = offset as usize,
                1 => self.position = (self.position as i64 + offset) as usize,
                2 => self.position = (self.data.len() as i64 + offset) as usize,
                _ => return Err(Error::DomainArgument(format!("bad seek mode {mode}"))),
            }
            Ok(self.position as i64)
        }

        fn write(&mut self, data: &[u8]) -> Result<i64> {
            self.written.lock().unwrap().extend_from_slice(data);
            Ok(data.len() as i64)
        }

        fn flush(&mut self) -> Result<i64> {
            Ok(0)
        }
    }

    #[test]
    fn test_read_and_seek_through_native_stream() {
        let host = MockHost {
            data: vec![1, 2, 3, 4, 5],
            ..Default::default()
        };
        let stream = create_host_stream(Box::new(host));
        let native = unsafe { &mut *stream };

        let mut buf = [0u8; 3];
        assert_eq!(native.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);

        assert_eq!(native.seek(SeekFrom::End(-1)).unwrap(), 4);
        let mut buf = [0u8; 3];
        assert_eq!(native.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);

        unsafe { release_host_stream(stream) };
    }

    #[test]
    fn test_seek_modes_forwarded_unchanged() {
        let seeks = Arc::new(Mutex::new(Vec::new()));
        let host = MockHost {
            data: vec![0; 10],
            seeks: seeks.clone(),
            ..Default::default()
        };
        let stream = create_host_stream(Box::new(host));
        let context = unsafe { (*stream).take_context() };

        unsafe {
            assert_eq!(seek_callback(context, 4, 0), 4);
            assert_eq!(seek_callback(context, 2, 1), 6);
            assert_eq!(seek_callback(context, -3, 2), 7);
            // unknown modes reach the host, which rejects them
            assert_eq!(seek_callback(context, 0, 7), -1);
        }
        assert_eq!(*seeks.lock().unwrap(), [(4, 0), (2, 1), (-3, 2), (0, 7)]);
        assert!(crate::Error::take_last()
            .unwrap()
            .to_string()
            .contains("bad seek mode 7"));

        drop(unsafe { Box::from_raw(context as *mut HostStreamContext) });
        unsafe { c2pa_release_stream(stream) };
    }

    #[test]
    fn test_read_count_beyond_buffer_fails() {
        let host = MockHost {
            data: vec![0; 10],
            read_override: Some(5),
            ..Default::default()
        };
        let stream = create_host_stream(Box::new(host));
        let context = unsafe { (*stream).take_context() };

        let mut buf = [0u8; 4];
        let result = unsafe { read_callback(context, buf.as_mut_ptr(), buf.len() as isize) };
        assert_eq!(result, -1);

        drop(unsafe { Box::from_raw(context as *mut HostStreamContext) });
        unsafe { c2pa_release_stream(stream) };
    }

    #[test]
    fn test_negative_read_count_fails() {
        let host = MockHost {
            read_override: Some(-3),
            ..Default::default()
        };
        let stream = create_host_stream(Box::new(host));
        let native = unsafe { &mut *stream };

        let mut buf = [0u8; 4];
        assert!(native.read(&mut buf).is_err());

        unsafe { release_host_stream(stream) };
    }

    #[test]
    fn test_oversized_buffer_rejected() {
        let host = MockHost::default();
        let stream = create_host_stream(Box::new(host));
        let context = unsafe { (*stream).take_context() };

        // The length is rejected before the pointer is touched.
        let len = jint::MAX as isize + 1;
        let result = unsafe { write_callback(context, std::ptr::null(), len) };
        assert_eq!(result, -1);
        assert_eq!(
            crate::Error::take_last().unwrap().to_string(),
            "Io: write callback failed: Requested buffer too large for JNI"
        );

        drop(unsafe { Box::from_raw(context as *mut HostStreamContext) });
        unsafe { c2pa_release_stream(stream) };
    }

    #[test]
    fn test_write_and_flush() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let host = MockHost {
            written: written.clone(),
            ..Default::default()
        };
        let stream = create_host_stream(Box::new(host));
        let native = unsafe { &mut *stream };

        native.write_all(b"c2pa").unwrap();
        native.flush().unwrap();
        assert_eq!(*written.lock().unwrap(), b"c2pa");

        unsafe { release_host_stream(stream) };
    }

    #[test]
    fn test_release_drops_host() {
        let released = Arc::new(AtomicBool::new(false));
        let host = MockHost {
            released: ReleaseFlag(released.clone()),
            ..Default::default()
        };
        let stream = create_host_stream(Box::new(host));
        assert!(!released.load(Ordering::SeqCst));

        unsafe { release_host_stream(stream) };
        assert!(released.load(Ordering::SeqCst));

        // null is ignored
        unsafe { release_host_stream(std::ptr::null_mut()) };
    }

    #[test]
    fn test_released_context_fails_callbacks() {
        let stream = create_host_stream(Box::new(MockHost::default()));
        let context = unsafe { (*stream).take_context() };
        drop(unsafe { Box::from_raw(context as *mut HostStreamContext) });

        unsafe {
            assert_eq!(flush_callback(std::ptr::null_mut()), -1);
            let native = &mut *stream;
            assert!(native.flush().is_err());
            c2pa_release_stream(stream);
        }
    }
}
