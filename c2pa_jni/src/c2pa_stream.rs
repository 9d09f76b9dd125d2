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

use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    os::raw::c_int,
};

use crate::Error;

#[repr(C)]
#[derive(Debug)]
/// An opaque struct to hold a context value for the stream callbacks.
pub struct StreamContext;

/// Seek modes passed to the seek callback.
///
/// The callback receives a plain `c_int` so values outside this set reach
/// the host unchanged and are rejected there.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum C2paSeekMode {
    /// Seeks from the start of the stream.
    Start = 0,
    /// Seeks from the current position in the stream.
    Current = 1,
    /// Seeks from the end of the stream.
    End = 2,
}

/// Reads up to `len` bytes into `data`.
///
/// Returns the number of bytes read, or a negative number for an error.
pub type ReadCallback =
    unsafe extern "C" fn(context: *mut StreamContext, data: *mut u8, len: isize) -> isize;

/// Moves to `offset` relative to `mode`.
///
/// Returns the new absolute position, or a negative number for an error.
pub type SeekCallback =
    unsafe extern "C" fn(context: *mut StreamContext, offset: isize, mode: c_int) -> isize;

/// Writes `len` bytes from `data`.
///
/// Returns the number of bytes written, or a negative number for an error.
pub type WriteCallback =
    unsafe extern "C" fn(context: *mut StreamContext, data: *const u8, len: isize) -> isize;

/// Returns 0 for success, or a negative number for an error.
pub type FlushCallback = unsafe extern "C" fn(context: *mut StreamContext) -> isize;

/// A Read/Write/Seek stream whose operations are delegated to callbacks
/// supplied by the embedding language.
#[repr(C)]
#[derive(Debug)]
pub struct C2paStream {
    context: *mut StreamContext,
    reader: ReadCallback,
    seeker: SeekCallback,
    writer: WriteCallback,
    flusher: FlushCallback,
}

impl C2paStream {
    /// Creates a new C2paStream from context with callbacks.
    ///
    /// # Safety
    /// The context and the callbacks must remain valid for the lifetime of the C2paStream.
    ///
    /// The resulting C2paStream must be released by calling c2pa_release_stream.
    pub unsafe fn new(
        context: *mut StreamContext,
        reader: ReadCallback,
        seeker: SeekCallback,
        writer: WriteCallback,
        flusher: FlushCallback,
    ) -> Self {
        Self {
            context,
            reader,
            seeker,
            writer,
            flusher,
        }
    }

    /// Detaches the context so its owner can release it.
    ///
    /// The stream must not be used for I/O afterwards.
    pub fn take_context(&mut self) -> *mut StreamContext {
        std::mem::replace(&mut self.context, std::ptr::null_mut())
    }

    fn check_context(&self) -> io::Result<()> {
        if self.context.is_null() {
            return Err(io::Error::other("stream context has been released"));
        }
        Ok(())
    }
}

// Builds an io::Error from the failure a callback recorded, if any.
fn callback_error(operation: &str) -> io::Error {
    match Error::take_last() {
        Some(err) => io::Error::other(err.to_string()),
        None => io::Error::other(format!("stream {operation} callback failed")),
    }
}

impl Read for C2paStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_context()?;
        if buf.len() > isize::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Read buffer is too large",
            ));
        }

        let bytes_read = unsafe { (self.reader)(self.context, buf.as_mut_ptr(), buf.len() as isize) };
        if bytes_read < 0 {
            return Err(callback_error("read"));
        }
        if bytes_read as usize > buf.len() {
            return Err(io::Error::other(format!(
                "read callback returned {bytes_read} bytes for a {} byte buffer",
                buf.len()
            )));
        }
        Ok(bytes_read as usize)
    }
}

impl Seek for C2paStream {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        self.check_context()?;
        let (pos, mode) = match from {
            SeekFrom::Current(pos) => (i128::from(pos), C2paSeekMode::Current),
            SeekFrom::Start(pos) => (i128::from(pos), C2paSeekMode::Start),
            SeekFrom::End(pos) => (i128::from(pos), C2paSeekMode::End),
        };
        // The callback takes an isize, which is 32 bits on some Android ABIs.
        let pos = isize::try_from(pos).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Seek offset {pos} does not fit the platform offset type"),
            )
        })?;

        let new_pos = unsafe { (self.seeker)(self.context, pos, mode as c_int) };
        if new_pos < 0 {
            return Err(callback_error("seek"));
        }
        Ok(new_pos as u64)
    }
}

impl Write for C2paStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_context()?;
        if buf.len() > isize::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Write buffer is too large",
            ));
        }
        let bytes_written = unsafe { (self.writer)(self.context, buf.as_ptr(), buf.len() as isize) };
        if bytes_written < 0 {
            return Err(callback_error("write"));
        }
        Ok(bytes_written as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_context()?;
        let err = unsafe { (self.flusher)(self.context) };
        if err < 0 {
            return Err(callback_error("flush"));
        }
        Ok(())
    }
}

unsafe impl Send for C2paStream {}
unsafe impl Sync for C2paStream {}

/// Creates a new C2paStream from context with callbacks.
///
/// This allows implementing streams in other languages.
///
/// # Safety
/// The context must remain valid for the lifetime of the C2paStream.
///
/// The resulting C2paStream must be released by calling c2pa_release_stream.
#[no_mangle]
pub unsafe extern "C" fn c2pa_create_stream(
    context: *mut StreamContext,
    reader: ReadCallback,
    seeker: SeekCallback,
    writer: WriteCallback,
    flusher: FlushCallback,
) -> *mut C2paStream {
    Box::into_raw(Box::new(C2paStream::new(
        context, reader, seeker, writer, flusher,
    )))
}

/// Releases a C2paStream allocated by Rust.
///
/// The context is not touched; it belongs to whoever created the stream.
///
/// # Safety
/// Can only be released once and is invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_release_stream(stream: *mut C2paStream) {
    if !stream.is_null() {
        drop(Box::from_raw(stream));
    }
}

/// A cursor backed stream for exercising the C ABI from Rust tests.
#[cfg(test)]
pub(crate) struct TestC2paStream {
    cursor: io::Cursor<Vec<u8>>,
}

#[cfg(test)]
impl TestC2paStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            cursor: io::Cursor::new(data),
        }
    }

    unsafe fn from_context<'a>(context: *mut StreamContext) -> &'a mut TestC2paStream {
        &mut *(context as *mut TestC2paStream)
    }

    unsafe extern "C" fn reader(context: *mut StreamContext, data: *mut u8, len: isize) -> isize {
        let stream = Self::from_context(context);
        let data = std::slice::from_raw_parts_mut(data, len as usize);
        match stream.cursor.read(data) {
            Ok(bytes) => bytes as isize,
            Err(e) => {
                Error::Io(e.to_string()).set_last();
                -1
            }
        }
    }

    unsafe extern "C" fn seeker(context: *mut StreamContext, offset: isize, mode: c_int) -> isize {
        let stream = Self::from_context(context);
        let from = match mode {
            0 if offset >= 0 => SeekFrom::Start(offset as u64),
            1 => SeekFrom::Current(offset as i64),
            2 => SeekFrom::End(offset as i64),
            _ => {
                Error::Io(format!("invalid seek: mode {mode}, offset {offset}")).set_last();
                return -1;
            }
        };
        match stream.cursor.seek(from) {
            Ok(pos) => pos as isize,
            Err(e) => {
                Error::Io(e.to_string()).set_last();
                -1
            }
        }
    }

    unsafe extern "C" fn writer(context: *mut StreamContext, data: *const u8, len: isize) -> isize {
        let stream = Self::from_context(context);
        let data = std::slice::from_raw_parts(data, len as usize);
        match stream.cursor.write(data) {
            Ok(bytes) => bytes as isize,
            Err(e) => {
                Error::Io(e.to_string()).set_last();
                -1
            }
        }
    }

    unsafe extern "C" fn flusher(_context: *mut StreamContext) -> isize {
        0
    }

    pub fn into_c_stream(self) -> C2paStream {
        unsafe {
            C2paStream::new(
                Box::into_raw(Box::new(self)) as *mut StreamContext,
                Self::reader,
                Self::seeker,
                Self::writer,
                Self::flusher,
            )
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> C2paStream {
        Self::new(data).into_c_stream()
    }

    pub fn from_c_stream(mut c_stream: C2paStream) -> Self {
        let context = c_stream.take_context();
        unsafe { *Box::from_raw(context as *mut TestC2paStream) }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn drop_c_stream(c_stream: C2paStream) {
        drop(Self::from_c_stream(c_stream));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cstream_read() {
        let mut c_stream = TestC2paStream::from_bytes(vec![1, 2, 3, 4, 5]);

        let mut buf = [0u8; 3];
        assert_eq!(c_stream.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);

        let mut buf = [0u8; 3];
        assert_eq!(c_stream.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [4, 5, 0]);

        TestC2paStream::drop_c_stream(c_stream);
    }

    #[test]
    fn test_cstream_seek() {
        let mut c_stream = TestC2paStream::from_bytes(vec![1, 2, 3, 4, 5]);

        c_stream.seek(SeekFrom::Start(2)).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(c_stream.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [3, 4, 5]);

        c_stream.seek(SeekFrom::End(-2)).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(c_stream.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [4, 5]);

        c_stream.seek(SeekFrom::Current(-4)).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(c_stream.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [2, 3, 4]);

        TestC2paStream::drop_c_stream(c_stream);
    }

    #[test]
    fn test_cstream_write_overwrite() {
        let mut c_stream = TestC2paStream::from_bytes(vec![1, 2, 3, 4, 5]);

        c_stream.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(c_stream.write(&[9, 9]).unwrap(), 2);
        c_stream.flush().unwrap();

        let data = TestC2paStream::from_c_stream(c_stream).into_inner();
        assert_eq!(data, [1, 2, 9, 9, 5]);
    }

    #[test]
    fn test_cstream_seek_before_start() {
        let mut c_stream = TestC2paStream::from_bytes(vec![1, 2, 3, 4, 5]);

        let err = c_stream.seek(SeekFrom::Current(-20)).unwrap_err();
        assert!(err.to_string().starts_with("Io: "));
        // the callback's message is consumed by the io::Error
        assert!(Error::last_message().is_none());

        TestC2paStream::drop_c_stream(c_stream);
    }

    #[test]
    fn test_cstream_seek_offset_out_of_range() {
        let mut c_stream = TestC2paStream::from_bytes(vec![1, 2, 3]);

        let err = c_stream.seek(SeekFrom::Start(u64::MAX)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        // rejected before the callback runs
        assert!(Error::last_message().is_none());
        if isize::try_from(i64::MAX).is_err() {
            let err = c_stream.seek(SeekFrom::End(i64::MAX)).unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        }
        assert_eq!(c_stream.seek(SeekFrom::Current(0)).unwrap(), 0);

        TestC2paStream::drop_c_stream(c_stream);
    }

    #[test]
    fn test_cstream_released_context() {
        let mut c_stream = TestC2paStream::from_bytes(vec![1, 2, 3]);
        let context = c_stream.take_context();

        let mut buf = [0u8; 3];
        assert!(c_stream.read(&mut buf).is_err());
        assert!(c_stream.flush().is_err());

        drop(unsafe { Box::from_raw(context as *mut TestC2paStream) });
    }

    #[test]
    fn test_create_stream() {
        let context = Box::into_raw(Box::new(TestC2paStream::new(vec![1, 2, 3, 4, 5])));

        let c2pa_stream = unsafe {
            c2pa_create_stream(
                context as *mut StreamContext,
                TestC2paStream::reader,
                TestC2paStream::seeker,
                TestC2paStream::writer,
                TestC2paStream::flusher,
            )
        };

        let mut buf = [0u8; 3];
        unsafe { &mut *c2pa_stream }
            .read(&mut buf)
            .expect("Failed to read from C2paStream");
        assert_eq!(buf, [1, 2, 3]);

        unsafe { c2pa_release_stream(c2pa_stream) };
        drop(unsafe { Box::from_raw(context) });
    }
}
