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

//! C2PA for the JVM.
//!
//! Two layers live here. The `c2pa_*` functions are a C ABI over the c2pa
//! crate with a thread-local last error. The `bridge` module exposes that ABI
//! to `org.contentauth.c2pa` through JNI, routing stream and signer callbacks
//! back into the host runtime from whichever thread the c2pa crate uses.

// Declare foundational modules first
mod error;

// Then macros that depend on them
#[macro_use]
mod ffi_macros;

// Then everything else
mod bridge;
mod c2pa_stream;
mod c_api;
#[cfg(feature = "file_io")]
mod json_api;
mod signer_info;

pub use bridge::lifecycle::{JNI_OnLoad, JNI_OnUnload};
#[cfg(test)]
pub(crate) use c2pa_stream::TestC2paStream;
pub use c2pa_stream::{
    c2pa_create_stream, c2pa_release_stream, C2paSeekMode, C2paStream, FlushCallback,
    ReadCallback, SeekCallback, StreamContext, WriteCallback,
};
pub use c_api::*;
pub use error::{Error, Result};
#[cfg(feature = "file_io")]
pub use json_api::{read_file, read_ingredient_file, sign_file};
pub use signer_info::SignerInfo;
