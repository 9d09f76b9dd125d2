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

//! The native C ABI over the c2pa crate.
//!
//! Every function reports failure through a null or negative return and
//! records the cause, retrievable once with [c2pa_error].

use std::{
    ffi::{c_uchar, CString},
    os::raw::{c_char, c_int, c_void},
};

use c2pa::{assertions::DataHash, settings::Settings, CallbackSigner, SigningAlg};

#[cfg(feature = "file_io")]
use crate::json_api::{read_file, read_ingredient_file, sign_file};
use crate::{c2pa_stream::C2paStream, error::Error, signer_info::SignerInfo};

/// A manifest builder owned by the caller through a raw pointer.
pub type C2paBuilder = c2pa::Builder;

/// A manifest reader owned by the caller through a raw pointer.
pub type C2paReader = c2pa::Reader;

/// Length in bytes of an Ed25519 signature.
pub const ED25519_SIGNATURE_LEN: usize = 64;

/// List of supported signing algorithms.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum C2paSigningAlg {
    Es256,
    Es384,
    Es512,
    Ps256,
    Ps384,
    Ps512,
    Ed25519,
}

impl From<C2paSigningAlg> for SigningAlg {
    fn from(alg: C2paSigningAlg) -> Self {
        match alg {
            C2paSigningAlg::Es256 => SigningAlg::Es256,
            C2paSigningAlg::Es384 => SigningAlg::Es384,
            C2paSigningAlg::Es512 => SigningAlg::Es512,
            C2paSigningAlg::Ps256 => SigningAlg::Ps256,
            C2paSigningAlg::Ps384 => SigningAlg::Ps384,
            C2paSigningAlg::Ps512 => SigningAlg::Ps512,
            C2paSigningAlg::Ed25519 => SigningAlg::Ed25519,
        }
    }
}

/// List of possible digital source types.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum C2paDigitalSourceType {
    Empty,
    TrainedAlgorithmicData,
    DigitalCapture,
    ComputationalCapture,
    NegativeFilm,
    PositiveFilm,
    Print,
    HumanEdits,
    CompositeWithTrainedAlgorithmicMedia,
    AlgorithmicallyEnhanced,
    DigitalCreation,
    DataDrivenMedia,
    TrainedAlgorithmicMedia,
    AlgorithmicMedia,
    ScreenCapture,
    VirtualRecording,
    Composite,
    CompositeCapture,
    CompositeSynthetic,
}

impl C2paDigitalSourceType {
    const ALL: [C2paDigitalSourceType; 19] = [
        Self::Empty,
        Self::TrainedAlgorithmicData,
        Self::DigitalCapture,
        Self::ComputationalCapture,
        Self::NegativeFilm,
        Self::PositiveFilm,
        Self::Print,
        Self::HumanEdits,
        Self::CompositeWithTrainedAlgorithmicMedia,
        Self::AlgorithmicallyEnhanced,
        Self::DigitalCreation,
        Self::DataDrivenMedia,
        Self::TrainedAlgorithmicMedia,
        Self::AlgorithmicMedia,
        Self::ScreenCapture,
        Self::VirtualRecording,
        Self::Composite,
        Self::CompositeCapture,
        Self::CompositeSynthetic,
    ];
}

impl TryFrom<i32> for C2paDigitalSourceType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| Error::NotSupported(format!("digital source type {value}")))
    }
}

impl From<C2paDigitalSourceType> for c2pa::DigitalSourceType {
    fn from(source_type: C2paDigitalSourceType) -> Self {
        use c2pa::DigitalSourceType as Dst;
        match source_type {
            C2paDigitalSourceType::Empty => Dst::Empty,
            C2paDigitalSourceType::TrainedAlgorithmicData => Dst::TrainedAlgorithmicData,
            C2paDigitalSourceType::DigitalCapture => Dst::DigitalCapture,
            C2paDigitalSourceType::ComputationalCapture => Dst::ComputationalCapture,
            C2paDigitalSourceType::NegativeFilm => Dst::NegativeFilm,
            C2paDigitalSourceType::PositiveFilm => Dst::PositiveFilm,
            C2paDigitalSourceType::Print => Dst::Print,
            C2paDigitalSourceType::HumanEdits => Dst::HumanEdits,
            C2paDigitalSourceType::CompositeWithTrainedAlgorithmicMedia => {
                Dst::CompositeWithTrainedAlgorithmicMedia
            }
            C2paDigitalSourceType::AlgorithmicallyEnhanced => Dst::AlgorithmicallyEnhanced,
            C2paDigitalSourceType::DigitalCreation => Dst::DigitalCreation,
            C2paDigitalSourceType::DataDrivenMedia => Dst::DataDrivenMedia,
            C2paDigitalSourceType::TrainedAlgorithmicMedia => Dst::TrainedAlgorithmicMedia,
            C2paDigitalSourceType::AlgorithmicMedia => Dst::AlgorithmicMedia,
            C2paDigitalSourceType::ScreenCapture => Dst::ScreenCapture,
            C2paDigitalSourceType::VirtualRecording => Dst::VirtualRecording,
            C2paDigitalSourceType::Composite => Dst::Composite,
            C2paDigitalSourceType::CompositeCapture => Dst::CompositeCapture,
            C2paDigitalSourceType::CompositeSynthetic => Dst::CompositeSynthetic,
        }
    }
}

/// Builder intent enumeration.
/// This specifies what kind of manifest to create.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum C2paBuilderIntent {
    /// A new digital creation with the given digital source type.
    /// The manifest must not have a parent ingredient.
    Create,
    /// An edit of a pre-existing parent asset.
    /// A parent ingredient is generated from the source stream if not otherwise provided.
    Edit,
    /// A restricted edit for non-editorial changes.
    /// There must be only one ingredient, as a parent.
    Update,
}

impl TryFrom<i32> for C2paBuilderIntent {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Create),
            1 => Ok(Self::Edit),
            2 => Ok(Self::Update),
            _ => Err(Error::NotSupported(format!("builder intent {value}"))),
        }
    }
}

pub struct C2paSigner {
    pub signer: Box<dyn c2pa::Signer>,
}

#[repr(C)]
/// Defines the configuration for a Signer.
///
/// The signer is created from the sign_cert and private_key fields.
/// An optional url to an RFC 3161 compliant time server will ensure the signature is timestamped.
pub struct C2paSignerInfo {
    /// The signing algorithm.
    pub alg: *const c_char,
    /// The public certificate chain in PEM format.
    pub sign_cert: *const c_char,
    /// The private key in PEM format.
    pub private_key: *const c_char,
    /// The timestamp authority URL or NULL.
    pub ta_url: *const c_char,
}

impl C2paSignerInfo {
    unsafe fn to_signer_info(&self) -> Option<SignerInfo> {
        Some(SignerInfo {
            alg: cstr_or_return!(self.alg, None),
            sign_cert: cstr_or_return!(self.sign_cert, None).into_bytes(),
            private_key: cstr_or_return!(self.private_key, None).into_bytes(),
            ta_url: cstr_option!(self.ta_url),
        })
    }
}

/// Signs `data` on behalf of a callback signer.
///
/// `context` is the value given to [c2pa_signer_create]. The signature is written
/// to `signed_bytes`, which holds `signed_len` bytes.
/// Returns the signature length, or a negative number for an error.
pub type SignerCallback = unsafe extern "C" fn(
    context: *const (),
    data: *const c_uchar,
    len: usize,
    signed_bytes: *mut c_uchar,
    signed_len: usize,
) -> isize;

// The returned value MUST be released by calling c2pa_string_free.
unsafe fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(err) => {
            Error::Encoding(err.to_string()).set_last();
            std::ptr::null_mut()
        }
    }
}

unsafe fn slice_or_error<'a>(ptr: *const c_uchar, len: usize, param: &str) -> Result<&'a [u8], Error> {
    if ptr.is_null() {
        return Err(Error::NullParameter(param.to_string()));
    }
    if len == 0 || len > isize::MAX as usize {
        return Err(Error::Other(format!(
            "Buffer size {len} is invalid for parameter '{param}'"
        )));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

// Hands a manifest buffer to the caller; it is released with c2pa_manifest_bytes_free.
unsafe fn manifest_bytes_out(manifest_bytes: Vec<u8>, manifest_bytes_ptr: *mut *const c_uchar) -> i64 {
    let len = manifest_bytes.len() as i64;
    if !manifest_bytes_ptr.is_null() {
        *manifest_bytes_ptr = Box::into_raw(manifest_bytes.into_boxed_slice()) as *const c_uchar;
    }
    len
}

/// Returns a version string for logging.
///
/// # Safety
/// The returned value MUST be released by calling c2pa_string_free
/// and it is no longer valid after that call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_version() -> *mut c_char {
    let version = format!(
        "{}/{} {}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        c2pa::NAME,
        c2pa::VERSION
    );
    to_c_string(version)
}

/// Returns the last error message, or an empty string if there is none.
///
/// # Safety
/// The returned value MUST be released by calling c2pa_string_free
/// and it is no longer valid after that call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_error() -> *mut c_char {
    to_c_string(Error::last_message().unwrap_or_default())
}

/// Loads settings from a string in `json` or `toml` format.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns 0.
///
/// # Safety
/// Reads from NULL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn c2pa_load_settings(
    settings: *const c_char,
    format: *const c_char,
) -> c_int {
    let settings = cstr_or_return_int!(settings);
    let format = cstr_or_return_int!(format);
    ok_or_return_int!(Settings::from_string(&settings, &format), |_| 0)
}

/// Returns a ManifestStore JSON string from a file path.
///
/// Any thumbnails or other binary resources will be written to data_dir if provided.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_string_free.
#[cfg(feature = "file_io")]
#[no_mangle]
pub unsafe extern "C" fn c2pa_read_file(
    path: *const c_char,
    data_dir: *const c_char,
) -> *mut c_char {
    let path = cstr_or_return_null!(path);
    let data_dir = cstr_option!(data_dir);
    ok_or_return!(@local read_file(&path, data_dir), |json| to_c_string(json), std::ptr::null_mut())
}

/// Returns an Ingredient JSON string from a file path.
///
/// Any thumbnail or C2PA data will be written to data_dir.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_string_free.
#[cfg(feature = "file_io")]
#[no_mangle]
pub unsafe extern "C" fn c2pa_read_ingredient_file(
    path: *const c_char,
    data_dir: *const c_char,
) -> *mut c_char {
    let path = cstr_or_return_null!(path);
    let data_dir = cstr_or_return_null!(data_dir);
    ok_or_return!(
        @local read_ingredient_file(&path, &data_dir),
        |json| to_c_string(json),
        std::ptr::null_mut()
    )
}

/// Adds a signed manifest to the file at source_path and writes it to dest_path.
///
/// Returns an empty string on success.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_string_free.
#[cfg(feature = "file_io")]
#[no_mangle]
pub unsafe extern "C" fn c2pa_sign_file(
    source_path: *const c_char,
    dest_path: *const c_char,
    manifest: *const c_char,
    signer_info: &C2paSignerInfo,
    data_dir: *const c_char,
) -> *mut c_char {
    let source_path = cstr_or_return_null!(source_path);
    let dest_path = cstr_or_return_null!(dest_path);
    let manifest = cstr_or_return_null!(manifest);
    let data_dir = cstr_option!(data_dir);
    let Some(signer_info) = signer_info.to_signer_info() else {
        return std::ptr::null_mut();
    };

    ok_or_return!(
        @local sign_file(&source_path, &dest_path, &manifest, &signer_info, data_dir),
        |_manifest_bytes| to_c_string(String::new()),
        std::ptr::null_mut()
    )
}

/// Frees a string allocated by Rust.
///
/// # Safety
/// The string must not have been modified in C.
/// The string can only be freed once and is invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Creates and verifies a C2paReader from an asset stream with the given format.
///
/// # Errors
/// Returns NULL if there were errors, otherwise returns a pointer to a C2paReader.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_reader_free.
///
/// # Example
/// ```c
/// auto result = c2pa_reader_from_stream("image/jpeg", stream);
/// if (result == NULL) {
///     auto error = c2pa_error();
///     printf("Error: %s\n", error);
///     c2pa_string_free(error);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_from_stream(
    format: *const c_char,
    stream: *mut C2paStream,
) -> *mut C2paReader {
    let format = cstr_or_return_null!(format);
    let stream = deref_mut_or_return!(stream, std::ptr::null_mut());
    return_boxed!(C2paReader::from_stream(&format, stream))
}

/// Creates and verifies a C2paReader from an asset stream and separately supplied manifest data.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_reader_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_from_manifest_data_and_stream(
    format: *const c_char,
    stream: *mut C2paStream,
    manifest_data: *const c_uchar,
    manifest_size: usize,
) -> *mut C2paReader {
    let format = cstr_or_return_null!(format);
    let stream = deref_mut_or_return!(stream, std::ptr::null_mut());
    let manifest_bytes = ok_or_return!(
        @local slice_or_error(manifest_data, manifest_size, "manifest_data"),
        |bytes| bytes,
        std::ptr::null_mut()
    );
    return_boxed!(C2paReader::from_manifest_data_and_stream(
        manifest_bytes,
        &format,
        stream
    ))
}

/// Frees a C2paReader allocated by Rust.
///
/// # Safety
/// The C2paReader can only be freed once and is invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_free(reader_ptr: *mut C2paReader) {
    if !reader_ptr.is_null() {
        drop(Box::from_raw(reader_ptr));
    }
}

/// Returns a JSON string generated from a C2paReader.
///
/// # Safety
/// The returned value MUST be released by calling c2pa_string_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_json(reader_ptr: *mut C2paReader) -> *mut c_char {
    let reader = deref_mut_or_return!(reader_ptr, std::ptr::null_mut());
    to_c_string(reader.json())
}

/// Returns a detailed JSON string generated from a C2paReader.
///
/// # Safety
/// The returned value MUST be released by calling c2pa_string_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_detailed_json(reader_ptr: *mut C2paReader) -> *mut c_char {
    let reader = deref_mut_or_return!(reader_ptr, std::ptr::null_mut());
    to_c_string(reader.detailed_json())
}

/// Returns the remote url of the manifest if it was obtained remotely, otherwise NULL.
///
/// # Safety
/// reader_ptr must be a valid pointer to a C2paReader.
/// A non-null result MUST be released by calling c2pa_string_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_remote_url(reader_ptr: *mut C2paReader) -> *mut c_char {
    let reader = deref_mut_or_return!(reader_ptr, std::ptr::null_mut());
    match reader.remote_url() {
        Some(url) => to_c_string(url.to_string()),
        None => std::ptr::null_mut(),
    }
}

/// Returns true if the reader was created from an embedded manifest.
///
/// # Safety
/// reader_ptr must be a valid pointer to a C2paReader.
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_is_embedded(reader_ptr: *mut C2paReader) -> bool {
    let reader = deref_mut_or_return!(reader_ptr, false);
    reader.is_embedded()
}

/// Writes a C2paReader resource to a stream given a URI.
///
/// The resource uri should match an identifier in the manifest store.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns the number of bytes written.
///
/// # Safety
/// Reads from NULL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn c2pa_reader_resource_to_stream(
    reader_ptr: *mut C2paReader,
    uri: *const c_char,
    stream: *mut C2paStream,
) -> i64 {
    let reader = deref_mut_or_return_int!(reader_ptr);
    let uri = cstr_or_return_int!(uri);
    let stream = deref_mut_or_return_int!(stream);
    ok_or_return_int!(reader.resource_to_stream(&uri, stream), |len| len as i64)
}

/// Creates a C2paBuilder from a JSON manifest definition.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_builder_free.
///
/// # Example
/// ```c
/// auto result = c2pa_builder_from_json(manifest_json);
/// if (result == NULL) {
///     auto error = c2pa_error();
///     printf("Error: %s\n", error);
///     c2pa_string_free(error);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_from_json(manifest_json: *const c_char) -> *mut C2paBuilder {
    let manifest_json = cstr_or_return_null!(manifest_json);
    return_boxed!(C2paBuilder::from_json(&manifest_json))
}

/// Creates a C2paBuilder from an archive stream.
///
/// # Safety
/// The returned value MUST be released by calling c2pa_builder_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_from_archive(stream: *mut C2paStream) -> *mut C2paBuilder {
    let stream = deref_mut_or_return!(stream, std::ptr::null_mut());
    return_boxed!(C2paBuilder::from_archive(stream))
}

/// Frees a C2paBuilder allocated by Rust.
///
/// # Safety
/// The C2paBuilder can only be freed once and is invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_free(builder_ptr: *mut C2paBuilder) {
    if !builder_ptr.is_null() {
        drop(Box::from_raw(builder_ptr));
    }
}

/// Sets the builder intent on the Builder.
///
/// For the `Create` intent, `digital_source_type` is recorded on the
/// `c2pa.created` action. It is ignored for `Edit` and `Update`.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns 0.
///
/// # Safety
/// builder_ptr must be a valid pointer to a Builder.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_set_intent(
    builder_ptr: *mut C2paBuilder,
    intent: C2paBuilderIntent,
    digital_source_type: C2paDigitalSourceType,
) -> c_int {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let builder_intent = match intent {
        C2paBuilderIntent::Create => c2pa::BuilderIntent::Create(digital_source_type.into()),
        C2paBuilderIntent::Edit => c2pa::BuilderIntent::Edit,
        C2paBuilderIntent::Update => c2pa::BuilderIntent::Update,
    };
    builder.set_intent(builder_intent);
    0
}

/// Adds an action to the manifest the Builder is constructing.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns 0.
///
/// # Safety
/// Reads from NULL-terminated C strings.
///
/// # Example
/// ```c
/// const char* action_json = "{\"action\": \"com.example.test-action\"}";
/// int result = c2pa_builder_add_action(builder, action_json);
/// ```
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_add_action(
    builder_ptr: *mut C2paBuilder,
    action_json: *const c_char,
) -> c_int {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let action_json = cstr_or_return_int!(action_json);
    let action: serde_json::Value = ok_or_return_int!(
        serde_json::from_str::<serde_json::Value>(&action_json).map_err(c2pa::Error::JsonError),
        |value| value
    );
    ok_or_return_int!(builder.add_action(action), |_| 0)
}

/// Sets the no-embed flag on the Builder.
///
/// When set, signing produces a cloud or sidecar manifest instead of embedding it.
///
/// # Safety
/// builder_ptr must be a valid pointer to a Builder.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_set_no_embed(builder_ptr: *mut C2paBuilder) {
    let builder = deref_mut_or_return!(builder_ptr, ());
    builder.set_no_embed(true);
}

/// Sets the remote URL on the Builder.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns 0.
///
/// # Safety
/// Reads from NULL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_set_remote_url(
    builder_ptr: *mut C2paBuilder,
    remote_url: *const c_char,
) -> c_int {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let remote_url = cstr_or_return_int!(remote_url);
    builder.set_remote_url(remote_url);
    0
}

/// Adds a resource to the C2paBuilder.
///
/// The resource uri should match an identifier in the manifest definition.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns 0.
///
/// # Safety
/// Reads from NULL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_add_resource(
    builder_ptr: *mut C2paBuilder,
    uri: *const c_char,
    stream: *mut C2paStream,
) -> c_int {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let uri = cstr_or_return_int!(uri);
    let stream = deref_mut_or_return_int!(stream);
    ok_or_return_int!(builder.add_resource(&uri, stream), |_| 0)
}

/// Adds an ingredient described by `ingredient_json` and read from `source`.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns 0.
///
/// # Safety
/// Reads from NULL-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_add_ingredient_from_stream(
    builder_ptr: *mut C2paBuilder,
    ingredient_json: *const c_char,
    format: *const c_char,
    source: *mut C2paStream,
) -> c_int {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let ingredient_json = cstr_or_return_int!(ingredient_json);
    let format = cstr_or_return_int!(format);
    let source = deref_mut_or_return_int!(source);
    ok_or_return_int!(
        builder.add_ingredient_from_stream(ingredient_json, &format, source),
        |_| 0
    )
}

/// Writes an archive of the Builder to the destination stream.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns 0.
///
/// # Safety
/// builder_ptr and stream must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_to_archive(
    builder_ptr: *mut C2paBuilder,
    stream: *mut C2paStream,
) -> c_int {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let stream = deref_mut_or_return_int!(stream);
    ok_or_return_int!(builder.to_archive(stream), |_| 0)
}

/// Creates and writes a signed manifest from the C2paBuilder to the destination stream.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns the size of the manifest bytes.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// If manifest_bytes_ptr is not NULL, the returned bytes MUST be released by calling
/// c2pa_manifest_bytes_free with the returned size.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_sign(
    builder_ptr: *mut C2paBuilder,
    format: *const c_char,
    source: *mut C2paStream,
    dest: *mut C2paStream,
    signer_ptr: *mut C2paSigner,
    manifest_bytes_ptr: *mut *const c_uchar,
) -> i64 {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let format = cstr_or_return_int!(format);
    let source = deref_mut_or_return_int!(source);
    let dest = deref_mut_or_return_int!(dest);
    let c2pa_signer = deref_mut_or_return_int!(signer_ptr);

    let result = builder.sign(c2pa_signer.signer.as_ref(), &format, source, dest);
    ok_or_return_int!(result, |manifest_bytes| manifest_bytes_out(
        manifest_bytes,
        manifest_bytes_ptr
    ))
}

/// Creates a data hashed placeholder manifest, reserving `reserved_size` bytes for the signature.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns the size of the manifest bytes.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned bytes MUST be released by calling c2pa_manifest_bytes_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_data_hashed_placeholder(
    builder_ptr: *mut C2paBuilder,
    reserved_size: usize,
    format: *const c_char,
    manifest_bytes_ptr: *mut *const c_uchar,
) -> i64 {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let format = cstr_or_return_int!(format);
    ptr_or_return_int!(manifest_bytes_ptr);
    ok_or_return_int!(
        builder.data_hashed_placeholder(reserved_size, &format),
        |manifest_bytes| manifest_bytes_out(manifest_bytes, manifest_bytes_ptr)
    )
}

/// Signs a Builder using the given signer and data hash.
///
/// The data hash is a JSON `DataHash`. When `asset` is not NULL the hash is
/// computed from it, otherwise the hash in the JSON is used as given.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns the size of the manifest bytes.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned bytes MUST be released by calling c2pa_manifest_bytes_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_builder_sign_data_hashed_embeddable(
    builder_ptr: *mut C2paBuilder,
    signer_ptr: *mut C2paSigner,
    data_hash: *const c_char,
    format: *const c_char,
    asset: *mut C2paStream,
    manifest_bytes_ptr: *mut *const c_uchar,
) -> i64 {
    let builder = deref_mut_or_return_int!(builder_ptr);
    let c2pa_signer = deref_mut_or_return_int!(signer_ptr);
    let data_hash_json = cstr_or_return_int!(data_hash);
    let format = cstr_or_return_int!(format);
    ptr_or_return_int!(manifest_bytes_ptr);

    let mut data_hash: DataHash = ok_or_return_int!(
        serde_json::from_str::<DataHash>(&data_hash_json).map_err(c2pa::Error::JsonError),
        |data_hash| data_hash
    );
    if !asset.is_null() {
        ok_or_return_int!(data_hash.gen_hash_from_stream(&mut *asset), |_| ());
    }

    let result =
        builder.sign_data_hashed_embeddable(c2pa_signer.signer.as_ref(), &data_hash, &format);
    ok_or_return_int!(result, |manifest_bytes| manifest_bytes_out(
        manifest_bytes,
        manifest_bytes_ptr
    ))
}

/// Frees manifest bytes returned by the builder signing functions.
///
/// # Safety
/// `manifest_bytes_len` must be the size returned alongside the bytes.
/// The bytes can only be freed once and are invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_manifest_bytes_free(
    manifest_bytes_ptr: *const c_uchar,
    manifest_bytes_len: usize,
) {
    if !manifest_bytes_ptr.is_null() {
        drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
            manifest_bytes_ptr as *mut c_uchar,
            manifest_bytes_len,
        )));
    }
}

/// Creates a C2paSigner from a callback and configuration.
///
/// The callback is offered a buffer of twice the input length for the signature.
///
/// # Errors
/// Returns NULL if there were errors, otherwise returns a pointer to a C2paSigner.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_signer_free.
/// The context and callback must stay valid until then; they remain owned by the caller.
#[no_mangle]
pub unsafe extern "C" fn c2pa_signer_create(
    context: *const c_void,
    callback: SignerCallback,
    alg: C2paSigningAlg,
    certs: *const c_char,
    tsa_url: *const c_char,
) -> *mut C2paSigner {
    let certs = cstr_or_return_null!(certs);
    let tsa_url = cstr_option!(tsa_url);

    let c_callback = move |context: *const (), data: &[u8]| {
        let signed_len_max = data.len() * 2;
        let mut signed_bytes: Vec<u8> = vec![0; signed_len_max];
        let signed_size = unsafe {
            (callback)(
                context,
                data.as_ptr(),
                data.len(),
                signed_bytes.as_mut_ptr(),
                signed_len_max,
            )
        };
        if signed_size < 0 || signed_size as usize > signed_len_max {
            return Err(c2pa::Error::CoseSignature);
        }
        signed_bytes.truncate(signed_size as usize);
        Ok(signed_bytes)
    };

    let mut signer =
        CallbackSigner::new(c_callback, alg.into(), certs).set_context(context as *const ());
    if let Some(tsa_url) = tsa_url {
        signer = signer.set_tsa_url(tsa_url);
    }
    Box::into_raw(Box::new(C2paSigner {
        signer: Box::new(signer),
    }))
}

/// Creates a C2paSigner from PEM key material.
///
/// # Errors
/// Returns NULL if there were errors, otherwise returns a pointer to a C2paSigner.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be released by calling c2pa_signer_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_signer_from_info(signer_info: &C2paSignerInfo) -> *mut C2paSigner {
    let Some(signer_info) = signer_info.to_signer_info() else {
        return std::ptr::null_mut();
    };
    ok_or_return!(
        @local signer_info.signer(),
        |signer| Box::into_raw(Box::new(C2paSigner { signer })),
        std::ptr::null_mut()
    )
}

/// Returns the size to reserve for the signature for this signer.
///
/// # Errors
/// Returns -1 if there were errors, otherwise returns the size to reserve.
///
/// # Safety
/// The signer_ptr must be a valid pointer to a C2paSigner.
#[no_mangle]
pub unsafe extern "C" fn c2pa_signer_reserve_size(signer_ptr: *mut C2paSigner) -> i64 {
    let c2pa_signer = deref_mut_or_return_int!(signer_ptr);
    c2pa_signer.signer.reserve_size() as i64
}

/// Frees a C2paSigner allocated by Rust.
///
/// # Safety
/// The C2paSigner can only be freed once and is invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_signer_free(signer_ptr: *const C2paSigner) {
    if !signer_ptr.is_null() {
        drop(Box::from_raw(signer_ptr as *mut C2paSigner));
    }
}

/// Signs a byte array using the Ed25519 algorithm.
///
/// Returns a 64 byte signature, or NULL on error.
///
/// # Safety
/// Reads from NULL-terminated C strings.
/// The returned value MUST be freed by calling c2pa_signature_free.
#[no_mangle]
pub unsafe extern "C" fn c2pa_ed25519_sign(
    bytes: *const c_uchar,
    len: usize,
    private_key: *const c_char,
) -> *const c_uchar {
    let bytes = ok_or_return!(
        @local slice_or_error(bytes, len, "bytes"),
        |bytes| bytes,
        std::ptr::null()
    );
    let private_key = cstr_or_return!(private_key, std::ptr::null());

    let signature = ok_or_return!(
        CallbackSigner::ed25519_sign(bytes, private_key.as_bytes()),
        |signature: Vec<u8>| signature,
        std::ptr::null()
    );
    if signature.len() != ED25519_SIGNATURE_LEN {
        Error::Signature(format!(
            "Ed25519 signature must be {ED25519_SIGNATURE_LEN} bytes, got {}",
            signature.len()
        ))
        .set_last();
        return std::ptr::null();
    }
    Box::into_raw(signature.into_boxed_slice()) as *const c_uchar
}

/// Frees a signature returned by c2pa_ed25519_sign.
///
/// # Safety
/// The signature can only be freed once and is invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn c2pa_signature_free(signature_ptr: *const u8) {
    if !signature_ptr.is_null() {
        drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
            signature_ptr as *mut u8,
            ED25519_SIGNATURE_LEN,
        )));
    }
}
