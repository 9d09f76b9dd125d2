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

//! File path based operations, available with the `file_io` feature.

use c2pa::{Builder, Ingredient, Reader, Relationship};

use crate::{Error, Result, SignerInfo};

/// Returns ManifestStore JSON string from a file path.
///
/// If data_dir is provided, any thumbnail or c2pa data will be written to that folder.
/// Any Validation errors will be reported in the validation_status field.
pub fn read_file(path: &str, data_dir: Option<String>) -> Result<String> {
    let reader = Reader::from_file(path).map_err(Error::from_c2pa_error)?;
    let json = reader.json();
    if let Some(dir) = data_dir {
        reader.to_folder(&dir).map_err(Error::from_c2pa_error)?;
    }
    Ok(json)
}

/// Returns an Ingredient JSON string from a file path.
///
/// Thumbnails and manifest data for the ingredient are written to data_dir.
pub fn read_ingredient_file(path: &str, data_dir: &str) -> Result<String> {
    let ingredient =
        Ingredient::from_file_with_folder(path, data_dir).map_err(Error::from_c2pa_error)?;
    Ok(ingredient.to_string())
}

/// Adds a manifest to the source file and writes the result to the destination file.
///
/// Returns the binary manifest data. Any file paths in the manifest are read
/// relative to data_dir when it is provided.
pub fn sign_file(
    source: &str,
    dest: &str,
    manifest_json: &str,
    signer_info: &SignerInfo,
    data_dir: Option<String>,
) -> Result<Vec<u8>> {
    let mut builder = Builder::from_json(manifest_json).map_err(Error::from_c2pa_error)?;

    if let Some(path) = data_dir {
        builder.set_base_path(path);
    }

    // An existing manifest store in the source becomes the parent unless one was named.
    if !builder.definition.ingredients.iter().any(|i| i.is_parent()) {
        let mut source_ingredient =
            Ingredient::from_file(source).map_err(Error::from_c2pa_error)?;
        if source_ingredient.manifest_data().is_some() {
            source_ingredient.set_relationship(Relationship::ParentOf);
            builder.add_ingredient(source_ingredient);
        }
    }

    let signer = signer_info.signer()?;

    builder
        .sign_file(&*signer, source, dest)
        .map_err(Error::from_c2pa_error)
}
