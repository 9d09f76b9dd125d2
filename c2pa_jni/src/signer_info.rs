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

use c2pa::{create_signer, Signer, SigningAlg};
use serde::Deserialize;

use crate::{Error, Result};

/// Key material for a signer built directly from PEM data.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SignerInfo {
    /// Signing algorithm name, matched case-insensitively.
    pub alg: String,
    /// Certificate chain in PEM format.
    pub sign_cert: Vec<u8>,
    /// Private key in PEM format.
    pub private_key: Vec<u8>,
    /// Optional RFC 3161 timestamp authority URL.
    pub ta_url: Option<String>,
}

impl SignerInfo {
    fn alg(&self) -> Result<SigningAlg> {
        self.alg
            .to_lowercase()
            .parse()
            .map_err(|_| Error::Other("Invalid signing algorithm".to_string()))
    }

    /// Create a signer from the SignerInfo
    pub fn signer(&self) -> Result<Box<dyn Signer>> {
        create_signer::from_keys(
            &self.sign_cert,
            &self.private_key,
            self.alg()?,
            self.ta_url.clone(),
        )
        .map_err(Error::from_c2pa_error)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_signer_info_deserialize() {
        let json = json!({
            "alg": "Es256",
            "sign_cert": b"test_cert".to_vec(),
            "private_key": b"test_key".to_vec(),
            "ta_url": "https://timestamp.example.com"
        })
        .to_string();

        let signer_info: SignerInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(signer_info.alg, "Es256");
        assert_eq!(signer_info.sign_cert, b"test_cert");
        assert_eq!(signer_info.private_key, b"test_key");
        assert_eq!(
            signer_info.ta_url.as_deref(),
            Some("https://timestamp.example.com")
        );
    }

    #[test]
    fn test_signer_info_missing_fields() {
        let json = json!({
            "alg": "Es256",
            "sign_cert": b"test_cert".to_vec()
        })
        .to_string();

        let err = serde_json::from_str::<SignerInfo>(&json).unwrap_err();
        assert!(err.to_string().contains("missing field `private_key`"));
    }

    #[test]
    fn test_signer_info_invalid_algorithm() {
        let signer_info = SignerInfo {
            alg: "invalid_alg".to_string(),
            ..Default::default()
        };
        let result = signer_info.alg();
        assert_eq!(
            result.unwrap_err().to_string(),
            "Other: Invalid signing algorithm"
        );
    }

    #[test]
    fn test_signer_from_pem_fixtures() {
        let signer_info = SignerInfo {
            alg: "ES256".to_string(),
            sign_cert: include_bytes!("../tests/fixtures/certs/es256.pub").to_vec(),
            private_key: include_bytes!("../tests/fixtures/certs/es256.pem").to_vec(),
            ta_url: None,
        };
        let signer = signer_info.signer().unwrap();
        assert_eq!(signer.alg(), SigningAlg::Es256);
        assert!(signer.reserve_size() > 0);
    }

    #[test]
    fn test_signer_creation_fail() {
        let signer_info = SignerInfo {
            alg: "Es256".to_string(),
            sign_cert: b"test_cert".to_vec(),
            private_key: b"test_key".to_vec(),
            ta_url: None,
        };
        assert!(signer_info.signer().is_err());
    }
}
