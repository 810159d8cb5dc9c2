// src/pgp.rs

//! Public key decoding for archive definitions.
//!
//! Archives name the OpenPGP keys their indexes are signed with. The
//! engine decodes each armored key and checks the declared key ID against
//! the decoded certificate; actual signature verification belongs to the
//! fetch pipeline.

use sequoia_openpgp as openpgp;

use openpgp::parse::Parse;

use crate::error::{Error, Result};

/// Decode an ASCII-armored OpenPGP public key.
pub fn decode_pub_key(armor: &[u8]) -> Result<openpgp::Cert> {
    openpgp::Cert::from_bytes(armor)
        .map_err(|e| Error::Crypto(format!("cannot parse public key armor: {e}")))
}

/// The 64-bit key ID of a certificate, as upper-case hex.
pub fn key_id(cert: &openpgp::Cert) -> String {
    cert.keyid().to_hex()
}
