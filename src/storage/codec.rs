//! Coefficient blob encoding
//!
//! Layout: `[version: u8][count: u32 LE][count x f64 LE]`.

use crate::{Error, Result};

pub const BLOB_VERSION: u8 = 1;

const HEADER_LEN: usize = 1 + 4;

pub fn encode_coefficients(coefficients: &[f64]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(HEADER_LEN + coefficients.len() * 8);
    blob.push(BLOB_VERSION);
    blob.extend_from_slice(&(coefficients.len() as u32).to_le_bytes());
    blob.extend(coefficients.iter().flat_map(|c| c.to_le_bytes()));
    blob
}

pub fn decode_coefficients(blob: &[u8]) -> Result<Vec<f64>> {
    if blob.len() < HEADER_LEN {
        return Err(Error::Codec(format!("blob too short ({} bytes)", blob.len())));
    }
    if blob[0] != BLOB_VERSION {
        return Err(Error::Codec(format!("unsupported blob version {}", blob[0])));
    }

    let count = u32::from_le_bytes([blob[1], blob[2], blob[3], blob[4]]) as usize;
    let body = &blob[HEADER_LEN..];
    if body.len() != count * 8 {
        return Err(Error::Codec(format!(
            "expected {} coefficients ({} bytes), found {} bytes",
            count,
            count * 8,
            body.len()
        )));
    }

    Ok(body
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect())
}
