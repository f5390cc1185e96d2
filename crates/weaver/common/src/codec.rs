// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Versioned binary codec for persisted weaving state
//!
//! Every persisted node is written as a three-byte header followed by a
//! bincode payload:
//!
//! ```text
//! +--------+------+---------+-------------------+
//! | family | kind | version | bincode(payload)  |
//! +--------+------+---------+-------------------+
//! ```
//!
//! `family` distinguishes pointcuts from patterns and mungers, `kind` is the
//! node's own tag and `version` the format version. Reading checks all three
//! so that state written by an incompatible build is rejected instead of
//! being misinterpreted.

use crate::error::CodecError;
use serde::{Serialize, de::DeserializeOwned};

/// Current format version written by [`write`]
pub const FORMAT_VERSION: u8 = 1;

/// Size of the header preceding every payload
pub const HEADER_LEN: usize = 3;

/// A node that can be persisted through the codec
pub trait Persistent: Serialize + DeserializeOwned {
    /// Tag identifying the node family (pointcut, type pattern, ...)
    const FAMILY: u8;

    /// Tag identifying the concrete kind of this value within its family
    fn kind_tag(&self) -> u8;
}

/// Serialize `value` with its header
pub fn write<T: Persistent>(value: &T) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| CodecError::Encode(e.to_string()))?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(T::FAMILY);
    out.push(value.kind_tag());
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Deserialize a value previously produced by [`write`]
pub fn read<T: Persistent>(data: &[u8]) -> Result<T, CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            expected: HEADER_LEN,
            found: data.len(),
        });
    }
    let (family, kind, version) = (data[0], data[1], data[2]);
    if family != T::FAMILY {
        return Err(CodecError::FamilyMismatch { expected: T::FAMILY, found: family });
    }
    if version == 0 || version > FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let (value, consumed): (T, usize) = bincode::serde::decode_from_slice(&data[HEADER_LEN..], bincode::config::standard()).map_err(|e| CodecError::Decode(e.to_string()))?;
    let remaining = data.len() - HEADER_LEN - consumed;
    if remaining != 0 {
        return Err(CodecError::TrailingBytes { remaining });
    }
    if value.kind_tag() != kind {
        return Err(CodecError::KindMismatch {
            header: kind,
            decoded: value.kind_tag(),
        });
    }
    Ok(value)
}
