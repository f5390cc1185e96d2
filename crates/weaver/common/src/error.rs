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

//! Error types for the fallible parts of the weaver
//!
//! Matching itself never fails; these cover configuration loading and the
//! persisted form of pointcuts, patterns and mungers.

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::config::WorldConfig`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the versioned binary codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Input too short: expected a {expected}-byte header, found {found} bytes")]
    Truncated { expected: usize, found: usize },

    #[error("Unexpected node family {found:#04x} (expected {expected:#04x})")]
    FamilyMismatch { expected: u8, found: u8 },

    #[error("Unsupported format version {found} (this build reads up to {supported})")]
    UnsupportedVersion { found: u8, supported: u8 },

    #[error("Kind tag {header:#04x} in header does not match decoded kind {decoded:#04x}")]
    KindMismatch { header: u8, decoded: u8 },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("{remaining} trailing bytes after payload")]
    TrailingBytes { remaining: usize },
}
