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

//! Type, annotation and signature patterns and their parser

pub mod annotation_pattern;
pub mod modifiers;
pub mod name_pattern;
pub mod parser;
pub mod signature_pattern;
pub mod type_pattern;
pub mod type_pattern_list;

pub use annotation_pattern::{AnnotationPatternList, AnnotationTypePattern, NamedValueConstraint};
pub use modifiers::ModifiersPattern;
pub use name_pattern::NamePattern;
pub use parser::{ParseError, PatternParser, parse_pointcut, parse_signature_pattern, parse_type_pattern, parse_type_pattern_list};
pub use signature_pattern::{SignaturePattern, ThrowsPattern};
pub use type_pattern::{ExactTypePattern, MatchKind, TypePattern, WildTypePattern};
pub use type_pattern_list::TypePatternList;
