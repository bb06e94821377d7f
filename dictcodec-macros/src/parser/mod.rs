//! Parsers turning derive input into IR.

pub mod attributes;
pub mod enum_parser;
pub mod struct_parser;
