//! Property-test modules for the matcher.

mod match_properties;
