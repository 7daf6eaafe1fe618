//! Property-test modules for the heap algebra.

mod algebra_properties;
