//! Unit tests - properties of the compiler that need no fixtures
//!
//! Each module checks one guarantee end to end through the public API.

mod emission_property_tests;
mod pattern_library_tests;
mod sanitizer_tests;
