pub mod color;
pub mod domain;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
