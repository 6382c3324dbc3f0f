//! # confab_core
//!
//! Core domain logic for Confab.

pub mod assistants;
pub mod text;
pub mod turn;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
