use tracing::debug;

use crate::core::package::{Origin, Package};

/// Streaming gate in front of persistence.
///
/// A fetcher calls `start`, then `on_data` for every chunk, then exactly one
/// of `finalize` or `abort`. Downloaded bytes may only be stored when
/// `finalize` returned `true`.
pub trait Validator: Send {
    fn start(&mut self);

    fn on_data(&mut self, chunk: &[u8]);

    /// Decide on the complete body. `false` means the download is rejected.
    fn finalize(&mut self) -> bool;

    /// The transfer ended early. Must not inspect the partial body.
    fn abort(&mut self);
}

/// Validator that accepts a body only if it parses as a package manifest.
/// The parsed package is kept and handed over with [`ParsingValidator::into_package`].
pub struct ParsingValidator {
    buffer: Vec<u8>,
    package: Package,
}

impl ParsingValidator {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            package: Package::invalid(Origin::Remote),
        }
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn into_package(self) -> Package {
        self.package
    }
}

impl Default for ParsingValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for ParsingValidator {
    fn start(&mut self) {
        self.buffer.clear();
        self.package = Package::invalid(Origin::Remote);
    }

    fn on_data(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn finalize(&mut self) -> bool {
        self.package = Package::from_manifest_contents(&self.buffer);
        debug!(
            "Manifest of {} bytes parsed, valid={}",
            self.buffer.len(),
            self.package.is_valid()
        );
        self.buffer = Vec::new();
        self.package.is_valid()
    }

    fn abort(&mut self) {
        self.buffer = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{ "files": { "bin": { "type": "directory" } } }"#;

    #[test]
    fn chunked_body_is_reassembled() {
        let mut v = ParsingValidator::new();
        v.start();
        v.on_data(&[]);
        for chunk in MANIFEST.as_bytes().chunks(3) {
            v.on_data(chunk);
        }
        assert!(v.finalize());
        assert!(v.package().folders().contains("bin"));
    }

    #[test]
    fn start_resets_previous_success() {
        let mut v = ParsingValidator::new();
        v.start();
        v.on_data(MANIFEST.as_bytes());
        assert!(v.finalize());

        v.start();
        assert!(!v.package().is_valid());

        v.on_data(b"{ broken");
        assert!(!v.finalize());
        assert!(!v.into_package().is_valid());
    }

    #[test]
    fn restart_discards_stale_bytes() {
        let mut v = ParsingValidator::new();
        v.start();
        v.on_data(b"garbage from an earlier attempt");
        v.abort();

        v.start();
        v.on_data(MANIFEST.as_bytes());
        assert!(v.finalize());
    }

    #[test]
    fn abort_never_parses() {
        let mut v = ParsingValidator::new();
        v.start();
        v.on_data(MANIFEST.as_bytes());
        v.abort();
        assert!(!v.package().is_valid());
    }

    #[test]
    fn finalize_without_data_rejects() {
        let mut v = ParsingValidator::new();
        v.start();
        assert!(!v.finalize());
    }
}
