//! In-memory `.tar.gz` archives.

use flate2::Compression;
use flate2::write::GzEncoder;

/// Header modification time of every entry, so archives are reproducible.
pub const ENTRY_MTIME: u64 = 1_600_000_000;

/// Builds a gzip-compressed tarball from `(path, content)` entries.
#[derive(Debug, Default)]
pub struct TarballBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl TarballBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.entries.push((path.to_string(), content.as_bytes().to_vec()));
        self
    }

    /// Encode the archive.
    ///
    /// # Panics
    /// Panics if an entry path is rejected by `tar`.
    pub fn build(self) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in &self.entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(ENTRY_MTIME);
            builder
                .append_data(&mut header, path, content.as_slice())
                .unwrap_or_else(|e| panic!("TarballBuilder: append {path}: {e}"));
        }
        builder
            .into_inner()
            .and_then(|encoder| encoder.finish())
            .unwrap_or_else(|e| panic!("TarballBuilder: finish: {e}"))
    }
}
