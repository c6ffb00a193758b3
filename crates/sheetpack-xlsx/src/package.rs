//! Open Packaging Convention (OPC) ZIP handling.
//!
//! A [`SheetPackage`] inflates the full ZIP into memory as a part-name →
//! bytes map. Parts the codec does not model are carried through a save
//! untouched, which is what keeps relationship targets (themes, pivot caches,
//! legacy drawings…) byte-identical across round trips.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use thiserror::Error;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("missing required part: {0}")]
    MissingPart(String),
}

/// An OPC package held fully in memory.
#[derive(Clone, Debug, Default)]
pub struct SheetPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl SheetPackage {
    /// An empty package (used when creating a workbook from scratch).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Inflate a ZIP archive into a part map.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.insert(name, data);
        }
        Ok(Self { parts })
    }

    /// Bytes of a part, if present.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|b| b.as_slice())
    }

    /// Bytes of a part, failing when absent.
    pub fn part_required(&self, name: &str) -> Result<&[u8], PackageError> {
        self.part(name)
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Insert or replace a part.
    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.parts.insert(name.into(), bytes);
    }

    /// Remove a part, returning its bytes when it existed.
    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name)
    }

    /// Part names in deterministic (lexicographic) order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|s| s.as_str())
    }

    pub fn parts_map(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.parts
    }

    pub fn parts_map_mut(&mut self) -> &mut BTreeMap<String, Vec<u8>> {
        &mut self.parts
    }

    /// Re-pack the parts into a ZIP archive.
    ///
    /// Deterministic ordering helps debugging and makes fixtures stable.
    pub fn to_vec(&self) -> Result<Vec<u8>, PackageError> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, bytes) in &self.parts {
            zip.start_file(name, options)?;
            zip.write_all(bytes)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn zip_roundtrip_preserves_part_bytes() {
        let bytes = build_zip(&[("a/b.xml", b"<x/>"), ("c.xml", b"<y/>")]);
        let pkg = SheetPackage::from_bytes(&bytes).unwrap();
        assert_eq!(pkg.part("a/b.xml"), Some(b"<x/>".as_slice()));

        let repacked = pkg.to_vec().unwrap();
        let pkg2 = SheetPackage::from_bytes(&repacked).unwrap();
        assert_eq!(pkg.parts_map(), pkg2.parts_map());
    }

    #[test]
    fn missing_part_is_an_error() {
        let pkg = SheetPackage::empty();
        assert!(matches!(
            pkg.part_required("xl/workbook.xml"),
            Err(PackageError::MissingPart(_))
        ));
    }
}
