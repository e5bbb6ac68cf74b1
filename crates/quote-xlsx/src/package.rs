use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Result, TemplateError};

/// A read-only template package plus the parts rebuilt during one fill.
///
/// The template bytes are never modified. On write, every entry without an override is
/// raw-copied (compressed payload and all), so untouched parts are byte-identical to the input;
/// overridden entries are deflated at their original position in the archive. Removed entries
/// are left out of the output.
#[derive(Debug, Clone)]
pub struct TemplatePackage {
    bytes: Vec<u8>,
    entry_names: Vec<String>,
    overrides: BTreeMap<String, Vec<u8>>,
    removed: BTreeSet<String>,
}

impl TemplatePackage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut entry_names = Vec::new();
        {
            let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))?;
            for i in 0..archive.len() {
                entry_names.push(archive.by_index_raw(i)?.name().to_string());
            }
        }
        Ok(Self {
            bytes,
            entry_names,
            overrides: BTreeMap::new(),
            removed: BTreeSet::new(),
        })
    }

    /// Part names in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entry_names
            .iter()
            .filter(|name| !self.removed.contains(*name))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.removed.contains(name)
            && (self.overrides.contains_key(name) || self.entry_names.iter().any(|n| n == name))
    }

    /// Current contents of a part: the override if one was set, else the template's bytes.
    pub fn read_part(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if self.removed.contains(name) {
            return Ok(None);
        }
        if let Some(bytes) = self.overrides.get(name) {
            return Ok(Some(bytes.clone()));
        }
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let mut file = match archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut out = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut out)?;
        Ok(Some(out))
    }

    pub fn require_part(&self, name: &str) -> Result<Vec<u8>> {
        self.read_part(name)?
            .ok_or_else(|| TemplateError::MissingPart(name.to_string()))
    }

    /// Replace a part's contents in the output.
    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        self.removed.remove(&name);
        if !self.entry_names.iter().any(|n| *n == name) {
            log::debug!("adding new part {name}");
            self.entry_names.push(name.clone());
        }
        self.overrides.insert(name, bytes);
    }

    /// Leave a part out of the output. Returns whether the package had it.
    pub fn remove_part(&mut self, name: &str) -> bool {
        if !self.contains(name) {
            return false;
        }
        log::debug!("removing part {name}");
        self.overrides.remove(name);
        self.removed.insert(name.to_string());
        true
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.overrides.contains_key(name) || self.removed.contains(name)
    }

    pub fn write_to<W: Write + Seek>(&self, output: W) -> Result<()> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let mut zip = ZipWriter::new(output);
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            let name = file.name().to_string();
            if self.removed.contains(&name) {
                continue;
            }
            match self.overrides.get(&name) {
                Some(bytes) => {
                    zip.start_file(name, options)?;
                    zip.write_all(bytes)?;
                }
                None => zip.raw_copy_file(file)?,
            }
        }

        // Parts added with `set_part` that the template did not have.
        for name in self.entry_names.iter().skip(archive.len()) {
            if let Some(bytes) = self.overrides.get(name) {
                zip.start_file(name.clone(), options)?;
                zip.write_all(bytes)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.write_to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_zip(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn overrides_replace_only_their_part() {
        let template = build_zip(&[
            ("[Content_Types].xml", b"<Types/>"),
            ("xl/workbook.xml", b"<workbook/>"),
            ("xl/media/image1.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3]),
        ]);
        let mut package = TemplatePackage::from_bytes(template).unwrap();
        package.set_part("xl/workbook.xml", b"<workbook a=\"1\"/>".to_vec());

        let out = TemplatePackage::from_bytes(package.write_to_bytes().unwrap()).unwrap();
        assert_eq!(
            out.part_names().collect::<Vec<_>>(),
            vec!["[Content_Types].xml", "xl/workbook.xml", "xl/media/image1.png"]
        );
        assert_eq!(out.require_part("xl/workbook.xml").unwrap(), b"<workbook a=\"1\"/>");
        assert_eq!(
            out.require_part("xl/media/image1.png").unwrap(),
            vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]
        );
    }

    #[test]
    fn removed_parts_are_left_out() {
        let template = build_zip(&[
            ("xl/workbook.xml", b"<workbook/>"),
            ("xl/calcChain.xml", b"<calcChain/>"),
            ("xl/styles.xml", b"<styleSheet/>"),
        ]);
        let mut package = TemplatePackage::from_bytes(template).unwrap();
        assert!(package.remove_part("xl/calcChain.xml"));
        assert!(!package.remove_part("xl/calcChain.xml"));
        assert!(!package.contains("xl/calcChain.xml"));
        assert!(package.read_part("xl/calcChain.xml").unwrap().is_none());
        assert!(package.is_modified("xl/calcChain.xml"));

        let out = TemplatePackage::from_bytes(package.write_to_bytes().unwrap()).unwrap();
        assert_eq!(
            out.part_names().collect::<Vec<_>>(),
            vec!["xl/workbook.xml", "xl/styles.xml"]
        );
    }

    #[test]
    fn missing_part_is_reported_by_name() {
        let package = TemplatePackage::from_bytes(build_zip(&[("a.xml", b"<a/>")])).unwrap();
        assert!(package.read_part("b.xml").unwrap().is_none());
        match package.require_part("b.xml") {
            Err(TemplateError::MissingPart(name)) => assert_eq!(name, "b.xml"),
            other => panic!("expected MissingPart, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(matches!(
            TemplatePackage::from_bytes(b"not a zip".to_vec()),
            Err(TemplateError::Zip(_))
        ));
    }
}
