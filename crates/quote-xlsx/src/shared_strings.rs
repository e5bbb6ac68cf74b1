//! Shared string table (`xl/sharedStrings.xml`).
//!
//! Existing `<si>` entries are kept as parsed, rich text runs and phonetic data included; only
//! new plain entries are appended.

use std::collections::HashMap;

use crate::error::{Result, TemplateError};
use crate::xml::{XmlDocument, XmlElement};

pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

#[derive(Debug, Clone)]
pub struct SharedStringTable {
    doc: XmlDocument,
    texts: Vec<String>,
    index: HashMap<String, u32>,
    appended: usize,
}

impl SharedStringTable {
    pub fn parse(part_name: &str, bytes: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(part_name, bytes)?;
        if !doc.root.is("sst") {
            return Err(TemplateError::InvalidTemplate(format!(
                "{part_name}: expected <sst> root, found <{}>",
                doc.root.name
            )));
        }

        let mut table = Self {
            doc,
            texts: Vec::new(),
            index: HashMap::new(),
            appended: 0,
        };
        let texts: Vec<String> = table
            .doc
            .root
            .elements()
            .filter(|el| el.is("si"))
            .map(plain_text)
            .collect();
        for text in texts {
            table.remember(text);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Number of entries added since the table was parsed.
    pub fn appended(&self) -> usize {
        self.appended
    }

    /// Plain text of entry `idx`.
    pub fn text(&self, idx: u32) -> Option<&str> {
        self.texts.get(idx as usize).map(String::as_str)
    }

    pub fn get(&self, text: &str) -> Option<u32> {
        self.index.get(text).copied()
    }

    /// Index of an entry whose plain text is exactly `text`, appending one if there is none.
    pub fn get_or_create(&mut self, text: &str) -> u32 {
        if let Some(idx) = self.get(text) {
            return idx;
        }

        let si_name = self.doc.root.child_name("si");
        let t_name = self.doc.root.child_name("t");
        let mut t = XmlElement::new(t_name);
        if needs_space_preserve(text) {
            t.set_attr("xml:space", "preserve");
        }
        t.set_text(text);
        let mut si = XmlElement::new(si_name);
        si.children.push(t.into());
        self.doc.root.children.push(si.into());

        self.appended += 1;
        self.remember(text.to_string())
    }

    /// Serialize with `count` and `uniqueCount` both equal to the entry count.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.texts.len().to_string();
        self.doc.root.set_attr("count", len.clone());
        self.doc.root.set_attr("uniqueCount", len);
        self.doc.to_bytes()
    }

    fn remember(&mut self, text: String) -> u32 {
        let idx = self.texts.len() as u32;
        self.index.entry(text.clone()).or_insert(idx);
        self.texts.push(text);
        idx
    }
}

/// Visible text of an `<si>`: the direct `<t>` or every run's `<t>`; phonetic runs are skipped.
fn plain_text(si: &XmlElement) -> String {
    let mut out = String::new();
    for child in si.elements() {
        match child.local_name() {
            "t" => out.push_str(&child.text()),
            "r" => {
                if let Some(t) = child.child("t") {
                    out.push_str(&t.text());
                }
            }
            _ => {}
        }
    }
    out
}

fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains('\n')
}
