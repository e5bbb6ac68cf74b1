//! Calculation chain cleanup after formula cells change.
//!
//! `xl/calcChain.xml` lists formula cells in evaluation order. Once a fill overwrites or moves a
//! formula cell the chain no longer matches the sheet and Excel opens the file with a "repaired
//! records" prompt. The chain is dropped along with its workbook relationship and its
//! content-type override; Excel rebuilds it on the next full calculation.

use crate::error::Result;
use crate::package::TemplatePackage;
use crate::relationships::{rels_part_name, resolve_target};
use crate::workbook::WORKBOOK_PART;
use crate::xml::{XmlDocument, XmlElement, XmlNode};

pub const CALC_CHAIN_PART: &str = "xl/calcChain.xml";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";

/// Remove the calculation chain and every reference to it.
///
/// Returns the parts rewritten to drop those references (workbook relationships, content
/// types). A package without a chain is left alone.
pub fn drop_calc_chain(package: &mut TemplatePackage) -> Result<Vec<String>> {
    if !package.remove_part(CALC_CHAIN_PART) {
        return Ok(Vec::new());
    }
    log::debug!("dropped {CALC_CHAIN_PART}");

    let mut rewritten = Vec::new();
    let rels_part = rels_part_name(WORKBOOK_PART);
    if remove_elements(package, &rels_part, |el| {
        el.is("Relationship")
            && (el.attr("Type") == Some(CALC_CHAIN_REL_TYPE)
                || el
                    .attr("Target")
                    .is_some_and(|target| resolve_target(WORKBOOK_PART, target) == CALC_CHAIN_PART))
    })? {
        rewritten.push(rels_part);
    }
    if remove_elements(package, CONTENT_TYPES_PART, |el| {
        el.is("Override")
            && el
                .attr("PartName")
                .is_some_and(|name| name.trim_start_matches('/') == CALC_CHAIN_PART)
    })? {
        rewritten.push(CONTENT_TYPES_PART.to_string());
    }
    Ok(rewritten)
}

/// Drop the root's element children matching `remove` and store the part if any were dropped.
fn remove_elements(
    package: &mut TemplatePackage,
    part_name: &str,
    remove: impl Fn(&XmlElement) -> bool,
) -> Result<bool> {
    let Some(bytes) = package.read_part(part_name)? else {
        return Ok(false);
    };
    let mut doc = XmlDocument::parse(part_name, &bytes)?;
    let before = doc.root.children.len();
    doc.root
        .children
        .retain(|node| !matches!(node, XmlNode::Element(el) if remove(el)));
    if doc.root.children.len() == before {
        return Ok(false);
    }
    package.set_part(part_name, doc.to_bytes()?);
    Ok(true)
}
