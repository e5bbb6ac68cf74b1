//! OPC relationship parts (`_rels/*.rels`).

use crate::error::Result;
use crate::package::TemplatePackage;
use crate::xml::XmlDocument;

pub const DRAWING_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub type_uri: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    pub fn is_external(&self) -> bool {
        self.target_mode
            .as_deref()
            .is_some_and(|mode| mode.trim().eq_ignore_ascii_case("External"))
    }
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`.
pub fn rels_part_name(part_name: &str) -> String {
    let (dir, file) = part_name.rsplit_once('/').unwrap_or(("", part_name));
    if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    }
}

/// Resolve a relationship target against the folder of the part that owns the relationship.
///
/// Absolute targets (`/xl/drawings/drawing1.xml`) are rooted at the package root. Fragments are
/// dropped since part names never carry them; a bare fragment (`#Sheet1!A1`) points back into
/// `base_part` itself.
pub fn resolve_target(base_part: &str, target: &str) -> String {
    let target = target.split_once('#').map(|(base, _)| base).unwrap_or(target);
    if target.is_empty() {
        return base_part.to_string();
    }
    let (target, is_absolute) = match target.strip_prefix('/') {
        Some(target) => (target, true),
        None => (target, false),
    };
    let base_dir = if is_absolute {
        ""
    } else {
        base_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    };

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(segment),
        }
    }
    components.join("/")
}

pub fn parse_relationships(part_name: &str, xml: &[u8]) -> Result<Vec<Relationship>> {
    let doc = XmlDocument::parse(part_name, xml)?;
    let relationships = doc
        .root
        .elements()
        .filter(|el| el.is("Relationship"))
        .filter_map(|el| {
            Some(Relationship {
                id: el.attr("Id")?.to_string(),
                type_uri: el.attr("Type").unwrap_or_default().to_string(),
                target: el.attr("Target")?.to_string(),
                target_mode: el.attr("TargetMode").map(str::to_string),
            })
        })
        .collect();
    Ok(relationships)
}

/// Relationships owned by `part_name`; empty when the part has no `.rels` part.
pub fn relationships_of(package: &TemplatePackage, part_name: &str) -> Result<Vec<Relationship>> {
    let rels_name = rels_part_name(part_name);
    match package.read_part(&rels_name)? {
        Some(bytes) => parse_relationships(&rels_name, &bytes),
        None => Ok(Vec::new()),
    }
}

/// Resolved part name targeted by relationship `id` of `part_name`, skipping external targets.
pub fn resolve_relationship(
    package: &TemplatePackage,
    part_name: &str,
    id: &str,
) -> Result<Option<String>> {
    Ok(relationships_of(package, part_name)?
        .into_iter()
        .find(|rel| rel.id == id && !rel.is_external())
        .map(|rel| resolve_target(part_name, &rel.target)))
}
