//! Floating-shape anchors in `xl/drawings/drawingN.xml`.
//!
//! Anchor points store 0-based rows (`<xdr:row>17</xdr:row>` is sheet row 18).

use crate::error::{Result, TemplateError};
use crate::xml::{XmlDocument, XmlElement};

#[derive(Debug, Clone)]
pub struct Drawing {
    part_name: String,
    doc: XmlDocument,
}

impl Drawing {
    pub fn parse(part_name: &str, bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            part_name: part_name.to_string(),
            doc: XmlDocument::parse(part_name, bytes)?,
        })
    }

    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    /// 0-based `from` rows of every anchor, in document order.
    pub fn anchor_rows(&self) -> Vec<u32> {
        let mut rows = Vec::new();
        collect_from_rows(&self.doc.root, &mut rows);
        rows
    }

    /// Move every anchor point on sheet row `>= threshold` (1-based) down by `delta` rows.
    ///
    /// `from` and `to` are checked independently, so a shape spanning the threshold stretches.
    /// Returns the number of points moved.
    pub fn shift_anchors(&mut self, threshold: u32, delta: u32) -> Result<usize> {
        if delta == 0 {
            return Ok(0);
        }
        let zero_based_threshold = threshold.saturating_sub(1);
        let mut moved = 0;
        let mut failure = None;
        self.doc.root.visit_mut(&mut |el: &mut XmlElement| {
            if failure.is_some() || !(el.is("from") || el.is("to")) {
                return;
            }
            let Some(row) = el.child_mut("row") else {
                return;
            };
            let text = row.text();
            match text.trim().parse::<u32>() {
                Ok(r) if r >= zero_based_threshold => {
                    row.set_text((r + delta).to_string());
                    moved += 1;
                }
                Ok(_) => {}
                Err(_) => failure = Some(TemplateError::MalformedReference(text)),
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        log::debug!("{}: shifted {moved} anchor points at/after row {threshold} by {delta}", self.part_name);
        Ok(moved)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.doc.to_bytes()
    }
}

fn collect_from_rows(el: &XmlElement, rows: &mut Vec<u32>) {
    if el.is("from") {
        if let Some(r) = el.child("row").and_then(|row| row.text().trim().parse().ok()) {
            rows.push(r);
        }
        return;
    }
    for child in el.elements() {
        collect_from_rows(child, rows);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn anchor(kind: &str, from: u32, to: Option<u32>) -> String {
        let to = to
            .map(|r| format!("<xdr:to><xdr:col>9</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{r}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>"))
            .unwrap_or_default();
        format!(
            "<xdr:{kind}><xdr:from><xdr:col>1</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{from}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>{to}<xdr:clientData/></xdr:{kind}>"
        )
    }

    fn drawing(anchors: &[String]) -> Drawing {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">{}</xdr:wsDr>"#,
            anchors.concat()
        );
        Drawing::parse("xl/drawings/drawing1.xml", xml.as_bytes()).unwrap()
    }

    #[test]
    fn header_anchors_stay_put() {
        let mut d = drawing(&[
            anchor("twoCellAnchor", 0, Some(4)),
            anchor("twoCellAnchor", 17, Some(19)),
            anchor("oneCellAnchor", 40, None),
        ]);
        assert_eq!(d.shift_anchors(18, 3).unwrap(), 3);
        assert_eq!(d.anchor_rows(), vec![0, 20, 43]);
    }

    #[test]
    fn spanning_shape_only_moves_its_lower_point() {
        let mut d = drawing(&[anchor("twoCellAnchor", 10, Some(30))]);
        assert_eq!(d.shift_anchors(18, 2).unwrap(), 1);
        let xml = String::from_utf8(d.to_bytes().unwrap()).unwrap();
        assert!(xml.contains("<xdr:row>10</xdr:row>"));
        assert!(xml.contains("<xdr:row>32</xdr:row>"));
    }

    #[test]
    fn anchors_inside_alternate_content_are_found() {
        let xml = format!(
            r#"<xdr:wsDr xmlns:xdr="urn:xdr" xmlns:mc="urn:mc"><mc:AlternateContent><mc:Choice Requires="a14">{}</mc:Choice></mc:AlternateContent></xdr:wsDr>"#,
            anchor("twoCellAnchor", 25, Some(27))
        );
        let mut d = Drawing::parse("d.xml", xml.as_bytes()).unwrap();
        assert_eq!(d.shift_anchors(18, 1).unwrap(), 2);
        assert_eq!(d.anchor_rows(), vec![26]);
    }

    #[test]
    fn non_numeric_row_is_rejected() {
        let xml = r#"<xdr:wsDr xmlns:xdr="urn:xdr"><xdr:oneCellAnchor><xdr:from><xdr:row>x</xdr:row></xdr:from></xdr:oneCellAnchor></xdr:wsDr>"#;
        let mut d = Drawing::parse("d.xml", xml.as_bytes()).unwrap();
        assert!(matches!(d.shift_anchors(1, 1), Err(TemplateError::MalformedReference(_))));
    }
}
