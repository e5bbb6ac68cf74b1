#![allow(dead_code)]

use std::io::{Cursor, Write};

use quote_xlsx::shared_strings::{SharedStringTable, SHARED_STRINGS_PART};
use quote_xlsx::{CellAddress, TemplatePackage, Worksheet};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const QUOTE_SHEET_PART: &str = "xl/worksheets/sheet2.xml";
pub const DRAWING_PART: &str = "xl/drawings/drawing1.xml";
pub const CALC_CHAIN_PART: &str = "xl/calcChain.xml";
pub const IMAGE_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 13, 7, 7, 7];

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub fn build_package(parts: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Template strings, by index.
pub const STRINGS: &[&str] = &[
    "COTIZACIÓN DE LABORATORIO N° XXX-XX",
    "CÓDIGO",
    "DESCRIPCIÓN",
    "E-000",
    "Descripción de ejemplo",
    "SUBTOTAL",
    "IGV",
    "TOTAL",
    "CONDICIONES ORIGINAL",
    "PLAZO ORIGINAL",
    "CONTRAMUESTRA",
    "CONDICIÓN ORIGINAL",
    "ACEPTACION ORIGINAL",
    "Pie de página",
    "Portada",
];

fn s(r: &str, style: u32, idx: usize) -> String {
    format!(r#"<c r="{r}" s="{style}" t="s"><v>{idx}</v></c>"#)
}

fn n(r: &str, style: u32, value: &str) -> String {
    format!(r#"<c r="{r}" s="{style}"><v>{value}</v></c>"#)
}

fn e(r: &str, style: u32) -> String {
    format!(r#"<c r="{r}" s="{style}"/>"#)
}

fn blank_span(row: u32, first: char, last: char, style: u32) -> String {
    (first..=last).map(|col| e(&format!("{col}{row}"), style)).collect()
}

fn row(r: u32, cells: &str) -> String {
    format!(r#"<row r="{r}" spans="2:14">{cells}</row>"#)
}

/// The quote worksheet: header block, item row 17, totals 18..20, text blocks at 23, 24, 34 and
/// 51, a manual break after row 24 and a drawing.
pub fn quote_sheet_xml() -> String {
    let rows = [
        row(3, &s("G3", 1, 0)),
        row(5, &(e("D5", 2) + &e("L5", 2))),
        row(6, &e("D6", 2)),
        row(7, &(e("D7", 2) + &e("L7", 2))),
        row(8, &(e("E8", 2) + &e("L8", 2))),
        row(9, &(e("D9", 2) + &e("L9", 2))),
        row(10, &(e("E10", 2) + &e("L10", 2))),
        row(16, &(s("B16", 9, 1) + &s("C16", 9, 2))),
        format!(
            r#"<row r="17" spans="2:14" ht="27" customHeight="1">{}{}{}{}{}{}{}<c r="N17" s="5"><f>L17*M17</f><v>0</v></c></row>"#,
            s("B17", 3, 3),
            s("C17", 4, 4),
            blank_span(17, 'D', 'I', 4),
            e("J17", 3),
            e("K17", 3),
            n("L17", 5, "0"),
            n("M17", 5, "0"),
        ),
        row(18, &(s("M18", 6, 5) + &n("N18", 5, "0"))),
        row(19, &(s("M19", 6, 6) + &n("N19", 5, "0"))),
        row(20, &(s("M20", 6, 7) + &n("N20", 5, "0"))),
        row(23, &(s("B23", 7, 8) + &blank_span(23, 'C', 'N', 7))),
        row(24, &(s("B24", 7, 9) + &blank_span(24, 'C', 'N', 7))),
        row(27, &s("B27", 8, 10)),
        row(34, &s("B34", 8, 11)),
        row(51, &(s("B51", 7, 12) + &blank_span(51, 'C', 'N', 7))),
        row(60, &s("B60", 8, 13)),
    ]
    .concat();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
<worksheet xmlns=\"{MAIN_NS}\" xmlns:r=\"{REL_NS}\">\
<dimension ref=\"B3:N60\"/>\
<sheetViews><sheetView workbookViewId=\"0\" view=\"pageBreakPreview\"/></sheetViews>\
<sheetFormatPr defaultRowHeight=\"15\"/>\
<sheetData>{rows}</sheetData>\
<mergeCells count=\"6\"><mergeCell ref=\"G3:N3\"/><mergeCell ref=\"C16:I16\"/><mergeCell ref=\"C17:I17\"/><mergeCell ref=\"B23:N23\"/><mergeCell ref=\"B24:N24\"/><mergeCell ref=\"B51:N51\"/></mergeCells>\
<pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/>\
<pageSetup paperSize=\"9\" orientation=\"portrait\"/>\
<rowBreaks count=\"1\" manualBreakCount=\"1\"><brk id=\"24\" max=\"16383\" man=\"1\"/></rowBreaks>\
<drawing r:id=\"rId1\"/>\
</worksheet>"
    )
}

fn shared_strings_xml() -> String {
    let mut items: String = STRINGS.iter().map(|t| format!("<si><t>{t}</t></si>")).collect();
    items.push_str(r#"<si><r><rPr><b/></rPr><t>Rico</t></r><r><t xml:space="preserve"> texto</t></r></si>"#);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<sst xmlns=\"{MAIN_NS}\" count=\"40\" uniqueCount=\"{}\">{items}</sst>",
        STRINGS.len() + 1
    )
}

fn drawing_xml() -> String {
    let anchor = |from: u32, to: u32, name: &str| {
        format!(
            "<xdr:twoCellAnchor editAs=\"oneCell\"><xdr:from><xdr:col>1</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{from}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from><xdr:to><xdr:col>4</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{to}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to><xdr:pic><xdr:nvPicPr><xdr:cNvPr id=\"2\" name=\"{name}\"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed=\"rId1\"/></xdr:blipFill><xdr:spPr/></xdr:pic><xdr:clientData/></xdr:twoCellAnchor>"
        )
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<xdr:wsDr xmlns:xdr=\"http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing\" xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" xmlns:r=\"{REL_NS}\">{}{}</xdr:wsDr>",
        anchor(0, 3, "Logo"),
        anchor(40, 44, "Firma")
    )
}

/// Parts of a two-sheet quote template; `MORT2` is the second sheet.
pub fn quote_template_parts() -> Vec<(String, Vec<u8>)> {
    let parts: Vec<(&str, String)> = vec![
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/drawings/drawing1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/></Types>"#
                .to_string(),
        ),
        (
            "_rels/.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
            ),
        ),
        (
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="Portada" sheetId="1" r:id="rId1"/><sheet name="MORT2" sheetId="36" r:id="rId2"/></sheets><definedNames><definedName name="_xlnm.Print_Area" localSheetId="0">Portada!$A$1:$H$40</definedName><definedName name="_xlnm.Print_Area" localSheetId="1">MORT2!$B$3:$N$60</definedName></definedNames></workbook>"#
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL_NS}/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#
            ),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheetData><row r="1"><c r="A1" t="s"><v>14</v></c></row></sheetData></worksheet>"#
            ),
        ),
        (QUOTE_SHEET_PART, quote_sheet_xml()),
        (
            "xl/worksheets/_rels/sheet2.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#
            ),
        ),
        (DRAWING_PART, drawing_xml()),
        (
            "xl/drawings/_rels/drawing1.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/image" Target="../media/image1.png"/></Relationships>"#
            ),
        ),
        (SHARED_STRINGS_PART, shared_strings_xml()),
    ];

    let mut out: Vec<(String, Vec<u8>)> = parts
        .into_iter()
        .map(|(name, xml)| (name.to_string(), xml.into_bytes()))
        .collect();
    out.push(("xl/media/image1.png".to_string(), IMAGE_BYTES.to_vec()));
    out
}

pub fn quote_template() -> TemplatePackage {
    TemplatePackage::from_bytes(build_package(&quote_template_parts())).unwrap()
}

/// The quote template as Excel saves it after a calculation: with `xl/calcChain.xml`, its
/// workbook relationship and its content-type override.
pub fn quote_template_with_calc_chain() -> TemplatePackage {
    let mut parts = quote_template_parts();
    for (name, bytes) in parts.iter_mut() {
        let (closing, addition) = match name.as_str() {
            "[Content_Types].xml" => (
                "</Types>",
                r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#.to_string(),
            ),
            "xl/_rels/workbook.xml.rels" => (
                "</Relationships>",
                format!(r#"<Relationship Id="rId4" Type="{REL_NS}/calcChain" Target="calcChain.xml"/>"#),
            ),
            _ => continue,
        };
        let xml = String::from_utf8(std::mem::take(bytes)).unwrap();
        *bytes = xml.replace(closing, &format!("{addition}{closing}")).into_bytes();
    }
    parts.push((
        CALC_CHAIN_PART.to_string(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<calcChain xmlns="{MAIN_NS}"><c r="N17" i="2" l="1"/></calcChain>"#)
        .into_bytes(),
    ));
    TemplatePackage::from_bytes(build_package(&parts)).unwrap()
}

/// A template built from `quote_template_parts` with one part replaced or (with `None`) removed.
pub fn quote_template_with(name: &str, replacement: Option<Vec<u8>>) -> TemplatePackage {
    let parts: Vec<_> = quote_template_parts()
        .into_iter()
        .filter_map(|(part, bytes)| {
            if part == name {
                replacement.clone().map(|r| (part, r))
            } else {
                Some((part, bytes))
            }
        })
        .collect();
    TemplatePackage::from_bytes(build_package(&parts)).unwrap()
}

/// Read-back view of a filled workbook.
pub struct Filled {
    pub package: TemplatePackage,
    pub sheet: Worksheet,
    pub strings: Option<SharedStringTable>,
}

impl Filled {
    pub fn open(bytes: &[u8], sheet_part: &str) -> Self {
        let package = TemplatePackage::from_bytes(bytes.to_vec()).unwrap();
        let sheet = Worksheet::parse(sheet_part, &package.require_part(sheet_part).unwrap()).unwrap();
        let strings = package
            .read_part(SHARED_STRINGS_PART)
            .unwrap()
            .map(|bytes| SharedStringTable::parse(SHARED_STRINGS_PART, &bytes).unwrap());
        Self {
            package,
            sheet,
            strings,
        }
    }

    pub fn text(&self, cell: &str) -> Option<String> {
        self.sheet
            .cell_text(CellAddress::parse(cell).unwrap(), self.strings.as_ref())
    }

    pub fn number(&self, cell: &str) -> Option<f64> {
        let cell = self.sheet.cell(CellAddress::parse(cell).unwrap())?;
        assert_eq!(cell.attr("t"), None, "numeric cell must not carry a type tag");
        cell.child("v")?.text().parse().ok()
    }

    pub fn style(&self, cell: &str) -> Option<String> {
        self.sheet
            .cell(CellAddress::parse(cell).unwrap())?
            .attr("s")
            .map(str::to_string)
    }

    pub fn part_text(&self, name: &str) -> String {
        String::from_utf8(self.package.require_part(name).unwrap()).unwrap()
    }
}
