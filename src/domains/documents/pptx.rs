//! PowerPoint (PPTX) rendering.
//!
//! Writes a minimal PresentationML package by hand: one master, one blank
//! layout and one theme, with each slide drawing its own text boxes. Speaker
//! notes get a notes slide bound to a shared notes master.

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use super::error::RenderError;
use super::model::{SlideDeck, SlideSpec};
use super::renderer::DocumentRenderer;

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// 16:9 slide size in EMU.
const SLIDE_CX: i64 = 12_192_000;
const SLIDE_CY: i64 = 6_858_000;
const MARGIN: i64 = 457_200;

const TITLE_COLOR: &str = "1A365D";
const BODY_COLOR: &str = "363636";

/// Renders [`SlideDeck`]s as `.pptx` packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxRenderer;

impl DocumentRenderer for PptxRenderer {
    type Document = SlideDeck;

    fn extension(&self) -> &'static str {
        "pptx"
    }

    fn render(&self, deck: &SlideDeck) -> Result<Vec<u8>, RenderError> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, body) in package_parts(deck) {
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

/// One slide as it appears in the package.
struct SlidePart {
    xml: String,
    notes: Option<String>,
}

/// Build every part of the package as `(path, xml)` pairs.
fn package_parts(deck: &SlideDeck) -> Vec<(String, String)> {
    let mut slides = vec![SlidePart {
        xml: title_slide(&deck.title),
        notes: None,
    }];
    slides.extend(deck.slides.iter().map(|spec| SlidePart {
        xml: content_slide(spec),
        notes: spec.notes.clone().filter(|n| !n.trim().is_empty()),
    }));

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types(&slides)),
        ("_rels/.rels".to_string(), root_rels()),
        ("docProps/core.xml".to_string(), core_props(&deck.title)),
        ("docProps/app.xml".to_string(), app_props(slides.len())),
        ("ppt/presentation.xml".to_string(), presentation(slides.len())),
        (
            "ppt/_rels/presentation.xml.rels".to_string(),
            presentation_rels(slides.len()),
        ),
        ("ppt/presProps.xml".to_string(), format!("{XML_DECL}<p:presentationPr {NS}/>")),
        ("ppt/slideMasters/slideMaster1.xml".to_string(), slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
            rels(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".to_string(), slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".to_string(),
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        ("ppt/notesMasters/notesMaster1.xml".to_string(), notes_master()),
        (
            "ppt/notesMasters/_rels/notesMaster1.xml.rels".to_string(),
            rels(&[("rId1", "theme", "../theme/theme2.xml")]),
        ),
        ("ppt/theme/theme1.xml".to_string(), theme("Office Theme")),
        ("ppt/theme/theme2.xml".to_string(), theme("Notes Theme")),
    ];

    for (index, slide) in slides.iter().enumerate() {
        let n = index + 1;
        let notes_target = format!("../notesSlides/notesSlide{n}.xml");
        let mut slide_rels = vec![("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")];
        if slide.notes.is_some() {
            slide_rels.push(("rId2", "notesSlide", notes_target.as_str()));
        }
        parts.push((format!("ppt/slides/slide{n}.xml"), slide.xml.clone()));
        parts.push((format!("ppt/slides/_rels/slide{n}.xml.rels"), rels(&slide_rels)));

        if let Some(notes) = &slide.notes {
            let slide_target = format!("../slides/slide{n}.xml");
            parts.push((format!("ppt/notesSlides/notesSlide{n}.xml"), notes_slide(notes)));
            parts.push((
                format!("ppt/notesSlides/_rels/notesSlide{n}.xml.rels"),
                rels(&[
                    ("rId1", "notesMaster", "../notesMasters/notesMaster1.xml"),
                    ("rId2", "slide", slide_target.as_str()),
                ]),
            ));
        }
    }

    parts
}

// ============================================================================
// Slides
// ============================================================================

fn title_slide(title: &str) -> String {
    let cy = 1_500_000;
    let shape = text_box(
        2,
        "Title",
        (MARGIN, (SLIDE_CY - cy) / 2, SLIDE_CX - 2 * MARGIN, cy),
        &paragraphs(title, 4400, true, TITLE_COLOR, true),
    );
    slide_xml(&shape)
}

fn content_slide(spec: &SlideSpec) -> String {
    let title_cy = 1_000_000;
    let body_y = MARGIN + title_cy + 200_000;
    let title = text_box(
        2,
        "Title",
        (MARGIN, MARGIN, SLIDE_CX - 2 * MARGIN, title_cy),
        &paragraphs(&spec.title, 3200, true, TITLE_COLOR, false),
    );
    let body = text_box(
        3,
        "Content",
        (MARGIN, body_y, SLIDE_CX - 2 * MARGIN, SLIDE_CY - body_y - MARGIN),
        &paragraphs(&spec.content, 1800, false, BODY_COLOR, false),
    );
    slide_xml(&format!("{title}{body}"))
}

fn slide_xml(shapes: &str) -> String {
    format!(
        "{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{}{shapes}</p:spTree></p:cSld>\
         <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
        group_header()
    )
}

fn notes_slide(notes: &str) -> String {
    format!(
        "{XML_DECL}<p:notes {NS}><p:cSld><p:spTree>{}\
         <p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Notes Placeholder 1\"/>\
         <p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr><p:nvPr><p:ph type=\"body\" idx=\"1\"/></p:nvPr></p:nvSpPr>\
         <p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>\
         </p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>",
        group_header(),
        paragraphs(notes, 1200, false, BODY_COLOR, false)
    )
}

fn group_header() -> &'static str {
    "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
     <p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/>\
     <a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>"
}

fn text_box(id: u32, name: &str, (x, y, cx, cy): (i64, i64, i64, i64), body: &str) -> String {
    format!(
        "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{name}\"/><p:cNvSpPr txBox=\"1\"/><p:nvPr/></p:nvSpPr>\
         <p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>\
         <p:txBody><a:bodyPr wrap=\"square\" rtlCol=\"0\"><a:normAutofit/></a:bodyPr><a:lstStyle/>{body}</p:txBody></p:sp>"
    )
}

/// One `<a:p>` per input line; sizes are in hundredths of a point.
fn paragraphs(text: &str, size: u32, bold: bool, color: &str, centered: bool) -> String {
    let align = if centered { "<a:pPr algn=\"ctr\"/>" } else { "" };
    let bold = if bold { " b=\"1\"" } else { "" };
    let mut out = String::new();
    for line in text.lines().chain(text.is_empty().then_some("")) {
        if line.is_empty() {
            out.push_str(&format!("<a:p>{align}<a:endParaRPr lang=\"en-US\" sz=\"{size}\"/></a:p>"));
        } else {
            out.push_str(&format!(
                "<a:p>{align}<a:r><a:rPr lang=\"en-US\" sz=\"{size}\"{bold} dirty=\"0\">\
                 <a:solidFill><a:srgbClr val=\"{color}\"/></a:solidFill></a:rPr>\
                 <a:t>{}</a:t></a:r></a:p>",
                escape_xml(line)
            ));
        }
    }
    out
}

// ============================================================================
// Package plumbing
// ============================================================================

fn content_types(slides: &[SlidePart]) -> String {
    const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
    let mut overrides = vec![
        ("/ppt/presentation.xml".to_string(), format!("{PML}.presentation.main+xml")),
        ("/ppt/presProps.xml".to_string(), format!("{PML}.presProps+xml")),
        ("/ppt/slideMasters/slideMaster1.xml".to_string(), format!("{PML}.slideMaster+xml")),
        ("/ppt/slideLayouts/slideLayout1.xml".to_string(), format!("{PML}.slideLayout+xml")),
        ("/ppt/notesMasters/notesMaster1.xml".to_string(), format!("{PML}.notesMaster+xml")),
        (
            "/ppt/theme/theme1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.theme+xml".to_string(),
        ),
        (
            "/ppt/theme/theme2.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.theme+xml".to_string(),
        ),
        (
            "/docProps/core.xml".to_string(),
            "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
        ),
        (
            "/docProps/app.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_string(),
        ),
    ];
    for (index, slide) in slides.iter().enumerate() {
        let n = index + 1;
        overrides.push((format!("/ppt/slides/slide{n}.xml"), format!("{PML}.slide+xml")));
        if slide.notes.is_some() {
            overrides.push((
                format!("/ppt/notesSlides/notesSlide{n}.xml"),
                format!("{PML}.notesSlide+xml"),
            ));
        }
    }

    let mut xml = format!(
        "{XML_DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>"
    );
    for (part, content_type) in overrides {
        xml.push_str(&format!("<Override PartName=\"{part}\" ContentType=\"{content_type}\"/>"));
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"{REL_NS}\">\
         <Relationship Id=\"rId1\" Type=\"{REL_TYPE}/officeDocument\" Target=\"ppt/presentation.xml\"/>\
         <Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>\
         <Relationship Id=\"rId3\" Type=\"{REL_TYPE}/extended-properties\" Target=\"docProps/app.xml\"/>\
         </Relationships>"
    )
}

/// Relationships part from `(id, type suffix, target)` triples.
fn rels(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = format!("{XML_DECL}<Relationships xmlns=\"{REL_NS}\">");
    for (id, kind, target) in entries {
        xml.push_str(&format!(
            "<Relationship Id=\"{id}\" Type=\"{REL_TYPE}/{kind}\" Target=\"{target}\"/>"
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Presentation relationships: master, notes master, slides, then props and theme.
fn presentation_rels(slide_count: usize) -> String {
    let mut entries: Vec<(String, &str, String)> = vec![
        ("rId1".into(), "slideMaster", "slideMasters/slideMaster1.xml".into()),
        ("rId2".into(), "notesMaster", "notesMasters/notesMaster1.xml".into()),
    ];
    for n in 1..=slide_count {
        entries.push((format!("rId{}", n + 2), "slide", format!("slides/slide{n}.xml")));
    }
    entries.push((format!("rId{}", slide_count + 3), "presProps", "presProps.xml".into()));
    entries.push((format!("rId{}", slide_count + 4), "theme", "theme/theme1.xml".into()));

    let borrowed: Vec<(&str, &str, &str)> = entries
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    rels(&borrowed)
}

fn presentation(slide_count: usize) -> String {
    let slide_ids: String = (1..=slide_count)
        .map(|n| format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 255 + n, n + 2))
        .collect();
    format!(
        "{XML_DECL}<p:presentation {NS} saveSubsetFonts=\"1\">\
         <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
         <p:notesMasterIdLst><p:notesMasterId r:id=\"rId2\"/></p:notesMasterIdLst>\
         <p:sldIdLst>{slide_ids}</p:sldIdLst>\
         <p:sldSz cx=\"{SLIDE_CX}\" cy=\"{SLIDE_CY}\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/>\
         </p:presentation>"
    )
}

const CLR_MAP: &str = "<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" \
     accent2=\"accent2\" accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" \
     hlink=\"hlink\" folHlink=\"folHlink\"/>";

fn slide_master() -> String {
    format!(
        "{XML_DECL}<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>\
         <p:spTree>{}</p:spTree></p:cSld>{CLR_MAP}\
         <p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>\
         </p:sldMaster>",
        group_header()
    )
}

fn slide_layout() -> String {
    format!(
        "{XML_DECL}<p:sldLayout {NS} type=\"blank\" preserve=\"1\"><p:cSld name=\"Blank\">\
         <p:spTree>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>",
        group_header()
    )
}

fn notes_master() -> String {
    format!(
        "{XML_DECL}<p:notesMaster {NS}><p:cSld><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>\
         <p:spTree>{}</p:spTree></p:cSld>{CLR_MAP}</p:notesMaster>",
        group_header()
    )
}

fn core_props(title: &str) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        "{XML_DECL}<cp:coreProperties \
         xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
         <dc:title>{}</dc:title><dc:creator>{}</dc:creator>\
         <dcterms:created xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:created>\
         <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:modified>\
         </cp:coreProperties>",
        escape_xml(title),
        env!("CARGO_PKG_NAME")
    )
}

fn app_props(slide_count: usize) -> String {
    format!(
        "{XML_DECL}<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\">\
         <Application>{}</Application><Slides>{slide_count}</Slides></Properties>",
        env!("CARGO_PKG_NAME")
    )
}

fn theme(name: &str) -> String {
    const FILL: &str = "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>";
    const LINE: &str = "<a:ln w=\"6350\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>";
    const EFFECT: &str = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        "{XML_DECL}<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"{name}\">\
         <a:themeElements>\
         <a:clrScheme name=\"Office\">\
         <a:dk1><a:sysClr val=\"windowText\" lastClr=\"000000\"/></a:dk1>\
         <a:lt1><a:sysClr val=\"window\" lastClr=\"FFFFFF\"/></a:lt1>\
         <a:dk2><a:srgbClr val=\"1A365D\"/></a:dk2><a:lt2><a:srgbClr val=\"E2E8F0\"/></a:lt2>\
         <a:accent1><a:srgbClr val=\"4472C4\"/></a:accent1><a:accent2><a:srgbClr val=\"ED7D31\"/></a:accent2>\
         <a:accent3><a:srgbClr val=\"A5A5A5\"/></a:accent3><a:accent4><a:srgbClr val=\"FFC000\"/></a:accent4>\
         <a:accent5><a:srgbClr val=\"5B9BD5\"/></a:accent5><a:accent6><a:srgbClr val=\"70AD47\"/></a:accent6>\
         <a:hlink><a:srgbClr val=\"0563C1\"/></a:hlink><a:folHlink><a:srgbClr val=\"954F72\"/></a:folHlink>\
         </a:clrScheme>\
         <a:fontScheme name=\"Office\">\
         <a:majorFont><a:latin typeface=\"Calibri Light\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>\
         <a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>\
         </a:fontScheme>\
         <a:fmtScheme name=\"Office\">\
         <a:fillStyleLst>{FILL}{FILL}{FILL}</a:fillStyleLst>\
         <a:lnStyleLst>{LINE}{LINE}{LINE}</a:lnStyleLst>\
         <a:effectStyleLst>{EFFECT}{EFFECT}{EFFECT}</a:effectStyleLst>\
         <a:bgFillStyleLst>{FILL}{FILL}{FILL}</a:bgFillStyleLst>\
         </a:fmtScheme>\
         </a:themeElements></a:theme>"
    )
}

/// Escape text for XML content and drop characters XML 1.0 cannot carry.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}
