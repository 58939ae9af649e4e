//! Minimal PresentationML package writer.
//!
//! A `.pptx` file is a zip of XML parts wired together by relationship
//! files. This writes the smallest set PowerPoint, LibreOffice and Keynote
//! all open without a repair prompt: one blank master, one blank layout,
//! one theme and one slide per image.
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/{core,app}.xml
//! ppt/presentation.xml          ppt/_rels/presentation.xml.rels
//! ppt/presProps.xml
//! ppt/slideMasters/slideMaster1.xml   (+ _rels)
//! ppt/slideLayouts/slideLayout1.xml   (+ _rels)
//! ppt/theme/theme1.xml
//! ppt/slides/slideN.xml               (+ _rels)
//! ppt/media/imageN.png
//! ```
//!
//! PNG parts are stored uncompressed since they are deflated already.

use crate::pipeline::deck::{Frame, SlideSize};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOC: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXT_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_PRES_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// `sldMasterId` and `sldLayoutId` share one id space that must start above 2^31.
const MASTER_ID: u32 = 2_147_483_648;
const LAYOUT_ID: u32 = 2_147_483_649;
/// Slide ids start at 256.
const FIRST_SLIDE_ID: usize = 256;

/// Font size of the caption box, in hundredths of a point.
const CAPTION_FONT_SIZE: u32 = 1400;
/// Placeholder text so the caption box keeps its height when opened.
const CAPTION_TEXT: &str = "   ";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Presentation-wide properties.
#[derive(Debug, Clone, Copy)]
pub struct PresentationInfo<'a> {
    pub title: &'a str,
    pub slide_size: SlideSize,
}

/// One slide ready to be packaged.
#[derive(Debug, Clone)]
pub struct PackageSlide {
    /// PNG-encoded picture.
    pub png: Vec<u8>,
    /// Where the picture goes.
    pub picture: Frame,
    /// Alt text for the picture.
    pub description: String,
    /// Empty text box, when wanted.
    pub caption: Option<Frame>,
}

/// Write a complete `.pptx` package to memory.
pub fn write_package(info: &PresentationInfo<'_>, slides: &[PackageSlide]) -> Result<Vec<u8>, PackageError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let xml = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let png = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    put(&mut zip, "[Content_Types].xml".into(), content_types(slides.len()).as_bytes(), xml)?;
    put(&mut zip, "_rels/.rels".into(), root_rels().as_bytes(), xml)?;
    put(&mut zip, "docProps/core.xml".into(), core_props(info.title).as_bytes(), xml)?;
    put(&mut zip, "docProps/app.xml".into(), app_props(slides.len()).as_bytes(), xml)?;
    put(
        &mut zip,
        "ppt/presentation.xml".into(),
        presentation(info.slide_size, slides.len()).as_bytes(),
        xml,
    )?;
    put(
        &mut zip,
        "ppt/_rels/presentation.xml.rels".into(),
        presentation_rels(slides.len()).as_bytes(),
        xml,
    )?;
    put(&mut zip, "ppt/presProps.xml".into(), pres_props().as_bytes(), xml)?;
    put(&mut zip, "ppt/slideMasters/slideMaster1.xml".into(), slide_master().as_bytes(), xml)?;
    put(
        &mut zip,
        "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
        slide_master_rels().as_bytes(),
        xml,
    )?;
    put(&mut zip, "ppt/slideLayouts/slideLayout1.xml".into(), slide_layout().as_bytes(), xml)?;
    put(
        &mut zip,
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
        slide_layout_rels().as_bytes(),
        xml,
    )?;
    put(&mut zip, "ppt/theme/theme1.xml".into(), theme().as_bytes(), xml)?;

    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        put(&mut zip, format!("ppt/slides/slide{n}.xml"), slide_xml(slide).as_bytes(), xml)?;
        put(
            &mut zip,
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            slide_rels(n).as_bytes(),
            xml,
        )?;
        put(&mut zip, format!("ppt/media/image{n}.png"), &slide.png, png)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn put(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: String,
    body: &[u8],
    options: SimpleFileOptions,
) -> Result<(), PackageError> {
    zip.start_file(name, options)?;
    zip.write_all(body)?;
    Ok(())
}

// ── package plumbing ─────────────────────────────────────────────────────

fn content_types(slide_count: usize) -> String {
    let mut s = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/presProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#
    );
    for n in 1..=slide_count {
        s.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
    }
    s.push_str("</Types>");
    s
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_OFFICE_DOC}" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="{REL_CORE_PROPS}" Target="docProps/core.xml"/><Relationship Id="rId3" Type="{REL_EXT_PROPS}" Target="docProps/app.xml"/></Relationships>"#
    )
}

fn core_props(title: &str) -> String {
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{}</dc:creator></cp:coreProperties>"#,
        escape(title),
        env!("CARGO_PKG_NAME"),
    )
}

fn app_props(slide_count: usize) -> String {
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>{} {}</Application><Slides>{slide_count}</Slides></Properties>"#,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    )
}

// ── presentation ─────────────────────────────────────────────────────────

fn presentation(size: SlideSize, slide_count: usize) -> String {
    // An empty sldIdLst is a schema violation; leave it out instead.
    let slide_ids = if slide_count == 0 {
        String::new()
    } else {
        let ids: String = (0..slide_count)
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, FIRST_SLIDE_ID + i, i + 4))
            .collect();
        format!("<p:sldIdLst>{ids}</p:sldIdLst>")
    };
    format!(
        r#"{XML_DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="{MASTER_ID}" r:id="rId1"/></p:sldMasterIdLst>{slide_ids}<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="{}" cy="{}"/></p:presentation>"#,
        size.width, size.height, size.height, size.width,
    )
}

/// rId1 master, rId2 presProps, rId3 theme, rId4.. slides in order.
fn presentation_rels(slide_count: usize) -> String {
    let mut s = format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_SLIDE_MASTER}" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{REL_PRES_PROPS}" Target="presProps.xml"/><Relationship Id="rId3" Type="{REL_THEME}" Target="theme/theme1.xml"/>"#
    );
    for n in 1..=slide_count {
        s.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{REL_SLIDE}" Target="slides/slide{n}.xml"/>"#,
            n + 3
        ));
    }
    s.push_str("</Relationships>");
    s
}

fn pres_props() -> String {
    format!(r#"{XML_DECL}<p:presentationPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"/>"#)
}

const EMPTY_SP_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>{EMPTY_SP_TREE}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="{LAYOUT_ID}" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_master_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_SLIDE_LAYOUT}" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL_THEME}" Target="../theme/theme1.xml"/></Relationships>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank">{EMPTY_SP_TREE}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn slide_layout_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_SLIDE_MASTER}" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#
    )
}

fn theme() -> String {
    let solid = |c: &str| format!(r#"<a:solidFill><a:schemeClr val="{c}"/></a:solidFill>"#);
    let fills: String = (0..3).map(|_| solid("phClr")).collect();
    let lines: String = [6350, 12700, 19050]
        .iter()
        .map(|w| format!(r#"<a:ln w="{w}">{}</a:ln>"#, solid("phClr")))
        .collect();
    let effects: String = (0..3).map(|_| "<a:effectStyle><a:effectLst/></a:effectStyle>").collect();
    let font = |face: &str| {
        format!(r#"<a:latin typeface="{face}"/><a:ea typeface=""/><a:cs typeface=""/>"#)
    };
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="{NS_A}" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont>{}</a:majorFont><a:minorFont>{}</a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst>{fills}</a:fillStyleLst><a:lnStyleLst>{lines}</a:lnStyleLst><a:effectStyleLst>{effects}</a:effectStyleLst><a:bgFillStyleLst>{fills}</a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#,
        font("Calibri Light"),
        font("Calibri"),
    )
}

// ── slides ───────────────────────────────────────────────────────────────

fn xfrm(f: &Frame) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        f.x, f.y, f.width, f.height
    )
}

fn slide_xml(slide: &PackageSlide) -> String {
    let picture = format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="2" name="Picture 1" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        escape(slide.description.as_str()),
        xfrm(&slide.picture),
    );
    let caption = slide
        .caption
        .map(|f| {
            format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="TextBox 2"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:spAutoFit/></a:bodyPr><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="{CAPTION_FONT_SIZE}" dirty="0"/><a:t>{CAPTION_TEXT}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                xfrm(&f)
            )
        })
        .unwrap_or_default();

    format!(
        r#"{XML_DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{picture}{caption}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn slide_rels(n: usize) -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_SLIDE_LAYOUT}" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL_IMAGE}" Target="../media/image{n}.png"/></Relationships>"#
    )
}
