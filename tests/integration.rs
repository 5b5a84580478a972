//! Integration tests for the PDF editor library

use image::{Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_editor::pdf::{
    FooterSpec, FooterStage, PdfDocument, ReplaceStage, ReplacementSpec, RotateStage, RotationSpec,
};
use pdf_editor::{edit_pdf, EditOptions, Error, Stage, StageOutcome};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Description of one test page
struct TestPage {
    width: i64,
    height: i64,
    content: Option<&'static [u8]>,
}

impl TestPage {
    fn letter(content: &'static [u8]) -> Self {
        Self { width: 612, height: 792, content: Some(content) }
    }

    fn empty(width: i64, height: i64) -> Self {
        Self { width, height, content: None }
    }
}

/// Build a document whose page tree root carries a shared font resource
fn build_pdf(pages: &[TestPage]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut kids = Vec::new();
    for page in pages {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Page".to_vec()));
        dict.set("Parent", Object::Reference(pages_id));
        dict.set("MediaBox", Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(page.width),
            Object::Integer(page.height),
        ]));
        if let Some(content) = page.content {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
            dict.set("Contents", Object::Reference(content_id));
        }
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(dict))));
    }

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Resources", Object::Dictionary(resources));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc
}

fn write_pdf(dir: &TempDir, name: &str, pages: &[TestPage]) -> PathBuf {
    let path = dir.path().join(name);
    build_pdf(pages).save(&path).expect("Failed to write test PDF");
    path
}

fn write_logo(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("logo.png");
    RgbImage::from_pixel(30, 30, Rgb([0, 96, 192]))
        .save(&path)
        .expect("Failed to write test logo");
    path
}

fn rotations(path: &Path) -> Vec<i64> {
    let doc = PdfDocument::load(path).expect("Failed to reload output");
    doc.pages().unwrap().iter().map(|p| p.rotation).collect()
}

/// Resolve the overlay Form XObject registered on a page
fn overlay_stream<'a>(doc: &'a Document, page_id: ObjectId) -> &'a Stream {
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let overlay_id = xobjects.get(b"FooterOverlay").unwrap().as_reference().unwrap();
    doc.get_object(overlay_id).unwrap().as_stream().unwrap()
}

#[test]
fn test_rotate_single_page() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "three.pdf", &[
        TestPage::letter(b"BT ET"),
        TestPage::letter(b"BT ET"),
        TestPage::letter(b"BT ET"),
    ]);
    let output = temp_dir.path().join("rotated.pdf");

    let mut options = EditOptions::new(&input, &output);
    options.rotate = Some("2:90".parse().unwrap());
    let report = edit_pdf(&options).expect("Failed to edit PDF");

    assert_eq!(report.page_count, 3);
    assert!(report.skipped_rotations().is_empty());
    assert_eq!(rotations(&output), vec![0, 90, 0]);
}

#[test]
fn test_rotation_out_of_range_is_skipped() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "one.pdf", &[TestPage::letter(b"BT ET")]);
    let output = temp_dir.path().join("out.pdf");

    let mut options = EditOptions::new(&input, &output);
    options.rotate = Some("1:180,5:90".parse().unwrap());
    let report = edit_pdf(&options).expect("Out-of-range pages should not fail the run");

    assert_eq!(report.skipped_rotations(), &[5]);
    assert_eq!(rotations(&output), vec![180]);
}

#[test]
fn test_rotation_composes() {
    let pages = || build_pdf(&[TestPage::letter(b"BT ET"), TestPage::letter(b"BT ET")]);

    let mut stepwise = PdfDocument::from_lopdf(pages());
    RotateStage::new("1:90".parse().unwrap()).apply(&mut stepwise).unwrap();
    RotateStage::new("1:270".parse().unwrap()).apply(&mut stepwise).unwrap();
    RotateStage::new("1:180".parse().unwrap()).apply(&mut stepwise).unwrap();

    let mut once = PdfDocument::from_lopdf(pages());
    RotateStage::new("1:180".parse().unwrap()).apply(&mut once).unwrap();

    assert_eq!(stepwise.page(1).unwrap().unwrap().rotation, 180);
    assert_eq!(once.page(1).unwrap().unwrap().rotation, 180);
    // Page 2 was never named
    assert_eq!(stepwise.page(2).unwrap().unwrap().rotation, 0);
}

#[test]
fn test_rotation_full_turn_is_noop() {
    let mut doc = PdfDocument::from_lopdf(build_pdf(&[TestPage::letter(b"BT ET")]));
    RotateStage::new("1:90".parse().unwrap()).apply(&mut doc).unwrap();

    let mut spec = RotationSpec::new();
    spec.insert(1, 360).unwrap();
    RotateStage::new(spec).apply(&mut doc).unwrap();
    assert_eq!(doc.page(1).unwrap().unwrap().rotation, 90);

    RotateStage::new("1:0".parse().unwrap()).apply(&mut doc).unwrap();
    assert_eq!(doc.page(1).unwrap().unwrap().rotation, 90);
}

#[test]
fn test_replace_url() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "wiki.pdf", &[TestPage::letter(b"visit team-wiki.local/docs")]);
    let output = temp_dir.path().join("fixed.pdf");

    let mut options = EditOptions::new(&input, &output);
    options.replace = Some(ReplacementSpec::new("team-wiki.local", "team-wiki.etc.com").unwrap());
    let report = edit_pdf(&options).expect("Failed to edit PDF");

    assert_eq!(report.replacement_count(), Some(1));

    let doc = PdfDocument::load(&output).unwrap();
    assert_eq!(
        doc.page_content(1).unwrap().as_deref(),
        Some(&b"visit team-wiki.etc.com/docs"[..])
    );
}

#[test]
fn test_replace_skips_pages_without_content() {
    let mut doc = PdfDocument::from_lopdf(build_pdf(&[
        TestPage::letter(b"BT (old.example) Tj ET"),
        TestPage::empty(612, 792),
    ]));

    let stage = ReplaceStage::new(ReplacementSpec::new("old.example", "new.example").unwrap());
    let outcome = stage.apply(&mut doc).expect("Pages without content must not fail");

    assert_eq!(
        outcome,
        StageOutcome::Replaced { replacements: 1, pages_without_content: vec![2] }
    );
    assert_eq!(doc.page_content(2).unwrap(), None);
    assert_eq!(doc.page_content(1).unwrap().unwrap(), b"BT (new.example) Tj ET".to_vec());
}

#[test]
fn test_replace_zero_matches_is_not_an_error() {
    let mut doc = PdfDocument::from_lopdf(build_pdf(&[TestPage::letter(b"BT (hello) Tj ET")]));

    let stage = ReplaceStage::new(ReplacementSpec::new("team-wiki.local", "x").unwrap());
    let outcome = stage.apply(&mut doc).unwrap();

    assert!(matches!(outcome, StageOutcome::Replaced { replacements: 0, .. }));
    assert_eq!(doc.page_content(1).unwrap().unwrap(), b"BT (hello) Tj ET".to_vec());
}

#[test]
fn test_replace_shared_stream_once() {
    let mut raw = build_pdf(&[TestPage::letter(b"(wiki) Tj"), TestPage::empty(612, 792)]);

    // Point page 2 at page 1's content stream
    let page_ids: Vec<ObjectId> = raw.get_pages().values().copied().collect();
    let shared = raw.get_dictionary(page_ids[0]).unwrap().get(b"Contents").unwrap().clone();
    raw.get_dictionary_mut(page_ids[1]).unwrap().set("Contents", shared);

    let mut doc = PdfDocument::from_lopdf(raw);
    let stage = ReplaceStage::new(ReplacementSpec::new("wiki", "wikiwiki").unwrap());
    stage.apply(&mut doc).unwrap();

    assert_eq!(doc.page_content(1).unwrap().unwrap(), b"(wikiwiki) Tj".to_vec());
    assert_eq!(doc.page_content(2).unwrap().unwrap(), b"(wikiwiki) Tj".to_vec());
}

#[test]
fn test_footer_placement_on_letter() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "letter.pdf", &[TestPage::letter(b"BT /F1 12 Tf (Body) Tj ET")]);
    let output = temp_dir.path().join("branded.pdf");
    let logo = write_logo(&temp_dir);

    let mut options = EditOptions::new(&input, &output);
    options.footer = Some(FooterSpec::new(&logo));
    let report = edit_pdf(&options).expect("Failed to edit PDF");
    assert_eq!(report.footer_pages(), 1);

    let doc = PdfDocument::load(&output).unwrap();
    assert_eq!(doc.page_count(), 1);

    let page_id = doc.page_id(1).unwrap();
    let overlay = overlay_stream(doc.inner(), page_id);
    let overlay_content = String::from_utf8_lossy(&overlay.content);
    assert!(
        overlay_content.contains("30 0 0 30 562 30 cm"),
        "Unexpected overlay content: {}",
        overlay_content
    );

    let bbox: Vec<f32> = overlay.dict.get(b"BBox").unwrap().as_array().unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect();
    assert_eq!(bbox, vec![0.0, 0.0, 612.0, 792.0]);

    // Original content survives, isolated, with the overlay drawn last
    let content = String::from_utf8_lossy(&doc.page_content(1).unwrap().unwrap()).into_owned();
    let body = content.find("(Body) Tj").expect("Original content lost");
    let restore = content.find("\nQ\n").expect("Original content not restored");
    let invoke = content.find("/FooterOverlay Do").expect("Overlay not invoked");
    assert!(content.starts_with("q\n"));
    assert!(body < invoke && restore < invoke);
}

#[test]
fn test_footer_keeps_inherited_resources() {
    let mut doc = PdfDocument::from_lopdf(build_pdf(&[TestPage::letter(b"BT /F1 12 Tf (x) Tj ET")]));

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stage = FooterStage::new(&FooterSpec::new(write_logo(&temp_dir))).expect("Failed to read logo");
    stage.apply(&mut doc).unwrap();

    let page_id = doc.page_id(1).unwrap();
    let page = doc.inner().get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    assert!(fonts.has(b"F1"), "Inherited font resource was dropped");
    assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"FooterOverlay"));
}

#[test]
fn test_footer_is_independent_of_page_size() {
    let mut doc = PdfDocument::from_lopdf(build_pdf(&[
        TestPage::letter(b"BT ET"),
        TestPage::empty(300, 200),
        TestPage::empty(40, 40),
    ]));
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stage = FooterStage::new(&FooterSpec::new(write_logo(&temp_dir))).unwrap();

    let outcome = stage.apply(&mut doc).unwrap();
    let placements = match outcome {
        StageOutcome::Footer { placements } => placements,
        other => panic!("Unexpected outcome: {:?}", other),
    };

    let origins: Vec<(u32, f32, f32)> = placements.iter().map(|(p, r)| (*p, r.x, r.y)).collect();
    assert_eq!(origins, vec![(1, 562.0, 30.0), (2, 250.0, 30.0), (3, -10.0, 30.0)]);
    assert_eq!(doc.page_count(), 3);
}

#[test]
fn test_footer_follows_offset_media_box() {
    let mut pdf = build_pdf(&[TestPage::letter(b"BT ET")]);
    let page_id = *pdf.get_pages().get(&1).unwrap();
    pdf.get_dictionary_mut(page_id).unwrap().set("MediaBox", Object::Array(vec![
        Object::Integer(100),
        Object::Integer(100),
        Object::Integer(712),
        Object::Integer(892),
    ]));
    let mut doc = PdfDocument::from_lopdf(pdf);

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stage = FooterStage::new(&FooterSpec::new(write_logo(&temp_dir))).unwrap();
    let placements = match stage.apply(&mut doc).unwrap() {
        StageOutcome::Footer { placements } => placements,
        other => panic!("Unexpected outcome: {:?}", other),
    };
    assert_eq!((placements[0].1.x, placements[0].1.y), (662.0, 130.0));

    let overlay = overlay_stream(doc.inner(), page_id);
    assert!(String::from_utf8_lossy(&overlay.content).contains("30 0 0 30 662 130 cm"));
}

#[test]
fn test_footer_missing_image_writes_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "in.pdf", &[TestPage::letter(b"BT ET")]);
    let output = temp_dir.path().join("out.pdf");

    let mut options = EditOptions::new(&input, &output);
    options.rotate = Some("1:90".parse().unwrap());
    options.footer = Some(FooterSpec::new(temp_dir.path().join("missing-logo.png")));

    let err = edit_pdf(&options).unwrap_err();
    assert!(matches!(err, Error::Overlay { .. }), "Unexpected error: {}", err);
    assert_eq!(err.stage(), "footer");
    assert!(!output.exists(), "No output should be written on failure");
}

#[test]
fn test_combined_edits() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "combined.pdf", &[
        TestPage::letter(b"BT (see team-wiki.local) Tj ET"),
        TestPage::letter(b"BT (team-wiki.local/a team-wiki.local/b) Tj ET"),
        TestPage::empty(612, 792),
    ]);
    let output = temp_dir.path().join("combined-out.pdf");

    let mut options = EditOptions::new(&input, &output);
    options.rotate = Some("2:90,3:-90".parse().unwrap());
    options.replace = Some(ReplacementSpec::new("team-wiki.local", "team-wiki.etc.com").unwrap());
    options.footer = Some(FooterSpec::new(write_logo(&temp_dir)));

    let report = edit_pdf(&options).expect("Failed to edit PDF");
    let stages: Vec<&str> = report.outcomes.iter().map(|(name, _)| *name).collect();
    assert_eq!(stages, vec!["rotate", "replace", "footer"]);
    assert_eq!(report.replacement_count(), Some(3));
    assert_eq!(report.footer_pages(), 3);

    let doc = PdfDocument::load(&output).unwrap();
    assert_eq!(rotations(&output), vec![0, 90, 270]);

    for ordinal in 1..=3 {
        let content = doc.page_content(ordinal).unwrap().unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(!text.contains("team-wiki.local"), "Page {} still has the old URL", ordinal);
        assert!(text.contains("/FooterOverlay Do"), "Page {} has no footer", ordinal);

        let overlay = overlay_stream(doc.inner(), doc.page_id(ordinal).unwrap());
        assert!(String::from_utf8_lossy(&overlay.content).contains("562 30 cm"));
    }

    let page2 = String::from_utf8_lossy(&doc.page_content(2).unwrap().unwrap()).into_owned();
    assert_eq!(page2.matches("team-wiki.etc.com").count(), 2);
}

#[test]
fn test_load_nonexistent_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let options = EditOptions::new("nonexistent.pdf", temp_dir.path().join("out.pdf"));

    let err = edit_pdf(&options).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
    assert_eq!(err.stage(), "load");
}

#[test]
fn test_load_malformed_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = temp_dir.path().join("broken.pdf");
    std::fs::write(&input, b"this is not a pdf").unwrap();

    let err = PdfDocument::load(&input).unwrap_err();
    assert!(matches!(err, Error::Load { .. }), "Unexpected error: {}", err);
    assert!(err.to_string().contains("broken.pdf"));
}

#[test]
fn test_write_to_missing_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "in.pdf", &[TestPage::letter(b"BT ET")]);
    let output = temp_dir.path().join("no-such-dir").join("out.pdf");

    let err = edit_pdf(&EditOptions::new(&input, &output)).unwrap_err();
    assert!(matches!(err, Error::Write { .. }), "Unexpected error: {}", err);
    assert_eq!(err.stage(), "write");
}

#[test]
fn test_no_edits_copies_pages() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "in.pdf", &[TestPage::letter(b"BT ET"), TestPage::empty(200, 100)]);
    let output = temp_dir.path().join("copy.pdf");

    let report = edit_pdf(&EditOptions::new(&input, &output)).unwrap();
    assert!(report.outcomes.is_empty());

    let pages = PdfDocument::load(&output).unwrap().pages().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].dimensions.width, 200.0);
    assert_eq!(pages[1].dimensions.height, 100.0);
}

fn pdf_editor() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pdf-editor"))
}

#[test]
fn test_cli_edit() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "in.pdf", &[TestPage::letter(b"BT ET"), TestPage::letter(b"BT ET")]);
    let output = temp_dir.path().join("out.pdf");

    let result = pdf_editor()
        .arg("--input").arg(&input)
        .arg("--output").arg(&output)
        .args(["--rotate", "2:90"])
        .output()
        .expect("Failed to run pdf-editor");

    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));
    assert!(String::from_utf8_lossy(&result.stderr).contains("PDF processed successfully"));
    assert_eq!(rotations(&output), vec![0, 90]);
}

#[test]
fn test_cli_failure_names_stage() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let output = temp_dir.path().join("out.pdf");

    let result = pdf_editor()
        .arg("--input").arg(temp_dir.path().join("missing.pdf"))
        .arg("--output").arg(&output)
        .output()
        .expect("Failed to run pdf-editor");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("Error (load): File not found"), "stderr: {}", stderr);
    assert!(!output.exists());
}

#[test]
fn test_cli_global_flag_before_subcommand() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_pdf(&temp_dir, "in.pdf", &[TestPage::letter(b"BT ET")]);

    let result = pdf_editor()
        .args(["-q", "info"])
        .arg(&input)
        .output()
        .expect("Failed to run pdf-editor");

    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));
    assert!(String::from_utf8_lossy(&result.stdout).contains("Pages: 1"));
}
