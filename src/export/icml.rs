//! ICML snippet export
//!
//! Renders label text as an InCopy story that InDesign can place directly.
//! Inline `**bold**` and `__underlined__` markup becomes character styles.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::template::{strip_markup, LabelText};

/// Export error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid export name: {0}")]
    InvalidName(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

const FILE_HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<?aid style=\"50\" type=\"snippet\" readerVersion=\"6.0\" featureSet=\"257\" product=\"8.0(370)\" ?>\n",
    "<?aid SnippetType=\"InCopyInterchange\"?>\n",
    "<Document DOMVersion=\"8.0\" Self=\"d\">\n",
);

const STYLE_GROUPS: &str = concat!(
    "\t<RootCharacterStyleGroup Self=\"u186\">\n",
    "\t\t<CharacterStyle Self=\"CharacterStyle/$ID/[No character style]\" Imported=\"false\" Name=\"$ID/[No character style]\" />\n",
    "\t\t<CharacterStyle Self=\"CharacterStyle/bolder\" Imported=\"false\" KeyboardShortcut=\"1 104\" Name=\"bolder\" FontStyle=\"Condensed\">\n",
    "\t\t\t<Properties>\n",
    "\t\t\t\t<BasedOn type=\"string\">$ID/[No character style]</BasedOn>\n",
    "\t\t\t\t<PreviewColor type=\"enumeration\">Nothing</PreviewColor>\n",
    "\t\t\t</Properties>\n",
    "\t\t</CharacterStyle>\n",
    "\t\t<CharacterStyle Self=\"CharacterStyle/underlined\" Imported=\"false\" KeyboardShortcut=\"1 101\" Name=\"underlined\" Underline=\"true\">\n",
    "\t\t\t<Properties>\n",
    "\t\t\t\t<BasedOn type=\"string\">$ID/[No character style]</BasedOn>\n",
    "\t\t\t\t<PreviewColor type=\"enumeration\">Nothing</PreviewColor>\n",
    "\t\t\t</Properties>\n",
    "\t\t</CharacterStyle>\n",
    "\t</RootCharacterStyleGroup>\n",
    "\t<RootParagraphStyleGroup Self=\"u184\">\n",
    "\t\t<ParagraphStyle Self=\"ParagraphStyle/general text\" Name=\"general text\" Imported=\"false\" NextStyle=\"ParagraphStyle/general text\" KeyboardShortcut=\"0 0\" FontStyle=\"Light Condensed\" PointSize=\"6\" KerningMethod=\"$ID/Optical\" Ligatures=\"false\" AppliedLanguage=\"$ID/Czech\" Hyphenation=\"false\" SpaceAfter=\"1.700787401574803\" Justification=\"CenterAlign\">\n",
    "\t\t\t<Properties>\n",
    "\t\t\t\t<BasedOn type=\"object\">ParagraphStyle/$ID/NormalParagraphStyle</BasedOn>\n",
    "\t\t\t\t<PreviewColor type=\"enumeration\">Nothing</PreviewColor>\n",
    "\t\t\t\t<Leading type=\"unit\">5.5</Leading>\n",
    "\t\t\t\t<AppliedFont type=\"string\">Myriad Pro</AppliedFont>\n",
    "\t\t\t\t<BalanceRaggedLines type=\"enumeration\">VeeShape</BalanceRaggedLines>\n",
    "\t\t\t</Properties>\n",
    "\t\t</ParagraphStyle>\n",
    "\t\t<ParagraphStyle Self=\"ParagraphStyle/contents paragraph\" Name=\"contents paragraph\" Imported=\"false\" NextStyle=\"ParagraphStyle/nutritional paragraph\" KeyboardShortcut=\"0 0\" KerningMethod=\"$ID/Metrics\">\n",
    "\t\t\t<Properties>\n",
    "\t\t\t\t<BasedOn type=\"object\">ParagraphStyle/general text</BasedOn>\n",
    "\t\t\t\t<PreviewColor type=\"enumeration\">Nothing</PreviewColor>\n",
    "\t\t\t\t<AllNestedStyles type=\"list\">\n",
    "\t\t\t\t\t<ListItem type=\"record\">\n",
    "\t\t\t\t\t\t<AppliedCharacterStyle type=\"object\">CharacterStyle/bolder</AppliedCharacterStyle>\n",
    "\t\t\t\t\t\t<Delimiter type=\"enumeration\">AnyWord</Delimiter>\n",
    "\t\t\t\t\t\t<Repetition type=\"long\">1</Repetition>\n",
    "\t\t\t\t\t\t<Inclusive type=\"boolean\">true</Inclusive>\n",
    "\t\t\t\t\t</ListItem>\n",
    "\t\t\t\t</AllNestedStyles>\n",
    "\t\t\t</Properties>\n",
    "\t\t</ParagraphStyle>\n",
    "\t\t<ParagraphStyle Self=\"ParagraphStyle/expiry date\" Name=\"expiry date\" Imported=\"false\" NextStyle=\"ParagraphStyle/expiry date\" KeyboardShortcut=\"0 0\" PointSize=\"11\" KerningMethod=\"$ID/Optical\" Ligatures=\"false\" Tracking=\"30\" AppliedLanguage=\"$ID/Czech\" Hyphenation=\"false\" SpaceAfter=\"1.700787401574803\" Justification=\"CenterAlign\">\n",
    "\t\t\t<Properties>\n",
    "\t\t\t\t<BasedOn type=\"string\">$ID/[No paragraph style]</BasedOn>\n",
    "\t\t\t\t<PreviewColor type=\"enumeration\">Nothing</PreviewColor>\n",
    "\t\t\t\t<Leading type=\"unit\">11</Leading>\n",
    "\t\t\t\t<AppliedFont type=\"string\">ITC Officina Sans</AppliedFont>\n",
    "\t\t\t\t<BalanceRaggedLines type=\"enumeration\">VeeShape</BalanceRaggedLines>\n",
    "\t\t\t</Properties>\n",
    "\t\t</ParagraphStyle>\n",
    "\t\t<ParagraphStyle Self=\"ParagraphStyle/$ID/NormalParagraphStyle\" Name=\"$ID/NormalParagraphStyle\" Imported=\"false\" NextStyle=\"ParagraphStyle/$ID/NormalParagraphStyle\" KeyboardShortcut=\"0 0\">\n",
    "\t\t\t<Properties>\n",
    "\t\t\t\t<BasedOn type=\"string\">$ID/[No paragraph style]</BasedOn>\n",
    "\t\t\t\t<PreviewColor type=\"enumeration\">Nothing</PreviewColor>\n",
    "\t\t\t\t<BulletsFont type=\"string\">$ID/</BulletsFont>\n",
    "\t\t\t\t<BulletsFontStyle type=\"enumeration\">Nothing</BulletsFontStyle>\n",
    "\t\t\t</Properties>\n",
    "\t\t</ParagraphStyle>\n",
    "\t\t<ParagraphStyle Self=\"ParagraphStyle/nutritional paragraph\" Name=\"nutritional paragraph\" Imported=\"false\" NextStyle=\"ParagraphStyle/nutritional paragraph\" KeyboardShortcut=\"0 0\" Tracking=\"10\" SpaceAfter=\"2.834645669291339\">\n",
    "\t\t\t<Properties>\n",
    "\t\t\t\t<BasedOn type=\"object\">ParagraphStyle/general text</BasedOn>\n",
    "\t\t\t\t<PreviewColor type=\"enumeration\">Nothing</PreviewColor>\n",
    "\t\t\t\t<AllNestedStyles type=\"list\">\n",
    "\t\t\t\t\t<ListItem type=\"record\">\n",
    "\t\t\t\t\t\t<AppliedCharacterStyle type=\"object\">CharacterStyle/bolder</AppliedCharacterStyle>\n",
    "\t\t\t\t\t\t<Delimiter type=\"enumeration\">AnyWord</Delimiter>\n",
    "\t\t\t\t\t\t<Repetition type=\"long\">4</Repetition>\n",
    "\t\t\t\t\t\t<Inclusive type=\"boolean\">true</Inclusive>\n",
    "\t\t\t\t\t</ListItem>\n",
    "\t\t\t\t</AllNestedStyles>\n",
    "\t\t\t</Properties>\n",
    "\t\t</ParagraphStyle>\n",
    "\t</RootParagraphStyleGroup>\n",
);

const STORY_FOOTER: &str = "\t</Story>\n</Document>\n";

/// Paragraph styles defined in the style groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    GeneralText,
    Contents,
    Nutrition,
    Expiry,
}

impl ParagraphStyle {
    fn name(&self) -> &'static str {
        match self {
            ParagraphStyle::GeneralText => "general text",
            ParagraphStyle::Contents => "contents paragraph",
            ParagraphStyle::Nutrition => "nutritional paragraph",
            ParagraphStyle::Expiry => "expiry date",
        }
    }
}

/// Character styling of one run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharStyle {
    Plain,
    Semibold,
    Bold,
    Underlined,
}

impl CharStyle {
    fn attributes(&self) -> &'static str {
        match self {
            CharStyle::Plain => "AppliedCharacterStyle=\"CharacterStyle/$ID/[No character style]\"",
            CharStyle::Semibold => {
                "AppliedCharacterStyle=\"CharacterStyle/$ID/[No character style]\" FontStyle=\"Semibold Condensed\""
            }
            CharStyle::Bold => {
                "AppliedCharacterStyle=\"CharacterStyle/$ID/[No character style]\" FontStyle=\"Condensed\""
            }
            CharStyle::Underlined => "AppliedCharacterStyle=\"CharacterStyle/underlined\"",
        }
    }

    fn for_marker(marker: &str) -> CharStyle {
        if marker == "**" {
            CharStyle::Bold
        } else {
            CharStyle::Underlined
        }
    }
}

/// Split marked-up text into styled runs
///
/// An unclosed marker styles the rest of the text.
pub fn parse_markup(text: &str) -> Vec<(CharStyle, &str)> {
    let mut runs = Vec::new();
    let mut rest = text;

    loop {
        let next = [rest.find("**"), rest.find("__")]
            .into_iter()
            .flatten()
            .min();
        let Some(start) = next else {
            if !rest.is_empty() {
                runs.push((CharStyle::Plain, rest));
            }
            break;
        };

        if start > 0 {
            runs.push((CharStyle::Plain, &rest[..start]));
        }
        let marker = &rest[start..start + 2];
        let inner = &rest[start + 2..];
        let (styled, remainder) = match inner.find(marker) {
            Some(end) => (&inner[..end], &inner[end + 2..]),
            None => (inner, ""),
        };
        if !styled.is_empty() {
            runs.push((CharStyle::for_marker(marker), styled));
        }
        rest = remainder;
    }
    runs
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds the story blocks of one snippet
#[derive(Debug, Default)]
pub struct IcmlBuilder {
    blocks: Vec<String>,
}

impl IcmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn paragraph(&mut self, style: ParagraphStyle, runs: &[(CharStyle, &str)], line_break: bool) {
        let mut block = format!(
            "\t\t<ParagraphStyleRange AppliedParagraphStyle=\"ParagraphStyle/{}\">\n",
            style.name()
        );
        let runs: Vec<(CharStyle, &str)> = if runs.is_empty() {
            vec![(CharStyle::Plain, "")]
        } else {
            runs.to_vec()
        };
        let last = runs.len() - 1;

        for (i, (char_style, text)) in runs.iter().enumerate() {
            block.push_str(&format!("\t\t\t<CharacterStyleRange {}>\n", char_style.attributes()));
            block.push_str(&format!("\t\t\t\t<Content>{}</Content>\n", escape_xml(text)));
            if line_break && i == last {
                block.push_str("\t\t\t\t<Br />\n");
            }
            block.push_str("\t\t\t</CharacterStyleRange>\n");
        }
        block.push_str("\t\t</ParagraphStyleRange>\n");
        self.blocks.push(block);
    }

    pub fn heading(&mut self, text: &str) -> &mut Self {
        let plain = strip_markup(text);
        self.paragraph(ParagraphStyle::GeneralText, &[(CharStyle::Semibold, plain.as_str())], true);
        self
    }

    pub fn subheading(&mut self, text: &str) -> &mut Self {
        let plain = strip_markup(text);
        self.paragraph(ParagraphStyle::GeneralText, &[(CharStyle::Plain, plain.as_str())], true);
        self
    }

    pub fn contents(&mut self, text: &str) -> &mut Self {
        self.paragraph(ParagraphStyle::Contents, &parse_markup(text), true);
        self
    }

    pub fn nutrition(&mut self, text: &str) -> &mut Self {
        self.paragraph(ParagraphStyle::Nutrition, &parse_markup(text), true);
        self
    }

    pub fn footer(&mut self, text: &str) -> &mut Self {
        self.paragraph(ParagraphStyle::GeneralText, &parse_markup(text), true);
        self
    }

    pub fn expiry(&mut self, text: &str) -> &mut Self {
        self.paragraph(ParagraphStyle::Expiry, &[(CharStyle::Plain, text)], false);
        self
    }

    /// Complete ICML document with the given story title
    pub fn build(&self, story_title: &str) -> String {
        let mut doc = String::from(FILE_HEADER);
        doc.push_str(STYLE_GROUPS);
        doc.push_str(&format!(
            "\t<Story Self=\"u1e3\" AppliedTOCStyle=\"n\" TrackChanges=\"false\" StoryTitle=\"{}\" AppliedNamedGrid=\"n\">\n",
            escape_xml(story_title)
        ));
        doc.push_str("\t\t<StoryPreference OpticalMarginAlignment=\"false\" OpticalMarginSize=\"12\" FrameType=\"TextFrameType\" StoryOrientation=\"Horizontal\" StoryDirection=\"LeftToRightDirection\" />\n");
        doc.push_str("\t\t<InCopyExportOption IncludeGraphicProxies=\"true\" IncludeAllResources=\"false\" />\n");
        for block in &self.blocks {
            doc.push_str(block);
        }
        doc.push_str(STORY_FOOTER);
        doc
    }
}

/// Render every block of a label
pub fn render_label(title: &str, label: &LabelText) -> String {
    IcmlBuilder::new()
        .heading(&label.heading)
        .subheading(&label.subheading)
        .contents(&label.contents)
        .nutrition(&label.nutrition)
        .footer(&label.footer)
        .expiry(&label.expiry)
        .build(title)
}

fn check_name(name: &str) -> ExportResult<()> {
    let bad = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == "..";
    if bad {
        return Err(ExportError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Write `<name>.icml` into `dir`, creating the directory when needed
pub fn write_icml(dir: &Path, name: &str, label: &LabelText) -> ExportResult<PathBuf> {
    check_name(name)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.icml", name));
    std::fs::write(&path, render_label(name, label))?;
    tracing::info!(path = %path.display(), "exported ICML snippet");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> LabelText {
        LabelText {
            heading: "OVESNÉ VLOČKY PŘES NOC".into(),
            subheading: "Bez přidaného cukru.".into(),
            contents: "**Složení:** oves 40%, mléko & med.".into(),
            nutrition: "energie 1628 kJ".into(),
            footer: "Skladujte při 2 °C. __Hmotnost: 300g__".into(),
            expiry: "01-03-2024".into(),
        }
    }

    #[test]
    fn test_parse_markup() {
        let runs = parse_markup("**Složení:** oves __40%__ a");
        assert_eq!(
            runs,
            vec![
                (CharStyle::Bold, "Složení:"),
                (CharStyle::Plain, " oves "),
                (CharStyle::Underlined, "40%"),
                (CharStyle::Plain, " a"),
            ]
        );
        assert_eq!(parse_markup("plain"), vec![(CharStyle::Plain, "plain")]);
        assert_eq!(parse_markup("x __open"), vec![(CharStyle::Plain, "x "), (CharStyle::Underlined, "open")]);
        assert!(parse_markup("").is_empty());
    }

    #[test]
    fn test_render_structure() {
        let doc = render_label("overnight", &label());
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(doc.ends_with("\t</Story>\n</Document>\n"));
        assert!(doc.contains("StoryTitle=\"overnight\""));
        assert!(doc.contains("<Content> oves 40%, mléko &amp; med.</Content>"));
        assert!(doc.contains("FontStyle=\"Condensed\">\n\t\t\t\t<Content>Složení:</Content>"));
        assert!(doc.contains("CharacterStyle/underlined\">\n\t\t\t\t<Content>Hmotnost: 300g</Content>"));
        assert_eq!(doc.matches("<ParagraphStyleRange").count(), 6);
        // the expiry date closes the story without a break
        assert!(doc.contains("<Content>01-03-2024</Content>\n\t\t\t</CharacterStyleRange>"));
    }

    #[test]
    fn test_write_icml() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("export");
        let path = write_icml(&target, "overnight", &label()).unwrap();
        assert_eq!(path, target.join("overnight.icml"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("OVESNÉ VLOČKY PŘES NOC"));
    }

    #[test]
    fn test_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            write_icml(dir.path(), "../escape", &label()),
            Err(ExportError::InvalidName(_))
        ));
        assert!(matches!(write_icml(dir.path(), " ", &label()), Err(ExportError::InvalidName(_))));
    }
}
