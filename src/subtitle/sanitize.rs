// Inline markup removal
use super::Format;
use regex::Regex;
use std::sync::LazyLock;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn compile(rules: &[(&str, &'static str)]) -> Vec<Rule> {
    rules
        .iter()
        .map(|(pattern, replacement)| Rule {
            pattern: Regex::new(pattern).expect("static markup pattern"),
            replacement,
        })
        .collect()
}

static SSA_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        // Layer/Marked, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect
        (r"^Dialogue:[^,]*(?:,[^,]*){8},", ""),
        (r"\{[^}]*\\(?:fade?|bord|xbord|ybord|shad|blur|be)[^}]*\}", ""),
        (r"\{[^}]*\}", ""),
        (r"<[^>]*>", ""),
        (r"\\[Nn]", "\n"),
        (r"\\h", " "),
        (r"\\+", ""),
    ])
});

static HTML_RULES: LazyLock<Vec<Rule>> =
    LazyLock::new(|| compile(&[(r"<[^>]*>", ""), (r"\{\\[^}]*\}", "")]));

static MICRODVD_RULES: LazyLock<Vec<Rule>> =
    LazyLock::new(|| compile(&[(r"\{[A-Za-z]:[^}]*\}", "")]));

// Enhanced LRC word timing: <mm:ss.xx>
static LRC_RULES: LazyLock<Vec<Rule>> =
    LazyLock::new(|| compile(&[(r"<\d+:\d+(?:[.:]\d+)?>", "")]));

fn rules_for(format: Format) -> &'static [Rule] {
    match format {
        Format::Ssa => SSA_RULES.as_slice(),
        Format::Srt | Format::Ttml | Format::LegacyXml | Format::PassThrough => HTML_RULES.as_slice(),
        Format::MicroDvd => MICRODVD_RULES.as_slice(),
        Format::Lrc => LRC_RULES.as_slice(),
        Format::Binary => &[],
    }
}

/// Strip the markup of `format` from `text`.
pub fn strip(text: &str, format: Format) -> String {
    // Pre-decoded ASS events still carry their dialogue header.
    let format = match format {
        Format::PassThrough if text.starts_with("Dialogue:") => Format::Ssa,
        other => other,
    };

    let mut result = text.to_string();
    for rule in rules_for(format) {
        if rule.pattern.is_match(&result) {
            result = rule
                .pattern
                .replace_all(&result, rule.replacement)
                .into_owned();
        }
    }

    result
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssa_override_tags() {
        assert_eq!(strip(r"Hello {\b1}world{\b0}", Format::Ssa), "Hello world");
    }

    #[test]
    fn test_ssa_line_breaks_and_spaces() {
        assert_eq!(strip(r"one\Ntwo\hthree", Format::Ssa), "one\ntwo three");
        assert_eq!(strip(r"one\ntwo", Format::Ssa), "one\ntwo");
    }

    #[test]
    fn test_ssa_fade_and_border() {
        assert_eq!(
            strip(r"{\fad(200,300)}{\bord2\shad0}Fading", Format::Ssa),
            "Fading"
        );
    }

    #[test]
    fn test_ssa_header_prefix_before_tags() {
        let raw = r"Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0000,0000,0000,,{\i1}Hi, there{\i0}";
        assert_eq!(strip(raw, Format::Ssa), "Hi, there");
    }

    #[test]
    fn test_passthrough_dialogue_uses_ssa_rules() {
        let raw = r"Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Line\Nbreak";
        assert_eq!(strip(raw, Format::PassThrough), "Line\nbreak");
        assert_eq!(strip("<b>plain</b>", Format::PassThrough), "plain");
    }

    #[test]
    fn test_ssa_stray_backslashes() {
        assert_eq!(strip(r"a\\b", Format::Ssa), "ab");
    }

    #[test]
    fn test_html_tags() {
        assert_eq!(strip("<i>Hello</i> <b>there</b>", Format::Srt), "Hello there");
        assert_eq!(strip(r"{\an8}Top", Format::Srt), "Top");
    }

    #[test]
    fn test_microdvd_control_codes() {
        assert_eq!(strip("{y:i}Italic\n{c:$0000ff}Red", Format::MicroDvd), "Italic\nRed");
    }

    #[test]
    fn test_lrc_word_timing() {
        assert_eq!(strip("<00:01.00>Hello <00:01.50>World", Format::Lrc), "Hello World");
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        assert_eq!(strip("line one   \nline two  ", Format::Srt), "line one\nline two");
    }
}
