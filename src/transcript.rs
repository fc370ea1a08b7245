//! WebVTT transcript handling — strips cue timing down to plain text.

use std::sync::LazyLock;

use regex::Regex;

/// Cue timing line, e.g. `00:01:02.000 --> 00:01:05.000`.
static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2}:)?\d{2}:\d{2}[.,]\d{3}\s+-->\s+(\d{1,2}:)?\d{2}:\d{2}[.,]\d{3}")
        .expect("static regex")
});

/// Whether the content looks like a WebVTT document.
pub fn looks_like_vtt(content: &str) -> bool {
    content.trim_start().starts_with("WEBVTT") || CUE_TIMING.is_match(content)
}

/// Extract the spoken text from a VTT document.
///
/// Keeps the first text line after each cue timing, dropping headers,
/// NOTE blocks, and cue identifiers. Joined with spaces into one block
/// suitable for keyword scanning and analysis.
pub fn extract_text(vtt: &str) -> String {
    let lines: Vec<&str> = vtt.lines().collect();
    let mut text_lines = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with("WEBVTT") || line.starts_with("NOTE") {
            i += 1;
            continue;
        }
        if CUE_TIMING.is_match(line) || line.contains("-->") {
            i += 1;
            if i < lines.len() {
                let text = lines[i].trim();
                if !text.is_empty() {
                    text_lines.push(text);
                }
            }
            continue;
        }
        i += 1;
    }

    text_lines.join(" ")
}

/// Normalize arbitrary transcript content: VTT documents are stripped,
/// anything else passes through untouched.
pub fn normalize(content: &str) -> String {
    if looks_like_vtt(content) {
        extract_text(content)
    } else {
        content.to_string()
    }
}
