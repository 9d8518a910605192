/// Code points treated as emoji outside the supplementary planes
const BMP_EMOJI_RANGES: &[(char, char)] = &[
    ('\u{200D}', '\u{200D}'), // zero width joiner
    ('\u{20E3}', '\u{20E3}'), // combining keycap
    ('\u{231A}', '\u{231B}'),
    ('\u{23E9}', '\u{23FA}'),
    ('\u{2600}', '\u{27BF}'), // misc symbols, dingbats
    ('\u{2B05}', '\u{2B55}'),
    ('\u{FE0E}', '\u{FE0F}'), // variation selectors
];

/// Emoji: anything outside the BMP plus the common BMP symbol ranges
pub fn is_emoji(c: char) -> bool {
    if c as u32 >= 0x1_0000 {
        return true;
    }
    BMP_EMOJI_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&c))
}

/// Whether a character is a precomposed Hangul syllable (가..힣)
pub fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

pub fn count_hangul(text: &str) -> usize {
    text.chars().filter(|&c| is_hangul(c)).count()
}

pub fn count_non_whitespace(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Where a line sits relative to fenced code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRegion {
    Outside,
    /// Opening or closing ``` / ~~~ line
    Fence,
    Inside,
}

/// Line-by-line fenced code tracking.
///
/// A fence that is never closed runs to the end of the text, so truncated
/// output keeps its code out of prose statistics.
#[derive(Debug, Default)]
pub struct FenceTracker {
    open: bool,
}

impl FenceTracker {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Classify the next line and advance past it
    pub fn classify(&mut self, line: &str) -> CodeRegion {
        if is_fence(line) {
            self.open = !self.open;
            CodeRegion::Fence
        } else if self.open {
            CodeRegion::Inside
        } else {
            CodeRegion::Outside
        }
    }
}

/// Remove fenced code, fences included, so code does not distort script statistics
pub fn strip_code_blocks(text: &str) -> String {
    let mut fences = FenceTracker::default();
    text.split('\n')
        .filter(|line| fences.classify(line) == CodeRegion::Outside)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown header line (`#`, `##`, ...)
pub fn is_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Bullet (`-`, `*`, `+`, `•`) or numbered (`1.`, `2)`) list item
pub fn is_list_item(line: &str) -> bool {
    let line = line.trim_start();

    if let Some(rest) = line.strip_prefix(['-', '*', '+', '•']) {
        return rest.is_empty() || rest.starts_with(char::is_whitespace);
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    // ASCII digits are one byte each
    let rest = &line[digits..];
    match rest.strip_prefix(['.', ')']) {
        Some(after) => after.is_empty() || after.starts_with(char::is_whitespace),
        None => false,
    }
}

pub fn is_blockquote(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

/// Opening or closing fence of a code block
pub fn is_fence(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("```") || line.starts_with("~~~")
}
