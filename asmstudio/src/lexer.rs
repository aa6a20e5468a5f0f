//! The `lexer` module turns assembly source into colored spans.
//!
//! Five rules run in a fixed order over the whole text. Every match of a rule becomes
//! a [`Span`]; where spans from different rules overlap, the later rule wins when the
//! spans are painted (see [`resolve`]). Comments run last so that keywords inside a
//! comment are still shown as comment text.

use regex::Regex;
use std::sync::LazyLock;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColorClass {
    Mnemonic,
    Directive,
    Label,
    Number,
    Comment,
}

/// Half-open byte range `[start, end)` of the source text tagged with a color class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub class: ColorClass,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize, class: ColorClass) -> Self {
        Self { start, end, class }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

struct Rule {
    class: ColorClass,
    pattern: Regex,
    /// Capture group holding the span (0 = whole match)
    group: usize,
}

impl Rule {
    fn new(class: ColorClass, pattern: &str, group: usize) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(pattern) => Some(Self {
                class,
                pattern,
                group,
            }),
            Err(err) => {
                tracing::error!(?class, %err, "highlight rule failed to compile");
                None
            }
        }
    }
}

const MNEMONIC_PATTERN: &str = r"(?i)\b(MOVE|MOV|AND|XOR|OR|ADD|SUB|CMP|LD|ST|BCC|BCS|BNE|BEQ|BVC|BVS|BPL|BMI|BGE|BLT|BGT|BLE|BUC|BUS|BHI|BLS|JMP|JSR|POP|PUSH|RET|RETI|TRAP|NOP|SXT|ABS|INV|NEG|CLR|INC|DEC|ADDQ|TEST|R0|R1|R2|R3|SP|PS|PC)\b";
const DIRECTIVE_PATTERN: &str = r"(?i)\b(ORG|EQU|DB|DW|DL|DM|DS|INCLUDE)\b";
const LABEL_PATTERN: &str = r"(?m)^[ \t]*([A-Za-z_][A-Za-z0-9_]*:)";
const NUMBER_PATTERN: &str = r"\b(0[xX][0-9A-Fa-f]+|[0-9]+)\b";
const COMMENT_PATTERN: &str = r"(?mR)(;.*$|//.*$)";

/// Rules in application order. A rule that fails to compile is left out, which only
/// costs its coloring.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    [
        (ColorClass::Mnemonic, MNEMONIC_PATTERN, 0),
        (ColorClass::Directive, DIRECTIVE_PATTERN, 0),
        (ColorClass::Label, LABEL_PATTERN, 1),
        (ColorClass::Number, NUMBER_PATTERN, 0),
        (ColorClass::Comment, COMMENT_PATTERN, 0),
    ]
    .into_iter()
    .filter_map(|(class, pattern, group)| Rule::new(class, pattern, group))
    .collect()
});

/// Tokenize the full text. Spans are grouped by rule (in rule order) and each group is
/// in text order.
///
/// # Example
/// ```
/// use asmstudio::lexer::{tokenize, ColorClass, Span};
///
/// let spans = tokenize("  NOP ; idle");
/// assert_eq!(
///     spans,
///     [Span::new(2, 5, ColorClass::Mnemonic), Span::new(6, 12, ColorClass::Comment)]
/// );
/// ```
#[must_use]
pub fn tokenize(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();

    for rule in RULES.iter() {
        for caps in rule.pattern.captures_iter(text) {
            if let Some(m) = caps.get(rule.group)
                && !m.is_empty()
            {
                spans.push(Span::new(m.start(), m.end(), rule.class));
            }
        }
    }
    spans
}

/// Flatten (possibly overlapping) spans into non-overlapping runs, the way a renderer
/// paints them: each byte takes the class of the last span covering it. Spans reaching
/// past `text_len` are clipped.
#[must_use]
pub fn resolve(text_len: usize, spans: &[Span]) -> Vec<Span> {
    let mut paint: Vec<Option<ColorClass>> = vec![None; text_len];
    for span in spans {
        let end = span.end.min(text_len);
        if span.start < end {
            paint[span.start..end].fill(Some(span.class));
        }
    }

    let mut runs: Vec<Span> = Vec::new();
    for (idx, class) in paint.into_iter().enumerate() {
        let Some(class) = class else { continue };
        match runs.last_mut() {
            Some(last) if last.end == idx && last.class == class => last.end = idx + 1,
            _ => runs.push(Span::new(idx, idx + 1, class)),
        }
    }
    runs
}
