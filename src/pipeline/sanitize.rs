//! Output sanitizer: coerce chat-model output into parseable JSON.
//!
//! Models asked for "JSON only" still wrap it in fences, add a sentence of
//! prose, leave trailing commas or switch to single quotes. Rather than one
//! clever parser, this module keeps an ordered ladder of small pure repair
//! stages and stops at the first one whose output parses.
//!
//! ## Ladder
//!
//! 0. parse the input untouched
//! 1. strip a leading ```` ```json ```` / ```` ``` ```` fence and a trailing ```` ``` ````
//! 2. keep only the outer value: `[` to the last `]` when an array of objects
//!    comes first, otherwise the first `{` to the last `}`
//! 3. textual repairs: drop trailing commas, single quotes used as JSON quotes
//!    to double, newlines to spaces
//! 4. find an embedded `[ { ... } ]` span in the original text, drop its
//!    trailing commas and parse just that
//!
//! Stages 1 to 3 are cumulative: each sees the previous stage's text. Stage 4
//! scans the untouched input because stage 2 may already have cut away the
//! surrounding brackets.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Number of characters of the failing text kept for logs.
const PREVIEW_CHARS: usize = 300;

/// The model output could not be turned into JSON by any stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Could not parse AI response. Please try again.")]
    Unrecoverable { preview: String },
}

impl FormatError {
    pub(crate) fn unrecoverable(text: &str) -> Self {
        FormatError::Unrecoverable {
            preview: text.chars().take(PREVIEW_CHARS).collect(),
        }
    }

    /// The beginning of the text that failed, for diagnostics.
    pub fn preview(&self) -> &str {
        match self {
            FormatError::Unrecoverable { preview } => preview,
        }
    }
}

/// Which text a stage is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageInput {
    /// Output of the last stage that applied (or the raw input).
    Previous,
    /// The untouched input.
    Raw,
}

/// One rung of the ladder. `apply` returns `None` when it does not apply.
struct Stage {
    name: &'static str,
    input: StageInput,
    apply: fn(&str) -> Option<String>,
}

const LADDER: &[Stage] = &[
    Stage {
        name: "strip_fences",
        input: StageInput::Previous,
        apply: strip_fences,
    },
    Stage {
        name: "slice_outer_value",
        input: StageInput::Previous,
        apply: slice_outer_value,
    },
    Stage {
        name: "textual_repairs",
        input: StageInput::Previous,
        apply: textual_repairs,
    },
    Stage {
        name: "embedded_array",
        input: StageInput::Raw,
        apply: embedded_array,
    },
];

/// Parse `raw` as JSON, repairing it if needed.
pub fn parse_lenient(raw: &str) -> Result<Value, FormatError> {
    if let Some(value) = try_parse(raw) {
        return Ok(value);
    }

    let mut current = raw.to_string();
    for stage in LADDER {
        let source = match stage.input {
            StageInput::Previous => current.as_str(),
            StageInput::Raw => raw,
        };
        let Some(next) = (stage.apply)(source) else {
            continue;
        };
        if let Some(value) = try_parse(&next) {
            debug!("Sanitizer: recovered JSON at stage '{}'", stage.name);
            return Ok(value);
        }
        if stage.input == StageInput::Previous {
            current = next;
        }
    }

    debug!(
        "Sanitizer: no stage produced valid JSON ({} chars)",
        raw.len()
    );
    Err(FormatError::unrecoverable(raw))
}

/// Parse leniently and re-serialise as compact JSON.
///
/// Key order is preserved, so `sanitize_json(&sanitize_json(x)?)` equals
/// `sanitize_json(x)` for every input the first call accepts.
pub fn sanitize_json(raw: &str) -> Result<String, FormatError> {
    let value = parse_lenient(raw)?;
    serde_json::to_string(&value).map_err(|_| FormatError::unrecoverable(raw))
}

fn try_parse(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

// ── Stage 1: Strip code fences ───────────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*```(?:json)?(?:[ \t]*\r?\n|[ \t]+|$)").unwrap());
static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

/// Remove a leading ```` ```json ```` or ```` ``` ```` marker and a trailing ```` ``` ````.
pub fn strip_fences(input: &str) -> Option<String> {
    let leading = RE_LEADING_FENCE.find(input)?;
    let body = &input[leading.end()..];
    let body = match RE_TRAILING_FENCE.find(body) {
        Some(m) => &body[..m.start()],
        None => body,
    };
    Some(body.trim().to_string())
}

// ── Stage 2: Slice the outer value ───────────────────────────────────────────

static RE_ARRAY_OF_OBJECTS_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\s*[{\]]").unwrap());

fn slice_outer_value(input: &str) -> Option<String> {
    let first_object = input.find('{');
    let array_first = input
        .find('[')
        .filter(|&i| first_object.map_or(true, |o| i < o))
        .filter(|&i| RE_ARRAY_OF_OBJECTS_START.is_match(&input[i..]));

    let (first, last) = match array_first {
        Some(first) => (first, input.rfind(']')?),
        None => (first_object?, input.rfind('}')?),
    };
    if last <= first {
        return None;
    }
    let sliced = &input[first..=last];
    (sliced.len() != input.len()).then(|| sliced.to_string())
}

// ── Stage 3: Textual repairs ─────────────────────────────────────────────────

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

// A single quote only counts as a JSON quote next to structural punctuation,
// so apostrophes inside words stay put.
static RE_OPENING_SINGLE_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{\[,:]\s*)'").unwrap());
static RE_CLOSING_SINGLE_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(\s*[}\]:,])").unwrap());

fn drop_trailing_commas(input: &str) -> String {
    RE_TRAILING_COMMA.replace_all(input, "$1").into_owned()
}

fn textual_repairs(input: &str) -> Option<String> {
    let repaired = drop_trailing_commas(input);
    let repaired = RE_CLOSING_SINGLE_QUOTE.replace_all(&repaired, "\"$1");
    let repaired = RE_OPENING_SINGLE_QUOTE.replace_all(&repaired, "$1\"");
    let repaired = repaired.replace("\r\n", " ").replace('\n', " ");
    (repaired != input).then_some(repaired)
}

// ── Stage 4: Embedded array of objects ───────────────────────────────────────

static RE_EMBEDDED_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\s*\{.+\}\s*,?\s*\]").unwrap());

fn embedded_array(input: &str) -> Option<String> {
    RE_EMBEDDED_ARRAY
        .find(input)
        .map(|m| drop_trailing_commas(m.as_str()))
}

// ── Tests ────────────────────────────────────────────────────────────────────
