//! Prompts for every chat call the pipeline makes.
//!
//! All prompt text lives here so it can be changed without touching retry,
//! parsing or error-handling code, and so tests can inspect it directly.

/// Sentinel the vision CSV prompt asks the model to emit when it finds no table.
pub const NO_TABLE_SENTINEL: &str = "NO_TABLE_DATA_FOUND";

/// Instructions for turning OCR text into styled HTML.
///
/// The OCR text is appended by [`html_prompt`].
pub const HTML_RESHAPE_PROMPT: &str = r#"Convert the text below into HTML with inline CSS. Respond with HTML only.

LAYOUT:
- Wrap everything in <div class="page">
- Document title: <h1 style="text-align:center;font-weight:bold;font-size:20px;">
- Section headings: <h2 style="font-weight:bold;font-size:16px;">
- Paragraphs: <p style="margin:8px 0;">
- Emphasis: <strong>
- Numbered questions: <p><strong>N.</strong> question text</p>
- Drop any image markdown

FORMULAS:
- Rewrite LaTeX such as $formula$ as readable HTML
- Powers use <sup>: V^2 becomes V<sup>2</sup>
- Indices use <sub>: Q_1 becomes Q<sub>1</sub>
- Simple fractions: 1/2 becomes ½ or (1/2)
- $1/2 CV^2$ becomes ½ CV<sup>2</sup>
- $Q_1 = 3\mu c$ becomes Q<sub>1</sub> = 3μc

TEXT:
"#;

/// Build the full HTML reshape prompt for `ocr_text`.
pub fn html_prompt(ocr_text: &str) -> String {
    format!("{HTML_RESHAPE_PROMPT}{ocr_text}")
}

/// System prompt for inferring a table from noisy register/inventory OCR text.
pub const TABLE_SYSTEM_PROMPT: &str = r#"You turn messy OCR text into a clean, structured table.

The source is usually a handwritten or printed register, ledger or inventory list.

CLEANING RULES:
1. Split serial numbers from codes ("18. P318805" gives sr_no "18" and code "P318805")
2. Keep only the digits of quantities ("08", "04")
3. Normalise type values to the ones used in the document ("T", "TBNT", "BNT", "Tank", "Header")
4. Put dimensions ("8440 x 355") in their own column when present
5. Drop noise: stray symbols, illegible fragments, scanning marks
6. Keep every meaningful column you find

COLUMNS:
- Look for serial number, code, quantity, type, dimensions, remarks, date, time
- The number of columns varies by document; extract all of them
- Use short snake_case headers such as sr_no, code, qty, type, dimensions, remarks

OUTPUT, valid JSON only:
{
  "table": [
    {"sr_no": "1", "code": "P123456", "qty": "04", "type": "T"},
    {"sr_no": "2", "code": "R789012", "qty": "02", "type": "BNT", "dimensions": "7310 x 355"}
  ]
}

Return the JSON object and nothing else: no markdown, no commentary."#;

/// User message carrying the OCR text for the table reshape.
pub fn table_user_prompt(ocr_text: &str) -> String {
    format!("Extract clean table data from this OCR text:\n\n{ocr_text}")
}

/// Vision prompt for reading table data straight from an image or PDF as CSV.
pub fn csv_vision_prompt(is_pdf: bool) -> String {
    let subject = if is_pdf { "document" } else { "image" };
    format!(
        "You extract tabular data. Read this {subject} and extract every table you can find.\n\
\n\
RULES:\n\
1. Find all tables, spreadsheets and other tabular data\n\
2. Keep every row and column\n\
3. Answer in plain CSV: commas between columns, one row per line\n\
4. Quote any cell that contains a comma with double quotes\n\
5. Include the header row when one is visible\n\
6. No explanations, no markdown, no code blocks\n\
\n\
If there is no table, answer exactly: {NO_TABLE_SENTINEL}"
    )
}

// ── Writing assistant ────────────────────────────────────────────────────

pub const ESSAY_PROMPT: &str = "You are an essay-writing assistant. Write a well-structured, \
insightful essay of exactly {paragraphs} paragraphs on the user's topic. Each paragraph must be \
coherent and advance the overall argument. Match the requested tone and style, follow any length \
or audience guidance the user gives, and support claims with concrete examples.";

pub const BLOG_POST_PROMPT: &str = "You write SEO-friendly blog posts. Produce a catchy title \
(50-60 characters), a meta description (120-160 characters), a 100-150 word introduction, 3-5 \
body sections with ## subheadings, a conclusion with a call to action, and an FAQ section with \
3-5 questions. Use markdown, short paragraphs and lists. Default to 600-1000 words and an \
informative, approachable tone unless the user says otherwise.";

pub const COLD_EMAIL_PROMPT: &str = "You write short, personalised cold emails for job seekers. \
Include a specific subject line, a greeting, a one-line introduction, the sender's most relevant \
skills, a clear call to action and a polite sign-off with contact placeholders such as \
[Your Name]. Stay under 150 words and return plain text ready to send.";

pub const SUMMARY_PROMPT: &str = "You summarise text supplied by the user. Capture the main \
ideas and key facts without adding anything that is not in the source. Default to 100-150 words \
for long input or 2-3 sentences for short input, in paragraph form unless the user asks for \
another format. If the input is too short to summarise, say so.";

pub const JSON_TO_XML_PROMPT: &str = "You convert JSON into well-formed XML. Object keys become \
element names, arrays become repeated elements named after their parent key, nested structures \
become nested elements, and special characters are escaped. Start with an XML declaration and \
use <root> as the root element unless told otherwise. If the JSON is invalid, explain the \
problem instead of guessing.";

pub const PARAGRAPH_PROMPT: &str = "You write single paragraphs. Focus on one main idea, vary \
sentence structure, keep a consistent tone, and stay between 50 and 150 words unless the user \
asks otherwise.";

pub const REWRITE_PROMPT: &str = "You rewrite text while preserving its meaning. Improve flow \
and word choice, remove filler, keep names, figures and technical terms unchanged, and keep the \
original paragraph structure. Return only the rewritten text.";

pub const GRAMMAR_PROMPT: &str = "You correct grammar, spelling and punctuation while keeping \
the author's voice and regional spelling. Do not add content. Return only the corrected text, \
with the original formatting.";

pub const TONE_PROMPT: &str = "You adjust the tone of text to professional: formal, clear, no \
contractions. Keep every fact and the original length within about 10%. Return only the \
adjusted text.";

pub const PRODUCT_COPY_PROMPT: &str = "You write conversion-focused product descriptions. Open \
with a 5-10 word benefit headline, address the customer's need, turn each feature into a \
benefit in a bulleted list, and close with a clear call to action. Keep it between 100 and 250 \
words and bold the key phrases.";

pub const SOCIAL_POST_PROMPT: &str = "You write social media posts for Twitter/X: under 280 \
characters, a strong first-line hook, one clear insight, an engagement question or call to \
action, and 2-3 relevant hashtags. Return the post only.";

pub const STORY_PROMPT: &str = "You write short fiction. Open with a hook, set up character and \
stakes quickly, build tension to a climax and resolve it. Show rather than tell, use specific \
sensory detail and natural dialogue, and return only the story.";

pub const GENERAL_WRITING_PROMPT: &str = "You are a helpful writing assistant. Help the user \
with their writing task by producing clear, well-structured and engaging content.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_prompt_appends_text_last() {
        let p = html_prompt("Q_1 = 3");
        assert!(p.starts_with("Convert the text below into HTML"));
        assert!(p.ends_with("TEXT:\nQ_1 = 3"));
    }

    #[test]
    fn table_prompt_requests_table_envelope() {
        assert!(TABLE_SYSTEM_PROMPT.contains("\"table\""));
        assert!(table_user_prompt("abc").ends_with("\n\nabc"));
    }

    #[test]
    fn csv_prompt_names_subject_and_sentinel() {
        assert!(csv_vision_prompt(true).contains("this document"));
        assert!(csv_vision_prompt(false).contains("this image"));
        assert!(csv_vision_prompt(false).contains(NO_TABLE_SENTINEL));
    }

    #[test]
    fn essay_prompt_has_paragraph_placeholder() {
        assert!(ESSAY_PROMPT.contains("{paragraphs}"));
    }
}
