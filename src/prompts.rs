//! System prompts for vision-model transcription.
//!
//! The engine is bound to one language; the prompt names it explicitly so the
//! model does not translate or romanise what it reads.

/// Prompt template; `{language}` is replaced with the language name.
const TRANSCRIPTION_PROMPT_TEMPLATE: &str = r#"You are an OCR engine. Transcribe the text in the page image exactly as printed.

Follow these rules precisely:

1. LANGUAGE
   - The document is written in {language}. Output the original script.
   - Do NOT translate, romanise or summarise anything

2. FIDELITY
   - Preserve every character, digit, currency sign and unit
   - Keep prices and product names on the same line as they appear
   - Do not correct spelling or normalise full-width characters

3. LAYOUT
   - Follow the reading order a human would use
   - Write one table row per line, separating cells with a single space
   - Keep headings and footnotes as plain lines

4. OUTPUT FORMAT
   - Output ONLY the transcribed text
   - No code fences, no commentary, no page markers
   - If the page has no text, output nothing"#;

/// Human-readable name for a Tesseract-style language code.
pub fn language_name(code: &str) -> &str {
    match code {
        "jpn" | "ja" => "Japanese",
        "jpn_vert" => "Japanese (vertical)",
        "eng" | "en" => "English",
        "chi_sim" => "Simplified Chinese",
        "chi_tra" => "Traditional Chinese",
        "kor" | "ko" => "Korean",
        other => other,
    }
}

/// Build the system prompt for `language_code`.
pub fn transcription_prompt(language_code: &str) -> String {
    TRANSCRIPTION_PROMPT_TEMPLATE.replace("{language}", language_name(language_code))
}
