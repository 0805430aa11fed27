//! Prompt construction for chat, translation, and follow-up suggestions

use crate::types::{ChatMessage, Role};

/// Translation input is cut at this many characters
pub const TRANSLATE_MAX_CHARS: usize = 6000;

/// Builds the single prompt string sent to the LLM
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build a chat prompt from system instructions, recent history,
    /// the retrieval context, and the new question.
    ///
    /// With no context the model answers from general knowledge and is
    /// told to point the user at uploading a document.
    pub fn chat_prompt(
        query: &str,
        context: &str,
        history: &[ChatMessage],
        active_documents: usize,
        history_limit: usize,
    ) -> String {
        let system = if active_documents == 0 || context.trim().is_empty() {
            "You are a helpful AI assistant. No document has been uploaded yet. \
             Answer the user's question as helpfully as possible using your general \
             knowledge, and let them know they can upload a document for \
             document-specific answers."
                .to_string()
        } else {
            let doc_phrase = if active_documents > 1 {
                format!("{} documents", active_documents)
            } else {
                "the provided document".to_string()
            };
            format!(
                "You are a helpful AI assistant. The user has uploaded {}. \
                 Answer the user's question based only on the provided context \
                 excerpts, which may come from multiple documents. When relevant, \
                 mention which document the information comes from. If the answer \
                 is not in the context, say \
                 'I couldn't find that information in the provided document(s).'",
                doc_phrase
            )
        };

        let mut prompt = String::new();
        prompt.push_str(&system);
        prompt.push_str("\n\n");

        let start = history.len().saturating_sub(history_limit);
        for turn in &history[start..] {
            if turn.content.is_empty() {
                continue;
            }
            match turn.role {
                Role::User => {
                    prompt.push_str("User: ");
                    prompt.push_str(&turn.content);
                    prompt.push('\n');
                }
                Role::Assistant => {
                    prompt.push_str("Assistant: ");
                    prompt.push_str(&turn.content);
                    prompt.push('\n');
                }
                Role::System => {}
            }
        }

        prompt.push_str("\nUser: ");
        if context.trim().is_empty() {
            prompt.push_str(query);
        } else {
            prompt.push_str(&format!("Context:\n{}\n\nQuestion: {}", context, query));
        }
        prompt.push_str("\nAssistant:");
        prompt
    }

    /// Build a translation prompt over the full document text.
    ///
    /// Returns the prompt and whether the text was cut at the character
    /// limit (on a whitespace boundary, to avoid mid-word splits).
    pub fn translate_prompt(text: &str, target_language: &str) -> (String, bool) {
        let (text, truncated) = truncate_on_whitespace(text, TRANSLATE_MAX_CHARS);

        let prompt = format!(
            "You are a professional translator. Translate the following document \
             text into {}. Output ONLY the translated text, with no introductions, \
             no explanations, no preamble, and no meta-commentary. Preserve the \
             original structure, headings, and paragraphs exactly.\n\n{}\n",
            target_language, text
        );
        (prompt, truncated)
    }

    /// Heading token streamed before the translation starts
    pub fn translate_header(document_name: &str, target_language: &str) -> String {
        format!(
            "## {} Translation\n*Source: {}*\n\n",
            target_language, document_name
        )
    }

    /// Notice appended when the translation input was cut
    pub fn truncation_notice() -> String {
        format!(
            "\n\n*Document was truncated to {} characters for translation.*",
            TRANSLATE_MAX_CHARS
        )
    }

    /// Build the follow-up-suggestions prompt
    pub fn suggestions_prompt(question: &str, answer: &str) -> String {
        format!(
            "Based on the user's question and the assistant's answer, generate \
             exactly 3 short follow-up questions the user might want to ask next. \
             Return ONLY a valid JSON array of 3 strings, no extra text. \
             Example: [\"What else?\", \"Can you elaborate?\", \"How does X work?\"]\n\n\
             Question: {}\n\nAnswer: {}",
            question, answer
        )
    }

    /// Parse the model's suggestions response into at most 3 strings.
    ///
    /// Tolerates prose around the JSON array; returns empty on anything
    /// unparseable rather than failing the request.
    pub fn parse_suggestions(response: &str) -> Vec<String> {
        let candidate = match (response.find('['), response.rfind(']')) {
            (Some(start), Some(end)) if start < end => &response[start..=end],
            _ => response,
        };
        match serde_json::from_str::<Vec<serde_json::Value>>(candidate) {
            Ok(values) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .take(3)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Cut text at the last whitespace before `limit`; hard cut if none
fn truncate_on_whitespace(text: &str, limit: usize) -> (&str, bool) {
    if text.len() <= limit {
        return (text, false);
    }
    let mut cut = limit;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => (&text[..pos], true),
        _ => (head, true),
    }
}
