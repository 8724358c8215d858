/*!
 * Per-family prompt construction and response parsing.
 *
 * Every backend family speaks its own request/response dialect. The family
 * enum looks its strategy up in a static table; nothing here dispatches on
 * backend-id prefixes.
 */

use serde_json::{Value, json};

use crate::errors::ProviderError;
use crate::language_utils::display_name;

/// Everything a strategy needs to build one request
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
    /// Text to translate
    pub text: &'a str,
    /// Source language code
    pub source_language: &'a str,
    /// Target language code
    pub target_language: &'a str,
    /// Subject-matter domain (e.g. "cardiology")
    pub domain: &'a str,
    /// Terms the translation must render consistently
    pub term_hints: &'a [String],
    /// Generation budget
    pub max_output_tokens: u32,
}

/// Request/response dialect of one backend family
pub trait FamilyStrategy: Send + Sync {
    /// Build the request body for this family
    fn build_request(&self, input: &PromptInput<'_>) -> Value;

    /// Extract the translated text from a response body
    fn parse_response(&self, response: &Value) -> Result<String, ProviderError>;
}

const TEMPERATURE: f64 = 0.1;

/// Shared translator instructions embedded by the instruction-following families
pub fn translation_instructions(input: &PromptInput<'_>) -> String {
    let mut instructions = format!(
        "You are a professional medical translator. Translate the following text from {} to {}. \
         The subject-matter context is {}. Preserve medical terminology precisely, keep numbers, \
         units and dosages unchanged, and return only the translation.",
        display_name(input.source_language),
        display_name(input.target_language),
        input.domain
    );

    if !input.term_hints.is_empty() {
        instructions.push_str(" Pay particular attention to these terms: ");
        instructions.push_str(&input.term_hints.join(", "));
        instructions.push('.');
    }

    instructions
}

fn text_at<'v>(response: &'v Value, pointer: &str) -> Result<&'v str, ProviderError> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::ParseError(format!("missing string at {}", pointer)))
}

fn non_empty(text: &str) -> Result<String, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::ParseError("empty translation".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Messages-style API
#[derive(Debug)]
pub struct ClaudeStrategy;

impl FamilyStrategy for ClaudeStrategy {
    fn build_request(&self, input: &PromptInput<'_>) -> Value {
        json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": input.max_output_tokens,
            "temperature": TEMPERATURE,
            "system": translation_instructions(input),
            "messages": [
                { "role": "user", "content": input.text }
            ]
        })
    }

    fn parse_response(&self, response: &Value) -> Result<String, ProviderError> {
        non_empty(text_at(response, "/content/0/text")?)
    }
}

/// Single input-text API
#[derive(Debug)]
pub struct TitanStrategy;

impl FamilyStrategy for TitanStrategy {
    fn build_request(&self, input: &PromptInput<'_>) -> Value {
        json!({
            "inputText": format!("{}\n\nText:\n{}\n\nTranslation:", translation_instructions(input), input.text),
            "textGenerationConfig": {
                "maxTokenCount": input.max_output_tokens,
                "temperature": TEMPERATURE,
                "topP": 0.9
            }
        })
    }

    fn parse_response(&self, response: &Value) -> Result<String, ProviderError> {
        non_empty(text_at(response, "/results/0/outputText")?)
    }
}

/// Instruction-tagged completion API
#[derive(Debug)]
pub struct LlamaStrategy;

impl FamilyStrategy for LlamaStrategy {
    fn build_request(&self, input: &PromptInput<'_>) -> Value {
        json!({
            "prompt": format!(
                "<s>[INST] <<SYS>>\n{}\n<</SYS>>\n\n{} [/INST]",
                translation_instructions(input),
                input.text
            ),
            "max_gen_len": input.max_output_tokens,
            "temperature": TEMPERATURE
        })
    }

    fn parse_response(&self, response: &Value) -> Result<String, ProviderError> {
        non_empty(text_at(response, "/generation")?)
    }
}

/// Instruction-tagged completion API with an outputs array
#[derive(Debug)]
pub struct MistralStrategy;

impl FamilyStrategy for MistralStrategy {
    fn build_request(&self, input: &PromptInput<'_>) -> Value {
        json!({
            "prompt": format!("<s>[INST] {}\n\n{} [/INST]", translation_instructions(input), input.text),
            "max_tokens": input.max_output_tokens,
            "temperature": TEMPERATURE
        })
    }

    fn parse_response(&self, response: &Value) -> Result<String, ProviderError> {
        non_empty(text_at(response, "/outputs/0/text")?)
    }
}

/// Offline dictionary lookup: no prompt, just the text and the pair
#[derive(Debug)]
pub struct GlossaryStrategy;

impl FamilyStrategy for GlossaryStrategy {
    fn build_request(&self, input: &PromptInput<'_>) -> Value {
        json!({
            "text": input.text,
            "source_language": input.source_language,
            "target_language": input.target_language,
            "context": input.domain
        })
    }

    fn parse_response(&self, response: &Value) -> Result<String, ProviderError> {
        non_empty(text_at(response, "/translated_text")?)
    }
}
