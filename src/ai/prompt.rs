//! Instruction prompts sent along with the user's input, templated
//! with Handlebars. Strict mode is on so a missing variable is an
//! error rather than a silently blank instruction.

use std::fmt;

use handlebars::{Handlebars, RenderError};
use serde_json::json;

#[derive(Debug)]
pub enum Prompt {
    TextQuestion,
    ImageAnalysis,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const TEXT_QUESTION_PROMPT: &str =
    "Please answer the following question in {{language}}: {{question}}";

const IMAGE_ANALYSIS_PROMPT: &str = "Analyze this agricultural image. Identify any visible plant diseases, pests, or nutrient deficiencies. Provide practical farming advice in simple {{language}}.";

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Prompts are plain text, user input must reach the model as typed
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .register_template_string(&Prompt::TextQuestion.to_string(), TEXT_QUESTION_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::ImageAnalysis.to_string(), IMAGE_ANALYSIS_PROMPT)
        .expect("Failed to register template");
    registry
}

pub fn text_question(
    templates: &Handlebars,
    language: &str,
    question: &str,
) -> Result<String, RenderError> {
    templates.render(
        &Prompt::TextQuestion.to_string(),
        &json!({"language": language, "question": question}),
    )
}

pub fn image_analysis(templates: &Handlebars, language: &str) -> Result<String, RenderError> {
    templates.render(
        &Prompt::ImageAnalysis.to_string(),
        &json!({"language": language}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_question() {
        let templates = templates();
        let prompt = text_question(&templates, "Malayalam", "What pest is on my banana leaf?").unwrap();
        assert_eq!(
            prompt,
            "Please answer the following question in Malayalam: What pest is on my banana leaf?"
        );
    }

    #[test]
    fn test_text_question_is_not_escaped() {
        let templates = templates();
        let prompt = text_question(&templates, "English", "Is <urea> & 'potash' ok?").unwrap();
        assert!(prompt.ends_with("Is <urea> & 'potash' ok?"));
    }

    #[test]
    fn test_image_analysis() {
        let templates = templates();
        let prompt = image_analysis(&templates, "Tamil").unwrap();
        assert!(prompt.starts_with("Analyze this agricultural image."));
        assert!(prompt.ends_with("Provide practical farming advice in simple Tamil."));
    }

    #[test]
    fn test_prompt_names() {
        assert_eq!(Prompt::TextQuestion.to_string(), "TextQuestion");
        assert_eq!(String::from(Prompt::ImageAnalysis), "ImageAnalysis");
    }
}
