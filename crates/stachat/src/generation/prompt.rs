use stachat_core::ConfigurationError;

/// Built-in geospatial assistant prompt.
pub const DEFAULT_TEMPLATE: &str = "You are an expert in geospatial data. Answer the question based only on the following context:
{context}

Instructions:
- Format the response in a human-friendly way.
- Use bullet points for clarity.
- Provide additional context or explanations where necessary.
- Simplify technical terms and metadata.
- Include links for further exploration if available.

Question: {question}
";

const CONTEXT: &str = "{context}";
const QUESTION: &str = "{question}";

/// Prompt with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigurationError> {
        let template = template.into();
        if !template.contains(CONTEXT) || !template.contains(QUESTION) {
            return Err(ConfigurationError::Invalid {
                field: "generation.prompt_template".to_string(),
                message: "must contain {context} and {question}".to_string(),
            });
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute both placeholders in one left-to-right pass. Inserted text
    /// is never rescanned, so braces inside context or question survive.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out =
            String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix(CONTEXT) {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUESTION) {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
