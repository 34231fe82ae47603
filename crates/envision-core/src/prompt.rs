//! Prompt template compilation.

use crate::config::PromptTemplate;

/// Values substituted into `{{...}}` template variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext<'a> {
    pub user_prompt: Option<&'a str>,
    pub functionality: Option<&'a str>,
    pub use_case: Option<&'a str>,
    pub stakeholder: Option<&'a str>,
}

impl PromptContext<'_> {
    fn variables(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("userPrompt", self.user_prompt),
            ("functionality", self.functionality),
            ("usecase", self.use_case),
            ("stakeholder", self.stakeholder),
        ]
    }
}

/// Replaces every known `{{variable}}` that has a value. Unknown or unset variables stay
/// verbatim.
pub fn compile(template: &PromptTemplate, ctx: &PromptContext<'_>) -> String {
    let mut out = template.prompt.clone();
    for (name, value) in ctx.variables() {
        if let Some(value) = value {
            out = out.replace(&format!("{{{{{name}}}}}"), value);
        }
    }
    out
}
