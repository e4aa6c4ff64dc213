//! System prompt templates (handlebars).
//!
//! Templates see three variables: `self_name` (the bot's display name),
//! `contact` (group name or contact remark) and `is_group`.

use handlebars::Handlebars;
use serde::Serialize;
use tracing::info;

const TEMPLATE_NAME: &str = "system";

/// Used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = "你现在位于一个{{#if is_group}}群聊{{else}}和{{contact}}的私聊{{/if}}中聊天。\
请你发表回复，尽量简洁，符合语境和聊天人类习惯，不要添加标点符号。\
如果相关主题回复过，或你决定不说话，请说：本轮不发言。\
聊天记录包含了你和{{#if is_group}}群友{{else}}对方{{/if}}最近的发言。你叫 {{self_name}}：\n";

/// Prompt for image description requests.
pub const DEFAULT_IMAGE_PROMPT: &str =
    "尽可能少的字数描述图片主体是什么, 里面物品有什么. 给人的感觉如何. 不要描述物品放置的目的.";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("failed to read prompt template {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid prompt template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("failed to render prompt: {0}")]
    Render(#[from] Box<handlebars::RenderError>),
}

#[derive(Debug, Serialize)]
pub struct PromptVars<'a> {
    pub self_name: &'a str,
    pub contact: &'a str,
    pub is_group: bool,
}

pub struct PromptTemplate {
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    pub fn from_source(source: &str) -> Result<Self, PromptError> {
        let mut registry = Handlebars::new();
        // prompts are plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(Box::new)?;
        Ok(Self { registry })
    }

    /// Template from `path`, or [`DEFAULT_TEMPLATE`] when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, PromptError> {
        match path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| PromptError::Io {
                    path: path.to_string(),
                    source,
                })?;
                info!(path, "loaded prompt template");
                Self::from_source(&source)
            }
            None => Self::from_source(DEFAULT_TEMPLATE),
        }
    }

    /// Render and trim surrounding whitespace.
    pub fn render(&self, vars: &PromptVars<'_>) -> Result<String, PromptError> {
        let text = self
            .registry
            .render(TEMPLATE_NAME, vars)
            .map_err(Box::new)?;
        Ok(text.trim().to_string())
    }
}
