//! Well-known OpenAI-compatible providers: endpoint, default model and, where
//! the provider offers one, a vision model for image description.

use crate::openai::ImageEncoding;

pub struct KnownProvider {
    /// Short identifier used in config (e.g. "deepseek").
    pub id: &'static str,
    pub name: &'static str,
    /// Base URL without trailing slash.
    pub base_url: &'static str,
    /// Appended to `base_url`; some providers version the path differently.
    pub chat_path: &'static str,
    pub default_model: &'static str,
    pub vision_model: Option<&'static str>,
    pub image_encoding: ImageEncoding,
}

impl KnownProvider {
    /// Full chat completions endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }
}

pub const KNOWN_PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        id: "deepseek",
        name: "DeepSeek",
        base_url: "https://api.deepseek.com",
        chat_path: "/v1/chat/completions",
        default_model: "deepseek-chat",
        vision_model: None,
        image_encoding: ImageEncoding::DataUrl,
    },
    KnownProvider {
        id: "glm",
        name: "GLM (Zhipu AI)",
        base_url: "https://open.bigmodel.cn/api/paas",
        chat_path: "/v4/chat/completions",
        default_model: "glm-4-flash",
        vision_model: Some("glm-4v-flash"),
        image_encoding: ImageEncoding::RawBase64,
    },
    KnownProvider {
        id: "qwen",
        name: "Qwen (Alibaba)",
        base_url: "https://dashscope.aliyuncs.com/compatible-mode",
        chat_path: "/v1/chat/completions",
        default_model: "qwen-turbo",
        vision_model: Some("qwen-vl-plus"),
        image_encoding: ImageEncoding::DataUrl,
    },
    KnownProvider {
        id: "moonshot",
        name: "Moonshot AI (Kimi)",
        base_url: "https://api.moonshot.cn",
        chat_path: "/v1/chat/completions",
        default_model: "moonshot-v1-8k",
        vision_model: None,
        image_encoding: ImageEncoding::DataUrl,
    },
    KnownProvider {
        id: "doubao",
        name: "Doubao (ByteDance)",
        base_url: "https://ark.cn-beijing.volces.com/api",
        chat_path: "/v3/chat/completions",
        default_model: "doubao-pro-4k",
        vision_model: None,
        image_encoding: ImageEncoding::DataUrl,
    },
    KnownProvider {
        id: "groq",
        name: "Groq",
        base_url: "https://api.groq.com/openai",
        chat_path: "/v1/chat/completions",
        default_model: "llama-3.3-70b-versatile",
        vision_model: None,
        image_encoding: ImageEncoding::DataUrl,
    },
    KnownProvider {
        id: "openrouter",
        name: "OpenRouter",
        base_url: "https://openrouter.ai/api",
        chat_path: "/v1/chat/completions",
        default_model: "openai/gpt-4o",
        vision_model: Some("openai/gpt-4o"),
        image_encoding: ImageEncoding::DataUrl,
    },
    // local / self-hosted
    KnownProvider {
        id: "lmstudio",
        name: "LM Studio (local)",
        base_url: "http://localhost:1234",
        chat_path: "/v1/chat/completions",
        default_model: "local-model",
        vision_model: None,
        image_encoding: ImageEncoding::DataUrl,
    },
    KnownProvider {
        id: "llamacpp",
        name: "llama.cpp server (local)",
        base_url: "http://localhost:8080",
        chat_path: "/v1/chat/completions",
        default_model: "local-model",
        vision_model: None,
        image_encoding: ImageEncoding::DataUrl,
    },
];

/// Look up a known provider by its ID.
pub fn lookup(id: &str) -> Option<&'static KnownProvider> {
    KNOWN_PROVIDERS.iter().find(|p| p.id == id)
}
