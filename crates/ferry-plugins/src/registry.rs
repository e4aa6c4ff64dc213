use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use ferry_agent::prompt::PromptTemplate;
use ferry_agent::AiProvider;
use ferry_core::config::{PluginKind, PluginsConfig};

use crate::cadence::CadenceGate;
use crate::chat::ChatPlugin;
use crate::echo::{EchoPlugin, RepeatDetector};
use crate::error::PluginError;
use crate::plugin::Plugin;
use crate::stop::StopPlugin;

/// One shared instance per plugin kind, plus the per-conversation lists.
///
/// Instances are shared by every conversation that lists them; their state is
/// keyed by conversation internally.
pub struct PluginRegistry {
    instances: HashMap<PluginKind, Arc<dyn Plugin>>,
    default: Vec<PluginKind>,
    overrides: HashMap<String, Vec<PluginKind>>,
}

impl PluginRegistry {
    /// Build every plugin kind the configuration mentions.
    ///
    /// `provider` is required when the chat plugin is listed anywhere.
    pub fn from_config(
        config: &PluginsConfig,
        provider: Option<AiProvider>,
    ) -> Result<Self, PluginError> {
        let mut kinds: Vec<PluginKind> = config.default.clone();
        kinds.extend(config.overrides.values().flatten().copied());

        let mut instances: HashMap<PluginKind, Arc<dyn Plugin>> = HashMap::new();
        for kind in kinds {
            if instances.contains_key(&kind) {
                continue;
            }
            let plugin: Arc<dyn Plugin> = match kind {
                PluginKind::Echo => {
                    let echo = &config.echo;
                    Arc::new(EchoPlugin::new(RepeatDetector::new(
                        echo.repeat_count,
                        echo.context_length,
                        echo.max_length,
                    )))
                }
                PluginKind::Chat => {
                    let chat = &config.chat;
                    let provider = provider.clone().ok_or_else(|| {
                        PluginError::Internal("chat plugin configured without a provider".into())
                    })?;
                    let prompt = PromptTemplate::load(chat.prompt_path.as_deref())
                        .map_err(|e| PluginError::Template(e.to_string()))?;
                    Arc::new(ChatPlugin::new(
                        provider,
                        CadenceGate::new(chat.frequency_secs, chat.clamped_max_ignore()),
                        prompt,
                        chat.context_length,
                    ))
                }
                PluginKind::Stop => Arc::new(StopPlugin),
            };
            info!(plugin = %plugin.name(), "plugin ready");
            instances.insert(kind, plugin);
        }

        Ok(Self {
            instances,
            default: config.default.clone(),
            overrides: config.overrides.clone(),
        })
    }

    /// Registry with explicit instances, for wiring custom plugins.
    pub fn new(
        instances: HashMap<PluginKind, Arc<dyn Plugin>>,
        default: Vec<PluginKind>,
        overrides: HashMap<String, Vec<PluginKind>>,
    ) -> Self {
        Self {
            instances,
            default,
            overrides,
        }
    }

    /// Plugins for a conversation, in configured order. An override keyed by
    /// the conversation id wins over one keyed by its display name; without
    /// either the default list applies.
    pub fn resolve(&self, conversation_id: &str, conversation_name: &str) -> Vec<Arc<dyn Plugin>> {
        let kinds = self
            .overrides
            .get(conversation_id)
            .or_else(|| self.overrides.get(conversation_name))
            .unwrap_or(&self.default);
        kinds
            .iter()
            .filter_map(|k| self.instances.get(k).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(plugins: &[Arc<dyn Plugin>]) -> Vec<&str> {
        plugins.iter().map(|p| p.name()).collect()
    }

    fn config() -> PluginsConfig {
        let mut config = PluginsConfig::default();
        config.default = vec![PluginKind::Echo, PluginKind::Stop];
        config
            .overrides
            .insert("wxid_boss".into(), vec![PluginKind::Stop]);
        config
            .overrides
            .insert("摸鱼群".into(), vec![PluginKind::Stop, PluginKind::Echo]);
        config
    }

    #[test]
    fn default_list_keeps_order() {
        let reg = PluginRegistry::from_config(&config(), None).unwrap();
        assert_eq!(names(&reg.resolve("wxid_x", "小明")), ["echo", "stop"]);
    }

    #[test]
    fn override_by_id_then_by_name() {
        let reg = PluginRegistry::from_config(&config(), None).unwrap();
        assert_eq!(names(&reg.resolve("wxid_boss", "老板")), ["stop"]);
        assert_eq!(names(&reg.resolve("9@chatroom", "摸鱼群")), ["stop", "echo"]);
    }

    #[test]
    fn chat_without_provider_fails() {
        let mut config = config();
        config.default.push(PluginKind::Chat);
        assert!(matches!(
            PluginRegistry::from_config(&config, None),
            Err(PluginError::Internal(_))
        ));
    }

    #[test]
    fn instances_are_shared_between_lists() {
        let reg = PluginRegistry::from_config(&config(), None).unwrap();
        let a = reg.resolve("wxid_x", "x");
        let b = reg.resolve("9@chatroom", "摸鱼群");
        assert!(Arc::ptr_eq(&a[0], &b[1]));
    }
}
