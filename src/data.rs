use std::{
    default::Default,
    ops::Deref,
    sync::Arc,
};

use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use serenity::prelude::TypeMapKey;
use uuid::Uuid;

use crate::moderation::{ModerationService, Trigger, TriggerRule};

/// Guild configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildConfig {
    // The ID of the guild
    pub guild_id: u64,
    // Role applied by mutes
    pub mute_role_id: Option<u64>,
    // Channel for moderation reports
    pub moderation_log_channel_id: Option<u64>,
    // Seconds before a warning lapses on its own (None = never)
    pub default_warning_expiry: Option<u64>,
    // Seconds before a notice is auto-pardoned (None = never)
    pub default_notice_expiry: Option<u64>,
    // Edit-distance tolerance for treating censored messages as duplicates
    pub duplicate_tolerance: u32,
    // Escalation triggers configured for this guild
    pub triggers: Vec<Trigger>,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            guild_id: 0,
            mute_role_id: None,
            moderation_log_channel_id: None,
            default_warning_expiry: None,
            default_notice_expiry: None,
            duplicate_tolerance: 3,
            triggers: Vec::new(),
        }
    }
}

/// Shared map of guild_id -> guild configuration
#[derive(Clone, Default)]
pub struct GuildConfigs(Arc<DashMap<u64, GuildConfig>>);

impl GuildConfigs {
    /// Get a guild's configuration
    #[must_use]
    pub fn get(&self, guild_id: u64) -> Option<GuildConfig> {
        self.0.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Insert or replace a guild's configuration
    pub fn insert(&self, config: GuildConfig) {
        self.0.insert(config.guild_id, config);
    }

    /// Update a guild's configuration in place, creating it if missing
    pub fn update(&self, guild_id: u64, f: impl FnOnce(&mut GuildConfig)) {
        let mut entry = self.0.entry(guild_id).or_insert_with(|| GuildConfig {
            guild_id,
            ..GuildConfig::default()
        });
        f(entry.value_mut());
    }

    /// Add an escalation trigger to a guild
    pub fn add_trigger(&self, trigger: Trigger) {
        self.update(trigger.guild_id, |config| config.triggers.push(trigger));
    }

    /// Remove an escalation trigger from a guild
    pub fn remove_trigger(&self, guild_id: u64, trigger_id: Uuid) -> bool {
        let mut removed = false;
        self.update(guild_id, |config| {
            let before = config.triggers.len();
            config.triggers.retain(|t| t.id != trigger_id);
            removed = config.triggers.len() < before;
        });
        removed
    }

    /// A guild's active censor triggers, for the message scan
    #[must_use]
    pub fn active_censors(&self, guild_id: u64) -> Vec<Trigger> {
        self.get(guild_id)
            .map(|config| {
                config
                    .triggers
                    .into_iter()
                    .filter(|t| t.is_active && matches!(t.rule, TriggerRule::Censor { .. }))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn all(&self) -> Vec<GuildConfig> {
        self.0.iter().map(|entry| entry.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

// Implement TypeMapKey for Data to allow storing it in Serenity's data map
impl TypeMapKey for Data {
    type Value = Data;
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("guilds", &self.configs.len())
            .field("cache", &self.cache)
            .field("moderation", &self.moderation.is_some())
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Create a new Data instance
    #[must_use]
    pub fn new() -> Self {
        Self(DataInner::new().into())
    }

    /// Get the guild configuration for a specific guild
    #[must_use]
    pub fn get_guild_config(&self, guild_id: serenity::GuildId) -> Option<GuildConfig> {
        self.configs.get(guild_id.get())
    }

    /// Get a handle to the per-guild configuration map
    #[must_use]
    pub fn configs(&self) -> GuildConfigs {
        self.configs.clone()
    }

    /// Get the moderation service, once wired at startup
    #[must_use]
    pub fn moderation(&self) -> Option<&ModerationService> {
        self.moderation.as_ref()
    }

    /// Wire the moderation service; called once at startup before the data
    /// handle is shared
    pub fn set_moderation(&mut self, service: ModerationService) {
        Arc::make_mut(&mut self.0).moderation = Some(service);
    }

    /// Load data from YAML file
    pub async fn load() -> Self {
        Self(Arc::new(DataInner::load().await))
    }

    /// Save data to YAML file
    /// # Errors
    /// This function will return an error if:
    /// - The data directory cannot be created
    /// - The guild configurations cannot be serialized to YAML
    /// - The YAML data cannot be written to the config file
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.0.save().await
    }
}

/// Main centralized data structure for the bot
#[derive(Clone)]
pub struct DataInner {
    // Map of guild_id -> guild configuration
    pub configs: GuildConfigs,
    // Cache from the bot's context
    pub cache: Arc<serenity::Cache>,
    // Moderation service handle, wired at startup
    moderation: Option<ModerationService>,
}

impl Default for DataInner {
    fn default() -> Self {
        Self::new()
    }
}

impl DataInner {
    // Create a new Data instance
    #[must_use]
    pub fn new() -> Self {
        Self {
            configs: GuildConfigs::default(),
            cache: Arc::new(serenity::Cache::default()),
            moderation: None,
        }
    }

    /// Load data from YAML file
    ///
    /// This method loads guild configurations from a YAML file.
    /// If the file doesn't exist, it returns a new empty Data instance.
    pub async fn load() -> Self {
        const CONFIG_FILE: &str = "data/guild_configs.yaml";

        let data = Self::new();

        if let Ok(file_content) = tokio::fs::read_to_string(CONFIG_FILE).await {
            if let Ok(configs) = serde_yaml::from_str::<Vec<GuildConfig>>(&file_content) {
                for config in configs {
                    data.configs.insert(config);
                }
            }
        }

        data
    }

    /// Save data to YAML file
    ///
    /// This method saves all guild configurations to a YAML file.
    /// It creates the data directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The data directory cannot be created
    /// - The guild configurations cannot be serialized to YAML
    /// - The YAML data cannot be written to the config file
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        const DATA_DIR: &str = "data";
        const CONFIG_FILE: &str = "data/guild_configs.yaml";

        if !std::path::Path::new(DATA_DIR).exists() {
            tokio::fs::create_dir_all(DATA_DIR).await?;
        }

        let configs = self.configs.all();
        let yaml = serde_yaml::to_string(&configs)?;
        tokio::fs::write(CONFIG_FILE, yaml).await?;

        Ok(())
    }
}

/// Tests for the data module
#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::{ReprimandTemplate, TriggerMode, TriggerSource};

    #[test]
    fn test_data_new() {
        let data = Data::new();
        assert_eq!(data.configs.len(), 0);
        assert!(data.cache.guilds().is_empty());
        assert!(data.moderation().is_none());
    }

    #[test]
    fn test_guild_config_default() {
        let config = GuildConfig::default();
        assert_eq!(config.guild_id, 0);
        assert!(config.mute_role_id.is_none());
        assert!(config.default_warning_expiry.is_none());
        assert_eq!(config.duplicate_tolerance, 3);
        assert!(config.triggers.is_empty());
    }

    #[test]
    fn test_guild_config_serialization() {
        let mut config = GuildConfig {
            guild_id: 12345,
            mute_role_id: Some(67890),
            default_warning_expiry: Some(604_800),
            ..Default::default()
        };
        config.triggers.push(Trigger::count(
            12345,
            TriggerSource::Warning,
            3,
            TriggerMode::Exact,
            ReprimandTemplate::Mute { length: Some(3600) },
        ));

        let serialized = serde_yaml::to_string(&config).expect("Failed to serialize");
        assert!(serialized.contains("guild_id: 12345"));
        assert!(serialized.contains("mute_role_id: 67890"));
        assert!(serialized.contains("Exact"));

        let deserialized: GuildConfig =
            serde_yaml::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized.guild_id, 12345);
        assert_eq!(deserialized.mute_role_id, Some(67890));
        assert_eq!(deserialized.triggers.len(), 1);
        assert_eq!(deserialized.triggers[0].amount, 3);
    }

    #[test]
    fn test_trigger_crud() {
        let configs = GuildConfigs::default();
        let trigger = Trigger::count(
            12345,
            TriggerSource::Warning,
            3,
            TriggerMode::Exact,
            ReprimandTemplate::Kick,
        );
        let trigger_id = trigger.id;

        configs.add_trigger(trigger);
        assert_eq!(configs.get(12345).unwrap().triggers.len(), 1);

        assert!(configs.remove_trigger(12345, trigger_id));
        assert!(!configs.remove_trigger(12345, trigger_id));
        assert!(configs.get(12345).unwrap().triggers.is_empty());
    }

    #[test]
    fn test_active_censors_filtering() {
        let configs = GuildConfigs::default();
        configs.add_trigger(Trigger::censor(
            12345,
            "spam",
            false,
            1,
            TriggerMode::Retroactive,
            ReprimandTemplate::Note,
        ));
        let mut disabled = Trigger::censor(
            12345,
            "other",
            false,
            1,
            TriggerMode::Retroactive,
            ReprimandTemplate::Note,
        );
        disabled.is_active = false;
        configs.add_trigger(disabled);
        configs.add_trigger(Trigger::count(
            12345,
            TriggerSource::Warning,
            3,
            TriggerMode::Exact,
            ReprimandTemplate::Kick,
        ));

        let censors = configs.active_censors(12345);
        assert_eq!(censors.len(), 1);
        assert_eq!(censors[0].pattern(), Some("spam"));
        assert!(configs.active_censors(99999).is_empty());
    }
}
