use crate::config::RiskConfig;
use crate::error::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, TOML, JSON and `PARLAY_` environment variables.
    ///
    /// Missing files are skipped, so an empty checkout runs on the shipped presets.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file or variable cannot be parsed.
    pub fn load() -> Result<RiskConfig> {
        let config: RiskConfig = Self::base().extract()?;
        tracing::debug!(
            iterations = config.monte_carlo.iterations,
            "Loaded risk configuration"
        );
        Ok(config)
    }

    /// Loads configuration with a profile overlay (`config/Config.{profile}.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if a present file or variable cannot be parsed.
    pub fn load_with_profile(profile: &str) -> Result<RiskConfig> {
        let config: RiskConfig = Figment::from(Serialized::defaults(RiskConfig::default()))
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed("PARLAY_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;
        tracing::debug!(profile, "Loaded risk configuration profile");
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(RiskConfig::default()))
            .merge(Toml::file("config/Config.toml"))
            .merge(Env::prefixed("PARLAY_").split("__"))
            .join(Json::file("config/Config.json"))
    }
}
