use crate::optimizer_config::SweepConfig;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod optimizer_config;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::{
    BollingerRsiParams, Config, DcaGridParams, ExitParams, HiveSettings, LoggingSettings,
    RegressionTrendParams, RiskManagement, Simulation, Strategies, ZScoreReversionParams,
};

/// Prefix for environment overrides, e.g. `HIVE__SIMULATION__INITIAL_CAPITAL=5000`.
pub const ENV_PREFIX: &str = "HIVE";

/// Loads the application configuration from a TOML file.
///
/// Values from the file can be overridden with `HIVE__<SECTION>__<KEY>` environment
/// variables. The result is validated before it is returned, so callers never see a
/// config with, for example, a negative fee.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(path = %path.as_ref().display(), "Configuration loaded");
    Ok(config)
}

/// Loads a parameter sweep definition (see `optimizer_config`).
pub fn load_sweep_config(path: impl AsRef<Path>) -> Result<SweepConfig, ConfigError> {
    let sweep = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .build()?
        .try_deserialize::<SweepConfig>()?;

    if sweep.parameter_space.is_empty() {
        return Err(ConfigError::ValidationError(
            "parameter_space must contain at least one parameter".to_string(),
        ));
    }
    Ok(sweep)
}
