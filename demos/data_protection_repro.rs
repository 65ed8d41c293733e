//! Builds two providers from one frozen registry and prints the data
//! protection discriminator each of them captured. Both lines read `app`.
//!
//! ```text
//! RUST_LOG=snapshot_di=debug cargo run --example data_protection_repro --features config
//! ```

use std::sync::Arc;

use snapshot_di::hosting::{
    configure_services, run_repro, AppConfiguration, ConfigurationError, HostingEnvironment,
    DEFAULT_CONNECTION,
};
use snapshot_di::{LoggingObserver, ServiceCollection};
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "REPRO_";

fn load_configuration(environment: &HostingEnvironment) -> Result<AppConfiguration, ConfigurationError> {
    match AppConfiguration::for_environment(environment, Some(ENV_PREFIX)) {
        Ok(configuration) if configuration.connection_string(DEFAULT_CONNECTION).is_some() => {
            Ok(configuration)
        }
        Ok(_) | Err(ConfigurationError::MissingFile(_)) => {
            tracing::info!("no appsettings.json with a connection string; using built-in defaults");
            AppConfiguration::builder()
                .add_in_memory([(
                    "ConnectionStrings:DefaultConnection",
                    "Server=(localdb)\\mssqllocaldb;Database=repro;Trusted_Connection=True",
                )])
                .add_environment_variables(Some(ENV_PREFIX))
                .build()
        }
        Err(other) => Err(other),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let environment = HostingEnvironment::from_env("data-protection-repro");
    let configuration = load_configuration(&environment)?;

    let mut services = ServiceCollection::new();
    services.add_observer(Arc::new(LoggingObserver::with_prefix("repro")))?;
    configure_services(&mut services, &configuration, &environment)?;
    let registry = services.freeze()?;

    let report = run_repro(&registry)?;
    println!("{}", report.first);
    println!("{}", report.second);
    Ok(())
}
