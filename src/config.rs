use config::{Config, ConfigError, File};
use secrecy::Secret;
use serde::de::DeserializeOwned;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time::Duration;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

/// Settings of the webhook relay process.
#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub webhook: WebhookSettings,
    pub crm: CrmSettings,
    pub mailing_list: MailingListSettings,
    pub datastore: DatastoreSettings,
    pub bonus: BonusSettings,
    pub jobs: JobSettings,
}

/// Settings of the barcode scanner demo process.
#[derive(serde::Deserialize, Clone)]
pub struct ScannerSettings {
    pub application: ApplicationSettings,
    pub inventory: InventorySettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct WebhookSettings {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(serde::Deserialize, Clone)]
pub struct CrmSettings {
    pub lookup_url: String,
    pub bonus_url: String,
    pub api_key: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct MailingListSettings {
    pub base_url: String,
    pub username: String,
    pub api_key: Secret<String>,
    // Signed on purpose: a non-positive id is a misconfiguration the sync loop reports
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub list_id: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bulk_timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatastoreSettings {
    pub base_url: String,
    pub admin_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bulk_timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct BonusSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub amount: f64,
}

#[derive(serde::Deserialize, Clone)]
pub struct JobSettings {
    pub enabled: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_interval_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bonus_check_interval_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bonus_workers: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bonus_queue_capacity: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sync_interval_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sync_cooldown_seconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct InventorySettings {
    pub api_url: String,
    pub token: Secret<String>,
    pub auth: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl Settings {
    pub fn get_address(&self) -> String {
        self.application.get_address()
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }

    pub fn set_crm_base_url(&mut self, base_url: &str) {
        self.crm.lookup_url = format!("{}/v1/customers/lookup", base_url);
        self.crm.bonus_url = format!("{}/v1/bonuses", base_url);
    }

    pub fn set_mailing_list_base_url(&mut self, base_url: String) {
        self.mailing_list.base_url = base_url;
    }

    pub fn set_datastore_base_url(&mut self, base_url: String) {
        self.datastore.base_url = base_url;
    }
}

impl ScannerSettings {
    pub fn get_address(&self) -> String {
        self.application.get_address()
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }

    pub fn set_inventory_api_url(&mut self, api_url: String) {
        self.inventory.api_url = api_url;
    }
}

impl ApplicationSettings {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl CrmSettings {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl MailingListSettings {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn get_bulk_timeout(&self) -> Duration {
        Duration::from_millis(self.bulk_timeout_milliseconds)
    }
}

impl DatastoreSettings {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn get_bulk_timeout(&self) -> Duration {
        Duration::from_millis(self.bulk_timeout_milliseconds)
    }
}

impl InventorySettings {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl JobSettings {
    pub fn get_retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }

    pub fn get_bonus_check_interval(&self) -> Duration {
        Duration::from_secs(self.bonus_check_interval_seconds)
    }

    pub fn get_sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_seconds)
    }

    pub fn get_sync_cooldown(&self) -> Duration {
        Duration::from_secs(self.sync_cooldown_seconds)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

/// Loads the settings of `app` from `config/<app>/` merged with `APP_*` environment variables.
pub fn get_configuration<T: DeserializeOwned>(app: &str) -> Result<T, ConfigError> {
    let root_path = std::env::current_dir()
        .map_err(|err| ConfigError::Message(format!("Failed to determine the current directory: {}", err)))?;
    let config_directory = root_path.join("config").join(app);
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_CRM__API_KEY would set Settings.crm.api_key
        .add_source(
            config::Environment::with_prefix("app")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into the settings type
    settings.try_deserialize()
}
