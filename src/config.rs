use crate::error::{
    BadEnvVarSnafu, FeebookResult, InvalidTimezoneSnafu, ParseBackupIntervalSnafu,
    SystemTimezoneSnafu,
};
use dotenvy::var;
use jiff::{SignedDuration, tz::TimeZone};
use snafu::ResultExt;
use std::{env::VarError, path::PathBuf, sync::Arc};

pub mod date_locale;

use date_locale::DateLocaleConfig;

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    data_dir: PathBuf,
    date_locale_config: Arc<DateLocaleConfig>,
    currency_symbol: Arc<str>,
    backup_interval: SignedDuration,
}

/// Reads `name`, treating an unset variable as `None`.
fn optional_var(name: &'static str) -> FeebookResult<Option<String>> {
    match var(name) {
        Ok(value) => Ok(Some(value)),
        Err(dotenvy::Error::EnvVar(VarError::NotPresent)) => Ok(None),
        Err(e) => Err(e).context(BadEnvVarSnafu { name }),
    }
}

fn var_or(name: &'static str, default: &str) -> FeebookResult<String> {
    Ok(optional_var(name)?.unwrap_or_else(|| default.to_string()))
}

impl RuntimeConfiguration {
    pub fn new() -> FeebookResult<Self> {
        let timezone = match optional_var("FEEBOOK_TIMEZONE")? {
            Some(tz) => TimeZone::get(&tz).context(InvalidTimezoneSnafu { tz })?,
            None => TimeZone::try_system().context(SystemTimezoneSnafu)?,
        };
        let date_locale_config = DateLocaleConfig::new(
            timezone,
            var_or("FEEBOOK_LOCALE", "en-IN")?,
            var_or("FEEBOOK_HOUR_CYCLE", "h23")?,
            var_or("FEEBOOK_CALENDAR", "gregorian")?,
        )?;

        let backup_hours = var_or("FEEBOOK_BACKUP_INTERVAL_HOURS", "24")?;
        let backup_hours: u32 = backup_hours
            .trim()
            .parse()
            .context(ParseBackupIntervalSnafu {
                original: backup_hours.as_str(),
            })?;

        let config = Self {
            data_dir: var_or("FEEBOOK_DATA_DIR", "feebook_data")?.into(),
            date_locale_config: Arc::new(date_locale_config),
            currency_symbol: var_or("FEEBOOK_CURRENCY_SYMBOL", "₹")?.into(),
            backup_interval: SignedDuration::from_hours(i64::from(backup_hours)),
        };
        info!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn date_locale_config(&self) -> Arc<DateLocaleConfig> {
        self.date_locale_config.clone()
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    pub const fn backup_interval(&self) -> SignedDuration {
        self.backup_interval
    }
}

#[cfg(test)]
impl RuntimeConfiguration {
    pub fn test_config() -> Self {
        Self {
            data_dir: PathBuf::from("unused"),
            date_locale_config: Arc::new(
                DateLocaleConfig::new(
                    TimeZone::UTC,
                    "en-GB".into(),
                    "h23".into(),
                    "gregorian".into(),
                )
                .unwrap(),
            ),
            currency_symbol: "₹".into(),
            backup_interval: SignedDuration::from_hours(24),
        }
    }
}
