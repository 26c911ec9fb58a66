use crate::error::{
    BadDateTimeFormatterSnafu, FeebookError, FeebookResult, InvalidLocaleSnafu, ZoneDateSnafu,
};
use icu::{
    calendar::{Iso, preferences::CalendarAlgorithm},
    datetime::{
        DateTimeFormatter, DateTimeFormatterPreferences,
        fieldsets::{YMD, YMDET},
        options::{Alignment, TimePrecision},
        preferences::HourCycle,
    },
    locale::Locale,
    time::{TimeZoneInfo, ZonedDateTime, zone::models::Full},
};
use jiff::{Timestamp, Zoned, civil::Date, tz::TimeZone};
use jiff_icu::ConvertFrom;
use snafu::ResultExt;

/// Where "today" is, and how dates get written for people.
#[derive(Debug, Clone)]
pub struct DateLocaleConfig {
    pub timezone: TimeZone,
    pub locale: Locale,
    dtf_prefs: DateTimeFormatterPreferences,
}

#[derive(Copy, Clone, Debug)]
pub enum DateFormat {
    ShortYMDET,
    ShortYMD,
    LongYMD,
}

impl DateLocaleConfig {
    fn dtf_prefs_and_locale_from_strings(
        locale: String,
        hour_cycle: String,
        calendar_algorithm: String,
    ) -> FeebookResult<(Locale, DateTimeFormatterPreferences)> {
        let locale =
            Locale::try_from_str(&locale).context(InvalidLocaleSnafu { provided: locale })?;
        let hour_cycle = match hour_cycle.as_str() {
            "h23" => HourCycle::H23,
            "h11" => HourCycle::H11,
            "h12" => HourCycle::H12,
            _ => {
                return Err(FeebookError::InvalidHourCycle {
                    provided: hour_cycle,
                });
            }
        };
        let calendar_algorithm = match calendar_algorithm.as_str() {
            "gregorian" => CalendarAlgorithm::Iso8601,
            "buddhist" => CalendarAlgorithm::Buddhist,
            "indian" => CalendarAlgorithm::Indian,
            "japanese" => CalendarAlgorithm::Japanese,
            "hebrew" => CalendarAlgorithm::Hebrew,
            "persian" => CalendarAlgorithm::Persian,
            _ => {
                return Err(FeebookError::InvalidCalendarAlgorithm {
                    provided: calendar_algorithm,
                });
            }
        };

        let mut prefs = DateTimeFormatterPreferences::default();
        prefs.locale_preferences = (&locale).into();
        prefs.hour_cycle = Some(hour_cycle);
        prefs.calendar_algorithm = Some(calendar_algorithm);
        Ok((locale, prefs))
    }

    pub fn new(
        timezone: TimeZone,
        locale: String,
        hour_cycle: String,
        calendar_algorithm: String,
    ) -> FeebookResult<Self> {
        let (locale, dtf_prefs) =
            Self::dtf_prefs_and_locale_from_strings(locale, hour_cycle, calendar_algorithm)?;

        Ok(Self {
            timezone,
            locale,
            dtf_prefs,
        })
    }

    /// The current moment in the configured zone. Everything that needs "today" goes through this.
    pub fn now(&self) -> Zoned {
        Timestamp::now().to_zoned(self.timezone.clone())
    }

    pub fn format(&self, zoned: &Zoned, date_format: DateFormat) -> FeebookResult<String> {
        let zdt: ZonedDateTime<Iso, TimeZoneInfo<Full>> = ZonedDateTime::convert_from(&zoned.with_time_zone(self.timezone.clone()));

        Ok(match date_format {
            DateFormat::ShortYMDET => DateTimeFormatter::try_new(self.dtf_prefs, {
                let mut fieldset = YMDET::short();
                fieldset.alignment = Some(Alignment::Column);
                fieldset.time_precision = Some(TimePrecision::Minute);
                fieldset
            })
            .context(BadDateTimeFormatterSnafu)?
            .format(&zdt)
            .to_string(),
            DateFormat::ShortYMD => DateTimeFormatter::try_new(self.dtf_prefs, {
                let mut fieldset = YMD::short();
                fieldset.alignment = Some(Alignment::Column);
                fieldset
            })
            .context(BadDateTimeFormatterSnafu)?
            .format(&zdt)
            .to_string(),
            DateFormat::LongYMD => DateTimeFormatter::try_new(self.dtf_prefs, YMD::long())
                .context(BadDateTimeFormatterSnafu)?
                .format(&zdt)
                .to_string(),
        })
    }

    pub fn short_ymdet(&self, timestamp: Timestamp) -> FeebookResult<String> {
        self.format(
            &timestamp.to_zoned(self.timezone.clone()),
            DateFormat::ShortYMDET,
        )
    }

    pub fn short_ymd(&self, date: Date) -> FeebookResult<String> {
        self.format(&self.start_of(date)?, DateFormat::ShortYMD)
    }

    pub fn long_ymd(&self, date: Date) -> FeebookResult<String> {
        self.format(&self.start_of(date)?, DateFormat::LongYMD)
    }

    fn start_of(&self, date: Date) -> FeebookResult<Zoned> {
        date.to_zoned(self.timezone.clone())
            .context(ZoneDateSnafu { date })
    }
}
