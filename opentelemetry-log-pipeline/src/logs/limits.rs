use crate::error::ConfigError;
use crate::logs::BoundedAttributes;
use std::env;
use std::str::FromStr;

/// Maximum number of attributes per log record.
pub(crate) const OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT";
/// Default maximum number of attributes per log record.
pub(crate) const OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT_DEFAULT: usize = 128;
/// Maximum length, in characters, of string attribute values.
pub(crate) const OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str =
    "OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT";

/// Limits applied to the attributes of every log record.
///
/// Use [`LogLimitsBuilder`] to customize them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLimits {
    max_number_of_attributes: usize,
    max_attribute_value_length: Option<usize>,
}

impl LogLimits {
    /// Create a new [`LogLimitsBuilder`], initialized from the environment.
    pub fn builder() -> LogLimitsBuilder {
        LogLimitsBuilder::default()
    }

    /// The maximum number of attributes a log record retains.
    pub fn max_number_of_attributes(&self) -> usize {
        self.max_number_of_attributes
    }

    /// The maximum number of characters of a string attribute value, `None`
    /// when unlimited.
    pub fn max_attribute_value_length(&self) -> Option<usize> {
        self.max_attribute_value_length
    }

    /// An empty attribute collection enforcing these limits.
    pub fn new_attributes(&self) -> BoundedAttributes {
        BoundedAttributes::new(
            self.max_number_of_attributes,
            self.max_attribute_value_length,
        )
    }
}

impl Default for LogLimits {
    fn default() -> Self {
        LogLimits {
            max_number_of_attributes: OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT_DEFAULT,
            max_attribute_value_length: None,
        }
    }
}

/// A builder for [`LogLimits`].
#[derive(Debug)]
pub struct LogLimitsBuilder {
    max_number_of_attributes: usize,
    max_attribute_value_length: Option<usize>,
}

impl Default for LogLimitsBuilder {
    /// Create a new [`LogLimitsBuilder`] with the default limits, overridden by
    /// environment variables if set:
    /// * `OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT`
    /// * `OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT`
    ///
    /// Note: Programmatic configuration overrides any value set via the environment variable.
    fn default() -> Self {
        let limits = LogLimits::default();
        LogLimitsBuilder {
            max_number_of_attributes: limits.max_number_of_attributes,
            max_attribute_value_length: limits.max_attribute_value_length,
        }
        .init_from_env_vars()
    }
}

impl LogLimitsBuilder {
    /// Set the maximum number of attributes per log record. Must be positive.
    /// The default value is 128.
    ///
    /// Corresponding environment variable: `OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT`.
    pub fn with_max_number_of_attributes(mut self, max_number_of_attributes: usize) -> Self {
        self.max_number_of_attributes = max_number_of_attributes;
        self
    }

    /// Set the maximum number of characters for string attribute values. For
    /// list values it applies to each string entry individually. Unlimited by
    /// default.
    ///
    /// Corresponding environment variable: `OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT`.
    pub fn with_max_attribute_value_length(mut self, max_attribute_value_length: usize) -> Self {
        self.max_attribute_value_length = Some(max_attribute_value_length);
        self
    }

    /// Builds the limits, rejecting a zero attribute count.
    pub fn build(self) -> Result<LogLimits, ConfigError> {
        if self.max_number_of_attributes == 0 {
            return Err(ConfigError::invalid_value(
                "max_number_of_attributes",
                "must be greater than 0",
            ));
        }
        Ok(LogLimits {
            max_number_of_attributes: self.max_number_of_attributes,
            max_attribute_value_length: self.max_attribute_value_length,
        })
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(count) = env::var(OTEL_LOGRECORD_ATTRIBUTE_COUNT_LIMIT)
            .ok()
            .and_then(|count| usize::from_str(&count).ok())
        {
            self.max_number_of_attributes = count;
        }

        if let Some(length) = env::var(OTEL_LOGRECORD_ATTRIBUTE_VALUE_LENGTH_LIMIT)
            .ok()
            .and_then(|length| usize::from_str(&length).ok())
        {
            self.max_attribute_value_length = Some(length);
        }

        self
    }
}
