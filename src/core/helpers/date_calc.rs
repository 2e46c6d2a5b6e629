#![allow(clippy::result_large_err)]

use crate::core::coerce::{self, as_text};
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::{read_optional, write_field, FailWith};
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

const UNITS: [&str; 4] = ["days", "weeks", "months", "years"];
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parsed field value, remembering which textual form it came in.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DateValue {
    Date(NaiveDate),
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl DateValue {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
            return Some(DateValue::Zoned(zoned));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, NAIVE_DATETIME_FORMAT) {
            return Some(DateValue::Naive(naive));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
            return Some(DateValue::Naive(naive));
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(DateValue::Date)
    }

    fn render(self) -> String {
        match self {
            DateValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            DateValue::Naive(naive) => naive.format(NAIVE_DATETIME_FORMAT).to_string(),
            DateValue::Zoned(zoned) => zoned.to_rfc3339(),
        }
    }

    fn shift(self, unit: &str, amount: i64) -> Option<Self> {
        match self {
            DateValue::Date(date) => shift_naive(date.and_hms_opt(0, 0, 0)?, unit, amount)
                .map(|shifted| DateValue::Date(shifted.date())),
            DateValue::Naive(naive) => shift_naive(naive, unit, amount).map(DateValue::Naive),
            DateValue::Zoned(zoned) => {
                let offset = *zoned.offset();
                shift_naive(zoned.naive_local(), unit, amount)
                    .and_then(|shifted| shifted.and_local_timezone(offset).single())
                    .map(DateValue::Zoned)
            }
        }
    }
}

fn shift_naive(value: NaiveDateTime, unit: &str, amount: i64) -> Option<NaiveDateTime> {
    let months = |count: i64| -> Option<NaiveDateTime> {
        let magnitude = Months::new(u32::try_from(count.unsigned_abs()).ok()?);
        if count >= 0 {
            value.checked_add_months(magnitude)
        } else {
            value.checked_sub_months(magnitude)
        }
    };
    match unit {
        "days" => value.checked_add_signed(Duration::try_days(amount)?),
        "weeks" => value.checked_add_signed(Duration::try_weeks(amount)?),
        "months" => months(amount),
        "years" => months(amount.checked_mul(12)?),
        _ => None,
    }
}

struct DateConfig {
    source_field: String,
    target_field: String,
    amount: i64,
    unit: String,
}

impl DateConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let source_field = coerce::require_str(config, "source_field")?;
        let target_field =
            coerce::config_str(config, "target_field").unwrap_or_else(|| source_field.clone());
        let amount = coerce::config_i64(config, "amount")?
            .ok_or_else(|| AppError::invalid_field("amount", "amount is required"))?;
        let unit = coerce::require_str(config, "unit")?;
        if !UNITS.contains(&unit.as_str()) {
            return Err(AppError::invalid_field(
                "unit",
                format!("unit must be one of: {}; got '{}'", UNITS.join(", "), unit),
            ));
        }
        Ok(Self {
            source_field,
            target_field,
            amount,
            unit,
        })
    }
}

/// Adds or subtracts a calendar interval from a date field.
#[derive(Default)]
pub struct DateCalc;

#[async_trait]
impl Helper for DateCalc {
    fn name(&self) -> &'static str {
        "Date Calc"
    }

    fn helper_type(&self) -> &'static str {
        "date_calc"
    }

    fn category(&self) -> &'static str {
        "data"
    }

    fn description(&self) -> &'static str {
        "Shift a date field by a number of days, weeks, months or years"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property(
                "source_field",
                PropertySchema::string("Date field (YYYY-MM-DD or RFC 3339)"),
            )
            .property(
                "target_field",
                PropertySchema::string("Field receiving the result (defaults to source_field)"),
            )
            .property(
                "amount",
                PropertySchema::integer("How many units to add; negative subtracts"),
            )
            .property("unit", PropertySchema::string("Interval unit").with_enum(&UNITS))
            .required(&["source_field", "amount", "unit"])
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = DateConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();

        let raw = read_optional(&input, &config.source_field)
            .await
            .fail_with(&mut output)?
            .as_ref()
            .and_then(as_text)
            .filter(|text| !text.trim().is_empty());
        let Some(raw) = raw else {
            output.log(format!("'{}' is empty", config.source_field));
            return Ok(output.succeed(format!(
                "Field '{}' has no date; nothing to calculate",
                config.source_field
            )));
        };

        let parsed = DateValue::parse(&raw)
            .ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ComputationError,
                    format!(
                        "Field '{}' does not contain a recognizable date: '{}'",
                        config.source_field, raw
                    ),
                )
                .with_code("HLP-DATE-001")
            })
            .fail_with(&mut output)?;
        let shifted = parsed
            .shift(&config.unit, config.amount)
            .ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ComputationError,
                    format!(
                        "Adding {} {} to '{}' is out of range",
                        config.amount, config.unit, raw
                    ),
                )
                .with_code("HLP-DATE-002")
            })
            .fail_with(&mut output)?;

        let rendered = shifted.render();
        write_field(
            &input,
            &mut output,
            &config.target_field,
            Value::String(rendered.clone()),
        )
        .await
        .fail_with(&mut output)?;
        Ok(output.succeed(format!(
            "Shifted {} by {} {} to {} and saved to {}",
            raw, config.amount, config.unit, rendered, config.target_field
        )))
    }
}
