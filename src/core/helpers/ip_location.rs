#![allow(clippy::result_large_err)]

use crate::core::coerce::{self, as_text};
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::geo::GeoLocation;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::{read_optional, write_field, FailWith};
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::net::IpAddr;

struct LocationConfig {
    ip_field: String,
    city_field: Option<String>,
    region_field: Option<String>,
    country_field: Option<String>,
    country_code_field: Option<String>,
}

impl LocationConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let mut parsed = Self {
            ip_field: coerce::require_str(config, "ip_field")?,
            city_field: coerce::config_str(config, "city_field"),
            region_field: coerce::config_str(config, "region_field"),
            country_field: coerce::config_str(config, "country_field"),
            country_code_field: coerce::config_str(config, "country_code_field"),
        };
        if parsed.city_field.is_none()
            && parsed.region_field.is_none()
            && parsed.country_field.is_none()
            && parsed.country_code_field.is_none()
        {
            parsed.city_field = Some("city".to_string());
            parsed.region_field = Some("region".to_string());
            parsed.country_field = Some("country".to_string());
        }
        if parsed
            .targets()
            .any(|target| target == parsed.ip_field.as_str())
        {
            return Err(AppError::invalid_field(
                "ip_field",
                "ip_field cannot also be a location target",
            ));
        }
        Ok(parsed)
    }

    fn targets(&self) -> impl Iterator<Item = &str> {
        [
            &self.city_field,
            &self.region_field,
            &self.country_field,
            &self.country_code_field,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
    }

    /// Configured target fields paired with the resolved values that exist.
    fn targets_of(&self, location: &GeoLocation) -> Vec<(String, String)> {
        [
            (&self.city_field, &location.city),
            (&self.region_field, &location.region),
            (&self.country_field, &location.country),
            (&self.country_code_field, &location.country_code),
        ]
        .into_iter()
        .filter_map(|(field, value)| match (field, value) {
            (Some(field), Some(value)) if !value.trim().is_empty() => {
                Some((field.clone(), value.clone()))
            }
            _ => None,
        })
        .collect()
    }
}

fn is_routable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified()),
    }
}

/// Looks up the contact's IP address and stores its location.
#[derive(Default)]
pub struct IpLocation;

#[async_trait]
impl Helper for IpLocation {
    fn name(&self) -> &'static str {
        "IP Location"
    }

    fn helper_type(&self) -> &'static str {
        "ip_location"
    }

    fn category(&self) -> &'static str {
        "enrichment"
    }

    fn description(&self) -> &'static str {
        "Resolve an IP address field to city, region and country fields"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property("ip_field", PropertySchema::string("Field holding the IP address"))
            .property(
                "city_field",
                PropertySchema::string(
                    "Field receiving the city (city, region and country are used when no target is set)",
                ),
            )
            .property(
                "region_field",
                PropertySchema::string("Field receiving the region or state"),
            )
            .property(
                "country_field",
                PropertySchema::string("Field receiving the country name"),
            )
            .property(
                "country_code_field",
                PropertySchema::string("Field receiving the ISO country code"),
            )
            .required(&["ip_field"])
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        self.config_schema().validate(config)?;
        LocationConfig::from_config(config).map(|_| ())
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = LocationConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();

        let raw = read_optional(&input, &config.ip_field)
            .await
            .fail_with(&mut output)?
            .as_ref()
            .and_then(as_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let Some(raw) = raw else {
            output.log(format!("'{}' is empty", config.ip_field));
            return Ok(output.succeed(format!(
                "Field '{}' has no IP address; nothing to look up",
                config.ip_field
            )));
        };

        let ip: IpAddr = raw
            .parse()
            .map_err(|_| {
                AppError::new(
                    ErrorCategory::ComputationError,
                    format!("Field '{}' is not a valid IP address: '{}'", config.ip_field, raw),
                )
                .with_code("HLP-GEO-002")
            })
            .fail_with(&mut output)?;
        if !is_routable(&ip) {
            output.log(format!("{} is not publicly routable", ip));
            return Ok(output.succeed(format!(
                "IP address {} is private; location unavailable",
                ip
            )));
        }

        let lookup = ctx.geo_lookup().fail_with(&mut output)?;
        let location = lookup
            .lookup(ip)
            .await
            .map_err(AppError::from)
            .fail_with(&mut output)?;
        output.log(format!("resolved {} to {:?}", ip, location));

        let targets = config.targets_of(&location);
        if targets.is_empty() {
            return Ok(output.succeed(format!(
                "No location data returned for {}",
                ip
            )));
        }
        let mut written = Vec::with_capacity(targets.len());
        for (field, value) in targets {
            write_field(&input, &mut output, &field, Value::String(value))
                .await
                .fail_with(&mut output)?;
            written.push(field);
        }
        Ok(output.succeed(format!(
            "Located {} and updated {}",
            ip,
            written.join(", ")
        )))
    }
}
