//! Output formatting for commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use structure_core::{Structure, format_timestamp};

use crate::cli::Format;
use crate::error::BotError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), BotError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| BotError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, BotError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| BotError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), BotError>;
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// What a `check` run produced and where it went.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// Corporation checked.
    pub corporation: String,
    /// Number of message blocks.
    pub messages: usize,
    /// Number of error lines.
    pub errors: usize,
    /// Channel the digest was handed to, if anything was sent.
    pub delivered_to: Option<String>,
    /// The digest as sent.
    pub lines: Vec<String>,
}

impl TableDisplay for CheckOutcome {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), BotError> {
        writeln!(writer, "Structure Check: {}", self.corporation)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Messages:         {}", self.messages)?;
        writeln!(writer, "Errors:           {}", self.errors)?;
        match &self.delivered_to {
            Some(channel) => writeln!(writer, "Delivered:        {channel}")?,
            None => writeln!(writer, "Delivered:        nothing to report")?,
        }
        Ok(())
    }
}

/// Audit details for one structure.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    /// Structure id.
    pub structure_id: i64,
    /// Hull type name.
    pub type_name: String,
    /// Structure name.
    pub name: String,
    /// Current state.
    pub state: String,
    /// Fuel expiry.
    pub fuel_expires: Option<DateTime<Utc>>,
    /// Service fuel blocks per hour, when every module has a rate.
    pub fuel_rate: Option<f64>,
    /// Why the fuel rate could not be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_rate_error: Option<String>,
    /// Fuel runs out within the warning window.
    pub needs_fuel: bool,
    /// Liquid Ozone in the fuel bay.
    pub jump_fuel: i64,
    /// Quantum core missing.
    pub needs_core: bool,
    /// Unanchoring scheduled.
    pub unanchoring: bool,
    /// Reinforcement profile.
    pub profile_id: Option<i64>,
    /// Packaged volume of hull and contents, in m3.
    pub packaged_volume: f64,
    /// Solar system name, when resolved.
    pub system_name: Option<String>,
    /// Fitted modules, one line per slot.
    pub fitting: Vec<String>,
}

impl AuditRow {
    /// Collects audit details from an assembled structure.
    #[must_use]
    pub fn from_structure(structure: &Structure, now: DateTime<Utc>, too_soon: chrono::TimeDelta) -> Self {
        let (fuel_rate, fuel_rate_error) = match structure.fuel_rate() {
            Ok(rate) => (Some(rate), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            structure_id: structure.structure_id,
            type_name: structure.type_name().to_string(),
            name: structure.name.clone(),
            state: structure.state.title(),
            fuel_expires: structure.fuel_expires,
            fuel_rate,
            fuel_rate_error,
            needs_fuel: structure.needs_fuel(now, too_soon),
            jump_fuel: structure.jump_fuel(),
            needs_core: structure.needs_core(),
            unanchoring: structure.unanchoring(),
            profile_id: structure.profile_id,
            packaged_volume: structure.packaged_volume(),
            system_name: structure.system_name.clone(),
            fitting: structure.fitting.to_string().lines().map(ToString::to_string).collect(),
        }
    }
}

/// Audit of every structure a corporation owns.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Corporation audited.
    pub corporation: String,
    /// One row per structure, sorted by name.
    pub structures: Vec<AuditRow>,
    /// Structures that could not be assembled or rated.
    pub errors: Vec<String>,
    /// Sum of the known hourly fuel rates.
    pub total_fuel_per_hour: f64,
}

impl AuditReport {
    /// Builds a report, sorting rows by name and totalling fuel.
    #[must_use]
    pub fn new(corporation: impl Into<String>, mut structures: Vec<AuditRow>, errors: Vec<String>) -> Self {
        structures.sort_by(|a, b| a.name.cmp(&b.name));
        let total_fuel_per_hour = structures.iter().filter_map(|s| s.fuel_rate).sum();
        Self {
            corporation: corporation.into(),
            structures,
            errors,
            total_fuel_per_hour,
        }
    }
}

impl TableDisplay for AuditReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), BotError> {
        writeln!(writer, "{} Structure Audit", self.corporation)?;
        writeln!(writer, "══════════════════════════════════")?;
        for row in &self.structures {
            writeln!(writer)?;
            writeln!(writer, "{} ({})", row.name, row.structure_id)?;
            writeln!(writer, "  Type:             {}", row.type_name)?;
            writeln!(writer, "  System:           {}", row.system_name.as_deref().unwrap_or("unknown"))?;
            writeln!(writer, "  State:            {}", row.state)?;
            let expires = row.fuel_expires.map_or_else(|| "n/a".to_string(), format_timestamp);
            writeln!(writer, "  Fuel Expires:     {expires}")?;
            match row.fuel_rate {
                Some(rate) => writeln!(writer, "  Fuel/Hour:        {rate}")?,
                None => writeln!(writer, "  Fuel/Hour:        unknown")?,
            }
            writeln!(writer, "  Needs Fuel:       {}", yes_no(row.needs_fuel))?;
            writeln!(writer, "  Jump Fuel:        {}", row.jump_fuel)?;
            writeln!(writer, "  Needs Core:       {}", yes_no(row.needs_core))?;
            writeln!(writer, "  Unanchoring:      {}", yes_no(row.unanchoring))?;
            writeln!(writer, "  Packaged Volume:  {:.0} m3", row.packaged_volume)?;
            if !row.fitting.is_empty() {
                writeln!(writer, "  Fitting:")?;
                for line in &row.fitting {
                    writeln!(writer, "    {line}")?;
                }
            }
        }
        if !self.errors.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Errors")?;
            for error in &self.errors {
                writeln!(writer, "  {error}")?;
            }
        }
        writeln!(writer)?;
        writeln!(writer, "Total Fuel/Hour:    {}", self.total_fuel_per_hour)?;
        Ok(())
    }
}
