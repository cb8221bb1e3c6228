//! Turns alert facts into the maintenance digest text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::{StructureAlerts, StructureReport};

/// Banner lines added when corporation assets could not be read.
pub const ASSETS_UNAVAILABLE_BANNER: [&str; 3] = [
    ":frogsiren:   *********************************************************   :frogsiren:",
    "    Failed to read assets, Ozone and Core checks will be skipped.    ",
    ":frogsiren:   *********************************************************   :frogsiren:",
];

/// Formats a timestamp the way every digest line shows it.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn format_optional(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "unknown".to_string(), format_timestamp)
}

/// Which alert categories make it into the digest.
///
/// Every toggle defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Extractions arriving soon.
    pub upcoming_detonations: bool,
    /// Moon drills with nothing scheduled.
    pub unscheduled_detonations: bool,
    /// Jump gates low on Liquid Ozone.
    pub ansiblex_ozone: bool,
    /// Structures running out of fuel.
    pub fuel_warning: bool,
    /// Online/offline service listings.
    pub service_state: bool,
    /// Reinforced or vulnerable timers.
    pub structure_state: bool,
    /// Missing quantum cores.
    pub core_state: bool,
    /// False when assets could not be read; ozone and core lines are skipped.
    pub assets_available: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            upcoming_detonations: true,
            unscheduled_detonations: true,
            ansiblex_ozone: true,
            fuel_warning: true,
            service_state: true,
            structure_state: true,
            core_state: true,
            assets_available: true,
        }
    }
}

impl ReportOptions {
    /// Marks corporation assets as unavailable.
    #[must_use]
    pub const fn without_assets(mut self) -> Self {
        self.assets_available = false;
        self
    }
}

/// Renders the alert lines for one structure, in a fixed order.
#[must_use]
pub fn structure_lines(alerts: &StructureAlerts, options: &ReportOptions) -> Vec<String> {
    let mut lines = Vec::new();
    if options.unscheduled_detonations && alerts.needs_detonation {
        lines.push("Needs to have an extraction scheduled".to_string());
    }
    if options.upcoming_detonations && alerts.detonates_soon {
        lines.push(format!("Ready to detonate {}", format_optional(alerts.detonation)));
    }
    if options.ansiblex_ozone && options.assets_available && alerts.needs_ozone {
        lines.push(format!("Low on Liquid Ozone: {}", alerts.jump_fuel));
    }
    if options.fuel_warning && alerts.needs_fuel {
        lines.push(format!("Runs out of fuel on {}", format_optional(alerts.fuel_expires)));
        if options.service_state {
            if !alerts.online_services.is_empty() {
                lines.push(format!("Online Services: {}", alerts.online_services.join(", ")));
            }
            if !alerts.offline_services.is_empty() {
                lines.push(format!("Offline Services: {}", alerts.offline_services.join(", ")));
            }
        }
    }
    if options.service_state && !alerts.offline_services.is_empty() {
        lines.push(format!("Offline services: {}", alerts.offline_services.join(", ")));
    }
    if options.structure_state && (alerts.vulnerable || alerts.reinforced) {
        lines.push(format!(
            "{} until {}",
            alerts.state.title(),
            format_optional(alerts.state_timer_end)
        ));
    }
    if options.core_state && options.assets_available && alerts.needs_core {
        lines.push("No core installed".to_string());
    }
    lines
}

/// Renders the message block for one structure report, if anything fired.
#[must_use]
pub fn structure_message(report: &StructureReport, options: &ReportOptions) -> Option<String> {
    match report {
        StructureReport::Inaccessible {
            structure_id,
            system_id,
            system_name,
        } => {
            let system = system_name
                .clone()
                .unwrap_or_else(|| system_id.to_string());
            Some(format!("Found an inaccessible citadel ({structure_id}) in {system}"))
        }
        StructureReport::Alerts(alerts) => {
            let lines = structure_lines(alerts, options);
            if lines.is_empty() {
                return None;
            }
            let mut block = alerts.name.clone();
            for line in lines {
                block.push('\n');
                block.push_str(&line);
            }
            Some(block)
        }
    }
}

/// The message set posted for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Digest {
    corporation: String,
    errors: Vec<String>,
    messages: Vec<String>,
}

impl Digest {
    /// Creates an empty digest for a corporation.
    #[must_use]
    pub fn new(corporation: impl Into<String>) -> Self {
        Self {
            corporation: corporation.into(),
            errors: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Adds a message block.
    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Adds an error line, shown above the header.
    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Adds the banner shown when assets could not be read.
    pub fn push_assets_unavailable(&mut self, reason: impl Into<String>) {
        self.errors.push(reason.into());
        self.errors
            .extend(ASSETS_UNAVAILABLE_BANNER.iter().map(ToString::to_string));
    }

    /// Adds the rendered block for a structure report, if any.
    pub fn push_report(&mut self, report: &StructureReport, options: &ReportOptions) {
        if let Some(message) = structure_message(report, options) {
            self.messages.push(message);
        }
    }

    /// Drops all message blocks, keeping errors.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// The digest header.
    #[must_use]
    pub fn header(&self) -> String {
        format!("Upcoming {} Structure Maintenance Tasks", self.corporation)
    }

    /// Message blocks in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Error lines in insertion order.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// True when there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.errors.is_empty()
    }

    /// Error lines, then the header, then message blocks sorted
    /// case-insensitively.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut sorted = self.messages.clone();
        sorted.sort_by_cached_key(|m| m.to_lowercase());
        let mut lines = self.errors.clone();
        lines.push(self.header());
        lines.extend(sorted);
        lines
    }

    /// The digest as posted: lines separated by blank lines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines().join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::StructureState;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 3, 18, 30, 0).unwrap()
    }

    fn quiet(name: &str) -> StructureAlerts {
        StructureAlerts {
            structure_id: 1,
            name: name.to_string(),
            state: StructureState::Online,
            needs_detonation: false,
            detonates_soon: false,
            needs_ozone: false,
            needs_fuel: false,
            reinforced: false,
            vulnerable: false,
            has_core: true,
            needs_core: false,
            unanchoring: false,
            fuel_rate: Some(0.0),
            fuel_rate_error: None,
            jump_fuel: 0,
            detonation: None,
            state_timer_end: None,
            fuel_expires: None,
            online_services: Vec::new(),
            offline_services: Vec::new(),
        }
    }

    mod line_tests {
        use super::*;

        #[test]
        fn quiet_structure_has_no_lines() {
            assert!(structure_lines(&quiet("x"), &ReportOptions::default()).is_empty());
            let report = StructureReport::Alerts(quiet("x"));
            assert_eq!(structure_message(&report, &ReportOptions::default()), None);
        }

        #[test]
        fn lines_follow_fixed_order() {
            let mut a = quiet("x");
            a.needs_detonation = true;
            a.detonates_soon = true;
            a.detonation = Some(ts());
            a.needs_ozone = true;
            a.jump_fuel = 1200;
            a.needs_fuel = true;
            a.fuel_expires = Some(ts());
            a.online_services = vec!["Moon Drilling".to_string()];
            a.offline_services = vec!["Reprocessing".to_string()];
            a.state = StructureState::ArmorReinforce;
            a.reinforced = true;
            a.state_timer_end = Some(ts());
            a.needs_core = true;

            assert_eq!(
                structure_lines(&a, &ReportOptions::default()),
                vec![
                    "Needs to have an extraction scheduled",
                    "Ready to detonate 2024-05-03 18:30 UTC",
                    "Low on Liquid Ozone: 1200",
                    "Runs out of fuel on 2024-05-03 18:30 UTC",
                    "Online Services: Moon Drilling",
                    "Offline Services: Reprocessing",
                    "Offline services: Reprocessing",
                    "Armor Reinforce until 2024-05-03 18:30 UTC",
                    "No core installed",
                ]
            );
        }

        #[test]
        fn suppressed_categories_are_skipped() {
            let mut a = quiet("x");
            a.needs_fuel = true;
            a.fuel_expires = Some(ts());
            a.online_services = vec!["Manufacturing (Standard)".to_string()];
            a.vulnerable = true;
            a.state = StructureState::HullVulnerable;

            let options = ReportOptions {
                service_state: false,
                structure_state: false,
                ..ReportOptions::default()
            };
            assert_eq!(
                structure_lines(&a, &options),
                vec!["Runs out of fuel on 2024-05-03 18:30 UTC"]
            );
        }

        #[test]
        fn missing_assets_skip_ozone_and_core() {
            let mut a = quiet("x");
            a.needs_ozone = true;
            a.needs_core = true;
            let options = ReportOptions::default().without_assets();
            assert!(structure_lines(&a, &options).is_empty());
        }

        #[test]
        fn message_block_starts_with_name() {
            let mut a = quiet("Jita - Keepstar");
            a.needs_core = true;
            let report = StructureReport::Alerts(a);
            assert_eq!(
                structure_message(&report, &ReportOptions::default()).as_deref(),
                Some("Jita - Keepstar\nNo core installed")
            );
        }

        #[test]
        fn inaccessible_message() {
            let named = StructureReport::Inaccessible {
                structure_id: 1_022_734_985_679,
                system_id: 30_000_142,
                system_name: Some("Jita".to_string()),
            };
            let unnamed = StructureReport::Inaccessible {
                structure_id: 5,
                system_id: 30_000_142,
                system_name: None,
            };
            assert_eq!(
                structure_message(&named, &ReportOptions::default()).as_deref(),
                Some("Found an inaccessible citadel (1022734985679) in Jita")
            );
            assert_eq!(
                structure_message(&unnamed, &ReportOptions::default()).as_deref(),
                Some("Found an inaccessible citadel (5) in 30000142")
            );
        }
    }

    mod digest_tests {
        use super::*;

        #[test]
        fn sorts_case_insensitively_after_header() {
            let mut d = Digest::new("Test Corp");
            d.push_message("beta\nNo core installed");
            d.push_message("Alpha\nNo core installed");
            d.push_message("Charlie\nNo core installed");

            assert_eq!(
                d.lines(),
                vec![
                    "Upcoming Test Corp Structure Maintenance Tasks",
                    "Alpha\nNo core installed",
                    "beta\nNo core installed",
                    "Charlie\nNo core installed",
                ]
            );
        }

        #[test]
        fn errors_precede_header() {
            let mut d = Digest::new("Test Corp");
            d.push_assets_unavailable("assets request failed");
            d.push_message("x");
            let lines = d.lines();
            assert_eq!(lines[0], "assets request failed");
            assert_eq!(lines[1], ASSETS_UNAVAILABLE_BANNER[0]);
            assert_eq!(lines[4], d.header());
            assert_eq!(lines[5], "x");
        }

        #[test]
        fn text_joins_with_blank_lines() {
            let mut d = Digest::new("C");
            d.push_message("a");
            assert_eq!(d.text(), "Upcoming C Structure Maintenance Tasks\n\na");
        }

        #[test]
        fn empty_digest() {
            let mut d = Digest::new("C");
            assert!(d.is_empty());
            d.push_message("a");
            d.clear_messages();
            assert!(d.is_empty());
            d.push_error("boom");
            assert!(!d.is_empty());
        }
    }
}
