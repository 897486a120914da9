use std::io::Write;
use std::time::Duration;

use account_feeds::render::{RegionMap, RenderContext, RenderError, Renderer};
use account_feeds::{AccountRecord, SourceLocations};
use chrono::{DateTime, Utc};
#[cfg(feature = "colored-output")]
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;

#[derive(Debug, Clone, Copy)]
enum Tint {
    Green,
    Yellow,
    Cyan,
    Blue,
}

#[derive(Serialize)]
struct AccountView<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'a str>,
    tag: &'a str,
    time: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    minutes_ago: Option<i64>,
}

impl<'a> AccountView<'a> {
    fn new(record: &'a AccountRecord, regions: &'a RegionMap, now: DateTime<Utc>) -> Self {
        Self {
            username: &record.identifier,
            password: &record.secret,
            country: record.region_code.as_deref(),
            tag: regions.tag(record.region_code.as_deref()),
            time: record.observed_at.raw(),
            minutes_ago: record.minutes_since(now),
        }
    }
}

#[cfg(feature = "table-output")]
#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Password")]
    password: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Flag")]
    tag: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn format_age(minutes: Option<i64>) -> String {
    match minutes {
        Some(m) if m <= 0 => "just now".to_string(),
        Some(m) => format!("{m} min ago"),
        None => "unknown".to_string(),
    }
}

/// Prints records to stdout and drives the loading spinner.
#[cfg_attr(not(feature = "colored-output"), allow(dead_code))]
pub struct OutputManager {
    format: OutputFormat,
    colored: bool,
    spinner: ProgressBar,
}

impl OutputManager {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        let spinner = if format.is_json() {
            ProgressBar::hidden()
        } else {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
                spinner.set_style(style.tick_strings(&[
                    "▹▹▹▹▹", "▸▹▹▹▹", "▹▸▹▹▹", "▹▹▸▹▹", "▹▹▹▸▹", "▹▹▹▹▸", "▪▪▪▪▪",
                ]));
            }
            spinner
        };
        Self {
            format,
            colored,
            spinner,
        }
    }

    #[cfg_attr(not(feature = "colored-output"), allow(unused_variables))]
    fn colorize(&self, text: &str, tint: Tint, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match tint {
                    Tint::Green => text.green(),
                    Tint::Yellow => text.yellow(),
                    Tint::Cyan => text.cyan(),
                    Tint::Blue => text.blue(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            text.to_string()
        }
    }

    pub fn format_records(
        &self,
        records: &[AccountRecord],
        context: &RenderContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<String, RenderError> {
        match self.format {
            OutputFormat::Pretty => Ok(self.format_pretty(records, context, now)),
            OutputFormat::Json => self.format_json(records, context, now, true),
            OutputFormat::JsonCompact => self.format_json(records, context, now, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.format_table(records, context, now)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.format_pretty(records, context, now)),
        }
    }

    fn format_pretty(
        &self,
        records: &[AccountRecord],
        context: &RenderContext<'_>,
        now: DateTime<Utc>,
    ) -> String {
        let mut output = String::new();
        if !context.promotion_link.is_empty() {
            output.push_str(&format!(
                "{} {}\n\n",
                self.colorize("Register:", Tint::Yellow, true),
                self.colorize(context.promotion_link, Tint::Blue, false)
            ));
        }

        if records.is_empty() {
            output.push_str("No accounts available right now.\n");
            return output;
        }

        for record in records {
            let view = AccountView::new(record, context.regions, now);
            output.push_str(&format!(
                "{} [{}]\n",
                self.colorize(view.username, Tint::Green, true),
                self.colorize(view.tag, Tint::Cyan, false)
            ));
            if let Some(country) = view.country {
                output.push_str(&format!(
                    "  {}: {}\n",
                    self.colorize("Region", Tint::Yellow, false),
                    country
                ));
            }
            output.push_str(&format!(
                "  {}: {}\n",
                self.colorize("Password", Tint::Yellow, false),
                self.colorize(view.password, Tint::Cyan, false)
            ));
            output.push_str(&format!(
                "  {}: {}\n\n",
                self.colorize("Updated", Tint::Yellow, false),
                format_age(view.minutes_ago)
            ));
        }

        output.push_str(&format!("Found {} account(s)\n", records.len()));
        output
    }

    fn format_json(
        &self,
        records: &[AccountRecord],
        context: &RenderContext<'_>,
        now: DateTime<Utc>,
        pretty: bool,
    ) -> Result<String, RenderError> {
        let accounts: Vec<_> = records
            .iter()
            .map(|record| AccountView::new(record, context.regions, now))
            .collect();
        let value = serde_json::json!({
            "status": "ok",
            "promotion_link": context.promotion_link,
            "count": accounts.len(),
            "accounts": accounts,
        });
        let mut output = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        output.push('\n');
        Ok(output)
    }

    #[cfg(feature = "table-output")]
    fn format_table(
        &self,
        records: &[AccountRecord],
        context: &RenderContext<'_>,
        now: DateTime<Utc>,
    ) -> String {
        let rows: Vec<AccountRow> = records
            .iter()
            .map(|record| {
                let view = AccountView::new(record, context.regions, now);
                AccountRow {
                    account: view.username.to_string(),
                    password: view.password.to_string(),
                    region: view.country.unwrap_or("-").to_string(),
                    tag: view.tag.to_string(),
                    updated: format_age(view.minutes_ago),
                }
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        format!("{table}\n")
    }

    pub fn format_locations(&self, locations: &SourceLocations) -> Result<String, RenderError> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(locations)? + "\n"),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(locations)? + "\n"),
            OutputFormat::Pretty | OutputFormat::Table => {
                let mut output = String::new();
                for (title, urls) in [
                    ("Structured sources", &locations.structured),
                    ("Embedded sources", &locations.embedded),
                ] {
                    output.push_str(&self.colorize(title, Tint::Green, true));
                    output.push('\n');
                    for (index, url) in urls.iter().enumerate() {
                        output.push_str(&format!(
                            "  {}. {}\n",
                            index + 1,
                            self.colorize(url, Tint::Blue, false)
                        ));
                    }
                }
                Ok(output)
            }
        }
    }

    pub fn print(&self, text: &str) -> Result<(), RenderError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

impl Renderer for OutputManager {
    fn start(&self) {
        self.spinner.set_message("Fetching accounts...");
        self.spinner.enable_steady_tick(Duration::from_millis(100));
    }

    fn render(
        &self,
        records: &[AccountRecord],
        context: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        let output = self.format_records(records, context, Utc::now())?;
        self.spinner
            .suspend(|| self.print(&output))
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use account_feeds::source::ObservedAt;
    use std::collections::HashMap;

    fn record(user: &str, region: Option<&str>, minutes_ago: i64, now: DateTime<Utc>) -> AccountRecord {
        AccountRecord {
            identifier: user.to_string(),
            secret: "secret".to_string(),
            region_code: region.map(ToOwned::to_owned),
            observed_at: ObservedAt::at(now - chrono::Duration::minutes(minutes_ago)),
            validity_flag: Some(1),
        }
    }

    fn regions() -> RegionMap {
        RegionMap::new(HashMap::from([("美国".to_string(), "us".to_string())]))
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Some(0)), "just now");
        assert_eq!(format_age(Some(12)), "12 min ago");
        assert_eq!(format_age(None), "unknown");
    }

    #[test]
    fn test_pretty_output() {
        let now = Utc::now();
        let regions = regions();
        let context = RenderContext {
            regions: &regions,
            promotion_link: "https://example.com/register?aff=1",
        };
        let records = vec![record("u1", Some("美国"), 5, now), record("u2", None, 1, now)];

        let output = OutputManager::new(OutputFormat::Pretty, false)
            .format_records(&records, &context, now)
            .unwrap();

        assert!(output.starts_with("Register: https://example.com/register?aff=1\n"));
        assert!(output.contains("u1 [us]\n  Region: 美国\n  Password: secret\n  Updated: 5 min ago\n"));
        assert!(output.contains("u2 [un]\n  Password: secret\n  Updated: 1 min ago\n"));
        assert!(output.ends_with("Found 2 account(s)\n"));
    }

    #[test]
    fn test_pretty_output_without_records() {
        let regions = RegionMap::default();
        let context = RenderContext {
            regions: &regions,
            promotion_link: "",
        };
        let output = OutputManager::new(OutputFormat::Pretty, false)
            .format_records(&[], &context, Utc::now())
            .unwrap();
        assert_eq!(output, "No accounts available right now.\n");
    }

    #[test]
    fn test_json_output() {
        let now = Utc::now();
        let regions = regions();
        let context = RenderContext {
            regions: &regions,
            promotion_link: "https://example.com/register?aff=1",
        };
        let records = vec![record("u1", Some("美国"), 3, now)];

        let output = OutputManager::new(OutputFormat::JsonCompact, false)
            .format_records(&records, &context, now)
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["count"], 1);
        assert_eq!(value["accounts"][0]["username"], "u1");
        assert_eq!(value["accounts"][0]["tag"], "us");
        assert_eq!(value["accounts"][0]["minutes_ago"], 3);
    }

    #[test]
    fn test_locations_output() {
        let locations = SourceLocations {
            structured: vec!["https://example.com/api".to_string()],
            embedded: vec![],
        };
        let output = OutputManager::new(OutputFormat::Pretty, false)
            .format_locations(&locations)
            .unwrap();
        assert_eq!(
            output,
            "Structured sources\n  1. https://example.com/api\nEmbedded sources\n"
        );

        let json = OutputManager::new(OutputFormat::JsonCompact, false)
            .format_locations(&locations)
            .unwrap();
        assert_eq!(
            json,
            "{\"structured\":[\"https://example.com/api\"],\"embedded\":[]}\n"
        );
    }
}
