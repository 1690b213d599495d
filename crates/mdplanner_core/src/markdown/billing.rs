//! Codecs for rates, quotes, invoices and the time tracking log.
//!
//! Quotes and invoices keep line items as attributed bullets:
//!
//! ```text
//! ## Q-2026-001 {customer: customer_1; status: sent}
//!
//! <!-- id: quote_1 -->
//! ### Line Items
//!
//! - Design work {qty: 2; rate: 100}
//!
//! ### Notes
//!
//! Net 30.
//! ```
//!
//! The time log groups entries under one `## <task id>` heading each:
//!
//! ```text
//! ## 4
//!
//! - 2026-01-05: 2.5h by Ann - Fixed login {id: time_entry_1}
//! ```

use super::attrs::{lookup, AttrWriter};
use super::lexer::{Line, LineKind};
use super::records::{
    attr_bullet, bullet_attrs, bullets_under, parse_bool, parse_f64, subsections, text_under,
    RawRecord, RecordCodec,
};
use super::{section_header, SectionCodec};
use crate::model::billing::{Invoice, LineItem, Quote, Rate, TimeEntry};
use crate::model::fill_missing_ids;

record_section!(Rate, "Billing Rates");
record_section!(Quote, "Quotes");
record_section!(Invoice, "Invoices");

impl RecordCodec for Rate {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut rate = Rate::new(record.title, parse_f64(record.attr("rate")).unwrap_or(0.0));
        rate.assignee = record.attr_string("assignee");
        rate.is_default = parse_bool(record.attr("default"));
        rate
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn attrs(&self) -> AttrWriter {
        let writer = AttrWriter::new()
            .field("rate", self.hourly_rate.to_string())
            .opt("assignee", self.assignee.as_deref());
        if self.is_default {
            writer.field("default", "true")
        } else {
            writer
        }
    }

    fn body(&self) -> String {
        String::new()
    }
}

fn read_line_items(record: &RawRecord<'_>) -> (Vec<LineItem>, String) {
    let parts = subsections(&record.body);
    let items = bullets_under(&parts, "Line Items")
        .iter()
        .map(|item| {
            let (description, attrs) = bullet_attrs(item);
            LineItem {
                description: description.to_string(),
                quantity: parse_f64(lookup(&attrs, "qty")).unwrap_or(1.0),
                rate: parse_f64(lookup(&attrs, "rate")).unwrap_or(0.0),
            }
        })
        .collect();
    let mut notes = text_under(&parts, Some("Notes"));
    if notes.is_empty() {
        notes = text_under(&parts, None);
    }
    (items, notes)
}

fn render_line_items(items: &[LineItem], notes: &str) -> String {
    let mut out = String::new();
    if !items.is_empty() {
        out.push_str("### Line Items\n\n");
        for item in items {
            let attrs = AttrWriter::new()
                .field("qty", item.quantity.to_string())
                .field("rate", item.rate.to_string());
            out.push_str(&attr_bullet("", &item.description, attrs));
        }
        out.push('\n');
    }
    if !notes.trim().is_empty() {
        out.push_str(&format!("### Notes\n\n{}\n", notes.trim()));
    }
    out
}

impl RecordCodec for Quote {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut quote = Quote::new(record.title);
        quote.customer_id = record.attr_string("customer");
        if let Some(status) = record.attr_string("status") {
            quote.status = status;
        }
        quote.date = record.attr_string("date");
        quote.valid_until = record.attr_string("valid_until");
        (quote.line_items, quote.notes) = read_line_items(record);
        quote
    }

    fn title(&self) -> String {
        self.number.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .opt("customer", self.customer_id.as_deref())
            .field("status", &self.status)
            .opt("date", self.date.as_deref())
            .opt("valid_until", self.valid_until.as_deref())
    }

    fn body(&self) -> String {
        render_line_items(&self.line_items, &self.notes)
    }
}

impl RecordCodec for Invoice {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut invoice = Invoice::new(record.title);
        invoice.customer_id = record.attr_string("customer");
        invoice.quote_id = record.attr_string("quote");
        if let Some(status) = record.attr_string("status") {
            invoice.status = status;
        }
        invoice.date = record.attr_string("date");
        invoice.due_date = record.attr_string("due");
        invoice.paid_amount = parse_f64(record.attr("paid")).unwrap_or(0.0);
        (invoice.line_items, invoice.notes) = read_line_items(record);
        invoice
    }

    fn title(&self) -> String {
        self.number.clone()
    }

    fn attrs(&self) -> AttrWriter {
        let writer = AttrWriter::new()
            .opt("customer", self.customer_id.as_deref())
            .opt("quote", self.quote_id.as_deref())
            .field("status", &self.status)
            .opt("date", self.date.as_deref())
            .opt("due", self.due_date.as_deref());
        if self.paid_amount != 0.0 {
            writer.field("paid", self.paid_amount.to_string())
        } else {
            writer
        }
    }

    fn body(&self) -> String {
        render_line_items(&self.line_items, &self.notes)
    }
}

/// Parses `date: Nh [by person] [- description]`.
fn parse_entry(task_id: &str, item: &str) -> Option<TimeEntry> {
    let (text, attrs) = bullet_attrs(item);
    let (date, rest) = text.split_once(':')?;
    let (hours, rest) = rest.trim_start().split_once('h')?;
    let mut entry = TimeEntry::new(task_id, date.trim(), hours.trim().parse().ok()?);
    entry.id = lookup(&attrs, "id").unwrap_or_default().to_string();
    let rest = rest.trim();
    let rest = match rest.strip_prefix("by ") {
        Some(after) => {
            let (person, description) = after.split_once(" - ").unwrap_or((after, ""));
            entry.person = Some(person.trim().to_string()).filter(|p| !p.is_empty());
            description
        }
        None => rest.strip_prefix('-').unwrap_or(rest),
    };
    entry.description = rest.trim().to_string();
    Some(entry)
}

fn render_entry(entry: &TimeEntry) -> String {
    let mut text = format!("{}: {}h", entry.date, entry.hours);
    if let Some(person) = &entry.person {
        text.push_str(&format!(" by {person}"));
    }
    if !entry.description.is_empty() {
        text.push_str(&format!(" - {}", entry.description));
    }
    attr_bullet("", &text, AttrWriter::new().field("id", &entry.id))
}

impl SectionCodec for TimeEntry {
    const SECTION: &'static str = "Time Tracking";

    fn decode(body: &[Line<'_>]) -> Vec<Self> {
        let mut entries = Vec::new();
        let mut task_id: Option<&str> = None;
        for line in body {
            match line.kind {
                LineKind::Heading { level: 2, text } => task_id = Some(text),
                LineKind::Bullet(item) => {
                    let parsed = task_id.and_then(|task| parse_entry(task, item));
                    match parsed {
                        Some(entry) => entries.push(entry),
                        None => log::debug!(
                            "event=md_decode module=markdown status=skipped kind=time_entry line={}",
                            line.text()
                        ),
                    }
                }
                _ => {}
            }
        }
        fill_missing_ids(&mut entries);
        entries
    }

    fn encode(items: &[Self], _existing: &[Line<'_>]) -> String {
        let mut tasks: Vec<&str> = Vec::new();
        for entry in items {
            if !tasks.contains(&entry.task_id.as_str()) {
                tasks.push(&entry.task_id);
            }
        }
        let mut out = section_header(Self::SECTION);
        for task in tasks {
            out.push_str(&format!("## {task}\n\n"));
            for entry in items.iter().filter(|entry| entry.task_id == task) {
                out.push_str(&render_entry(entry));
            }
            out.push('\n');
        }
        out
    }
}
