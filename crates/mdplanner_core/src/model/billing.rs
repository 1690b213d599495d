//! Billing records: hourly rates, quotes, invoices and time entries.
//!
//! # Invariants
//! - Totals are derived from line items and never stored in the document.

use super::EntityKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: String,
    pub name: String,
    pub hourly_rate: f64,
    pub assignee: Option<String>,
    pub is_default: bool,
}

impl Rate {
    pub fn new(name: impl Into<String>, hourly_rate: f64) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            hourly_rate,
            assignee: None,
            is_default: false,
        }
    }
}

record_entity!(Rate, RatePatch, EntityKind::Rate, {
    name: String,
    hourly_rate: f64,
    assignee: Option<String>,
    is_default: bool,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.quantity * self.rate
    }
}

fn sum(items: &[LineItem]) -> f64 {
    items.iter().map(LineItem::amount).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub number: String,
    pub customer_id: Option<String>,
    /// `draft`, `sent`, `accepted` or `rejected`.
    pub status: String,
    pub date: Option<String>,
    pub valid_until: Option<String>,
    pub line_items: Vec<LineItem>,
    pub notes: String,
}

impl Quote {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            number: number.into(),
            customer_id: None,
            status: "draft".to_string(),
            date: None,
            valid_until: None,
            line_items: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn total(&self) -> f64 {
        sum(&self.line_items)
    }
}

record_entity!(Quote, QuotePatch, EntityKind::Quote, {
    number: String,
    customer_id: Option<String>,
    status: String,
    date: Option<String>,
    valid_until: Option<String>,
    line_items: Vec<LineItem>,
    notes: String,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub customer_id: Option<String>,
    pub quote_id: Option<String>,
    /// `draft`, `sent`, `paid`, `overdue` or `cancelled`.
    pub status: String,
    pub date: Option<String>,
    pub due_date: Option<String>,
    pub paid_amount: f64,
    pub line_items: Vec<LineItem>,
    pub notes: String,
}

impl Invoice {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            number: number.into(),
            customer_id: None,
            quote_id: None,
            status: "draft".to_string(),
            date: None,
            due_date: None,
            paid_amount: 0.0,
            line_items: Vec::new(),
            notes: String::new(),
        }
    }

    /// Invoice built from an accepted quote.
    pub fn from_quote(number: impl Into<String>, quote: &Quote) -> Self {
        let mut invoice = Invoice::new(number);
        invoice.customer_id = quote.customer_id.clone();
        invoice.quote_id = Some(quote.id.clone());
        invoice.line_items = quote.line_items.clone();
        invoice
    }

    pub fn total(&self) -> f64 {
        sum(&self.line_items)
    }

    pub fn balance(&self) -> f64 {
        self.total() - self.paid_amount
    }
}

record_entity!(Invoice, InvoicePatch, EntityKind::Invoice, {
    number: String,
    customer_id: Option<String>,
    quote_id: Option<String>,
    status: String,
    date: Option<String>,
    due_date: Option<String>,
    paid_amount: f64,
    line_items: Vec<LineItem>,
    notes: String,
});

/// Hours logged against a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub task_id: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub hours: f64,
    pub person: Option<String>,
    pub description: String,
}

impl TimeEntry {
    pub fn new(task_id: impl Into<String>, date: impl Into<String>, hours: f64) -> Self {
        Self {
            id: String::new(),
            task_id: task_id.into(),
            date: date.into(),
            hours,
            person: None,
            description: String::new(),
        }
    }
}

record_entity!(TimeEntry, TimeEntryPatch, EntityKind::TimeEntry, {
    task_id: String,
    date: String,
    hours: f64,
    person: Option<String>,
    description: String,
});

/// Total hours logged per task, in first-seen order.
pub fn hours_by_task(entries: &[TimeEntry]) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for entry in entries {
        match totals.iter_mut().find(|(task, _)| *task == entry.task_id) {
            Some((_, hours)) => *hours += entry.hours,
            None => totals.push((entry.task_id.clone(), entry.hours)),
        }
    }
    totals
}
