//! Row mapping for billing and CRM records.

use super::{from_json, json, opt_text, string_or_default, text, CachedEntity};
use crate::db::schema::{self, TableDef};
use crate::model::billing::{Invoice, Quote, Rate, TimeEntry};
use crate::model::crm::{Contact, Deal, Interaction};
use rusqlite::types::Value;
use rusqlite::Row;

fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

fn read_flag(row: &Row<'_>, column: &str) -> rusqlite::Result<bool> {
    Ok(row.get::<_, Option<i64>>(column)?.unwrap_or(0) != 0)
}

fn real_or_zero(row: &Row<'_>, column: &str) -> rusqlite::Result<f64> {
    Ok(row.get::<_, Option<f64>>(column)?.unwrap_or(0.0))
}

impl CachedEntity for Rate {
    fn table() -> &'static TableDef {
        &schema::RATES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.name),
            Value::Real(self.hourly_rate),
            opt_text(&self.assignee),
            flag(self.is_default),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Rate {
            id: row.get("id")?,
            name: row.get("name")?,
            hourly_rate: real_or_zero(row, "hourly_rate")?,
            assignee: row.get("assignee")?,
            is_default: read_flag(row, "is_default")?,
        })
    }
}

impl CachedEntity for Quote {
    fn table() -> &'static TableDef {
        &schema::QUOTES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.number),
            opt_text(&self.customer_id),
            text(&self.status),
            opt_text(&self.date),
            opt_text(&self.valid_until),
            json(&self.line_items),
            Value::Real(self.total()),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Quote {
            id: row.get("id")?,
            number: row.get("number")?,
            customer_id: row.get("customer_id")?,
            status: string_or_default(row, "status")?,
            date: row.get("date")?,
            valid_until: row.get("valid_until")?,
            line_items: from_json(row, "line_items")?,
            notes: string_or_default(row, "notes")?,
        })
    }
}

impl CachedEntity for Invoice {
    fn table() -> &'static TableDef {
        &schema::INVOICES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.number),
            opt_text(&self.customer_id),
            opt_text(&self.quote_id),
            text(&self.status),
            opt_text(&self.date),
            opt_text(&self.due_date),
            Value::Real(self.paid_amount),
            json(&self.line_items),
            Value::Real(self.total()),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Invoice {
            id: row.get("id")?,
            number: row.get("number")?,
            customer_id: row.get("customer_id")?,
            quote_id: row.get("quote_id")?,
            status: string_or_default(row, "status")?,
            date: row.get("date")?,
            due_date: row.get("due_date")?,
            paid_amount: real_or_zero(row, "paid_amount")?,
            line_items: from_json(row, "line_items")?,
            notes: string_or_default(row, "notes")?,
        })
    }
}

impl CachedEntity for TimeEntry {
    fn table() -> &'static TableDef {
        &schema::TIME_ENTRIES
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(&self.task_id),
            text(&self.date),
            Value::Real(self.hours),
            opt_text(&self.person),
            text(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TimeEntry {
            id: row.get("id")?,
            task_id: row.get("task_id")?,
            date: string_or_default(row, "date")?,
            hours: real_or_zero(row, "hours")?,
            person: row.get("person")?,
            description: string_or_default(row, "description")?,
        })
    }
}

impl CachedEntity for Contact {
    fn table() -> &'static TableDef {
        &schema::CONTACTS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            opt_text(&self.company_id),
            text(&self.first_name),
            text(&self.last_name),
            text(&self.full_name()),
            opt_text(&self.email),
            opt_text(&self.phone),
            opt_text(&self.title),
            flag(self.is_primary),
            opt_text(&self.created),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Contact {
            id: row.get("id")?,
            company_id: row.get("company_id")?,
            first_name: row.get("first_name")?,
            last_name: string_or_default(row, "last_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            title: row.get("title")?,
            is_primary: read_flag(row, "is_primary")?,
            created: row.get("created")?,
            notes: string_or_default(row, "notes")?,
        })
    }
}

impl CachedEntity for Deal {
    fn table() -> &'static TableDef {
        &schema::DEALS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            opt_text(&self.company_id),
            opt_text(&self.contact_id),
            text(&self.title),
            Value::Real(self.value),
            text(&self.stage),
            Value::Integer(self.probability),
            opt_text(&self.expected_close),
            opt_text(&self.closed_at),
            opt_text(&self.created),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Deal {
            id: row.get("id")?,
            company_id: row.get("company_id")?,
            contact_id: row.get("contact_id")?,
            title: row.get("title")?,
            value: real_or_zero(row, "value")?,
            stage: string_or_default(row, "stage")?,
            probability: row.get::<_, Option<i64>>("probability")?.unwrap_or(0),
            expected_close: row.get("expected_close")?,
            closed_at: row.get("closed_at")?,
            created: row.get("created")?,
            notes: string_or_default(row, "notes")?,
        })
    }
}

impl CachedEntity for Interaction {
    fn table() -> &'static TableDef {
        &schema::INTERACTIONS
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            opt_text(&self.company_id),
            opt_text(&self.contact_id),
            opt_text(&self.deal_id),
            text(&self.interaction_type),
            text(&self.summary),
            opt_text(&self.date),
            self.duration.map(Value::Integer).unwrap_or(Value::Null),
            opt_text(&self.next_follow_up),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Interaction {
            id: row.get("id")?,
            company_id: row.get("company_id")?,
            contact_id: row.get("contact_id")?,
            deal_id: row.get("deal_id")?,
            interaction_type: string_or_default(row, "type")?,
            summary: row.get("summary")?,
            date: row.get("date")?,
            duration: row.get("duration")?,
            next_follow_up: row.get("next_follow_up")?,
            notes: string_or_default(row, "notes")?,
        })
    }
}
