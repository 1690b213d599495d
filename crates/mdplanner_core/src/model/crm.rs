//! CRM records linked to companies: contacts, deals and interactions.

use super::EntityKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub company_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Job title.
    pub title: Option<String>,
    pub is_primary: bool,
    pub created: Option<String>,
    pub notes: String,
}

impl Contact {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            company_id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            title: None,
            is_primary: false,
            created: None,
            notes: String::new(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

record_entity!(Contact, ContactPatch, EntityKind::Contact, {
    company_id: Option<String>,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    title: Option<String>,
    is_primary: bool,
    created: Option<String>,
    notes: String,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub company_id: Option<String>,
    pub contact_id: Option<String>,
    pub title: String,
    pub value: f64,
    /// `lead`, `qualified`, `proposal`, `negotiation`, `won` or `lost`.
    pub stage: String,
    /// Percent, 0 to 100.
    pub probability: i64,
    pub expected_close: Option<String>,
    pub closed_at: Option<String>,
    pub created: Option<String>,
    pub notes: String,
}

impl Deal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            company_id: None,
            contact_id: None,
            title: title.into(),
            value: 0.0,
            stage: "lead".to_string(),
            probability: 0,
            expected_close: None,
            closed_at: None,
            created: None,
            notes: String::new(),
        }
    }

    /// Value weighted by win probability.
    pub fn weighted_value(&self) -> f64 {
        self.value * self.probability.clamp(0, 100) as f64 / 100.0
    }
}

record_entity!(Deal, DealPatch, EntityKind::Deal, {
    company_id: Option<String>,
    contact_id: Option<String>,
    title: String,
    value: f64,
    stage: String,
    probability: i64,
    expected_close: Option<String>,
    closed_at: Option<String>,
    created: Option<String>,
    notes: String,
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub company_id: Option<String>,
    pub contact_id: Option<String>,
    pub deal_id: Option<String>,
    /// `email`, `call`, `meeting` or `note`.
    pub interaction_type: String,
    pub summary: String,
    pub date: Option<String>,
    /// Minutes.
    pub duration: Option<i64>,
    pub next_follow_up: Option<String>,
    pub notes: String,
}

impl Interaction {
    pub fn new(summary: impl Into<String>, interaction_type: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            company_id: None,
            contact_id: None,
            deal_id: None,
            interaction_type: interaction_type.into(),
            summary: summary.into(),
            date: None,
            duration: None,
            next_follow_up: None,
            notes: String::new(),
        }
    }
}

record_entity!(Interaction, InteractionPatch, EntityKind::Interaction, {
    company_id: Option<String>,
    contact_id: Option<String>,
    deal_id: Option<String>,
    interaction_type: String,
    summary: String,
    date: Option<String>,
    duration: Option<i64>,
    next_follow_up: Option<String>,
    notes: String,
});
