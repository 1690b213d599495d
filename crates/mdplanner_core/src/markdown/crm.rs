//! Codecs for contacts, deals and interactions.

use super::attrs::AttrWriter;
use super::records::{parse_bool, parse_f64, parse_i64, RawRecord, RecordCodec};
use crate::model::crm::{Contact, Deal, Interaction};

record_section!(Contact, "Contacts");
record_section!(Deal, "Deals");
record_section!(Interaction, "Interactions");

impl RecordCodec for Contact {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let name = record.title.trim();
        let (first, last) = match record.attr("first") {
            Some(first) => (first, name.strip_prefix(first).unwrap_or(name).trim()),
            None => name.split_once(' ').unwrap_or((name, "")),
        };
        let mut contact = Contact::new(first.trim(), last.trim());
        contact.company_id = record.attr_string("company");
        contact.is_primary = parse_bool(record.attr("primary"));
        contact.email = record.attr_string("email");
        contact.phone = record.attr_string("phone");
        contact.title = record.attr_string("title");
        contact.created = record.attr_string("created");
        contact.notes = record.body_text();
        contact
    }

    fn title(&self) -> String {
        self.full_name()
    }

    fn attrs(&self) -> AttrWriter {
        // A first name with spaces cannot be recovered by splitting the heading.
        let first = self
            .first_name
            .contains(char::is_whitespace)
            .then_some(self.first_name.as_str());
        let writer = AttrWriter::new()
            .opt("first", first)
            .opt("company", self.company_id.as_deref());
        let writer = if self.is_primary {
            writer.field("primary", "true")
        } else {
            writer
        };
        writer
            .opt("email", self.email.as_deref())
            .opt("phone", self.phone.as_deref())
            .opt("title", self.title.as_deref())
            .opt("created", self.created.as_deref())
    }

    fn body(&self) -> String {
        self.notes.clone()
    }
}

impl RecordCodec for Deal {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut deal = Deal::new(record.title);
        deal.company_id = record.attr_string("company");
        deal.contact_id = record.attr_string("contact");
        if let Some(stage) = record.attr_string("stage") {
            deal.stage = stage;
        }
        deal.value = parse_f64(record.attr("value")).unwrap_or(0.0);
        deal.probability = parse_i64(record.attr("probability")).unwrap_or(0);
        deal.expected_close = record.attr_string("expected_close");
        deal.closed_at = record.attr_string("closed_at");
        deal.created = record.attr_string("created");
        deal.notes = record.body_text();
        deal
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .opt("company", self.company_id.as_deref())
            .opt("contact", self.contact_id.as_deref())
            .field("stage", &self.stage)
            .field("value", self.value.to_string())
            .field("probability", self.probability.to_string())
            .opt("expected_close", self.expected_close.as_deref())
            .opt("closed_at", self.closed_at.as_deref())
            .opt("created", self.created.as_deref())
    }

    fn body(&self) -> String {
        self.notes.clone()
    }
}

impl RecordCodec for Interaction {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut interaction =
            Interaction::new(record.title, record.attr("type").unwrap_or("note"));
        interaction.company_id = record.attr_string("company");
        interaction.contact_id = record.attr_string("contact");
        interaction.deal_id = record.attr_string("deal");
        interaction.date = record.attr_string("date");
        interaction.duration = parse_i64(record.attr("duration"));
        interaction.next_follow_up = record.attr_string("follow_up");
        interaction.notes = record.body_text();
        interaction
    }

    fn title(&self) -> String {
        self.summary.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .opt("company", self.company_id.as_deref())
            .opt("contact", self.contact_id.as_deref())
            .opt("deal", self.deal_id.as_deref())
            .field("type", &self.interaction_type)
            .opt("date", self.date.as_deref())
            .opt("duration", self.duration.map(|d| d.to_string()))
            .opt("follow_up", self.next_follow_up.as_deref())
    }

    fn body(&self) -> String {
        self.notes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::lexer::tokenize;
    use crate::markdown::records::{decode_records, encode_records};
    use crate::markdown::section::SourceDocument;

    #[test]
    fn contact_names_split_at_first_space() {
        let contacts: Vec<Contact> = decode_records(&tokenize(
            "## Ann van Dijk {company: company_2; primary: true; email: ann@example.com}\n<!-- id: contact_1 -->\nMet at the fair.\n",
        ));
        assert_eq!(contacts[0].first_name, "Ann");
        assert_eq!(contacts[0].last_name, "van Dijk");
        assert!(contacts[0].is_primary);
        assert_eq!(contacts[0].notes, "Met at the fair.");
    }

    #[test]
    fn multi_word_first_names_survive() {
        let mut contact = Contact::new("Mary Ann", "Lee");
        contact.id = "contact_3".to_string();
        let encoded = encode_records("Contacts", std::slice::from_ref(&contact));
        let doc = SourceDocument::parse(&encoded);
        let decoded: Vec<Contact> = decode_records(doc.section_body("Contacts"));
        assert_eq!(decoded, vec![contact]);
    }

    #[test]
    fn deal_and_interaction_attrs() {
        let deals: Vec<Deal> = decode_records(&tokenize(
            "## Renewal {company: company_1; stage: proposal; value: 12000; probability: 60}\n<!-- id: deal_1 -->\n",
        ));
        assert_eq!(deals[0].stage, "proposal");
        assert_eq!(deals[0].weighted_value(), 7200.0);

        let interactions: Vec<Interaction> = decode_records(&tokenize(
            "## Kickoff call {deal: deal_1; type: call; duration: 30}\n<!-- id: interaction_1 -->\n",
        ));
        assert_eq!(interactions[0].interaction_type, "call");
        assert_eq!(interactions[0].duration, Some(30));
        assert_eq!(interactions[0].deal_id.as_deref(), Some("deal_1"));
    }
}
