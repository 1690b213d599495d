//! Codecs for sections made of `## Title {attrs}` records.
//!
//! ```text
//! ## Title {key: value; key: value}
//!
//! <!-- id: goal_1 -->
//! Body text
//! ```

use super::attrs::{
    lookup, parse_attrs, parse_list, parse_object, render_object, split_trailing_attrs,
    AttrWriter,
};
use super::lexer::{Line, LineKind};
use super::{ids::comment_id, section_header};
use crate::model::records::{
    C4Component, C4Connection, Company, Customer, Goal, Idea, Milestone, Mindmap, MindmapNode,
    Position, Retrospective, Size, StickyNote,
};
use crate::model::{fill_missing_ids, Entity};

/// One `##` block before entity-specific interpretation.
#[derive(Debug, Clone)]
pub struct RawRecord<'a> {
    pub title: &'a str,
    pub attrs: Vec<(String, String)>,
    pub id: Option<String>,
    /// Lines after the heading, id comment removed, blank edges trimmed.
    pub body: Vec<Line<'a>>,
}

impl<'a> RawRecord<'a> {
    pub fn attr(&self, key: &str) -> Option<&str> {
        lookup(&self.attrs, key)
    }

    pub fn attr_string(&self, key: &str) -> Option<String> {
        self.attr(key).map(str::to_string)
    }

    pub fn body_text(&self) -> String {
        self.body
            .iter()
            .map(|line| line.raw)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

pub fn read_records<'a>(body: &[Line<'a>]) -> Vec<RawRecord<'a>> {
    let mut records: Vec<RawRecord<'a>> = Vec::new();
    for line in body {
        if let Some(heading) = line.heading(2) {
            let (title, attrs) = split_trailing_attrs(heading);
            records.push(RawRecord {
                title,
                attrs: attrs.map(parse_attrs).unwrap_or_default(),
                id: None,
                body: Vec::new(),
            });
            continue;
        }
        let Some(record) = records.last_mut() else {
            continue;
        };
        if record.id.is_none() {
            if let LineKind::Comment(inner) = line.kind {
                if let Some(id) = comment_id(inner) {
                    record.id = Some(id.to_string());
                    continue;
                }
            }
        }
        record.body.push(*line);
    }
    for record in &mut records {
        let start = record
            .body
            .iter()
            .position(|line| !line.is_blank())
            .unwrap_or(record.body.len());
        let end = record
            .body
            .iter()
            .rposition(|line| !line.is_blank())
            .map(|idx| idx + 1)
            .unwrap_or(start);
        record.body = record.body[start..end.max(start)].to_vec();
    }
    records
}

/// Record-shaped entity: a heading, an attribute block and a body.
pub trait RecordCodec: Entity {
    fn from_record(record: &RawRecord<'_>) -> Self;
    fn title(&self) -> String;
    fn attrs(&self) -> AttrWriter;
    fn body(&self) -> String;
}

pub fn decode_records<E: RecordCodec>(body: &[Line<'_>]) -> Vec<E> {
    let mut items: Vec<E> = read_records(body)
        .iter()
        .map(|record| {
            let mut item = E::from_record(record);
            item.set_id(record.id.clone().unwrap_or_default());
            item
        })
        .collect();
    fill_missing_ids(&mut items);
    items
}

pub fn encode_records<E: RecordCodec>(section: &str, items: &[E]) -> String {
    let mut out = section_header(section);
    for item in items {
        let title = item.title();
        out.push_str(&format!(
            "## {}{}\n\n<!-- id: {} -->\n",
            title,
            item.attrs().render_suffix_after(&title),
            item.id()
        ));
        let body = item.body();
        let body = body.trim();
        if !body.is_empty() {
            out.push_str(body);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

record_section!(Goal, "Goals");
record_section!(Milestone, "Milestones");
record_section!(Idea, "Ideas");
record_section!(Retrospective, "Retrospectives");
record_section!(StickyNote, "Canvas");
record_section!(Mindmap, "Mindmap");
record_section!(C4Component, "C4 Architecture");
record_section!(Customer, "Customers");
record_section!(Company, "Companies");

/// Lines of a record body grouped by `###` heading; leading lines carry
/// no heading.
#[derive(Debug, Clone)]
pub struct Subsection<'a> {
    pub heading: Option<&'a str>,
    pub lines: Vec<Line<'a>>,
}

impl<'a> Subsection<'a> {
    pub fn bullets(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| match line.kind {
                LineKind::Bullet(item) => Some(item.to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.raw)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

pub fn subsections<'a>(body: &[Line<'a>]) -> Vec<Subsection<'a>> {
    let mut parts = vec![Subsection {
        heading: None,
        lines: Vec::new(),
    }];
    for line in body {
        match line.heading(3) {
            Some(heading) => parts.push(Subsection {
                heading: Some(heading),
                lines: Vec::new(),
            }),
            None => {
                if let Some(part) = parts.last_mut() {
                    part.lines.push(*line);
                }
            }
        }
    }
    parts
}

/// Bullets of every subsection titled `heading`.
pub fn bullets_under(parts: &[Subsection<'_>], heading: &str) -> Vec<String> {
    parts
        .iter()
        .filter(|part| part.heading == Some(heading))
        .flat_map(Subsection::bullets)
        .collect()
}

/// Free text of the subsection titled `heading`.
pub fn text_under(parts: &[Subsection<'_>], heading: Option<&str>) -> String {
    parts
        .iter()
        .filter(|part| part.heading == heading)
        .map(Subsection::text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Renders `### Heading` bullet lists; headings of empty lists are kept.
pub fn render_lists(lists: &[(&str, &Vec<String>)]) -> String {
    let mut out = String::new();
    for (heading, items) in lists {
        out.push_str(&format!("### {heading}\n\n"));
        for item in items.iter() {
            out.push_str(&format!("- {item}\n"));
        }
        if !items.is_empty() {
            out.push('\n');
        }
    }
    out
}

/// Splits `- text {attrs}` bullet text into its text and attributes.
pub(crate) fn bullet_attrs(item: &str) -> (&str, Vec<(String, String)>) {
    let (text, attrs) = split_trailing_attrs(item);
    (text, attrs.map(parse_attrs).unwrap_or_default())
}

/// Renders one `- text {attrs}` bullet line.
pub(crate) fn attr_bullet(indent: &str, text: &str, attrs: AttrWriter) -> String {
    format!("{indent}- {text}{}\n", attrs.render_suffix_after(text))
}

/// Numbers empty ids as `prefix_N` above the highest existing suffix.
pub(crate) fn fill_local_ids(ids: Vec<&mut String>, prefix: &str) {
    let mut next = ids
        .iter()
        .filter_map(|id| {
            id.strip_prefix(prefix)?
                .strip_prefix('_')?
                .parse::<u64>()
                .ok()
        })
        .max()
        .unwrap_or(0);
    for id in ids {
        if id.trim().is_empty() {
            next += 1;
            *id = format!("{prefix}_{next}");
        }
    }
}

pub(crate) fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

pub(crate) fn parse_bool(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true" | "yes"))
}

pub(crate) fn parse_i64(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<f64>().ok()).map(|v| v.round() as i64)
}

fn parse_position(value: Option<&str>) -> Position {
    let fields = value.map(parse_object).unwrap_or_default();
    Position {
        x: parse_i64(lookup(&fields, "x")).unwrap_or(0),
        y: parse_i64(lookup(&fields, "y")).unwrap_or(0),
    }
}

fn render_position(position: Position) -> String {
    render_object(&[("x", position.x.to_string()), ("y", position.y.to_string())])
}

impl RecordCodec for Goal {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut goal = Goal::new(record.title);
        goal.description = record.body_text();
        if let Some(kind) = record.attr_string("type") {
            goal.goal_type = kind;
        }
        goal.kpi = record.attr_string("kpi");
        goal.start_date = record.attr_string("start");
        goal.end_date = record.attr_string("end");
        if let Some(status) = record.attr_string("status") {
            goal.status = status;
        }
        goal
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .field("type", &self.goal_type)
            .opt("kpi", self.kpi.as_deref())
            .opt("start", self.start_date.as_deref())
            .opt("end", self.end_date.as_deref())
            .field("status", &self.status)
    }

    fn body(&self) -> String {
        self.description.clone()
    }
}

impl RecordCodec for Milestone {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut milestone = Milestone::new(record.title);
        milestone.target = record.attr_string("target");
        if let Some(status) = record.attr_string("status") {
            milestone.status = status;
        }
        milestone.description = record.body_text();
        milestone
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .opt("target", self.target.as_deref())
            .field("status", &self.status)
    }

    fn body(&self) -> String {
        self.description.clone()
    }
}

impl RecordCodec for Idea {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut idea = Idea::new(record.title);
        if let Some(status) = record.attr_string("status") {
            idea.status = status;
        }
        idea.category = record.attr_string("category");
        idea.created = record.attr_string("created");
        idea.links = record.attr("links").map(parse_list).unwrap_or_default();
        idea.description = record.body_text();
        idea
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .field("status", &self.status)
            .opt("category", self.category.as_deref())
            .opt("created", self.created.as_deref())
            .list("links", &self.links)
    }

    fn body(&self) -> String {
        self.description.clone()
    }
}

impl RecordCodec for Retrospective {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut retro = Retrospective::new(record.title);
        retro.date = record.attr_string("date");
        if let Some(status) = record.attr_string("status") {
            retro.status = status;
        }
        let parts = subsections(&record.body);
        retro.continue_items = bullets_under(&parts, "Continue");
        retro.stop_items = bullets_under(&parts, "Stop");
        retro.start_items = bullets_under(&parts, "Start");
        retro
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .opt("date", self.date.as_deref())
            .field("status", &self.status)
    }

    fn body(&self) -> String {
        render_lists(&[
            ("Continue", &self.continue_items),
            ("Stop", &self.stop_items),
            ("Start", &self.start_items),
        ])
    }
}

impl RecordCodec for StickyNote {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let body = record.body_text();
        let content = if body.is_empty() && record.title != "Sticky note" {
            record.title.to_string()
        } else {
            body
        };
        let mut note = StickyNote::new(content);
        if let Some(color) = record.attr_string("color") {
            note.color = color;
        }
        note.position = parse_position(record.attr("position"));
        note.size = record.attr("size").map(|raw| {
            let fields = parse_object(raw);
            Size {
                width: parse_i64(lookup(&fields, "width")).unwrap_or(0),
                height: parse_i64(lookup(&fields, "height")).unwrap_or(0),
            }
        });
        note
    }

    fn title(&self) -> String {
        "Sticky note".to_string()
    }

    fn attrs(&self) -> AttrWriter {
        let writer = AttrWriter::new()
            .field("color", &self.color)
            .raw("position", render_position(self.position));
        match self.size {
            Some(size) => writer.object(
                "size",
                &[
                    ("width", size.width.to_string()),
                    ("height", size.height.to_string()),
                ],
            ),
            None => writer,
        }
    }

    fn body(&self) -> String {
        self.content.clone()
    }
}

impl RecordCodec for Mindmap {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut map = Mindmap::new(record.title);
        let id = record.id.clone().unwrap_or_default();
        // (indent, node index) of the open ancestors
        let mut stack: Vec<(usize, usize)> = Vec::new();
        for line in &record.body {
            let LineKind::Bullet(text) = line.kind else {
                continue;
            };
            while stack.last().is_some_and(|(indent, _)| *indent >= line.indent) {
                stack.pop();
            }
            let index = map.nodes.len();
            map.nodes.push(MindmapNode {
                id: Mindmap::node_id(&id, index),
                text: text.to_string(),
                level: stack.len(),
                parent: stack.last().map(|(_, parent)| Mindmap::node_id(&id, *parent)),
            });
            stack.push((line.indent, index));
        }
        map
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
    }

    fn body(&self) -> String {
        let mut out = String::new();
        for node in self.nodes.iter().filter(|node| node.parent.is_none()) {
            render_mindmap_node(&mut out, &self.nodes, node, 0);
        }
        out
    }
}

fn render_mindmap_node(out: &mut String, nodes: &[MindmapNode], node: &MindmapNode, depth: usize) {
    out.push_str(&format!("{}- {}\n", "  ".repeat(depth), node.text));
    for child in nodes
        .iter()
        .filter(|child| child.parent.as_deref() == Some(node.id.as_str()))
    {
        render_mindmap_node(out, nodes, child, depth + 1);
    }
}

impl RecordCodec for C4Component {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut component =
            C4Component::new(record.title, record.attr("level").unwrap_or("context"));
        if let Some(kind) = record.attr_string("type") {
            component.component_type = kind;
        }
        component.technology = record.attr_string("technology");
        component.description = record.body_text();
        component.position = parse_position(record.attr("position"));
        component.connections = record
            .attr("connections")
            .map(parse_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| {
                let fields = parse_object(raw);
                Some(C4Connection {
                    target: lookup(&fields, "target")?.to_string(),
                    label: lookup(&fields, "label").unwrap_or_default().to_string(),
                })
            })
            .collect();
        component.children = record.attr("children").map(parse_list).unwrap_or_default();
        component.parent = record.attr_string("parent");
        component
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn attrs(&self) -> AttrWriter {
        let connections: Vec<String> = self
            .connections
            .iter()
            .map(|c| render_object(&[("target", c.target.clone()), ("label", c.label.clone())]))
            .collect();
        AttrWriter::new()
            .field("level", &self.level)
            .field("type", &self.component_type)
            .opt("technology", self.technology.as_deref())
            .raw("position", render_position(self.position))
            .raw_list("connections", &connections)
            .list("children", &self.children)
            .opt("parent", self.parent.as_deref())
    }

    fn body(&self) -> String {
        self.description.clone()
    }
}

impl RecordCodec for Customer {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut customer = Customer::new(record.title);
        customer.email = record.attr_string("email");
        customer.phone = record.attr_string("phone");
        customer.address = record.attr_string("address");
        customer.notes = record.body_text();
        customer
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .opt("email", self.email.as_deref())
            .opt("phone", self.phone.as_deref())
            .opt("address", self.address.as_deref())
    }

    fn body(&self) -> String {
        self.notes.clone()
    }
}

impl RecordCodec for Company {
    fn from_record(record: &RawRecord<'_>) -> Self {
        let mut company = Company::new(record.title);
        company.industry = record.attr_string("industry");
        company.website = record.attr_string("website");
        company.phone = record.attr_string("phone");
        company.address = record.attr_string("address");
        company.created = record.attr_string("created");
        company.notes = record.body_text();
        company
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn attrs(&self) -> AttrWriter {
        AttrWriter::new()
            .opt("industry", self.industry.as_deref())
            .opt("website", self.website.as_deref())
            .opt("phone", self.phone.as_deref())
            .opt("address", self.address.as_deref())
            .opt("created", self.created.as_deref())
    }

    fn body(&self) -> String {
        self.notes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::lexer::tokenize;

    #[test]
    fn sticky_note_keeps_nested_position() {
        let body = tokenize(
            "## Sticky note {color: pink; position: {x: 10, y: 20}; size: {width: 200, height: 150}}\n\n<!-- id: sticky_1 -->\nRemember\n",
        );
        let notes: Vec<StickyNote> = decode_records(&body);
        assert_eq!(notes[0].color, "pink");
        assert_eq!(notes[0].position, Position { x: 10, y: 20 });
        assert_eq!(notes[0].size, Some(Size { width: 200, height: 150 }));
        assert_eq!(notes[0].content, "Remember");
    }

    #[test]
    fn mindmap_levels_follow_indentation() {
        let body = tokenize("## Plan\n\n<!-- id: mindmap_1 -->\n- Root\n  - Child\n    - Leaf\n  - Sibling\n");
        let maps: Vec<Mindmap> = decode_records(&body);
        let nodes = &maps[0].nodes;
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[2].level, 2);
        assert_eq!(nodes[2].parent.as_deref(), Some("mindmap_1_node_2"));
        assert_eq!(nodes[3].parent.as_deref(), Some("mindmap_1_node_1"));
        let rendered = maps[0].body();
        assert_eq!(rendered, "- Root\n  - Child\n    - Leaf\n  - Sibling\n");
    }

    #[test]
    fn c4_connections_parse_as_objects() {
        let body = tokenize(
            "## API {level: container; type: service; position: {x: 1, y: 2}; connections: [{target: c4_component_2, label: reads}]}\n<!-- id: c4_component_1 -->\n",
        );
        let components: Vec<C4Component> = decode_records(&body);
        assert_eq!(components[0].connections[0].target, "c4_component_2");
        assert_eq!(components[0].connections[0].label, "reads");
        assert_eq!(components[0].position, Position { x: 1, y: 2 });
    }

    #[test]
    fn retrospective_lists_round_trip() {
        let mut retro = Retrospective::new("Sprint 1");
        retro.id = "retro_1".to_string();
        retro.continue_items = vec!["pairing".to_string()];
        retro.start_items = vec!["demos".to_string()];
        let encoded = encode_records("Retrospectives", std::slice::from_ref(&retro));
        let doc = crate::markdown::section::SourceDocument::parse(&encoded);
        let decoded: Vec<Retrospective> = decode_records(doc.section_body("Retrospectives"));
        assert_eq!(decoded, vec![retro]);
    }

    #[test]
    fn goal_attrs_and_body() {
        let body = tokenize("## Grow {type: enterprise; kpi: ARR; status: active}\n\n<!-- id: goal_2 -->\nDouble revenue\n");
        let goals: Vec<Goal> = decode_records(&body);
        assert_eq!(goals[0].id, "goal_2");
        assert_eq!(goals[0].goal_type, "enterprise");
        assert_eq!(goals[0].description, "Double revenue");
        assert_eq!(goals[0].start_date, None);
    }
}
