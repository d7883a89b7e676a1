//! Turning crew output into idea records and validation reports.
//!
//! Models rarely return exactly the requested shape, so parsing is lenient:
//! JSON when the output is JSON, otherwise a line-oriented reading of the
//! `Name:` / `Tagline:` / ... layout the generation task asks for.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

static ENUMERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}[.)](\s+|$)").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*+•]\s+").unwrap());
static NAME_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((startup|idea|product|company)_)?name$").unwrap());
static IDEA_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(startup_)?idea(_?#?\d+)?$").unwrap());
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").unwrap());

/// Longest label, in words, still read as a field name.
const MAX_LABEL_WORDS: usize = 6;

// ---------------------------------------------------------------------------
// IdeaRecord
// ---------------------------------------------------------------------------

/// One idea: string fields in the order they were found.
///
/// Serializes as a JSON object. Inserting an existing key replaces the value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaRecord {
    fields: Vec<(String, String)>,
}

impl IdeaRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IdeaRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = IdeaRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for IdeaRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for IdeaRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = IdeaRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of string fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<IdeaRecord, A::Error> {
                let mut record = IdeaRecord::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

// ---------------------------------------------------------------------------
// Idea parsing
// ---------------------------------------------------------------------------

/// Extract idea records from crew output.
///
/// JSON output (an array of objects, or an object with an `ideas` array) is
/// used as is. Anything else is read line by line; see [`parse_ideas_text`].
pub fn parse_ideas(text: &str) -> Vec<IdeaRecord> {
    match parse_ideas_json(text) {
        Some(records) => {
            log::debug!("Parsed {} ideas from JSON output", records.len());
            records
        }
        None => {
            let records = parse_ideas_text(text);
            log::debug!("Parsed {} ideas from text output", records.len());
            records
        }
    }
}

/// Read JSON output, unwrapping a surrounding code fence.
///
/// Returns `None` when the text is not JSON of a supported shape. Keys are
/// normalized like text labels, nulls are dropped, other scalars and nested
/// values become strings, and objects without a `name` are skipped.
pub fn parse_ideas_json(text: &str) -> Option<Vec<IdeaRecord>> {
    let trimmed = text.trim();
    let body = CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());

    let items = match serde_json::from_str::<Value>(body).ok()? {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("ideas") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    let records = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .map(|object| {
            object
                .into_iter()
                .filter_map(|(key, value)| {
                    let value = match value {
                        Value::Null => return None,
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    Some((normalize_key(&key), value))
                })
                .collect::<IdeaRecord>()
        })
        .filter(|record| record.name().is_some())
        .collect();
    Some(records)
}

/// Strip heading marks, bold markers, bullets and list numbers.
///
/// Returns the remaining text, whether it started with a list number, and
/// whether it was a heading (a `#` line or a line that is bold throughout).
fn normalize_line(raw: &str) -> (String, bool, bool) {
    let mut text = raw.trim();
    let mut heading = false;

    if text.starts_with('#') {
        heading = true;
        text = text.trim_start_matches('#').trim_start();
    }
    if text.len() > 4 && text.starts_with("**") && text.ends_with("**") && !text.contains(':') {
        heading = true;
    }

    let unbolded = text.replace("**", "").replace("__", "");
    let mut text = unbolded.trim();

    if let Some(m) = BULLET.find(text) {
        text = &text[m.end()..];
    }
    let enumerated = match ENUMERATOR.find(text) {
        Some(m) => {
            text = &text[m.end()..];
            true
        }
        None => false,
    };

    (text.trim().to_string(), enumerated, heading)
}

/// `Target Market` -> `target_market`.
fn normalize_key(label: &str) -> String {
    label
        .trim()
        .trim_matches('*')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Split `Label: value`, rejecting labels too long to be field names.
fn split_label(text: &str) -> Option<(&str, &str)> {
    let (label, value) = text.split_once(':')?;
    let words = label.split_whitespace().count();
    if words == 0 || words > MAX_LABEL_WORDS {
        return None;
    }
    Some((label, value.trim()))
}

/// Record being filled in while reading lines.
///
/// Records opened by a bare title line (a numbered or heading line without
/// a label) are flagged: an explicit `Name:` may rename them, and they are
/// dropped at the end if they stayed empty while other ideas have fields.
#[derive(Default)]
struct Builder {
    records: Vec<(IdeaRecord, bool)>,
    current: Option<IdeaRecord>,
    current_is_title: bool,
}

impl Builder {
    /// An idea boundary: a title line, an `Idea N:` label, or a `Name:` line.
    fn boundary(&mut self, name: Option<&str>, title: bool) {
        if let Some(current) = &mut self.current {
            if current.is_empty() {
                if let Some(name) = name {
                    current.insert("name", name);
                    self.current_is_title = title;
                }
                return;
            }
        }
        self.flush();
        let mut record = IdeaRecord::new();
        if let Some(name) = name {
            record.insert("name", name);
        }
        self.current = Some(record);
        self.current_is_title = title && name.is_some();
    }

    /// An explicit `Name:` line. It renames a record opened by a title line
    /// that has no fields yet; otherwise it starts a new idea.
    fn name(&mut self, name: &str) {
        if let Some(current) = &mut self.current {
            let bare_title = self.current_is_title && current.len() == 1;
            if current.is_empty() || bare_title {
                current.insert("name", name);
                self.current_is_title = false;
                return;
            }
        }
        self.boundary(Some(name), false);
    }

    fn field(&mut self, key: String, value: &str) {
        match &mut self.current {
            Some(current) if current.name().is_some() => current.insert(key, value),
            _ => log::trace!("Dropping field '{}' outside of an idea", key),
        }
    }

    fn flush(&mut self) {
        if let Some(record) = self.current.take() {
            if record.name().is_some() {
                self.records.push((record, self.current_is_title));
            }
        }
        self.current_is_title = false;
    }

    fn finish(mut self) -> Vec<IdeaRecord> {
        self.flush();
        // A bare title with nothing under it (a document heading, say) is
        // noise once ideas with fields were found.
        let has_fields = self.records.iter().any(|(r, _)| r.len() > 1);
        self.records
            .into_iter()
            .filter(|(record, title)| !(has_fields && *title && record.len() == 1))
            .map(|(record, _)| record)
            .collect()
    }
}

/// Read idea records from free text.
///
/// - A line whose label is `name` (or `idea`, `idea 2`, ...) starts a new
///   idea; the value is the name.
/// - A numbered or heading line without a label also starts one, named by
///   the whole line.
/// - Any other `Label: value` line sets field `label` on the current idea.
///   Fields seen before the first name are dropped.
/// - Only records with a name are returned.
pub fn parse_ideas_text(text: &str) -> Vec<IdeaRecord> {
    let mut builder = Builder::default();

    for raw in text.lines() {
        let (line, enumerated, heading) = normalize_line(raw);
        if line.is_empty() {
            continue;
        }

        match split_label(&line) {
            Some((label, value)) => {
                let key = normalize_key(label);
                if NAME_LABEL.is_match(&key) && !value.is_empty() {
                    builder.name(value);
                } else if NAME_LABEL.is_match(&key) || IDEA_LABEL.is_match(&key) {
                    builder.boundary((!value.is_empty()).then_some(value), false);
                } else if !value.is_empty() {
                    builder.field(key, value);
                }
            }
            None if enumerated || heading => builder.boundary(Some(&line), true),
            None => {}
        }
    }

    builder.finish()
}

// ---------------------------------------------------------------------------
// Validation report
// ---------------------------------------------------------------------------

pub const MARKET_ANALYSIS_FALLBACK: &str = "Market analysis not available";
pub const TECHNICAL_EVALUATION_FALLBACK: &str = "Technical evaluation not available";
pub const BUSINESS_PLAN_FALLBACK: &str = "Business plan not available";

const SECTION_HEADINGS: [&str; 3] = ["Market Analysis", "Technical Evaluation", "Business Plan"];

/// The three reports produced by the validation crew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub market_analysis: String,
    pub technical_evaluation: String,
    pub business_plan: String,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            market_analysis: MARKET_ANALYSIS_FALLBACK.to_string(),
            technical_evaluation: TECHNICAL_EVALUATION_FALLBACK.to_string(),
            business_plan: BUSINESS_PLAN_FALLBACK.to_string(),
        }
    }
}

impl ValidationReport {
    /// Map task outputs by position: market, technical, business.
    ///
    /// Missing or blank entries fall back to "... not available".
    pub fn from_task_outputs<S: AsRef<str>>(outputs: &[S]) -> Self {
        let pick = |index: usize, fallback: &str| {
            outputs
                .get(index)
                .map(|s| s.as_ref().trim())
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            market_analysis: pick(0, MARKET_ANALYSIS_FALLBACK),
            technical_evaluation: pick(1, TECHNICAL_EVALUATION_FALLBACK),
            business_plan: pick(2, BUSINESS_PLAN_FALLBACK),
        }
    }

    /// Split one combined text on the section headings.
    ///
    /// Each section runs from its heading to the next heading found after
    /// it. Heading punctuation (`#`, `*`, `:`) is trimmed from the section.
    pub fn from_sections(text: &str) -> Self {
        let positions: Vec<Option<usize>> = SECTION_HEADINGS
            .iter()
            .map(|heading| text.find(heading))
            .collect();

        let section = |index: usize, fallback: &str| -> String {
            let Some(start) = positions[index] else {
                return fallback.to_string();
            };
            let body_start = start + SECTION_HEADINGS[index].len();
            let end = positions
                .iter()
                .flatten()
                .copied()
                .filter(|&pos| pos > start)
                .min()
                .unwrap_or(text.len());
            let body = text[body_start..end]
                .trim_start_matches(|c: char| c == ':' || c == '*' || c.is_whitespace())
                .trim_end_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
            if body.is_empty() {
                fallback.to_string()
            } else {
                body.to_string()
            }
        };

        Self {
            market_analysis: section(0, MARKET_ANALYSIS_FALLBACK),
            technical_evaluation: section(1, TECHNICAL_EVALUATION_FALLBACK),
            business_plan: section(2, BUSINESS_PLAN_FALLBACK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(records: &[IdeaRecord]) -> Vec<&str> {
        records.iter().filter_map(|r| r.name()).collect()
    }

    #[test]
    fn test_plain_name_blocks() {
        let text = "Name: TaskFlow\nTagline: Tasks made simple\nTarget Market: Freelancers\n\nName: PetPal\nProblem: Pet care is chaotic";
        let records = parse_ideas(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), Some("TaskFlow"));
        assert_eq!(records[0].get("tagline"), Some("Tasks made simple"));
        assert_eq!(records[0].get("target_market"), Some("Freelancers"));
        assert_eq!(
            records[0].keys().collect::<Vec<_>>(),
            vec!["name", "tagline", "target_market"]
        );
        assert_eq!(records[1].get("problem"), Some("Pet care is chaotic"));
    }

    #[test]
    fn test_numbered_fields_stay_in_one_idea() {
        let text = "1. Name: InvoiceBot\n2. Tagline: Invoices on autopilot\n3. Problem: Late payments\n\n1. Name: ShiftSwap\n2. Tagline: Trade shifts easily";
        let records = parse_ideas(text);
        assert_eq!(names(&records), vec!["InvoiceBot", "ShiftSwap"]);
        assert_eq!(records[0].get("problem"), Some("Late payments"));
        assert_eq!(records[1].get("tagline"), Some("Trade shifts easily"));
    }

    #[test]
    fn test_markdown_headings_and_bold_labels() {
        let text = "# Startup Ideas\n\n### Idea 1: TaskFlow\n**Tagline:** Simplify tasks\n- **Business Model:** Subscription\n\n### Idea 2: PetPal\n**Tagline:** Care for pets";
        let records = parse_ideas(text);
        assert_eq!(names(&records), vec!["TaskFlow", "PetPal"]);
        assert_eq!(records[0].get("tagline"), Some("Simplify tasks"));
        assert_eq!(records[0].get("business_model"), Some("Subscription"));
    }

    #[test]
    fn test_enumerated_title_then_name_line_merges() {
        let text = "1. **TaskFlow**\n   - Name: TaskFlow Pro\n   - Tagline: Do more\n2. **PetPal**\n   - Tagline: Pets";
        let records = parse_ideas(text);
        assert_eq!(names(&records), vec!["TaskFlow Pro", "PetPal"]);
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn test_enumerated_line_without_colon_is_name() {
        let text = "1. TaskFlow - AI task manager\nTagline: Smart tasks";
        let records = parse_ideas(text);
        assert_eq!(records[0].name(), Some("TaskFlow - AI task manager"));
    }

    #[test]
    fn test_idea_label_without_value() {
        let text = "Idea 1:\nName: TaskFlow\nTagline: t1\nIdea 2:\nName: PetPal\nTagline: t2";
        let records = parse_ideas(text);
        assert_eq!(names(&records), vec!["TaskFlow", "PetPal"]);
        assert_eq!(records[1].get("tagline"), Some("t2"));
    }

    #[test]
    fn test_preamble_fields_are_dropped() {
        let text = "Summary: here are ideas\nNote: all are SaaS\n\nName: TaskFlow\nTagline: t";
        let records = parse_ideas(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("summary"), None);
    }

    #[test]
    fn test_duplicate_key_keeps_position() {
        let text = "Name: A\nTagline: first\nProblem: p\nTagline: second";
        let records = parse_ideas(text);
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["name", "tagline", "problem"]);
        assert_eq!(records[0].get("tagline"), Some("second"));
    }

    #[test]
    fn test_long_sentence_is_not_a_field() {
        let text = "Name: A\nTagline: t\nThe market for this is growing fast in every region we studied: 20% a year";
        let records = parse_ideas(text);
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn test_names_only_list() {
        let records = parse_ideas("1. Alpha\n2. Beta\n3. Gamma");
        assert_eq!(names(&records), vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_consecutive_name_lines_are_separate_ideas() {
        let records = parse_ideas("Name: Alpha\nName: Beta\nTagline: t");
        assert_eq!(names(&records), vec!["Alpha", "Beta"]);
        assert_eq!(records[0].len(), 1);
        assert_eq!(records[1].get("tagline"), Some("t"));
    }

    #[test]
    fn test_named_idea_without_fields_is_kept() {
        let text = "Name: Alpha\n\nName: Beta\nTagline: t\n\nName: Gamma\nTagline: g";
        let records = parse_ideas(text);
        assert_eq!(names(&records), vec!["Alpha", "Beta", "Gamma"]);

        let text = "Idea 1: Alpha\nIdea 2: Beta\nTagline: t";
        assert_eq!(names(&parse_ideas(text)), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_bare_heading_is_dropped_when_ideas_have_fields() {
        let text = "## Ideas for you\n\n### Idea 1: Alpha\nTagline: a\n\nName: Beta";
        let records = parse_ideas(text);
        assert_eq!(names(&records), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_no_ideas() {
        assert!(parse_ideas("").is_empty());
        assert!(parse_ideas("I could not come up with anything.").is_empty());
    }

    #[test]
    fn test_json_array() {
        let text = r#"[{"name": "TaskFlow", "Target Market": "Freelancers", "score": 7, "extra": null}, {"tagline": "no name"}]"#;
        let records = parse_ideas(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("target_market"), Some("Freelancers"));
        assert_eq!(records[0].get("score"), Some("7"));
        assert_eq!(records[0].get("extra"), None);
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["name", "target_market", "score"]);
    }

    #[test]
    fn test_json_object_in_code_fence() {
        let text = "```json\n{\"ideas\": [{\"name\": \"PetPal\", \"tagline\": \"Pets\"}]}\n```";
        let records = parse_ideas(text);
        assert_eq!(names(&records), vec!["PetPal"]);
    }

    #[test]
    fn test_json_of_other_shape_falls_back_to_text() {
        assert!(parse_ideas_json("\"Name: X\"").is_none());
        assert!(parse_ideas_json("{\"result\": 1}").is_none());
    }

    #[test]
    fn test_record_serializes_in_order() {
        let record: IdeaRecord = [("name", "Zeta"), ("tagline", "t"), ("b", "x")].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"name":"Zeta","tagline":"t","b":"x"}"#
        );
        let back: IdeaRecord = serde_json::from_str(r#"{"name":"Zeta","tagline":"t","b":"x"}"#).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_report_from_task_outputs() {
        let report = ValidationReport::from_task_outputs(&["market", "  ", "plan"]);
        assert_eq!(report.market_analysis, "market");
        assert_eq!(report.technical_evaluation, TECHNICAL_EVALUATION_FALLBACK);
        assert_eq!(report.business_plan, "plan");

        let report = ValidationReport::from_task_outputs::<&str>(&[]);
        assert_eq!(report, ValidationReport::default());
    }

    #[test]
    fn test_report_from_sections() {
        let text = "## Market Analysis\nBig market.\n\n## Technical Evaluation\nEasy build.\n\n## Business Plan:\nSell it.";
        let report = ValidationReport::from_sections(text);
        assert_eq!(report.market_analysis, "Big market.");
        assert_eq!(report.technical_evaluation, "Easy build.");
        assert_eq!(report.business_plan, "Sell it.");
    }

    #[test]
    fn test_report_from_sections_missing() {
        let report = ValidationReport::from_sections("Business Plan: Sell it.");
        assert_eq!(report.market_analysis, MARKET_ANALYSIS_FALLBACK);
        assert_eq!(report.technical_evaluation, TECHNICAL_EVALUATION_FALLBACK);
        assert_eq!(report.business_plan, "Sell it.");
    }
}
