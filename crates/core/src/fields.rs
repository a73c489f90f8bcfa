//! Text drawn by the background-text strategy, per document type.
//!
//! Each document type has a fixed list of fields. The content of a field is
//! derived from the patient record; absent record entries render as empty
//! strings rather than failing the request.

use serde_json::Value;

use crate::document::{DocumentType, PatientData};

/// How a field is laid out on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldContent {
    /// A single line drawn at the anchor point.
    Line(String),
    /// Wrapped text; paragraphs are separated by an empty line.
    Paragraphs(Vec<String>),
    /// Wrapped blocks separated by the position's `blockGap`.
    Blocks(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldText {
    pub name: &'static str,
    pub content: FieldContent,
}

impl FieldText {
    fn line(name: &'static str, text: impl Into<String>) -> Self {
        FieldText {
            name,
            content: FieldContent::Line(text.into()),
        }
    }

    fn paragraphs(name: &'static str, paragraphs: Vec<String>) -> Self {
        FieldText {
            name,
            content: FieldContent::Paragraphs(paragraphs),
        }
    }

    fn blocks(name: &'static str, blocks: Vec<String>) -> Self {
        FieldText {
            name,
            content: FieldContent::Blocks(blocks),
        }
    }
}

/// Field names drawn for each document type, in drawing order.
pub fn field_names(document: DocumentType) -> &'static [&'static str] {
    match document {
        DocumentType::Certificate => &[
            "city",
            "date",
            "doctorName",
            "doctorTitle",
            "doctorCro",
            "body",
            "footer",
        ],
        DocumentType::Prescription => &["title", "patientName", "list", "doctorName", "doctorCro"],
        DocumentType::Anamnesis => &[
            "title",
            "patientName",
            "patientAge",
            "patientPhone",
            "questions",
        ],
    }
}

/// Read a record entry as display text. Numbers and booleans are
/// stringified; null and absent entries are empty.
pub fn text(data: &PatientData, key: &str) -> String {
    value_text(data.get(key))
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// One prescribed item. Members of any scalar JSON type are accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Medication {
    pub medication: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
}

impl Medication {
    fn from_value(item: &Value) -> Option<Self> {
        let item = item.as_object()?;
        let member = |key: &str| present(item.get(key));
        Some(Medication {
            medication: member("medication").or_else(|| member("name")),
            dosage: member("dosage"),
            frequency: member("frequency"),
            duration: member("duration"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Question {
    pub question: String,
    pub checked: bool,
    pub notes: Option<String>,
}

impl Question {
    fn from_value(item: &Value) -> Option<Self> {
        let item = item.as_object()?;
        Some(Question {
            question: value_text(item.get("question")),
            checked: is_checked(item.get("checked")),
            notes: present(item.get("notes")),
        })
    }
}

fn present(value: Option<&Value>) -> Option<String> {
    Some(value_text(value)).filter(|v| !v.is_empty())
}

/// `true`, a non-zero number, or one of "true", "sim", "yes", "x", "1".
fn is_checked(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "sim" | "yes" | "x" | "1"
        ),
        _ => false,
    }
}

/// Object entries of an array member. Anything else is skipped.
fn list<T>(data: &PatientData, key: &str, from_value: fn(&Value) -> Option<T>) -> Vec<T> {
    match data.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(from_value).collect(),
        _ => Vec::new(),
    }
}

pub fn medications(data: &PatientData) -> Vec<Medication> {
    list(data, "medications", Medication::from_value)
}

pub fn questions(data: &PatientData) -> Vec<Question> {
    list(data, "questions", Question::from_value)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn join_present(parts: &[String], separator: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Build the drawable fields of a document.
pub fn document_fields(document: DocumentType, data: &PatientData) -> Vec<FieldText> {
    match document {
        DocumentType::Certificate => certificate_fields(data),
        DocumentType::Prescription => prescription_fields(data),
        DocumentType::Anamnesis => anamnesis_fields(data),
    }
}

fn certificate_fields(data: &PatientData) -> Vec<FieldText> {
    let days = text(data, "days");
    let mut body = vec![format!(
        "Atesto, para os devidos fins, que o(a) Sr(a). {}, inscrito(a) no CPF sob o nº {}, \
         prontuário nº {}, esteve sob meus cuidados profissionais nesta data, necessitando \
         de {} dia(s) de afastamento de suas atividades.",
        text(data, "patientName"),
        text(data, "patientCpf"),
        text(data, "patientId"),
        if days.is_empty() { "0".to_string() } else { days },
    )];
    let reason = text(data, "reason");
    if !reason.is_empty() {
        body.push(format!("Motivo: {reason}"));
    }
    let cid = text(data, "cid");
    if !cid.is_empty() {
        body.push(format!("CID: {cid}"));
    }

    let footer = join_present(
        &[
            text(data, "clinicName"),
            text(data, "clinicAddress"),
            text(data, "clinicPhone"),
        ],
        " - ",
    );

    vec![
        FieldText::line("city", text(data, "clinicCity")),
        FieldText::line("date", text(data, "currentDate")),
        FieldText::line("doctorName", text(data, "doctorName")),
        FieldText::line("doctorTitle", "Cirurgião(ã)-Dentista"),
        FieldText::line("doctorCro", format!("CRO {}", text(data, "doctorCro"))),
        FieldText::paragraphs("body", body),
        FieldText::line("footer", footer),
    ]
}

fn prescription_fields(data: &PatientData) -> Vec<FieldText> {
    let age = text(data, "patientAge");
    let patient = if age.is_empty() {
        format!("Paciente: {}", text(data, "patientName"))
    } else {
        format!("Paciente: {} - {age} anos", text(data, "patientName"))
    };

    let mut blocks: Vec<String> = medications(data)
        .iter()
        .enumerate()
        .map(|(i, med)| {
            let name = non_empty(med.medication.as_deref()).unwrap_or("Medicamento");
            let mut block = match non_empty(med.dosage.as_deref()) {
                Some(dosage) => format!("{}. {name} - {dosage}", i + 1),
                None => format!("{}. {name}", i + 1),
            };
            let schedule = join_present(
                &[
                    med.frequency.clone().unwrap_or_default(),
                    med.duration.clone().unwrap_or_default(),
                ],
                " | ",
            );
            if !schedule.is_empty() {
                block.push('\n');
                block.push_str(&schedule);
            }
            block
        })
        .collect();

    let observations = text(data, "observations");
    if !observations.is_empty() {
        blocks.push(format!("Observações:\n{observations}"));
    }

    vec![
        FieldText::line("title", "RECEITUÁRIO"),
        FieldText::line("patientName", patient),
        FieldText::blocks("list", blocks),
        FieldText::line("doctorName", text(data, "doctorName")),
        FieldText::line("doctorCro", format!("CRO {}", text(data, "doctorCro"))),
    ]
}

fn anamnesis_fields(data: &PatientData) -> Vec<FieldText> {
    let blocks = questions(data)
        .iter()
        .map(|q| {
            let marker = if q.checked { "[X]" } else { "[  ]" };
            match non_empty(q.notes.as_deref()) {
                Some(notes) => format!("{marker} {}\nNotas: {notes}", q.question.trim()),
                None => format!("{marker} {}", q.question.trim()),
            }
        })
        .collect();

    let age = text(data, "patientAge");
    vec![
        FieldText::line("title", "FICHA DE ANAMNESE"),
        FieldText::line("patientName", format!("Paciente: {}", text(data, "patientName"))),
        FieldText::line(
            "patientAge",
            if age.is_empty() {
                "Idade:".to_string()
            } else {
                format!("Idade: {age} anos")
            },
        ),
        FieldText::line("patientPhone", format!("Telefone: {}", text(data, "patientPhone"))),
        FieldText::blocks("questions", blocks),
    ]
}
