//! Simplified document HTML for the offline export path.
//!
//! When the service cannot be reached the exporter still has to produce
//! something printable. These layouts approximate the server templates with
//! plain markup and inline styles; they are not meant to be pixel-identical.

use html_escape::encode_text;

use crate::document::{DocumentType, PatientData};
use crate::fields::{medications, questions, text};
use crate::template::multiline_html;

const BASE_STYLES: &str = r#"<style>
  body { font-family: Arial, sans-serif; margin: 20px; color: #333; background: white; }
  h1, h2 { text-align: center; border-bottom: 2px solid #333; padding-bottom: 10px; }
  .header { text-align: center; margin-bottom: 30px; }
  .patient-info { margin: 20px 0; }
  .patient-info p { margin: 5px 0; }
  .signature { margin-top: 50px; border-top: 1px solid #333; padding-top: 20px; }
  .med-item { margin: 15px 0; padding: 10px; border-left: 3px solid #007bff; }
</style>"#;

fn esc(value: String) -> String {
    encode_text(&value).into_owned()
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\">{BASE_STYLES}</head>\n<body>\n\
         <div class=\"header\"><h1>{title}</h1></div>\n{body}\n</body>\n</html>"
    )
}

fn signature(data: &PatientData) -> String {
    format!(
        "<div class=\"signature\"><p>_____________________</p><p>{}</p><p>CRO {}</p><p>{}</p></div>",
        esc(or_default(text(data, "doctorName"), "Profissional")),
        esc(or_default(text(data, "doctorCro"), "00000")),
        esc(or_default(text(data, "clinicName"), "Clínica")),
    )
}

fn clinic_and_patient(data: &PatientData) -> String {
    format!(
        "<p><strong>Clínica:</strong> {}</p><p><strong>Data:</strong> {}</p>\
         <p><strong>PACIENTE:</strong> {}</p>",
        esc(or_default(text(data, "clinicName"), "Clínica")),
        esc(text(data, "currentDate")),
        esc(text(data, "patientName")),
    )
}

/// Build the offline HTML for a template name. Unknown names produce a
/// page saying so rather than an error.
pub fn fallback_html(template: &str, data: &PatientData) -> String {
    match template.parse::<DocumentType>() {
        Ok(DocumentType::Prescription) => prescription(data),
        Ok(DocumentType::Certificate) => certificate(data),
        Ok(DocumentType::Anamnesis) => anamnesis(data),
        Err(_) => format!(
            "<html><body><p>Template não suportado: {}</p></body></html>",
            encode_text(template)
        ),
    }
}

fn prescription(data: &PatientData) -> String {
    let meds: String = medications(data)
        .into_iter()
        .map(|m| {
            format!(
                "<div class=\"med-item\"><strong>{}</strong> - {}<br>Frequência: {} | Duração: {}</div>",
                esc(m.medication.unwrap_or_default()),
                esc(m.dosage.unwrap_or_default()),
                esc(m.frequency.unwrap_or_default()),
                esc(m.duration.unwrap_or_default()),
            )
        })
        .collect();

    let body = format!(
        "<div class=\"patient-info\">{}<p><strong>IDADE:</strong> {} anos</p>\
         <p><strong>TELEFONE:</strong> {}</p></div>\n<h2>PRESCRIÇÃO:</h2>\n{meds}\n\
         <div class=\"patient-info\"><p><strong>Observações:</strong></p><p>{}</p></div>\n{}",
        clinic_and_patient(data),
        esc(text(data, "patientAge")),
        esc(text(data, "patientPhone")),
        multiline_html(&text(data, "observations")),
        signature(data),
    );
    page("RECEITUÁRIO MÉDICO ODONTOLÓGICO", &body)
}

fn certificate(data: &PatientData) -> String {
    let body = format!(
        "<div class=\"patient-info\">{}<p><strong>CPF:</strong> {}</p><p><strong>CID:</strong> {}</p></div>\n\
         <div class=\"patient-info\" style=\"margin-top: 30px;\"><p><strong>MOTIVO:</strong></p><p>{}</p>\
         <p style=\"margin-top: 20px;\"><strong>DIAS:</strong> {}</p></div>\n{}",
        clinic_and_patient(data),
        esc(or_default(text(data, "patientCpf"), "N/A")),
        esc(or_default(text(data, "cid"), "N/A")),
        multiline_html(&text(data, "reason")),
        esc(text(data, "days")),
        signature(data),
    );
    page("ATESTADO ODONTOLÓGICO", &body)
}

fn anamnesis(data: &PatientData) -> String {
    let items: String = questions(data)
        .into_iter()
        .map(|q| {
            let notes = q
                .notes
                .filter(|n| !n.trim().is_empty())
                .map(|n| format!("<br><em>Notas: {}</em>", esc(n)))
                .unwrap_or_default();
            format!(
                "<p><input type=\"checkbox\" {} disabled> <strong>{}</strong>{notes}</p>",
                if q.checked { "checked" } else { "" },
                esc(q.question),
            )
        })
        .collect();

    let body = format!(
        "<div class=\"patient-info\">{}<p><strong>IDADE:</strong> {} anos</p>\
         <p><strong>TELEFONE:</strong> {}</p><p><strong>EMAIL:</strong> {}</p></div>\n\
         <h2>HISTÓRICO DE SAÚDE:</h2>\n{items}\n{}",
        clinic_and_patient(data),
        esc(text(data, "patientAge")),
        esc(text(data, "patientPhone")),
        esc(or_default(text(data, "patientEmail"), "N/A")),
        signature(data),
    );
    page("FICHA DE ANAMNESE", &body)
}
