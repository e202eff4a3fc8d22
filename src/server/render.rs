//! HTML rendering for the form and result pages

use crate::types::prediction::{CampaignRisk, Confidence, Label, PredictionResponse, ProbabilityBand};
use crate::types::record::{Contact, Education, InputRecord, Job, Marital, Month, Poutcome, YesNo};
use std::fmt::{Display, Write};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 56rem; margin: 2rem auto; color: #1f2937; }
h1 { color: #1e3a8a; }
fieldset { border: 1px solid #e5e7eb; border-radius: 8px; margin-bottom: 1rem; }
label { display: inline-block; min-width: 16rem; margin: 0.25rem 0; }
.error { background: #fee2e2; border-left: 5px solid #ef4444; padding: 0.75rem; }
.subscribe { background: #d1fae5; border-left: 5px solid #10b981; padding: 1rem; }
.not-subscribe { background: #fee2e2; border-left: 5px solid #ef4444; padding: 1rem; }
.bar { background: #e5e7eb; height: 1rem; border-radius: 4px; }
.bar > div { background: #667eea; height: 100%; border-radius: 4px; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<h1>Bank Marketing Campaign Predictor</h1>\n{}\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

fn select<T: Copy + PartialEq + Display>(out: &mut String, name: &str, label: &str, options: &[T], selected: T) {
    let _ = write!(out, "<label for=\"{name}\">{}</label><select id=\"{name}\" name=\"{name}\">", escape(label));
    for &option in options {
        let value = escape(&option.to_string());
        let marker = if option == selected { " selected" } else { "" };
        let _ = write!(out, "<option value=\"{value}\"{marker}>{value}</option>");
    }
    out.push_str("</select><br>\n");
}

/// Whole-number input
fn number(out: &mut String, name: &str, label: &str, value: impl Display, min: Option<i32>, max: Option<i32>) {
    number_input(out, name, label, value, "1", min, max);
}

fn number_input(
    out: &mut String,
    name: &str,
    label: &str,
    value: impl Display,
    step: &str,
    min: Option<i32>,
    max: Option<i32>,
) {
    let _ = write!(
        out,
        "<label for=\"{name}\">{}</label><input type=\"number\" id=\"{name}\" name=\"{name}\" value=\"{}\" step=\"{step}\"",
        escape(label),
        escape(&value.to_string())
    );
    if let Some(min) = min {
        let _ = write!(out, " min=\"{min}\"");
    }
    if let Some(max) = max {
        let _ = write!(out, " max=\"{max}\"");
    }
    out.push_str(" required><br>\n");
}

/// The input form, prefilled with `values`, with an optional error banner
pub fn form_page(values: &InputRecord, error: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(error) = error {
        let _ = write!(body, "<p class=\"error\">{}</p>\n", escape(error));
    }

    body.push_str("<form method=\"post\" action=\"/predict\">\n");

    body.push_str("<fieldset><legend>Personal information</legend>\n");
    number(&mut body, "age", "Age", values.age, Some(0), None);
    select(&mut body, "job", "Job", Job::ALL, values.job);
    select(&mut body, "marital", "Marital status", Marital::ALL, values.marital);
    select(&mut body, "education", "Education", Education::ALL, values.education);
    body.push_str("</fieldset>\n");

    body.push_str("<fieldset><legend>Financial information</legend>\n");
    number_input(&mut body, "balance", "Average yearly balance", values.balance, "any", None, None);
    select(&mut body, "default", "Has credit in default?", YesNo::ALL, values.default);
    select(&mut body, "housing", "Has housing loan?", YesNo::ALL, values.housing);
    select(&mut body, "loan", "Has personal loan?", YesNo::ALL, values.loan);
    body.push_str("</fieldset>\n");

    body.push_str("<fieldset><legend>Contact information</legend>\n");
    select(&mut body, "contact", "Contact type", Contact::ALL, values.contact);
    number(&mut body, "day", "Last contact day of month", values.day, Some(1), Some(31));
    select(&mut body, "month", "Last contact month", Month::ALL, values.month);
    body.push_str("</fieldset>\n");

    body.push_str("<fieldset><legend>Campaign details</legend>\n");
    number(&mut body, "campaign", "Contacts during campaign", values.campaign, Some(1), None);
    number(&mut body, "pdays", "Days since last contact (-1 = never)", values.pdays, Some(-1), None);
    number(&mut body, "previous", "Previous contacts", values.previous, Some(0), None);
    select(&mut body, "poutcome", "Previous campaign outcome", Poutcome::ALL, values.poutcome);
    body.push_str("</fieldset>\n");

    body.push_str("<button type=\"submit\">Predict subscription likelihood</button>\n</form>\n");

    page("Bank Marketing Predictor", &body)
}

fn band_text(band: ProbabilityBand) -> &'static str {
    match band {
        ProbabilityBand::Low => "Low probability",
        ProbabilityBand::Medium => "Medium probability",
        ProbabilityBand::High => "High probability",
    }
}

fn risk_text(risk: CampaignRisk) -> &'static str {
    match risk {
        CampaignRisk::Low => "Low risk",
        CampaignRisk::Medium => "Medium risk",
        CampaignRisk::High => "High risk",
    }
}

fn confidence_text(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::Moderate => "Moderate",
        Confidence::High => "High",
        Confidence::VeryHigh => "Very high",
    }
}

/// The result page for one prediction, with the form below it
pub fn result_page(response: &PredictionResponse, values: &InputRecord) -> String {
    let prediction = &response.prediction;
    let insight = &response.insight;
    let percent = prediction.probability * 100.0;

    let (class, headline) = match prediction.label {
        Label::Subscribe => ("subscribe", "Likely to subscribe"),
        Label::NotSubscribe => ("not-subscribe", "Not likely to subscribe"),
    };

    let mut body = String::new();
    let _ = write!(
        body,
        "<div class=\"{class}\"><strong>{headline}</strong> (probability: {percent:.2}%)<br>\
         Confidence: {}</div>\n",
        confidence_text(insight.confidence)
    );
    let _ = write!(
        body,
        "<div class=\"bar\"><div style=\"width: {percent:.1}%\"></div></div>\n\
         <ul><li>{}</li><li>Campaign risk level: {}</li></ul>\n\
         <p>{}</p>\n<p><small>Prediction {}</small></p>\n<hr>\n",
        band_text(insight.band),
        risk_text(insight.risk),
        escape(&insight.recommendation),
        escape(&response.prediction_id)
    );

    let form = form_page(values, None);
    // Embed the form body after the result
    if let (Some(start), Some(end)) = (form.find("<form"), form.rfind("</form>")) {
        body.push_str(&form[start..end + "</form>".len()]);
    }

    page("Prediction result", &body)
}
