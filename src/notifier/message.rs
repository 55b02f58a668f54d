//! Rendering of new-submission notification messages.

use crate::storage::Fields;

/// A rendered notification, ready for a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl NotificationMessage {
    /// Build plain-text and HTML bodies listing each submitted field.
    /// Every user-supplied string is escaped in the HTML part.
    pub fn render(from: &str, to: &str, form_name: &str, fields: &Fields) -> Self {
        let mut text = format!("New submission for {form_name}:\n\n");
        let mut rows = String::new();
        for (key, value) in fields {
            let value = value.to_string();
            text.push_str(&format!("{key}: {value}\n"));
            rows.push_str(&format!(
                "<tr><td style=\"padding:8px 12px;font-weight:600;vertical-align:top\">{}</td>\
                 <td style=\"padding:8px 12px\">{}</td></tr>",
                escape_html(key),
                escape_html(&value),
            ));
        }

        let html = format!(
            "<div style=\"font-family:system-ui,sans-serif;max-width:600px;margin:0 auto\">\
             <h2 style=\"font-size:18px\">New Submission: {}</h2>\
             <table style=\"width:100%;border-collapse:collapse\">{rows}</table>\
             <p style=\"text-align:center;color:#94a3b8;font-size:12px\">Sent by FormForge</p>\
             </div>",
            escape_html(form_name),
        );

        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: format!("New submission: {form_name}"),
            text,
            html,
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
