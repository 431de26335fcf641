//! Merge-tag substitution: `{Label:id}` field tokens plus the handful of
//! site/form tokens templates actually use.

use std::sync::OnceLock;

use regex::Regex;

use crate::forms::{Entry, Form};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    Html,
    Text,
}

pub struct TagContext<'a> {
    pub form: &'a Form,
    pub entry: &'a Entry,
    pub site_name: &'a str,
    pub admin_email: &'a str,
}

// Matches `{Some Label:5}` and `{:5}`; composite ids like `4.1` included.
fn field_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^{}:]*:(\d+(?:\.\d+)*)\}").expect("field tag regex"))
}

/// Resolve every merge tag in `input` against the form/entry context.
/// Unknown field ids resolve to the empty string; unrecognized tokens are
/// left untouched.
pub fn replace_merge_tags(input: &str, ctx: &TagContext<'_>, format: TagFormat) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut out = input
        .replace("{form_title}", &ctx.form.title)
        .replace("{entry_id}", &ctx.entry.id.to_string())
        .replace("{admin_email}", ctx.admin_email)
        .replace("{site_name}", ctx.site_name);

    if out.contains("{all_fields}") {
        out = out.replace("{all_fields}", &render_all_fields(ctx, format));
    }

    field_tag_re()
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            ctx.entry.value(&caps[1]).unwrap_or("").to_string()
        })
        .into_owned()
}

/// The `{all_fields}` summary: a two-column table in html, `Label: value`
/// lines in text. Hidden fields and empty values are left out.
fn render_all_fields(ctx: &TagContext<'_>, format: TagFormat) -> String {
    let rows: Vec<(&str, &str)> = ctx
        .form
        .fields
        .iter()
        .filter(|f| !f.hidden)
        .filter_map(|f| {
            ctx.entry
                .field_value(f.id)
                .filter(|v| !v.is_empty())
                .map(|v| (f.label.as_str(), v))
        })
        .collect();

    match format {
        TagFormat::Html => {
            let mut table = String::from("<table>");
            for (label, value) in rows {
                table.push_str(&format!("<tr><td>{label}</td><td>{value}</td></tr>"));
            }
            table.push_str("</table>");
            table
        }
        TagFormat::Text => rows
            .iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FieldType, FormField};

    fn fixture() -> (Form, Entry) {
        let form = Form {
            id: 2,
            title: "Contact".into(),
            fields: vec![
                FormField {
                    id: 1,
                    label: "Name".into(),
                    ..Default::default()
                },
                FormField {
                    id: 2,
                    label: "Email".into(),
                    field_type: FieldType::Email,
                    ..Default::default()
                },
                FormField {
                    id: 3,
                    label: "Tracking".into(),
                    hidden: true,
                    ..Default::default()
                },
            ],
        };
        let mut entry = Entry {
            id: 99,
            form_id: 2,
            ..Default::default()
        };
        entry.values.insert("1".into(), "Ada".into());
        entry.values.insert("2".into(), "ada@example.com".into());
        entry.values.insert("3".into(), "utm_x".into());
        (form, entry)
    }

    #[test]
    fn field_and_named_tags_resolve() {
        let (form, entry) = fixture();
        let ctx = TagContext {
            form: &form,
            entry: &entry,
            site_name: "Acme",
            admin_email: "admin@acme.test",
        };
        let out = replace_merge_tags(
            "New {form_title} entry {entry_id} from {Name:1} <{Email:2}>, admin {admin_email}",
            &ctx,
            TagFormat::Text,
        );
        assert_eq!(
            out,
            "New Contact entry 99 from Ada <ada@example.com>, admin admin@acme.test"
        );
    }

    #[test]
    fn unknown_field_resolves_empty() {
        let (form, entry) = fixture();
        let ctx = TagContext {
            form: &form,
            entry: &entry,
            site_name: "Acme",
            admin_email: "admin@acme.test",
        };
        assert_eq!(replace_merge_tags("x{Missing:42}y", &ctx, TagFormat::Text), "xy");
    }

    #[test]
    fn all_fields_skips_hidden() {
        let (form, entry) = fixture();
        let ctx = TagContext {
            form: &form,
            entry: &entry,
            site_name: "Acme",
            admin_email: "admin@acme.test",
        };

        let text = replace_merge_tags("{all_fields}", &ctx, TagFormat::Text);
        assert_eq!(text, "Name: Ada\nEmail: ada@example.com");

        let html = replace_merge_tags("{all_fields}", &ctx, TagFormat::Html);
        assert!(html.starts_with("<table>"));
        assert!(html.contains("<td>Name</td><td>Ada</td>"));
        assert!(!html.contains("Tracking"));
    }
}
