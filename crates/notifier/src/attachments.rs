//! Attachment collection: template-seeded paths plus the stored values of
//! every file-upload field, rewritten from public URLs to local paths.

use std::path::PathBuf;

use config::UploadsConfiguration;

use crate::forms::{Entry, FieldType, Form, Notification};

/// Gather the attachment list for one send. Seeded template paths come
/// first; upload-field values follow in field order when the template
/// enables attachments. The final list is deduplicated preserving order.
pub fn collect_attachments(
    notification: &Notification,
    form: &Form,
    entry: &Entry,
    uploads: &UploadsConfiguration,
) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = notification.attachments.iter().map(PathBuf::from).collect();

    if notification.enable_attachments {
        for field in form.fields_of_type(FieldType::Fileupload) {
            let Some(stored) = entry.field_value(field.id).filter(|v| !v.is_empty()) else {
                continue;
            };

            // Multi-file fields store a JSON list; a single upload is the
            // bare URL. A list that fails to parse is treated as one value.
            let urls: Vec<String> = if field.multiple_files {
                serde_json::from_str(stored).unwrap_or_else(|_| vec![stored.to_string()])
            } else {
                vec![stored.to_string()]
            };

            for url in urls {
                paths.push(PathBuf::from(rewrite_upload_url(&url, uploads)));
            }
        }
    }

    dedup_in_order(paths)
}

/// Map a stored upload URL onto the local uploads root. Values without the
/// marker (already local paths) pass through unchanged.
fn rewrite_upload_url(url: &str, uploads: &UploadsConfiguration) -> String {
    match url.find(&uploads.url_marker) {
        Some(pos) => format!("{}{}", uploads.root, &url[pos + uploads.url_marker.len()..]),
        None => url.to_string(),
    }
}

fn dedup_in_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormField;

    fn uploads() -> UploadsConfiguration {
        UploadsConfiguration {
            root: "/srv/uploads/".into(),
            url_marker: "/form-uploads/".into(),
        }
    }

    fn upload_form() -> Form {
        Form {
            id: 1,
            title: "Application".into(),
            fields: vec![
                FormField {
                    id: 5,
                    label: "Resume".into(),
                    field_type: FieldType::Fileupload,
                    ..Default::default()
                },
                FormField {
                    id: 6,
                    label: "Samples".into(),
                    field_type: FieldType::Fileupload,
                    multiple_files: true,
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn collects_single_and_multi_file_fields() {
        let form = upload_form();
        let mut entry = Entry::default();
        entry
            .values
            .insert("5".into(), "https://acme.test/media/form-uploads/1/resume.pdf".into());
        entry.values.insert(
            "6".into(),
            r#"["https://acme.test/media/form-uploads/1/a.png","https://acme.test/media/form-uploads/1/b.png"]"#
                .into(),
        );
        let notification = Notification {
            enable_attachments: true,
            ..Default::default()
        };

        let paths = collect_attachments(&notification, &form, &entry, &uploads());
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/srv/uploads/1/resume.pdf"),
                PathBuf::from("/srv/uploads/1/a.png"),
                PathBuf::from("/srv/uploads/1/b.png"),
            ]
        );
    }

    #[test]
    fn disabled_attachments_keep_only_seeded_paths() {
        let form = upload_form();
        let mut entry = Entry::default();
        entry
            .values
            .insert("5".into(), "https://acme.test/media/form-uploads/1/resume.pdf".into());
        let notification = Notification {
            attachments: vec!["/srv/static/terms.pdf".into()],
            enable_attachments: false,
            ..Default::default()
        };

        let paths = collect_attachments(&notification, &form, &entry, &uploads());
        assert_eq!(paths, vec![PathBuf::from("/srv/static/terms.pdf")]);
    }

    #[test]
    fn duplicates_are_removed_in_order() {
        let form = upload_form();
        let mut entry = Entry::default();
        entry
            .values
            .insert("5".into(), "https://acme.test/media/form-uploads/1/resume.pdf".into());
        let notification = Notification {
            attachments: vec!["/srv/uploads/1/resume.pdf".into()],
            enable_attachments: true,
            ..Default::default()
        };

        let paths = collect_attachments(&notification, &form, &entry, &uploads());
        assert_eq!(paths, vec![PathBuf::from("/srv/uploads/1/resume.pdf")]);
    }

    #[test]
    fn values_without_marker_pass_through() {
        assert_eq!(
            rewrite_upload_url("/already/local/file.txt", &uploads()),
            "/already/local/file.txt"
        );
    }
}
