//! GEDCOM `FILE` records for stored media.

/// Extensions whose registered format name differs from the extension.
pub const EXTENSION_TO_FORM: &[(&str, &str)] = &[("jpg", "jpeg"), ("tif", "tiff")];

/// Build the GEDCOM lines describing a stored media file.
///
/// ```text
/// 1 FILE a/b.jpg
/// 2 FORM jpeg
/// 3 TYPE photo
/// 2 TITL A B
/// 1 NOTE line1
/// 2 CONT line2
/// ```
pub fn build_fragment(file: &str, type_hint: &str, title: &str, note: &str) -> String {
    let type_hint = collapse_whitespace(type_hint);
    let title = collapse_whitespace(title);

    let mut lines = vec![format!("1 FILE {file}")];

    let form = format_token(file);
    if !form.is_empty() {
        lines.push(format!("2 FORM {form}"));
    } else if !type_hint.is_empty() {
        lines.push("2 FORM".to_string());
    }

    if !type_hint.is_empty() {
        lines.push(format!("3 TYPE {type_hint}"));
    }

    if !title.is_empty() {
        lines.push(format!("2 TITL {title}"));
    }

    if !note.trim().is_empty() {
        let note = note.replace("\r\n", "\n").replace('\r', "\n");
        lines.push(format!("1 NOTE {}", note.replace('\n', "\n2 CONT ")));
    }

    lines.join("\n")
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase extension of the file name, mapped to its registered form.
///
/// A name that is only an extension (`.jpg`) still has one.
fn format_token(file: &str) -> String {
    let name = file.rsplit('/').next().unwrap_or(file);
    let extension = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => return String::new(),
    };

    EXTENSION_TO_FORM
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, form)| form.to_string())
        .unwrap_or(extension)
}
