//! Reference rewriting in entry documents.

use super::Manifest;

/// Characters that continue a path token.
fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

/// Replace every manifest key in `text` with its value.
///
/// Keys are tried longest first and only match a whole path token, or
/// the token after a leading `/`, `./` or `../`: with a `main.css` key,
/// `main.css.map`, `xmain.css` and `css/main.css` stay as they are.
pub fn rewrite(text: &str, manifest: &Manifest) -> String {
    let mut keys: Vec<(&str, &str)> = manifest.iter().filter(|(k, _)| !k.is_empty()).collect();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut out = String::with_capacity(text.len());
    let mut token_start = 0;
    let mut i = 0;

    'scan: while let Some(c) = text[i..].chars().next() {
        let lead = &text[token_start..i];
        if lead.chars().all(|c| c == '/' || c == '.') {
            let rest = &text[i..];
            for (key, value) in &keys {
                if let Some(after) = rest.strip_prefix(key)
                    && !after.chars().next().is_some_and(|c| is_path_char(c) && c != '/')
                {
                    out.push_str(value);
                    i += key.len();
                    continue 'scan;
                }
            }
        }
        out.push(c);
        i += c.len_utf8();
        if !is_path_char(c) {
            token_start = i;
        }
    }
    out
}
