//! SVG "stack" sprite.
//!
//! Each icon becomes a nested `<svg id="…">` inside one document. A CSS
//! rule shows only the `:target`ed icon, so `sprite.svg#icon` renders
//! a single symbol when used as an image or background.

use std::path::PathBuf;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{Transform, TransformEnv};
use crate::task::{Asset, FileError, TransformError};
use crate::utils::path::to_slash;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const STACK_STYLE: &str = ":root>svg{display:none}:root>svg:target{display:block}";

/// Collect every icon into a single sprite named `name`.
pub struct SpriteStack {
    name: String,
}

impl SpriteStack {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Transform for SpriteStack {
    fn name(&self) -> &'static str {
        "sprite"
    }

    /// Rewrite one icon into its nested-`<svg>` fragment.
    fn apply(&self, asset: Asset, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        let id = icon_id(&asset);
        let fragment = icon_fragment(asset.text()?, &id)?;
        Ok(vec![asset.with_contents(fragment)])
    }

    fn flush(&self, mut icons: Vec<Asset>, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, FileError> {
        if icons.is_empty() {
            return Ok(Vec::new());
        }
        icons.sort_by(|a, b| a.relative.cmp(&b.relative));

        let contents = assemble(&icons).map_err(|e| FileError::new(self.name.clone(), e))?;
        let sources = icons.iter().map(|a| a.origin.as_str()).collect::<Vec<_>>().join(", ");
        let mut sprite = Asset::new(PathBuf::from(&self.name), PathBuf::from(&self.name), contents);
        sprite.origin = format!("{} ({sources})", self.name);
        Ok(vec![sprite])
    }
}

/// `icons/arrow-left.svg` → `icons--arrow-left`
fn icon_id(asset: &Asset) -> String {
    let stem = to_slash(&asset.relative.with_extension(""));
    stem.replace('/', "--").replace(' ', "_")
}

fn xml_error(e: impl std::fmt::Display) -> TransformError {
    TransformError::Parse {
        kind: "svg",
        message: e.to_string(),
    }
}

/// Copy the icon's root element with `id` set, dropping prolog and comments.
fn icon_fragment(source: &str, id: &str) -> Result<Vec<u8>, TransformError> {
    let mut reader = Reader::from_str(source);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut found = false;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) if depth == 0 => {}
            Event::Start(e) if depth == 0 => {
                if found || e.name().as_ref() != b"svg" {
                    return Err(xml_error("expected a single <svg> root element"));
                }
                found = true;
                depth = 1;
                writer.write_event(Event::Start(root_element(&e, id)?)).map_err(xml_error)?;
            }
            Event::Empty(e) if depth == 0 => {
                if found || e.name().as_ref() != b"svg" {
                    return Err(xml_error("expected a single <svg> root element"));
                }
                found = true;
                writer.write_event(Event::Empty(root_element(&e, id)?)).map_err(xml_error)?;
            }
            Event::Text(t) if depth == 0 => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(xml_error("text outside the root element"));
                }
            }
            Event::Start(e) => {
                depth += 1;
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e)).map_err(xml_error)?;
            }
            Event::Comment(_) => {}
            other if depth > 0 => writer.write_event(other).map_err(xml_error)?,
            _ => return Err(xml_error("unexpected content outside the root element")),
        }
    }

    if !found {
        return Err(xml_error("no <svg> root element"));
    }
    if depth != 0 {
        return Err(xml_error("unclosed <svg> root element"));
    }
    Ok(writer.into_inner())
}

/// Root `<svg>` with the sprite id first and the icon's own `id` dropped.
fn root_element<'a>(e: &'a BytesStart<'_>, id: &'a str) -> Result<BytesStart<'a>, TransformError> {
    let mut root = BytesStart::new("svg");
    root.push_attribute(("id", id));
    let mut has_ns = false;
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        match attr.key.as_ref() {
            b"id" => continue,
            b"xmlns" => has_ns = true,
            _ => {}
        }
        root.push_attribute(attr);
    }
    if !has_ns {
        root.push_attribute(("xmlns", SVG_NS));
    }
    Ok(root)
}

/// Wrap the fragments into the sprite document.
fn assemble(icons: &[Asset]) -> Result<Vec<u8>, TransformError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;

    let mut root = BytesStart::new("svg");
    root.push_attribute(("xmlns", SVG_NS));
    root.push_attribute(("xmlns:xlink", XLINK_NS));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;

    writer.write_event(Event::Start(BytesStart::new("style"))).map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::from_escaped(STACK_STYLE)))
        .map_err(xml_error)?;
    writer.write_event(Event::End(BytesEnd::new("style"))).map_err(xml_error)?;

    let mut out = writer.into_inner();
    for icon in icons {
        out.extend_from_slice(&icon.contents);
    }
    out.extend_from_slice(b"</svg>");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::transform::run_chain;
    use crate::task::transform::tests::env;
    use std::path::Path;

    const ARROW: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<svg xmlns="http://www.w3.org/2000/svg" id="old" viewBox="0 0 24 24"><path d="M0 0h24"/></svg>
"#;

    fn icon(rel: &str, svg: &str) -> Asset {
        Asset::new(rel, format!("/src/img/{rel}"), svg.as_bytes().to_vec())
    }

    #[test]
    fn test_icon_fragment() {
        let fragment = String::from_utf8(icon_fragment(ARROW, "arrow").unwrap()).unwrap();
        assert!(fragment.starts_with(r#"<svg id="arrow""#));
        assert!(fragment.contains(r#"viewBox="0 0 24 24""#));
        assert!(!fragment.contains("old"));
        assert!(!fragment.contains("exported"));
        assert!(!fragment.contains("<?xml"));
        assert!(fragment.ends_with("</svg>"));
    }

    #[test]
    fn test_icon_id_from_path() {
        assert_eq!(icon_id(&icon("icons/arrow-left.svg", ARROW)), "icons--arrow-left");
    }

    #[test]
    fn test_invalid_icon() {
        assert!(icon_fragment("<div></div>", "x").is_err());
        assert!(icon_fragment("<svg><g></svg>", "x").is_err());
    }

    #[test]
    fn test_sprite_stacks_icons() {
        let root = Path::new("/");
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(SpriteStack::new("sprite.svg"))];
        let icons = vec![icon("b.svg", ARROW), icon("a.svg", ARROW)];

        let (assets, errors) = run_chain(&chain, icons, &env(root));

        assert!(errors.is_empty());
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].relative, PathBuf::from("sprite.svg"));
        let sprite = String::from_utf8(assets[0].contents.clone()).unwrap();
        let a = sprite.find(r#"id="a""#).unwrap();
        let b = sprite.find(r#"id="b""#).unwrap();
        assert!(a < b);
        assert!(sprite.contains(":root>svg:target"));
        assert!(sprite.ends_with("</svg></svg>"));
    }

    #[test]
    fn test_bad_icon_skipped_from_sprite() {
        let root = Path::new("/");
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(SpriteStack::new("sprite.svg"))];
        let icons = vec![icon("a.svg", ARROW), icon("broken.svg", "<svg>")];

        let (assets, errors) = run_chain(&chain, icons, &env(root));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "broken.svg");
        let sprite = String::from_utf8(assets[0].contents.clone()).unwrap();
        assert!(sprite.contains(r#"id="a""#));
    }

    #[test]
    fn test_no_icons_no_sprite() {
        let root = Path::new("/");
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(SpriteStack::new("sprite.svg"))];
        let (assets, errors) = run_chain(&chain, Vec::new(), &env(root));
        assert!(assets.is_empty());
        assert!(errors.is_empty());
    }
}
