//! Extraction of license fields from a pkg.go.dev licenses page.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::models::License;

const SOURCE_PREFIX: &str = "Source: ";

/// Ids accepted for the license-type heading. The site renders the id with a
/// literal leading `#`.
const TYPE_IDS: [&str; 2] = ["lic-0", "#lic-0"];
const SOURCE_CLASS: &str = "License-source";
const CONTENTS_CLASS: &str = "License-contents";

/// Parse a licenses page and pull out the type, source and contents.
///
/// Missing elements produce empty strings, not errors.
pub fn extract_license(mut body: &[u8]) -> std::io::Result<License> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut body)?;

    let mut fields = Fields::default();
    walk(&dom.document, &mut fields);

    let source = fields
        .source
        .strip_prefix(SOURCE_PREFIX)
        .map(str::to_string)
        .unwrap_or(fields.source);

    Ok(License {
        license_type: fields.license_type,
        source,
        content: fields.content,
    })
}

#[derive(Default)]
struct Fields {
    license_type: String,
    source: String,
    content: String,
}

/// Depth-first walk; text of every matching element is appended, matching
/// how a selector over the whole document concatenates its matches.
fn walk(node: &Handle, fields: &mut Fields) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        let attrs = attrs.borrow();
        for attr in attrs.iter() {
            match &*attr.name.local {
                "id" if TYPE_IDS.contains(&&*attr.value) => {
                    collect_text(node, &mut fields.license_type);
                }
                "class" => {
                    let mut classes = attr.value.split_whitespace();
                    if classes.clone().any(|c| c == SOURCE_CLASS) {
                        collect_text(node, &mut fields.source);
                    }
                    if classes.any(|c| c == CONTENTS_CLASS) {
                        collect_text(node, &mut fields.content);
                    }
                }
                _ => {}
            }
        }
    }

    for child in node.children.borrow().iter() {
        walk(child, fields);
    }
}

fn collect_text(node: &Handle, buf: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        buf.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, buf);
    }
}
