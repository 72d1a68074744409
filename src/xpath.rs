// src/xpath.rs
//! `xpath` finder.
//!
//! Input is parsed as HTML with `scraper`, copied into an `sxd_document`
//! tree, and queried with `sxd_xpath`. Node-set results yield one match per
//! node (its string value); scalar results yield a single match.

use scraper::{ElementRef, Html, Node};
use sxd_document::{dom, Package};
use sxd_xpath::{evaluate_xpath, Value};
use thiserror::Error;

/// Syntax errors and evaluation errors alike: either way the expression
/// can't be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid expression")]
pub struct XPathError;

fn copy_children<'d>(from: ElementRef<'_>, to: dom::Element<'d>, doc: &dom::Document<'d>) {
    for child in from.children() {
        match child.value() {
            Node::Text(text) => {
                to.append_child(doc.create_text(&**text));
            }
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    to.append_child(copy_element(el, doc));
                }
            }
            _ => {}
        }
    }
}

fn copy_element<'d>(from: ElementRef<'_>, doc: &dom::Document<'d>) -> dom::Element<'d> {
    let el = doc.create_element(from.value().name());
    for (name, value) in from.value().attrs() {
        el.set_attribute_value(name, value);
    }
    copy_children(from, el, doc);
    el
}

/// HTML parsed into a document `sxd_xpath` can walk.
fn html_package(input: &str) -> Package {
    let html = Html::parse_document(input);
    let package = Package::new();
    {
        let doc = package.as_document();
        let root = copy_element(html.root_element(), &doc);
        doc.root().append_child(root);
    }
    package
}

/// Evaluate `expr` against `input` read as HTML, in document order.
pub fn select(expr: &str, input: &str) -> Result<Vec<String>, XPathError> {
    let package = html_package(input);
    let doc = package.as_document();
    let value = evaluate_xpath(&doc, expr).map_err(|_| XPathError)?;

    Ok(match value {
        Value::Nodeset(nodes) => nodes.document_order().iter().map(|n| n.string_value()).collect(),
        other => vec![other.string()],
    })
}
