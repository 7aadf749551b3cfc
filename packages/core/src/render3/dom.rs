//! In-memory Host Document
//!
//! A small arena-backed node tree implementing `Renderer` with the HTML DOM
//! behaviour templates can observe: lowercased attribute names, reflected
//! properties, class lists stored in the `class` attribute, and an
//! `innerHTML`-style serializer.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use super::renderer::{NodeHandle, Renderer};
use super::value::Value;
use crate::config::RuntimeConfig;

/// Elements that never have closing tags when serialized.
static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

/// Properties whose attribute name differs from the property name.
static PROP_TO_ATTR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("className", "class");
    map.insert("htmlFor", "for");
    map.insert("formAction", "formaction");
    map.insert("readOnly", "readonly");
    map.insert("tabIndex", "tabindex");
    map
});

/// Properties that write through to their attribute.
static REFLECTED_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "id", "title", "className", "lang", "dir", "tabIndex", "htmlFor", "name", "placeholder",
        "src", "href", "alt", "formAction", "hidden", "disabled", "required", "readOnly",
        "multiple",
    ]
    .into_iter()
    .collect()
});

/// Properties whose value is the presence of an attribute.
static BOOLEAN_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "checked", "disabled", "hidden", "readOnly", "required", "selected", "multiple",
    ]
    .into_iter()
    .collect()
});

fn attribute_for_property(name: &str) -> String {
    PROP_TO_ATTR
        .get(name)
        .map(|attr| attr.to_string())
        .unwrap_or_else(|| name.to_lowercase())
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    properties: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub enum DomKind {
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct DomNode {
    kind: DomKind,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

/// Arena of host nodes. Removed nodes stay allocated but detached.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<DomNode>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: DomKind) -> NodeHandle {
        let handle = NodeHandle::new(self.nodes.len() as u32);
        self.nodes.push(DomNode {
            kind,
            parent: None,
            children: Vec::new(),
        });
        handle
    }

    fn node(&self, handle: NodeHandle) -> &DomNode {
        &self.nodes[handle.index()]
    }

    fn node_mut(&mut self, handle: NodeHandle) -> &mut DomNode {
        &mut self.nodes[handle.index()]
    }

    fn element(&self, handle: NodeHandle) -> Option<&ElementData> {
        match &self.node(handle).kind {
            DomKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, handle: NodeHandle) -> Option<&mut ElementData> {
        match &mut self.node_mut(handle).kind {
            DomKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, handle: NodeHandle) -> Option<&str> {
        self.element(handle).map(|element| element.tag.as_str())
    }

    pub fn attribute(&self, handle: NodeHandle, name: &str) -> Option<&str> {
        self.element(handle)
            .and_then(|element| element.attributes.get(&name.to_lowercase()))
            .map(String::as_str)
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.node(handle).parent
    }

    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        &self.node(handle).children
    }

    pub fn text_content(&self, handle: NodeHandle) -> String {
        match &self.node(handle).kind {
            DomKind::Text(text) => text.clone(),
            DomKind::Comment(_) => String::new(),
            DomKind::Element(_) => self
                .children(handle)
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
        }
    }

    fn detach(&mut self, child: NodeHandle) {
        if let Some(parent) = self.node(child).parent {
            self.node_mut(parent).children.retain(|c| *c != child);
            self.node_mut(child).parent = None;
        }
    }

    /// Serializes the children of `handle`, like `innerHTML`.
    pub fn inner_html(&self, handle: NodeHandle, config: &RuntimeConfig) -> String {
        let mut out = String::new();
        for child in self.children(handle) {
            self.write_node(*child, config, &mut out);
        }
        out
    }

    /// Serializes `handle` itself, like `outerHTML`.
    pub fn outer_html(&self, handle: NodeHandle, config: &RuntimeConfig) -> String {
        let mut out = String::new();
        self.write_node(handle, config, &mut out);
        out
    }

    fn write_node(&self, handle: NodeHandle, config: &RuntimeConfig, out: &mut String) {
        match &self.node(handle).kind {
            DomKind::Text(text) => out.push_str(&escape_text(text)),
            DomKind::Comment(text) => {
                if config.serialize_comments {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
            }
            DomKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                let mut attributes: Vec<(&String, &String)> = element.attributes.iter().collect();
                if config.sort_attributes {
                    attributes.sort_by(|a, b| a.0.cmp(b.0));
                }
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(element.tag.to_lowercase().as_str()) {
                    return;
                }
                for child in self.children(handle) {
                    self.write_node(*child, config, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

impl Renderer for Document {
    fn create_element(&mut self, tag: &str) -> NodeHandle {
        self.alloc(DomKind::Element(ElementData {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            properties: HashMap::new(),
        }))
    }

    fn create_text(&mut self, value: &str) -> NodeHandle {
        self.alloc(DomKind::Text(value.to_string()))
    }

    fn create_comment(&mut self, value: &str) -> NodeHandle {
        self.alloc(DomKind::Comment(value.to_string()))
    }

    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        self.insert_before(parent, child, None);
    }

    fn insert_before(&mut self, parent: NodeHandle, child: NodeHandle, reference: Option<NodeHandle>) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let position = reference
            .and_then(|reference| children.iter().position(|c| *c == reference))
            .unwrap_or(children.len());
        children.insert(position, child);
        self.node_mut(child).parent = Some(parent);
    }

    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        if self.node(child).parent == Some(parent) {
            self.detach(child);
        }
    }

    fn set_property(&mut self, node: NodeHandle, name: &str, value: &Value) {
        if let DomKind::Text(text) = &mut self.node_mut(node).kind {
            if matches!(name, "data" | "textContent" | "nodeValue") {
                *text = value.stringify();
            }
            return;
        }
        if !REFLECTED_PROPERTIES.contains(name) {
            if let Some(element) = self.element_mut(node) {
                element.properties.insert(name.to_string(), value.clone());
            }
            return;
        }
        let attr = attribute_for_property(name);
        if BOOLEAN_PROPERTIES.contains(name) {
            if value.is_truthy() {
                self.set_attribute(node, &attr, "");
            } else {
                self.remove_attribute(node, &attr);
            }
        } else {
            self.set_attribute(node, &attr, &value.stringify());
        }
    }

    fn property(&self, node: NodeHandle, name: &str) -> Value {
        let element = match &self.node(node).kind {
            DomKind::Element(element) => element,
            DomKind::Text(text) | DomKind::Comment(text) => {
                return match name {
                    "data" | "textContent" | "nodeValue" => Value::Str(text.clone()),
                    _ => Value::Undefined,
                };
            }
        };
        if name == "textContent" {
            return Value::Str(self.text_content(node));
        }
        if name == "tagName" {
            return Value::Str(element.tag.to_uppercase());
        }
        if let Some(value) = element.properties.get(name) {
            return value.clone();
        }
        let attr = attribute_for_property(name);
        if BOOLEAN_PROPERTIES.contains(name) {
            return Value::Bool(element.attributes.contains_key(&attr));
        }
        element
            .attributes
            .get(&attr)
            .map(|value| Value::Str(value.clone()))
            .unwrap_or(Value::Undefined)
    }

    fn set_attribute(&mut self, node: NodeHandle, name: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element
                .attributes
                .insert(name.to_lowercase(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: NodeHandle, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.shift_remove(&name.to_lowercase());
        }
    }

    fn add_class(&mut self, node: NodeHandle, name: &str) {
        if let Some(element) = self.element_mut(node) {
            let class = element.attributes.entry("class".to_string()).or_default();
            if !class.split_whitespace().any(|c| c == name) {
                if !class.is_empty() {
                    class.push(' ');
                }
                class.push_str(name);
            }
        }
    }

    fn remove_class(&mut self, node: NodeHandle, name: &str) {
        if let Some(element) = self.element_mut(node) {
            if let Some(class) = element.attributes.get_mut("class") {
                let updated = class
                    .split_whitespace()
                    .filter(|c| *c != name)
                    .collect::<Vec<_>>()
                    .join(" ");
                *class = updated;
            }
        }
    }

    fn set_text(&mut self, node: NodeHandle, value: &str) {
        if let DomKind::Text(text) | DomKind::Comment(text) = &mut self.node_mut(node).kind {
            *text = value.to_string();
            return;
        }
        for child in std::mem::take(&mut self.node_mut(node).children) {
            self.node_mut(child).parent = None;
        }
        let text = self.create_text(value);
        self.append_child(node, text);
    }
}
