/**
 * Directive Matching - CSS Selector Matching
 *
 * Parses directive selectors and matches them against the tag name and
 * static attributes captured when an element is created.
 */
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::error::{RenderError, Result};

/// Regex for tokenizing CSS selectors
static SELECTOR_REGEXP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\:not\()|(([\.\#]?)[-\w]+)|(?:\[([-.\w*\\$]+)(?:=(?:"([^"]*)"|'([^']*)'|([^\]]*)))?\])|(\))|(\s*,\s*)"#).unwrap()
});

/// Capture groups of `SELECTOR_REGEXP`
#[derive(Debug, Clone, Copy)]
enum Group {
    Not = 1,
    Tag = 2,
    Prefix = 3,
    Attribute = 4,
    ValueDouble = 5,
    ValueSingle = 6,
    ValueUnquoted = 7,
    NotEnd = 8,
    Separator = 9,
}

/// A single compound selector: `tag.class[attr=value]:not(...)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssSelector {
    pub element: Option<String>,
    pub class_names: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub not_selectors: Vec<CssSelector>,
}

impl CssSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the selector describing an element instance, splitting any
    /// static `class` attribute into class names.
    pub fn for_element(tag: &str, attrs: &[(&str, &str)]) -> Self {
        let mut selector = CssSelector::new();
        selector.set_element(tag);
        for (name, value) in attrs {
            if name.eq_ignore_ascii_case("class") {
                for class_name in value.split_whitespace() {
                    selector.add_class_name(class_name);
                }
            }
            selector.add_attribute(name, value);
        }
        selector
    }

    /// Parse a (possibly comma separated) selector list.
    pub fn parse(selector: &str) -> Result<Vec<CssSelector>> {
        let invalid = |reason: &str| RenderError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let mut results = Vec::new();
        let mut current = CssSelector::new();
        let mut in_not = false;

        for cap in SELECTOR_REGEXP.captures_iter(selector) {
            if cap.get(Group::Not as usize).is_some() {
                if in_not {
                    return Err(invalid("nesting :not in a selector is not allowed"));
                }
                in_not = true;
                current.not_selectors.push(CssSelector::new());
            }

            let target = if in_not && !current.not_selectors.is_empty() {
                let last = current.not_selectors.len() - 1;
                &mut current.not_selectors[last]
            } else {
                &mut current
            };

            if let Some(tag) = cap.get(Group::Tag as usize) {
                let tag = tag.as_str();
                match cap.get(Group::Prefix as usize).map(|m| m.as_str()) {
                    Some("#") => target.add_attribute("id", &tag[1..]),
                    Some(".") => target.add_class_name(&tag[1..]),
                    _ => target.set_element(tag),
                }
            }

            if let Some(attr) = cap.get(Group::Attribute as usize) {
                let value = [Group::ValueDouble, Group::ValueSingle, Group::ValueUnquoted]
                    .iter()
                    .find_map(|group| cap.get(*group as usize))
                    .map(|m| m.as_str())
                    .unwrap_or("");
                let name = unescape_attribute(attr.as_str()).map_err(|reason| invalid(&reason))?;
                target.add_attribute(&name, value);
            }

            if cap.get(Group::NotEnd as usize).is_some() {
                in_not = false;
            }

            if cap.get(Group::Separator as usize).is_some() {
                if in_not {
                    return Err(invalid("multiple selectors in :not are not supported"));
                }
                results.push(std::mem::take(&mut current).finish());
            }
        }

        results.push(current.finish());
        if results.iter().any(CssSelector::is_empty) {
            return Err(invalid("empty selector"));
        }
        Ok(results)
    }

    /// Whether the selector constrains nothing at all.
    pub fn is_empty(&self) -> bool {
        self.element.is_none()
            && self.class_names.is_empty()
            && self.attrs.is_empty()
            && self.not_selectors.is_empty()
    }

    fn finish(mut self) -> Self {
        if !self.not_selectors.is_empty()
            && self.element.is_none()
            && self.class_names.is_empty()
            && self.attrs.is_empty()
        {
            self.element = Some("*".to_string());
        }
        self
    }

    pub fn set_element(&mut self, element: &str) {
        self.element = Some(element.to_string());
    }

    pub fn add_attribute(&mut self, name: &str, value: &str) {
        self.attrs.push((name.to_string(), value.to_lowercase()));
    }

    pub fn add_class_name(&mut self, name: &str) {
        self.class_names.push(name.to_lowercase());
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `self` (an element) satisfies `pattern` (a directive selector).
    pub fn matches(&self, pattern: &CssSelector) -> bool {
        if let (Some(element), Some(expected)) = (&self.element, &pattern.element) {
            if expected != "*" && element != expected {
                return false;
            }
        }

        if !pattern
            .class_names
            .iter()
            .all(|class_name| self.class_names.contains(class_name))
        {
            return false;
        }

        let attrs_match = pattern.attrs.iter().all(|(name, expected)| {
            self.attrs.iter().any(|(attr, value)| {
                attr == name && (expected.is_empty() || value.eq_ignore_ascii_case(expected))
            })
        });
        if !attrs_match {
            return false;
        }

        !pattern
            .not_selectors
            .iter()
            .any(|not_selector| self.matches(not_selector))
    }
}

fn unescape_attribute(attr: &str) -> std::result::Result<String, String> {
    let mut result = String::new();
    let mut escaping = false;

    for ch in attr.chars() {
        if ch == '\\' {
            escaping = true;
            continue;
        }
        if ch == '$' && !escaping {
            return Err(format!(
                "unescaped \"$\" in attribute \"{}\" is not supported, escape it with \"\\$\"",
                attr
            ));
        }
        escaping = false;
        result.push(ch);
    }

    Ok(result)
}

impl std::fmt::Display for CssSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.element.as_deref().unwrap_or(""))?;
        for class_name in &self.class_names {
            write!(f, ".{}", class_name)?;
        }
        for (name, value) in &self.attrs {
            let name = name.replace('$', "\\$");
            if value.is_empty() {
                write!(f, "[{}]", name)?;
            } else {
                write!(f, "[{}={}]", name, value)?;
            }
        }
        for not_selector in &self.not_selectors {
            write!(f, ":not({})", not_selector)?;
        }
        Ok(())
    }
}

#[derive(Clone)]
struct SelectorContext<T> {
    selector: CssSelector,
    data: T,
    id: usize,
}

/// Indexes selectors by element, class and attribute so that an element only
/// has to be compared against plausible candidates.
pub struct SelectorMatcher<T> {
    element_map: HashMap<String, Vec<SelectorContext<T>>>,
    class_map: HashMap<String, Vec<SelectorContext<T>>>,
    attr_map: HashMap<String, Vec<SelectorContext<T>>>,
    counter: usize,
}

impl<T: Clone> SelectorMatcher<T> {
    pub fn new() -> Self {
        SelectorMatcher {
            element_map: HashMap::new(),
            class_map: HashMap::new(),
            attr_map: HashMap::new(),
            counter: 0,
        }
    }

    pub fn add_selectable(&mut self, selector: CssSelector, data: T) {
        let context = SelectorContext {
            selector,
            data,
            id: self.counter,
        };
        self.counter += 1;

        // One index entry is enough: every candidate is re-checked in full.
        let selector = &context.selector;
        if let Some(element) = &selector.element {
            self.element_map
                .entry(element.clone())
                .or_default()
                .push(context.clone());
        } else if let Some(class_name) = selector.class_names.first() {
            self.class_map
                .entry(class_name.clone())
                .or_default()
                .push(context.clone());
        } else if let Some((name, _)) = selector.attrs.first() {
            self.attr_map
                .entry(name.clone())
                .or_default()
                .push(context.clone());
        } else if !selector.is_empty() {
            self.element_map
                .entry("*".to_string())
                .or_default()
                .push(context.clone());
        }
    }

    /// Calls `callback` once per registered selector matching `element`, in
    /// registration order. Returns whether anything matched.
    pub fn match_selector<F>(&self, element: &CssSelector, mut callback: F) -> bool
    where
        F: FnMut(&CssSelector, &T),
    {
        let mut buckets: Vec<&Vec<SelectorContext<T>>> = Vec::new();
        if let Some(tag) = &element.element {
            buckets.extend(self.element_map.get(tag));
        }
        buckets.extend(self.element_map.get("*"));
        for class_name in &element.class_names {
            buckets.extend(self.class_map.get(class_name));
        }
        for (name, _) in &element.attrs {
            buckets.extend(self.attr_map.get(name));
        }

        let mut seen = HashSet::new();
        let mut candidates: Vec<&SelectorContext<T>> = buckets
            .into_iter()
            .flatten()
            .filter(|context| element.matches(&context.selector) && seen.insert(context.id))
            .collect();

        candidates.sort_by_key(|context| context.id);
        for context in &candidates {
            callback(&context.selector, &context.data);
        }
        !candidates.is_empty()
    }
}

impl<T: Clone> Default for SelectorMatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}
