//! Selector resolution: element snapshots to replay-time locators.
//!
//! The capture listener serializes the interacted element (and its ancestor
//! chain) as an [`ElementSnapshot`]; [`resolve`] turns that into an
//! [`ElementSelector`] descriptor that can re-find the element later, long
//! after the original node is gone.

use serde::{Deserialize, Serialize};

/// Ancestors deeper than this never contribute to the CSS path.
const CSS_PATH_DEPTH_CAP: usize = 5;

/// Text longer than this is too unstable to use as a locator.
const TEXT_LOCATOR_MAX_LEN: usize = 50;

/// One DOM node as seen by the capture listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementNode {
    /// Lowercase tag name.
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    /// 1-based position among same-tag siblings, for positional XPath.
    #[serde(default = "default_sibling_index")]
    pub sibling_index: usize,
}

fn default_sibling_index() -> usize {
    1
}

/// A serialized element reference captured at interaction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub node: ElementNode,
    /// The element's `name` attribute, if any.
    #[serde(default)]
    pub name: Option<String>,
    /// Trimmed text content, if any.
    #[serde(default)]
    pub text: Option<String>,
    /// Ancestor chain, nearest first, ending at (at most) the document root.
    #[serde(default)]
    pub ancestors: Vec<ElementNode>,
}

/// A locator descriptor, not a live reference. At least one field is
/// populated for any element that has a tag name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSelector {
    pub id: Option<String>,
    pub css_path: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub xpath: Option<String>,
}

impl ElementSelector {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.css_path.is_none()
            && self.name.is_none()
            && self.text.is_none()
            && self.xpath.is_none()
    }

    /// The single locator string embedded in generated scripts.
    ///
    /// Precedence is fixed: id > css path > name > text > xpath. Id locators
    /// survive re-renders; css paths are positional and brittle; name and
    /// text are semantic fallbacks.
    pub fn to_query(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(format!("#{}", id));
        }
        if let Some(css) = &self.css_path {
            return Some(css.clone());
        }
        if let Some(name) = &self.name {
            return Some(format!("[name=\"{}\"]", name));
        }
        if let Some(text) = &self.text {
            return Some(format!("text={}", text));
        }
        self.xpath.as_ref().map(|xp| format!("xpath={}", xp))
    }
}

/// Build a selector descriptor from a snapshot. Infallible: worst case only
/// the css path is populated (a bare tag name).
pub fn resolve(snapshot: &ElementSnapshot) -> ElementSelector {
    let id = non_empty(snapshot.node.id.as_deref());
    let name = non_empty(snapshot.name.as_deref());
    let text = snapshot
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.len() < TEXT_LOCATOR_MAX_LEN)
        .map(str::to_string);

    ElementSelector {
        id,
        css_path: Some(css_path(snapshot)),
        name,
        text,
        xpath: Some(xpath(snapshot)),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// One CSS step: tag plus up to two class refinements.
fn css_step(node: &ElementNode) -> String {
    let mut step = node.tag.clone();
    for class in node.classes.iter().filter(|c| !c.is_empty()).take(2) {
        step.push('.');
        step.push_str(class);
    }
    step
}

/// Walk ancestors until one carries an id (anchor the path there) or the
/// depth cap is reached.
fn css_path(snapshot: &ElementSnapshot) -> String {
    let mut steps = vec![css_step(&snapshot.node)];

    for ancestor in snapshot.ancestors.iter().take(CSS_PATH_DEPTH_CAP) {
        if let Some(id) = non_empty(ancestor.id.as_deref()) {
            steps.push(format!("#{}", id));
            break;
        }
        steps.push(css_step(ancestor));
    }

    steps.reverse();
    steps.join(" > ")
}

/// Absolute positional XPath, short-circuited at the nearest ancestor with
/// an id or at the document root.
fn xpath(snapshot: &ElementSnapshot) -> String {
    let mut steps = vec![xpath_step(&snapshot.node)];
    let mut anchor = None;

    for ancestor in &snapshot.ancestors {
        if let Some(id) = non_empty(ancestor.id.as_deref()) {
            anchor = Some(format!("//*[@id=\"{}\"]", id));
            break;
        }
        steps.push(xpath_step(ancestor));
    }

    steps.reverse();
    match anchor {
        Some(anchor) => format!("{}/{}", anchor, steps.join("/")),
        None => format!("/{}", steps.join("/")),
    }
}

fn xpath_step(node: &ElementNode) -> String {
    format!("{}[{}]", node.tag, node.sibling_index.max(1))
}
