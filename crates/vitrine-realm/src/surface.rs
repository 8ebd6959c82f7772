//! The mount surface — the realm's rendered output tree.
//!
//! Executed code attaches exactly one element tree here via `mount`; a new
//! run replaces the previous tree wholesale. The host reads the tree (as
//! JSON at the wasm boundary) to render the output pane.

use std::collections::BTreeMap;

use crate::value::Value;

/// One rendered element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Intrinsic tag name (`"div"`) or, for component output, whatever tag
    /// the component's render produced.
    pub tag: String,
    /// Props as evaluated. Function-valued props (event handlers) stay
    /// callable for [`Realm::dispatch`].
    ///
    /// [`Realm::dispatch`]: crate::Realm::dispatch
    pub props: BTreeMap<String, Value>,
    pub children: Vec<ElementChild>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementChild {
    Node(Element),
    Text(String),
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Walk to a descendant element by child indices (text children count).
    pub fn descendant(&self, path: &[usize]) -> Option<&Element> {
        let mut cur = self;
        for &idx in path {
            match cur.children.get(idx)? {
                ElementChild::Node(el) => cur = el,
                ElementChild::Text(_) => return None,
            }
        }
        Some(cur)
    }

    /// Collected text content, depth-first.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                ElementChild::Text(text) => {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(text);
                }
                ElementChild::Node(el) => el.collect_text(out),
            }
        }
    }

    /// JSON form for the host boundary.
    pub fn to_json(&self) -> serde_json::Value {
        let props: serde_json::Map<String, serde_json::Value> = self
            .props
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        let children: Vec<serde_json::Value> = self
            .children
            .iter()
            .map(|c| match c {
                ElementChild::Node(el) => el.to_json(),
                ElementChild::Text(text) => serde_json::Value::String(text.clone()),
            })
            .collect();
        serde_json::json!({
            "tag": self.tag,
            "props": props,
            "children": children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        let mut root = Element::new("div");
        let mut inner = Element::new("b");
        inner.children.push(ElementChild::Text("bold".into()));
        root.children.push(ElementChild::Text("hello".into()));
        root.children.push(ElementChild::Node(inner));
        root
    }

    #[test]
    fn test_descendant_path() {
        let root = sample();
        assert_eq!(root.descendant(&[]).unwrap().tag, "div");
        assert_eq!(root.descendant(&[1]).unwrap().tag, "b");
        assert!(root.descendant(&[0]).is_none()); // text child
        assert!(root.descendant(&[9]).is_none());
    }

    #[test]
    fn test_text_content() {
        assert_eq!(sample().text_content(), "hello bold");
    }

    #[test]
    fn test_to_json_shape() {
        let json = sample().to_json();
        assert_eq!(json["tag"], "div");
        assert_eq!(json["children"][0], "hello");
        assert_eq!(json["children"][1]["tag"], "b");
    }
}
