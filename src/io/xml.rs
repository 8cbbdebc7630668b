//! Namespace-agnostic lookups over a parsed XML tree.
//!
//! Release documents declare different namespace URIs (and prefixes) for
//! structurally identical content, so every lookup here compares only the
//! local part of element and attribute names.

use roxmltree::Node;

pub trait LocalNameExt<'a, 'input: 'a>: Copy {
    /// Descendant elements (excluding `self`) whose local name is `local`, in document order.
    fn find_all(self, local: &'static str) -> impl Iterator<Item = Node<'a, 'input>>;

    fn find_first(self, local: &'static str) -> Option<Node<'a, 'input>> {
        self.find_all(local).next()
    }

    /// Attribute value by local name, ignoring any namespace prefix.
    fn attr(self, local: &str) -> Option<&'a str>;

    /// All descendant text joined and trimmed.
    fn text_content(self) -> String;
}

impl<'a, 'input: 'a> LocalNameExt<'a, 'input> for Node<'a, 'input> {
    fn find_all(self, local: &'static str) -> impl Iterator<Item = Node<'a, 'input>> {
        self.descendants()
            .skip(1)
            .filter(move |n| n.is_element() && n.tag_name().name() == local)
    }

    fn attr(self, local: &str) -> Option<&'a str> {
        self.attributes().find(|a| a.name() == local).map(|a| a.value())
    }

    fn text_content(self) -> String {
        let joined: String = self.descendants().filter(|n| n.is_text()).filter_map(|n| n.text()).collect();
        joined.trim().to_string()
    }
}
