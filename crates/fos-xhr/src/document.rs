//! Document responses
//!
//! A `document` response is the markup placed inside a `<body>` element,
//! kept as a small owned tree so it can be cloned and compared.

use std::rc::Rc;

/// Markup node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
    Comment(String),
}

impl MarkupNode {
    pub fn element_name(&self) -> Option<&str> {
        match self {
            MarkupNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            MarkupNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            MarkupNode::Comment(_) => {}
        }
    }

    fn collect_by_tag<'a>(&'a self, tag: &str, out: &mut Vec<&'a MarkupNode>) {
        if let MarkupNode::Element { name, children, .. } = self {
            if name.eq_ignore_ascii_case(tag) {
                out.push(self);
            }
            for child in children {
                child.collect_by_tag(tag, out);
            }
        }
    }
}

/// Body fragment built from a markup response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    /// Children of the `<body>` element
    pub children: Vec<MarkupNode>,
}

impl Document {
    /// Concatenated text of every descendant text node
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Descendant elements with the given tag name (ASCII case-insensitive)
    pub fn elements_by_tag(&self, tag: &str) -> Vec<&MarkupNode> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_by_tag(tag, &mut out);
        }
        out
    }
}

/// Builds documents from markup text
pub trait DocumentFactory {
    /// `None` means the facility is unavailable for this input
    fn create(&self, markup: &str) -> Option<Document>;
}

/// Factory used when none is configured
pub(crate) fn default_factory() -> Option<Rc<dyn DocumentFactory>> {
    #[cfg(feature = "html")]
    {
        Some(Rc::new(html::Html5everDocuments))
    }
    #[cfg(not(feature = "html"))]
    {
        None
    }
}

#[cfg(feature = "html")]
pub use html::Html5everDocuments;

#[cfg(feature = "html")]
mod html {
    use html5ever::tendril::TendrilSink;
    use html5ever::{ParseOpts, QualName, local_name, ns, parse_fragment};
    use markup5ever_rcdom::{Handle, NodeData, RcDom};

    use super::{Document, DocumentFactory, MarkupNode};

    /// html5ever-backed document construction
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Html5everDocuments;

    impl DocumentFactory for Html5everDocuments {
        fn create(&self, markup: &str) -> Option<Document> {
            // Parsed in body context, so head-only elements stay in place
            let dom = parse_fragment(
                RcDom::default(),
                ParseOpts::default(),
                QualName::new(None, ns!(html), local_name!("body")),
                Vec::new(),
                true,
            )
            .one(markup);
            let root = dom.document.children.borrow().first().cloned()?;
            let children = root.children.borrow().iter().filter_map(convert_node).collect();
            tracing::trace!("Built document fragment from {} bytes of markup", markup.len());
            Some(Document { children })
        }
    }

    fn convert_node(handle: &Handle) -> Option<MarkupNode> {
        match &handle.data {
            NodeData::Text { contents } => Some(MarkupNode::Text(contents.borrow().to_string())),
            NodeData::Comment { contents } => Some(MarkupNode::Comment(contents.to_string())),
            NodeData::Element { name, attrs, .. } => {
                let attrs = attrs
                    .borrow()
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect();
                let children = handle.children.borrow().iter().filter_map(convert_node).collect();
                Some(MarkupNode::Element {
                    name: name.local.to_string(),
                    attrs,
                    children,
                })
            }
            // Doctypes and processing instructions never appear in a body fragment
            _ => None,
        }
    }
}
