use html5ever::{parse_document, tendril::TendrilSink, tree_builder::TreeBuilderOpts, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::fmt;
use std::rc::Rc;

/// Elements dropped before any section heuristic runs.
pub const NOISE_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "form"];

/// Mutable HTML tree. Not `Send`: parse, query and drop it on one thread.
pub struct HtmlDocument {
    dom: RcDom,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                drop_doctype: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let dom = parse_document(RcDom::default(), opts).one(html);

        Self { dom }
    }

    pub fn root(&self) -> NodeRef {
        NodeRef::new(self.dom.document.clone())
    }

    pub fn body(&self) -> Option<NodeRef> {
        self.root().find_first(|node| node.is_tag("body"))
    }

    /// Removes noise elements and every comment node.
    pub fn strip_noise(&self) -> usize {
        self.root()
            .remove_all(|node| node.is_comment() || node.tag().is_some_and(|tag| NOISE_TAGS.contains(&tag)))
    }
}

impl fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlDocument").finish_non_exhaustive()
    }
}

/// Handle to one node of an `HtmlDocument`.
#[derive(Clone)]
pub struct NodeRef {
    handle: Handle,
}

impl NodeRef {
    fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Lowercased tag name, `None` for text, comments and the document node.
    pub fn tag(&self) -> Option<&str> {
        match &self.handle.data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        }
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.handle.data, NodeData::Comment { .. })
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.handle.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|attr| attr.name.local.as_ref() == name)
                .map(|attr| attr.value.to_string()),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    pub fn classes(&self) -> Vec<String> {
        self.attr("class")
            .map(|class| class.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.handle
            .children
            .borrow()
            .iter()
            .cloned()
            .map(NodeRef::new)
            .collect()
    }

    /// Pre-order walk over everything below this node, in document order.
    pub fn descendants(&self) -> Descendants {
        let mut stack: Vec<Handle> = self.handle.children.borrow().clone();
        stack.reverse();
        Descendants { stack }
    }

    pub fn find_first<P>(&self, predicate: P) -> Option<NodeRef>
    where
        P: Fn(&NodeRef) -> bool,
    {
        self.descendants().find(|node| predicate(node))
    }

    pub fn find_all<P>(&self, predicate: P) -> Vec<NodeRef>
    where
        P: Fn(&NodeRef) -> bool,
    {
        self.descendants().filter(|node| predicate(node)).collect()
    }

    /// Descendant text nodes, each trimmed, empties skipped, joined by one space.
    pub fn text(&self) -> String {
        if let NodeData::Text { contents } = &self.handle.data {
            return contents.borrow().trim().to_string();
        }

        let mut parts = Vec::new();
        for node in self.descendants() {
            if let NodeData::Text { contents } = &node.handle.data {
                let contents = contents.borrow();
                let trimmed = contents.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
        }

        parts.join(" ")
    }

    /// Detaches this node (and everything below it) from its parent.
    pub fn remove_subtree(&self) {
        let parent = self.handle.parent.take().and_then(|weak| weak.upgrade());

        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(child, &self.handle));
        }
    }

    /// Removes every descendant matching `predicate`; returns how many were cut.
    pub fn remove_all<P>(&self, predicate: P) -> usize
    where
        P: Fn(&NodeRef) -> bool,
    {
        let matches = self.find_all(predicate);
        for node in &matches {
            node.remove_subtree();
        }
        matches.len()
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("tag", &self.tag())
            .field("id", &self.id())
            .finish()
    }
}

pub struct Descendants {
    stack: Vec<Handle>,
}

impl Iterator for Descendants {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let handle = self.stack.pop()?;
        self.stack
            .extend(handle.children.borrow().iter().rev().cloned());
        Some(NodeRef::new(handle))
    }
}
