use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::HashMap;

/// A node in the parsed page. Owned, so extraction can run without the parser.
#[derive(Debug, Clone)]
pub struct DomNode {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub children: Vec<DomNode>,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    Element,
    Text,
    Document,
}

/// Child indices leading from the root to a node.
pub type NodePath = Vec<usize>;

impl DomNode {
    pub fn new_element(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: HashMap::new(),
            text: String::new(),
            children: Vec::new(),
            node_type: NodeType::Element,
        }
    }

    pub fn new_text(text: &str) -> Self {
        Self {
            tag: String::new(),
            attributes: HashMap::new(),
            text: text.to_string(),
            children: Vec::new(),
            node_type: NodeType::Text,
        }
    }

    pub fn new_document() -> Self {
        Self {
            tag: String::new(),
            attributes: HashMap::new(),
            text: String::new(),
            children: Vec::new(),
            node_type: NodeType::Document,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn role(&self) -> Option<&str> {
        self.get_attr("role")
    }

    /// True for `<tag>` elements and for anything carrying `role="<role>"`.
    pub fn is_tag_or_role(&self, tag: &str, role: &str) -> bool {
        self.is_element() && (self.tag == tag || self.role() == Some(role))
    }

    /// Concatenated text of this node and all descendants, trimmed.
    ///
    /// Text nodes are joined as they appear in the source, so markup such as
    /// `<span>Sym</span><span>bol</span>` reads as `Symbol`.
    pub fn text_content(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        match self.node_type {
            NodeType::Text => out.push_str(&self.text),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Whether `text_content()` equals `expected`.
    ///
    /// Stops as soon as the subtree holds more non-whitespace characters than
    /// `expected`, so large containers are rejected after a few text nodes.
    pub fn text_equals(&self, expected: &str) -> bool {
        let limit = expected.chars().filter(|c| !c.is_whitespace()).count();
        let mut seen = 0;
        let mut text = String::new();
        self.collect_text_bounded(&mut text, &mut seen, limit) && text.trim() == expected
    }

    fn collect_text_bounded(&self, out: &mut String, seen: &mut usize, limit: usize) -> bool {
        match self.node_type {
            NodeType::Text => {
                *seen += self.text.chars().filter(|c| !c.is_whitespace()).count();
                if *seen > limit {
                    return false;
                }
                out.push_str(&self.text);
                true
            }
            _ => self
                .children
                .iter()
                .all(|child| child.collect_text_bounded(out, seen, limit)),
        }
    }

    /// Element descendants (excluding `self`) matching `pred`, in document order.
    pub fn descendants_where<F>(&self, pred: F) -> Vec<&DomNode>
    where
        F: Fn(&DomNode) -> bool,
    {
        let mut found = Vec::new();
        for child in &self.children {
            child.collect_where(&pred, &mut found);
        }
        found
    }

    fn collect_where<'a, F>(&'a self, pred: &F, out: &mut Vec<&'a DomNode>)
    where
        F: Fn(&DomNode) -> bool,
    {
        if self.is_element() && pred(self) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_where(pred, out);
        }
    }

    /// Visit every element in document order together with its path.
    /// Stops early when `visit` returns `Some`.
    pub fn find_path<T, F>(&self, visit: &mut F) -> Option<T>
    where
        F: FnMut(&DomNode, &NodePath) -> Option<T>,
    {
        let mut path = Vec::new();
        self.find_path_from(&mut path, visit)
    }

    fn find_path_from<T, F>(&self, path: &mut NodePath, visit: &mut F) -> Option<T>
    where
        F: FnMut(&DomNode, &NodePath) -> Option<T>,
    {
        if self.is_element() {
            if let Some(hit) = visit(self, path) {
                return Some(hit);
            }
        }
        for (i, child) in self.children.iter().enumerate() {
            path.push(i);
            let hit = child.find_path_from(path, visit);
            path.pop();
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&DomNode> {
        let mut node = self;
        for &i in path {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    /// First element whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&DomNode> {
        if self.is_element() && self.get_attr("id") == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_id(id))
    }
}

/// Parse an HTML string into a DomNode tree.
pub fn parse_html(html: &str) -> DomNode {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    // Reading from an in-memory slice cannot fail; an empty document is the fallback.
    match parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => convert_node(&dom.document),
        Err(_) => DomNode::new_document(),
    }
}

fn convert_node(handle: &Handle) -> DomNode {
    match &handle.data {
        NodeData::Document => {
            let mut doc = DomNode::new_document();
            for child in handle.children.borrow().iter() {
                doc.children.push(convert_node(child));
            }
            doc
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.to_string();
            let mut node = DomNode::new_element(&tag);
            for attr in attrs.borrow().iter() {
                node.attributes
                    .insert(attr.name.local.to_string(), attr.value.to_string());
            }

            // Script and style bodies never count as visible text
            if tag == "script" || tag == "style" || tag == "template" {
                return node;
            }

            for child in handle.children.borrow().iter() {
                node.children.push(convert_node(child));
            }
            node
        }
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            DomNode::new_text(&text)
        }
        _ => DomNode::new_document(), // Comments, PIs, doctypes → ignored
    }
}
