//! A small element tree for rendered fragments.
//!
//! Free text only ever enters the tree as [`Node::Text`], and the HTML
//! serializer escapes every text node and attribute value, so a payload
//! string can never become an element.

use html_escape::{encode_double_quoted_attribute, encode_text};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub classes: Vec<String>,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
    pub hidden: bool,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            classes: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
            hidden: false,
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !class.is_empty() {
            self.classes.push(class);
        }
        self
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn child(mut self, element: Element) -> Self {
        self.children.push(Node::Element(element));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    fn is_block(&self) -> bool {
        !matches!(self.tag, "span" | "strong" | "em")
    }
}

/// A styled run of text; `class` is the innermost class in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub class: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
    /// Classes of every enclosing block element, outermost first.
    pub block_classes: Vec<String>,
}

impl StyledLine {
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Markup {
    pub nodes: Vec<Node>,
}

impl Markup {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn element(element: Element) -> Self {
        Self {
            nodes: vec![Node::Element(element)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_html(node, &mut out);
        }
        out
    }

    /// Visible text with one line per block element.
    pub fn plain_text(&self) -> String {
        self.lines()
            .iter()
            .map(StyledLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn lines(&self) -> Vec<StyledLine> {
        let mut walker = LineWalker::default();
        for node in &self.nodes {
            walker.visit(node);
        }
        walker.flush();
        walker.lines
    }

    /// Sets `hidden` on every element carrying `attr`, keeping visible the
    /// ones whose value passes `visible`. Returns how many stay visible.
    pub fn filter_by_attr(&mut self, attr: &str, visible: &dyn Fn(&str) -> bool) -> usize {
        fn walk(nodes: &mut [Node], attr: &str, visible: &dyn Fn(&str) -> bool) -> usize {
            let mut shown = 0;
            for node in nodes {
                if let Node::Element(element) = node {
                    if let Some(value) = element.attr_value(attr) {
                        element.hidden = !visible(value);
                        if !element.hidden {
                            shown += 1;
                        }
                    } else {
                        shown += walk(&mut element.children, attr, visible);
                    }
                }
            }
            shown
        }
        walk(&mut self.nodes, attr, visible)
    }
}

fn write_html(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&encode_text(text)),
        Node::Element(element) => {
            out.push('<');
            out.push_str(element.tag);
            if !element.classes.is_empty() {
                out.push_str(" class=\"");
                out.push_str(&encode_double_quoted_attribute(&element.classes.join(" ")));
                out.push('"');
            }
            for (name, value) in &element.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
            if element.hidden {
                out.push_str(" hidden");
            }
            out.push('>');
            for child in &element.children {
                write_html(child, out);
            }
            out.push_str("</");
            out.push_str(element.tag);
            out.push('>');
        }
    }
}

#[derive(Default)]
struct LineWalker {
    lines: Vec<StyledLine>,
    current: StyledLine,
    class_stack: Vec<Option<String>>,
    block_stack: Vec<Vec<String>>,
}

impl LineWalker {
    fn visit(&mut self, node: &Node) {
        match node {
            Node::Text(text) => {
                if text.trim().is_empty() && self.current.spans.is_empty() {
                    return;
                }
                let class = self.class_stack.iter().rev().find_map(Clone::clone);
                self.current.spans.push(StyledSpan {
                    class,
                    text: text.clone(),
                });
            }
            Node::Element(element) => {
                if element.hidden {
                    return;
                }
                let block = element.is_block();
                if block {
                    self.flush();
                    self.block_stack.push(element.classes.clone());
                    if element.tag == "li" {
                        self.current.spans.push(StyledSpan {
                            class: None,
                            text: "- ".to_string(),
                        });
                    }
                }
                self.class_stack.push(element.classes.last().cloned());
                for child in &element.children {
                    self.visit(child);
                }
                self.class_stack.pop();
                if block {
                    self.flush();
                    self.block_stack.pop();
                }
            }
        }
    }

    fn flush(&mut self) {
        let has_text = self
            .current
            .spans
            .iter()
            .any(|span| !span.text.trim().is_empty() && span.text != "- ");
        if has_text {
            let mut line = std::mem::take(&mut self.current);
            line.block_classes = self.block_stack.concat();
            self.lines.push(line);
        } else {
            self.current = StyledLine::default();
        }
    }
}
