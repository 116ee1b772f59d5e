use std::collections::HashMap;
use std::fmt;

/// Plural categories in the order they are written back out.
///
/// Any option key outside this list (`=0`, `male`, ...) is emitted afterwards in
/// lexicographic order.
pub const CATEGORY_ORDER: [&str; 6] = ["zero", "one", "two", "few", "many", "other"];

/// A single node of a parsed template message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageNode {
    Literal(String),
    Argument(Argument),
    Number(Format),
    Date(Format),
    Time(Format),
    /// `#` inside a plural branch, standing for the plural's numeric value.
    Pound,
    Tag(Tag),
    Plural(Choice),
    Select(Choice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Literal,
    Argument,
    Number,
    Date,
    Time,
    Pound,
    Tag,
    Plural,
    Select,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Literal => "literal",
            NodeKind::Argument => "argument",
            NodeKind::Number => "number",
            NodeKind::Date => "date",
            NodeKind::Time => "time",
            NodeKind::Pound => "pound",
            NodeKind::Tag => "tag",
            NodeKind::Plural => "plural",
            NodeKind::Select => "select",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bracing {
    #[default]
    Single,
    Double,
}

/// A placeholder such as `{name}`, `{name, style}` or `{{name}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub style: Option<String>,
    pub bracing: Bracing,
}

impl Argument {
    pub fn new(name: &str) -> Self {
        Argument {
            name: name.to_string(),
            style: None,
            bracing: Bracing::Single,
        }
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    pub fn double_braced(mut self) -> Self {
        self.bracing = Bracing::Double;
        self
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.bracing {
            Bracing::Single => ("{", "}"),
            Bracing::Double => ("{{", "}}"),
        };
        match &self.style {
            Some(style) => write!(f, "{}{}, {}{}", open, self.name, style, close),
            None => write!(f, "{}{}{}", open, self.name, close),
        }
    }
}

/// Name and optional style of a `number`, `date` or `time` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    pub name: String,
    pub style: Option<String>,
}

impl Format {
    pub fn new(name: &str, style: Option<&str>) -> Self {
        Format {
            name: name.to_string(),
            style: style.map(str::to_string),
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, keyword: &str) -> fmt::Result {
        match &self.style {
            Some(style) => write!(f, "{{{}, {}, {}}}", self.name, keyword, style),
            None => write!(f, "{{{}, {}}}", self.name, keyword),
        }
    }
}

/// An inline tag like `<b>...</b>` with its parsed content.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub children: Vec<MessageNode>,
}

impl Tag {
    pub fn new(name: &str, children: Vec<MessageNode>) -> Self {
        Tag {
            name: name.to_string(),
            children,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.name)
    }
}

/// The body of a plural or select construct: the selector name and one
/// sub-message per category key.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub options: HashMap<String, Vec<MessageNode>>,
}

impl Choice {
    pub fn new(name: &str, options: HashMap<String, Vec<MessageNode>>) -> Self {
        Choice {
            name: name.to_string(),
            options,
        }
    }

    /// Options in reassembly order, see [`ordered_categories`].
    pub fn ordered_options(&self) -> Vec<(&str, &[MessageNode])> {
        ordered_categories(self.options.keys().map(String::as_str))
            .into_iter()
            .filter_map(|key| {
                self.options
                    .get_key_value(key)
                    .map(|(k, v)| (k.as_str(), v.as_slice()))
            })
            .collect()
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, keyword: &str) -> fmt::Result {
        write!(f, "{{{}, {}, ", self.name, keyword)?;
        let mut first = true;
        for (key, nodes) in self.ordered_options() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{} {{{}}}", key, render(nodes))?;
        }
        write!(f, "}}")
    }
}

/// Sorts category keys into the fixed reassembly order.
///
/// The result does not depend on the iteration order of `keys`.
pub fn ordered_categories<'a, I>(keys: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut known: Vec<&str> = Vec::new();
    let mut others: Vec<&str> = Vec::new();
    for key in keys {
        if CATEGORY_ORDER.contains(&key) {
            known.push(key);
        } else {
            others.push(key);
        }
    }
    known.sort_by_key(|key| CATEGORY_ORDER.iter().position(|c| c == key));
    others.sort_unstable();
    known.dedup();
    others.dedup();
    known.extend(others);
    known
}

/// Concatenates the textual form of every node.
pub fn render(nodes: &[MessageNode]) -> String {
    nodes.iter().map(|node| node.to_string()).collect()
}

impl MessageNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            MessageNode::Literal(_) => NodeKind::Literal,
            MessageNode::Argument(_) => NodeKind::Argument,
            MessageNode::Number(_) => NodeKind::Number,
            MessageNode::Date(_) => NodeKind::Date,
            MessageNode::Time(_) => NodeKind::Time,
            MessageNode::Pound => NodeKind::Pound,
            MessageNode::Tag(_) => NodeKind::Tag,
            MessageNode::Plural(_) => NodeKind::Plural,
            MessageNode::Select(_) => NodeKind::Select,
        }
    }

    pub fn literal(text: &str) -> Self {
        MessageNode::Literal(text.to_string())
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, MessageNode::Literal(_))
    }
}

impl fmt::Display for MessageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageNode::Literal(text) => write!(f, "{}", text),
            MessageNode::Argument(argument) => write!(f, "{}", argument),
            MessageNode::Number(format) => format.write(f, "number"),
            MessageNode::Date(format) => format.write(f, "date"),
            MessageNode::Time(format) => format.write(f, "time"),
            MessageNode::Pound => write!(f, "#"),
            MessageNode::Tag(tag) => write!(f, "{}", tag),
            MessageNode::Plural(choice) => choice.write(f, "plural"),
            MessageNode::Select(choice) => choice.write(f, "select"),
        }
    }
}
