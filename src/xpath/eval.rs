//! Node-set evaluation of a parsed path query against a [`Document`].

use super::parser::{ArithOp, Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};
use crate::document::{Document, Node};
use crate::element::Element;
use std::collections::HashMap;

/// Any node a query can address. Text, CDATA, comments and processing
/// instructions are addressed by their parent and position among its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum XNode {
    Element(Element),
    Attribute(Element, usize),
    Child(Element, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    /// Always sorted in document order, without duplicates.
    Nodes(Vec<XNode>),
    Boolean(bool),
    Number(f64),
    String(String),
}

struct Focus {
    node: XNode,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'d> {
    doc: &'d Document,
    top: Element,
    order: HashMap<XNode, usize>,
}

impl<'d> Evaluator<'d> {
    /// Prepare evaluation for the tree `context` belongs to. For attached
    /// elements that is the whole document; for a detached element, its subtree.
    pub(crate) fn new(doc: &'d Document, context: Element) -> Self {
        let mut top = context;
        while let Some(parent) = top.parent(doc) {
            top = parent;
        }
        let mut order = HashMap::new();
        number_nodes(doc, top, &mut order);
        Evaluator { doc, top, order }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, context: Element) -> Result<Value, String> {
        let focus = Focus {
            node: XNode::Element(context),
            position: 1,
            size: 1,
        };
        self.eval(expr, &focus)
    }

    fn eval(&self, expr: &Expr, focus: &Focus) -> Result<Value, String> {
        let value = match expr {
            Expr::Or(left, right) => Value::Boolean(
                self.eval(left, focus)?.to_bool() || self.eval(right, focus)?.to_bool(),
            ),
            Expr::And(left, right) => Value::Boolean(
                self.eval(left, focus)?.to_bool() && self.eval(right, focus)?.to_bool(),
            ),
            Expr::Compare(left, op, right) => {
                let left = self.eval(left, focus)?;
                let right = self.eval(right, focus)?;
                Value::Boolean(self.compare(&left, *op, &right))
            }
            Expr::Arith(left, op, right) => {
                let left = self.number(&self.eval(left, focus)?);
                let right = self.number(&self.eval(right, focus)?);
                Value::Number(match op {
                    ArithOp::Add => left + right,
                    ArithOp::Sub => left - right,
                    ArithOp::Mul => left * right,
                    ArithOp::Div => left / right,
                    ArithOp::Mod => left % right,
                })
            }
            Expr::Negate(inner) => Value::Number(-self.number(&self.eval(inner, focus)?)),
            Expr::Union(left, right) => {
                let mut nodes = self.node_set(left, focus)?;
                nodes.extend(self.node_set(right, focus)?);
                self.sort_unique(&mut nodes);
                Value::Nodes(nodes)
            }
            Expr::Path(path) => Value::Nodes(self.eval_path(path, focus)?),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut nodes = self.node_set(primary, focus)?;
                for predicate in predicates {
                    nodes = self.apply_predicate(nodes, predicate)?;
                }
                Value::Nodes(self.eval_steps(nodes, steps)?)
            }
            Expr::Literal(value) => Value::String(value.clone()),
            Expr::Number(value) => Value::Number(*value),
            Expr::Call(function, args) => self.call(*function, args, focus)?,
        };
        Ok(value)
    }

    fn node_set(&self, expr: &Expr, focus: &Focus) -> Result<Vec<XNode>, String> {
        match self.eval(expr, focus)? {
            Value::Nodes(nodes) => Ok(nodes),
            other => Err(format!("expected a node-set, found {}", other.type_name())),
        }
    }

    fn eval_path(&self, path: &LocationPath, focus: &Focus) -> Result<Vec<XNode>, String> {
        let start = if path.absolute {
            XNode::Element(self.top)
        } else {
            focus.node
        };
        self.eval_steps(vec![start], &path.steps)
    }

    fn eval_steps(&self, mut nodes: Vec<XNode>, steps: &[Step]) -> Result<Vec<XNode>, String> {
        for step in steps {
            nodes = self.eval_step(&nodes, step)?;
        }
        Ok(nodes)
    }

    fn eval_step(&self, contexts: &[XNode], step: &Step) -> Result<Vec<XNode>, String> {
        let mut selected = Vec::new();
        for &context in contexts {
            let mut candidates: Vec<XNode> = self
                .axis_nodes(context, step.axis)
                .into_iter()
                .filter(|node| self.node_test(*node, &step.test, step.axis))
                .collect();
            // predicates count proximity positions
            if step.axis.is_reverse() {
                candidates.reverse();
            }
            for predicate in &step.predicates {
                candidates = self.apply_predicate(candidates, predicate)?;
            }
            selected.extend(candidates);
        }
        self.sort_unique(&mut selected);
        Ok(selected)
    }

    fn apply_predicate(&self, nodes: Vec<XNode>, predicate: &Expr) -> Result<Vec<XNode>, String> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (index, node) in nodes.into_iter().enumerate() {
            let focus = Focus {
                node,
                position: index + 1,
                size,
            };
            let keep = match self.eval(predicate, &focus)? {
                Value::Number(n) => n == focus.position as f64,
                value => value.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    fn sort_unique(&self, nodes: &mut Vec<XNode>) {
        nodes.sort_by_key(|node| self.order.get(node).copied().unwrap_or(usize::MAX));
        nodes.dedup();
    }
}

// Axes and node tests
impl<'d> Evaluator<'d> {
    /// Nodes on `axis` from `node`, in document order.
    fn axis_nodes(&self, node: XNode, axis: Axis) -> Vec<XNode> {
        match axis {
            Axis::Child => match node {
                XNode::Element(elem) => self.children_of(elem),
                _ => Vec::new(),
            },
            Axis::Descendant => {
                let mut out = Vec::new();
                self.descendants(node, &mut out);
                out
            }
            Axis::DescendantOrSelf => {
                let mut out = vec![node];
                self.descendants(node, &mut out);
                out
            }
            Axis::Parent => self.parent_of(node).into_iter().collect(),
            Axis::Ancestor => {
                let mut out = self.ancestors(node);
                out.reverse();
                out
            }
            Axis::AncestorOrSelf => {
                let mut out = self.ancestors(node);
                out.reverse();
                out.push(node);
                out
            }
            Axis::FollowingSibling => self.following_siblings(node),
            Axis::PrecedingSibling => self.preceding_siblings(node),
            Axis::Following => {
                let mut out = Vec::new();
                let mut current = node;
                if let XNode::Attribute(elem, _) = node {
                    self.descendants(XNode::Element(elem), &mut out);
                    current = XNode::Element(elem);
                }
                loop {
                    for sibling in self.following_siblings(current) {
                        out.push(sibling);
                        self.descendants(sibling, &mut out);
                    }
                    match self.parent_of(current) {
                        Some(parent) => current = parent,
                        None => return out,
                    }
                }
            }
            Axis::Preceding => {
                let mut out = Vec::new();
                let mut current = match node {
                    XNode::Attribute(elem, _) => XNode::Element(elem),
                    node => node,
                };
                loop {
                    // collected backwards, flipped at the end
                    for sibling in self.preceding_siblings(current).into_iter().rev() {
                        let mut subtree = Vec::new();
                        self.descendants(sibling, &mut subtree);
                        out.extend(subtree.into_iter().rev());
                        out.push(sibling);
                    }
                    match self.parent_of(current) {
                        Some(parent) => current = parent,
                        None => {
                            out.reverse();
                            return out;
                        }
                    }
                }
            }
            Axis::SelfAxis => vec![node],
            Axis::Attribute => match node {
                XNode::Element(elem) if !elem.is_container() => (0..elem
                    .attributes(self.doc)
                    .len())
                    .map(|index| XNode::Attribute(elem, index))
                    .collect(),
                _ => Vec::new(),
            },
        }
    }

    fn children_of(&self, elem: Element) -> Vec<XNode> {
        elem.children(self.doc)
            .iter()
            .enumerate()
            .map(|(index, child)| match child {
                Node::Element(child) => XNode::Element(*child),
                _ => XNode::Child(elem, index),
            })
            .collect()
    }

    fn descendants(&self, node: XNode, out: &mut Vec<XNode>) {
        if let XNode::Element(elem) = node {
            for child in self.children_of(elem) {
                out.push(child);
                self.descendants(child, out);
            }
        }
    }

    fn parent_of(&self, node: XNode) -> Option<XNode> {
        match node {
            XNode::Element(elem) => elem.parent(self.doc).map(XNode::Element),
            XNode::Attribute(elem, _) | XNode::Child(elem, _) => Some(XNode::Element(elem)),
        }
    }

    fn ancestors(&self, node: XNode) -> Vec<XNode> {
        let mut out = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent_of(current) {
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Siblings of `node` and its index among them. Attributes have none.
    fn siblings(&self, node: XNode) -> Option<(Vec<XNode>, usize)> {
        let (parent, index) = match node {
            XNode::Element(elem) => {
                let parent = elem.parent(self.doc)?;
                let index = parent
                    .children(self.doc)
                    .iter()
                    .position(|child| child.as_element() == Some(elem))?;
                (parent, index)
            }
            XNode::Child(parent, index) => (parent, index),
            XNode::Attribute(_, _) => return None,
        };
        Some((self.children_of(parent), index))
    }

    fn following_siblings(&self, node: XNode) -> Vec<XNode> {
        match self.siblings(node) {
            Some((siblings, index)) => siblings.into_iter().skip(index + 1).collect(),
            None => Vec::new(),
        }
    }

    fn preceding_siblings(&self, node: XNode) -> Vec<XNode> {
        match self.siblings(node) {
            Some((siblings, index)) => siblings.into_iter().take(index).collect(),
            None => Vec::new(),
        }
    }

    fn child_node(&self, parent: Element, index: usize) -> Option<&'d Node> {
        parent.children(self.doc).get(index)
    }

    fn node_test(&self, node: XNode, test: &NodeTest, axis: Axis) -> bool {
        let principal = match (node, axis) {
            (XNode::Attribute(_, _), Axis::Attribute) => true,
            (XNode::Element(elem), axis) => axis != Axis::Attribute && !elem.is_container(),
            _ => false,
        };
        match test {
            NodeTest::Node => true,
            NodeTest::Any => principal,
            NodeTest::Name(name) => principal && self.name(node) == name,
            NodeTest::Prefix(prefix) => {
                principal
                    && self
                        .name(node)
                        .split_once(':')
                        .map_or(false, |(p, _)| p == prefix)
            }
            NodeTest::Text => match node {
                XNode::Child(parent, index) => matches!(
                    self.child_node(parent, index),
                    Some(Node::Text(_)) | Some(Node::CData(_))
                ),
                _ => false,
            },
            NodeTest::Comment => match node {
                XNode::Child(parent, index) => {
                    matches!(self.child_node(parent, index), Some(Node::Comment(_)))
                }
                _ => false,
            },
            NodeTest::ProcessingInstruction => match node {
                XNode::Child(parent, index) => {
                    matches!(self.child_node(parent, index), Some(Node::PI(_)))
                }
                _ => false,
            },
        }
    }

    fn name(&self, node: XNode) -> &'d str {
        match node {
            XNode::Element(elem) => elem.name(self.doc),
            XNode::Attribute(elem, index) => elem
                .attributes(self.doc)
                .get_index(index)
                .map_or("", |(name, _)| name.as_str()),
            XNode::Child(parent, index) => match self.child_node(parent, index) {
                Some(Node::PI(content)) => content.split_whitespace().next().unwrap_or(""),
                _ => "",
            },
        }
    }

    fn string_value(&self, node: XNode) -> String {
        match node {
            XNode::Element(elem) => elem.text_content(self.doc),
            XNode::Attribute(elem, index) => elem
                .attributes(self.doc)
                .get_index(index)
                .map_or_else(String::new, |(_, value)| value.clone()),
            XNode::Child(parent, index) => match self.child_node(parent, index) {
                Some(Node::Text(text))
                | Some(Node::CData(text))
                | Some(Node::Comment(text)) => text.clone(),
                Some(Node::PI(content)) => content
                    .trim_start()
                    .split_once(char::is_whitespace)
                    .map_or_else(String::new, |(_, data)| data.trim_start().to_string()),
                _ => String::new(),
            },
        }
    }
}

// Conversions, comparisons and functions
impl<'d> Evaluator<'d> {
    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map_or_else(String::new, |node| self.string_value(*node)),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Boolean(true) => 1.0,
            Value::Boolean(false) => 0.0,
            value => parse_number(&self.string(value)),
        }
    }

    fn compare(&self, left: &Value, op: CompareOp, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(_), Value::Boolean(_)) | (Value::Boolean(_), Value::Nodes(_)) => {
                compare_atomic(
                    op,
                    &Value::Boolean(left.to_bool()),
                    &Value::Boolean(right.to_bool()),
                )
            }
            (Value::Nodes(left), Value::Nodes(right)) => left.iter().any(|l| {
                let l = Value::String(self.string_value(*l));
                right
                    .iter()
                    .any(|r| compare_atomic(op, &l, &Value::String(self.string_value(*r))))
            }),
            (Value::Nodes(left), right) => left
                .iter()
                .any(|l| compare_atomic(op, &Value::String(self.string_value(*l)), right)),
            (left, Value::Nodes(right)) => right
                .iter()
                .any(|r| compare_atomic(op, left, &Value::String(self.string_value(*r)))),
            (left, right) => compare_atomic(op, left, right),
        }
    }

    fn call(&self, function: Function, args: &[Expr], focus: &Focus) -> Result<Value, String> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, focus)?);
        }
        let string_arg = |index: usize| -> String {
            match values.get(index) {
                Some(value) => self.string(value),
                None => self.string_value(focus.node),
            }
        };
        let nodes_arg = |index: usize| -> Result<Vec<XNode>, String> {
            match values.get(index) {
                Some(Value::Nodes(nodes)) => Ok(nodes.clone()),
                Some(other) => Err(format!("expected a node-set, found {}", other.type_name())),
                None => Ok(vec![focus.node]),
            }
        };
        let value = match function {
            Function::Last => Value::Number(focus.size as f64),
            Function::Position => Value::Number(focus.position as f64),
            Function::Count => Value::Number(nodes_arg(0)?.len() as f64),
            Function::Name => Value::String(
                nodes_arg(0)?
                    .first()
                    .map_or_else(String::new, |node| self.name(*node).to_string()),
            ),
            Function::LocalName => Value::String(nodes_arg(0)?.first().map_or_else(
                String::new,
                |node| {
                    let name = self.name(*node);
                    name.split_once(':')
                        .map_or(name, |(_, local)| local)
                        .to_string()
                },
            )),
            Function::String => Value::String(string_arg(0)),
            Function::Concat => Value::String(values.iter().map(|v| self.string(v)).collect()),
            Function::Contains => Value::Boolean(string_arg(0).contains(&string_arg(1))),
            Function::StartsWith => Value::Boolean(string_arg(0).starts_with(&string_arg(1))),
            Function::SubstringBefore => {
                let haystack = string_arg(0);
                Value::String(
                    haystack
                        .split_once(string_arg(1).as_str())
                        .map_or_else(String::new, |(before, _)| before.to_string()),
                )
            }
            Function::SubstringAfter => {
                let haystack = string_arg(0);
                Value::String(
                    haystack
                        .split_once(string_arg(1).as_str())
                        .map_or_else(String::new, |(_, after)| after.to_string()),
                )
            }
            Function::Substring => {
                let start = round(self.number(&values[1]));
                let end = values.get(2).map(|len| start + round(self.number(len)));
                let text: String = string_arg(0)
                    .chars()
                    .enumerate()
                    .filter(|(index, _)| {
                        let position = (*index + 1) as f64;
                        position >= start && end.map_or(true, |end| position < end)
                    })
                    .map(|(_, c)| c)
                    .collect();
                Value::String(text)
            }
            Function::StringLength => Value::Number(string_arg(0).chars().count() as f64),
            Function::NormalizeSpace => Value::String(
                string_arg(0)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Function::Not => Value::Boolean(!values[0].to_bool()),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Boolean => Value::Boolean(values[0].to_bool()),
            Function::Number => Value::Number(match values.first() {
                Some(value) => self.number(value),
                None => parse_number(&self.string_value(focus.node)),
            }),
            Function::Sum => Value::Number(
                nodes_arg(0)?
                    .iter()
                    .map(|node| parse_number(&self.string_value(*node)))
                    .sum(),
            ),
            Function::Floor => Value::Number(self.number(&values[0]).floor()),
            Function::Ceiling => Value::Number(self.number(&values[0]).ceil()),
            Function::Round => Value::Number(round(self.number(&values[0]))),
        };
        Ok(value)
    }
}

impl Value {
    pub(crate) fn to_bool(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Nodes(_) => "node-set",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }
}

// Neither side is a node-set.
fn compare_atomic(op: CompareOp, left: &Value, right: &Value) -> bool {
    fn as_number(value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Boolean(true) => 1.0,
            Value::Boolean(false) => 0.0,
            Value::String(s) => parse_number(s),
            Value::Nodes(_) => f64::NAN,
        }
    }
    fn as_string(value: &Value) -> String {
        match value {
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Nodes(_) => String::new(),
        }
    }
    match op {
        CompareOp::Eq | CompareOp::NotEq => {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => left.to_bool() == right.to_bool(),
                (Value::Number(_), _) | (_, Value::Number(_)) => as_number(left) == as_number(right),
                _ => as_string(left) == as_string(right),
            };
            if op == CompareOp::Eq {
                equal
            } else {
                !equal
            }
        }
        CompareOp::Lt => as_number(left) < as_number(right),
        CompareOp::LtEq => as_number(left) <= as_number(right),
        CompareOp::Gt => as_number(left) > as_number(right),
        CompareOp::GtEq => as_number(left) >= as_number(right),
    }
}

fn number_nodes(doc: &Document, elem: Element, order: &mut HashMap<XNode, usize>) {
    order.insert(XNode::Element(elem), order.len());
    for index in 0..elem.attributes(doc).len() {
        order.insert(XNode::Attribute(elem, index), order.len());
    }
    for (index, child) in elem.children(doc).iter().enumerate() {
        match child {
            Node::Element(child) => number_nodes(doc, *child, order),
            _ => {
                order.insert(XNode::Child(elem, index), order.len());
            }
        }
    }
}

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    let digits = s.strip_prefix('-').unwrap_or(s);
    let valid = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits != ".";
    if valid {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn round(n: f64) -> f64 {
    (n + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_number() {
        assert_eq!(parse_number(" 12 "), 12.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("").is_nan());
        assert!(parse_number(".").is_nan());
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
    }

    #[test]
    fn test_compare_atomic() {
        let one = Value::Number(1.0);
        let text = Value::String("1".to_string());
        assert!(compare_atomic(CompareOp::Eq, &one, &text));
        assert!(compare_atomic(
            CompareOp::Eq,
            &Value::Boolean(true),
            &Value::String("x".to_string())
        ));
        assert!(compare_atomic(
            CompareOp::NotEq,
            &Value::Number(f64::NAN),
            &Value::Number(f64::NAN)
        ));
        assert!(compare_atomic(CompareOp::Lt, &text, &Value::Number(2.0)));
    }

    #[test]
    fn test_document_order() {
        let doc = Document::parse_str(r#"<a x="1"><b>t</b><c/></a>"#).unwrap();
        let root = doc.root();
        let eval = Evaluator::new(&doc, root);
        let b = root.child_elements(&doc)[0];
        let c = root.child_elements(&doc)[1];
        let mut nodes = vec![
            XNode::Element(c),
            XNode::Child(b, 0),
            XNode::Attribute(root, 0),
            XNode::Element(b),
            XNode::Element(c),
        ];
        eval.sort_unique(&mut nodes);
        assert_eq!(
            nodes,
            vec![
                XNode::Attribute(root, 0),
                XNode::Element(b),
                XNode::Child(b, 0),
                XNode::Element(c),
            ]
        );
    }
}
