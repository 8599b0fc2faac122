//! Recursive descent parser for path queries.
//!
//! Follows the XPath 1.0 grammar minus variables and the namespace axis.
//! Function names and arities are checked here, so a query that can never
//! be evaluated is rejected before it touches a document.

use super::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
    Arith(Box<Expr>, ArithOp, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path(LocationPath),
    /// `primary[pred]...` optionally followed by `/steps`.
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Call(Function, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
    pub(crate) absolute: bool,
    pub(crate) steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

impl Step {
    fn abbreviated(axis: Axis) -> Step {
        Step {
            axis,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    SelfAxis,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Axis> {
        let axis = match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            "self" => Axis::SelfAxis,
            "attribute" => Axis::Attribute,
            _ => return None,
        };
        Some(axis)
    }

    /// Reverse axes count proximity positions backwards from the context node.
    pub(crate) fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeTest {
    /// `*`
    Any,
    /// `name` or `prefix:name`
    Name(String),
    /// `prefix:*`
    Prefix(String),
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()`
    ProcessingInstruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Last,
    Position,
    Count,
    Name,
    LocalName,
    String,
    Concat,
    Contains,
    StartsWith,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Not,
    True,
    False,
    Boolean,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    fn lookup(name: &str) -> Option<(Function, usize, Option<usize>)> {
        let found = match name {
            "last" => (Function::Last, 0, Some(0)),
            "position" => (Function::Position, 0, Some(0)),
            "count" => (Function::Count, 1, Some(1)),
            "name" => (Function::Name, 0, Some(1)),
            "local-name" => (Function::LocalName, 0, Some(1)),
            "string" => (Function::String, 0, Some(1)),
            "concat" => (Function::Concat, 2, None),
            "contains" => (Function::Contains, 2, Some(2)),
            "starts-with" => (Function::StartsWith, 2, Some(2)),
            "substring-before" => (Function::SubstringBefore, 2, Some(2)),
            "substring-after" => (Function::SubstringAfter, 2, Some(2)),
            "substring" => (Function::Substring, 2, Some(3)),
            "string-length" => (Function::StringLength, 0, Some(1)),
            "normalize-space" => (Function::NormalizeSpace, 0, Some(1)),
            "not" => (Function::Not, 1, Some(1)),
            "true" => (Function::True, 0, Some(0)),
            "false" => (Function::False, 0, Some(0)),
            "boolean" => (Function::Boolean, 1, Some(1)),
            "number" => (Function::Number, 0, Some(1)),
            "sum" => (Function::Sum, 1, Some(1)),
            "floor" => (Function::Floor, 1, Some(1)),
            "ceiling" => (Function::Ceiling, 1, Some(1)),
            "round" => (Function::Round, 1, Some(1)),
            _ => return None,
        };
        Some(found)
    }
}

const NODE_TYPES: [&str; 4] = ["node", "text", "comment", "processing-instruction"];

static EOF: Token = Token::Eof;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, String> {
        let expr = self.parse_or()?;
        match self.peek() {
            Token::Eof => Ok(expr),
            token => Err(format!("unexpected {:?} after expression", token)),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&EOF)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        let token = self.next();
        if token == expected {
            Ok(())
        } else {
            Err(format!("expected {:?}, found {:?}", expected, token))
        }
    }

    fn at_operator_name(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Name(n) if n == name)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.at_operator_name("or") {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality()?;
        while self.at_operator_name("and") {
            self.next();
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => CompareOp::Eq,
                Token::NotEq => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_relational()?;
            left = Expr::Compare(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => CompareOp::Lt,
                Token::LtEq => CompareOp::LtEq,
                Token::Gt => CompareOp::Gt,
                Token::GtEq => CompareOp::GtEq,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_additive()?;
            left = Expr::Compare(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_multiplicative()?;
            left = Expr::Arith(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => ArithOp::Mul,
                Token::Name(n) if n == "div" => ArithOp::Div,
                Token::Name(n) if n == "mod" => ArithOp::Mod,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_unary()?;
            left = Expr::Arith(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if *self.peek() == Token::Minus {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path_expr()?;
        while *self.peek() == Token::Pipe {
            self.next();
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn starts_location_path(&self) -> bool {
        match self.peek() {
            Token::Slash
            | Token::DoubleSlash
            | Token::Dot
            | Token::DoubleDot
            | Token::At
            | Token::Star => true,
            Token::Name(name) => match self.peek_at(1) {
                Token::LeftParen => NODE_TYPES.contains(&name.as_str()),
                _ => true,
            },
            _ => false,
        }
    }

    fn parse_path_expr(&mut self) -> Result<Expr, String> {
        if self.starts_location_path() {
            return self.parse_location_path().map(Expr::Path);
        }
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        loop {
            match self.peek() {
                Token::Slash => {
                    self.next();
                }
                Token::DoubleSlash => {
                    self.next();
                    steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                }
                _ => break,
            }
            steps.push(self.parse_step()?);
        }
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn parse_location_path(&mut self) -> Result<LocationPath, String> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Token::Slash => {
                self.next();
                // `/` alone selects the document node
                if !self.starts_step() {
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Token::DoubleSlash => {
                self.next();
                steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                true
            }
            _ => false,
        };
        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Token::Slash => {
                    self.next();
                }
                Token::DoubleSlash => {
                    self.next();
                    steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                }
                _ => break,
            }
            steps.push(self.parse_step()?);
        }
        Ok(LocationPath { absolute, steps })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Token::Dot | Token::DoubleDot | Token::At | Token::Star | Token::Name(_)
        )
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        match self.peek() {
            Token::Dot => {
                self.next();
                return Ok(Step::abbreviated(Axis::SelfAxis));
            }
            Token::DoubleDot => {
                self.next();
                return Ok(Step::abbreviated(Axis::Parent));
            }
            _ => {}
        }
        let axis_name = match (self.peek(), self.peek_at(1)) {
            (Token::Name(name), Token::DoubleColon) => Some(name.clone()),
            _ => None,
        };
        let axis = if let Some(name) = axis_name {
            self.next();
            self.next();
            match Axis::from_name(&name) {
                Some(axis) => axis,
                None if name == "namespace" => {
                    return Err("the namespace axis is not supported".to_string())
                }
                None => return Err(format!("unknown axis '{}'", name)),
            }
        } else if *self.peek() == Token::At {
            self.next();
            Axis::Attribute
        } else {
            Axis::Child
        };
        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, String> {
        match self.next() {
            Token::Star => Ok(NodeTest::Any),
            Token::Name(name) => {
                if *self.peek() == Token::LeftParen {
                    let test = match name.as_str() {
                        "node" => NodeTest::Node,
                        "text" => NodeTest::Text,
                        "comment" => NodeTest::Comment,
                        "processing-instruction" => NodeTest::ProcessingInstruction,
                        _ => return Err(format!("'{}' is not a node test", name)),
                    };
                    self.next();
                    // processing-instruction('target') is accepted, the target ignored
                    if test == NodeTest::ProcessingInstruction
                        && matches!(self.peek(), Token::Literal(_))
                    {
                        self.next();
                    }
                    self.expect(Token::RightParen)?;
                    return Ok(test);
                }
                match name.strip_suffix(":*") {
                    Some(prefix) => Ok(NodeTest::Prefix(prefix.to_string())),
                    None => Ok(NodeTest::Name(name)),
                }
            }
            token => Err(format!("expected node test, found {:?}", token)),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, String> {
        let mut predicates = Vec::new();
        while *self.peek() == Token::LeftBracket {
            self.next();
            predicates.push(self.parse_or()?);
            self.expect(Token::RightBracket)?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Token::LeftParen => {
                let expr = self.parse_or()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::Literal(value) => Ok(Expr::Literal(value)),
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::Dollar => Err("variables are not supported".to_string()),
            Token::Name(name) => {
                let (function, min, max) = Function::lookup(&name)
                    .ok_or_else(|| format!("unknown function '{}'", name))?;
                self.expect(Token::LeftParen)?;
                let mut args = Vec::new();
                if *self.peek() != Token::RightParen {
                    args.push(self.parse_or()?);
                    while *self.peek() == Token::Comma {
                        self.next();
                        args.push(self.parse_or()?);
                    }
                }
                self.expect(Token::RightParen)?;
                if args.len() < min || max.map_or(false, |max| args.len() > max) {
                    return Err(format!(
                        "wrong number of arguments for {}(): {}",
                        name,
                        args.len()
                    ));
                }
                Ok(Expr::Call(function, args))
            }
            Token::Eof => Err("unexpected end of query".to_string()),
            token => Err(format!("unexpected {:?}", token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::lexer::Lexer;

    fn parse(input: &str) -> Result<Expr, String> {
        Parser::new(Lexer::new(input).tokenize()?).parse()
    }

    #[test]
    fn test_abbreviated_path() {
        let expr = parse("//a/@b").unwrap();
        assert_eq!(
            expr,
            Expr::Path(LocationPath {
                absolute: true,
                steps: vec![
                    Step::abbreviated(Axis::DescendantOrSelf),
                    Step {
                        axis: Axis::Child,
                        test: NodeTest::Name("a".to_string()),
                        predicates: vec![],
                    },
                    Step {
                        axis: Axis::Attribute,
                        test: NodeTest::Name("b".to_string()),
                        predicates: vec![],
                    },
                ],
            })
        );
    }

    #[test]
    fn test_root_only() {
        assert_eq!(
            parse("/").unwrap(),
            Expr::Path(LocationPath {
                absolute: true,
                steps: vec![],
            })
        );
    }

    #[test]
    fn test_operators_by_position() {
        // `div` as a name test, then as an operator
        let expr = parse("div div 2").unwrap();
        assert!(matches!(expr, Expr::Arith(_, ArithOp::Div, _)));
        let expr = parse("a[b and c or not(d)]").unwrap();
        match expr {
            Expr::Path(path) => assert!(matches!(path.steps[0].predicates[0], Expr::Or(_, _))),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse("* * 2").unwrap(), Expr::Arith(_, ArithOp::Mul, _)));
    }

    #[test]
    fn test_filter_expression() {
        let expr = parse("(//a)[1]/b").unwrap();
        match expr {
            Expr::Filter {
                predicates, steps, ..
            } => {
                assert_eq!(predicates, vec![Expr::Number(1.0)]);
                assert_eq!(steps.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid() {
        for query in [
            "",
            "a[",
            "a]",
            "//",
            "a/",
            "foo()",
            "count()",
            "$x",
            "bogus::a",
            "namespace::a",
            "a b",
            "concat('a')",
        ] {
            assert!(parse(query).is_err(), "{} should not parse", query);
        }
    }
}
