//! Recursive-descent parser producing an `xform_ast::Module`.
//!
//! Expression precedence (low to high): the four control forms (`if`,
//! `let`, `for`, `match`) sit above `or`, `and`, equality, relational,
//! additive, multiplicative, unary, then primary. Element constructors
//! switch the lexer into raw character-data mode for their body and back
//! into token mode for nested `{expr}` holes and nested constructors —
//! see `Lexer::flush`/`set_pos`.

use xform_ast::{
    Axis, BinaryOp, Constructor, Expr, FunctionDef, Literal, Module, Param, Pattern, PathExpr,
    PathStart, PathStep, RuleDef, StepTest, TypedPatternKind, UnaryOp,
};

use crate::error::ParseError;
use crate::lexer::{Lexer, TokenKind};

pub struct Parser {
    lexer: Lexer,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(text: &str) -> Self {
        Parser { lexer: Lexer::new(text) }
    }

    /// Resolves a char offset to a `Location` for an error being raised
    /// right now — kept as a one-line indirection so call sites read
    /// `self.loc(tok.pos)` rather than reaching into the lexer directly.
    fn loc(&self, pos: usize) -> crate::error::Location {
        self.lexer.location(pos)
    }

    pub fn parse_module(&mut self) -> PResult<Module> {
        let mut module = Module::default();
        self.parse_prologue(&mut module)?;

        loop {
            let tok = self.lexer.peek()?;
            match (tok.kind, tok.value.as_str()) {
                (TokenKind::Kw, "ns") => self.parse_ns_decl(&mut module)?,
                (TokenKind::Kw, "import") => self.parse_import_decl(&mut module)?,
                (TokenKind::Kw, "var") => self.parse_var_decl(&mut module)?,
                (TokenKind::Kw, "def") => self.parse_def_decl(&mut module)?,
                (TokenKind::Kw, "rule") => self.parse_rule_decl(&mut module)?,
                _ => break,
            }
        }

        if self.lexer.peek()?.kind != TokenKind::Eof {
            module.expr = Some(self.parse_expr()?);
            let trailing = self.lexer.peek()?;
            if trailing.kind != TokenKind::Eof {
                return Err(ParseError::syntax(
                    self.loc(trailing.pos),
                    "trailing tokens after top-level expression",
                ));
            }
        }
        Ok(module)
    }

    fn parse_prologue(&mut self, _module: &mut Module) -> PResult<()> {
        let tok = self.lexer.peek()?;
        if !tok.is(TokenKind::Kw, "xform") {
            return Ok(());
        }
        let pos = tok.pos;
        self.lexer.next()?;
        self.expect_kw("version")?;
        let version = self.expect_kind(TokenKind::Str)?;
        if version.value != "2.0" {
            return Err(ParseError::UnsupportedVersion { location: self.loc(pos) });
        }
        self.expect_punct(";")?;
        Ok(())
    }

    fn parse_ns_decl(&mut self, module: &mut Module) -> PResult<()> {
        self.expect_kw("ns")?;
        let prefix = self.expect_kind(TokenKind::Str)?.value;
        self.expect_op("=")?;
        let uri = self.expect_kind(TokenKind::Str)?.value;
        self.expect_punct(";")?;
        module.namespaces.insert(prefix, uri);
        Ok(())
    }

    fn parse_import_decl(&mut self, module: &mut Module) -> PResult<()> {
        self.expect_kw("import")?;
        let uri = self.expect_kind(TokenKind::Str)?.value;
        let alias = if self.try_kw("as")? {
            Some(self.expect_kind(TokenKind::Ident)?.value)
        } else {
            None
        };
        self.expect_punct(";")?;
        module.imports.push((uri, alias));
        Ok(())
    }

    fn parse_var_decl(&mut self, module: &mut Module) -> PResult<()> {
        self.expect_kw("var")?;
        let name = self.expect_kind(TokenKind::Ident)?.value;
        self.expect_op(":=")?;
        let value = self.parse_expr()?;
        self.expect_punct(";")?;
        module.vars.push((name, value));
        Ok(())
    }

    fn parse_def_decl(&mut self, module: &mut Module) -> PResult<()> {
        self.expect_kw("def")?;
        let name = self.expect_kind(TokenKind::Ident)?.value;
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.peek_is_punct(")") {
            loop {
                params.push(self.parse_param()?);
                if !self.try_punct(",")? {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        self.expect_op(":=")?;
        let body = self.parse_expr()?;
        self.expect_punct(";")?;
        module.functions.insert(name, FunctionDef { params, body });
        Ok(())
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let name = self.expect_kind(TokenKind::Ident)?.value;
        let type_ref = if self.try_punct(":")? {
            Some(self.expect_kind(TokenKind::Ident)?.value)
        } else {
            None
        };
        let default = if self.try_op(":=")? { Some(self.parse_expr()?) } else { None };
        Ok(Param { name, type_ref, default })
    }

    /// `rule qname match pattern := expr;` — one rule per declaration;
    /// declarations sharing a `qname` append to that rule set in source order.
    fn parse_rule_decl(&mut self, module: &mut Module) -> PResult<()> {
        self.expect_kw("rule")?;
        let name = self.expect_kind(TokenKind::Ident)?.value;
        self.expect_kw("match")?;
        let pattern = self.parse_pattern()?;
        self.expect_op(":=")?;
        let body = self.parse_expr()?;
        self.expect_punct(";")?;
        module.rules.entry(name).or_default().push(RuleDef { pattern, body });
        Ok(())
    }

    // --- expressions ---

    fn parse_expr(&mut self) -> PResult<Expr> {
        let tok = self.lexer.peek()?;
        match (tok.kind, tok.value.as_str()) {
            (TokenKind::Kw, "if") => self.parse_if(),
            (TokenKind::Kw, "let") => self.parse_let(),
            (TokenKind::Kw, "for") => self.parse_for(),
            (TokenKind::Kw, "match") => self.parse_match(),
            _ => self.parse_or(),
        }
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        self.expect_kw("if")?;
        self.expect_punct("(")?;
        let cond = self.parse_expr()?;
        self.expect_punct(")")?;
        self.expect_kw("then")?;
        let then_branch = self.parse_expr()?;
        self.expect_kw("else")?;
        let else_branch = self.parse_expr()?;
        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn parse_let(&mut self) -> PResult<Expr> {
        self.expect_kw("let")?;
        let name = self.expect_kind(TokenKind::Ident)?.value;
        self.expect_op(":=")?;
        let value = self.parse_expr()?;
        self.expect_kw("in")?;
        let body = self.parse_expr()?;
        Ok(Expr::Let { name, value: Box::new(value), body: Box::new(body) })
    }

    fn parse_for(&mut self) -> PResult<Expr> {
        self.expect_kw("for")?;
        let name = self.expect_kind(TokenKind::Ident)?.value;
        self.expect_kw("in")?;
        let seq = self.parse_expr()?;
        let where_clause = if self.try_kw("where")? { Some(Box::new(self.parse_expr()?)) } else { None };
        self.expect_kw("return")?;
        let body = self.parse_expr()?;
        Ok(Expr::For { name, seq: Box::new(seq), where_clause, body: Box::new(body) })
    }

    /// `match target: case pat => expr; … default => expr;` — no enclosing
    /// parens or braces; the case/default list runs until neither keyword
    /// starts the next token.
    fn parse_match(&mut self) -> PResult<Expr> {
        self.expect_kw("match")?;
        let target = self.parse_expr()?;
        self.expect_punct(":")?;
        let mut cases = Vec::new();
        let mut default = None;
        loop {
            if self.try_kw("default")? {
                self.expect_op("=")?;
                self.expect_op(">")?;
                default = Some(Box::new(self.parse_expr()?));
                self.expect_punct(";")?;
                continue;
            }
            if self.try_kw("case")? {
                let pattern = self.parse_pattern()?;
                self.expect_op("=")?;
                self.expect_op(">")?;
                let body = self.parse_expr()?;
                self.expect_punct(";")?;
                cases.push((pattern, body));
                continue;
            }
            break;
        }
        Ok(Expr::Match { target: Box::new(target), cases, default })
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.try_kw("or")? {
            let right = self.parse_and()?;
            left = Expr::Binary { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_eq()?;
        while self.try_kw("and")? {
            let right = self.parse_eq()?;
            left = Expr::Binary { op: BinaryOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_eq(&mut self) -> PResult<Expr> {
        let mut left = self.parse_rel()?;
        loop {
            let op = if self.try_op("=")? {
                BinaryOp::Eq
            } else if self.try_op("!=")? {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.parse_rel()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_rel(&mut self) -> PResult<Expr> {
        let mut left = self.parse_add()?;
        loop {
            let op = if self.try_op("<=")? {
                BinaryOp::Le
            } else if self.try_op(">=")? {
                BinaryOp::Ge
            } else if self.try_op("<")? {
                BinaryOp::Lt
            } else if self.try_op(">")? {
                BinaryOp::Gt
            } else {
                break;
            };
            let right = self.parse_add()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> PResult<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = if self.try_op("+")? {
                BinaryOp::Add
            } else if self.try_op("-")? {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_mul()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.try_op("*")? {
                BinaryOp::Mul
            } else if self.try_kw("div")? {
                BinaryOp::Div
            } else if self.try_kw("mod")? {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.try_op("-")? {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnaryOp::Neg, expr: Box::new(expr) });
        }
        if self.try_kw("not")? {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnaryOp::Not, expr: Box::new(expr) });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.lexer.peek()?;
        match tok.kind {
            TokenKind::Number => {
                self.lexer.next()?;
                let n: f64 = tok.value.parse().map_err(|_| {
                    ParseError::syntax(self.loc(tok.pos), format!("invalid number literal {:?}", tok.value))
                })?;
                Ok(Expr::Literal(Literal::Number(n)))
            }
            TokenKind::Str => {
                self.lexer.next()?;
                Ok(Expr::Literal(Literal::Str(tok.value)))
            }
            TokenKind::Punct if tok.value == "(" => {
                self.lexer.next()?;
                if self.peek_is_punct(")") {
                    self.lexer.next()?;
                    // `()` denotes the empty sequence.
                    return Ok(Expr::FuncCall { name: "seq".to_string(), args: Vec::new() });
                }
                let expr = self.parse_expr()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            TokenKind::Op if tok.value == "<" => self.parse_constructor(),
            TokenKind::Dot | TokenKind::Slash => {
                let path = self.parse_path(None)?;
                Ok(Expr::Path(path))
            }
            TokenKind::At => {
                let path = self.parse_path(Some(PathStart::Context))?;
                Ok(Expr::Path(path))
            }
            TokenKind::Ident if tok.value == "text" => {
                let cp = self.lexer.checkpoint();
                self.lexer.next()?;
                if self.peek_is_punct("{") {
                    self.lexer.next()?;
                    let expr = self.parse_expr()?;
                    self.expect_punct("}")?;
                    Ok(Expr::TextConstructor(Box::new(expr)))
                } else {
                    self.lexer.restore(cp);
                    self.parse_ident_primary()
                }
            }
            TokenKind::Ident => self.parse_ident_primary(),
            _ => Err(ParseError::syntax(self.loc(tok.pos), format!("unexpected token {:?}", tok.value))),
        }
    }

    fn parse_ident_primary(&mut self) -> PResult<Expr> {
        let name_tok = self.lexer.next()?;
        let name = name_tok.value;
        if self.peek_is_punct("(") {
            self.lexer.next()?;
            let mut args = Vec::new();
            if !self.peek_is_punct(")") {
                loop {
                    args.push(self.parse_expr()?);
                    if !self.try_punct(",")? {
                        break;
                    }
                }
            }
            self.expect_punct(")")?;
            return Ok(Expr::FuncCall { name, args });
        }
        let next = self.lexer.peek()?;
        if matches!(next.kind, TokenKind::Slash | TokenKind::At)
            || (next.kind == TokenKind::Dot && next.value != ".")
        {
            let path = self.parse_path(Some(PathStart::Var(name)))?;
            return Ok(Expr::Path(path));
        }
        Ok(Expr::VarRef(name))
    }

    // --- paths ---

    /// `start == None` means the path's leading token has not been
    /// consumed yet and must be resolved directly off the lexer (not
    /// peeked): a bare leading `..` degrades to the same `PathStart::Context`
    /// as a bare `.`, since only the continuation loop (for `..` encountered
    /// after the start is already resolved) distinguishes the parent axis.
    fn parse_path(&mut self, start: Option<PathStart>) -> PResult<PathExpr> {
        let start = match start {
            Some(s) => s,
            None => {
                let tok = self.lexer.next()?;
                match tok.kind {
                    TokenKind::Dot => {
                        if tok.value == ".//" {
                            PathStart::Desc
                        } else {
                            PathStart::Context
                        }
                    }
                    TokenKind::Slash => {
                        if tok.value == "//" {
                            PathStart::DescRoot
                        } else {
                            PathStart::Root
                        }
                    }
                    _ => return Err(ParseError::syntax(self.loc(tok.pos), "expected path start")),
                }
            }
        };

        let mut steps = Vec::new();

        // An optional first step immediately follows the start, with no
        // separator token, for `/name`, `.//name`, `@attr`, `name/...`.
        if self.at_step_start()? {
            steps.push(self.parse_first_step()?);
        }

        loop {
            let tok = self.lexer.peek()?;
            match tok.kind {
                TokenKind::Slash => {
                    self.lexer.next()?;
                    let axis = if tok.value == "//" { Axis::Desc } else { Axis::Child };
                    let test = self.parse_step_test()?;
                    let predicates = self.parse_predicates()?;
                    steps.push(PathStep { axis, test, predicates });
                }
                TokenKind::Dot => {
                    self.lexer.next()?;
                    let axis = match tok.value.as_str() {
                        ".." => Axis::Parent,
                        "." => Axis::SelfAxis,
                        _ => Axis::DescOrSelf,
                    };
                    let test = if axis == Axis::DescOrSelf {
                        self.parse_step_test()?
                    } else {
                        StepTest::NodeTest
                    };
                    let predicates = self.parse_predicates()?;
                    steps.push(PathStep { axis, test, predicates });
                }
                TokenKind::At => {
                    self.lexer.next()?;
                    let test = self.parse_step_test()?;
                    let predicates = self.parse_predicates()?;
                    steps.push(PathStep { axis: Axis::Attr, test, predicates });
                }
                _ => break,
            }
        }

        Ok(PathExpr { start, steps })
    }

    fn at_step_start(&mut self) -> PResult<bool> {
        let tok = self.lexer.peek()?;
        Ok(matches!(tok.kind, TokenKind::Ident | TokenKind::At) || (tok.kind == TokenKind::Op && tok.value == "*"))
    }

    fn parse_first_step(&mut self) -> PResult<PathStep> {
        let tok = self.lexer.peek()?;
        if tok.kind == TokenKind::At {
            self.lexer.next()?;
            let test = self.parse_step_test()?;
            let predicates = self.parse_predicates()?;
            return Ok(PathStep { axis: Axis::Attr, test, predicates });
        }
        let test = self.parse_step_test()?;
        let predicates = self.parse_predicates()?;
        Ok(PathStep { axis: Axis::Child, test, predicates })
    }

    fn parse_step_test(&mut self) -> PResult<StepTest> {
        let tok = self.lexer.peek()?;
        if tok.kind == TokenKind::Op && tok.value == "*" {
            self.lexer.next()?;
            return Ok(StepTest::Wildcard);
        }
        if tok.kind == TokenKind::Ident {
            let cp = self.lexer.checkpoint();
            self.lexer.next()?;
            if self.peek_is_punct("(") {
                let is_typed = matches!(tok.value.as_str(), "text" | "node" | "comment" | "pi");
                if is_typed {
                    self.lexer.next()?;
                    self.expect_punct(")")?;
                    return Ok(match tok.value.as_str() {
                        "text" => StepTest::TextTest,
                        "node" => StepTest::NodeTest,
                        "comment" => StepTest::CommentTest,
                        _ => StepTest::PiTest,
                    });
                }
            }
            self.lexer.restore(cp);
        }
        let name = self.expect_kind(TokenKind::Ident)?.value;
        Ok(StepTest::Name(name))
    }

    fn parse_predicates(&mut self) -> PResult<Vec<Expr>> {
        let mut preds = Vec::new();
        while self.peek_is_punct("[") {
            self.lexer.next()?;
            preds.push(self.parse_expr()?);
            self.expect_punct("]")?;
        }
        Ok(preds)
    }

    // --- patterns ---

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        let tok = self.lexer.peek()?;
        match tok.kind {
            TokenKind::At => {
                self.lexer.next()?;
                let name = self.expect_kind(TokenKind::Ident)?.value;
                Ok(Pattern::Attribute(name))
            }
            TokenKind::Ident if tok.value == "_" => {
                self.lexer.next()?;
                Ok(Pattern::Wildcard)
            }
            TokenKind::Ident if matches!(tok.value.as_str(), "node" | "text" | "comment") => {
                self.lexer.next()?;
                self.expect_punct("(")?;
                self.expect_punct(")")?;
                let kind = match tok.value.as_str() {
                    "node" => TypedPatternKind::Node,
                    "text" => TypedPatternKind::Text,
                    _ => TypedPatternKind::Comment,
                };
                Ok(Pattern::Typed(kind))
            }
            TokenKind::Op if tok.value == "*" => {
                self.lexer.next()?;
                Ok(Pattern::Wildcard)
            }
            TokenKind::Op if tok.value == "<" => self.parse_element_pattern(),
            _ => Err(ParseError::syntax(self.loc(tok.pos), format!("unexpected pattern token {:?}", tok.value))),
        }
    }

    fn parse_element_pattern(&mut self) -> PResult<Pattern> {
        self.expect_op("<")?;
        let name = self.expect_kind(TokenKind::Ident)?.value;
        self.expect_op(">")?;
        let (var, child) = if self.peek_is_punct("{") {
            self.lexer.next()?;
            let var = self.expect_kind(TokenKind::Ident)?.value;
            self.expect_punct("}")?;
            (Some(var), None)
        } else if self.lexer.peek()?.kind == TokenKind::Op && self.lexer.peek()?.value == "<" {
            let child = self.parse_pattern()?;
            (None, Some(Box::new(child)))
        } else {
            (None, None)
        };
        self.expect_op("<")?;
        self.lexer.expect(TokenKind::Slash, Some("/"))?;
        let close_name = self.expect_kind(TokenKind::Ident)?.value;
        if close_name != name {
            return Err(ParseError::syntax(
                self.loc(self.lexer.pos()),
                format!("mismatched closing tag: expected {name}, found {close_name}"),
            ));
        }
        self.expect_op(">")?;
        Ok(Pattern::Element { name, var, child })
    }

    // --- element constructors ---

    fn parse_constructor(&mut self) -> PResult<Expr> {
        self.expect_op("<")?;
        let name = self.expect_kind(TokenKind::Ident)?.value;

        let mut attrs = Vec::new();
        while self.lexer.peek()?.kind == TokenKind::Ident {
            let attr_name = self.lexer.next()?.value;
            self.expect_op("=")?;
            self.expect_punct("{")?;
            let value = self.parse_expr()?;
            self.expect_punct("}")?;
            attrs.push((attr_name, value));
        }

        if self.lexer.peek()?.kind == TokenKind::Slash && self.lexer.peek()?.value == "/" {
            self.lexer.next()?;
            self.expect_op(">")?;
            return Ok(Expr::Constructor(Constructor { name, attrs, contents: Vec::new() }));
        }
        self.expect_op(">")?;

        let contents = self.parse_constructor_body(&name)?;
        Ok(Expr::Constructor(Constructor { name, attrs, contents }))
    }

    /// Reads raw character data directly from the source buffer, switching
    /// back into token mode only for `{expr}` holes, nested constructors,
    /// and nested `text{expr}` constructors. Stops at the matching `</name>`.
    fn parse_constructor_body(&mut self, name: &str) -> PResult<Vec<Expr>> {
        self.lexer.flush();
        let mut contents = Vec::new();
        loop {
            if self.lexer.raw_starts_with("</") {
                break;
            }
            if self.lexer.at_end() {
                return Err(ParseError::syntax(self.loc(self.lexer.pos()), format!("unterminated element <{name}>")));
            }
            if self.lexer.raw_starts_with("text{") {
                for _ in 0.."text".len() {
                    self.lexer.advance_raw();
                }
                self.expect_punct("{")?;
                let expr = self.parse_expr()?;
                self.expect_punct("}")?;
                self.lexer.flush();
                contents.push(Expr::TextConstructor(Box::new(expr)));
                continue;
            }
            match self.lexer.peek_raw_char() {
                Some('<') => {
                    let nested = self.parse_constructor()?;
                    self.lexer.flush();
                    contents.push(nested);
                }
                Some('{') => {
                    self.lexer.advance_raw();
                    let expr = self.parse_expr()?;
                    self.expect_punct("}")?;
                    self.lexer.flush();
                    contents.push(Expr::Interp(Box::new(expr)));
                }
                _ => {
                    let text = self.read_char_data();
                    if !text.trim().is_empty() {
                        contents.push(Expr::Text(text));
                    }
                }
            }
        }
        self.read_end_tag(name)?;
        Ok(contents)
    }

    fn read_char_data(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.lexer.peek_raw_char() {
            if ch == '<' || ch == '{' {
                break;
            }
            out.push(ch);
            self.lexer.advance_raw();
        }
        out
    }

    fn read_end_tag(&mut self, name: &str) -> PResult<()> {
        self.lexer.advance_raw();
        self.lexer.advance_raw();
        let mut found = String::new();
        while let Some(ch) = self.lexer.peek_raw_char() {
            if ch == '>' {
                break;
            }
            found.push(ch);
            self.lexer.advance_raw();
        }
        if found.trim() != name {
            return Err(ParseError::syntax(
                self.loc(self.lexer.pos()),
                format!("mismatched closing tag: expected {name}, found {}", found.trim()),
            ));
        }
        if self.lexer.peek_raw_char() != Some('>') {
            return Err(ParseError::syntax(self.loc(self.lexer.pos()), "unterminated end tag"));
        }
        self.lexer.advance_raw();
        self.lexer.set_pos(self.lexer.pos());
        Ok(())
    }

    // --- token helpers ---

    fn expect_kw(&mut self, value: &str) -> PResult<()> {
        self.lexer.expect(TokenKind::Kw, Some(value)).map(|_| ())
    }

    fn try_kw(&mut self, value: &str) -> PResult<bool> {
        let tok = self.lexer.peek()?;
        if tok.is(TokenKind::Kw, value) {
            self.lexer.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_punct(&mut self, value: &str) -> PResult<()> {
        self.lexer.expect(TokenKind::Punct, Some(value)).map(|_| ())
    }

    fn try_punct(&mut self, value: &str) -> PResult<bool> {
        if self.peek_is_punct(value) {
            self.lexer.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn peek_is_punct(&mut self, value: &str) -> bool {
        self.lexer.peek().map(|t| t.is(TokenKind::Punct, value)).unwrap_or(false)
    }

    fn expect_op(&mut self, value: &str) -> PResult<()> {
        self.lexer.expect(TokenKind::Op, Some(value)).map(|_| ())
    }

    fn try_op(&mut self, value: &str) -> PResult<bool> {
        let tok = self.lexer.peek()?;
        if tok.is(TokenKind::Op, value) {
            self.lexer.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_kind(&mut self, kind: TokenKind) -> PResult<crate::lexer::Token> {
        self.lexer.expect(kind, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xform_ast::{Axis as A, Expr as E, Pattern as P, PathStart as PS, StepTest as ST};

    #[test]
    fn parses_var_decl_and_trailing_expr() {
        let mut p = Parser::new(r#"var greeting := "hi"; greeting"#);
        let module = p.parse_module().unwrap();
        assert_eq!(module.vars.len(), 1);
        assert_eq!(module.vars[0].0, "greeting");
        assert!(matches!(module.expr, Some(E::VarRef(ref n)) if n == "greeting"));
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let mut p = Parser::new("1 + 2 * 3");
        let module = p.parse_module().unwrap();
        match module.expr.unwrap() {
            E::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(*right, E::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_if_let_for() {
        let mut p = Parser::new("if (1 = 1) then 2 else 3");
        let module = p.parse_module().unwrap();
        assert!(matches!(module.expr, Some(E::If { .. })));

        let mut p = Parser::new("let x := 1 in x");
        let module = p.parse_module().unwrap();
        assert!(matches!(module.expr, Some(E::Let { .. })));

        let mut p = Parser::new("for x in items return x");
        let module = p.parse_module().unwrap();
        assert!(matches!(module.expr, Some(E::For { .. })));
    }

    #[test]
    fn parses_absolute_path_with_predicate() {
        let mut p = Parser::new("/root/item[1]");
        let module = p.parse_module().unwrap();
        match module.expr.unwrap() {
            E::Path(path) => {
                assert_eq!(path.start, PS::Root);
                assert_eq!(path.steps.len(), 2);
                assert!(matches!(&path.steps[1].test, ST::Name(n) if n == "item"));
                assert_eq!(path.steps[1].predicates.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn leading_dotdot_degrades_to_context_start() {
        let mut p = Parser::new("..");
        let module = p.parse_module().unwrap();
        match module.expr.unwrap() {
            E::Path(path) => assert_eq!(path.start, PS::Context),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn midpath_dotdot_is_parent_axis() {
        let mut p = Parser::new("./a/../b");
        let module = p.parse_module().unwrap();
        match module.expr.unwrap() {
            E::Path(path) => {
                assert_eq!(path.steps.len(), 3);
                assert_eq!(path.steps[1].axis, A::Parent);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_attribute_step() {
        let mut p = Parser::new("@id");
        let module = p.parse_module().unwrap();
        match module.expr.unwrap() {
            E::Path(path) => {
                assert_eq!(path.steps.len(), 1);
                assert_eq!(path.steps[0].axis, A::Attr);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn disambiguates_text_constructor_from_identifier() {
        let mut p = Parser::new(r#"text{"hi"}"#);
        let module = p.parse_module().unwrap();
        assert!(matches!(module.expr, Some(E::TextConstructor(_))));

        let mut p = Parser::new("text");
        let module = p.parse_module().unwrap();
        assert!(matches!(module.expr, Some(E::VarRef(ref n)) if n == "text"));
    }

    #[test]
    fn parses_element_constructor_with_interpolation_and_nesting() {
        let mut p = Parser::new(r#"<out attr={1}>hello <inner>{name}</inner></out>"#);
        let module = p.parse_module().unwrap();
        match module.expr.unwrap() {
            E::Constructor(c) => {
                assert_eq!(c.name, "out");
                assert_eq!(c.attrs.len(), 1);
                assert_eq!(c.contents.len(), 2);
                assert!(matches!(c.contents[0], E::Text(_)));
                assert!(matches!(c.contents[1], E::Constructor(_)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_function_def_and_call() {
        let mut p = Parser::new("def double(x) := x * 2; double(21)");
        let module = p.parse_module().unwrap();
        assert!(module.functions.contains_key("double"));
        assert!(matches!(module.expr, Some(E::FuncCall { .. })));
    }

    #[test]
    fn parses_function_def_with_default_param() {
        let mut p = Parser::new(r#"def greet(name := "world") := name; greet()"#);
        let module = p.parse_module().unwrap();
        let def = &module.functions["greet"];
        assert_eq!(def.params.len(), 1);
        assert!(def.params[0].default.is_some());
    }

    #[test]
    fn parses_match_with_element_pattern_and_default() {
        let mut p = Parser::new(r#"match .: case <item>{kids}</item> => kids; default => (); "#);
        let module = p.parse_module().unwrap();
        match module.expr.unwrap() {
            E::Match { cases, default, .. } => {
                assert_eq!(cases.len(), 1);
                assert!(matches!(&cases[0].0, P::Element { name, var: Some(v), .. } if name == "item" && v == "kids"));
                assert!(default.is_some());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_rule_declaration() {
        let mut p = Parser::new(r#"rule main match <child>{v} := v; apply(/root/child)"#);
        let module = p.parse_module().unwrap();
        assert!(module.rules.contains_key("main"));
        assert_eq!(module.rules["main"].len(), 1);
    }

    #[test]
    fn multiple_rule_decls_accumulate_in_source_order() {
        let mut p = Parser::new(
            r#"rule main match <a>{v} := 1; rule main match _ := 2; apply(.)"#,
        );
        let module = p.parse_module().unwrap();
        assert_eq!(module.rules["main"].len(), 2);
        assert!(matches!(module.rules["main"][0].pattern, P::Element { .. }));
        assert!(matches!(module.rules["main"][1].pattern, P::Wildcard));
    }

    #[test]
    fn ns_decl_uses_quoted_prefix() {
        let mut p = Parser::new(r#"ns "xsl" = "http://example.org/xsl"; 1"#);
        let module = p.parse_module().unwrap();
        assert_eq!(module.namespaces.get("xsl").map(String::as_str), Some("http://example.org/xsl"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut p = Parser::new(r#"xform version "9.9"; ()"#);
        assert!(p.parse_module().is_err());
    }

    #[test]
    fn rejects_trailing_tokens_after_top_level_expression() {
        let mut p = Parser::new("1 2");
        assert!(p.parse_module().is_err());
    }
}
