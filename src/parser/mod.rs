//! Recursive-descent parser for Faber.
//!
//! The grammar is LL with a handful of bounded-lookahead decisions (typed
//! vs. untyped variable declarations, lambda heads vs. parenthesized
//! expressions). Statements have no terminators; call and index postfixes
//! only continue an expression when they start on the same line as the text
//! they follow, which keeps greedy expression parsing from swallowing the
//! next statement.
//!
//! Errors never abort the parse: each failed statement records a diagnostic
//! and the parser resynchronizes at the next plausible statement start, so
//! one malformed statement yields one diagnostic rather than a cascade.

pub mod ast;
mod parse_state;

pub use self::parse_state::ParseState;

use crate::diagnostics::{Diagnostic, ErrorCode, Position};
use crate::lexer::{tokenize, Comment, Token, TokenKind};

use self::ast::*;

/// Result of parsing one translation unit. `program` is `None` only when
/// the token stream was unusable from the first token.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedProgram {
    pub program: Option<Program>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    fn new(message: impl ToString, position: Position) -> Self {
        ParseError {
            message: message.to_string(),
            position,
        }
    }

    fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::error(ErrorCode::Syntax, self.message, self.position)
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Tokenize and parse in one step, merging lexer diagnostics.
pub fn parse_source(source: &str) -> ParsedProgram {
    let lexed = tokenize(source);
    let mut parsed = parse(lexed.tokens, &lexed.comments);
    let mut diagnostics = lexed.diagnostics;
    diagnostics.append(&mut parsed.diagnostics);
    parsed.diagnostics = diagnostics;
    parsed
}

pub fn parse(tokens: Vec<Token>, comments: &[Comment]) -> ParsedProgram {
    let mut parser = Parser::new(tokens, comments.to_vec());
    parser.parse_program()
}

struct Parser {
    state: ParseState,
    comments: Vec<Comment>,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<Token>, comments: Vec<Comment>) -> Self {
        Parser {
            state: ParseState::new(tokens),
            comments,
            diagnostics: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> ParsedProgram {
        let mut statements = Vec::new();

        while !self.state.at_end() {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.diagnostics.push(error.into_diagnostic());
                    self.synchronize();
                }
            }
        }

        ParsedProgram {
            program: Some(Program { statements }),
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    /// Skip to the next plausible statement start after an error.
    fn synchronize(&mut self) {
        self.state.next();
        while !self.state.at_end() {
            if matches!(
                self.state.peek_kind(),
                TokenKind::Varia
                    | TokenKind::Fixum
                    | TokenKind::Figendum
                    | TokenKind::Variandum
                    | TokenKind::Functio
                    | TokenKind::Genus
                    | TokenKind::Pactum
                    | TokenKind::Ordo
                    | TokenKind::Discretio
                    | TokenKind::Typus
                    | TokenKind::Importa
                    | TokenKind::Si
                    | TokenKind::Dum
                    | TokenKind::Pro
                    | TokenKind::Elige
                    | TokenKind::Discerne
                    | TokenKind::Tempta
                    | TokenKind::Custodi
                    | TokenKind::Redde
                    | TokenKind::Probatio
                    | TokenKind::Cura
                    | TokenKind::Ad
                    | TokenKind::Fit
                    | TokenKind::Fiet
                    | TokenKind::RBrace
            ) {
                return;
            }
            self.state.next();
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.state.peek_kind() == kind {
            return Ok(self.state.next());
        }

        let token = self.state.peek();
        Err(ParseError::new(
            format!(
                "expected {kind:?} but found {:?} '{}'",
                token.kind, token.text
            ),
            token.position,
        ))
    }

    fn expect_identifier(&mut self) -> ParseResult<Token> {
        self.expect(TokenKind::Identifier)
    }

    /// Comments ending on the lines directly above `line` attach to the
    /// declaration starting there.
    fn leading_comments(&mut self, line: usize) -> Vec<String> {
        let mut attached = Vec::new();
        let mut current = line;

        while let Some(index) = self
            .comments
            .iter()
            .position(|c| current > 0 && c.end_line == current - 1)
        {
            let comment = self.comments.remove(index);
            current = comment.position.line;
            attached.push(comment.text);
        }

        attached.reverse();
        attached
    }

    // --- statements ---------------------------------------------------

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.state.peek_kind() {
            TokenKind::Importa => self.parse_import(),
            TokenKind::Ex => self.parse_destructure_import(),
            TokenKind::Varia | TokenKind::Fixum | TokenKind::Figendum | TokenKind::Variandum => {
                self.parse_variable()
            }
            TokenKind::Functio => self.parse_function().map(Statement::Function),
            TokenKind::Genus => self.parse_genus(),
            TokenKind::Pactum => self.parse_pactum(),
            TokenKind::Ordo => self.parse_ordo(),
            TokenKind::Discretio => self.parse_discretio(),
            TokenKind::Typus => self.parse_type_alias(),
            TokenKind::Si => self.parse_if(),
            TokenKind::Dum => self.parse_while(),
            TokenKind::Pro => self.parse_iteration(),
            TokenKind::In => self.parse_mutation_context(),
            TokenKind::Elige => self.parse_value_switch(),
            TokenKind::Discerne => self.parse_variant_switch(),
            TokenKind::Custodi => self.parse_guard(),
            TokenKind::Adfirma => self.parse_assert(),
            TokenKind::Redde => self.parse_return(),
            TokenKind::Rumpe => {
                let token = self.state.next();
                Ok(Statement::Break(BreakStatement {
                    position: token.position,
                }))
            }
            TokenKind::Perge => {
                let token = self.state.next();
                Ok(Statement::Continue(ContinueStatement {
                    position: token.position,
                }))
            }
            TokenKind::Iace | TokenKind::Mori => self.parse_throw(),
            TokenKind::Tempta => self.parse_try(),
            TokenKind::Fac => self.parse_do_block(),
            TokenKind::Fit | TokenKind::Fiet => self.parse_entry(),
            TokenKind::Scribe | TokenKind::Vide | TokenKind::Mone => self.parse_print(),
            TokenKind::Probatio => self.parse_suite(),
            TokenKind::Exemplum => self.parse_case(),
            TokenKind::Ante | TokenKind::Post => self.parse_fixture(),
            TokenKind::Cura => self.parse_cura(),
            TokenKind::Ad => self.parse_dispatch(),
            TokenKind::LBrace => self.parse_block().map(Statement::Block),
            _ => {
                let position = self.state.position();
                let expression = self.parse_expression()?;
                Ok(Statement::Expression(ExpressionStatement {
                    expression,
                    position,
                }))
            }
        }
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut statements = Vec::new();

        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Block {
            statements,
            position: open.position,
        })
    }

    fn parse_import(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Importa)?;
        let module = self.expect(TokenKind::Str)?;
        Ok(Statement::Import(ImportStatement {
            module: module.text,
            position: keyword.position,
        }))
    }

    fn parse_destructure_import(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Ex)?;
        let module = self.expect(TokenKind::Str)?;
        self.expect(TokenKind::Importa)?;

        if self.state.peek_kind() == TokenKind::Star {
            self.state.next();
            return Ok(Statement::DestructureImport(DestructureImport {
                module: module.text,
                specifiers: Vec::new(),
                wildcard: true,
                position: keyword.position,
            }));
        }

        let mut specifiers = vec![self.expect_identifier()?.text];
        while self.state.eat(TokenKind::Comma) {
            specifiers.push(self.expect_identifier()?.text);
        }

        Ok(Statement::DestructureImport(DestructureImport {
            module: module.text,
            specifiers,
            wildcard: false,
            position: keyword.position,
        }))
    }

    fn parse_variable(&mut self) -> ParseResult<Statement> {
        let keyword = self.state.next();
        let kind = match keyword.kind {
            TokenKind::Varia => BindingKind::Varia,
            TokenKind::Fixum => BindingKind::Fixum,
            TokenKind::Figendum => BindingKind::Figendum,
            TokenKind::Variandum => BindingKind::Variandum,
            _ => unreachable!("caller checked the binding keyword"),
        };

        // `varia x = ..` is untyped; anything else is annotation then name
        let untyped = self.state.peek_kind() == TokenKind::Identifier
            && self.state.peek_at(1).kind == TokenKind::Assign;

        let (annotation, name) = if untyped {
            (None, self.expect_identifier()?.text)
        } else {
            let annotation = self.parse_annotation()?;
            (Some(annotation), self.expect_identifier()?.text)
        };

        self.expect(TokenKind::Assign)?;
        let initializer = self.parse_expression()?;
        let leading_comments = self.leading_comments(keyword.position.line);

        Ok(Statement::Variable(VariableDeclaration {
            kind,
            name,
            annotation,
            initializer,
            position: keyword.position,
            leading_comments,
        }))
    }

    fn parse_function(&mut self) -> ParseResult<FunctionDeclaration> {
        let keyword = self.expect(TokenKind::Functio)?;
        let is_async = self.state.eat(TokenKind::Fiet);
        let name = self.expect_identifier()?.text;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_parameters()?;
        self.expect(TokenKind::RParen)?;

        let return_annotation = if self.state.eat(TokenKind::Arrow) {
            Some(self.parse_annotation()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        let leading_comments = self.leading_comments(keyword.position.line);

        Ok(FunctionDeclaration {
            name,
            params,
            return_annotation,
            body,
            is_async,
            position: keyword.position,
            leading_comments,
        })
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<Parameter>> {
        let mut params = Vec::new();

        while self.state.peek_kind() != TokenKind::RParen && !self.state.at_end() {
            params.push(self.parse_parameter()?);
            if !self.state.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    fn parse_parameter(&mut self) -> ParseResult<Parameter> {
        let position = self.state.position();
        let rest = self.state.eat(TokenKind::Ceteri);

        // a bare name directly followed by `,`, `)` or `vel` is untyped
        let untyped = self.state.peek_kind() == TokenKind::Identifier
            && matches!(
                self.state.peek_at(1).kind,
                TokenKind::Comma | TokenKind::RParen | TokenKind::Vel | TokenKind::FatArrow
            );

        let (annotation, name) = if untyped {
            (None, self.expect_identifier()?.text)
        } else {
            let annotation = self.parse_annotation()?;
            (Some(annotation), self.expect_identifier()?.text)
        };

        let default = if self.state.eat(TokenKind::Vel) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Parameter {
            name,
            annotation,
            default,
            rest,
            position,
        })
    }

    fn parse_genus(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Genus)?;
        let name = self.expect_identifier()?.text;

        let mut implements = Vec::new();
        if self.state.eat(TokenKind::Implet) {
            implements.push(self.expect_identifier()?.text);
            while self.state.eat(TokenKind::Comma) {
                implements.push(self.expect_identifier()?.text);
            }
        }

        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();

        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            let is_static = self.state.eat(TokenKind::Communis);

            if self.state.peek_kind() == TokenKind::Functio {
                let function = self.parse_function()?;
                methods.push(GenusMethod {
                    function,
                    is_static,
                });
            } else {
                let position = self.state.position();
                let annotation = self.parse_annotation()?;
                let field_name = self.expect_identifier()?.text;
                let default = if self.state.eat(TokenKind::Vel) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                fields.push(GenusField {
                    name: field_name,
                    annotation,
                    is_static,
                    default,
                    position,
                });
                self.state.eat(TokenKind::Comma);
            }
        }
        self.expect(TokenKind::RBrace)?;

        let leading_comments = self.leading_comments(keyword.position.line);
        Ok(Statement::Genus(GenusDeclaration {
            name,
            implements,
            fields,
            methods,
            position: keyword.position,
            leading_comments,
        }))
    }

    fn parse_pactum(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Pactum)?;
        let name = self.expect_identifier()?.text;
        self.expect(TokenKind::LBrace)?;

        let mut methods = Vec::new();
        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            let position = self.expect(TokenKind::Functio)?.position;
            let method_name = self.expect_identifier()?.text;
            self.expect(TokenKind::LParen)?;
            let params = self.parse_parameters()?;
            self.expect(TokenKind::RParen)?;
            let return_annotation = if self.state.eat(TokenKind::Arrow) {
                Some(self.parse_annotation()?)
            } else {
                None
            };
            methods.push(PactumMethod {
                name: method_name,
                params,
                return_annotation,
                position,
            });
        }
        self.expect(TokenKind::RBrace)?;

        let leading_comments = self.leading_comments(keyword.position.line);
        Ok(Statement::Pactum(PactumDeclaration {
            name,
            methods,
            position: keyword.position,
            leading_comments,
        }))
    }

    fn parse_ordo(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Ordo)?;
        let name = self.expect_identifier()?.text;
        self.expect(TokenKind::LBrace)?;

        let mut members = Vec::new();
        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            let member = self.expect_identifier()?;
            let value = if self.state.eat(TokenKind::Assign) {
                let literal = self.state.next();
                match literal.kind {
                    TokenKind::Integer => {
                        Some(LiteralValue::Integer(literal.text.parse().unwrap_or(0)))
                    }
                    TokenKind::Str => Some(LiteralValue::String(literal.text)),
                    _ => {
                        return Err(ParseError::new(
                            "ordo member values must be integer or string literals",
                            literal.position,
                        ));
                    }
                }
            } else {
                None
            };
            members.push(OrdoMember {
                name: member.text,
                value,
                position: member.position,
            });
            if !self.state.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        let leading_comments = self.leading_comments(keyword.position.line);
        Ok(Statement::Ordo(OrdoDeclaration {
            name,
            members,
            position: keyword.position,
            leading_comments,
        }))
    }

    fn parse_discretio(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Discretio)?;
        let name = self.expect_identifier()?.text;
        self.expect(TokenKind::LBrace)?;

        let mut variants = Vec::new();
        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            let variant = self.expect_identifier()?;
            let mut fields = Vec::new();

            if self.state.eat(TokenKind::LBrace) {
                while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
                    let annotation = self.parse_annotation()?;
                    let field_name = self.expect_identifier()?.text;
                    fields.push((field_name, annotation));
                    if !self.state.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
            }

            variants.push(DiscretioVariant {
                name: variant.text,
                fields,
                position: variant.position,
            });
        }
        self.expect(TokenKind::RBrace)?;

        let leading_comments = self.leading_comments(keyword.position.line);
        Ok(Statement::Discretio(DiscretioDeclaration {
            name,
            variants,
            position: keyword.position,
            leading_comments,
        }))
    }

    fn parse_type_alias(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Typus)?;
        let name = self.expect_identifier()?.text;
        self.expect(TokenKind::Assign)?;
        let target = self.parse_annotation()?;
        let leading_comments = self.leading_comments(keyword.position.line);

        Ok(Statement::TypeAlias(TypeAliasDeclaration {
            name,
            target,
            position: keyword.position,
            leading_comments,
        }))
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Si)?;
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;

        let mut else_ifs = Vec::new();
        let mut else_block = None;
        loop {
            if self.state.eat(TokenKind::Sin) {
                let sin_condition = self.parse_expression()?;
                let sin_block = self.parse_block()?;
                else_ifs.push((sin_condition, sin_block));
            } else if self.state.eat(TokenKind::Secus) {
                else_block = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }

        let catch = self.parse_optional_catch()?;

        Ok(Statement::If(IfStatement {
            condition,
            then_block,
            else_ifs,
            else_block,
            catch,
            position: keyword.position,
        }))
    }

    fn parse_optional_catch(&mut self) -> ParseResult<Option<CatchClause>> {
        if self.state.peek_kind() != TokenKind::Cape {
            return Ok(None);
        }
        let keyword = self.state.next();
        let binding = self.expect_identifier()?.text;
        let block = self.parse_block()?;
        Ok(Some(CatchClause {
            binding,
            block,
            position: keyword.position,
        }))
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Dum)?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::While(WhileStatement {
            condition,
            body,
            position: keyword.position,
        }))
    }

    fn parse_iteration(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Pro)?;
        let is_async = self.state.eat(TokenKind::Fiet);
        let binding = self.expect_identifier()?.text;

        let kind = match self.state.next() {
            token if token.kind == TokenKind::Ex => IterationKind::Ex,
            token if token.kind == TokenKind::In => IterationKind::In,
            token => {
                return Err(ParseError::new(
                    "expected 'ex' or 'in' after the iteration binding",
                    token.position,
                ));
            }
        };

        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;

        Ok(Statement::Iteration(IterationStatement {
            binding,
            kind,
            is_async,
            iterable,
            body,
            position: keyword.position,
        }))
    }

    fn parse_mutation_context(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::In)?;
        let target = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::MutationContext(MutationContext {
            target,
            body,
            position: keyword.position,
            shape: TypeSlot::default(),
        }))
    }

    fn parse_value_switch(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Elige)?;
        let discriminant = self.parse_expression()?;
        self.expect(TokenKind::LBrace)?;

        let mut arms = Vec::new();
        let mut default = None;

        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            if self.state.eat(TokenKind::Ceterum) {
                default = Some(self.parse_block()?);
                continue;
            }

            let casu = self.expect(TokenKind::Casu)?;
            let mut values = vec![self.parse_expression()?];
            while self.state.eat(TokenKind::Comma) {
                values.push(self.parse_expression()?);
            }
            let body = self.parse_block()?;
            arms.push(ValueArm {
                values,
                body,
                position: casu.position,
            });
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Statement::ValueSwitch(ValueSwitch {
            discriminant,
            arms,
            default,
            position: keyword.position,
        }))
    }

    fn parse_variant_switch(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Discerne)?;
        let mut discriminants = vec![self.parse_expression()?];
        while self.state.eat(TokenKind::Comma) {
            discriminants.push(self.parse_expression()?);
        }
        self.expect(TokenKind::LBrace)?;

        let mut arms = Vec::new();
        let mut default = None;

        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            if self.state.eat(TokenKind::Ceterum) {
                default = Some(self.parse_block()?);
                continue;
            }

            let casu = self.expect(TokenKind::Casu)?;
            let mut variants = vec![self.expect_identifier()?.text];
            while self.state.eat(TokenKind::Comma) {
                variants.push(self.expect_identifier()?.text);
            }

            let bindings = if self.state.eat(TokenKind::Pro) {
                let mut names = vec![self.expect_identifier()?.text];
                while self.state.eat(TokenKind::Comma) {
                    names.push(self.expect_identifier()?.text);
                }
                VariantBindings::Positional(names)
            } else if self.state.eat(TokenKind::Ut) {
                VariantBindings::Alias(self.expect_identifier()?.text)
            } else {
                VariantBindings::None
            };

            let body = self.parse_block()?;
            arms.push(VariantArm {
                variants,
                bindings,
                body,
                position: casu.position,
            });
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Statement::VariantSwitch(VariantSwitch {
            discriminants,
            arms,
            default,
            position: keyword.position,
            shape: TypeSlot::default(),
        }))
    }

    fn parse_guard(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Custodi)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Secus)?;
        let fallback = self.parse_block()?;
        Ok(Statement::Guard(GuardStatement {
            condition,
            fallback,
            position: keyword.position,
        }))
    }

    fn parse_assert(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Adfirma)?;
        let condition = self.parse_expression()?;
        Ok(Statement::Assert(AssertStatement {
            condition,
            position: keyword.position,
        }))
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Redde)?;
        let value = if starts_expression(self.state.peek_kind()) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::Return(ReturnStatement {
            value,
            position: keyword.position,
        }))
    }

    fn parse_throw(&mut self) -> ParseResult<Statement> {
        let keyword = self.state.next();
        let fatal = keyword.kind == TokenKind::Mori;
        let value = self.parse_expression()?;
        Ok(Statement::Throw(ThrowStatement {
            value,
            fatal,
            position: keyword.position,
        }))
    }

    fn parse_try(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Tempta)?;
        let body = self.parse_block()?;
        let catch = self.parse_optional_catch()?;
        let finally = if self.state.eat(TokenKind::Demum) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Statement::Try(TryStatement {
            body,
            catch,
            finally,
            position: keyword.position,
        }))
    }

    fn parse_do_block(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Fac)?;
        let body = self.parse_block()?;
        Ok(Statement::DoBlock(DoBlock {
            body,
            position: keyword.position,
        }))
    }

    fn parse_entry(&mut self) -> ParseResult<Statement> {
        let keyword = self.state.next();
        let is_async = keyword.kind == TokenKind::Fiet;
        let body = self.parse_block()?;
        Ok(Statement::Entry(EntryStatement {
            body,
            is_async,
            position: keyword.position,
        }))
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        let keyword = self.state.next();
        let kind = match keyword.kind {
            TokenKind::Scribe => PrintKind::Scribe,
            TokenKind::Vide => PrintKind::Vide,
            TokenKind::Mone => PrintKind::Mone,
            _ => unreachable!("caller checked the print keyword"),
        };
        let value = self.parse_expression()?;
        Ok(Statement::Print(PrintStatement {
            kind,
            value,
            position: keyword.position,
        }))
    }

    fn parse_suite(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Probatio)?;
        let name = self.expect(TokenKind::Str)?.text;
        let body = self.parse_block()?;
        Ok(Statement::Suite(SuiteStatement {
            name,
            body,
            position: keyword.position,
        }))
    }

    fn parse_case(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Exemplum)?;
        let name = self.expect(TokenKind::Str)?.text;
        let timeout_ms = if self.state.eat(TokenKind::Intra) {
            let value = self.expect(TokenKind::Integer)?;
            Some(value.text.parse().unwrap_or(0))
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Statement::Case(CaseStatement {
            name,
            timeout_ms,
            body,
            position: keyword.position,
        }))
    }

    fn parse_fixture(&mut self) -> ParseResult<Statement> {
        let keyword = self.state.next();
        let kind = match keyword.kind {
            TokenKind::Ante => FixtureKind::Ante,
            TokenKind::Post => FixtureKind::Post,
            _ => unreachable!("caller checked the fixture keyword"),
        };
        let all = self.state.eat(TokenKind::Omnia);
        let body = self.parse_block()?;
        Ok(Statement::Fixture(FixtureStatement {
            kind,
            all,
            body,
            position: keyword.position,
        }))
    }

    fn parse_cura(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Cura)?;
        let is_async = self.state.eat(TokenKind::Fiet);

        let (curator, binding) = match self.state.peek_kind() {
            TokenKind::Arena => {
                self.state.next();
                (CuratorKind::Arena, self.expect_identifier()?.text)
            }
            TokenKind::Pagina => {
                self.state.next();
                (CuratorKind::Pagina, self.expect_identifier()?.text)
            }
            TokenKind::De => {
                self.state.next();
                let resource = self.parse_expression()?;
                self.expect(TokenKind::Pro)?;
                (
                    CuratorKind::Generic(resource),
                    self.expect_identifier()?.text,
                )
            }
            _ => {
                return Err(ParseError::new(
                    "expected 'arena', 'pagina' or 'de <resource> pro' after 'cura'",
                    self.state.position(),
                ));
            }
        };

        let body = self.parse_block()?;
        let catch = self.parse_optional_catch()?;

        Ok(Statement::Cura(CuraStatement {
            curator,
            binding,
            is_async,
            body,
            catch,
            position: keyword.position,
        }))
    }

    fn parse_dispatch(&mut self) -> ParseResult<Statement> {
        let keyword = self.expect(TokenKind::Ad)?;
        let target = self.expect(TokenKind::Str)?.text;

        let mut args = Vec::new();
        if self.state.eat(TokenKind::LParen) {
            while self.state.peek_kind() != TokenKind::RParen && !self.state.at_end() {
                args.push(self.parse_expression()?);
                if !self.state.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }

        let verb = match self.state.peek_kind() {
            TokenKind::Fit => Some(DispatchVerb::Fit),
            TokenKind::Fiet => Some(DispatchVerb::Fiet),
            TokenKind::Fiunt => Some(DispatchVerb::Fiunt),
            TokenKind::Fient => Some(DispatchVerb::Fient),
            _ => None,
        };
        let binding = if verb.is_some() {
            self.state.next();
            if self.state.peek_kind() == TokenKind::Identifier {
                Some(self.expect_identifier()?.text)
            } else {
                None
            }
        } else {
            None
        };

        let body = if self.state.peek_kind() == TokenKind::LBrace {
            Some(self.parse_block()?)
        } else {
            None
        };
        let catch = self.parse_optional_catch()?;

        Ok(Statement::Dispatch(DispatchStatement {
            target,
            args,
            verb,
            binding,
            body,
            catch,
            position: keyword.position,
        }))
    }

    // --- type annotations ---------------------------------------------

    fn parse_annotation(&mut self) -> ParseResult<TypeAnnotation> {
        let position = self.state.position();

        let ownership = if self.state.eat(TokenKind::De) {
            Ownership::Borrowed
        } else if self.state.eat(TokenKind::In) {
            Ownership::MutableBorrow
        } else {
            Ownership::Owned
        };

        // function type: (A, B) -> R
        if self.state.peek_kind() == TokenKind::LParen {
            self.state.next();
            let mut params = Vec::new();
            while self.state.peek_kind() != TokenKind::RParen && !self.state.at_end() {
                params.push(self.parse_annotation()?);
                if !self.state.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
            self.expect(TokenKind::Arrow)?;
            let returns = self.parse_annotation()?;

            let mut annotation = TypeAnnotation::named("functio", position);
            annotation.ownership = ownership;
            annotation.function = Some(FunctionAnnotation {
                params,
                returns: Box::new(returns),
            });
            return Ok(annotation);
        }

        let name = self.expect_identifier()?.text;
        let mut annotation = TypeAnnotation::named(name, position);
        annotation.ownership = ownership;

        if self.state.eat(TokenKind::Lt) {
            loop {
                if self.state.peek_kind() == TokenKind::Integer {
                    let width = self.state.next();
                    annotation
                        .params
                        .push(TypeParam::Width(width.text.parse().unwrap_or(0)));
                } else {
                    annotation
                        .params
                        .push(TypeParam::Type(self.parse_annotation()?));
                }
                if !self.state.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt)?;
        }

        if self.state.peek_kind() == TokenKind::LBracket
            && self.state.peek_at(1).kind == TokenKind::RBracket
        {
            self.state.next();
            self.state.next();
            annotation.array = true;
        }

        if self.state.eat(TokenKind::Question) {
            annotation.nullable = true;
        }

        while self.state.eat(TokenKind::Pipe) {
            annotation.alternatives.push(self.parse_annotation()?);
        }

        Ok(annotation)
    }

    // --- expressions --------------------------------------------------

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let target = self.parse_ternary()?;

        if self.state.peek_kind() == TokenKind::Assign {
            let position = target.position();
            self.state.next();
            let value = self.parse_assignment()?;
            return Ok(Expression::Assignment(Box::new(AssignmentExpression {
                target,
                value,
                position,
                ty: TypeSlot::default(),
            })));
        }

        Ok(target)
    }

    fn parse_ternary(&mut self) -> ParseResult<Expression> {
        let condition = self.parse_coalesce()?;

        if self.state.peek_kind() == TokenKind::Question {
            let position = condition.position();
            self.state.next();
            let consequent = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            let alternative = self.parse_expression()?;
            return Ok(Expression::Ternary(Box::new(TernaryExpression {
                condition,
                consequent,
                alternative,
                position,
                ty: TypeSlot::default(),
            })));
        }

        Ok(condition)
    }

    fn parse_coalesce(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_or()?;
        while self.state.peek_kind() == TokenKind::QuestionQuestion {
            let position = lhs.position();
            self.state.next();
            let rhs = self.parse_or()?;
            lhs = binary(BinaryOperator::NullCoalesce, lhs, rhs, position);
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_and()?;
        while self.state.peek_kind() == TokenKind::OrOr {
            let position = lhs.position();
            self.state.next();
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOperator::Or, lhs, rhs, position);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_equality()?;
        while self.state.peek_kind() == TokenKind::AndAnd {
            let position = lhs.position();
            self.state.next();
            let rhs = self.parse_equality()?;
            lhs = binary(BinaryOperator::And, lhs, rhs, position);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let operator = match self.state.peek_kind() {
                TokenKind::EqEq => BinaryOperator::Equals,
                TokenKind::NotEq => BinaryOperator::NotEquals,
                _ => break,
            };
            let position = lhs.position();
            self.state.next();
            let rhs = self.parse_comparison()?;
            lhs = binary(operator, lhs, rhs, position);
        }
        Ok(lhs)
    }

    /// Comparison level also hosts the `est`, `intra` and `inter` tests.
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_range()?;

        loop {
            match self.state.peek_kind() {
                TokenKind::Est => {
                    let position = lhs.position();
                    self.state.next();
                    let annotation = self.parse_annotation()?;
                    lhs = Expression::TypeCheck(Box::new(TypeCheckExpression {
                        value: lhs,
                        annotation,
                        position,
                        ty: TypeSlot::default(),
                    }));
                }
                TokenKind::Intra => {
                    let position = lhs.position();
                    self.state.next();
                    let low = self.parse_shift()?;
                    let inclusive = match self.state.next() {
                        token if token.kind == TokenKind::DotDot => false,
                        token if token.kind == TokenKind::DotDotEq => true,
                        token => {
                            return Err(ParseError::new(
                                "expected a range after 'intra'",
                                token.position,
                            ));
                        }
                    };
                    let high = self.parse_shift()?;
                    lhs = Expression::RangeTest(Box::new(RangeTestExpression {
                        value: lhs,
                        low,
                        high,
                        inclusive,
                        position,
                        ty: TypeSlot::default(),
                    }));
                }
                TokenKind::Inter => {
                    let position = lhs.position();
                    self.state.next();
                    let collection = self.parse_shift()?;
                    lhs = Expression::Membership(Box::new(MembershipExpression {
                        value: lhs,
                        collection,
                        position,
                        ty: TypeSlot::default(),
                    }));
                }
                TokenKind::Lt if self.state.peek_at(1).kind != TokenKind::Lt => {
                    let position = lhs.position();
                    self.state.next();
                    let rhs = self.parse_range()?;
                    lhs = binary(BinaryOperator::LessThan, lhs, rhs, position);
                }
                TokenKind::Le => {
                    let position = lhs.position();
                    self.state.next();
                    let rhs = self.parse_range()?;
                    lhs = binary(BinaryOperator::LessOrEqual, lhs, rhs, position);
                }
                TokenKind::Gt if self.state.peek_at(1).kind != TokenKind::Gt => {
                    let position = lhs.position();
                    self.state.next();
                    let rhs = self.parse_range()?;
                    lhs = binary(BinaryOperator::GreaterThan, lhs, rhs, position);
                }
                TokenKind::Ge => {
                    let position = lhs.position();
                    self.state.next();
                    let rhs = self.parse_range()?;
                    lhs = binary(BinaryOperator::GreaterOrEqual, lhs, rhs, position);
                }
                _ => break,
            }
        }

        Ok(lhs)
    }

    fn parse_range(&mut self) -> ParseResult<Expression> {
        let start = self.parse_shift()?;

        let inclusive = match self.state.peek_kind() {
            TokenKind::DotDot => false,
            TokenKind::DotDotEq => true,
            _ => return Ok(start),
        };
        let position = start.position();
        self.state.next();
        let end = self.parse_shift()?;

        Ok(Expression::Range(Box::new(RangeExpression {
            start,
            end,
            inclusive,
            position,
            ty: TypeSlot::default(),
        })))
    }

    /// Shifts are spelled with two adjacent angle tokens; adjacency is
    /// checked by byte offset so `lista<lista<numerus>>` stays a generic.
    fn parse_shift(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_additive()?;

        loop {
            let first = self.state.peek();
            let second = self.state.peek_at(1);
            let adjacent = second.position.offset == first.position.offset + 1;

            let direction = match (first.kind, second.kind, adjacent) {
                (TokenKind::Lt, TokenKind::Lt, true) => ShiftDirection::Left,
                (TokenKind::Gt, TokenKind::Gt, true) => ShiftDirection::Right,
                _ => break,
            };

            let position = lhs.position();
            self.state.next();
            self.state.next();
            let amount = self.parse_additive()?;
            lhs = Expression::Shift(Box::new(ShiftExpression {
                direction,
                value: lhs,
                amount,
                position,
                ty: TypeSlot::default(),
            }));
        }

        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let operator = match self.state.peek_kind() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            let position = lhs.position();
            self.state.next();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(operator, lhs, rhs, position);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_cast()?;
        loop {
            let operator = match self.state.peek_kind() {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            let position = lhs.position();
            self.state.next();
            let rhs = self.parse_cast()?;
            lhs = binary(operator, lhs, rhs, position);
        }
        Ok(lhs)
    }

    /// `qua` binds tighter than the additive operators:
    /// `a + b qua T` parses as `a + (b qua T)`.
    fn parse_cast(&mut self) -> ParseResult<Expression> {
        let mut value = self.parse_unary()?;
        while self.state.peek_kind() == TokenKind::Qua {
            let position = value.position();
            self.state.next();
            let annotation = self.parse_annotation()?;
            value = Expression::Cast(Box::new(CastExpression {
                value,
                annotation,
                position,
                ty: TypeSlot::default(),
            }));
        }
        Ok(value)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        match self.state.peek_kind() {
            TokenKind::Minus => {
                let token = self.state.next();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary(Box::new(UnaryExpression {
                    operator: UnaryOperator::Negate,
                    operand,
                    position: token.position,
                    ty: TypeSlot::default(),
                })))
            }
            TokenKind::Bang => {
                let token = self.state.next();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary(Box::new(UnaryExpression {
                    operator: UnaryOperator::Not,
                    operand,
                    position: token.position,
                    ty: TypeSlot::default(),
                })))
            }
            TokenKind::Expecta => {
                let token = self.state.next();
                let value = self.parse_unary()?;
                Ok(Expression::Await(Box::new(AwaitExpression {
                    value,
                    position: token.position,
                    ty: TypeSlot::default(),
                })))
            }
            TokenKind::Praefixum => {
                let token = self.state.next();
                let value = self.parse_unary()?;
                Ok(Expression::Comptime(Box::new(ComptimeExpression {
                    value,
                    position: token.position,
                    ty: TypeSlot::default(),
                })))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_primary()?;
        let mut last_line = expression.position().line;

        loop {
            match self.state.peek_kind() {
                // calls and indexing only continue on the same line, so the
                // next statement's parenthesized expression is not an
                // argument list
                TokenKind::LParen if self.state.position().line == last_line => {
                    let position = expression.position();
                    self.state.next();
                    let args = self.parse_arguments()?;
                    expression = Expression::Call(Box::new(CallExpression {
                        callee: expression,
                        args,
                        optional_chain: false,
                        non_null: false,
                        injects_curator: std::cell::Cell::new(false),
                        position,
                        ty: TypeSlot::default(),
                    }));
                }
                TokenKind::LBracket if self.state.position().line == last_line => {
                    let position = expression.position();
                    self.state.next();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expression = Expression::Index(Box::new(IndexExpression {
                        object: expression,
                        index,
                        position,
                        ty: TypeSlot::default(),
                    }));
                }
                TokenKind::Dot | TokenKind::QuestionDot | TokenKind::BangDot => {
                    let operator = self.state.next();
                    let optional_chain = operator.kind == TokenKind::QuestionDot;
                    let non_null = operator.kind == TokenKind::BangDot;
                    let property = self.expect_identifier()?;
                    last_line = property.position.line;
                    expression = Expression::Member(Box::new(MemberExpression {
                        object: expression,
                        property: property.text,
                        optional_chain,
                        non_null,
                        position: operator.position,
                        ty: TypeSlot::default(),
                    }));
                }
                _ => break,
            }
        }

        Ok(expression)
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();
        while self.state.peek_kind() != TokenKind::RParen && !self.state.at_end() {
            args.push(self.parse_expression()?);
            if !self.state.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.state.peek_kind() {
            TokenKind::Identifier => {
                let token = self.state.next();
                Ok(Expression::Identifier(Identifier::new(
                    token.text,
                    token.position,
                )))
            }
            TokenKind::Ipse => {
                let token = self.state.next();
                Ok(Expression::SelfRef(SelfRef {
                    position: token.position,
                    ty: TypeSlot::default(),
                }))
            }
            TokenKind::Integer => {
                let token = self.state.next();
                let value = token.text.parse().map_err(|_| {
                    ParseError::new("integer literal out of range", token.position)
                })?;
                Ok(Expression::Literal(Literal::new(
                    LiteralValue::Integer(value),
                    token.position,
                )))
            }
            TokenKind::Float => {
                let token = self.state.next();
                let value = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::new("malformed float literal", token.position))?;
                Ok(Expression::Literal(Literal::new(
                    LiteralValue::Float(value),
                    token.position,
                )))
            }
            TokenKind::BigInt => {
                let token = self.state.next();
                Ok(Expression::Literal(Literal::new(
                    LiteralValue::BigInt(token.text),
                    token.position,
                )))
            }
            TokenKind::Str => {
                let token = self.state.next();
                Ok(Expression::Literal(Literal::new(
                    LiteralValue::String(token.text),
                    token.position,
                )))
            }
            TokenKind::Verum | TokenKind::Falsum => {
                let token = self.state.next();
                Ok(Expression::Literal(Literal::new(
                    LiteralValue::Boolean(token.kind == TokenKind::Verum),
                    token.position,
                )))
            }
            TokenKind::Nihil => {
                let token = self.state.next();
                Ok(Expression::Literal(Literal::new(
                    LiteralValue::Null,
                    token.position,
                )))
            }
            TokenKind::TemplateStr => {
                let token = self.state.next();
                self.parse_template(token)
            }
            TokenKind::LParen => self.parse_parens_or_lambda(),
            TokenKind::Fiet => self.parse_async_lambda(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Novum => self.parse_new(),
            TokenKind::Finge => self.parse_variant_construction(),
            TokenKind::Innatum => self.parse_native(),
            TokenKind::Numeratum | TokenKind::Textatum | TokenKind::Fractatum
            | TokenKind::Bivalentum => self.parse_conversion(),
            TokenKind::Lege => self.parse_read_input(),
            TokenKind::Regula => {
                let keyword = self.state.next();
                let pattern = self.expect(TokenKind::Str)?.text;
                Ok(Expression::Regex(RegexLiteral {
                    pattern,
                    position: keyword.position,
                    ty: TypeSlot::default(),
                }))
            }
            TokenKind::Forma => self.parse_format_string(),
            TokenKind::Prima | TokenKind::Ultima | TokenKind::Summa => self.parse_pipeline(),
            TokenKind::Ab => self.parse_filter(),
            _ => {
                let token = self.state.peek();
                Err(ParseError::new(
                    format!("unexpected token {:?} '{}'", token.kind, token.text),
                    token.position,
                ))
            }
        }
    }

    /// Distinguish `(a + b)` from `(a, b) => ...` by scanning to the
    /// matching close paren and checking for `=>`.
    fn parse_parens_or_lambda(&mut self) -> ParseResult<Expression> {
        let start = self.state.get_index();
        let mut depth = 0usize;
        let mut lookahead = 0usize;
        loop {
            let token = self.state.peek_at(lookahead);
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => break,
                _ => {}
            }
            lookahead += 1;
        }

        let is_lambda = self.state.peek_at(lookahead + 1).kind == TokenKind::FatArrow;
        if is_lambda {
            return self.parse_lambda(false);
        }

        self.state.set_index(start);
        self.expect(TokenKind::LParen)?;
        let expression = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(expression)
    }

    fn parse_async_lambda(&mut self) -> ParseResult<Expression> {
        self.expect(TokenKind::Fiet)?;
        self.parse_lambda(true)
    }

    fn parse_lambda(&mut self, is_async: bool) -> ParseResult<Expression> {
        let open = self.expect(TokenKind::LParen)?;
        let params = self.parse_parameters()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::FatArrow)?;

        let body = if self.state.peek_kind() == TokenKind::LBrace {
            LambdaBody::Block(self.parse_block()?)
        } else {
            LambdaBody::Expression(Box::new(self.parse_expression()?))
        };

        Ok(Expression::Lambda(LambdaExpression {
            params,
            body,
            is_async,
            position: open.position,
            ty: TypeSlot::default(),
        }))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expression> {
        let open = self.expect(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        while self.state.peek_kind() != TokenKind::RBracket && !self.state.at_end() {
            elements.push(self.parse_expression()?);
            if !self.state.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expression::Array(ArrayLiteral {
            elements,
            position: open.position,
            ty: TypeSlot::default(),
        }))
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expression> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while self.state.peek_kind() != TokenKind::RBrace && !self.state.at_end() {
            let key = self.expect_identifier()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push(ObjectEntry {
                key: key.text,
                value,
                position: key.position,
            });
            if !self.state.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expression::Object(ObjectLiteral {
            entries,
            position: open.position,
            ty: TypeSlot::default(),
        }))
    }

    fn parse_new(&mut self) -> ParseResult<Expression> {
        let keyword = self.expect(TokenKind::Novum)?;
        let type_name = self.expect_identifier()?.text;
        self.expect(TokenKind::LParen)?;
        let args = self.parse_arguments()?;
        Ok(Expression::New(NewExpression {
            type_name,
            args,
            position: keyword.position,
            ty: TypeSlot::default(),
        }))
    }

    fn parse_variant_construction(&mut self) -> ParseResult<Expression> {
        let keyword = self.expect(TokenKind::Finge)?;
        let first = self.expect_identifier()?.text;

        let (discretio, variant) = if self.state.eat(TokenKind::Dot) {
            (Some(first), self.expect_identifier()?.text)
        } else {
            (None, first)
        };

        let args = if self.state.eat(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expression::Variant(VariantConstruction {
            discretio,
            variant,
            args,
            position: keyword.position,
            ty: TypeSlot::default(),
            shape: TypeSlot::default(),
        }))
    }

    fn parse_native(&mut self) -> ParseResult<Expression> {
        let keyword = self.expect(TokenKind::Innatum)?;
        let target_type = self.parse_annotation()?;
        let args = if self.state.eat(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::Native(NativeConstruction {
            target_type,
            args,
            position: keyword.position,
            ty: TypeSlot::default(),
        }))
    }

    fn parse_conversion(&mut self) -> ParseResult<Expression> {
        let keyword = self.state.next();
        let kind = match keyword.kind {
            TokenKind::Numeratum => ConversionKind::Numeratum,
            TokenKind::Textatum => ConversionKind::Textatum,
            TokenKind::Fractatum => ConversionKind::Fractatum,
            TokenKind::Bivalentum => ConversionKind::Bivalentum,
            _ => unreachable!("caller checked the conversion keyword"),
        };
        self.expect(TokenKind::LParen)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(Expression::Conversion(Box::new(ConversionExpression {
            kind,
            value,
            position: keyword.position,
            ty: TypeSlot::default(),
        })))
    }

    fn parse_read_input(&mut self) -> ParseResult<Expression> {
        let keyword = self.expect(TokenKind::Lege)?;
        self.expect(TokenKind::LParen)?;
        let prompt = if self.state.peek_kind() != TokenKind::RParen {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(TokenKind::RParen)?;
        Ok(Expression::ReadInput(ReadInput {
            prompt,
            position: keyword.position,
            ty: TypeSlot::default(),
        }))
    }

    fn parse_format_string(&mut self) -> ParseResult<Expression> {
        let keyword = self.expect(TokenKind::Forma)?;
        self.expect(TokenKind::LParen)?;
        let format = Box::new(self.parse_expression()?);
        let mut args = Vec::new();
        while self.state.eat(TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expression::FormatString(FormatString {
            format,
            args,
            position: keyword.position,
            ty: TypeSlot::default(),
        }))
    }

    fn parse_pipeline(&mut self) -> ParseResult<Expression> {
        let keyword = self.state.next();
        let op = match keyword.kind {
            TokenKind::Prima => PipelineOp::Prima,
            TokenKind::Ultima => PipelineOp::Ultima,
            TokenKind::Summa => PipelineOp::Summa,
            _ => unreachable!("caller checked the pipeline keyword"),
        };

        let count = if op == PipelineOp::Summa {
            None
        } else {
            Some(self.parse_unary()?)
        };
        self.expect(TokenKind::Ex)?;
        let source = self.parse_coalesce()?;

        Ok(Expression::Pipeline(Box::new(PipelineExpression {
            op,
            count,
            source,
            position: keyword.position,
            ty: TypeSlot::default(),
        })))
    }

    fn parse_filter(&mut self) -> ParseResult<Expression> {
        let keyword = self.expect(TokenKind::Ab)?;
        let source = self.parse_coalesce()?;
        self.expect(TokenKind::Pro)?;
        let binding = self.expect_identifier()?.text;
        self.expect(TokenKind::Ubi)?;
        let predicate = self.parse_coalesce()?;

        Ok(Expression::Filter(Box::new(FilterExpression {
            source,
            binding,
            predicate,
            position: keyword.position,
            ty: TypeSlot::default(),
        })))
    }

    /// Split the raw template text on `${...}` regions and sub-parse each
    /// interpolation. Inner positions are relative to the template.
    fn parse_template(&mut self, token: Token) -> ParseResult<Expression> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let chars = token.text.chars().collect::<Vec<_>>();
        let mut index = 0;

        while index < chars.len() {
            if chars[index] == '$' && chars.get(index + 1) == Some(&'{') {
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }

                let mut depth = 1usize;
                let mut inner = String::new();
                index += 2;
                while index < chars.len() && depth > 0 {
                    match chars[index] {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    inner.push(chars[index]);
                    index += 1;
                }
                if depth != 0 {
                    return Err(ParseError::new(
                        "unterminated interpolation in template string",
                        token.position,
                    ));
                }
                index += 1;

                let lexed = tokenize(&inner);
                let mut sub = Parser::new(lexed.tokens, Vec::new());
                let expression = sub.parse_expression()?;
                parts.push(TemplatePart::Interpolation(expression));
            } else {
                text.push(chars[index]);
                index += 1;
            }
        }

        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }

        Ok(Expression::TemplateString(TemplateString {
            parts,
            position: token.position,
            ty: TypeSlot::default(),
        }))
    }
}

fn binary(
    operator: BinaryOperator,
    lhs: Expression,
    rhs: Expression,
    position: Position,
) -> Expression {
    Expression::Binary(Box::new(BinaryExpression {
        operator,
        lhs,
        rhs,
        position,
        ty: TypeSlot::default(),
    }))
}

fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::Ipse
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::BigInt
            | TokenKind::Str
            | TokenKind::TemplateStr
            | TokenKind::Verum
            | TokenKind::Falsum
            | TokenKind::Nihil
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Minus
            | TokenKind::Bang
            | TokenKind::Expecta
            | TokenKind::Praefixum
            | TokenKind::Novum
            | TokenKind::Finge
            | TokenKind::Innatum
            | TokenKind::Numeratum
            | TokenKind::Textatum
            | TokenKind::Fractatum
            | TokenKind::Bivalentum
            | TokenKind::Lege
            | TokenKind::Regula
            | TokenKind::Forma
            | TokenKind::Prima
            | TokenKind::Ultima
            | TokenKind::Summa
            | TokenKind::Ab
            | TokenKind::Fiet
    )
}

#[cfg(test)]
mod tests {
    use super::ast::*;
    use super::parse_source;

    fn parse_ok(source: &str) -> Program {
        let parsed = parse_source(source);
        assert!(
            parsed.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            parsed.diagnostics
        );
        parsed.program.unwrap()
    }

    fn first_expression(source: &str) -> Expression {
        let program = parse_ok(source);
        match program.statements.into_iter().next().unwrap() {
            Statement::Expression(statement) => statement.expression,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_variable_declarations() {
        let program = parse_ok("varia x = 5\nfixum numerus y = 7");

        let Statement::Variable(first) = &program.statements[0] else {
            panic!("expected variable declaration");
        };
        assert_eq!(first.kind, BindingKind::Varia);
        assert_eq!(first.name, "x");
        assert!(first.annotation.is_none());

        let Statement::Variable(second) = &program.statements[1] else {
            panic!("expected variable declaration");
        };
        assert_eq!(second.kind, BindingKind::Fixum);
        assert_eq!(second.annotation.as_ref().unwrap().name, "numerus");
    }

    #[test]
    fn test_parse_function_with_borrowed_parameter() {
        let program = parse_ok(r#"functio f(de textus s vel "x") {}"#);
        let Statement::Function(function) = &program.statements[0] else {
            panic!("expected function");
        };
        let parameter = &function.params[0];
        assert_eq!(parameter.name, "s");
        assert_eq!(
            parameter.annotation.as_ref().unwrap().ownership,
            Ownership::Borrowed
        );
        assert!(parameter.default.is_some());
    }

    #[test]
    fn test_qua_binds_tighter_than_plus() {
        let expression = first_expression("a + b qua textus");
        let Expression::Binary(binary) = expression else {
            panic!("expected binary add at the top");
        };
        assert_eq!(binary.operator, BinaryOperator::Add);
        assert!(matches!(binary.rhs, Expression::Cast(_)));
    }

    #[test]
    fn test_parse_discretio_and_discerne() {
        let program = parse_ok(
            "discretio Event { Click { numerus x, numerus y } Quit }\n\
             functio handle(Event e) {\n\
               discerne e {\n\
                 casu Click pro x, y { redde }\n\
                 casu Quit { redde }\n\
               }\n\
             }",
        );

        let Statement::Discretio(discretio) = &program.statements[0] else {
            panic!("expected discretio");
        };
        assert_eq!(discretio.variants.len(), 2);
        assert_eq!(discretio.variants[0].fields.len(), 2);

        let Statement::Function(function) = &program.statements[1] else {
            panic!("expected function");
        };
        let Statement::VariantSwitch(switch) = &function.body.statements[0] else {
            panic!("expected discerne");
        };
        assert_eq!(switch.arms.len(), 2);
        assert!(matches!(
            &switch.arms[0].bindings,
            VariantBindings::Positional(names) if names == &["x", "y"]
        ));
    }

    #[test]
    fn test_parse_nested_generic_annotation() {
        let program = parse_ok("fixum tabula<textus, lista<numerus>> t = x");
        let Statement::Variable(variable) = &program.statements[0] else {
            panic!("expected variable");
        };
        let annotation = variable.annotation.as_ref().unwrap();
        assert_eq!(annotation.name, "tabula");
        assert_eq!(annotation.params.len(), 2);
    }

    #[test]
    fn test_shift_still_parses_outside_generics() {
        let expression = first_expression("a << 2");
        assert!(matches!(expression, Expression::Shift(_)));
    }

    #[test]
    fn test_parse_lambda_and_parens() {
        assert!(matches!(
            first_expression("(x, y) => x + y"),
            Expression::Lambda(_)
        ));
        assert!(matches!(
            first_expression("(1 + 2)"),
            Expression::Binary(_)
        ));
    }

    #[test]
    fn test_parse_pipeline_and_filter() {
        assert!(matches!(
            first_expression("prima 3 ex lista"),
            Expression::Pipeline(_)
        ));
        assert!(matches!(
            first_expression("summa ex lista"),
            Expression::Pipeline(_)
        ));
        assert!(matches!(
            first_expression("ab lista pro x ubi x > 3"),
            Expression::Filter(_)
        ));
    }

    #[test]
    fn test_parse_cura_forms() {
        let program = parse_ok(
            "cura arena a { scribe 1 }\n\
             cura de res() pro r { scribe r } cape e { scribe e }",
        );
        let Statement::Cura(arena) = &program.statements[0] else {
            panic!("expected cura");
        };
        assert!(matches!(arena.curator, CuratorKind::Arena));

        let Statement::Cura(generic) = &program.statements[1] else {
            panic!("expected cura");
        };
        assert!(matches!(generic.curator, CuratorKind::Generic(_)));
        assert!(generic.catch.is_some());
    }

    #[test]
    fn test_parse_dispatch() {
        let program = parse_ok(r#"ad "registrum" (1, 2) fiet responsum { scribe responsum }"#);
        let Statement::Dispatch(dispatch) = &program.statements[0] else {
            panic!("expected dispatch");
        };
        assert_eq!(dispatch.target, "registrum");
        assert_eq!(dispatch.args.len(), 2);
        assert_eq!(dispatch.verb, Some(DispatchVerb::Fiet));
        assert_eq!(dispatch.binding.as_deref(), Some("responsum"));
        assert!(dispatch.body.is_some());
    }

    #[test]
    fn test_parse_template_interpolation() {
        let expression = first_expression("`ave ${nomen} vale`");
        let Expression::TemplateString(template) = expression else {
            panic!("expected template string");
        };
        assert_eq!(template.parts.len(), 3);
        assert!(matches!(
            template.parts[1],
            TemplatePart::Interpolation(Expression::Identifier(_))
        ));
    }

    #[test]
    fn test_parse_test_constructs() {
        let program = parse_ok(
            "probatio \"calculi\" {\n\
               ante omnia { varia x = 1 }\n\
               exemplum \"additio\" intra 500 { adfirma 1 + 1 == 2 }\n\
             }",
        );
        let Statement::Suite(suite) = &program.statements[0] else {
            panic!("expected suite");
        };
        assert!(matches!(
            &suite.body.statements[0],
            Statement::Fixture(f) if f.all
        ));
        assert!(matches!(
            &suite.body.statements[1],
            Statement::Case(c) if c.timeout_ms == Some(500)
        ));
    }

    #[test]
    fn test_error_recovery_produces_one_diagnostic_per_statement() {
        let parsed = parse_source("varia = 5\nvaria y = 2");
        assert_eq!(parsed.diagnostics.len(), 1);
        let program = parsed.program.unwrap();
        assert!(program
            .statements
            .iter()
            .any(|s| matches!(s, Statement::Variable(v) if v.name == "y")));
    }

    #[test]
    fn test_deeply_nested_parens() {
        let expression = first_expression("((((((1))))))");
        assert!(matches!(
            expression,
            Expression::Literal(Literal {
                value: LiteralValue::Integer(1),
                ..
            })
        ));
    }

    #[test]
    fn test_leading_comments_attach_to_declarations() {
        let parsed = parse_source("// numerus primus\nvaria x = 1");
        let program = parsed.program.unwrap();
        let Statement::Variable(variable) = &program.statements[0] else {
            panic!("expected variable");
        };
        assert_eq!(variable.leading_comments, vec!["numerus primus"]);
    }
}
