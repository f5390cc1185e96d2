// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Recursive-descent parser for pointcut expressions and patterns

pub mod lexer;

pub use lexer::{ParseError, Position, Token, TokenKind, tokenize};

use crate::patterns::annotation_pattern::{AnnotationPatternList, AnnotationTypePattern, NamedValueConstraint};
use crate::patterns::modifiers::ModifiersPattern;
use crate::patterns::name_pattern::NamePattern;
use crate::patterns::signature_pattern::{SignaturePattern, ThrowsPattern};
use crate::patterns::type_pattern::{TypePattern, WildTypePattern};
use crate::patterns::type_pattern_list::TypePatternList;
use crate::pointcut::{Pointcut, PointcutKind};
use crate::shadow::ShadowKind;
use crate::types::{MemberKind, UnresolvedType, modifiers};

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a complete pointcut expression such as `call(* *(..)) && this(s)`
pub fn parse_pointcut(text: &str) -> ParseResult<Pointcut> {
    let mut parser = PatternParser::new(text)?;
    let pointcut = parser.parse_pointcut_or()?;
    parser.finish()?;
    Ok(pointcut)
}

pub fn parse_type_pattern(text: &str) -> ParseResult<TypePattern> {
    let mut parser = PatternParser::new(text)?;
    let pattern = parser.parse_type_or()?;
    parser.finish()?;
    Ok(pattern)
}

/// Comma separated type patterns, as in `declare precedence: A, B+, *`
pub fn parse_type_pattern_list(text: &str) -> ParseResult<Vec<TypePattern>> {
    let mut parser = PatternParser::new(text)?;
    let mut patterns = vec![parser.parse_type_or()?];
    while parser.eat(&TokenKind::Comma) {
        patterns.push(parser.parse_type_or()?);
    }
    parser.finish()?;
    Ok(patterns)
}

/// Parse a member signature. `Method` also accepts constructor forms (`Foo.new(..)`).
pub fn parse_signature_pattern(text: &str, kind: MemberKind) -> ParseResult<SignaturePattern> {
    let mut parser = PatternParser::new(text)?;
    let signature = match kind {
        MemberKind::Field => parser.parse_member_signature(true)?,
        MemberKind::StaticInitialization | MemberKind::Handler => SignaturePattern::for_type(kind, parser.parse_type_or()?),
        MemberKind::Method | MemberKind::Constructor | MemberKind::Advice => parser.parse_member_signature(false)?,
    };
    parser.finish()?;
    Ok(signature)
}

pub struct PatternParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl PatternParser {
    pub fn new(text: &str) -> ParseResult<Self> {
        Ok(Self { tokens: tokenize(text)?, pos: 0 })
    }

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn position(&self) -> Position {
        self.tokens[self.pos.min(self.tokens.len() - 1)].position
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        match self.peek() {
            TokenKind::Eof => ParseError::UnexpectedEnd { expected: what.to_string() },
            found => ParseError::Expected {
                expected: what.to_string(),
                found: found.to_string(),
                position: self.position(),
            },
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<()> {
        if self.eat(&kind) { Ok(()) } else { Err(self.expected(what)) }
    }

    fn expect_name(&mut self, what: &str) -> ParseResult<String> {
        match self.peek() {
            TokenKind::Name(_) => match self.advance() {
                TokenKind::Name(n) => Ok(n),
                _ => Err(self.expected(what)),
            },
            _ => Err(self.expected(what)),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> ParseError {
        ParseError::Invalid {
            message: message.into(),
            position: self.position(),
        }
    }

    fn finish(&self) -> ParseResult<()> {
        if *self.peek() == TokenKind::Eof { Ok(()) } else { Err(self.expected("end of input")) }
    }

    // ---- pointcuts ----

    fn parse_pointcut_or(&mut self) -> ParseResult<Pointcut> {
        let mut left = self.parse_pointcut_and()?;
        while self.eat(&TokenKind::OrOr) {
            left = Pointcut::or(left, self.parse_pointcut_and()?);
        }
        Ok(left)
    }

    fn parse_pointcut_and(&mut self) -> ParseResult<Pointcut> {
        let mut left = self.parse_pointcut_unary()?;
        while self.eat(&TokenKind::AndAnd) {
            left = Pointcut::and(left, self.parse_pointcut_unary()?);
        }
        Ok(left)
    }

    fn parse_pointcut_unary(&mut self) -> ParseResult<Pointcut> {
        if self.eat(&TokenKind::Not) {
            return Ok(Pointcut::not(self.parse_pointcut_unary()?));
        }
        if self.eat(&TokenKind::LParen) {
            let inner = self.parse_pointcut_or()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(inner);
        }
        if self.eat(&TokenKind::At) {
            let name = self.expect_name("annotation designator")?;
            return self.parse_annotation_designator(&name);
        }
        let name = self.expect_name("pointcut designator")?;
        self.parse_designator(&name)
    }

    fn parse_designator(&mut self, name: &str) -> ParseResult<Pointcut> {
        self.expect(TokenKind::LParen, "'('")?;
        let kind = match name {
            "call" | "execution" => {
                let signature = self.parse_member_signature(false)?;
                let shadow = match (name, signature.kind) {
                    ("call", MemberKind::Constructor) => ShadowKind::ConstructorCall,
                    ("call", _) => ShadowKind::MethodCall,
                    (_, MemberKind::Constructor) => ShadowKind::ConstructorExecution,
                    _ => ShadowKind::MethodExecution,
                };
                PointcutKind::Kinded { kind: shadow, signature }
            }
            "get" | "set" => PointcutKind::Kinded {
                kind: if name == "get" { ShadowKind::FieldGet } else { ShadowKind::FieldSet },
                signature: self.parse_member_signature(true)?,
            },
            "initialization" | "preinitialization" => {
                let signature = self.parse_member_signature(false)?;
                if signature.kind != MemberKind::Constructor {
                    return Err(self.invalid(format!("{} requires a constructor signature", name)));
                }
                let kind = if name == "initialization" { ShadowKind::Initialization } else { ShadowKind::PreInitialization };
                PointcutKind::Kinded { kind, signature }
            }
            "staticinitialization" => PointcutKind::Kinded {
                kind: ShadowKind::StaticInitialization,
                signature: SignaturePattern::for_type(MemberKind::StaticInitialization, self.parse_type_or()?),
            },
            "adviceexecution" => PointcutKind::Kinded {
                kind: ShadowKind::AdviceExecution,
                signature: SignaturePattern::any(MemberKind::Advice),
            },
            "handler" => PointcutKind::Handler(self.parse_type_or()?),
            "within" => PointcutKind::Within(self.parse_type_or()?),
            "withincode" => PointcutKind::WithinCode(self.parse_member_signature(false)?),
            "this" | "target" => PointcutKind::ThisOrTarget {
                is_this: name == "this",
                pattern: self.parse_type_or()?,
            },
            "args" => PointcutKind::Args(self.parse_type_list_until_rparen()?),
            "cflow" | "cflowbelow" => PointcutKind::Cflow {
                entry: Box::new(self.parse_pointcut_or()?),
                below: name == "cflowbelow",
                free_vars: Vec::new(),
            },
            "if" => return Err(self.invalid("if() pointcuts are not supported")),
            _ => {
                let (on_type, simple) = match name.rfind('.') {
                    Some(i) => (Some(UnresolvedType::for_name(&name[..i])), name[i + 1..].to_string()),
                    None => (None, name.to_string()),
                };
                PointcutKind::Reference {
                    on_type,
                    name: simple,
                    arguments: self.parse_type_list_until_rparen()?,
                }
            }
        };
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Pointcut::new(kind))
    }

    fn parse_annotation_designator(&mut self, name: &str) -> ParseResult<Pointcut> {
        self.expect(TokenKind::LParen, "'('")?;
        let kind = match name {
            "args" => {
                let mut patterns = Vec::new();
                if *self.peek() != TokenKind::RParen {
                    loop {
                        patterns.push(self.parse_annotation_list_item()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                PointcutKind::ArgsAnnotation(AnnotationPatternList::new(patterns))
            }
            "annotation" => PointcutKind::Annotation(self.parse_annotation_argument()?),
            "within" => PointcutKind::WithinAnnotation(self.parse_annotation_argument()?),
            "withincode" => PointcutKind::WithinCodeAnnotation(self.parse_annotation_argument()?),
            "this" | "target" => PointcutKind::ThisOrTargetAnnotation {
                is_this: name == "this",
                pattern: self.parse_annotation_argument()?,
            },
            other => return Err(self.invalid(format!("unknown annotation designator @{}", other))),
        };
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Pointcut::new(kind))
    }

    fn parse_annotation_list_item(&mut self) -> ParseResult<AnnotationTypePattern> {
        if self.eat(&TokenKind::Ellipsis) {
            return Ok(AnnotationTypePattern::Ellipsis);
        }
        if *self.peek() == TokenKind::Name("*".to_string()) {
            self.advance();
            return Ok(AnnotationTypePattern::Any);
        }
        self.parse_annotation_argument()
    }

    /// `Foo`, `@Foo`, `!Foo` or a formal name inside an annotation designator
    fn parse_annotation_argument(&mut self) -> ParseResult<AnnotationTypePattern> {
        if self.eat(&TokenKind::Not) {
            return Ok(AnnotationTypePattern::not(self.parse_annotation_argument()?));
        }
        self.eat(&TokenKind::At);
        self.parse_annotation_body()
    }

    // ---- annotations ----

    /// Leading `@A @B(x="1") !@C` of a signature or type pattern
    fn parse_annotation_prefix(&mut self) -> ParseResult<AnnotationTypePattern> {
        let mut result = AnnotationTypePattern::Any;
        loop {
            let single = match (self.peek(), self.peek_at(1)) {
                (TokenKind::At, _) => {
                    self.advance();
                    self.parse_annotation_body()?
                }
                (TokenKind::Not, TokenKind::At) => {
                    self.advance();
                    self.advance();
                    AnnotationTypePattern::not(self.parse_annotation_body()?)
                }
                _ => break,
            };
            result = if result.is_any() { single } else { AnnotationTypePattern::and(result, single) };
        }
        Ok(result)
    }

    /// Name with optional value constraints, or a parenthesized alternative
    fn parse_annotation_body(&mut self) -> ParseResult<AnnotationTypePattern> {
        if self.eat(&TokenKind::LParen) {
            let mut result = self.parse_annotation_argument()?;
            while self.eat(&TokenKind::OrOr) {
                result = AnnotationTypePattern::Or(Box::new(result), Box::new(self.parse_annotation_argument()?));
            }
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(result);
        }
        let name = self.expect_name("annotation type")?;
        let mut values = Vec::new();
        let has_values = *self.peek() == TokenKind::LParen && matches!(self.peek_at(1), TokenKind::Name(_)) && matches!(self.peek_at(2), TokenKind::Eq | TokenKind::NotEq);
        if has_values {
            self.advance();
            loop {
                let key = self.expect_name("annotation element name")?;
                let negated = match self.advance() {
                    TokenKind::Eq => false,
                    TokenKind::NotEq => true,
                    _ => return Err(self.expected("'=' or '!='")),
                };
                let value = match self.advance() {
                    TokenKind::Str(s) | TokenKind::Name(s) => s,
                    _ => return Err(self.expected("annotation value")),
                };
                values.push(NamedValueConstraint { name: key, value, negated });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        }
        Ok(AnnotationTypePattern::Wild {
            name: NamePattern::new(name),
            values,
            known_prefixes: Vec::new(),
        })
    }

    // ---- type patterns ----

    fn parse_type_or(&mut self) -> ParseResult<TypePattern> {
        let mut left = self.parse_type_and()?;
        while self.eat(&TokenKind::OrOr) {
            left = TypePattern::or(left, self.parse_type_and()?);
        }
        Ok(left)
    }

    fn parse_type_and(&mut self) -> ParseResult<TypePattern> {
        let mut left = self.parse_type_unary()?;
        while self.eat(&TokenKind::AndAnd) {
            left = TypePattern::and(left, self.parse_type_unary()?);
        }
        Ok(left)
    }

    fn parse_type_unary(&mut self) -> ParseResult<TypePattern> {
        if *self.peek() == TokenKind::Not && *self.peek_at(1) != TokenKind::At {
            self.advance();
            return Ok(TypePattern::not(self.parse_type_unary()?));
        }
        self.parse_type_primary()
    }

    fn parse_type_primary(&mut self) -> ParseResult<TypePattern> {
        if matches!(self.peek(), TokenKind::At) || (*self.peek() == TokenKind::Not && *self.peek_at(1) == TokenKind::At) {
            let annotation = self.parse_annotation_prefix()?;
            let inner = self.parse_type_primary()?;
            return self.annotate(inner, annotation);
        }
        if self.eat(&TokenKind::LParen) {
            let annotation = self.parse_annotation_prefix()?;
            let inner = self.parse_type_or()?;
            self.expect(TokenKind::RParen, "')'")?;
            return self.annotate(inner, annotation);
        }
        let name = self.expect_name("type pattern")?;
        if (name == "hasmethod" || name == "hasfield") && *self.peek() == TokenKind::LParen {
            self.advance();
            let signature = self.parse_member_signature(name == "hasfield")?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(TypePattern::HasMember { signature: Box::new(signature) });
        }
        let mut wild = WildTypePattern::new(name);
        if self.eat(&TokenKind::Lt) {
            let mut parameters = vec![self.parse_type_or()?];
            while self.eat(&TokenKind::Comma) {
                parameters.push(self.parse_type_or()?);
            }
            self.expect(TokenKind::Gt, "'>'")?;
            wild.type_parameters = Some(TypePatternList::new(parameters));
        }
        wild.include_subtypes = self.eat(&TokenKind::Plus);
        while self.eat(&TokenKind::LBracket) {
            self.expect(TokenKind::RBracket, "']'")?;
            wild.dims += 1;
        }
        wild.varargs = self.eat(&TokenKind::Varargs);
        let plain = !wild.include_subtypes && wild.dims == 0 && !wild.varargs && wild.type_parameters.is_none();
        if plain && wild.name.is_any() {
            return Ok(TypePattern::Any);
        }
        Ok(TypePattern::Wild(wild))
    }

    fn annotate(&self, pattern: TypePattern, annotation: AnnotationTypePattern) -> ParseResult<TypePattern> {
        if annotation.is_any() {
            return Ok(pattern);
        }
        match pattern {
            TypePattern::Any => {
                let mut wild = WildTypePattern::new("*");
                wild.annotation = annotation;
                Ok(TypePattern::Wild(wild))
            }
            TypePattern::Wild(mut wild) => {
                wild.annotation = annotation;
                Ok(TypePattern::Wild(wild))
            }
            TypePattern::Exact(mut exact) => {
                exact.annotation = annotation;
                Ok(TypePattern::Exact(exact))
            }
            _ => Err(self.invalid("annotation patterns only apply to simple type patterns")),
        }
    }

    /// Contents of `(...)` up to, not including, the closing parenthesis
    fn parse_type_list_until_rparen(&mut self) -> ParseResult<TypePatternList> {
        let mut patterns = Vec::new();
        if *self.peek() == TokenKind::RParen {
            return Ok(TypePatternList::new(patterns));
        }
        loop {
            if self.eat(&TokenKind::Ellipsis) {
                patterns.push(TypePattern::Ellipsis);
            } else {
                patterns.push(self.parse_type_or()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(TypePatternList::new(patterns))
    }

    fn parse_parameters(&mut self) -> ParseResult<TypePatternList> {
        self.expect(TokenKind::LParen, "'('")?;
        let list = self.parse_type_list_until_rparen()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(list)
    }

    // ---- signatures ----

    fn parse_modifiers(&mut self) -> ModifiersPattern {
        let mut pattern = ModifiersPattern::ANY;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (TokenKind::Name(word), next) if *next != TokenKind::LParen => match modifiers::from_keyword(word) {
                    Some(flag) => {
                        pattern = pattern.require(flag);
                        self.advance();
                    }
                    None => break,
                },
                (TokenKind::Not, TokenKind::Name(word)) => match modifiers::from_keyword(word) {
                    Some(flag) => {
                        pattern = pattern.forbid(flag);
                        self.advance();
                        self.advance();
                    }
                    None => break,
                },
                _ => break,
            }
        }
        pattern
    }

    fn parse_throws(&mut self) -> ParseResult<ThrowsPattern> {
        let mut throws = ThrowsPattern::default();
        if *self.peek() != TokenKind::Name("throws".to_string()) {
            return Ok(throws);
        }
        self.advance();
        loop {
            if self.eat(&TokenKind::Not) {
                throws.forbidden.push(self.parse_type_primary()?);
            } else {
                throws.required.push(self.parse_type_primary()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(throws)
    }

    /// Whether the upcoming tokens are `[Type.]new(`
    fn at_constructor_name(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (TokenKind::Name(n), TokenKind::LParen) => n == "new" || n.ends_with(".new"),
            (TokenKind::Name(_), TokenKind::Plus) => *self.peek_at(2) == TokenKind::Dot && *self.peek_at(3) == TokenKind::Name("new".to_string()),
            _ => false,
        }
    }

    /// `decl.name`, splitting a dotted glob at its last single dot
    fn parse_declaring_and_name(&mut self) -> ParseResult<(TypePattern, String)> {
        let compound = matches!((self.peek(), self.peek_at(1)), (TokenKind::Name(_), TokenKind::Plus | TokenKind::Lt) | (TokenKind::LParen | TokenKind::Not | TokenKind::At, _));
        if compound {
            let declaring = self.parse_type_primary()?;
            self.expect(TokenKind::Dot, "'.' before member name")?;
            let name = self.expect_name("member name")?;
            return Ok((declaring, name));
        }
        let text = self.expect_name("member name")?;
        Ok(split_member_name(&text))
    }

    fn parse_member_signature(&mut self, field: bool) -> ParseResult<SignaturePattern> {
        let annotation = self.parse_annotation_prefix()?;
        let modifiers = self.parse_modifiers();

        if !field && self.at_constructor_name() {
            let (declaring, _) = self.parse_declaring_and_name()?;
            let parameters = self.parse_parameters()?;
            let throws = self.parse_throws()?;
            return Ok(SignaturePattern::constructor(declaring, parameters)
                .with_annotation(annotation)
                .with_modifiers(modifiers)
                .with_throws(throws));
        }

        let return_type = self.parse_type_or()?;
        let (declaring, name) = self.parse_declaring_and_name()?;
        if field {
            return Ok(SignaturePattern::field(return_type, declaring, &name).with_annotation(annotation).with_modifiers(modifiers));
        }
        let parameters = self.parse_parameters()?;
        let throws = self.parse_throws()?;
        Ok(SignaturePattern::method(return_type, declaring, &name, parameters)
            .with_annotation(annotation)
            .with_modifiers(modifiers)
            .with_throws(throws))
    }
}

/// `com.acme..*.find*` splits into `com.acme..*` and `find*`; a bare name has any declaring type
fn split_member_name(text: &str) -> (TypePattern, String) {
    let bytes = text.as_bytes();
    let mut split = None;
    for i in (0..bytes.len()).rev() {
        if bytes[i] != b'.' {
            continue;
        }
        let double = (i > 0 && bytes[i - 1] == b'.') || bytes.get(i + 1) == Some(&b'.');
        if !double {
            split = Some(i);
            break;
        }
    }
    match split {
        Some(i) => {
            let declaring = &text[..i];
            let declaring = if declaring == "*" { TypePattern::Any } else { TypePattern::wild(declaring) };
            (declaring, text[i + 1..].to_string())
        }
        None => (TypePattern::Any, text.to_string()),
    }
}
