mod binary;
mod call;
mod collection;
mod id;
mod lambda;
mod literal;
mod variant;

pub use self::binary::*;
pub use self::call::*;
pub use self::collection::*;
pub use self::id::*;
pub use self::lambda::*;
pub use self::literal::*;
pub use self::variant::*;

use serde::Serialize;

use crate::diagnostics::Position;
use crate::parser::ast::TypeSlot;

/// All expression forms. Every variant carries a shared [`TypeSlot`] filled
/// in by semantic analysis; [`Expression::type_slot`] exposes it uniformly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Expression {
    Identifier(Identifier),
    SelfRef(SelfRef),
    Literal(Literal),
    TemplateString(TemplateString),
    FormatString(FormatString),
    Regex(RegexLiteral),
    ReadInput(ReadInput),
    Array(ArrayLiteral),
    Object(ObjectLiteral),
    Range(Box<RangeExpression>),
    Binary(Box<BinaryExpression>),
    Unary(Box<UnaryExpression>),
    Shift(Box<ShiftExpression>),
    Ternary(Box<TernaryExpression>),
    Assignment(Box<AssignmentExpression>),
    TypeCheck(Box<TypeCheckExpression>),
    Cast(Box<CastExpression>),
    Conversion(Box<ConversionExpression>),
    Native(NativeConstruction),
    Call(Box<CallExpression>),
    Member(Box<MemberExpression>),
    Index(Box<IndexExpression>),
    New(NewExpression),
    Variant(VariantConstruction),
    Lambda(LambdaExpression),
    Await(Box<AwaitExpression>),
    Comptime(Box<ComptimeExpression>),
    Pipeline(Box<PipelineExpression>),
    Filter(Box<FilterExpression>),
    RangeTest(Box<RangeTestExpression>),
    Membership(Box<MembershipExpression>),
}

impl Expression {
    pub fn position(&self) -> Position {
        match self {
            Expression::Identifier(Identifier { position, .. }) => *position,
            Expression::SelfRef(SelfRef { position, .. }) => *position,
            Expression::Literal(Literal { position, .. }) => *position,
            Expression::TemplateString(TemplateString { position, .. }) => *position,
            Expression::FormatString(FormatString { position, .. }) => *position,
            Expression::Regex(RegexLiteral { position, .. }) => *position,
            Expression::ReadInput(ReadInput { position, .. }) => *position,
            Expression::Array(ArrayLiteral { position, .. }) => *position,
            Expression::Object(ObjectLiteral { position, .. }) => *position,
            Expression::Range(range) => range.position,
            Expression::Binary(binary) => binary.position,
            Expression::Unary(unary) => unary.position,
            Expression::Shift(shift) => shift.position,
            Expression::Ternary(ternary) => ternary.position,
            Expression::Assignment(assignment) => assignment.position,
            Expression::TypeCheck(check) => check.position,
            Expression::Cast(cast) => cast.position,
            Expression::Conversion(conversion) => conversion.position,
            Expression::Native(NativeConstruction { position, .. }) => *position,
            Expression::Call(call) => call.position,
            Expression::Member(member) => member.position,
            Expression::Index(index) => index.position,
            Expression::New(NewExpression { position, .. }) => *position,
            Expression::Variant(VariantConstruction { position, .. }) => *position,
            Expression::Lambda(LambdaExpression { position, .. }) => *position,
            Expression::Await(await_expr) => await_expr.position,
            Expression::Comptime(comptime) => comptime.position,
            Expression::Pipeline(pipeline) => pipeline.position,
            Expression::Filter(filter) => filter.position,
            Expression::RangeTest(test) => test.position,
            Expression::Membership(membership) => membership.position,
        }
    }

    pub fn type_slot(&self) -> TypeSlot {
        match self {
            Expression::Identifier(Identifier { ty, .. }) => ty.clone(),
            Expression::SelfRef(SelfRef { ty, .. }) => ty.clone(),
            Expression::Literal(Literal { ty, .. }) => ty.clone(),
            Expression::TemplateString(TemplateString { ty, .. }) => ty.clone(),
            Expression::FormatString(FormatString { ty, .. }) => ty.clone(),
            Expression::Regex(RegexLiteral { ty, .. }) => ty.clone(),
            Expression::ReadInput(ReadInput { ty, .. }) => ty.clone(),
            Expression::Array(ArrayLiteral { ty, .. }) => ty.clone(),
            Expression::Object(ObjectLiteral { ty, .. }) => ty.clone(),
            Expression::Range(range) => range.ty.clone(),
            Expression::Binary(binary) => binary.ty.clone(),
            Expression::Unary(unary) => unary.ty.clone(),
            Expression::Shift(shift) => shift.ty.clone(),
            Expression::Ternary(ternary) => ternary.ty.clone(),
            Expression::Assignment(assignment) => assignment.ty.clone(),
            Expression::TypeCheck(check) => check.ty.clone(),
            Expression::Cast(cast) => cast.ty.clone(),
            Expression::Conversion(conversion) => conversion.ty.clone(),
            Expression::Native(NativeConstruction { ty, .. }) => ty.clone(),
            Expression::Call(call) => call.ty.clone(),
            Expression::Member(member) => member.ty.clone(),
            Expression::Index(index) => index.ty.clone(),
            Expression::New(NewExpression { ty, .. }) => ty.clone(),
            Expression::Variant(VariantConstruction { ty, .. }) => ty.clone(),
            Expression::Lambda(LambdaExpression { ty, .. }) => ty.clone(),
            Expression::Await(await_expr) => await_expr.ty.clone(),
            Expression::Comptime(comptime) => comptime.ty.clone(),
            Expression::Pipeline(pipeline) => pipeline.ty.clone(),
            Expression::Filter(filter) => filter.ty.clone(),
            Expression::RangeTest(test) => test.ty.clone(),
            Expression::Membership(membership) => membership.ty.clone(),
        }
    }

    /// The resolved semantic type, cloned out of the slot.
    /// `None` before analysis.
    pub fn resolved_type(&self) -> Option<crate::semantic::Type> {
        self.type_slot().borrow().clone()
    }
}
