use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::diagnostics::Position;

/// All token kinds of the Faber surface language. Keywords are Latin; the
/// scanner resolves them through [`KEYWORDS`] after matching the identifier
/// class, so keywords always win over identifiers of the same spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // literal classes
    Identifier,
    Integer,
    Float,
    BigInt,
    Str,
    TemplateStr,

    // declarations
    Varia,
    Fixum,
    Figendum,
    Variandum,
    Functio,
    Genus,
    Pactum,
    Ordo,
    Discretio,
    Typus,
    Importa,
    Communis,
    Ceteri,
    Implet,

    // control flow
    Si,
    Sin,
    Secus,
    Dum,
    Pro,
    Fit,
    Fiet,
    Fiunt,
    Fient,
    Elige,
    Casu,
    Ceterum,
    Discerne,
    Tempta,
    Cape,
    Demum,
    Custodi,
    Adfirma,
    Redde,
    Rumpe,
    Perge,
    Iace,
    Mori,
    Fac,
    In,
    Ex,
    De,

    // intrinsic I/O
    Scribe,
    Vide,
    Mone,
    Lege,

    // test constructs
    Probatio,
    Exemplum,
    Ante,
    Post,
    Omnia,

    // resource management & dispatch
    Cura,
    Arena,
    Pagina,
    Ad,

    // expression keywords
    Est,
    Qua,
    Innatum,
    Numeratum,
    Textatum,
    Fractatum,
    Bivalentum,
    Finge,
    Praefixum,
    Expecta,
    Novum,
    Ipse,
    Verum,
    Falsum,
    Nihil,
    Intra,
    Inter,
    Ab,
    Ubi,
    Prima,
    Ultima,
    Summa,
    Vel,
    Regula,
    Forma,
    Ut,

    // operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Question,
    QuestionQuestion,
    QuestionDot,
    BangDot,
    Arrow,
    FatArrow,
    DotDot,
    DotDotEq,
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Pipe,

    Eof,
}

/// Keyword spelling table; resolved from complete identifier lexemes, so
/// keywords always take precedence over identifiers.
pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("varia", TokenKind::Varia),
        ("fixum", TokenKind::Fixum),
        ("figendum", TokenKind::Figendum),
        ("variandum", TokenKind::Variandum),
        ("functio", TokenKind::Functio),
        ("genus", TokenKind::Genus),
        ("pactum", TokenKind::Pactum),
        ("ordo", TokenKind::Ordo),
        ("discretio", TokenKind::Discretio),
        ("typus", TokenKind::Typus),
        ("importa", TokenKind::Importa),
        ("communis", TokenKind::Communis),
        ("ceteri", TokenKind::Ceteri),
        ("implet", TokenKind::Implet),
        ("si", TokenKind::Si),
        ("sin", TokenKind::Sin),
        ("secus", TokenKind::Secus),
        ("dum", TokenKind::Dum),
        ("pro", TokenKind::Pro),
        ("fit", TokenKind::Fit),
        ("fiet", TokenKind::Fiet),
        ("fiunt", TokenKind::Fiunt),
        ("fient", TokenKind::Fient),
        ("elige", TokenKind::Elige),
        ("casu", TokenKind::Casu),
        ("ceterum", TokenKind::Ceterum),
        ("discerne", TokenKind::Discerne),
        ("tempta", TokenKind::Tempta),
        ("cape", TokenKind::Cape),
        ("demum", TokenKind::Demum),
        ("custodi", TokenKind::Custodi),
        ("adfirma", TokenKind::Adfirma),
        ("redde", TokenKind::Redde),
        ("rumpe", TokenKind::Rumpe),
        ("perge", TokenKind::Perge),
        ("iace", TokenKind::Iace),
        ("mori", TokenKind::Mori),
        ("fac", TokenKind::Fac),
        ("in", TokenKind::In),
        ("ex", TokenKind::Ex),
        ("de", TokenKind::De),
        ("scribe", TokenKind::Scribe),
        ("vide", TokenKind::Vide),
        ("mone", TokenKind::Mone),
        ("lege", TokenKind::Lege),
        ("probatio", TokenKind::Probatio),
        ("exemplum", TokenKind::Exemplum),
        ("ante", TokenKind::Ante),
        ("post", TokenKind::Post),
        ("omnia", TokenKind::Omnia),
        ("cura", TokenKind::Cura),
        ("arena", TokenKind::Arena),
        ("pagina", TokenKind::Pagina),
        ("ad", TokenKind::Ad),
        ("est", TokenKind::Est),
        ("qua", TokenKind::Qua),
        ("innatum", TokenKind::Innatum),
        ("numeratum", TokenKind::Numeratum),
        ("textatum", TokenKind::Textatum),
        ("fractatum", TokenKind::Fractatum),
        ("bivalentum", TokenKind::Bivalentum),
        ("finge", TokenKind::Finge),
        ("praefixum", TokenKind::Praefixum),
        ("expecta", TokenKind::Expecta),
        ("novum", TokenKind::Novum),
        ("ipse", TokenKind::Ipse),
        ("verum", TokenKind::Verum),
        ("falsum", TokenKind::Falsum),
        ("nihil", TokenKind::Nihil),
        ("intra", TokenKind::Intra),
        ("inter", TokenKind::Inter),
        ("ab", TokenKind::Ab),
        ("ubi", TokenKind::Ubi),
        ("prima", TokenKind::Prima),
        ("ultima", TokenKind::Ultima),
        ("summa", TokenKind::Summa),
        ("vel", TokenKind::Vel),
        ("regula", TokenKind::Regula),
        ("forma", TokenKind::Forma),
        ("ut", TokenKind::Ut),
    ])
});

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The lexeme. For string literals this is the unescaped content, for
    /// template strings the raw inner text (interpolations intact).
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl ToString, position: Position) -> Self {
        Token {
            kind,
            text: text.to_string(),
            position,
        }
    }
}

/// A source comment kept out of the token stream; the parser re-attaches
/// comments to declarations by line adjacency.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comment {
    pub text: String,
    pub position: Position,
    /// line on which the comment ends (block comments can span lines)
    pub end_line: usize,
}
