//! Datatypes to represent diagnostics emitted by the parser and the
//! verifier.
//!
//! This includes an enum-based representation suited for programmatic
//! interpretation and testing, as well as rendering to annotated source
//! snippets for human-readable output.  Parse diagnostics carry spans into
//! the composed source buffer, which the renderer resolves back to the
//! original file through the source map; proof diagnostics carry the label
//! or step they apply to, and render as bare messages.

use crate::source::SourceBuffer;
use crate::statement::{FilePos, Span, Token};
use annotate_snippets::{Level, Renderer, Snippet};
use typed_arena::Arena;

/// List of all diagnostic codes.  For the text of each, see `message`.
///
/// The first parse diagnostic aborts parsing and the first proof diagnostic
/// other than `ProofIncomplete` aborts verification, so at most a handful of
/// these ever exist per run.
#[derive(Debug, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum Diagnostic {
    // parse-time
    BadCharacter(FilePos, u8),
    BadCommentEnd(Span),
    BadFloating(Span),
    BadLabel(Span),
    ConstantNotTopLevel(Span),
    DisjointSingle(Span),
    DjNotActiveVariable(Token, Span),
    DjRepeatedVariable(Token, Span),
    EmptyFilename(String),
    EmptyMathString(Span),
    ExprNotConstantPrefix(Token, Span),
    FilenameDollar(String),
    FloatNotConstant(Token, Span),
    FloatNotVariable(Token, Span),
    FloatRedeclared(Token, Span),
    FloatTypeConflict(Token, Span),
    IncludeNotTopLevel(Span),
    IoError(String),
    LabelDuplicatesSymbol(Token, Span),
    LabelRedeclared(Token, Span),
    MissingLabel(Span),
    MissingProof(Span),
    NestedComment(Span),
    NotActiveSymbol(Token, Span),
    SpuriousLabel(Span),
    SymbolDuplicatesLabel(Token, Span),
    SymbolRedeclared(Token, Span),
    UnclosedBeforeEof,
    UnclosedComment(Span),
    UnclosedInclude(String),
    UnclosedMath(Span),
    UnclosedProof(Span),
    UnknownKeyword(Span),
    UnmatchedCloseGroup(Span),
    VariableMissingFloat(Token, Span),
    VariableRedeclared(Token, Span),
    // proof-time
    ProofDvViolation,
    ProofExcessEnd,
    ProofIncomplete,
    ProofInvalidSave,
    ProofMalformedVarint,
    ProofNoSteps,
    ProofUnderflow,
    ProofUnterminatedRoster,
    ProofWrongExprEnd,
    ProofWrongTypeEnd,
    StepEssenWrong,
    StepEssenWrongType,
    StepFloatIncompatible,
    StepFloatWrongType,
    StepMissing(Token),
    StepOutOfRange(usize),
    StepUsedBeforeDefinition(Token),
}
use self::Diagnostic::*;

fn t(tok: &Token) -> String {
    String::from_utf8_lossy(tok).into_owned()
}

impl Diagnostic {
    /// The severity of this diagnostic.  `ProofIncomplete` is the only
    /// warning; everything else is fatal to the run.
    #[must_use]
    pub const fn level(&self) -> Level {
        match self {
            ProofIncomplete => Level::Warning,
            _ => Level::Error,
        }
    }

    /// The span this diagnostic applies to, if it has one.
    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        match *self {
            BadCharacter(pos, _) => Some(Span {
                start: pos,
                end: pos + 1,
            }),
            BadCommentEnd(span)
            | BadFloating(span)
            | BadLabel(span)
            | ConstantNotTopLevel(span)
            | DisjointSingle(span)
            | DjNotActiveVariable(_, span)
            | DjRepeatedVariable(_, span)
            | EmptyMathString(span)
            | ExprNotConstantPrefix(_, span)
            | FloatNotConstant(_, span)
            | FloatNotVariable(_, span)
            | FloatRedeclared(_, span)
            | FloatTypeConflict(_, span)
            | IncludeNotTopLevel(span)
            | LabelDuplicatesSymbol(_, span)
            | LabelRedeclared(_, span)
            | MissingLabel(span)
            | MissingProof(span)
            | NestedComment(span)
            | NotActiveSymbol(_, span)
            | SpuriousLabel(span)
            | SymbolDuplicatesLabel(_, span)
            | SymbolRedeclared(_, span)
            | UnclosedComment(span)
            | UnclosedMath(span)
            | UnclosedProof(span)
            | UnknownKeyword(span)
            | UnmatchedCloseGroup(span)
            | VariableMissingFloat(_, span)
            | VariableRedeclared(_, span) => Some(span),
            _ => None,
        }
    }

    /// One-line description, naming the offending symbol, label, or file.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            BadCharacter(pos, byte) => format!(
                "invalid character (byte value {byte}) at offset {pos}; \
                 Metamath files are limited to printable US-ASCII"
            ),
            BadCommentEnd(_) => "$) must be surrounded by whitespace to end a comment".into(),
            BadFloating(_) => "a $f statement must have exactly two math tokens".into(),
            BadLabel(_) => {
                "statement labels may contain only alphanumeric characters and - _ .".into()
            }
            ConstantNotTopLevel(_) => "$c statements are not allowed inside a ${ $} block".into(),
            DisjointSingle(_) => "a $d statement must name at least two variables".into(),
            DjNotActiveVariable(tok, _) => {
                format!("{} in a disjoint statement is not an active variable", t(tok))
            }
            DjRepeatedVariable(tok, _) => {
                format!("{} appears more than once in a disjoint statement", t(tok))
            }
            EmptyFilename(file) => format!("empty file name in inclusion directive in {file}"),
            EmptyMathString(_) => "a math string must have at least one token".into(),
            ExprNotConstantPrefix(tok, _) => {
                format!("typecode {} is not a declared constant", t(tok))
            }
            FilenameDollar(file) => {
                format!("file name in inclusion directive in {file} contains a $")
            }
            FloatNotConstant(tok, _) => {
                format!("typecode {} of a $f statement is not a declared constant", t(tok))
            }
            FloatNotVariable(tok, _) => {
                format!("{} in a $f statement is not an active variable", t(tok))
            }
            FloatRedeclared(tok, _) => {
                format!("variable {} already has an active floating hypothesis", t(tok))
            }
            FloatTypeConflict(tok, _) => format!(
                "variable {} was previously assigned a different typecode",
                t(tok)
            ),
            IncludeNotTopLevel(_) => "inclusion only at top level".into(),
            IoError(err) => format!("could not read source file: {err}"),
            LabelDuplicatesSymbol(tok, _) => {
                format!("label {} is already in use as a math symbol", t(tok))
            }
            LabelRedeclared(tok, _) => format!("label {} is already defined", t(tok)),
            MissingLabel(_) => "this statement type requires a label".into(),
            MissingProof(_) => "a $p statement must have a $= proof".into(),
            NestedComment(_) => "comments may not be nested".into(),
            NotActiveSymbol(tok, _) => {
                format!("{} is not a declared constant or an active variable", t(tok))
            }
            SpuriousLabel(_) => "this statement type does not take a label".into(),
            SymbolDuplicatesLabel(tok, _) => {
                format!("math symbol {} is already in use as a statement label", t(tok))
            }
            SymbolRedeclared(tok, _) => format!("math symbol {} is already defined", t(tok)),
            UnclosedBeforeEof => "${ block is never closed".into(),
            UnclosedComment(_) => "malformed comment: $( is never closed".into(),
            UnclosedInclude(file) => {
                format!("inclusion directive in {file} is never closed with $]")
            }
            UnclosedMath(_) => "unterminated math string; expected $.".into(),
            UnclosedProof(_) => "unterminated proof; expected $.".into(),
            UnknownKeyword(_) => "unexpected token; expected a statement keyword".into(),
            UnmatchedCloseGroup(_) => "$} with no matching ${".into(),
            VariableMissingFloat(tok, _) => {
                format!("variable {} has no active floating hypothesis", t(tok))
            }
            VariableRedeclared(tok, _) => {
                format!("variable {} is already active in this scope", t(tok))
            }
            ProofDvViolation => "disjoint restriction violated".into(),
            ProofExcessEnd => "proof ends with more than one statement on the stack".into(),
            ProofIncomplete => "proof is incomplete".into(),
            ProofInvalidSave => "Z step with no proof step to save".into(),
            ProofMalformedVarint => "malformed compressed proof characters".into(),
            ProofNoSteps => "proof has no steps".into(),
            ProofUnderflow => "stack underflow: not enough operands for the hypotheses".into(),
            ProofUnterminatedRoster => "compressed proof label list is never closed".into(),
            ProofWrongExprEnd => "proof did not yield the expected conclusion".into(),
            ProofWrongTypeEnd => {
                "proof did not yield the expected conclusion (typecode differs)".into()
            }
            StepEssenWrong => "essential hypothesis does not match after substitution".into(),
            StepEssenWrongType => {
                "operand typecode does not match the essential hypothesis".into()
            }
            StepFloatIncompatible => "incompatible substitutions for the same variable".into(),
            StepFloatWrongType => {
                "operand typecode does not match the floating hypothesis".into()
            }
            StepMissing(tok) => format!("unrecognized label {} in proof", t(tok)),
            StepOutOfRange(k) => format!("saved step reference {k} is out of range"),
            StepUsedBeforeDefinition(tok) => {
                format!("assertion {} is used before it is established", t(tok))
            }
        }
    }

    /// Renders this diagnostic against the source map.
    ///
    /// Diagnostics with a span render as an annotated snippet of the
    /// original file; the rest render as a bare message.
    #[must_use]
    pub fn render(&self, sources: &SourceBuffer, renderer: &Renderer) -> String {
        let arena: Arena<String> = Arena::new();
        let message: &str = arena.alloc(self.message());
        let located = self
            .span()
            .and_then(|span| Some((span, sources.resolve(span.start)?)));
        let Some((span, region)) = located else {
            return renderer.render(self.level().title(message)).to_string();
        };

        let slice = region.span.as_ref(&sources.text);
        // a span may run past its region (e.g. an unclosed comment reaching
        // EOF); clip it so the snippet stays inside one file
        let rel_start = ((span.start - region.span.start) as usize).min(slice.len());
        let rel_end = ((span.end - region.span.start) as usize).clamp(rel_start, slice.len());
        // widen to whole lines so the snippet has context
        let line_begin = slice[..rel_start]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |ix| ix + 1);
        let line_end = slice[rel_end..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(slice.len(), |ix| rel_end + ix);
        let newlines = slice[..line_begin].iter().filter(|&&b| b == b'\n').count();
        let line_number = region.line as usize + newlines;
        let source: &str =
            arena.alloc(String::from_utf8_lossy(&slice[line_begin..line_end]).into_owned());

        let snippet = Snippet::source(source)
            .line_start(line_number)
            .origin(&region.name)
            .fold(true)
            .annotation(
                self.level()
                    .span(rel_start - line_begin..rel_end - line_begin)
                    .label(message),
            );
        let rendered = renderer
            .render(self.level().title(message).snippet(snippet))
            .to_string();
        rendered
    }
}
