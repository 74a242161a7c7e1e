//! # Parsing and Writing Annotated DIMACS Files
//!
//! Internal module containing functions for parsing DIMACS CNF files extended
//! with the Max#SAT variable annotations. The approach is to accept input
//! instances that deviate from strict DIMACS, as long as the input
//! is still reasonable.
//!
//! ## Annotations
//!
//! - `c max v1 v2 ... 0`: declares `v1 v2 ...` as maximization variables.
//!   Order of first appearance is kept and duplicates are ignored.
//! - `c ind v1 v2 ... 0`: declares `v1 v2 ...` as counting variables (the
//!   independent support that is counted over).
//!
//! Both annotations may appear multiple times. All other comment lines are
//! ignored.
//!
//! ## References
//!
//! - [DIMACS CNF](http://www.satcompetition.org/2011/format-benchmarks2011.html)

use std::{
    collections::BTreeSet,
    io::{self, BufRead, Write},
};

use itertools::Itertools;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{i32, line_ending, multispace0, multispace1, u64},
    combinator::{all_consuming, map_res, recognize, success},
    error::{Error as NomError, ErrorKind, ParseError},
    multi::separated_list0,
    sequence::{pair, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::{
    instances::{Cnf, Formula},
    types::{Clause, Lit, Var},
};

/// Prefix of the maximization variable annotation
const MAX_TAG: &str = "c max ";
/// Prefix of the counting variable annotation
const IND_TAG: &str = "c ind ";

/// Errors occuring within the DIMACS parsing module
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid literal in the file
    #[error("invalid literal: {0}")]
    Lit(String),
    /// Invalid ending of a clause
    #[error("invalid clause ending: {0}")]
    ClauseEnding(String),
    /// Invalid p line
    #[error("invalid p-line: {0}")]
    PLine(String),
    /// P line value is too large to fit in a [`usize`]
    #[error("value in p-line too large to fit usize: {0}")]
    PValTooLarge(u64),
    /// An annotation line that does not end in `0`
    #[error("malformed {0} variable comment")]
    AnnotationEnding(Annotation),
    /// An annotation containing something other than a positive integer
    #[error("non-integer {0} variable: {1}")]
    AnnotationVar(Annotation, String),
    /// Base error from nom parsing
    #[error("nom error: {0} ({1:?})")]
    NomError(String, ErrorKind),
    /// Incomplete nom error
    #[error("nom parser requested more data")]
    NomIncomplete,
}

impl ParseError<&str> for Error {
    fn from_error_kind(input: &str, kind: ErrorKind) -> Self {
        Self::NomError(String::from(input), kind)
    }

    fn append(_: &str, _: ErrorKind, other: Self) -> Self {
        // Other error always has precedence. This should prefer more meaningful
        // errors than [`Error::NomError`]
        other
    }
}

/// The kinds of variable annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    /// `c max` line
    Maximization,
    /// `c ind` line
    Counting,
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Annotation::Maximization => write!(f, "maximization"),
            Annotation::Counting => write!(f, "counting"),
        }
    }
}

/// A parsing error together with the (1-based) line it occurred on
#[derive(Error, Debug)]
pub enum LineError {
    /// Error reading from the input
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Format error on a line
    #[error("line {line}: {error}")]
    Format {
        /// The offending line number
        line: usize,
        /// What is wrong with the line
        error: Error,
    },
}

/// Content of a single line of an annotated DIMACS file
#[derive(Debug, PartialEq, Eq)]
enum Line {
    /// Comment, empty or p line
    Skip,
    Clauses(Vec<Clause>),
    MaxVars(Vec<Var>),
    CountingVars(Vec<Var>),
}

/// Parses an annotated DIMACS CNF formula from a reader
///
/// # Errors
///
/// If reading fails or a line is malformed. The error names the offending
/// line.
pub fn parse_formula<R: BufRead>(mut reader: R) -> Result<Formula, LineError> {
    let mut cnf = Cnf::new();
    let mut max_vars = Vec::new();
    let mut counting_vars = BTreeSet::new();
    let mut buf = String::new();
    let mut line_number = 0;
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_number += 1;
        let line = parse_line(&buf).map_err(|error| LineError::Format {
            line: line_number,
            error,
        })?;
        match line {
            Line::Skip => (),
            Line::Clauses(clauses) => clauses.into_iter().for_each(|cl| cnf.add_clause(cl)),
            Line::MaxVars(vars) => max_vars.extend(vars),
            Line::CountingVars(vars) => counting_vars.extend(vars),
        }
    }
    Ok(Formula::new(cnf, max_vars, counting_vars))
}

fn unwrap_dimacs_error(err: nom::Err<Error>) -> Error {
    match err {
        nom::Err::Incomplete(_) => Error::NomIncomplete,
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
    }
}

/// Classifies and parses a single line
fn parse_line(input: &str) -> Result<Line, Error> {
    if let Some(rest) = input.strip_prefix(MAX_TAG) {
        return parse_annotation(rest, Annotation::Maximization).map(Line::MaxVars);
    }
    if let Some(rest) = input.strip_prefix(IND_TAG) {
        return parse_annotation(rest, Annotation::Counting).map(Line::CountingVars);
    }
    if input.starts_with('p') {
        parse_p_line(input).map_err(unwrap_dimacs_error)?;
        return Ok(Line::Skip);
    }
    // a line may hold more than one clause
    let mut clauses = Vec::new();
    let mut rest = input;
    while let (remaining, Some(clause)) = parse_cnf_line(rest).map_err(unwrap_dimacs_error)? {
        clauses.push(clause);
        if remaining.trim().is_empty() {
            break;
        }
        rest = remaining;
    }
    if clauses.is_empty() {
        return Ok(Line::Skip);
    }
    Ok(Line::Clauses(clauses))
}

/// Parses the variables of an annotation line after its tag. The line must be
/// terminated by a `0`.
fn parse_annotation(input: &str, kind: Annotation) -> Result<Vec<Var>, Error> {
    let fields: Vec<&str> = input.split_whitespace().collect();
    let Some((&last, vars)) = fields.split_last() else {
        return Err(Error::AnnotationEnding(kind));
    };
    if last != "0" {
        return Err(Error::AnnotationEnding(kind));
    }
    vars.iter()
        .map(|field| {
            all_consuming(parse_annotated_var)(field)
                .map(|(_, var)| var)
                .map_err(|_| Error::AnnotationVar(kind, String::from(*field)))
        })
        .collect()
}

/// Nuclear parser for an annotated variable
fn parse_annotated_var(input: &str) -> IResult<&str, Var, NomError<&str>> {
    map_res(i32, |val| match Lit::from_dimacs(val) {
        Ok(lit) if lit.is_pos() => Ok(lit.var()),
        _ => Err(()),
    })(input)
}

/// Parses p line, only accepting CNF preambles
fn parse_p_line(input: &str) -> IResult<&str, (usize, usize), Error> {
    let full_p_line = String::from(input.trim_end());
    let (input, _) = terminated::<_, _, _, NomError<_>, _, _>(tag("p"), multispace1)(input)
        .map_err(|e| e.map(|_| Error::PLine(full_p_line.clone())))?;
    let (input, _) = terminated::<_, _, _, NomError<_>, _, _>(tag("cnf"), multispace1)(input)
        .map_err(|e| e.map(|_| Error::PLine(full_p_line.clone())))?;
    let (input, (n_vars, _, n_clauses)) =
        tuple::<_, _, NomError<_>, _>((u64, multispace1, u64))(input)
            .map_err(|e| e.map(|_| Error::PLine(full_p_line)))?;
    let n_vars = usize::try_from(n_vars)
        .map_err(|_| nom::Err::Error(Error::PValTooLarge(n_vars)))?;
    let n_clauses = usize::try_from(n_clauses)
        .map_err(|_| nom::Err::Error(Error::PValTooLarge(n_clauses)))?;
    Ok((input, (n_vars, n_clauses)))
}

/// Parses a CNF line, either a comment or a clause
fn parse_cnf_line(input: &str) -> IResult<&str, Option<Clause>, Error> {
    let (input, _) = multispace0(input)?;
    if input.trim().is_empty() {
        // Tolerate empty lines
        return Ok((input, None));
    }
    match tag::<&str, &str, NomError<&str>>("c")(input) {
        Ok((input, _)) => Ok((input, None)),
        Err(_) => {
            // Line is not a comment
            let (input, clause) =
                terminated(separated_list0(multispace1, parse_lit), parse_clause_ending)(input)?;
            Ok((input, Some(Clause::from_iter(clause))))
        }
    }
}

/// Nuclear parser for literal
fn parse_lit(input: &str) -> IResult<&str, Lit, Error> {
    map_res(i32, Lit::from_dimacs)(input)
        .map_err(|e| e.map(|e: NomError<&str>| Error::Lit(String::from(e.input))))
}

/// Parses the end of a clause
/// A '0' followed by a linebreak, as well as a '0' followed by
/// whitespace or only a linebreak are treated as valid clause endings.
/// This is more lenient than strict DIMACS.
fn parse_clause_ending(input: &str) -> IResult<&str, &str, Error> {
    recognize(pair(
        multispace0,
        alt((
            recognize(all_consuming(success(""))),
            recognize(all_consuming(tag("0"))),
            recognize(terminated(tag("0"), line_ending)),
            recognize(terminated(tag("0"), multispace1)),
            recognize(line_ending),
        )),
    ))(input)
    .map_err(|e| e.map(|e: NomError<&str>| Error::ClauseEnding(String::from(e.input))))
}

/// Writes a formula to DIMACS CNF, declaring `projection` as the independent
/// support (`c ind` line) that external counters and samplers operate on
///
/// # Errors
///
/// If writing fails
pub fn write_formula<W: Write>(
    writer: &mut W,
    cnf: &Cnf,
    projection: &[Var],
    max_var: Option<Var>,
) -> Result<(), io::Error> {
    writeln!(writer, "c CNF file written by maxcount")?;
    writeln!(
        writer,
        "p cnf {} {}",
        max_var.map_or(0, Var::to_dimacs),
        cnf.len()
    )?;
    if !projection.is_empty() {
        writeln!(
            writer,
            "{IND_TAG}{} 0",
            projection.iter().map(|v| v.to_dimacs()).format(" ")
        )?;
    }
    cnf.iter().try_for_each(|cl| write_clause(writer, cl))?;
    writer.flush()
}

fn write_clause<W: Write>(writer: &mut W, clause: &Clause) -> Result<(), io::Error> {
    clause
        .iter()
        .try_for_each(|l| write!(writer, "{} ", l.to_dimacs()))?;
    writeln!(writer, "0")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{
        parse_annotation, parse_clause_ending, parse_cnf_line, parse_formula, parse_line,
        parse_lit, parse_p_line, write_formula, Annotation, Error, Line, LineError,
    };
    use crate::{clause, dimacs_lit, var};

    #[test]
    fn parse_lit_pass() {
        assert_eq!(parse_lit("15 "), Ok((" ", dimacs_lit![15])));
        assert_eq!(parse_lit("-42 "), Ok((" ", dimacs_lit![-42])));
        assert_eq!(parse_lit("42 63"), Ok((" 63", dimacs_lit![42])));
    }

    #[test]
    fn parse_lit_fail() {
        assert_eq!(
            parse_lit("abc "),
            Err(nom::Err::Error(Error::Lit(String::from("abc "))))
        );
    }

    #[test]
    fn parse_p_line_pass() {
        assert_eq!(parse_p_line("p cnf 23 42"), Ok(("", (23, 42))));
    }

    #[test]
    fn parse_p_line_fail() {
        assert_eq!(
            parse_p_line("p wcnf 23 42 52"),
            Err(nom::Err::Error(Error::PLine(String::from("p wcnf 23 42 52"))))
        );
        assert_eq!(
            parse_p_line("p cnf ab"),
            Err(nom::Err::Error(Error::PLine(String::from("p cnf ab"))))
        );
    }

    #[test]
    fn parse_clause_ending_pass() {
        assert_eq!(parse_clause_ending("0"), Ok(("", "0")));
        assert_eq!(parse_clause_ending("0\n"), Ok(("", "0\n")));
        assert_eq!(parse_clause_ending("\n"), Ok(("", "\n")));
    }

    #[test]
    fn parse_cnf_line_pass() {
        assert_eq!(parse_cnf_line("c test"), Ok((" test", None)));
        assert_eq!(
            parse_cnf_line("42 34 -16 0"),
            Ok((
                "",
                Some(clause![dimacs_lit![42], dimacs_lit![34], dimacs_lit![-16]])
            ))
        );
    }

    #[test]
    fn parse_cnf_line_fail() {
        assert_eq!(
            parse_cnf_line("42 34 a -16 0"),
            Err(nom::Err::Error(Error::ClauseEnding(String::from("a -16 0"))))
        );
    }

    #[test]
    fn parse_annotation_pass() {
        assert_eq!(
            parse_annotation("3 1 2 0\n", Annotation::Maximization),
            Ok(vec![var![2], var![0], var![1]])
        );
        assert_eq!(parse_annotation("0", Annotation::Counting), Ok(vec![]));
    }

    #[test]
    fn parse_annotation_fail() {
        assert_eq!(
            parse_annotation("1 2\n", Annotation::Maximization),
            Err(Error::AnnotationEnding(Annotation::Maximization))
        );
        assert_eq!(
            parse_annotation("", Annotation::Counting),
            Err(Error::AnnotationEnding(Annotation::Counting))
        );
        assert_eq!(
            parse_annotation("1 x 0", Annotation::Counting),
            Err(Error::AnnotationVar(Annotation::Counting, String::from("x")))
        );
        assert_eq!(
            parse_annotation("1 -2 0", Annotation::Counting),
            Err(Error::AnnotationVar(Annotation::Counting, String::from("-2")))
        );
    }

    #[test]
    fn parse_formula_pass() {
        let data = "c a comment\nc max 2 1 2 0\nc ind 3 4 0\nc ind 4 5 0\np cnf 5 2\n1 -3 0\n2 4 5 0\n";
        let formula = parse_formula(Cursor::new(data)).unwrap();
        assert_eq!(formula.max_vars(), &[var![1], var![0]]);
        assert_eq!(
            formula.counting_vars().iter().copied().collect::<Vec<_>>(),
            vec![var![2], var![3], var![4]]
        );
        assert_eq!(formula.cnf().len(), 2);
    }

    #[test]
    fn parse_line_several_clauses() {
        assert_eq!(
            parse_line("1 2 0 -3 0\n"),
            Ok(Line::Clauses(vec![
                clause![dimacs_lit![1], dimacs_lit![2]],
                clause![dimacs_lit![-3]]
            ]))
        );
        assert_eq!(
            parse_line("1 2 0 -3 x 0\n"),
            Err(Error::ClauseEnding(String::from("x 0\n")))
        );
        assert_eq!(parse_line("c 1 2 0\n"), Ok(Line::Skip));
        assert_eq!(parse_line("\n"), Ok(Line::Skip));
    }

    #[test]
    fn parse_formula_keeps_all_clauses_of_a_line() {
        let data = "c max 1 0\nc ind 2 3 0\np cnf 3 3\n1 2 0 -2 3 0\n-1 0\n";
        let formula = parse_formula(Cursor::new(data)).unwrap();
        assert_eq!(formula.cnf().len(), 3);
        assert_eq!(formula.cnf()[1], clause![dimacs_lit![-2], dimacs_lit![3]]);
    }

    #[test]
    fn parse_formula_names_line() {
        let data = "p cnf 3 1\nc max 1 2\n1 2 3 0\n";
        match parse_formula(Cursor::new(data)) {
            Err(LineError::Format { line, error }) => {
                assert_eq!(line, 2);
                assert_eq!(error, Error::AnnotationEnding(Annotation::Maximization));
            }
            _ => panic!("expected format error"),
        }
    }

    #[test]
    fn write_parse_formula() {
        let data = "c max 1 0\nc ind 2 3 0\n1 2 0\n-1 3 0\n";
        let formula = parse_formula(Cursor::new(data)).unwrap();
        let mut out = Cursor::new(Vec::new());
        write_formula(&mut out, formula.cnf(), &[var![0]], formula.max_var()).unwrap();
        let written = String::from_utf8(out.into_inner()).unwrap();
        assert!(written.contains("p cnf 3 2\n"));
        assert!(written.contains("c ind 1 0\n"));
        let reparsed = parse_formula(Cursor::new(written)).unwrap();
        assert_eq!(reparsed.cnf(), formula.cnf());
        assert_eq!(
            reparsed.counting_vars().iter().copied().collect::<Vec<_>>(),
            vec![var![0]]
        );
    }
}
