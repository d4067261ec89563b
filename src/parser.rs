use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{CatalogError, Result};
use crate::model::RecordId;

/// One comparison inside a `WHERE` clause. Field names and literals are lower-cased.
#[derive(Debug, PartialEq, Clone)]
pub enum Condition {
    Like { field: String, value: String },
    Equals { field: String, value: String },
    GreaterThan { field: String, value: f64 },
    LessThan { field: String, value: f64 },
    /// Anything that is none of the four shapes, kept verbatim.
    Unrecognized(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, PartialEq, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
    /// Tokens after the field that are not a direction. Leniently ignored.
    pub ignored: Vec<String>,
}

/// A parsed query: the conjunction of its conditions, then an optional ordering.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn unrecognized(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().filter_map(|c| match c {
            Condition::Unrecognized(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

const WHERE: &str = "where";
const ORDER_BY: &str = "order by";

/// Split free text into conditions and ordering.
///
/// Keywords are found by their first occurrence anywhere in the lower-cased text, so a
/// leading `SELECT * FROM ...` is simply ignored.
pub fn parse_query(input: &str) -> Result<Query> {
    let text = input.trim().to_lowercase();
    let mut query = Query::default();

    if let Some(pos) = text.find(WHERE) {
        let after = &text[pos + WHERE.len()..];
        let clause = match after.find(ORDER_BY) {
            Some(end) => &after[..end],
            None => after,
        };
        query.conditions = split_conjunction(clause).into_iter().map(parse_condition).collect();
    }

    if let Some(pos) = text.find(ORDER_BY) {
        query.order_by = Some(parse_order_by(&text[pos + ORDER_BY.len()..])?);
    }

    Ok(query)
}

/// Split on the whitespace-delimited token `and`. Words merely containing it are left alone.
fn split_conjunction(clause: &str) -> Vec<&str> {
    let bytes = clause.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;

    for (idx, _) in clause.match_indices("and") {
        let before_ok = idx == 0 || bytes[idx - 1].is_ascii_whitespace();
        let after = idx + 3;
        let after_ok = after == bytes.len() || bytes[after].is_ascii_whitespace();
        if before_ok && after_ok && idx >= start {
            parts.push(clause[start..idx].trim());
            start = after;
        }
    }
    parts.push(clause[start..].trim());
    parts
}

fn parse_order_by(clause: &str) -> Result<OrderBy> {
    let mut tokens = clause.split_whitespace();
    let field = tokens
        .next()
        .ok_or_else(|| CatalogError::Query("ORDER BY needs a field".into()))?;
    let mut ignored = Vec::new();
    let direction = match tokens.next() {
        None | Some("asc") => Direction::Asc,
        Some("desc") => Direction::Desc,
        Some(other) => {
            ignored.push(other.to_string());
            Direction::Asc
        }
    };
    ignored.extend(tokens.map(str::to_string));
    Ok(OrderBy { field: field.to_string(), direction, ignored })
}

// --- CONDITION SHAPES ---

fn parse_field(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(recognize(pair(digit1, opt(pair(char('.'), digit1)))), |s: &str| s.parse::<f64>())(input)
}

/// Everything up to a closing `terminator` that ends the input. Must be non-empty and
/// free of `quote`, so `a = 'x' or b = 'y'` is not read as one long literal.
fn closed_by<'a>(terminator: String, quote: char) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        match input.strip_suffix(terminator.as_str()) {
            Some(value) if !value.is_empty() && !value.contains(quote) => Ok(("", value)),
            _ => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::TakeUntil))),
        }
    }
}

fn parse_like(input: &str) -> IResult<&str, Condition> {
    let (input, field) = parse_field(input)?;
    let (input, _) = delimited(multispace1, tag("like"), multispace1)(input)?;
    let (input, quote) = one_of("'\"")(input)?;
    let (input, _) = char('%')(input)?;
    let (input, value) = closed_by(format!("%{}", quote), quote)(input)?;
    Ok((input, Condition::Like { field: field.to_string(), value: value.to_string() }))
}

fn parse_equals(input: &str) -> IResult<&str, Condition> {
    let (input, field) = parse_field(input)?;
    let (input, _) = delimited(multispace0, char('='), multispace0)(input)?;
    let (input, quote) = one_of("'\"")(input)?;
    let (input, value) = closed_by(quote.to_string(), quote)(input)?;
    Ok((input, Condition::Equals { field: field.to_string(), value: value.to_string() }))
}

fn parse_compare(op: char) -> impl FnMut(&str) -> IResult<&str, Condition> {
    move |input| {
        let (input, (field, _, value)) =
            tuple((parse_field, delimited(multispace0, char(op), multispace0), parse_number))(input)?;
        let field = field.to_string();
        let condition = if op == '>' {
            Condition::GreaterThan { field, value }
        } else {
            Condition::LessThan { field, value }
        };
        Ok((input, condition))
    }
}

/// Match one condition against the four shapes, in priority order.
pub fn parse_condition(input: &str) -> Condition {
    let input = input.trim();
    let shapes = alt((parse_like, parse_equals, parse_compare('>'), parse_compare('<')));
    match all_consuming(shapes)(input) {
        Ok((_, condition)) => condition,
        Err(_) => Condition::Unrecognized(input.to_string()),
    }
}

// --- REPL COMMANDS ---

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Query(String),
    List,
    Get { id: RecordId },
    Delete { id: RecordId },
    Export { dir: Option<String> },
    Clear,
    Help,
    Exit,
}

fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where F: FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let (input, content) = take_while(|c: char| c != '"')(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content.to_string()))
}

fn parse_id(input: &str) -> IResult<&str, RecordId> {
    let (input, _) = opt(char('\''))(input)?;
    let (input, id) = map_res(take_while1(|c: char| c.is_ascii_hexdigit() || c == '-'), |s: &str| {
        s.parse::<RecordId>()
    })(input)?;
    let (input, _) = opt(char('\''))(input)?;
    Ok((input, id))
}

fn parse_query_command(input: &str) -> IResult<&str, Command> {
    let (_, _) = alt((
        tag_ci("SELECT"),
        tag_ci("FIND"),
        tag_ci("WHERE"),
        recognize(tuple((tag_ci("ORDER"), multispace1, tag_ci("BY")))),
    ))(input)?;
    Ok(("", Command::Query(input.to_string())))
}

fn parse_get(input: &str) -> IResult<&str, Command> {
    map(preceded(pair(tag_ci("GET"), multispace1), parse_id), |id| Command::Get { id })(input)
}

fn parse_delete(input: &str) -> IResult<&str, Command> {
    map(preceded(pair(tag_ci("DELETE"), multispace1), parse_id), |id| Command::Delete { id })(input)
}

fn parse_export(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("EXPORT")(input)?;
    let (input, dir) = opt(preceded(multispace1, parse_quoted_string))(input)?;
    Ok((input, Command::Export { dir }))
}

fn parse_keyword(input: &str) -> IResult<&str, Command> {
    alt((
        map(tag_ci("LIST"), |_| Command::List),
        map(tag_ci("CLEAR"), |_| Command::Clear),
        map(tag_ci("HELP"), |_| Command::Help),
        map(alt((tag_ci("EXIT"), tag_ci("QUIT"))), |_| Command::Exit),
    ))(input)
}

pub fn parse_command(input: &str) -> std::result::Result<Command, String> {
    let input = input.trim();
    let result = ws(alt((parse_query_command, parse_get, parse_delete, parse_export, parse_keyword)))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder));
            }
            Ok(cmd)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context: String = if e.input.chars().count() > 20 {
                format!("{}...", e.input.chars().take(20).collect::<String>())
            } else {
                e.input.to_string()
            };
            Err(format!("Invalid syntax near: '{}'", context))
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}
