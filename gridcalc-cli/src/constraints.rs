use anyhow::{Context, Result, bail, ensure};
use gridcalc_engine::{CompetitorId, Constraint, Field, ScenarioSet};
use regex::Regex;
use std::sync::OnceLock;

/// `E:A@P` locks competitor A to position P in remaining event E.
fn position_lock() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s*:\s*([^@>]+?)\s*@\s*(\d+)\s*$").expect("position pattern is valid")
    })
}

/// `E:A>B` requires A to finish ahead of B in remaining event E.
fn relative_order() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s*:\s*([^@>]+?)\s*>\s*([^@>]+?)\s*$").expect("order pattern is valid")
    })
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Resolve a competitor token: a car number, a full name, or a unique surname.
pub fn resolve_competitor(token: &str, field: &Field) -> Result<CompetitorId> {
    let token = token.trim();
    if let Ok(number) = token.parse::<u32>() {
        let id = CompetitorId(number);
        ensure!(field.get(id).is_some(), "no competitor with number {number}");
        return Ok(id);
    }

    if let Some(competitor) = field
        .competitors()
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(token))
    {
        return Ok(competitor.id);
    }

    let by_surname: Vec<CompetitorId> = field
        .competitors()
        .iter()
        .filter(|c| {
            c.name
                .split_whitespace()
                .last()
                .is_some_and(|surname| surname.eq_ignore_ascii_case(token))
        })
        .map(|c| c.id)
        .collect();
    match by_surname.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no competitor matches '{token}'"),
        _ => bail!("'{token}' matches more than one competitor"),
    }
}

/// Parse one compact constraint token into a 0-based event index and constraint.
pub fn parse_constraint(token: &str, field: &Field) -> Result<(usize, Constraint)> {
    if let Some(caps) = position_lock().captures(token) {
        let event = event_index(&caps[1])?;
        let competitor = resolve_competitor(&caps[2], field)?;
        let position = caps[3]
            .parse::<u32>()
            .with_context(|| format!("invalid position in '{token}'"))?;
        return Ok((
            event,
            Constraint::AbsolutePosition {
                competitor,
                position,
            },
        ));
    }

    if let Some(caps) = relative_order().captures(token) {
        let event = event_index(&caps[1])?;
        let ahead = resolve_competitor(&caps[2], field)?;
        let behind = resolve_competitor(&caps[3], field)?;
        return Ok((event, Constraint::RelativeOrder { ahead, behind }));
    }

    bail!("unrecognised constraint '{token}' (expected E:A@P or E:A>B)")
}

fn event_index(raw: &str) -> Result<usize> {
    let event: usize = raw
        .parse()
        .with_context(|| format!("invalid event number '{raw}'"))?;
    ensure!(event >= 1, "event numbers start at 1");
    Ok(event - 1)
}

/// Apply every token on top of `scenarios`, rejecting conflicting constraints.
pub fn apply_constraints(
    scenarios: &mut ScenarioSet,
    tokens: &[String],
    field: &Field,
) -> Result<()> {
    for token in tokens {
        let (event, constraint) = parse_constraint(token, field)?;
        scenarios
            .add(event, constraint, field)
            .with_context(|| format!("constraint '{token}' rejected"))?;
    }
    Ok(())
}
