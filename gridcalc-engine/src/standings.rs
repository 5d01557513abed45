//! Competitors, the validated field, and standings aggregation with countback.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{EngineError, SnapshotError};
use crate::schedule::Event;

/// Stable small-integer key for a competitor (e.g. a car number).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct CompetitorId(pub u32);

impl std::fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Finishes per rank, index 0 counting wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Countback(Vec<u32>);

impl Countback {
    #[must_use]
    pub fn new(counts: Vec<u32>) -> Self {
        Self(counts)
    }

    /// Record one finish at a 1-based rank.
    pub fn record(&mut self, rank: usize) {
        let Some(idx) = rank.checked_sub(1) else {
            return;
        };
        if self.0.len() <= idx {
            self.0.resize(idx + 1, 0);
        }
        self.0[idx] = self.0[idx].saturating_add(1);
    }

    #[must_use]
    pub fn finishes_at(&self, rank: usize) -> u32 {
        rank.checked_sub(1)
            .and_then(|idx| self.0.get(idx).copied())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn wins(&self) -> u32 {
        self.finishes_at(1)
    }

    /// `Greater` when `self` has the better record (more wins, then more 2nds, ...).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (1..=len)
            .map(|rank| self.finishes_at(rank).cmp(&other.finishes_at(rank)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

/// An entrant with their current cumulative points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: CompetitorId,
    pub name: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub countback: Countback,
}

impl Competitor {
    #[must_use]
    pub fn new(id: u32, name: &str, points: u32) -> Self {
        Self {
            id: CompetitorId(id),
            name: name.to_string(),
            points,
            countback: Countback::default(),
        }
    }

    #[must_use]
    pub fn with_countback(mut self, countback: Countback) -> Self {
        self.countback = countback;
        self
    }
}

/// Championship ordering: points, then countback, then ascending id.
#[must_use]
pub fn championship_cmp(a: &Competitor, b: &Competitor) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.countback.compare(&a.countback))
        .then_with(|| a.id.cmp(&b.id))
}

/// Validated, non-empty competitor list for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    competitors: Vec<Competitor>,
    index: HashMap<CompetitorId, usize>,
    ranking: Vec<usize>,
}

impl Field {
    /// Validate and index a competitor list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or contains duplicate identifiers.
    pub fn new(competitors: Vec<Competitor>) -> Result<Self, EngineError> {
        if competitors.is_empty() {
            return Err(EngineError::EmptyField);
        }
        let mut index = HashMap::with_capacity(competitors.len());
        for (idx, competitor) in competitors.iter().enumerate() {
            if index.insert(competitor.id, idx).is_some() {
                return Err(EngineError::DuplicateCompetitor(competitor.id));
            }
        }
        let mut ranking: Vec<usize> = (0..competitors.len()).collect();
        ranking.sort_by(|&a, &b| championship_cmp(&competitors[a], &competitors[b]));
        Ok(Self {
            competitors,
            index,
            ranking,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.competitors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.competitors.is_empty()
    }

    #[must_use]
    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    #[must_use]
    pub fn competitor(&self, idx: usize) -> &Competitor {
        &self.competitors[idx]
    }

    #[must_use]
    pub fn get(&self, id: CompetitorId) -> Option<&Competitor> {
        self.index.get(&id).map(|&idx| &self.competitors[idx])
    }

    #[must_use]
    pub fn position_of(&self, id: CompetitorId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Index of a competitor, failing for ids outside the field.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownCompetitor`] when `id` is not in the field.
    pub fn index_of(&self, id: CompetitorId) -> Result<usize, EngineError> {
        self.position_of(id)
            .ok_or(EngineError::UnknownCompetitor(id))
    }

    /// Field indices in championship order.
    #[must_use]
    pub fn ranking(&self) -> &[usize] {
        &self.ranking
    }

    /// Championship rank (0 = leader) per field index.
    #[must_use]
    pub fn standing_ranks(&self) -> Vec<usize> {
        let mut ranks = vec![0; self.len()];
        for (rank, &idx) in self.ranking.iter().enumerate() {
            ranks[idx] = rank;
        }
        ranks
    }

    #[must_use]
    pub fn leader(&self) -> &Competitor {
        &self.competitors[self.ranking[0]]
    }

    /// The top `count` competitors by championship order.
    #[must_use]
    pub fn favored(&self, count: usize) -> Vec<usize> {
        self.ranking.iter().copied().take(count).collect()
    }
}

/// Per-competitor points gained in each completed event, oldest first.
pub type PointsHistory = BTreeMap<CompetitorId, Vec<u32>>;

/// Per-competitor count of primary-event wins.
pub type WinCounts = BTreeMap<CompetitorId, u32>;

/// Named entrant as supplied by the standings provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: CompetitorId,
    pub name: String,
}

/// One competitor's classified result in a completed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResult {
    pub competitor: CompetitorId,
    pub position: u32,
    /// Explicit points; defaults to the event's payout for `position`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

/// A completed event and its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedEvent {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default)]
    pub results: Vec<EventResult>,
}

impl CompletedEvent {
    fn points_for(&self, result: &EventResult) -> u32 {
        result.points.unwrap_or_else(|| {
            usize::try_from(result.position)
                .map(|rank| self.event.payouts().points_for_rank(rank))
                .unwrap_or(0)
        })
    }
}

fn unnamed(id: CompetitorId) -> String {
    format!("Driver {id}")
}

/// Championship table derived from completed events.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Standings {
    pub competitors: Vec<Competitor>,
    pub history: PointsHistory,
    pub wins: WinCounts,
}

impl Standings {
    /// Fold completed events into cumulative points, history, and countback.
    ///
    /// Competitors appearing in results without an entrant record are named
    /// after their id.
    ///
    /// # Errors
    ///
    /// Returns an error if an event lists the same competitor twice or places
    /// a competitor outside `1..=` the number of known competitors.
    pub fn aggregate(
        entrants: &[Entrant],
        completed: &[CompletedEvent],
    ) -> Result<Self, SnapshotError> {
        let mut names: BTreeMap<CompetitorId, String> = entrants
            .iter()
            .map(|entrant| (entrant.id, entrant.name.clone()))
            .collect();
        let mut order: Vec<CompetitorId> = entrants.iter().map(|entrant| entrant.id).collect();
        for result in completed.iter().flat_map(|event| &event.results) {
            if !names.contains_key(&result.competitor) {
                names.insert(result.competitor, unnamed(result.competitor));
                order.push(result.competitor);
            }
        }

        let field_size = order.len();
        let mut points: BTreeMap<CompetitorId, u32> = BTreeMap::new();
        let mut countbacks: BTreeMap<CompetitorId, Countback> = BTreeMap::new();
        let mut history: PointsHistory = order
            .iter()
            .map(|id| (*id, Vec::with_capacity(completed.len())))
            .collect();

        for (ordinal, event) in completed.iter().enumerate() {
            let mut seen = BTreeSet::new();
            let mut gained: BTreeMap<CompetitorId, u32> = BTreeMap::new();
            for result in &event.results {
                if !seen.insert(result.competitor) {
                    return Err(SnapshotError::DuplicateResult {
                        event: event.event.describe(ordinal + 1),
                        competitor: result.competitor,
                    });
                }
                let rank = usize::try_from(result.position)
                    .ok()
                    .filter(|rank| (1..=field_size).contains(rank))
                    .ok_or_else(|| SnapshotError::PositionOutOfRange {
                        event: event.event.describe(ordinal + 1),
                        competitor: result.competitor,
                        position: result.position,
                        field_size,
                    })?;
                let earned = event.points_for(result);
                gained.insert(result.competitor, earned);
                let total = points.entry(result.competitor).or_default();
                *total = total.saturating_add(earned);
                if event.event.is_primary() {
                    countbacks.entry(result.competitor).or_default().record(rank);
                }
            }
            for (id, entries) in &mut history {
                entries.push(gained.get(id).copied().unwrap_or(0));
            }
        }

        let wins = order
            .iter()
            .map(|id| (*id, countbacks.get(id).map_or(0, Countback::wins)))
            .collect();
        let mut competitors: Vec<Competitor> = order
            .iter()
            .map(|id| Competitor {
                id: *id,
                name: names.remove(id).unwrap_or_default(),
                points: points.get(id).copied().unwrap_or(0),
                countback: countbacks.remove(id).unwrap_or_default(),
            })
            .collect();
        competitors.sort_by(championship_cmp);

        Ok(Self {
            competitors,
            history,
            wins,
        })
    }

    /// Standings after the first `weekends` primary events plus any short
    /// events that share a label with them. Every competitor known to the
    /// full season is listed, so positions validate against the same field.
    ///
    /// # Errors
    ///
    /// Returns an error if an event lists the same competitor twice.
    pub fn after_weekends(
        entrants: &[Entrant],
        completed: &[CompletedEvent],
        weekends: usize,
    ) -> Result<Self, SnapshotError> {
        let labels: BTreeSet<&str> = completed
            .iter()
            .filter(|event| event.event.is_primary())
            .take(weekends)
            .map(|event| event.event.label.as_str())
            .collect();
        let mut primaries_left = weekends;
        let subset: Vec<CompletedEvent> = completed
            .iter()
            .filter(|event| {
                if event.event.is_primary() {
                    let keep = primaries_left > 0;
                    primaries_left = primaries_left.saturating_sub(1);
                    keep
                } else {
                    labels.contains(event.event.label.as_str())
                }
            })
            .cloned()
            .collect();
        let mut known: BTreeSet<CompetitorId> = entrants.iter().map(|entrant| entrant.id).collect();
        let mut season_field = entrants.to_vec();
        for result in completed.iter().flat_map(|event| &event.results) {
            if known.insert(result.competitor) {
                season_field.push(Entrant {
                    id: result.competitor,
                    name: unnamed(result.competitor),
                });
            }
        }
        Self::aggregate(&season_field, &subset)
    }

    /// Validated field built from these standings.
    ///
    /// # Errors
    ///
    /// Returns an error if no competitor is known.
    pub fn field(&self) -> Result<Field, EngineError> {
        Field::new(self.competitors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: u32, position: u32) -> EventResult {
        EventResult {
            competitor: CompetitorId(id),
            position,
            points: None,
        }
    }

    fn completed(event: Event, finishers: &[u32]) -> CompletedEvent {
        CompletedEvent {
            event,
            results: finishers
                .iter()
                .zip(1..)
                .map(|(id, pos)| result(*id, pos))
                .collect(),
        }
    }

    fn entrants() -> Vec<Entrant> {
        [(1, "Verstappen"), (4, "Norris"), (81, "Piastri")]
            .into_iter()
            .map(|(id, name)| Entrant {
                id: CompetitorId(id),
                name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn countback_prefers_more_wins_then_seconds() {
        let mut a = Countback::default();
        let mut b = Countback::default();
        a.record(1);
        a.record(3);
        b.record(1);
        b.record(2);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a.clone()), Ordering::Equal);
        a.record(0);
        assert_eq!(a.wins(), 1);
    }

    #[test]
    fn field_rejects_empty_and_duplicates() {
        assert_eq!(Field::new(Vec::new()), Err(EngineError::EmptyField));
        let dupes = vec![Competitor::new(1, "A", 0), Competitor::new(1, "B", 3)];
        assert_eq!(
            Field::new(dupes),
            Err(EngineError::DuplicateCompetitor(CompetitorId(1)))
        );
    }

    #[test]
    fn field_ranks_by_points_then_countback_then_id() {
        let mut wins = Countback::default();
        wins.record(1);
        let field = Field::new(vec![
            Competitor::new(7, "Seven", 100),
            Competitor::new(3, "Three", 120),
            Competitor::new(5, "Five", 100).with_countback(wins),
            Competitor::new(2, "Two", 100),
        ])
        .unwrap();
        let ids: Vec<u32> = field
            .ranking()
            .iter()
            .map(|&idx| field.competitor(idx).id.0)
            .collect();
        assert_eq!(ids, vec![3, 5, 2, 7]);
        assert_eq!(field.leader().id, CompetitorId(3));
        assert_eq!(field.standing_ranks()[0], 3);
        assert_eq!(field.favored(2).len(), 2);
    }

    #[test]
    fn aggregate_sums_points_history_and_wins() {
        let events = vec![
            completed(Event::primary("Australia"), &[4, 1, 81]),
            completed(Event::short("China"), &[81, 4, 1]),
            completed(Event::primary("China"), &[81, 4, 1]),
        ];
        let standings = Standings::aggregate(&entrants(), &events).unwrap();
        let by_id: BTreeMap<u32, u32> = standings
            .competitors
            .iter()
            .map(|c| (c.id.0, c.points))
            .collect();
        assert_eq!(by_id[&4], 25 + 7 + 18);
        assert_eq!(by_id[&81], 15 + 8 + 25);
        assert_eq!(by_id[&1], 18 + 6 + 15);
        assert_eq!(standings.history[&CompetitorId(81)], vec![15, 8, 25]);
        assert_eq!(standings.wins[&CompetitorId(4)], 1);
        assert_eq!(standings.wins[&CompetitorId(81)], 1);
        assert_eq!(standings.competitors[0].id, CompetitorId(4));
    }

    #[test]
    fn aggregate_names_unknown_finishers_and_rejects_duplicates() {
        let events = vec![completed(Event::primary("Japan"), &[1, 63])];
        let standings = Standings::aggregate(&entrants(), &events).unwrap();
        let russell = standings
            .competitors
            .iter()
            .find(|c| c.id == CompetitorId(63))
            .unwrap();
        assert_eq!(russell.name, "Driver #63");
        assert_eq!(standings.history[&CompetitorId(4)], vec![0]);

        let broken = vec![completed(Event::primary("Bahrain"), &[1, 1])];
        assert!(matches!(
            Standings::aggregate(&entrants(), &broken),
            Err(SnapshotError::DuplicateResult { .. })
        ));
    }

    #[test]
    fn aggregate_rejects_positions_outside_the_field() {
        for position in [0, 4, 4_000_000_000] {
            let events = vec![CompletedEvent {
                event: Event::primary("Monza"),
                results: vec![result(1, 1), result(4, position)],
            }];
            match Standings::aggregate(&entrants(), &events) {
                Err(SnapshotError::PositionOutOfRange {
                    competitor,
                    position: reported,
                    field_size,
                    ..
                }) => {
                    assert_eq!(competitor, CompetitorId(4));
                    assert_eq!(reported, position);
                    assert_eq!(field_size, 3);
                }
                other => panic!("position {position} accepted: {other:?}"),
            }
        }

        // Sprint classifications are bounded the same way.
        let sprint = vec![CompletedEvent {
            event: Event::short("Monza"),
            results: vec![result(81, 9)],
        }];
        assert!(matches!(
            Standings::aggregate(&entrants(), &sprint),
            Err(SnapshotError::PositionOutOfRange { .. })
        ));
    }

    #[test]
    fn aggregate_saturates_explicit_points() {
        let huge = |id| EventResult {
            competitor: CompetitorId(id),
            position: 1,
            points: Some(3_000_000_000),
        };
        let events = vec![
            CompletedEvent {
                event: Event::primary("Zandvoort"),
                results: vec![huge(1)],
            },
            CompletedEvent {
                event: Event::primary("Monza"),
                results: vec![huge(1)],
            },
        ];
        let standings = Standings::aggregate(&entrants(), &events).unwrap();
        assert_eq!(standings.competitors[0].id, CompetitorId(1));
        assert_eq!(standings.competitors[0].points, u32::MAX);
        assert_eq!(standings.history[&CompetitorId(1)], vec![3_000_000_000; 2]);
    }

    #[test]
    fn after_weekends_includes_matching_short_events() {
        let events = vec![
            completed(Event::primary("Australia"), &[4, 1, 81]),
            completed(Event::short("China"), &[81, 4, 1]),
            completed(Event::primary("China"), &[81, 4, 1]),
            completed(Event::primary("Japan"), &[1, 4, 81]),
        ];
        let one = Standings::after_weekends(&entrants(), &events, 1).unwrap();
        assert_eq!(one.competitors[0].points, 25);
        assert_eq!(one.history[&CompetitorId(4)].len(), 1);
        let two = Standings::after_weekends(&entrants(), &events, 2).unwrap();
        assert_eq!(two.history[&CompetitorId(4)].len(), 3);
    }

    #[test]
    fn after_weekends_validates_against_the_whole_season() {
        // P4 only exists once #63 turns up in the second weekend.
        let events = vec![
            CompletedEvent {
                event: Event::primary("Australia"),
                results: vec![result(4, 1), result(1, 4)],
            },
            completed(Event::primary("China"), &[63, 4, 1, 81]),
        ];
        let one = Standings::after_weekends(&entrants(), &events, 1).unwrap();
        assert_eq!(one.competitors.len(), 4);
        let newcomer = one
            .competitors
            .iter()
            .find(|c| c.id == CompetitorId(63))
            .unwrap();
        assert_eq!(newcomer.points, 0);
        assert_eq!(newcomer.name, "Driver #63");
    }
}
