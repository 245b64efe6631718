use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::models::{Highlight, HighlightMetric, MetricDirection};
use super::outcome::Outcome;

/// Records a metric observation, replacing the stored highlight only on
/// strict improvement. Ties keep the first-seen record.
pub fn record(
    highlights: &mut BTreeMap<HighlightMetric, Highlight>,
    metric: HighlightMetric,
    value: i64,
    date: DateTime<Utc>,
    related_id: &str,
) {
    let improved = match highlights.get(&metric) {
        None => true,
        Some(existing) => match metric.direction() {
            MetricDirection::Highest => value > existing.value,
            MetricDirection::Lowest => value < existing.value,
        },
    };
    if improved {
        highlights.insert(
            metric,
            Highlight {
                metric,
                value,
                date,
                related_id: related_id.to_string(),
                label: metric.label().to_string(),
            },
        );
    }
}

/// Feeds one resolved game outcome into the game-granularity metrics.
///
/// Points metrics are always recorded; count metrics (weis, matsch,
/// schneider, kontermatsch) only once the count is non-zero, so a career of
/// zero events leaves those highlights empty.
pub fn record_game(
    highlights: &mut BTreeMap<HighlightMetric, Highlight>,
    outcome: &Outcome,
    date: DateTime<Utc>,
    related_id: &str,
) {
    record(
        highlights,
        HighlightMetric::HighestPointsGame,
        outcome.points_made,
        date,
        related_id,
    );
    record(
        highlights,
        HighlightMetric::LowestPointsGame,
        outcome.points_made,
        date,
        related_id,
    );
    record(
        highlights,
        HighlightMetric::MostStricheGame,
        i64::from(outcome.striche_made.total()),
        date,
        related_id,
    );
    record(
        highlights,
        HighlightMetric::MostStricheReceivedGame,
        i64::from(outcome.striche_received.total()),
        date,
        related_id,
    );

    let counted: [(HighlightMetric, i64); 7] = [
        (HighlightMetric::MostWeisPointsGame, outcome.weis_made),
        (
            HighlightMetric::MostMatschGame,
            i64::from(outcome.striche_made.matsch),
        ),
        (
            HighlightMetric::MostMatschReceivedGame,
            i64::from(outcome.striche_received.matsch),
        ),
        (
            HighlightMetric::MostSchneiderGame,
            i64::from(outcome.striche_made.schneider),
        ),
        (
            HighlightMetric::MostSchneiderReceivedGame,
            i64::from(outcome.striche_received.schneider),
        ),
        (
            HighlightMetric::MostKontermatschGame,
            i64::from(outcome.striche_made.kontermatsch),
        ),
        (
            HighlightMetric::MostKontermatschReceivedGame,
            i64::from(outcome.striche_received.kontermatsch),
        ),
    ];
    for (metric, value) in counted {
        if value > 0 {
            record(highlights, metric, value, date, related_id);
        }
    }
}

/// Feeds one resolved session outcome into the session-granularity metrics.
pub fn record_session(
    highlights: &mut BTreeMap<HighlightMetric, Highlight>,
    outcome: &Outcome,
    date: DateTime<Utc>,
    related_id: &str,
) {
    record(
        highlights,
        HighlightMetric::HighestPointsSession,
        outcome.points_made,
        date,
        related_id,
    );
    record(
        highlights,
        HighlightMetric::LowestPointsSession,
        outcome.points_made,
        date,
        related_id,
    );
    record(
        highlights,
        HighlightMetric::MostStricheSession,
        i64::from(outcome.striche_made.total()),
        date,
        related_id,
    );
    record(
        highlights,
        HighlightMetric::MostStricheReceivedSession,
        i64::from(outcome.striche_received.total()),
        date,
        related_id,
    );

    let counted: [(HighlightMetric, i64); 8] = [
        (HighlightMetric::MostWeisPointsSession, outcome.weis_made),
        (
            HighlightMetric::MostWeisPointsReceivedSession,
            outcome.weis_received,
        ),
        (
            HighlightMetric::MostMatschSession,
            i64::from(outcome.striche_made.matsch),
        ),
        (
            HighlightMetric::MostMatschReceivedSession,
            i64::from(outcome.striche_received.matsch),
        ),
        (
            HighlightMetric::MostSchneiderSession,
            i64::from(outcome.striche_made.schneider),
        ),
        (
            HighlightMetric::MostSchneiderReceivedSession,
            i64::from(outcome.striche_received.schneider),
        ),
        (
            HighlightMetric::MostKontermatschSession,
            i64::from(outcome.striche_made.kontermatsch),
        ),
        (
            HighlightMetric::MostKontermatschReceivedSession,
            i64::from(outcome.striche_received.kontermatsch),
        ),
    ];
    for (metric, value) in counted {
        if value > 0 {
            record(highlights, metric, value, date, related_id);
        }
    }
}
