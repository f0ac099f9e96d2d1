//! Answer scoring and leaderboard ordering.

use std::cmp::Ordering;
use std::time::Duration;

use crate::model::Player;

/// Bonus points for answering quickly: one point per full 100 ms left on
/// the clock, never negative.
pub fn time_bonus(time_limit: Duration, elapsed: Duration) -> u64 {
    let remaining_ms = time_limit.as_millis().saturating_sub(elapsed.as_millis());
    u64::try_from(remaining_ms / 100).unwrap_or(u64::MAX)
}

/// Total awarded for a correct answer.
pub fn award(points: u32, time_limit: Duration, elapsed: Duration) -> u64 {
    u64::from(points).saturating_add(time_bonus(time_limit, elapsed))
}

/// Leaderboard order: score descending, then whoever answered last
/// earliest, then player id so the order is total.
pub fn leaderboard_order(a: &Player, b: &Player) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.last_answer_at.cmp(&b.last_answer_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts players into leaderboard order.
pub fn rank<I>(players: I) -> Vec<Player>
where
    I: IntoIterator<Item = Player>,
{
    let mut ranked: Vec<Player> = players.into_iter().collect();
    ranked.sort_by(leaderboard_order);
    ranked
}
