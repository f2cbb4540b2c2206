//! `eco_results` change feed.
//!
//! Every stored simulation result is published on a broadcast channel.
//! Subscribers filter by recipe id; a subscriber that falls behind skips to
//! the newest rows instead of replaying the backlog.

mod ws;

pub use ws::ws_eco_results;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{EcoResultRow, SimulationResult};

/// Capacity of the broadcast channel.
const FEED_CAPACITY: usize = 256;

/// Publisher side of the change feed.
#[derive(Clone)]
pub struct EcoFeed {
    tx: broadcast::Sender<EcoResultRow>,
}

impl Default for EcoFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl EcoFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Publish a row; returns how many subscribers received it.
    pub fn publish(&self, row: EcoResultRow) -> usize {
        self.tx.send(row).unwrap_or(0)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribe to rows for a single recipe.
    pub fn subscribe(&self, recipe_id: Uuid) -> Subscription {
        Subscription {
            recipe_id,
            rx: self.tx.subscribe(),
        }
    }
}

/// A filtered view of the feed for one recipe.
pub struct Subscription {
    recipe_id: Uuid,
    rx: broadcast::Receiver<EcoResultRow>,
}

impl Subscription {
    pub fn recipe_id(&self) -> Uuid {
        self.recipe_id
    }

    /// Wait for the next row for this recipe. `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<EcoResultRow> {
        loop {
            match self.rx.recv().await {
                Ok(row) if row.recipe_id == self.recipe_id => return Some(row),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "eco_results subscriber lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Dashboard view of one recipe's eco result.
///
/// Matching rows replace the current value wholesale; the last row applied wins.
#[derive(Debug, Clone)]
pub struct Dashboard {
    recipe_id: Uuid,
    current: Option<SimulationResult>,
}

impl Dashboard {
    pub fn new(recipe_id: Uuid) -> Self {
        Self {
            recipe_id,
            current: None,
        }
    }

    /// Seed with the initial fetch result.
    pub fn with_initial(recipe_id: Uuid, initial: SimulationResult) -> Self {
        Self {
            recipe_id,
            current: Some(initial),
        }
    }

    pub fn current(&self) -> Option<&SimulationResult> {
        self.current.as_ref()
    }

    /// Apply a feed event. Rows for other recipes are ignored; returns whether state changed.
    pub fn apply(&mut self, row: &EcoResultRow) -> bool {
        if row.recipe_id != self.recipe_id {
            return false;
        }
        self.current = Some(row.result.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(recipe_id: Uuid, score: f64) -> EcoResultRow {
        EcoResultRow {
            id: Uuid::new_v4(),
            recipe_id,
            result: SimulationResult {
                eco_score: score,
                co2_saved_kg: 40.0,
                variance_cost: 0.3,
                best_sources: vec!["local".into()],
                route_cluster: "Cluster-SimA".into(),
            },
            created_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn test_dashboard_ignores_other_recipes() {
        let mine = Uuid::new_v4();
        let mut dashboard = Dashboard::new(mine);

        assert!(!dashboard.apply(&row(Uuid::new_v4(), 10.0)));
        assert!(dashboard.current().is_none());

        assert!(dashboard.apply(&row(mine, 55.0)));
        assert!(dashboard.apply(&row(mine, 72.5)));
        assert_eq!(dashboard.current().unwrap().eco_score, 72.5);

        assert!(!dashboard.apply(&row(Uuid::new_v4(), 1.0)));
        assert_eq!(dashboard.current().unwrap().eco_score, 72.5);
    }

    #[tokio::test]
    async fn test_subscription_filters_by_recipe() {
        let feed = EcoFeed::new();
        let mine = Uuid::new_v4();
        let mut sub = feed.subscribe(mine);

        feed.publish(row(Uuid::new_v4(), 1.0));
        feed.publish(row(mine, 2.0));

        let received = sub.next().await.unwrap();
        assert_eq!(received.recipe_id, mine);
        assert_eq!(received.result.eco_score, 2.0);
    }

    #[tokio::test]
    async fn test_subscription_ends_when_feed_dropped() {
        let feed = EcoFeed::new();
        let mut sub = feed.subscribe(Uuid::new_v4());
        drop(feed);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = EcoFeed::new();
        assert_eq!(feed.publish(row(Uuid::new_v4(), 1.0)), 0);
    }
}
