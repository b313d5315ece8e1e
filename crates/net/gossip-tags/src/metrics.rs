//! Tag tracer metrics.

use metrics::{Counter, Gauge};

#[derive(Clone, Debug)]
pub(crate) struct TagTracerMetrics {
    /// Direct-peer tags applied on connect
    direct_tagged_total: Counter,
    /// Mesh tags applied on graft
    mesh_tagged_total: Counter,
    /// Mesh tags removed on prune
    mesh_untagged_total: Counter,
    /// Successful delivery tag bumps
    delivery_bumps_total: Counter,
    /// Delivery bumps that failed or had no tag to bump
    delivery_bump_failures_total: Counter,
    /// Failed decaying tag registrations
    registration_failures_total: Counter,
    /// Static tag calls rejected by the connection manager
    tag_failures_total: Counter,
    /// Topics with a registered delivery tag, summed over all tracers
    tracked_topics: Gauge,
}

impl Default for TagTracerMetrics {
    fn default() -> Self {
        Self {
            direct_tagged_total: metrics::counter!("pubsub.tags.direct_tagged_total"),
            mesh_tagged_total: metrics::counter!("pubsub.tags.mesh_tagged_total"),
            mesh_untagged_total: metrics::counter!("pubsub.tags.mesh_untagged_total"),
            delivery_bumps_total: metrics::counter!("pubsub.tags.delivery_bumps_total"),
            delivery_bump_failures_total: metrics::counter!(
                "pubsub.tags.delivery_bump_failures_total"
            ),
            registration_failures_total: metrics::counter!(
                "pubsub.tags.registration_failures_total"
            ),
            tag_failures_total: metrics::counter!("pubsub.tags.tag_failures_total"),
            tracked_topics: metrics::gauge!("pubsub.tags.tracked_topics"),
        }
    }
}

impl TagTracerMetrics {
    pub(crate) fn inc_direct_tagged(&self) {
        self.direct_tagged_total.increment(1);
    }

    pub(crate) fn inc_mesh_tagged(&self) {
        self.mesh_tagged_total.increment(1);
    }

    pub(crate) fn inc_mesh_untagged(&self) {
        self.mesh_untagged_total.increment(1);
    }

    pub(crate) fn inc_delivery_bumps(&self) {
        self.delivery_bumps_total.increment(1);
    }

    pub(crate) fn inc_delivery_bump_failures(&self) {
        self.delivery_bump_failures_total.increment(1);
    }

    pub(crate) fn inc_registration_failures(&self) {
        self.registration_failures_total.increment(1);
    }

    pub(crate) fn inc_tag_failures(&self) {
        self.tag_failures_total.increment(1);
    }

    pub(crate) fn inc_tracked_topics(&self) {
        self.tracked_topics.increment(1.0);
    }

    pub(crate) fn dec_tracked_topics(&self) {
        self.tracked_topics.decrement(1.0);
    }
}
