use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::model::{InstanceState, Labels};
use crate::wire::ProjectedAlert;

fn rank(state: InstanceState) -> u8 {
    match state {
        InstanceState::Alerting => 0,
        InstanceState::Pending | InstanceState::Recovering => 1,
        InstanceState::Error => 2,
        InstanceState::NoData => 3,
        InstanceState::Normal => 4,
    }
}

fn label_key(labels: &Labels) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}{v}"))
        .collect::<Vec<_>>()
        .join("")
}

/// Most important first: firing, then pending/recovering, then error,
/// nodata and normal; ties go to the most recently active, then to label
/// order so the result is total.
pub fn by_importance(a: &ProjectedAlert, b: &ProjectedAlert) -> Ordering {
    rank(a.instance_state)
        .cmp(&rank(b.instance_state))
        .then_with(|| b.active_at.cmp(&a.active_at))
        .then_with(|| label_key(&a.labels).cmp(&label_key(&b.labels)))
}

struct Ranked(ProjectedAlert);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        by_importance(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        by_importance(&self.0, &other.0)
    }
}

pub fn sort_by_importance(alerts: &mut [ProjectedAlert]) {
    alerts.sort_by(by_importance);
}

/// The `k` most important alerts, in importance order. Keeps a bounded
/// max-heap whose top is the least important alert retained so far.
pub fn top_k(alerts: Vec<ProjectedAlert>, k: usize) -> Vec<ProjectedAlert> {
    if k == 0 {
        return Vec::new();
    }
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for alert in alerts {
        heap.push(Ranked(alert));
        if heap.len() > k {
            heap.pop();
        }
    }
    heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
}
