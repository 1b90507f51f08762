//! Reactive view state with explicit publish/subscribe.
//!
//! Every field has its own [`Topic`]. Subscribers register the topics they care about and
//! drain their own event queue; a change is queued only for subscribers of its topic.
//! Setters are idempotent and report whether anything changed.

use std::collections::VecDeque;
use std::ops::BitOr;

use shared::{ClusterId, PatientId, CLUSTER_COUNT};

use crate::scene::mesh::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Selection,
    Clusters,
    Overlay,
    Wireframe,
    Xray,
    ExtraLight,
    TwoD,
    Tint,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Selection,
        Topic::Clusters,
        Topic::Overlay,
        Topic::Wireframe,
        Topic::Xray,
        Topic::ExtraLight,
        Topic::TwoD,
        Topic::Tint,
    ];

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// A set of topics, built with `|`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopicSet(u16);

impl TopicSet {
    pub const EMPTY: TopicSet = TopicSet(0);
    pub const ALL: TopicSet = TopicSet(0xff);

    pub const fn contains(self, topic: Topic) -> bool {
        self.0 & topic.bit() != 0
    }

    pub const fn with(self, topic: Topic) -> TopicSet {
        TopicSet(self.0 | topic.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Topic> for TopicSet {
    fn from(topic: Topic) -> Self {
        TopicSet(topic.bit())
    }
}

impl BitOr for Topic {
    type Output = TopicSet;
    fn bitor(self, rhs: Topic) -> TopicSet {
        TopicSet::from(self).with(rhs)
    }
}

impl BitOr<Topic> for TopicSet {
    type Output = TopicSet;
    fn bitor(self, rhs: Topic) -> TopicSet {
        self.with(rhs)
    }
}

impl BitOr for TopicSet {
    type Output = TopicSet;
    fn bitor(self, rhs: TopicSet) -> TopicSet {
        TopicSet(self.0 | rhs.0)
    }
}

/// A single field change, carrying the new value
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Selection(Option<PatientId>),
    ClusterVisibility { cluster: ClusterId, visible: bool },
    Overlay(bool),
    Wireframe(bool),
    Xray(bool),
    ExtraLight(bool),
    TwoD(bool),
    Tint(Option<Rgb>),
}

impl ViewEvent {
    pub fn topic(&self) -> Topic {
        match self {
            ViewEvent::Selection(_) => Topic::Selection,
            ViewEvent::ClusterVisibility { .. } => Topic::Clusters,
            ViewEvent::Overlay(_) => Topic::Overlay,
            ViewEvent::Wireframe(_) => Topic::Wireframe,
            ViewEvent::Xray(_) => Topic::Xray,
            ViewEvent::ExtraLight(_) => Topic::ExtraLight,
            ViewEvent::TwoD(_) => Topic::TwoD,
            ViewEvent::Tint(_) => Topic::Tint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

#[derive(Debug)]
struct Subscriber {
    topics: TopicSet,
    queue: VecDeque<ViewEvent>,
    active: bool,
}

/// The state vector the scene is synchronized against
#[derive(Debug)]
pub struct ViewState {
    selected: Option<PatientId>,
    clusters_visible: [bool; CLUSTER_COUNT],
    show_overlay: bool,
    wireframe: bool,
    xray: bool,
    extra_light: bool,
    two_d: bool,
    tint: Option<Rgb>,
    subscribers: Vec<Subscriber>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            selected: None,
            clusters_visible: [true; CLUSTER_COUNT],
            show_overlay: true,
            wireframe: false,
            xray: false,
            extra_light: false,
            two_d: false,
            tint: None,
            subscribers: Vec::new(),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Subscriptions ────────────────────────────────────────

    pub fn subscribe(&mut self, topics: impl Into<TopicSet>) -> SubscriberId {
        self.subscribers.push(Subscriber {
            topics: topics.into(),
            queue: VecDeque::new(),
            active: true,
        });
        SubscriberId(self.subscribers.len() - 1)
    }

    /// Stop queueing events for `id` and drop what it has not drained
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        if let Some(sub) = self.subscribers.get_mut(id.0) {
            sub.active = false;
            sub.queue.clear();
        }
    }

    /// Drain the events queued for `id`, oldest first
    pub fn take_events(&mut self, id: SubscriberId) -> Vec<ViewEvent> {
        self.subscribers
            .get_mut(id.0)
            .map(|s| s.queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn has_pending(&self, id: SubscriberId) -> bool {
        self.subscribers
            .get(id.0)
            .is_some_and(|s| !s.queue.is_empty())
    }

    fn publish(&mut self, event: ViewEvent) {
        let topic = event.topic();
        for sub in self.subscribers.iter_mut() {
            if sub.active && sub.topics.contains(topic) {
                sub.queue.push_back(event.clone());
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn clusters_visible(&self) -> [bool; CLUSTER_COUNT] {
        self.clusters_visible
    }

    pub fn cluster_visible(&self, cluster: ClusterId) -> bool {
        self.clusters_visible
            .get(cluster as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn show_overlay(&self) -> bool {
        self.show_overlay
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn xray(&self) -> bool {
        self.xray
    }

    pub fn extra_light(&self) -> bool {
        self.extra_light
    }

    pub fn two_d(&self) -> bool {
        self.two_d
    }

    pub fn tint(&self) -> Option<Rgb> {
        self.tint
    }

    // ── Setters ──────────────────────────────────────────────

    pub fn select(&mut self, patient: Option<PatientId>) -> bool {
        if self.selected == patient {
            return false;
        }
        self.selected = patient.clone();
        self.publish(ViewEvent::Selection(patient));
        true
    }

    pub fn set_cluster_visible(&mut self, cluster: ClusterId, visible: bool) -> bool {
        let Some(slot) = self.clusters_visible.get_mut(cluster as usize) else {
            tracing::warn!("Ignoring visibility for unknown cluster {}", cluster);
            return false;
        };
        if *slot == visible {
            return false;
        }
        *slot = visible;
        self.publish(ViewEvent::ClusterVisibility { cluster, visible });
        true
    }

    pub fn set_overlay(&mut self, on: bool) -> bool {
        if self.show_overlay == on {
            return false;
        }
        self.show_overlay = on;
        self.publish(ViewEvent::Overlay(on));
        true
    }

    pub fn set_wireframe(&mut self, on: bool) -> bool {
        if self.wireframe == on {
            return false;
        }
        self.wireframe = on;
        self.publish(ViewEvent::Wireframe(on));
        true
    }

    /// Enabling x-ray leaves an active tint in place
    pub fn set_xray(&mut self, on: bool) -> bool {
        if self.xray == on {
            return false;
        }
        self.xray = on;
        self.publish(ViewEvent::Xray(on));
        true
    }

    pub fn set_extra_light(&mut self, on: bool) -> bool {
        if self.extra_light == on {
            return false;
        }
        self.extra_light = on;
        self.publish(ViewEvent::ExtraLight(on));
        true
    }

    pub fn set_two_d(&mut self, on: bool) -> bool {
        if self.two_d == on {
            return false;
        }
        self.two_d = on;
        self.publish(ViewEvent::TwoD(on));
        true
    }

    /// Setting a tint forces x-ray off first; clearing it does not touch x-ray
    pub fn set_tint(&mut self, tint: Option<Rgb>) -> bool {
        if self.tint == tint {
            return false;
        }
        if tint.is_some() {
            self.set_xray(false);
        }
        self.tint = tint;
        self.publish(ViewEvent::Tint(tint));
        true
    }

    // ── Toggles ──────────────────────────────────────────────

    pub fn toggle_cluster(&mut self, cluster: ClusterId) -> bool {
        let visible = self.cluster_visible(cluster);
        self.set_cluster_visible(cluster, !visible)
    }

    pub fn toggle_overlay(&mut self) -> bool {
        self.set_overlay(!self.show_overlay)
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.set_wireframe(!self.wireframe)
    }

    pub fn toggle_xray(&mut self) -> bool {
        self.set_xray(!self.xray)
    }

    pub fn toggle_extra_light(&mut self) -> bool {
        self.set_extra_light(!self.extra_light)
    }

    pub fn toggle_two_d(&mut self) -> bool {
        self.set_two_d(!self.two_d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let v = ViewState::new();
        assert_eq!(v.selected(), None);
        assert_eq!(v.clusters_visible(), [true; 4]);
        assert!(v.show_overlay());
        assert!(!v.wireframe() && !v.xray() && !v.extra_light() && !v.two_d());
        assert_eq!(v.tint(), None);
    }

    #[test]
    fn test_setters_are_idempotent() {
        let mut v = ViewState::new();
        let sub = v.subscribe(TopicSet::ALL);
        assert!(v.set_wireframe(true));
        assert!(!v.set_wireframe(true));
        assert!(!v.set_overlay(true));
        assert!(!v.set_cluster_visible(2, true));
        assert_eq!(v.take_events(sub), vec![ViewEvent::Wireframe(true)]);
    }

    #[test]
    fn test_events_routed_by_topic() {
        let mut v = ViewState::new();
        let wire = v.subscribe(Topic::Wireframe);
        let vis = v.subscribe(Topic::Clusters | Topic::Overlay);

        v.toggle_wireframe();
        v.toggle_cluster(1);
        v.toggle_overlay();
        v.toggle_two_d();

        assert_eq!(v.take_events(wire), vec![ViewEvent::Wireframe(true)]);
        assert_eq!(
            v.take_events(vis),
            vec![
                ViewEvent::ClusterVisibility { cluster: 1, visible: false },
                ViewEvent::Overlay(false),
            ]
        );
        assert!(v.take_events(vis).is_empty());
    }

    #[test]
    fn test_tint_forces_xray_off() {
        let mut v = ViewState::new();
        let sub = v.subscribe(Topic::Xray | Topic::Tint);
        v.set_xray(true);
        v.set_tint(Some([1.0, 0.0, 0.0]));
        assert!(!v.xray());
        assert_eq!(
            v.take_events(sub),
            vec![
                ViewEvent::Xray(true),
                ViewEvent::Xray(false),
                ViewEvent::Tint(Some([1.0, 0.0, 0.0])),
            ]
        );
    }

    #[test]
    fn test_xray_keeps_tint() {
        let mut v = ViewState::new();
        v.set_tint(Some([0.2, 0.4, 0.6]));
        v.set_xray(true);
        assert!(v.xray());
        assert_eq!(v.tint(), Some([0.2, 0.4, 0.6]));
    }

    #[test]
    fn test_clearing_tint_leaves_xray() {
        let mut v = ViewState::new();
        v.set_tint(Some([0.2, 0.4, 0.6]));
        v.set_xray(true);
        v.set_tint(None);
        assert!(v.xray());
    }

    #[test]
    fn test_unknown_cluster_ignored() {
        let mut v = ViewState::new();
        assert!(!v.set_cluster_visible(7, false));
        assert!(!v.cluster_visible(7));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut v = ViewState::new();
        let sub = v.subscribe(TopicSet::ALL);
        v.toggle_xray();
        v.unsubscribe(sub);
        v.toggle_xray();
        assert!(v.take_events(sub).is_empty());
        assert!(!v.has_pending(sub));
    }
}
