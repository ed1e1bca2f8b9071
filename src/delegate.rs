//! Optional seam to a running editor session.
//!
//! The static index never needs a delegate. When one is attached, its
//! capabilities are read once and cached; calls it cannot serve, or any call
//! with no delegate attached, return [`DelegateOutcome::Unavailable`]
//! immediately.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::types::EntityKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateCapabilities {
    pub inspect: bool,
    pub mutate: bool,
}

/// Result of a delegate call. `Unavailable` is an ordinary outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum DelegateOutcome<T> {
    Available(T),
    Unavailable,
}

impl<T> DelegateOutcome<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, DelegateOutcome::Available(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            DelegateOutcome::Available(value) => Some(value),
            DelegateOutcome::Unavailable => None,
        }
    }
}

/// Live view of an entity, as reported by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEntity {
    pub kind: EntityKind,
    pub name: String,
    pub properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationReport {
    pub applied: bool,
    pub message: String,
}

/// Provider of live-only operations.
#[cfg_attr(test, mockall::automock)]
pub trait LiveDelegate: Send + Sync {
    fn capabilities(&self) -> DelegateCapabilities;

    fn get_live_entity(&self, kind: EntityKind, name: &str) -> DelegateOutcome<LiveEntity>;

    fn mutate_live_entity(
        &self,
        kind: EntityKind,
        name: &str,
        changes: &Value,
    ) -> DelegateOutcome<MutationReport>;
}

/// Holds an optional delegate plus the capabilities it reported on attach.
#[derive(Clone, Default)]
pub struct DelegateSlot {
    delegate: Option<Arc<dyn LiveDelegate>>,
    capabilities: DelegateCapabilities,
}

impl fmt::Debug for DelegateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateSlot")
            .field("attached", &self.delegate.is_some())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl DelegateSlot {
    pub fn attach(delegate: Arc<dyn LiveDelegate>) -> Self {
        let capabilities = delegate.capabilities();
        tracing::debug!("Live delegate attached: {:?}", capabilities);
        Self {
            delegate: Some(delegate),
            capabilities,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.delegate.is_some()
    }

    pub fn capabilities(&self) -> DelegateCapabilities {
        self.capabilities
    }

    pub fn get_live_entity(&self, kind: EntityKind, name: &str) -> DelegateOutcome<LiveEntity> {
        match &self.delegate {
            Some(delegate) if self.capabilities.inspect => delegate.get_live_entity(kind, name),
            _ => DelegateOutcome::Unavailable,
        }
    }

    pub fn mutate_live_entity(
        &self,
        kind: EntityKind,
        name: &str,
        changes: &Value,
    ) -> DelegateOutcome<MutationReport> {
        match &self.delegate {
            Some(delegate) if self.capabilities.mutate => {
                delegate.mutate_live_entity(kind, name, changes)
            }
            _ => DelegateOutcome::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_slot_is_unavailable() {
        let slot = DelegateSlot::default();
        assert!(!slot.is_attached());
        assert_eq!(
            slot.get_live_entity(EntityKind::Declaration, "AHero"),
            DelegateOutcome::Unavailable
        );
        assert_eq!(
            slot.mutate_live_entity(EntityKind::Asset, "SM_Rock", &json!({})),
            DelegateOutcome::Unavailable
        );
    }

    #[test]
    fn test_capabilities_are_queried_once() {
        let mut mock = MockLiveDelegate::new();
        mock.expect_capabilities().times(1).return_const(DelegateCapabilities {
            inspect: true,
            mutate: false,
        });
        mock.expect_get_live_entity()
            .withf(|kind, name| *kind == EntityKind::Declaration && name == "AHero")
            .times(2)
            .returning(|kind, name| {
                DelegateOutcome::Available(LiveEntity {
                    kind,
                    name: name.to_string(),
                    properties: json!({ "Health": 100 }),
                })
            });
        mock.expect_mutate_live_entity().never();

        let slot = DelegateSlot::attach(Arc::new(mock));
        for _ in 0..2 {
            let outcome = slot.get_live_entity(EntityKind::Declaration, "AHero");
            let entity = outcome.into_option().unwrap();
            assert_eq!(entity.properties["Health"], 100);
        }

        // No mutate capability: the delegate is never called.
        let outcome = slot.mutate_live_entity(EntityKind::Declaration, "AHero", &json!({"Health": 1}));
        assert!(!outcome.is_available());
    }

    #[test]
    fn test_delegate_may_still_decline() {
        let mut mock = MockLiveDelegate::new();
        mock.expect_capabilities().return_const(DelegateCapabilities {
            inspect: true,
            mutate: true,
        });
        mock.expect_get_live_entity()
            .returning(|_, _| DelegateOutcome::Unavailable);
        mock.expect_mutate_live_entity().returning(|_, name, _| {
            DelegateOutcome::Available(MutationReport {
                applied: true,
                message: format!("updated {}", name),
            })
        });

        let slot = DelegateSlot::attach(Arc::new(mock));
        assert_eq!(
            slot.get_live_entity(EntityKind::Plugin, "Weather"),
            DelegateOutcome::Unavailable
        );
        let report = slot
            .mutate_live_entity(EntityKind::Plugin, "Weather", &json!({"Enabled": false}))
            .into_option()
            .unwrap();
        assert!(report.applied);
        assert_eq!(report.message, "updated Weather");
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome: DelegateOutcome<MutationReport> = DelegateOutcome::Unavailable;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "unavailable");
    }
}
