//! `$filter` predicate construction

use crate::types::FaunaGroup;
use tracing::warn;

/// An opaque OData boolean predicate, built once per run and immutable after.
///
/// An empty expression means "no filter": the whole entity set is fetched.
/// That is degraded behavior for anything but an explicit all-fauna request,
/// so the builder logs it rather than silently fetching everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    predicate: Option<String>,
}

impl FilterExpression {
    /// Build the predicate for a fauna group selector.
    ///
    /// Single groups become a class-equality test; the all-fauna selector
    /// becomes a disjunction over the known classes so unclassified rows
    /// (fungi, incidental flora) stay excluded.
    pub fn for_group(group: FaunaGroup) -> Self {
        match group.class_name() {
            Some(class) => Self {
                predicate: Some(format!("Class eq '{class}'")),
            },
            None => {
                let clauses: Vec<String> = FaunaGroup::all_classes()
                    .iter()
                    .map(|class| format!("Class eq '{class}'"))
                    .collect();
                Self {
                    predicate: Some(clauses.join(" or ")),
                }
            }
        }
    }

    /// Build a predicate from a raw OData expression
    pub fn raw(predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        if predicate.trim().is_empty() {
            Self::unfiltered()
        } else {
            Self {
                predicate: Some(predicate),
            }
        }
    }

    /// An empty predicate: fetch unfiltered. Logged as degraded behavior.
    pub fn unfiltered() -> Self {
        warn!("no filter predicate; fetching the entire entity set");
        Self { predicate: None }
    }

    /// AND-combine an extra predicate onto this one
    #[must_use]
    pub fn and(self, extra: &str) -> Self {
        let extra = extra.trim();
        if extra.is_empty() {
            return self;
        }
        match self.predicate {
            Some(existing) => Self {
                predicate: Some(format!("({existing}) and ({extra})")),
            },
            None => Self {
                predicate: Some(extra.to_string()),
            },
        }
    }

    /// The predicate string, or `None` when unfiltered
    pub fn as_predicate(&self) -> Option<&str> {
        self.predicate.as_deref()
    }

    /// Check whether this expression filters anything
    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
    }
}
