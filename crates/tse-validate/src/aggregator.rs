//! Children-error flags of the report tree.
//!
//! Summarized information and case rows carry a flag telling whether any
//! row below them has a warning. The flags are derived data: they are
//! recomputed from the leaves upward after every mutation.

use tse_model::{RowId, SchemaId, TableRow};
use tse_store::{RowStore, children_of, parent_of};

use crate::error::{Result, ValidateError};
use crate::validator::ValidatorRegistry;

/// A flag that was written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
    pub schema: SchemaId,
    pub id: RowId,
    pub children_error: bool,
}

/// Recomputes children-error flags through any [`RowStore`].
#[derive(Debug, Clone)]
pub struct ValidationAggregator {
    registry: ValidatorRegistry,
}

impl Default for ValidationAggregator {
    fn default() -> Self {
        Self::new(ValidatorRegistry::with_defaults())
    }
}

impl ValidationAggregator {
    pub fn new(registry: ValidatorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Warning level of a row as seen by its parent.
    ///
    /// A row whose own children-error flag is set counts as level 1 even if
    /// the row itself is clean, so the flag covers all descendants.
    pub fn effective_level(&self, row: &TableRow) -> u32 {
        let own = self.registry.warning_level(row);
        if own == 0 && row.schema().has_children_error_flag() && row.children_error() {
            1
        } else {
            own
        }
    }

    /// Flag value `parent` should carry given its stored children.
    fn compute_flag<S: RowStore + ?Sized>(&self, store: &S, parent: &TableRow) -> Result<bool> {
        Ok(children_of(store, parent)?
            .iter()
            .any(|child| self.effective_level(child) > 0))
    }

    /// Write `error` to the row if it differs from the stored flag.
    fn store_flag<S: RowStore + ?Sized>(
        store: &mut S,
        row: &mut TableRow,
        error: bool,
        changes: &mut Vec<FlagChange>,
    ) -> Result<()> {
        if row.children_error() == error {
            return Ok(());
        }
        row.set_children_error(error);
        store.update(row)?;
        let change = FlagChange {
            schema: row.schema(),
            id: row.database_id()?,
            children_error: error,
        };
        tracing::debug!(
            schema = %change.schema,
            id = %change.id,
            children_error = error,
            "children error flag changed"
        );
        changes.push(change);
        Ok(())
    }

    /// Recompute the flags of every ancestor of `changed`, parent first.
    ///
    /// `changed` may already be deleted from the store; only its parent link
    /// is used. Running this twice in a row changes nothing the second time.
    pub fn recompute_ancestors<S: RowStore + ?Sized>(
        &self,
        store: &mut S,
        changed: &TableRow,
    ) -> Result<Vec<FlagChange>> {
        let mut changes = Vec::new();
        let mut current = changed.clone();

        while let Some(mut parent) = parent_of(store, &current)? {
            if !parent.schema().has_children_error_flag() {
                break;
            }
            let error = self.compute_flag(store, &parent)?;
            Self::store_flag(store, &mut parent, error, &mut changes)?;
            current = parent;
        }

        Ok(changes)
    }

    /// Recompute every flag of one report from the leaves up.
    pub fn refresh_report<S: RowStore + ?Sized>(
        &self,
        store: &mut S,
        report_id: RowId,
    ) -> Result<Vec<FlagChange>> {
        let report = store
            .get(SchemaId::Report, report_id)?
            .ok_or(ValidateError::RowNotFound {
                schema: SchemaId::Report,
                id: report_id,
            })?;

        let mut changes = Vec::new();
        for mut si in children_of(store, &report)? {
            for mut case in children_of(store, &si)? {
                let error = self.compute_flag(store, &case)?;
                Self::store_flag(store, &mut case, error, &mut changes)?;
            }
            let error = self.compute_flag(store, &si)?;
            Self::store_flag(store, &mut si, error, &mut changes)?;
        }

        tracing::info!(
            report = %report_id,
            changed = changes.len(),
            "refreshed children error flags"
        );
        Ok(changes)
    }
}
