//! Blocking entry points for hosts whose trigger callback is a plain
//! function.

use cdc_webhook_core::types::{RowChange, Timing, TriggerId};
use cdc_webhook_core::{Error, Result};
use std::future::Future;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::coordinator::{FiringOutcome, TriggerExecutor};

/// Drive `f` to completion from synchronous code. Fails instead of
/// blocking when called from a current-thread runtime, which cannot lend
/// its only worker to a blocking section.
pub fn block_on_engine<F, T>(rt: &Handle, f: F) -> Result<T>
where
    F: Future<Output = T>,
{
    match Handle::try_current() {
        Ok(current) if current.runtime_flavor() == RuntimeFlavor::CurrentThread => {
            Err(Error::InternalError(
                "blocking trigger firing is not supported on a current-thread runtime".into(),
            ))
        }
        Ok(_) => Ok(tokio::task::block_in_place(|| rt.block_on(f))),
        Err(_) => Ok(rt.block_on(f)),
    }
}

pub struct BlockingExecutor {
    inner: TriggerExecutor,
    rt: Handle,
}

impl BlockingExecutor {
    pub fn new(inner: TriggerExecutor, rt: Handle) -> Self {
        Self { inner, rt }
    }

    pub fn fire(&self, id: &TriggerId, change: &RowChange) -> Result<FiringOutcome> {
        block_on_engine(&self.rt, self.inner.fire(id, change))?
    }

    pub fn on_row_change(
        &self,
        schema: &str,
        table: &str,
        timing: Timing,
        change: &RowChange,
    ) -> Result<Vec<(TriggerId, FiringOutcome)>> {
        block_on_engine(
            &self.rt,
            self.inner.on_row_change(schema, table, timing, change),
        )?
    }
}
