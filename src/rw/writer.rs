use std::cell::Cell;
use std::time::Instant;

use log::{debug, trace};

use super::Error;
use crate::provider::Provider;
use crate::types::{Feature, ResourceId};

/// Backend side of a feature write session.
///
/// Implementations are driven by one caller at a time.
pub trait FeatureWriter: Send {
    /// Persists `features` in the order they are consumed and returns the
    /// identifier assigned to each, in the same order.
    ///
    /// A failure fails the whole call. Whether records written before the
    /// failure stay persisted depends on the backend.
    fn add(
        &mut self,
        features: &mut dyn Iterator<Item = Feature>,
    ) -> Result<Vec<ResourceId>, Error>;

    /// Releases connections, file handles and any other backend resource.
    /// Only the first call has an effect.
    fn close(&mut self);
}

/// A [`FeatureWriter`] that is closed when dropped, on every exit path.
pub struct ScopedWriter {
    inner: Box<dyn FeatureWriter>,
    closed: bool,
}

impl ScopedWriter {
    pub fn new(inner: Box<dyn FeatureWriter>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn add<I>(&mut self, features: I) -> Result<Vec<ResourceId>, Error>
    where
        I: IntoIterator<Item = Feature>,
    {
        if self.closed {
            return Err(Error::Closed);
        }
        self.inner.add(&mut features.into_iter())
    }

    /// Like [`Self::add`] but stops consuming features once `deadline` is
    /// reached, failing with [`Error::Cancelled`].
    ///
    /// Features consumed before the deadline are handed to the backend as a
    /// complete batch, and the error carries the ids they were stored under.
    pub fn add_until<I>(
        &mut self,
        features: I,
        deadline: Instant,
    ) -> Result<Vec<ResourceId>, Error>
    where
        I: IntoIterator<Item = Feature>,
    {
        if self.closed {
            return Err(Error::Closed);
        }

        let expired = Cell::new(false);
        let mut bounded = features.into_iter().take_while(|_| {
            if Instant::now() >= deadline {
                expired.set(true);
                false
            } else {
                true
            }
        });

        let ids = self.inner.add(&mut bounded)?;

        if expired.get() {
            debug!("write deadline reached after {} records", ids.len());
            return Err(Error::Cancelled { written: ids });
        }

        Ok(ids)
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.inner.close();
            self.closed = true;
            trace!("writer closed");
        }
    }
}

impl Drop for ScopedWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens a write session on `provider`.
pub fn open_writer(provider: &dyn Provider) -> Result<ScopedWriter, Error> {
    Ok(ScopedWriter::new(provider.writer()?))
}

/// Opens a writer on `provider`, hands it to `f` and closes it afterwards,
/// whatever `f` returns.
pub fn with_writer<T, F>(provider: &dyn Provider, f: F) -> Result<T, Error>
where
    F: FnOnce(&mut ScopedWriter) -> Result<T, Error>,
{
    let mut writer = open_writer(provider)?;
    let res = f(&mut writer);
    writer.close();
    res
}
