//! Callback iteration over the children of a value.

use crate::config::Config;
use crate::error::CastResult;
use crate::fanout;
use crate::handle::Handle;
use crate::kind::Kind;
use crate::recover;
use crate::resolve;
use crate::types::FieldDef;
use crate::value::Value;

/// A handle resolved through its indirections, ready for iteration.
///
/// Each `for_each_*` method visits one category of children and is a no-op
/// when the resolved value belongs to another category. Callback errors stop
/// a sequential walk unless the configuration ignores errors; with
/// `concurrent` set, field and element callbacks run on the rayon pool.
#[derive(Clone, Debug)]
pub struct Iterable {
    handle: Handle,
    cfg: Config,
}

impl Iterable {
    pub fn cast(handle: &Handle, cfg: Config) -> Self {
        Self {
            handle: resolve::child_elem(handle),
            cfg: cfg.normalized(),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn kind(&self) -> Kind {
        self.handle.kind()
    }

    /// Visit each record field with the record handle and the field's
    /// declaration. Non-exported fields are passed as unreadable handles.
    pub fn for_each_field<F>(&self, f: F) -> CastResult<()>
    where
        F: Fn(&Handle, &FieldDef, &Handle) -> CastResult<()> + Sync + Send,
    {
        let Some(Value::Record(record)) = self.handle.get().map(Value::into_underlying) else {
            return Ok(());
        };
        let addressable = self.handle.can_addr();
        let fields: Vec<(FieldDef, Handle)> = record
            .ty
            .fields()
            .iter()
            .cloned()
            .zip(record.fields)
            .map(|(def, value)| {
                let readable = def.exported;
                (def, Handle::detached(value, addressable, readable))
            })
            .collect();
        recover::guard(&self.cfg, || {
            fanout::each(fields.len(), &self.cfg, |idx| match fields.get(idx) {
                Some((def, field)) => f(&self.handle, def, field),
                None => Ok(()),
            })
        })
    }

    /// Visit each array or slice element with its index.
    pub fn for_each_element<F>(&self, f: F) -> CastResult<()>
    where
        F: Fn(usize, &Handle) -> CastResult<()> + Sync + Send,
    {
        let kind = self.kind();
        if !kind.is_list() {
            return Ok(());
        }
        let addressable = kind == Kind::Slice || self.handle.can_addr();
        let items: Vec<Handle> = self
            .handle
            .with(|value| value.as_list().map(<[Value]>::to_vec))
            .flatten()
            .unwrap_or_default()
            .into_iter()
            .map(|item| Handle::detached(item, addressable, true))
            .collect();
        recover::guard(&self.cfg, || {
            fanout::each(items.len(), &self.cfg, |idx| match items.get(idx) {
                Some(item) => f(idx, item),
                None => Ok(()),
            })
        })
    }

    /// Visit each map entry as a key handle and a value handle.
    pub fn for_each_entry<F>(&self, f: F) -> CastResult<()>
    where
        F: Fn(&Handle, &Handle) -> CastResult<()> + Sync + Send,
    {
        let Some(Value::Map(map)) = self.handle.get().map(Value::into_underlying) else {
            return Ok(());
        };
        let entries: Vec<(Handle, Handle)> = map
            .entries
            .into_iter()
            .map(|(key, value)| (Handle::of(key), Handle::of(value)))
            .collect();
        recover::guard(&self.cfg, || {
            fanout::each(entries.len(), &self.cfg, |idx| match entries.get(idx) {
                Some((key, value)) => f(key, value),
                None => Ok(()),
            })
        })
    }

    /// Receive from a channel until it is exhausted, passing each value to
    /// `f`. With `block_channel` each receive waits for a value or for the
    /// channel to close; otherwise iteration stops at the first empty poll.
    pub fn for_each_received<F>(&self, mut f: F) -> CastResult<()>
    where
        F: FnMut(&Handle) -> CastResult<()>,
    {
        let endpoint = self
            .handle
            .with(|value| match value.underlying() {
                Value::Chan(chan) => chan.endpoint.clone(),
                _ => None,
            })
            .flatten();
        let Some(channel) = endpoint else {
            return Ok(());
        };
        let cfg = &self.cfg;
        recover::guard(cfg, || {
            loop {
                let next = if cfg.block_channel {
                    channel.recv()
                } else {
                    channel.try_recv()
                };
                let Some(value) = next else {
                    return Ok(());
                };
                if let Err(err) = f(&Handle::of(value)) {
                    if !cfg.ignore_errors {
                        return Err(err);
                    }
                    tracing::trace!(error = %err, "ignoring callback error");
                }
            }
        })
    }
}
