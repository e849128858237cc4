//! Element-wise task dispatch shared by assignment and iteration.

use rayon::prelude::*;

use crate::config::Config;
use crate::error::{CastError, CastResult};

/// Apply `f` to each target paired with its source.
///
/// Sequential runs stop at the first error. Concurrent runs join every task
/// on the rayon pool and report the first error in element order. Under
/// `ignore_errors` failures are dropped.
pub(crate) fn run<T, S, F>(targets: &mut [T], sources: &[S], cfg: &Config, f: F) -> CastResult<()>
where
    T: Send,
    S: Sync,
    F: Fn(&mut T, &S) -> CastResult<()> + Sync,
{
    if cfg.concurrent {
        tracing::debug!(tasks = targets.len(), "fanning out");
        let failures: Vec<Option<CastError>> = targets
            .par_iter_mut()
            .zip(sources.par_iter())
            .map(|(target, source)| f(target, source).err())
            .collect();
        return settle(failures, cfg);
    }
    for (target, source) in targets.iter_mut().zip(sources) {
        if let Err(err) = f(target, source) {
            if !cfg.ignore_errors {
                return Err(err);
            }
            tracing::trace!(error = %err, "ignoring element error");
        }
    }
    Ok(())
}

/// Apply `f` to every index in `0..len`.
pub(crate) fn each<F>(len: usize, cfg: &Config, f: F) -> CastResult<()>
where
    F: Fn(usize) -> CastResult<()> + Sync + Send,
{
    if cfg.concurrent {
        tracing::debug!(tasks = len, "fanning out");
        let failures: Vec<Option<CastError>> =
            (0..len).into_par_iter().map(|idx| f(idx).err()).collect();
        return settle(failures, cfg);
    }
    for idx in 0..len {
        if let Err(err) = f(idx) {
            if !cfg.ignore_errors {
                return Err(err);
            }
            tracing::trace!(error = %err, "ignoring element error");
        }
    }
    Ok(())
}

fn settle(failures: Vec<Option<CastError>>, cfg: &Config) -> CastResult<()> {
    if cfg.ignore_errors {
        return Ok(());
    }
    match failures.into_iter().flatten().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
