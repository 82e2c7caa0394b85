//! Fork-join container parsing
//!
//! Containers are split into contiguous batches, one per worker. Each worker
//! builds its own fragment without touching shared state; fragments come back
//! in batch order and are merged sequentially after the join.

use super::{Container, ParseOptions};
use crate::core::error::SelectResult;
use crate::graph::WorkspaceModel;
use crate::ui::progress::ParseProgress;
use rayon::prelude::*;

/// Parse every container and merge the fragments in container order.
///
/// The first failing container (by position, not by completion time) aborts
/// the run.
pub fn parse_containers(containers: &[Container<'_>], options: ParseOptions) -> SelectResult<WorkspaceModel> {
  if containers.is_empty() {
    return Ok(WorkspaceModel::new());
  }

  let batch_size = batch_size(containers.len(), rayon::current_num_threads());
  let progress = options
    .progress
    .then(|| ParseProgress::new(containers.len(), "Parsing containers"));

  let fragments: Vec<SelectResult<WorkspaceModel>> = containers
    .par_chunks(batch_size)
    .map(|batch| parse_batch(batch, progress.as_ref()))
    .collect();

  let mut model = WorkspaceModel::new();
  for fragment in fragments {
    model.merge(fragment?);
  }
  Ok(model)
}

fn parse_batch(batch: &[Container<'_>], progress: Option<&ParseProgress>) -> SelectResult<WorkspaceModel> {
  let mut fragment = WorkspaceModel::new();
  for container in batch {
    tracing::debug!(parser = container.parser.name(), path = %container.path.display(), "Parsing container");
    fragment.merge(container.parser.parse(&container.path)?);
    if let Some(progress) = progress {
      progress.inc();
    }
  }
  Ok(fragment)
}

/// Contiguous batch length giving each worker at most one batch
fn batch_size(total: usize, workers: usize) -> usize {
  total.div_ceil(workers.max(1)).max(1)
}
