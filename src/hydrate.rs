//! Chunked, wave-parallel hydration of the remote grid.
//!
//! The service paginates cell reads, so a refresh partitions the flat index
//! range into `MAX_TAKE`-sized chunks and fetches them in waves of at most
//! `PARALLEL` in-flight requests. Chunk destinations are precomputed and
//! disjoint, so chunks within a wave may complete in any order.

use crate::remote::{RemoteError, RemoteGridSource};

/// Largest cell count the service returns per read.
pub const MAX_TAKE: u32 = 10_000;

/// In-flight read requests per wave. A full wave is awaited before the next
/// wave is issued — bounded concurrency, not a work-stealing pool.
pub const PARALLEL: usize = 5;

/// One planned read: starting coordinate, length, and the destination offset
/// in the flat buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRequest {
    pub x: u32,
    pub y: u32,
    pub take: u32,
    pub offset: usize,
}

/// Partition `[0, width*height)` into consecutive chunks of at most
/// `max_take` cells. The starting `(x, y)` of each chunk is the 2D position
/// of its flat offset.
pub fn plan_chunks(width: u32, height: u32, max_take: u32) -> Vec<ChunkRequest> {
    let total = width as u64 * height as u64;
    let mut plan = Vec::with_capacity(total.div_ceil(max_take as u64) as usize);
    let mut offset = 0u64;
    while offset < total {
        let take = (total - offset).min(max_take as u64) as u32;
        plan.push(ChunkRequest {
            x: (offset % width as u64) as u32,
            y: (offset / width as u64) as u32,
            take,
            offset: offset as usize,
        });
        offset += take as u64;
    }
    plan
}

/// Drive the wave protocol over a prepared plan.
///
/// Successful chunks are delivered to `on_wave` as `(offset, cells)` pairs as
/// each wave resolves. On the first failed chunk no further wave is issued
/// and the error is returned; chunks already delivered stay delivered —
/// callers keep a best-effort partial canvas rather than rolling back.
pub async fn run_waves<F>(
    source: &dyn RemoteGridSource,
    plan: &[ChunkRequest],
    parallel: usize,
    mut on_wave: F,
) -> Result<(), RemoteError>
where
    F: FnMut(Vec<(usize, Vec<u8>)>),
{
    for wave in plan.chunks(parallel.max(1)) {
        let results = futures::future::join_all(
            wave.iter()
                .map(|req| source.read_cells(req.x, req.y, Some(req.take))),
        )
        .await;

        let mut done = Vec::with_capacity(wave.len());
        let mut failure: Option<RemoteError> = None;
        for (req, result) in wave.iter().zip(results) {
            match result {
                Ok(cells) if cells.len() == req.take as usize => {
                    done.push((req.offset, cells));
                }
                Ok(cells) => {
                    // A mis-sized chunk would land outside its precomputed
                    // destination; treat it as a failed read.
                    failure.get_or_insert(RemoteError::Read(format!(
                        "chunk at ({}, {}) returned {} cells, expected {}",
                        req.x,
                        req.y,
                        cells.len(),
                        req.take
                    )));
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        on_wave(done);
        if let Some(e) = failure {
            return Err(e);
        }
    }
    Ok(())
}

/// Hydrate a full grid into a fresh buffer (headless snapshot path). Unlike
/// the interactive session there is nothing to keep on failure, so any chunk
/// error fails the whole fetch.
pub async fn fetch_all(
    source: &dyn RemoteGridSource,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, RemoteError> {
    let mut cells = vec![0u8; width as usize * height as usize];
    let plan = plan_chunks(width, height, MAX_TAKE);
    run_waves(source, &plan, PARALLEL, |wave| {
        for (offset, data) in wave {
            cells[offset..offset + data.len()].copy_from_slice(&data);
        }
    })
    .await?;
    Ok(cells)
}
