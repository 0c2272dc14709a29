//! 多线程 read 处理流水线。
//!
//! - [`InputBuffer`]：加锁的共享输入源，按固定大小、单调递增编号切分 chunk
//! - [`OutputBuffer`]：按 chunk 编号恢复输出顺序，乱序完成的 chunk 暂存直到轮到它
//! - [`map_reads`]：在 `n_threads` 个 worker 上运行，每个 worker 循环取 chunk 直到输入耗尽
//!
//! 索引只读共享，不加锁；临界区只有取 chunk 和提交输出两处。

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{map_single_end_read, MapOpt, MappingStatistics};
use crate::index::StrobemerIndex;
use crate::io::reads::{ReadRecord, ReadSource};
use crate::io::refs::References;

struct InputState {
    source: ReadSource,
    chunk_index: usize,
}

/// 共享输入源，每次取出一个编号递增的 chunk
pub struct InputBuffer {
    state: Mutex<InputState>,
    chunk_size: usize,
}

impl InputBuffer {
    pub fn new(source: ReadSource, chunk_size: usize) -> Self {
        Self {
            state: Mutex::new(InputState { source, chunk_index: 0 }),
            chunk_size: chunk_size.max(1),
        }
    }

    /// 取下一个 chunk；空 chunk 表示输入结束（仍占用一个编号）
    pub fn read_records(&self) -> Result<(usize, Vec<ReadRecord>)> {
        let mut state = self.state.lock().map_err(|_| anyhow!("input buffer lock poisoned"))?;
        let records = state.source.read(self.chunk_size)?;
        let chunk_index = state.chunk_index;
        state.chunk_index += 1;
        Ok((chunk_index, records))
    }
}

struct OutputState<W> {
    out: W,
    chunks: BTreeMap<usize, String>,
    next_chunk_index: usize,
}

/// 按 chunk 编号顺序写出的共享输出端
pub struct OutputBuffer<W: Write> {
    state: Mutex<OutputState<W>>,
}

impl<W: Write> OutputBuffer<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(OutputState { out, chunks: BTreeMap::new(), next_chunk_index: 0 }),
        }
    }

    /// 提交一个 chunk 的输出，并写出所有已连续就绪的 chunk
    pub fn output_records(&self, chunk: String, chunk_index: usize) -> Result<()> {
        let mut guard = self.state.lock().map_err(|_| anyhow!("output buffer lock poisoned"))?;
        let state = &mut *guard;
        let previous = state.chunks.insert(chunk_index, chunk);
        debug_assert!(previous.is_none(), "chunk {chunk_index} submitted twice");
        while let Some(ready) = state.chunks.remove(&state.next_chunk_index) {
            state.out.write_all(ready.as_bytes()).context("cannot write output")?;
            state.next_chunk_index += 1;
        }
        Ok(())
    }

    /// 结束输出并取回底层 writer；仍有未写出的 chunk 说明编号不连续
    pub fn finish(self) -> Result<W> {
        let mut state = self
            .state
            .into_inner()
            .map_err(|_| anyhow!("output buffer lock poisoned"))?;
        if let Some(&missing_after) = state.chunks.keys().next() {
            anyhow::bail!(
                "output incomplete: chunk {} never arrived before chunk {}",
                state.next_chunk_index,
                missing_after
            );
        }
        state.out.flush().context("cannot flush output")?;
        Ok(state.out)
    }
}

fn perform_task<W: Write>(
    input: &InputBuffer,
    output: &OutputBuffer<W>,
    abort: &AtomicBool,
    opt: &MapOpt,
    references: &References,
    index: &StrobemerIndex,
) -> Result<MappingStatistics> {
    let mut statistics = MappingStatistics::default();
    while !abort.load(Ordering::Relaxed) {
        let (chunk_index, records) = input.read_records()?;
        if records.is_empty() {
            break;
        }
        let mut chunk = String::new();
        for record in &records {
            map_single_end_read(record, &mut chunk, &mut statistics, opt, references, index);
        }
        output.output_records(chunk, chunk_index)?;
    }
    Ok(statistics)
}

/// 在 `opt.n_threads` 个 worker 上处理全部 read，按输入顺序写入 `out`。
///
/// 任一 worker 出错时其余 worker 在当前 chunk 结束后停止，返回第一个错误。
pub fn map_reads<W: Write + Send>(
    input: InputBuffer,
    out: W,
    opt: &MapOpt,
    references: &References,
    index: &StrobemerIndex,
) -> Result<(MappingStatistics, W)> {
    let n_threads = opt.n_threads.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .context("cannot build worker thread pool")?;

    let output = OutputBuffer::new(out);
    let abort = AtomicBool::new(false);
    let results: Mutex<Vec<Result<MappingStatistics>>> = Mutex::new(Vec::with_capacity(n_threads));

    log::debug!("Mapping with {} worker threads, {} reads per chunk", n_threads, input.chunk_size);
    pool.scope(|s| {
        for _ in 0..n_threads {
            s.spawn(|_| {
                let result = perform_task(&input, &output, &abort, opt, references, index);
                if result.is_err() {
                    abort.store(true, Ordering::Relaxed);
                }
                if let Ok(mut results) = results.lock() {
                    results.push(result);
                }
            });
        }
    });

    let results = results.into_inner().map_err(|_| anyhow!("worker results lock poisoned"))?;
    if results.len() != n_threads {
        anyhow::bail!("{} of {} workers did not finish", n_threads - results.len(), n_threads);
    }
    let mut statistics = MappingStatistics::default();
    for result in results {
        statistics += result?;
    }
    let out = output.finish()?;
    Ok((statistics, out))
}
