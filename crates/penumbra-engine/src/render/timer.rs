//! Per-pass GPU timing with asynchronous readback.
//!
//! Each pass writes a begin/end timestamp pair. After submit the resolved
//! values are copied into one of two readback buffers and mapped without
//! blocking; whichever buffer finishes mapping first becomes the reported
//! [`FrameTimings`]. Reported values therefore trail the current frame.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Shadow,
    Lit,
    Volumetric,
    Composite,
}

impl PassKind {
    pub const ALL: [PassKind; 4] = [
        PassKind::Shadow,
        PassKind::Lit,
        PassKind::Volumetric,
        PassKind::Composite,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Shadow => "shadow",
            PassKind::Lit => "lit",
            PassKind::Volumetric => "volumetric",
            PassKind::Composite => "composite",
        }
    }
}

const PASS_COUNT: usize = PassKind::ALL.len();
const QUERY_COUNT: u32 = 2 * PASS_COUNT as u32;
const RESOLVE_SIZE: u64 = QUERY_COUNT as u64 * std::mem::size_of::<u64>() as u64;

/// GPU milliseconds per pass; 0 for passes that were not measured.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTimings {
    pub pass_ms: [f32; PASS_COUNT],
}

impl FrameTimings {
    pub fn pass(&self, kind: PassKind) -> f32 {
        self.pass_ms[kind.index()]
    }

    pub fn total_ms(&self) -> f32 {
        self.pass_ms.iter().sum()
    }

    /// Converts raw begin/end tick pairs into milliseconds.
    pub fn from_ticks(ticks: &[u64], recorded: [bool; PASS_COUNT], period_ns: f32) -> Self {
        let mut out = Self::default();
        for kind in PassKind::ALL {
            let i = kind.index();
            if !recorded[i] {
                continue;
            }
            let (Some(&begin), Some(&end)) = (ticks.get(2 * i), ticks.get(2 * i + 1)) else {
                continue;
            };
            let ns = end.saturating_sub(begin) as f64 * period_ns as f64;
            out.pass_ms[i] = (ns / 1.0e6) as f32;
        }
        out
    }
}

const IDLE: u8 = 0;
const COPIED: u8 = 1;
const MAPPING: u8 = 2;
const READY: u8 = 3;
const FAILED: u8 = 4;

#[derive(Debug)]
struct Readback {
    buffer: wgpu::Buffer,
    state: Arc<AtomicU8>,
    recorded: [bool; PASS_COUNT],
}

#[derive(Debug)]
struct Queries {
    set: wgpu::QuerySet,
    resolve: wgpu::Buffer,
    ring: [Readback; 2],
    period_ns: f32,
}

/// Timestamp queries for the four frame passes.
///
/// Without `TIMESTAMP_QUERY` every method is a no-op and timings stay 0.
#[derive(Debug)]
pub struct GpuTimer {
    queries: Option<Queries>,
    recorded: [bool; PASS_COUNT],
    latest: FrameTimings,
}

impl GpuTimer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let queries = device
            .features()
            .contains(wgpu::Features::TIMESTAMP_QUERY)
            .then(|| Queries::new(device, queue));
        if queries.is_none() {
            log::warn!("adapter lacks TIMESTAMP_QUERY; GPU pass timings will read 0");
        }
        Self {
            queries,
            recorded: [false; PASS_COUNT],
            latest: FrameTimings::default(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.queries.is_some()
    }

    pub fn begin_frame(&mut self) {
        self.recorded = [false; PASS_COUNT];
    }

    /// Timestamp writes for one render pass of `kind`.
    ///
    /// A pass kind split over several render passes (one per shadow map)
    /// writes its begin stamp on the `first` and its end stamp on the `last`.
    pub fn writes(
        &mut self,
        kind: PassKind,
        first: bool,
        last: bool,
    ) -> Option<wgpu::RenderPassTimestampWrites<'_>> {
        let q = self.queries.as_ref()?;
        if !first && !last {
            return None;
        }
        let i = kind.index() as u32;
        if last {
            self.recorded[kind.index()] = true;
        }
        Some(wgpu::RenderPassTimestampWrites {
            query_set: &q.set,
            beginning_of_pass_write_index: first.then_some(2 * i),
            end_of_pass_write_index: last.then_some(2 * i + 1),
        })
    }

    /// Passes recorded since [`GpuTimer::begin_frame`].
    pub fn recorded(&self) -> [bool; PASS_COUNT] {
        self.recorded
    }

    /// Resolves this frame's stamps into a free readback buffer. Drops the
    /// frame's measurement when both buffers are still in flight.
    pub fn resolve(&mut self, encoder: &mut wgpu::CommandEncoder) {
        let Some(q) = self.queries.as_mut() else { return };
        let Some(slot) = q.ring.iter_mut().find(|r| r.state.load(Ordering::Acquire) == IDLE) else {
            return;
        };
        encoder.resolve_query_set(&q.set, 0..QUERY_COUNT, &q.resolve, 0);
        encoder.copy_buffer_to_buffer(&q.resolve, 0, &slot.buffer, 0, RESOLVE_SIZE);
        slot.recorded = self.recorded;
        slot.state.store(COPIED, Ordering::Release);
    }

    /// Starts mapping submitted copies and collects any that completed.
    /// Never blocks.
    pub fn after_submit(&mut self, device: &wgpu::Device) {
        let Some(q) = self.queries.as_mut() else { return };

        for slot in &q.ring {
            if slot.state.load(Ordering::Acquire) != COPIED {
                continue;
            }
            slot.state.store(MAPPING, Ordering::Release);
            let state = Arc::clone(&slot.state);
            slot.buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                let next = if result.is_ok() { READY } else { FAILED };
                state.store(next, Ordering::Release);
            });
        }

        let _ = device.poll(wgpu::PollType::Poll);

        for slot in &q.ring {
            match slot.state.load(Ordering::Acquire) {
                READY => {
                    {
                        let data = slot.buffer.slice(..).get_mapped_range();
                        let ticks: Vec<u64> = data
                            .chunks_exact(8)
                            .map(bytemuck::pod_read_unaligned::<u64>)
                            .collect();
                        self.latest = FrameTimings::from_ticks(&ticks, slot.recorded, q.period_ns);
                    }
                    slot.buffer.unmap();
                    slot.state.store(IDLE, Ordering::Release);
                }
                FAILED => {
                    log::debug!("timestamp readback failed to map");
                    slot.state.store(IDLE, Ordering::Release);
                }
                _ => {}
            }
        }
    }

    /// Most recent completed measurement.
    pub fn latest(&self) -> FrameTimings {
        self.latest
    }
}

impl Queries {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("pass timestamps"),
            ty: wgpu::QueryType::Timestamp,
            count: QUERY_COUNT,
        });
        let resolve = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("timestamp resolve"),
            size: RESOLVE_SIZE,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = |i: usize| Readback {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("timestamp readback {i}")),
                size: RESOLVE_SIZE,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            state: Arc::new(AtomicU8::new(IDLE)),
            recorded: [false; PASS_COUNT],
        };
        Self {
            set,
            resolve,
            ring: [readback(0), readback(1)],
            period_ns: queue.get_timestamp_period(),
        }
    }
}
