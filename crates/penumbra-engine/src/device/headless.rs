use anyhow::Result;

use super::GpuInit;

/// Device and queue without a surface, for offscreen work and GPU tests.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    /// Requests a low-power adapter with its full limits, enabling the
    /// `optional` features it supports.
    pub async fn new(optional: wgpu::Features) -> Result<Self> {
        let init = GpuInit {
            power_preference: wgpu::PowerPreference::LowPower,
            optional_features: optional,
            ..GpuInit::default()
        };
        let instance = GpuInit::instance();
        let adapter = init.request_adapter(&instance, None).await?;
        let init = GpuInit {
            required_limits: adapter.limits(),
            ..init
        };
        let (device, queue) = init.request_device(&adapter, "penumbra headless device").await?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Blocking constructor for tests. Prints a note and returns `None` when
    /// the machine has no usable adapter, so GPU tests skip instead of failing.
    pub fn for_tests() -> Option<Self> {
        match pollster::block_on(Self::new(wgpu::Features::TIMESTAMP_QUERY)) {
            Ok(gpu) => Some(gpu),
            Err(err) => {
                eprintln!("skipping GPU test: {err:#}");
                None
            }
        }
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
