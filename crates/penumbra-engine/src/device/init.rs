use anyhow::{Context, Result};

/// Device and surface creation parameters.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB surface format when one exists.
    ///
    /// The composite pass applies gamma itself, so the renderer wants a
    /// linear (non-sRGB) surface and leaves this off.
    pub prefer_srgb: bool,

    /// Requested present mode; falls back to `Fifo` when the surface lacks it.
    pub present_mode: wgpu::PresentMode,

    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Features the device must have.
    pub required_features: wgpu::Features,

    /// Features enabled only when the adapter offers them.
    pub optional_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Hint; backends may ignore it.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            optional_features: wgpu::Features::TIMESTAMP_QUERY,
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Features to request from `adapter`: everything required plus the
    /// optional ones it supports.
    pub fn features_for(&self, adapter: &wgpu::Adapter) -> wgpu::Features {
        self.required_features | (self.optional_features & adapter.features())
    }
}

impl GpuInit {
    pub(crate) fn instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    /// Adapter matching `power_preference`, able to present to `surface` when
    /// one is given.
    pub(crate) async fn request_adapter(
        &self,
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<wgpu::Adapter> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.power_preference,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
        Ok(adapter)
    }

    pub(crate) async fn request_device(
        &self,
        adapter: &wgpu::Adapter,
        label: &str,
    ) -> Result<(wgpu::Device, wgpu::Queue)> {
        let features = self.features_for(adapter);
        let missing = self.required_features - adapter.features();
        anyhow::ensure!(missing.is_empty(), "adapter lacks required features {missing:?}");

        let device = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: features,
                required_limits: self.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .with_context(|| format!("failed to create {label}"))?;
        log::debug!("{label}: features {features:?}");
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_gamma_to_the_renderer() {
        let init = GpuInit::default();
        assert!(!init.prefer_srgb);
        assert_eq!(init.present_mode, wgpu::PresentMode::AutoNoVsync);
        assert!(init.required_features.is_empty());
        assert!(init.optional_features.contains(wgpu::Features::TIMESTAMP_QUERY));
    }
}
