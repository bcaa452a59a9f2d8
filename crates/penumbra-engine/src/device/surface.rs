use super::GpuInit;

/// First format whose sRGB-ness matches the preference, else the first
/// format offered.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    caps.formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb)
        .or_else(|| caps.formats.first().copied())
}

pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    use wgpu::PresentMode::{AutoNoVsync, AutoVsync, Fifo};
    // The Auto modes always resolve to something the surface supports.
    if matches!(requested, AutoVsync | AutoNoVsync) || caps.present_modes.contains(&requested) {
        requested
    } else {
        log::warn!("present mode {requested:?} unsupported, using Fifo");
        Fifo
    }
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Surface configuration for `size` honoring `init` as far as `caps` allow.
/// `None` when the surface offers no format at all.
pub(crate) fn configuration(
    caps: &wgpu::SurfaceCapabilities,
    init: &GpuInit,
    (width, height): (u32, u32),
) -> Option<wgpu::SurfaceConfiguration> {
    Some(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: choose_surface_format(caps, init.prefer_srgb)?,
        width,
        height,
        present_mode: choose_present_mode(caps, init.present_mode),
        alpha_mode: choose_alpha_mode(caps, init.alpha_mode),
        view_formats: Vec::new(),
        desired_maximum_frame_latency: init.desired_maximum_frame_latency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: &[wgpu::TextureFormat]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    #[test]
    fn linear_format_preferred_when_srgb_is_off() {
        use wgpu::TextureFormat::{Bgra8Unorm, Bgra8UnormSrgb};
        let c = caps(&[Bgra8UnormSrgb, Bgra8Unorm]);
        assert_eq!(choose_surface_format(&c, false), Some(Bgra8Unorm));
        assert_eq!(choose_surface_format(&c, true), Some(Bgra8UnormSrgb));
    }

    #[test]
    fn falls_back_to_first_format() {
        use wgpu::TextureFormat::Bgra8UnormSrgb;
        assert_eq!(choose_surface_format(&caps(&[Bgra8UnormSrgb]), false), Some(Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&caps(&[]), false), None);
    }

    #[test]
    fn unsupported_present_mode_falls_back_to_fifo() {
        let c = caps(&[]);
        assert_eq!(
            choose_present_mode(&c, wgpu::PresentMode::Mailbox),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            choose_present_mode(&c, wgpu::PresentMode::AutoNoVsync),
            wgpu::PresentMode::AutoNoVsync
        );
    }

    #[test]
    fn configuration_follows_init() {
        use wgpu::TextureFormat::{Bgra8Unorm, Bgra8UnormSrgb};
        let cfg = configuration(&caps(&[Bgra8UnormSrgb, Bgra8Unorm]), &GpuInit::default(), (640, 480)).unwrap();
        assert_eq!(cfg.format, Bgra8Unorm);
        assert_eq!((cfg.width, cfg.height), (640, 480));
        assert_eq!(cfg.alpha_mode, wgpu::CompositeAlphaMode::Opaque);
        assert!(configuration(&caps(&[]), &GpuInit::default(), (1, 1)).is_none());
    }

    #[test]
    fn alpha_mode_respects_capabilities() {
        let c = caps(&[]);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }
}
