/// Sample counts tried from highest to lowest.
const CANDIDATES: [u32; 4] = [16, 8, 4, 2];

/// Highest candidate not above `cap` for which `supported` holds, else 1.
pub fn pick_sample_count(cap: u32, supported: impl Fn(u32) -> bool) -> u32 {
    CANDIDATES
        .into_iter()
        .filter(|&n| n <= cap)
        .find(|&n| supported(n))
        .unwrap_or(1)
}

/// MSAA sample count usable by both the color and the depth attachment.
pub fn resolve_sample_count(
    adapter: &wgpu::Adapter,
    color: wgpu::TextureFormat,
    depth: wgpu::TextureFormat,
    cap: u32,
) -> u32 {
    let color_flags = adapter.get_texture_format_features(color).flags;
    let depth_flags = adapter.get_texture_format_features(depth).flags;

    let resolvable =
        color_flags.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE);

    let count = pick_sample_count(cap, |n| {
        resolvable && color_flags.sample_count_supported(n) && depth_flags.sample_count_supported(n)
    });

    log::debug!("msaa: {count}x for {color:?}/{depth:?}");
    count
}
