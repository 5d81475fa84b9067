use std::sync::mpsc;

use anyhow::{Context, Result};

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a `width`-pixel copy, padded to wgpu's row alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * BYTES_PER_PIXEL).div_ceil(align) * align
}

/// Copies `height` rows of `row_bytes` out of a padded image into `dst`.
pub fn unpad_rows(src: &[u8], padded_row: usize, row_bytes: usize, height: usize, dst: &mut [u8]) {
    for (src_row, dst_row) in src
        .chunks(padded_row)
        .zip(dst.chunks_mut(row_bytes))
        .take(height)
    {
        dst_row.copy_from_slice(&src_row[..row_bytes]);
    }
}

/// Mappable copy target for one export session's resolved frames.
pub struct Readback {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
}

impl Readback {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let padded_row = padded_bytes_per_row(width);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tetra export readback"),
            size: u64::from(padded_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            width,
            height,
            padded_row,
        }
    }

    /// Records the copy of `texture` into the readback buffer.
    pub fn record_copy(&self, encoder: &mut wgpu::CommandEncoder, texture: &wgpu::Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Maps the buffer, waits for the GPU, and copies tight rows into `dst`.
    ///
    /// `dst` must hold `width * height * 4` bytes.
    pub fn read_into(&self, device: &wgpu::Device, dst: &mut [u8]) -> Result<()> {
        let row_bytes = (self.width * BYTES_PER_PIXEL) as usize;
        anyhow::ensure!(
            dst.len() == row_bytes * self.height as usize,
            "staging buffer holds {} bytes, frame needs {}",
            dst.len(),
            row_bytes * self.height as usize
        );

        let slice = self.buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });

        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .context("device lost while waiting for readback")?;

        rx.recv()
            .context("readback callback dropped")?
            .context("failed to map readback buffer")?;

        {
            let mapped = slice.get_mapped_range();
            unpad_rows(
                &mapped,
                self.padded_row as usize,
                row_bytes,
                self.height as usize,
                dst,
            );
        }
        self.buffer.unmap();
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
