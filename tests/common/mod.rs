//! Shared helpers for the integration tests.
#![allow(dead_code)]

use ditherlab::{EngineError, EventStream, RenderEvent};
use tokio_stream::StreamExt;

/// An opaque RGBA gradient.
pub fn gradient_source(width: usize, height: usize) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(width * height * 4);
    let denom = (width * height - 1).max(1);
    for i in 0..width * height {
        let v = (i * 255 / denom) as u8;
        rgba.extend_from_slice(&[v, v, v, 255]);
    }
    rgba
}

/// A fully white opaque source.
pub fn white_source(width: usize, height: usize) -> Vec<u8> {
    let mut rgba = vec![255u8; width * height * 4];
    for px in rgba.chunks_exact_mut(4) {
        px[3] = 255;
    }
    rgba
}

/// Drain a job's event stream to completion.
pub async fn collect_events(mut events: EventStream) -> Vec<Result<RenderEvent, EngineError>> {
    let mut collected = Vec::new();
    while let Some(event) = events.next().await {
        collected.push(event);
    }
    collected
}
