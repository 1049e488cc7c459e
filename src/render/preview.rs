use std::{path::Path, sync::Arc};

use image::RgbaImage;

use crate::{
    assets::decode::load_image,
    foundation::{core::Canvas, error::PortraitResult},
    render::{
        composite::paste_over,
        pipeline::RenderOutput,
        stages::{draw_marker, fit_to_canvas},
    },
};

/// Host application UI art drawn around previews for context.
#[derive(Clone, Debug, Default)]
pub struct HostUiLayers {
    /// Drawn under the composite.
    pub background: Option<Arc<RgbaImage>>,
    /// Drawn over the composite.
    pub foreground: Option<Arc<RgbaImage>>,
}

impl HostUiLayers {
    /// Decode whichever layers are given.
    pub fn load(background: Option<&Path>, foreground: Option<&Path>) -> PortraitResult<Self> {
        let load = |p: Option<&Path>| -> PortraitResult<Option<Arc<RgbaImage>>> {
            p.map(|p| load_image(p).map(Arc::new)).transpose()
        };
        Ok(Self {
            background: load(background)?,
            foreground: load(foreground)?,
        })
    }

    /// Neither layer is set.
    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.foreground.is_none()
    }
}

/// What [`preview_frame`] draws besides the composite.
#[derive(Clone, Debug, Default)]
pub struct PreviewOptions {
    /// Host UI art, if configured.
    pub host_ui: Option<HostUiLayers>,
    /// Draw the face-centre marker (only when an anchor is defined).
    pub show_marker: bool,
}

/// On-screen frame: host background, composite, host foreground, marker.
///
/// Always works on a fresh image; `output` and the cache are left alone.
pub fn preview_frame(output: &RenderOutput, opts: &PreviewOptions) -> RgbaImage {
    let composite = output.composite.as_ref();
    let canvas = Canvas {
        width: composite.width(),
        height: composite.height(),
    };
    let host = opts.host_ui.as_ref();

    let mut frame = match host.and_then(|h| h.background.as_deref()) {
        Some(bg) => fit_to_canvas(bg, canvas).into_owned(),
        None => RgbaImage::new(canvas.width, canvas.height),
    };
    paste_over(&mut frame, composite, 0, 0);
    if let Some(fg) = host.and_then(|h| h.foreground.as_deref()) {
        paste_over(&mut frame, &fit_to_canvas(fg, canvas), 0, 0);
    }
    if opts.show_marker && output.has_anchor {
        draw_marker(&mut frame, output.anchor);
    }
    frame
}
