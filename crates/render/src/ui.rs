use glam::Vec2;

/// Prepare window input for a UI laid out at render resolution: the screen
/// rect becomes the render target size, pixels-per-point is forced to 1 and
/// pointer positions are rescaled from window to render pixels.
pub fn fit_ui_input(mut raw: egui::RawInput, window_size: Vec2, render_size: Vec2) -> egui::RawInput {
    let scale = if window_size.x > 0.0 && window_size.y > 0.0 {
        render_size / window_size
    } else {
        Vec2::ONE
    };
    let rescale = |p: egui::Pos2| egui::pos2(p.x * scale.x, p.y * scale.y);

    raw.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::ZERO,
        egui::vec2(render_size.x, render_size.y),
    ));
    if let Some(viewport) = raw.viewports.get_mut(&raw.viewport_id) {
        viewport.native_pixels_per_point = Some(1.0);
    }
    for event in &mut raw.events {
        match event {
            egui::Event::PointerMoved(pos) => *pos = rescale(*pos),
            egui::Event::PointerButton { pos, .. } => *pos = rescale(*pos),
            egui::Event::Touch { pos, .. } => *pos = rescale(*pos),
            _ => {}
        }
    }
    raw
}
