use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard and mouse state for the current frame, with the previous frame
/// kept for edge detection.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    previous_keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
    previous_buttons: HashSet<MouseButton>,
    mouse_position: Vec2,
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a window event. Returns true if the event changed input state.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return false;
                };
                self.handle_key(code, event.state == ElementState::Pressed);
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_button(*button, *state == ElementState::Pressed);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = Vec2::new(position.x as f32, position.y as f32);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.handle_scroll(match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 120.0,
                });
                true
            }
            WindowEvent::Focused(false) => {
                self.release_all();
                true
            }
            _ => false,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, down: bool) {
        if down {
            if self.keys.insert(code) {
                tracing::trace!(?code, "key down");
            }
        } else {
            self.keys.remove(&code);
        }
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, down: bool) {
        if down {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn handle_scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn set_mouse_position(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    /// Roll the current state into the previous-frame snapshot.
    pub fn end_frame(&mut self) {
        self.previous_keys.clone_from(&self.keys);
        self.previous_buttons.clone_from(&self.buttons);
        self.scroll = 0.0;
    }

    /// Forget every held key and button, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }

    pub fn is_key_down(&self, code: KeyCode) -> bool {
        self.keys.contains(&code)
    }

    pub fn is_key_pressed(&self, code: KeyCode) -> bool {
        self.keys.contains(&code) && !self.previous_keys.contains(&code)
    }

    pub fn is_key_released(&self, code: KeyCode) -> bool {
        !self.keys.contains(&code) && self.previous_keys.contains(&code)
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button) && !self.previous_buttons.contains(&button)
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        !self.buttons.contains(&button) && self.previous_buttons.contains(&button)
    }

    /// Cursor position in window pixels.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Wheel movement this frame, in lines.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll
    }

    /// WASD as a movement axis: A/D drive x, W/S drive y. Not normalised.
    pub fn movement_axis(&self) -> Vec2 {
        let mut axis = Vec2::ZERO;
        if self.is_key_down(KeyCode::KeyW) {
            axis.y -= 1.0;
        }
        if self.is_key_down(KeyCode::KeyS) {
            axis.y += 1.0;
        }
        if self.is_key_down(KeyCode::KeyA) {
            axis.x -= 1.0;
        }
        if self.is_key_down(KeyCode::KeyD) {
            axis.x += 1.0;
        }
        axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_lasts_one_frame() {
        let mut input = InputState::new();
        input.handle_key(KeyCode::Space, true);
        assert!(input.is_key_down(KeyCode::Space));
        assert!(input.is_key_pressed(KeyCode::Space));

        input.end_frame();
        assert!(input.is_key_down(KeyCode::Space));
        assert!(!input.is_key_pressed(KeyCode::Space));

        input.handle_key(KeyCode::Space, false);
        assert!(input.is_key_released(KeyCode::Space));
        input.end_frame();
        assert!(!input.is_key_released(KeyCode::Space));
    }

    #[test]
    fn key_repeat_does_not_repress() {
        let mut input = InputState::new();
        input.handle_key(KeyCode::KeyE, true);
        input.end_frame();
        input.handle_key(KeyCode::KeyE, true);
        assert!(!input.is_key_pressed(KeyCode::KeyE));
    }

    #[test]
    fn movement_axis_from_wasd() {
        let mut input = InputState::new();
        assert_eq!(input.movement_axis(), Vec2::ZERO);
        input.handle_key(KeyCode::KeyW, true);
        input.handle_key(KeyCode::KeyD, true);
        assert_eq!(input.movement_axis(), Vec2::new(1.0, -1.0));
        input.handle_key(KeyCode::KeyS, true);
        assert_eq!(input.movement_axis(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn mouse_buttons_track_edges() {
        let mut input = InputState::new();
        input.handle_mouse_button(MouseButton::Left, true);
        assert!(input.is_mouse_pressed(MouseButton::Left));
        input.end_frame();
        input.handle_mouse_button(MouseButton::Left, false);
        assert!(input.is_mouse_released(MouseButton::Left));
        assert!(!input.is_mouse_down(MouseButton::Left));
    }

    #[test]
    fn release_all_clears_held_keys() {
        let mut input = InputState::new();
        input.handle_key(KeyCode::KeyA, true);
        input.handle_mouse_button(MouseButton::Right, true);
        input.end_frame();
        input.release_all();
        assert!(!input.is_key_down(KeyCode::KeyA));
        assert!(input.is_key_released(KeyCode::KeyA));
        assert!(!input.is_mouse_down(MouseButton::Right));
    }

    #[test]
    fn scroll_resets_each_frame() {
        let mut input = InputState::new();
        input.handle_scroll(1.5);
        input.handle_scroll(0.5);
        assert_eq!(input.scroll_delta(), 2.0);
        input.end_frame();
        assert_eq!(input.scroll_delta(), 0.0);
    }
}
