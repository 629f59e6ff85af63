use crate::car::ControlInput;
use winit::keyboard::KeyCode as Kc;

/// Driving keys currently held down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KeyState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl KeyState {
    /// Returns false if the key does not drive the car.
    pub fn on_key(&mut self, code: Kc, pressed: bool) -> bool {
        let slot = match code {
            Kc::KeyW | Kc::ArrowUp => &mut self.forward,
            Kc::KeyS | Kc::ArrowDown => &mut self.back,
            Kc::KeyA | Kc::ArrowLeft => &mut self.left,
            Kc::KeyD | Kc::ArrowRight => &mut self.right,
            _ => return false,
        };
        *slot = pressed;
        true
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    pub fn control(&self) -> ControlInput {
        fn axis(positive: bool, negative: bool) -> f32 {
            positive as i32 as f32 - negative as i32 as f32
        }
        ControlInput {
            throttle: axis(self.forward, self.back),
            steer: axis(self.left, self.right),
        }
    }
}
