use endless_road::{Config, KeyState, Settings, Simulation};

use std::{path, time};

const ROUGHNESS_STEP: f32 = 0.1;
const CURVINESS_STEP: f32 = 0.1;
const SPEED_LIMIT_STEP: f32 = 10.0;
const REPORT_INTERVAL: time::Duration = time::Duration::from_secs(1);

pub struct Game {
    // windowing
    pub window: winit::window::Window,
    // navigation
    keys: KeyState,
    in_camera_drag: bool,
    last_mouse_pos: [i32; 2],
    // game
    simulation: Simulation,
    settings: Settings,
    roughness_pending: bool,
    last_frame: Option<time::Instant>,
    last_report: time::Instant,
}

struct QuitEvent;

impl Game {
    pub fn new(event_loop: &winit::event_loop::EventLoop<()>) -> Self {
        log::info!("Initializing");

        let config_path = path::Path::new("data/config.ron");
        let config = Config::load(config_path).unwrap_or_else(|e| {
            log::warn!("{:#}, falling back to defaults", e);
            Config::default()
        });
        let settings = config.settings;

        log::info!("Creating the window");
        let window_attributes = winit::window::Window::default_attributes()
            .with_title("Endless Road")
            .with_inner_size(winit::dpi::PhysicalSize::new(1280, 800));
        #[allow(deprecated)] //TODO: move to `ApplicationHandler`
        let window = event_loop.create_window(window_attributes).unwrap();

        Self {
            window,
            keys: KeyState::default(),
            in_camera_drag: false,
            last_mouse_pos: [0; 2],
            simulation: Simulation::new(config),
            settings,
            roughness_pending: false,
            last_frame: None,
            last_report: time::Instant::now(),
        }
    }

    fn redraw(&mut self) -> time::Duration {
        let now = time::Instant::now();
        // the first frame has no delta and leaves the world untouched
        let dt = self
            .last_frame
            .map_or(0.0, |last| (now - last).as_secs_f32());
        self.last_frame = Some(now);

        self.simulation
            .step(dt, self.keys.control(), &self.settings);
        let frame = self.simulation.frame();
        if frame.terrain_dirty {
            log::debug!("Terrain around {:?} changed", frame.terrain_origin);
        }

        if now - self.last_report >= REPORT_INTERVAL {
            self.last_report = now;
            let state = &self.simulation.car().state;
            let title = format!(
                "Endless Road - {:.0} km/h, segment {}",
                state.velocity.abs() * 3.6,
                self.simulation.road().counter(),
            );
            log::info!(
                "{} at {:?}, camera at {:?}",
                title,
                state.position,
                self.simulation.camera_position(),
            );
            self.window.set_title(&title);
        }
        time::Duration::from_millis(16)
    }

    fn on_settings_key(&mut self, key_code: winit::keyboard::KeyCode) -> bool {
        use winit::keyboard::KeyCode as Kc;

        let settings = &mut self.settings;
        match key_code {
            Kc::BracketLeft => {
                settings.terrain_roughness =
                    (settings.terrain_roughness - ROUGHNESS_STEP).max(0.0);
                self.roughness_pending = true;
            }
            Kc::BracketRight => {
                settings.terrain_roughness =
                    (settings.terrain_roughness + ROUGHNESS_STEP).min(1.0);
                self.roughness_pending = true;
            }
            Kc::Comma => {
                settings.road_curviness = (settings.road_curviness - CURVINESS_STEP).max(0.0);
            }
            Kc::Period => {
                settings.road_curviness = (settings.road_curviness + CURVINESS_STEP).min(1.0);
            }
            Kc::Minus => {
                settings.speed_limit_kph = (settings.speed_limit_kph - SPEED_LIMIT_STEP).max(0.0);
            }
            Kc::Equal => {
                settings.speed_limit_kph += SPEED_LIMIT_STEP;
            }
            Kc::KeyF => {
                settings.free_look = !settings.free_look;
            }
            Kc::KeyR => {
                self.simulation.reset();
            }
            _ => return false,
        }
        log::info!("Settings: {:?}", self.settings);
        true
    }

    pub fn on_event(
        &mut self,
        event: &winit::event::WindowEvent,
    ) -> Result<winit::event_loop::ControlFlow, QuitEvent> {
        match *event {
            winit::event::WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        state: winit::event::ElementState::Pressed,
                        repeat,
                        ..
                    },
                ..
            } => match key_code {
                winit::keyboard::KeyCode::Escape => {
                    return Err(QuitEvent);
                }
                _ => {
                    if !self.keys.on_key(key_code, true) && !repeat {
                        self.on_settings_key(key_code);
                    }
                }
            },
            winit::event::WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        state: winit::event::ElementState::Released,
                        ..
                    },
                ..
            } => match key_code {
                // the roughness slider commits once the key is let go
                winit::keyboard::KeyCode::BracketLeft | winit::keyboard::KeyCode::BracketRight
                    if self.roughness_pending =>
                {
                    self.roughness_pending = false;
                    self.simulation
                        .commit_roughness(self.settings.terrain_roughness);
                }
                _ => {
                    self.keys.on_key(key_code, false);
                }
            },
            winit::event::WindowEvent::Focused(false) => {
                self.keys.release_all();
            }
            winit::event::WindowEvent::MouseWheel { delta, .. } => {
                if self.settings.free_look {
                    self.simulation.orbit_mut().on_wheel(delta);
                }
            }
            winit::event::WindowEvent::MouseInput {
                state: winit::event::ElementState::Pressed,
                button: winit::event::MouseButton::Left,
                ..
            } => {
                self.in_camera_drag = true;
            }
            winit::event::WindowEvent::MouseInput {
                state: winit::event::ElementState::Released,
                button: winit::event::MouseButton::Left,
                ..
            } => {
                self.in_camera_drag = false;
            }
            winit::event::WindowEvent::CursorMoved { position, .. } => {
                if self.in_camera_drag && self.settings.free_look {
                    self.simulation.orbit_mut().on_drag(
                        self.last_mouse_pos[0] as f32 - position.x as f32,
                        self.last_mouse_pos[1] as f32 - position.y as f32,
                    );
                }
                self.last_mouse_pos = [position.x as i32, position.y as i32];
            }
            winit::event::WindowEvent::CloseRequested => {
                return Err(QuitEvent);
            }
            winit::event::WindowEvent::RedrawRequested => {
                let wait = self.redraw();

                return Ok(
                    if let Some(repaint_after_instant) = std::time::Instant::now().checked_add(wait)
                    {
                        winit::event_loop::ControlFlow::WaitUntil(repaint_after_instant)
                    } else {
                        winit::event_loop::ControlFlow::Wait
                    },
                );
            }
            _ => {}
        }

        Ok(winit::event_loop::ControlFlow::Poll)
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        log::info!("Deinitializing");
    }
}

fn main() {
    env_logger::init();
    let event_loop = winit::event_loop::EventLoop::new().unwrap();
    let mut game = Game::new(&event_loop);

    #[allow(deprecated)] //TODO: move to `ApplicationHandler`
    event_loop
        .run(|event, target| match event {
            winit::event::Event::AboutToWait => {
                game.window.request_redraw();
            }
            winit::event::Event::WindowEvent { event, .. } => match game.on_event(&event) {
                Ok(control_flow) => {
                    target.set_control_flow(control_flow);
                }
                Err(QuitEvent) => {
                    target.exit();
                }
            },
            _ => {}
        })
        .unwrap();
}
