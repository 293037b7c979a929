//! Native window presentation surface: the mirrored camera feed with the
//! current mood overlaid.

use crate::camera::CameraHub;
use crate::state::StableState;
use tokio::sync::watch;

const WINDOW_TITLE: &str = "Mood Mirror";
const WINDOW_WIDTH: f32 = 960.0;
const WINDOW_HEIGHT: f32 = 720.0;
const DISCLAIMER: &str = "Demo only, not a medical device";

#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("window error: {0}")]
    Window(String),
}

struct MirrorWindow {
    camera: CameraHub,
    mood: watch::Receiver<StableState>,
    texture: Option<egui::TextureHandle>,
}

impl MirrorWindow {
    fn new(camera: CameraHub, mood: watch::Receiver<StableState>) -> Self {
        Self {
            camera,
            mood,
            texture: None,
        }
    }

    fn refresh_camera_texture(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.camera.latest_frame() {
            let color_image = egui::ColorImage::from_rgb(
                [frame.width as usize, frame.height as usize],
                &frame.data,
            );
            self.texture =
                Some(ctx.load_texture("camera", color_image, egui::TextureOptions::LINEAR));
        }
    }
}

impl eframe::App for MirrorWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        if ctx.input(|i| i.key_pressed(egui::Key::Q) || i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.refresh_camera_texture(ctx);
        let state = self.mood.borrow().clone();

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(texture) = &self.texture {
                let available = ui.available_width();
                let size = texture.size_vec2();
                let scale = (available / size.x).min(1.0);
                ui.add(egui::Image::new(texture).fit_to_exact_size(size * scale));
            } else {
                ui.label("Waiting for camera...");
            }

            ui.separator();
            ui.heading(&state.mood);
            ui.label(format!("Emotion: {}", state.emotion));
            if !state.suggestion.is_empty() {
                ui.label(&state.suggestion);
            }
            if !state.joke.is_empty() {
                ui.label(&state.joke);
            }
            ui.add_space(8.0);
            ui.small(DISCLAIMER);
            ui.small("Press Q or Esc to quit");
        });
    }
}

/// Runs the window on the calling thread until the user closes it.
pub fn run_window(
    camera: CameraHub,
    mood: watch::Receiver<StableState>,
) -> Result<(), DisplayError> {
    eframe::run_native(
        WINDOW_TITLE,
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
                .with_title(WINDOW_TITLE),
            ..Default::default()
        },
        Box::new(move |_cc| Ok(Box::new(MirrorWindow::new(camera, mood)))),
    )
    .map_err(|e| DisplayError::Window(e.to_string()))
}
