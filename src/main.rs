// What you SEE:
// • The photo (from a file or one still from the camera) fills the window.
// • Hold Left Mouse: you paint the active makeup step onto the face.
// • 1-9 pick the step (primer ... lips), E toggles paint/erase, C clears the step.
// • [ ] brush size, Up/Down strength, P clamps the step to its facial part,
//   G shows/hides the guide oval, S saves a JPEG. ESC quits.

mod camera;
mod draw;

use std::path::PathBuf;

use camera::CameraCapture;
use clap::Parser;
use draw::{Drawer, FrameBuffer, draw_circle, draw_crosshair, draw_guide, draw_text_5x7, shade_rect};
use makeup_canvas::detect::{
    ClassMapFileFactory, DetectorFactory, DetectorHandle, LandmarkFileFactory, MaskWorker, NoDetectorFactory,
};
use makeup_canvas::{EngineConfig, Error, MakeupSession, MaskState, PaintMode, Point, Step, io};
use minifb::Key;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "makeup-canvas", about = "Practice makeup looks on a photo")]
struct Args {
    /// Photo to practice on (PNG or JPEG).
    #[arg(required_unless_present = "camera")]
    photo: Option<PathBuf>,

    /// Take the photo from this camera instead of a file.
    #[arg(long, conflicts_with = "photo")]
    camera: Option<u32>,

    /// TOML settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Precomputed face landmarks (JSON groups or a 468-point mesh).
    #[arg(long, conflicts_with = "class_map")]
    landmarks: Option<PathBuf>,

    /// Precomputed face-parsing class map (grayscale PNG of class ids).
    #[arg(long)]
    class_map: Option<PathBuf>,

    /// Step to start on, e.g. "lips".
    #[arg(long)]
    step: Option<String>,

    /// Where S saves the finished look.
    #[arg(long, default_value = "look.jpg")]
    export: PathBuf,
}

const STRENGTH_STEP: f32 = 0.05;
const RADIUS_STEP: u32 = 2;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    /* --- Photo ---
       Visual: nothing yet; we just hold the picture we'll paint on. */
    let photo = match (&args.photo, args.camera) {
        (_, Some(index)) => {
            let cam = CameraCapture::new(index, 1280, 720)?;
            let (w, h) = cam.resolution();
            info!(width = w, height = h, "warming up camera");
            cam.capture_still()?
        }
        (Some(path), None) => io::load_photo(path)?,
        (None, None) => return Err(Error::Config("pass a photo path or --camera <index>".into())),
    };
    let (w, h) = (photo.width, photo.height);

    /* --- Detector on its own thread ---
       Visual: painting works right away; face clipping kicks in once detection lands. */
    let factory: Box<dyn DetectorFactory> = match (&args.landmarks, &args.class_map) {
        (Some(path), _) => Box::new(LandmarkFileFactory::new(path)),
        (None, Some(path)) => Box::new(ClassMapFileFactory::new(path)),
        (None, None) => Box::new(NoDetectorFactory),
    };
    let detector = DetectorHandle::new(factory, config.providers()?);
    let worker = MaskWorker::spawn(detector, config.mask_params())?;

    let mut session = MakeupSession::from_config(&config)?;
    session.attach_worker(worker);
    session.load_photo(photo);
    if let Some(name) = &args.step {
        session.set_active_step(name.parse()?);
    }

    let mut drawer = Drawer::new("Makeup Practice", w, h)?;
    let mut screen = FrameBuffer::new(w, h);
    let mut last_point: Option<Point> = None;
    let mut show_guide = true;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Pick up a finished detection (if any). */
        if session.poll_masks() {
            match session.mask_state() {
                MaskState::Ready(_) => info!("face masks ready"),
                MaskState::Fallback { reason, .. } => info!(%reason, "painting without face masks"),
                MaskState::Pending => {}
            }
        }

        /* 2) Inputs */
        let active = session.active_step();
        if let Some(i) = drawer.digit_pressed() {
            session.set_active_step(Step::from_index(i)?); // visual: guide jumps to the new part
        }
        if drawer.pressed_once(Key::E) {
            let mode = match session.mode() {
                PaintMode::Paint => PaintMode::Erase,
                PaintMode::Erase => PaintMode::Paint,
            };
            session.set_mode(mode);
        }
        if drawer.pressed_once(Key::C) {
            session.clear_step(active)?; // visual: this step's color disappears
        }
        if drawer.pressed_repeat(Key::LeftBracket) {
            session.set_brush_radius(session.brush_radius().saturating_sub(RADIUS_STEP));
        }
        if drawer.pressed_repeat(Key::RightBracket) {
            session.set_brush_radius(session.brush_radius() + RADIUS_STEP);
        }
        if drawer.pressed_repeat(Key::Up) {
            let s = session.states().get(active).strength();
            session.set_strength(active, s + STRENGTH_STEP);
        }
        if drawer.pressed_repeat(Key::Down) {
            let s = session.states().get(active).strength();
            session.set_strength(active, s - STRENGTH_STEP);
        }
        if drawer.pressed_once(Key::P) {
            let on = !session.states().get(active).clamp_to_part;
            session.set_clamp_to_part(active, on);
        }
        if drawer.pressed_once(Key::G) {
            show_guide = !show_guide;
        }

        // Lines between successive mouse samples, so fast drags leave no gaps.
        let mouse = drawer.mouse_pos();
        match (drawer.left_mouse_down(), mouse) {
            (true, Some((mx, my))) => {
                let p = Point::new(mx, my);
                session.paint_active(last_point.unwrap_or(p), p)?;
                last_point = Some(p);
            }
            _ => last_point = None,
        }

        if drawer.pressed_once(Key::S) {
            let quality = config.export_quality;
            if let Err(e) = session.export_jpeg(&args.export, quality) {
                warn!(error = %e, "export failed");
            }
        }

        /* 3) The composited photo (re-rendered only when something changed). */
        session.frame()?.to_xrgb(&mut screen.pixels);

        /* 4) Overlays: guide oval, brush preview, HUD */
        if show_guide {
            if let Some(guide) = session.guide_path() {
                draw_guide(&mut screen, &guide, config.guide_band_px, 0x00_FF_FF_FF);
            }
        }
        if let Some((mx, my)) = mouse {
            let color = match session.mode() {
                PaintMode::Paint => 0x00_FF_CC_33,
                PaintMode::Erase => 0x00_33_CC_FF,
            };
            draw_circle(&mut screen, mx as i32, my as i32, session.brush_radius() as i32, color);
            draw_crosshair(&mut screen, mx as i32, my as i32, 6, color);
        }

        let active = session.active_step();
        let state = session.states().get(active);
        let hud = format!(
            "{} {} | {} | R {} | STR {:.0}% | {}{}",
            active.index() + 1,
            active.config().label,
            match session.mode() {
                PaintMode::Paint => "PAINT",
                PaintMode::Erase => "ERASE",
            },
            session.brush_radius(),
            state.strength() * 100.0,
            session.mask_state().label(),
            if state.clamp_to_part { " | CLAMP" } else { "" },
        );
        shade_rect(&mut screen, 0, 0, w, 20);
        draw_text_5x7(&mut screen, 8, 7, &hud, 0x00_FF_FF_FF);

        /* 5) Present to the window. */
        drawer.present(&screen)?;
    }

    Ok(())
}
