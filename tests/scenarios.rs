use std::time::{Duration, Instant};

use makeup_canvas::brush::build_stamp;
use makeup_canvas::compositor::render;
use makeup_canvas::detect::{
    Detection, DetectorFactory, DetectorHandle, ExecutionProvider, FaceDetector, FaceLandmarks, MaskParams,
    MaskWorker, NoDetectorFactory, PartMaskSet, StaticDetector,
};
use makeup_canvas::stencil::{intersect, subtract_in_place};
use makeup_canvas::{
    AlphaStencil, BrushKind, DetectorError, MakeupSession, MaskState, PaintMode, Point, RasterBuffer, Rgb, Step,
    StepPaintStore, StepStates,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Paint `step` over the whole canvas with two huge dabs, so every pixel saturates.
fn paint_everything(store: &mut StepPaintStore, step: Step) {
    let stamp = build_stamp(BrushKind::Cream, 200, &mut StdRng::seed_from_u64(0));
    let c = Point::new(store.width() as f32 / 2.0, store.height() as f32 / 2.0);
    store.paint_dot(step, c, PaintMode::Paint, &stamp);
    store.paint_dot(step, c, PaintMode::Paint, &stamp);
}

fn black_multiply_states() -> StepStates {
    let mut states = StepStates::default();
    states.set_all_strengths(0.0);
    let contour = states.get_mut(Step::Contour); // multiply
    contour.color = Rgb::BLACK;
    contour.set_strength(1.0);
    states
}

fn wait_for_masks(session: &mut MakeupSession) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !session.poll_masks() {
        assert!(Instant::now() < deadline, "detection never arrived");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn black_multiply_over_a_full_stencil_is_black() {
    let photo = RasterBuffer::filled(100, 100, Rgb::WHITE);
    let mut store = StepPaintStore::new(100, 100);
    paint_everything(&mut store, Step::Contour);
    assert!(store.mask(Step::Contour).alpha.iter().all(|&a| a == 255));

    let out = render(&photo, &Step::ORDER, &store, &black_multiply_states(), None);
    assert!(out.data.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn black_multiply_over_an_empty_stencil_keeps_white() {
    let photo = RasterBuffer::filled(100, 100, Rgb::WHITE);
    let store = StepPaintStore::new(100, 100);
    let out = render(&photo, &Step::ORDER, &store, &black_multiply_states(), None);
    assert_eq!(out, photo);
}

#[test]
fn unavailable_detector_leaves_everything_paintable() {
    let handle = DetectorHandle::new(Box::new(NoDetectorFactory), ExecutionProvider::DEFAULT_ORDER.to_vec());
    let worker = MaskWorker::spawn(handle, MaskParams::default()).unwrap();

    let mut session = MakeupSession::new(StepStates::default(), StdRng::seed_from_u64(5));
    session.attach_worker(worker);
    session.load_photo(RasterBuffer::filled(100, 100, Rgb::WHITE));
    assert_eq!(session.mask_state(), &MaskState::Pending);
    wait_for_masks(&mut session);

    match session.mask_state() {
        MaskState::Fallback { masks, reason } => {
            assert!(reason.is_unavailable());
            assert!(masks.face_clip.alpha.iter().all(|&a| a == 255));
        }
        other => panic!("expected fallback, got {other:?}"),
    }

    // Corners are as paintable as the center.
    session.set_color(Step::Contour, Rgb::BLACK);
    session.set_strength(Step::Contour, 1.0);
    for p in [Point::new(2.0, 2.0), Point::new(97.0, 97.0), Point::new(50.0, 50.0)] {
        session.paint_stroke(Step::Contour, p, p, PaintMode::Paint).unwrap();
    }
    let frame = session.frame().unwrap();
    for (x, y) in [(2, 2), (97, 97), (50, 50)] {
        assert!(frame.pixel(x, y)[0] < 255, "nothing painted at ({x}, {y})");
    }
}

struct OvalFace;

impl DetectorFactory for OvalFace {
    fn name(&self) -> &str {
        "oval"
    }

    fn create(&self, _: ExecutionProvider) -> Result<Box<dyn FaceDetector>, DetectorError> {
        let face = FaceLandmarks {
            face_oval: vec![[0.3, 0.2], [0.7, 0.2], [0.7, 0.8], [0.3, 0.8]],
            ..FaceLandmarks::default()
        };
        Ok(Box::new(StaticDetector::new(Detection::Landmarks(face))))
    }
}

#[test]
fn detected_face_clips_paint_outside_it() {
    let handle = DetectorHandle::new(Box::new(OvalFace), vec![ExecutionProvider::Cpu]);
    let params = MaskParams { feather_px: 0, face_clip_margin_px: 2 };
    let worker = MaskWorker::spawn(handle, params).unwrap();

    let mut session = MakeupSession::new(StepStates::default(), StdRng::seed_from_u64(5));
    session.attach_worker(worker);
    let photo = RasterBuffer::filled(100, 100, Rgb::WHITE);
    session.load_photo(photo.clone());
    wait_for_masks(&mut session);
    assert!(matches!(session.mask_state(), MaskState::Ready(_)));

    session.set_color(Step::Foundation, Rgb::BLACK);
    session.set_strength(Step::Foundation, 1.0);
    session.paint_stroke(Step::Foundation, Point::new(5.0, 50.0), Point::new(95.0, 50.0), PaintMode::Paint).unwrap();

    let frame = session.frame().unwrap();
    assert_eq!(frame.pixel(10, 50), photo.pixel(10, 50));
    assert_eq!(frame.pixel(90, 50), photo.pixel(90, 50));
    assert!(frame.pixel(50, 50)[0] < 255);
}

#[test]
fn switching_the_active_step_is_an_idempotent_redraw() {
    let mut session = MakeupSession::new(StepStates::default(), StdRng::seed_from_u64(9));
    session.load_photo(RasterBuffer::filled(60, 60, Rgb::new(190, 160, 140)));
    session.paint_stroke(Step::Lips, Point::new(10.0, 30.0), Point::new(50.0, 30.0), PaintMode::Paint).unwrap();
    session.paint_stroke(Step::Shadow, Point::new(30.0, 5.0), Point::new(30.0, 55.0), PaintMode::Paint).unwrap();

    let reference = session.frame().unwrap().clone();
    for step in Step::ORDER.iter().rev() {
        session.set_active_step(*step);
        assert_eq!(session.frame().unwrap(), &reference);
    }
}

#[test]
fn extreme_settings_stay_opaque_and_in_range() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut photo = RasterBuffer::new(48, 48);
    for px in photo.data.chunks_exact_mut(4) {
        px.copy_from_slice(&[rng.r#gen(), rng.r#gen(), rng.r#gen(), 255]);
    }
    let mut store = StepPaintStore::new(48, 48);
    for step in Step::ORDER {
        paint_everything(&mut store, step);
    }

    for round in 0..4 {
        let mut states = StepStates::default();
        for step in Step::ORDER {
            let s = states.get_mut(step);
            s.color = if round % 2 == 0 { Rgb::WHITE } else { Rgb::new(rng.r#gen(), rng.r#gen(), rng.r#gen()) };
            s.set_strength(if round < 2 { 1.0 } else { rng.gen_range(-1.0..2.0) });
        }
        let out = render(&photo, &Step::ORDER, &store, &states, Some(&PartMaskSet::fallback(48, 48)));
        assert_eq!(out.data.len(), photo.data.len());
        assert!(out.data.chunks_exact(4).all(|px| px[3] == 255));
    }
}

#[test]
fn erasing_the_same_stroke_removes_what_was_painted() {
    let (a, b) = (Point::new(8.0, 12.0), Point::new(70.0, 40.0));
    for kind in [BrushKind::Soft, BrushKind::Powder, BrushKind::Cream, BrushKind::Gloss] {
        let paint = build_stamp(kind, 9, &mut StdRng::seed_from_u64(1));
        let same = build_stamp(kind, 9, &mut StdRng::seed_from_u64(2));
        let larger = build_stamp(kind, 12, &mut StdRng::seed_from_u64(3));

        let mut store = StepPaintStore::new(80, 50);
        store.paint_stroke(Step::Powder, a, b, PaintMode::Paint, &paint, 0.6);
        store.paint_stroke(Step::Powder, a, b, PaintMode::Erase, &same, 0.6);
        assert!(store.mask(Step::Powder).is_empty(), "{kind:?} stroke left paint behind");

        store.paint_stroke(Step::Powder, a, b, PaintMode::Paint, &paint, 0.6);
        store.paint_stroke(Step::Powder, a, b, PaintMode::Erase, &larger, 0.6);
        assert!(store.mask(Step::Powder).is_empty(), "{kind:?} larger eraser left paint behind");

        store.paint_stroke(Step::Powder, a, a, PaintMode::Paint, &paint, 0.6);
        store.paint_stroke(Step::Powder, a, a, PaintMode::Erase, &larger, 0.6);
        assert!(store.mask(Step::Powder).is_empty(), "{kind:?} dot left paint behind");
    }
}

#[test]
fn erasing_a_path_with_a_bigger_brush_restores_the_photo() {
    let photo = RasterBuffer::filled(120, 60, Rgb::new(200, 170, 150));
    let mut session = MakeupSession::new(StepStates::default(), StdRng::seed_from_u64(11));
    session.load_photo(photo.clone());
    session.set_color(Step::Lips, Rgb::new(150, 20, 40));
    session.set_strength(Step::Lips, 1.0);

    let path = [Point::new(10.0, 30.0), Point::new(47.3, 22.9), Point::new(108.6, 41.2)];
    session.set_brush_radius(8);
    for w in path.windows(2) {
        session.paint_stroke(Step::Lips, w[0], w[1], PaintMode::Paint).unwrap();
    }
    assert_ne!(session.frame().unwrap(), &photo);

    session.set_brush_radius(13);
    for w in path.windows(2) {
        session.paint_stroke(Step::Lips, w[0], w[1], PaintMode::Erase).unwrap();
    }
    assert!(session.store().unwrap().mask(Step::Lips).is_empty());
    assert_eq!(session.frame().unwrap(), &photo);
}

#[test]
fn clearing_one_step_leaves_the_others_byte_identical() {
    let mut session = MakeupSession::new(StepStates::default(), StdRng::seed_from_u64(3));
    session.load_photo(RasterBuffer::new(40, 40));
    for (i, step) in Step::ORDER.iter().enumerate() {
        let y = 4.0 * i as f32 + 2.0;
        session.paint_stroke(*step, Point::new(0.0, y), Point::new(40.0, y), PaintMode::Paint).unwrap();
    }
    let snapshot: Vec<AlphaStencil> =
        Step::ORDER.iter().map(|s| session.store().unwrap().mask(*s).clone()).collect();

    session.clear_step(Step::Highlight).unwrap();
    for (i, step) in Step::ORDER.iter().enumerate() {
        let now = session.store().unwrap().mask(*step);
        if *step == Step::Highlight {
            assert!(now.is_empty());
        } else {
            assert_eq!(now, &snapshot[i]);
        }
    }
}

#[test]
fn stencil_algebra_holds_on_irregular_masks() {
    let mut rng = StdRng::seed_from_u64(17);
    let s = AlphaStencil::from_fn(33, 21, |_, _| rng.r#gen());
    let t = AlphaStencil::from_fn(33, 21, |x, y| ((x * 7 + y * 13) % 256) as u8);

    assert_eq!(intersect(&s, &AlphaStencil::full(33, 21)), s);
    assert_eq!(intersect(&s, &AlphaStencil::empty(33, 21)), AlphaStencil::empty(33, 21));
    assert_eq!(intersect(&s, &t), intersect(&t, &s));

    let mut holed = s.clone();
    subtract_in_place(&mut holed, &AlphaStencil::full(33, 21));
    assert!(holed.is_empty());
}
