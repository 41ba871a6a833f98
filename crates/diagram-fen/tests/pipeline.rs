//! End-to-end pipeline tests against mock classifiers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{Array3, ArrayD, IxDyn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use diagram_fen::{
    board_to_tensor, decode_board_tensor, BoardState, Classifier, CropOutcome, FenDetector,
    FenDetectorParams, ModelError, ModelRegistry, ModelRole, OCC_CHANNELS,
};

struct Mock {
    output: ArrayD<f32>,
    calls: AtomicUsize,
}

impl Mock {
    fn new(output: ArrayD<f32>) -> Arc<Self> {
        Arc::new(Self {
            output,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for Mock {
    fn infer(&self, _input: &ArrayD<f32>) -> Result<ArrayD<f32>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

fn scalar(value: f32) -> ArrayD<f32> {
    ArrayD::from_shape_vec(IxDyn(&[1, 1]), vec![value]).unwrap()
}

fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> ArrayD<f32> {
    ArrayD::from_shape_vec(IxDyn(&[1, 4]), vec![x1, y1, x2, y2]).unwrap()
}

fn rotation_class(index: usize) -> ArrayD<f32> {
    let mut scores = vec![0.0f32; 4];
    scores[index] = 1.0;
    ArrayD::from_shape_vec(IxDyn(&[1, 4]), scores).unwrap()
}

fn starting_occupancy() -> ArrayD<f32> {
    board_to_tensor(&BoardState::starting()).into_dyn()
}

fn empty_occupancy() -> ArrayD<f32> {
    let mut tensor = Array3::<f32>::zeros((OCC_CHANNELS, 8, 8));
    tensor.index_axis_mut(ndarray::Axis(0), 0).fill(1.0);
    tensor.into_dyn()
}

fn test_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([220, 220, 220])
        } else {
            Rgb([40, 40, 40])
        }
    });
    DynamicImage::ImageRgb8(img)
}

struct Mocks {
    existence: Arc<Mock>,
    bounding_box: Arc<Mock>,
    image_rotation: Arc<Mock>,
    piece_recognition: Arc<Mock>,
    board_orientation: Arc<Mock>,
}

impl Mocks {
    fn standard() -> Self {
        Self {
            existence: Mock::new(scalar(1.0)),
            bounding_box: Mock::new(bbox(0.0, 0.0, 256.0, 256.0)),
            image_rotation: Mock::new(rotation_class(0)),
            piece_recognition: Mock::new(starting_occupancy()),
            board_orientation: Mock::new(scalar(0.0)),
        }
    }

    fn registry(&self) -> ModelRegistry {
        ModelRegistry::from_classifiers([
            (
                ModelRole::Existence,
                Arc::clone(&self.existence) as Arc<dyn Classifier>,
            ),
            (
                ModelRole::BoundingBox,
                Arc::clone(&self.bounding_box) as Arc<dyn Classifier>,
            ),
            (
                ModelRole::ImageRotation,
                Arc::clone(&self.image_rotation) as Arc<dyn Classifier>,
            ),
            (
                ModelRole::PieceRecognition,
                Arc::clone(&self.piece_recognition) as Arc<dyn Classifier>,
            ),
            (
                ModelRole::BoardOrientation,
                Arc::clone(&self.board_orientation) as Arc<dyn Classifier>,
            ),
        ])
    }
}

fn single_try_params() -> FenDetectorParams {
    FenDetectorParams {
        num_tries: 1,
        ..FenDetectorParams::default()
    }
}

#[test]
fn full_pipeline_decodes_the_starting_position() {
    let mocks = Mocks::standard();
    let detector = FenDetector::new(mocks.registry(), single_try_params());

    let result = detector
        .get_fen(&test_image(64, 64), &mut SmallRng::seed_from_u64(0))
        .unwrap()
        .expect("existence gate accepts");

    let fen = result.fen.expect("a board was recognized");
    assert!(
        fen.starts_with("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"),
        "unexpected FEN: {fen}"
    );
    assert_eq!(result.image_rotation_angle, Some(0));
    assert_eq!(result.board_is_flipped, Some(false));
    assert!(result.cropped_image.is_some());
}

#[test]
fn existence_rejection_short_circuits_the_pipeline() {
    let mocks = Mocks {
        existence: Mock::new(scalar(0.0)),
        ..Mocks::standard()
    };
    let detector = FenDetector::new(mocks.registry(), single_try_params());

    let result = detector
        .get_fen(&test_image(64, 64), &mut SmallRng::seed_from_u64(0))
        .unwrap();

    assert!(result.is_none());
    assert_eq!(mocks.existence.calls(), 1);
    assert_eq!(mocks.bounding_box.calls(), 0);
    assert_eq!(mocks.image_rotation.calls(), 0);
    assert_eq!(mocks.piece_recognition.calls(), 0);
    assert_eq!(mocks.board_orientation.calls(), 0);
}

#[test]
fn empty_recognition_yields_a_partial_result() {
    let mocks = Mocks {
        piece_recognition: Mock::new(empty_occupancy()),
        ..Mocks::standard()
    };
    let detector = FenDetector::new(mocks.registry(), single_try_params());

    let result = detector
        .get_fen(&test_image(64, 64), &mut SmallRng::seed_from_u64(0))
        .unwrap()
        .unwrap();

    assert!(result.fen.is_none());
    assert!(result.cropped_image.is_some());
    assert_eq!(result.image_rotation_angle, Some(0));
    assert!(result.board_is_flipped.is_none());
}

#[test]
fn flipped_board_is_rotated_before_fen_emission() {
    let mocks = Mocks {
        board_orientation: Mock::new(scalar(1.0)),
        ..Mocks::standard()
    };
    let detector = FenDetector::new(mocks.registry(), single_try_params());

    let result = detector
        .get_fen(&test_image(64, 64), &mut SmallRng::seed_from_u64(0))
        .unwrap()
        .unwrap();

    assert_eq!(result.board_is_flipped, Some(true));
    let fen = result.fen.unwrap();
    assert!(
        fen.starts_with("RNBKQBNR/PPPPPPPP/8/8/8/8/pppppppp/rnbkqbnr"),
        "unexpected FEN: {fen}"
    );
}

#[test]
fn bbox_exhaustion_returns_an_all_empty_result() {
    let mocks = Mocks {
        // Box covering well under 70% of the frame on every pass.
        bounding_box: Mock::new(bbox(100.0, 100.0, 130.0, 130.0)),
        ..Mocks::standard()
    };
    let params = FenDetectorParams {
        num_tries: 3,
        ..FenDetectorParams::default()
    };
    let detector = FenDetector::new(mocks.registry(), params);

    let result = detector
        .get_fen(&test_image(64, 64), &mut SmallRng::seed_from_u64(0))
        .unwrap()
        .unwrap();

    assert!(result.fen.is_none());
    assert!(result.cropped_image.is_none());
    assert!(result.image_rotation_angle.is_none());
    assert!(result.board_is_flipped.is_none());
    assert_eq!(mocks.bounding_box.calls(), 3);
    assert_eq!(mocks.piece_recognition.calls(), 0);
}

#[test]
fn bbox_refinement_converges_in_one_pass_at_high_coverage() {
    let mocks = Mocks {
        // 90% coverage along both axes in model space.
        bounding_box: Mock::new(bbox(12.8, 12.8, 243.2, 243.2)),
        ..Mocks::standard()
    };
    let detector = FenDetector::new(mocks.registry(), FenDetectorParams::default());

    let outcome = detector.crop_to_board(&test_image(128, 128), 10).unwrap();
    assert!(matches!(outcome, CropOutcome::Converged(_)));
    assert_eq!(mocks.bounding_box.calls(), 1);
}

#[test]
fn tiny_crops_skip_the_recognition_model() {
    let mocks = Mocks::standard();
    let detector = FenDetector::new(mocks.registry(), FenDetectorParams::default());

    let board = detector
        .recognize_board(&test_image(16, 16), 10, &mut SmallRng::seed_from_u64(0))
        .unwrap();

    assert!(board.is_none());
    assert_eq!(mocks.piece_recognition.calls(), 0);
}

#[test]
fn rotation_correction_turns_the_crop_upright() {
    let mocks = Mocks {
        image_rotation: Mock::new(rotation_class(1)),
        ..Mocks::standard()
    };
    let detector = FenDetector::new(mocks.registry(), single_try_params());

    let result = detector
        .get_fen(&test_image(96, 64), &mut SmallRng::seed_from_u64(0))
        .unwrap()
        .unwrap();

    assert_eq!(result.image_rotation_angle, Some(90));
    let crop = result.cropped_image.unwrap();
    // A landscape source turned 90 degrees becomes portrait.
    assert!(crop.width() < crop.height());
}

#[test]
fn ensemble_accumulation_is_order_independent() {
    // Scores are multiples of 1/256, so summation is exact in f32 and the
    // decoded board cannot depend on the order in which tries arrive.
    let mut rng = SmallRng::seed_from_u64(99);
    let tries: Vec<Array3<f32>> = (0..6)
        .map(|_| {
            Array3::from_shape_fn((OCC_CHANNELS, 8, 8), |_| {
                rng.gen_range(0..=255) as f32 / 256.0
            })
        })
        .collect();

    let orders: [[usize; 6]; 3] = [[0, 1, 2, 3, 4, 5], [5, 3, 1, 0, 2, 4], [2, 5, 0, 4, 1, 3]];
    let mut decoded = Vec::new();
    for order in orders {
        let mut sum = Array3::<f32>::zeros((OCC_CHANNELS, 8, 8));
        for &index in &order {
            sum += &tries[index];
        }
        decoded.push(decode_board_tensor(&sum));
    }

    assert_eq!(decoded[0], decoded[1]);
    assert_eq!(decoded[1], decoded[2]);
}
