//! 端到端流程测试：使用假模型替代 ONNX 推理

use std::io::Cursor;
use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;

use xingyan::{
  alert::{DROWSINESS_MESSAGE, NO_DETECTIONS_MESSAGE, PHONE_USE_MESSAGE, Severity},
  input::{ImageFileInput, InputError, Upload},
  labels::LabelError,
  model::{BuildModel, ClassNameTable, DetectItem, DetectResult, Model, ModelLoader},
  output::{Draw, SaveImageFileOutput},
  task::{BatchTask, OneShotTask, Task, TaskError, analyze},
};

#[derive(Error, Debug)]
#[error("模型拒绝输入: {0}")]
struct FakeError(String);

/// 按图像宽度返回预设结果的假模型
struct FakeModel {
  names: ClassNameTable,
  detections: Vec<u32>,
  calls: AtomicUsize,
}

impl FakeModel {
  fn new(detections: &[u32]) -> Self {
    Self {
      names: [(0, "awake"), (1, "Drowsy"), (2, "phone")].into_iter().collect(),
      detections: detections.to_vec(),
      calls: AtomicUsize::new(0),
    }
  }
}

impl Model for FakeModel {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = FakeError;

  fn infer(&self, input: &RgbImage) -> Result<DetectResult, FakeError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if input.width() == 0 || input.height() == 0 {
      return Err(FakeError("空图像".to_string()));
    }
    Ok(DetectResult::new(
      self
        .detections
        .iter()
        .enumerate()
        .map(|(i, &class_id)| DetectItem {
          class_id,
          score: 0.9 - i as f32 * 0.1,
          bbox: [0.1, 0.1, 0.6, 0.6],
        })
        .collect(),
    ))
  }

  fn class_names(&self) -> &ClassNameTable {
    &self.names
  }
}

fn upload(name: &str) -> (String, Result<Upload, InputError>) {
  let image = RgbImage::from_pixel(32, 24, Rgb([40, 40, 40]));
  (
    name.to_string(),
    Ok(Upload {
      name: name.to_string(),
      image,
    }),
  )
}

fn no_output() -> Option<SaveImageFileOutput> {
  None
}

#[test]
fn scenario_a_no_detections() {
  let model = FakeModel::new(&[]);
  let report = OneShotTask::new(Draw::new().unwrap())
    .run_task(std::iter::once(upload("empty.jpg")), &model, &no_output())
    .unwrap();

  assert_eq!(report.label_text, "None");
  assert!(report.state.no_detections);
  assert_eq!(report.alerts.len(), 1);
  assert_eq!(report.alerts[0].severity, Severity::Info);
  assert_eq!(report.alerts[0].message, NO_DETECTIONS_MESSAGE);
}

#[test]
fn scenario_b_drowsy_only() {
  let model = FakeModel::new(&[1]);
  let report = OneShotTask::new(Draw::new().unwrap())
    .run_task(std::iter::once(upload("tired.jpg")), &model, &no_output())
    .unwrap();

  assert_eq!(report.labels, vec!["Drowsy"]);
  assert_eq!(report.alerts.len(), 1);
  assert_eq!(report.alerts[0].severity, Severity::Error);
  assert_eq!(report.alerts[0].message, DROWSINESS_MESSAGE);
  assert!(report.alerts.iter().all(|a| a.severity != Severity::Warning));
}

#[test]
fn scenario_c_phone_and_drowsy() {
  let model = FakeModel::new(&[2, 1]);
  let report = OneShotTask::new(Draw::new().unwrap())
    .run_task(std::iter::once(upload("both.png")), &model, &no_output())
    .unwrap();

  assert_eq!(report.label_text, "phone, Drowsy");
  let messages: Vec<_> = report.alerts.iter().map(|a| (a.severity, a.message)).collect();
  assert_eq!(
    messages,
    vec![
      (Severity::Error, DROWSINESS_MESSAGE),
      (Severity::Warning, PHONE_USE_MESSAGE),
    ]
  );
}

#[test]
fn analysis_keeps_original_untouched() {
  let model = FakeModel::new(&[2]);
  let (_, upload) = upload("frame.png");
  let upload = upload.unwrap();
  let analysis = analyze(&model, &Draw::new().unwrap(), &upload).unwrap();

  assert!(upload.image.pixels().all(|p| *p == Rgb([40, 40, 40])));
  assert_ne!(analysis.annotated, upload.image);
  assert_eq!(analysis.result.len(), 1);
  assert_eq!(analysis.report.detections[0].label, "phone");
}

#[test]
fn unknown_class_is_surfaced() {
  let model = FakeModel::new(&[1, 9]);
  let err = OneShotTask::new(Draw::new().unwrap())
    .run_task(std::iter::once(upload("stale.jpg")), &model, &no_output())
    .unwrap_err();

  assert!(matches!(
    err,
    TaskError::Label(LabelError::UnknownClass { class_id: 9 })
  ));
}

#[test]
fn inference_error_propagates() {
  let model = FakeModel::new(&[1]);
  let input = std::iter::once((
    "zero.png".to_string(),
    Ok(Upload {
      name: "zero.png".to_string(),
      image: RgbImage::new(0, 0),
    }),
  ));
  let err = OneShotTask::new(Draw::new().unwrap())
    .run_task(input, &model, &no_output())
    .unwrap_err();

  assert!(matches!(err, TaskError::Inference(_)));
  assert!(err.to_string().contains("空图像"));
}

#[test]
fn one_shot_without_input() {
  let model = FakeModel::new(&[]);
  let err = OneShotTask::new(Draw::new().unwrap())
    .run_task(std::iter::empty(), &model, &no_output())
    .unwrap_err();
  assert!(matches!(err, TaskError::NoInput));
}

#[test]
fn batch_continues_after_failure() {
  let model = FakeModel::new(&[2]);
  let broken: Result<Upload, InputError> = Err(
    ImageFileInput::from_bytes("broken.png", b"not an image")
      .err()
      .unwrap()
      .into(),
  );
  let inputs = vec![
    upload("first.jpg"),
    ("broken.png".to_string(), broken),
    upload("third.jpg"),
  ];

  let outcome = BatchTask::new(Draw::new().unwrap())
    .run_task(inputs.into_iter(), &model, &no_output())
    .unwrap();

  assert!(!outcome.is_success());
  assert_eq!(outcome.reports.len(), 2);
  assert_eq!(outcome.failures.len(), 1);
  assert_eq!(outcome.failures[0].0, "broken.png");
  assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn batch_writes_per_source_images() {
  let dir = tempfile::tempdir().unwrap();
  let url = url::Url::parse(&format!("image://{}/annotated.png", dir.path().display())).unwrap();
  let output = Some(
    <SaveImageFileOutput as xingyan::FromUrl>::from_url(&url)
      .unwrap()
      .per_source(true),
  );

  let model = FakeModel::new(&[1]);
  let outcome = BatchTask::new(Draw::new().unwrap())
    .run_task(vec![upload("a.jpg"), upload("b.jpg")].into_iter(), &model, &output)
    .unwrap();

  assert!(outcome.is_success());
  assert!(dir.path().join("annotated-a.png").exists());
  assert!(dir.path().join("annotated-b.png").exists());
}

#[test]
fn batch_keeps_same_stem_inputs_apart() {
  let dir = tempfile::tempdir().unwrap();
  let url = url::Url::parse(&format!("image://{}/out.png", dir.path().display())).unwrap();
  let output = Some(
    <SaveImageFileOutput as xingyan::FromUrl>::from_url(&url)
      .unwrap()
      .per_source(true),
  );

  let model = FakeModel::new(&[2]);
  let outcome = BatchTask::new(Draw::new().unwrap())
    .run_task(
      vec![upload("/a/photo.jpg"), upload("/b/photo.jpg")].into_iter(),
      &model,
      &output,
    )
    .unwrap();

  assert_eq!(outcome.reports.len(), 2);
  let mut files: Vec<_> = std::fs::read_dir(dir.path())
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  files.sort();
  assert_eq!(files, vec!["out-photo-2.png", "out-photo.png"]);
}

#[test]
fn decoded_upload_runs_end_to_end() {
  let image = RgbImage::from_pixel(16, 16, Rgb([200, 10, 10]));
  let mut bytes = Cursor::new(Vec::new());
  image.write_to(&mut bytes, ImageFormat::Png).unwrap();

  let input = ImageFileInput::from_bytes("upload.png", bytes.get_ref())
    .unwrap()
    .map(|upload| (upload.name.clone(), Ok(upload)));

  let model = FakeModel::new(&[0]);
  let report = OneShotTask::new(Draw::new().unwrap())
    .run_task(input, &model, &no_output())
    .unwrap();

  assert_eq!(report.source, "upload.png");
  assert_eq!(report.label_text, "awake");
  assert!(report.alerts.is_empty());
}

struct FakeBuilder {
  builds: Arc<AtomicUsize>,
}

impl BuildModel for FakeBuilder {
  type Model = FakeModel;
  type Error = FakeError;

  fn build(&self) -> Result<FakeModel, FakeError> {
    self.builds.fetch_add(1, Ordering::SeqCst);
    Ok(FakeModel::new(&[1]))
  }
}

#[test]
fn loader_shares_model_across_uploads() {
  let builds = Arc::new(AtomicUsize::new(0));
  let loader = ModelLoader::new(FakeBuilder {
    builds: builds.clone(),
  });

  for name in ["a.jpg", "b.jpg", "c.jpg"] {
    let model = loader.get_model().unwrap();
    let (_, upload) = upload(name);
    analyze(&*model, &Draw::new().unwrap(), &upload.unwrap()).unwrap();
  }

  let first = loader.get_model().unwrap();
  let second = loader.get_model().unwrap();
  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(builds.load(Ordering::SeqCst), 1);
  assert_eq!(first.calls.load(Ordering::SeqCst), 3);
}
