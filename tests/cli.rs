//! 命令行参数与启动失败路径

use assert_cmd::Command;
use predicates::prelude::*;

fn xingyan() -> Command {
  let mut cmd = Command::cargo_bin("xingyan").unwrap();
  for key in ["XINGYAN_MODEL", "XINGYAN_INPUT", "XINGYAN_OUTPUT", "XINGYAN_REPORT"] {
    cmd.env_remove(key);
  }
  cmd
}

#[test]
fn input_is_required() {
  xingyan()
    .assert()
    .failure()
    .stderr(predicate::str::contains("--input"));
}

#[test]
fn missing_model_fails_before_inference() {
  let dir = tempfile::tempdir().unwrap();
  let model = format!("yolov8://{}/absent.onnx", dir.path().display());
  let input = format!("image://{}/photo.jpg", dir.path().display());

  xingyan()
    .args(["--model", &model, "--input", &input])
    .assert()
    .failure()
    .stderr(predicate::str::contains("模型加载失败"));
}

#[test]
fn invalid_model_scheme_is_rejected() {
  xingyan()
    .args(["--model", "onnx:best.onnx", "--input", "image:photo.jpg"])
    .assert()
    .failure();
}
