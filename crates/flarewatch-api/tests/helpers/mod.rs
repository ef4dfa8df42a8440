//! Test helpers: build the router around a temporary data/output directory
//! and a shell script standing in for the analysis program.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use flarewatch_api::setup::{build_state, routes};
use flarewatch_core::Config;
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;

pub const SCENARIO_OUTPUT: &str = r#"{"detected_flares":[["C"],[0.1],[0.15],[1.2],[0.5],[0.05],[0.01],[0.9],[0.02]],"lc_data":[]}"#;

pub const SCENARIO_CSV: &str = "flare_type,start,precise_start,start_rate,peak,peak_rate,background_level,decay,decay_rate\n\
C,0.10000000,0.15000000,1.20000000,0.50000000,0.05000000,0.01000000,0.90000000,0.02000000\n";

pub const CSV_HEADER_LINE: &str =
    "flare_type,start,precise_start,start_rate,peak,peak_rate,background_level,decay,decay_rate\n";

pub struct TestApp {
    pub server: TestServer,
    pub temp_dir: TempDir,
}

impl TestApp {
    /// Analysis program that prints `stdout` after reading its input
    pub fn with_output(stdout: &str) -> Self {
        Self::build(|dir| {
            let json = dir.join("analysis-output.json");
            std::fs::write(&json, stdout).expect("Failed to write canned output");
            format!("read -r path\ncat '{}'\n", json.display())
        }, &[])
    }

    /// Analysis program running an arbitrary shell script
    pub fn with_script(script: &str) -> Self {
        Self::with_script_and_env(script, &[])
    }

    pub fn with_script_and_env(script: &str, env: &[(&str, &str)]) -> Self {
        let script = script.to_string();
        Self::build(move |_| script, env)
    }

    fn build(script: impl FnOnce(&std::path::Path) -> String, env: &[(&str, &str)]) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let script_path = temp_dir.path().join("analysis.sh");
        std::fs::write(&script_path, script(temp_dir.path())).expect("Failed to write script");

        let mut vars: HashMap<String, String> = HashMap::from([
            ("ANALYSIS_PROGRAM".to_string(), "/bin/sh".to_string()),
            (
                "ANALYSIS_ARGS".to_string(),
                script_path.display().to_string(),
            ),
            (
                "DATA_DIR".to_string(),
                temp_dir.path().join("data").display().to_string(),
            ),
            (
                "OUTPUT_DIR".to_string(),
                temp_dir.path().join("output").display().to_string(),
            ),
            ("ANALYSIS_TIMEOUT_SECS".to_string(), "30".to_string()),
        ]);
        for (key, value) in env {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_source(|key| vars.get(key).cloned())
            .expect("Failed to build test config");
        let state = build_state(&config);
        let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
        let server = TestServer::new(app).expect("Failed to create test server");

        TestApp { server, temp_dir }
    }

    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("output")
    }

    pub fn latest_csv(&self) -> Option<String> {
        std::fs::read_to_string(self.output_dir().join("result.csv")).ok()
    }

    pub async fn upload(&self, filename: &str, data: &[u8]) -> TestResponse {
        let part = Part::bytes(bytes::Bytes::copy_from_slice(data))
            .file_name(filename.to_string())
            .mime_type("application/octet-stream");
        self.server
            .post("/upload")
            .multipart(MultipartForm::new().add_part("file", part))
            .await
    }
}

pub fn header(response: &TestResponse, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
