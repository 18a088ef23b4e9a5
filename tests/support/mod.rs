//! Scripted in-memory automation surface shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use femoral_review::config::{Config, TimingConfig};
use femoral_review::error::Result;
use femoral_review::surface::{Application, AutomationSurface, RegistryScript, Script, ViewerScript};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Registry-side data for one record
#[derive(Debug, Clone, Default)]
pub struct FakeRecord {
    pub mrn: Option<String>,
    pub procedure_date: Option<String>,
    pub site_1: String,
    pub site_2: String,
    /// Extra inputs rendered into the classification form (e.g. measurements)
    pub form_inputs: Vec<(String, String)>,
}

impl FakeRecord {
    pub fn eligible(site: &str) -> Self {
        Self {
            mrn: Some("123456789".into()),
            procedure_date: Some("01-15-2024".into()),
            site_1: site.into(),
            ..Default::default()
        }
    }

    pub fn with_sites(site_1: &str, site_2: &str) -> Self {
        Self {
            site_2: site_2.into(),
            ..Self::eligible(site_1)
        }
    }

    pub fn with_form_input(mut self, name: &str, value: &str) -> Self {
        self.form_inputs.push((name.into(), value.into()));
        self
    }
}

pub fn study_row(description: &str, images: u32, accession: &str, expanded: bool) -> serde_json::Value {
    json!({
        "description": description,
        "modality": "XA",
        "images": images,
        "accession": accession,
        "expanded": expanded,
    })
}

pub struct FakeSurface {
    pub dashboard: Vec<String>,
    pub records: HashMap<String, FakeRecord>,
    pub rows: Mutex<Vec<serde_json::Value>>,
    pub post_status: u16,
    /// Script names in call order
    pub calls: Mutex<Vec<String>>,
    /// Form bodies posted to the registry
    pub posts: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<(i32, i32)>>,
    /// Files the fake "download" drops into this directory
    pub download_dir: Option<std::path::PathBuf>,
    /// Delay applied to every registry page fetch
    pub get_delay: Duration,
    /// Demographics page requests per record id
    pub demographics: Mutex<HashMap<String, usize>>,
    /// Answer to every search field write
    pub search_answer: String,
    /// Expanding answers success but leaves every row collapsed
    pub expand_keeps_collapsed: bool,
    pub list_visible: bool,
}

impl FakeSurface {
    pub fn new(dashboard: &[&str], records: Vec<(&str, FakeRecord)>) -> Self {
        Self {
            dashboard: dashboard.iter().map(|s| s.to_string()).collect(),
            records: records
                .into_iter()
                .map(|(id, r)| (id.to_string(), r))
                .collect(),
            rows: Mutex::new(vec![study_row("NR FL ANGIO RIGHT", 23, "ACC0001", true)]),
            post_status: 302,
            calls: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            download_dir: None,
            get_delay: Duration::ZERO,
            demographics: Mutex::new(HashMap::new()),
            search_answer: "ok".into(),
            expand_keeps_collapsed: false,
            list_visible: true,
        }
    }

    pub fn with_rows(self, rows: Vec<serde_json::Value>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }

    pub fn with_download_dir(mut self, dir: &Path) -> Self {
        self.download_dir = Some(dir.to_path_buf());
        self
    }

    pub fn called(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }

    pub fn demographics_fetches(&self) -> HashMap<String, usize> {
        self.demographics.lock().unwrap().clone()
    }

    fn count_fetch(&self, path: &str) {
        if Self::query_param(path, "page") == Some("demographics") {
            let id = Self::query_param(path, "id").unwrap_or_default();
            *self.demographics.lock().unwrap().entry(id.to_string()).or_default() += 1;
        }
    }

    fn query_param<'a>(path: &'a str, key: &str) -> Option<&'a str> {
        let query = path.split_once('?')?.1;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    fn page(&self, path: &str) -> serde_json::Value {
        let id = Self::query_param(path, "id").unwrap_or_default();
        let page = Self::query_param(path, "page").unwrap_or_default();
        let Some(record) = self.records.get(id) else {
            return json!({"status": 404, "body": ""});
        };

        let input = |name: &str, value: &str| format!(r#"<input type="text" name="{}" value="{}">"#, name, value);
        let body = match page {
            "demographics" => record
                .mrn
                .as_deref()
                .map(|m| input("mrn", m))
                .unwrap_or_default(),
            "procedure" => {
                let mut html = String::new();
                if let Some(date) = &record.procedure_date {
                    html.push_str(&input("procedure_date", date));
                }
                html.push_str(&input("access_site_1", &record.site_1));
                html.push_str(&input("access_site_2", &record.site_2));
                html
            }
            "femoral_access_imaging" => {
                let mut html = String::from(
                    r#"<form><input type="hidden" name="redcap_csrf_token" value="tok-1">
<input type="hidden" name="record_id" value="RID">
<input type="hidden" name="access_angio_saved" value="0">"#,
                )
                .replace("RID", id);
                for (name, value) in &record.form_inputs {
                    html.push_str(&input(name, value));
                }
                html.push_str("</form>");
                html
            }
            _ => return json!({"status": 404, "body": ""}),
        };
        json!({"status": 200, "body": body})
    }

    fn registry(&self, script: RegistryScript) -> String {
        match script {
            RegistryScript::Navigate { .. } => "ok".into(),
            RegistryScript::HttpGet { path } => self.page(&path).to_string(),
            RegistryScript::HttpPost { body, .. } => {
                self.posts.lock().unwrap().push(body);
                json!({"status": self.post_status}).to_string()
            }
            RegistryScript::DashboardRecords => json!(self.dashboard).to_string(),
        }
    }

    fn viewer(&self, script: ViewerScript) -> String {
        match script {
            ViewerScript::SetSearchField { .. } => self.search_answer.clone(),
            ViewerScript::CountStudyRows => self.rows.lock().unwrap().len().to_string(),
            ViewerScript::ReadStudyRows => {
                let rows = self.rows.lock().unwrap().clone();
                json!({ "rows": rows }).to_string()
            }
            ViewerScript::ExpandFirstRow => {
                let mut rows = self.rows.lock().unwrap();
                if rows.is_empty() {
                    return json!({"error": "no expand toggle found"}).to_string();
                }
                if self.expand_keeps_collapsed {
                    return json!({"status": "expanded"}).to_string();
                }
                for row in rows.iter_mut() {
                    row["expanded"] = json!(true);
                }
                json!({"status": "expanded"}).to_string()
            }
            ViewerScript::LocateRow { index } => {
                let vy = 50.0 + 20.0 * index as f64;
                json!({
                "vx": 100.0, "vy": vy,
                "screen_x": 0.0, "screen_y": 0.0,
                "outer_width": 1200.0, "outer_height": 900.0,
                "inner_width": 1200.0, "inner_height": 800.0,
                })
                .to_string()
            }
            ViewerScript::ClickDownload => {
                if let Some(dir) = &self.download_dir {
                    let _ = std::fs::write(dir.join("Nil_downloaded_image_1"), b"dicom");
                }
                json!({"status": "clicked"}).to_string()
            }
            ViewerScript::OpenExportMenu | ViewerScript::ReturnToList => {
                json!({"status": "ok"}).to_string()
            }
            ViewerScript::ListVisibility => {
                json!({
                    "treelist_visible": self.list_visible,
                    "filter_row_visible": self.list_visible,
                })
                .to_string()
            }
        }
    }
}

#[async_trait]
impl AutomationSurface for FakeSurface {
    async fn execute(&self, script: Script, _timeout: Duration) -> Result<String> {
        self.calls.lock().unwrap().push(script.name().to_string());
        if let Script::Registry(RegistryScript::HttpGet { path }) = &script {
            self.count_fetch(path);
            if !self.get_delay.is_zero() {
                tokio::time::sleep(self.get_delay).await;
            }
        }
        Ok(match script {
            Script::Registry(s) => self.registry(s),
            Script::Viewer(s) => self.viewer(s),
        })
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<()> {
        self.clicks.lock().unwrap().push((x, y));
        Ok(())
    }

    async fn bring_to_front(&self, _app: Application) -> Result<()> {
        Ok(())
    }
}

/// Default config with zero delays and downloads in `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.timing = TimingConfig::immediate();
    config.downloads.directory = dir.to_path_buf();
    config
}
