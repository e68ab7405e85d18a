// tests/common/mod.rs
//! A scripted stand-in for the portal: fixture pages behind the `Browser`
//! trait, a mockito server for the media files and a log recorder.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};
use mockito::{Mock, Server, ServerGuard};
use once_cell::sync::Lazy;

use tadpole_spider::browser::{Browser, Element, Locator};
use tadpole_spider::config::SiteUrls;
use tadpole_spider::credentials::{CredentialProvider, LoginKind};
use tadpole_spider::error::{Result, SpiderError};
use tadpole_spider::extractor::{day_label_locator, entry_locator};
use tadpole_spider::navigator::{Navigator, Pacer};
use tadpole_spider::paginator::tile_locator;
use tadpole_spider::session::StoredCookie;
use tadpole_spider::tagger::MetadataTagger;

pub const ROOT: &str = "https://www.tadpoles.com/";
pub const HOME: &str = "https://www.tadpoles.com/parents";

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRpng-body";
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

pub fn site(origin: &str) -> SiteUrls {
    SiteUrls {
        root: ROOT.to_string(),
        home: HOME.to_string(),
        origin: origin.to_string(),
    }
}

pub fn navigator(browser: FakeBrowser, origin: &str) -> Navigator<FakeBrowser> {
    Navigator::new(browser, Pacer::disabled(), site(origin))
}

#[derive(Debug, Clone)]
pub enum OnClick {
    Nothing,
    SelectMonth(usize),
    OpenWindow(String),
    CloseWindow(String),
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub style: String,
    pub day_label: Option<String>,
}

impl Entry {
    pub fn media(url: &str, day_label: &str) -> Self {
        Self {
            style: format!(r#"background-image: url("{url}");"#),
            day_label: Some(day_label.to_string()),
        }
    }

    /// A tile with no image, like a note or a check-in.
    pub fn note() -> Self {
        Self {
            style: "background-color: #fff".to_string(),
            day_label: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Month {
    pub month: String,
    pub year: String,
    pub entries: Vec<Entry>,
}

impl Month {
    pub fn new(month: &str, year: &str, entries: Vec<Entry>) -> Self {
        Self {
            month: month.to_string(),
            year: year.to_string(),
            entries,
        }
    }
}

#[derive(Debug, Default)]
pub struct State {
    pub url: String,
    pub months: Vec<Month>,
    pub selected: Option<usize>,
    pub elements: HashMap<Locator, Vec<FakeElement>>,
    pub cookies: Vec<StoredCookie>,
    pub added_cookies: Vec<StoredCookie>,
    pub windows: Vec<String>,
    pub current_window: String,
    pub events: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FakeBrowser {
    pub state: Arc<Mutex<State>>,
}

impl FakeBrowser {
    pub fn new(months: Vec<Month>) -> Self {
        let state = State {
            url: "about:blank".to_string(),
            months,
            windows: vec!["main".to_string()],
            current_window: "main".to_string(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Put a static element on the page.
    pub fn add(&self, locator: Locator, id: &str) -> FakeElement {
        self.add_with(locator, id, HashMap::new(), OnClick::Nothing)
    }

    pub fn add_with(
        &self,
        locator: Locator,
        id: &str,
        attrs: HashMap<String, String>,
        on_click: OnClick,
    ) -> FakeElement {
        let element = FakeElement {
            state: Arc::clone(&self.state),
            id: id.to_string(),
            text: String::new(),
            attrs,
            children: HashMap::new(),
            on_click,
        };
        self.state
            .lock()
            .unwrap()
            .elements
            .entry(locator)
            .or_default()
            .push(element.clone());
        element
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().unwrap().url = url.to_string();
    }

    fn element(&self, id: String, text: &str, on_click: OnClick) -> FakeElement {
        FakeElement {
            state: Arc::clone(&self.state),
            id,
            text: text.to_string(),
            attrs: HashMap::new(),
            children: HashMap::new(),
            on_click,
        }
    }

    fn entry_elements(&self, month: usize) -> Vec<FakeElement> {
        let entries = self.state.lock().unwrap().months[month].entries.clone();
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut element = self.element(format!("entry:{month}:{i}"), "", OnClick::Nothing);
                element.attrs.insert("style".to_string(), entry.style);
                if let Some(label) = entry.day_label {
                    let span = self.element(format!("day:{month}:{i}"), &label, OnClick::Nothing);
                    element.children.insert(day_label_locator(), vec![span]);
                }
                element
            })
            .collect()
    }
}

impl Browser for FakeBrowser {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.events.push(format!("goto {url}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn find(&self, locator: &Locator) -> Result<FakeElement> {
        self.find_all(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SpiderError::ElementNotFound {
                locator: locator.clone(),
                reason: "not in fixture".to_string(),
            })
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<FakeElement>> {
        let (month_count, selected) = {
            let state = self.state.lock().unwrap();
            (state.months.len(), state.selected)
        };

        for position in 1..=month_count {
            let index = position - 1;
            if *locator == tile_locator(position, 1) {
                let label = self.state.lock().unwrap().months[index].month.clone();
                let id = format!("month:{index}");
                return Ok(vec![self.element(id, &label, OnClick::SelectMonth(index))]);
            }
            if *locator == tile_locator(position, 2) {
                let label = self.state.lock().unwrap().months[index].year.clone();
                let id = format!("year:{index}");
                return Ok(vec![self.element(id, &label, OnClick::Nothing)]);
            }
        }

        if *locator == entry_locator() {
            return Ok(selected.map(|m| self.entry_elements(m)).unwrap_or_default());
        }

        Ok(self
            .state
            .lock()
            .unwrap()
            .elements
            .get(locator)
            .cloned()
            .unwrap_or_default())
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn add_cookie(&self, cookie: &StoredCookie) -> Result<()> {
        self.state.lock().unwrap().added_cookies.push(cookie.clone());
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().windows.clone())
    }

    async fn current_window(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().current_window.clone())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.current_window = handle.to_string();
        state.events.push(format!("window {handle}"));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    state: Arc<Mutex<State>>,
    pub id: String,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub children: HashMap<Locator, Vec<FakeElement>>,
    pub on_click: OnClick,
}

impl Element for FakeElement {
    async fn click(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("click {}", self.id));
        match &self.on_click {
            OnClick::Nothing => {}
            OnClick::SelectMonth(index) => state.selected = Some(*index),
            OnClick::OpenWindow(handle) => state.windows.push(handle.clone()),
            OnClick::CloseWindow(handle) => state.windows.retain(|w| w != handle),
        }
        Ok(())
    }

    async fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(format!("keys {} {text}", self.id));
        Ok(())
    }

    async fn submit(&self) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(format!("submit {}", self.id));
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Self> {
        self.children
            .get(locator)
            .and_then(|found| found.first().cloned())
            .ok_or_else(|| SpiderError::ElementNotFound {
                locator: locator.clone(),
                reason: format!("not under {}", self.id),
            })
    }
}

pub struct ScriptedCredentials {
    pub kind: LoginKind,
    pub email: String,
    pub password: String,
    pub asked_for_kind: usize,
}

impl ScriptedCredentials {
    pub fn new(kind: LoginKind) -> Self {
        Self {
            kind,
            email: "parent@example.com".to_string(),
            password: "hunter2".to_string(),
            asked_for_kind: 0,
        }
    }
}

impl CredentialProvider for ScriptedCredentials {
    fn login_kind(&mut self) -> Result<LoginKind> {
        self.asked_for_kind += 1;
        Ok(self.kind)
    }

    fn email(&mut self) -> Result<String> {
        Ok(self.email.clone())
    }

    fn password(&mut self) -> Result<String> {
        Ok(self.password.clone())
    }
}

/// Remembers every tagging call.
#[derive(Debug, Clone, Default)]
pub struct RecordingTagger {
    pub calls: Arc<Mutex<Vec<(String, String, bool)>>>,
    pub fail: bool,
}

impl RecordingTagger {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl MetadataTagger for RecordingTagger {
    async fn tag(&self, file: &Path, datetime: &str, is_png: bool) -> Result<()> {
        self.calls.lock().unwrap().push((
            file.file_name().unwrap().to_string_lossy().into_owned(),
            datetime.to_string(),
            is_png,
        ));
        if self.fail {
            return Err(SpiderError::Tagging {
                file: file.to_path_buf(),
                reason: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Path of a media attachment as the portal serves it.
pub fn attachment(key: &str) -> String {
    format!("/remote/v1/obj_attachment?obj=9&key={key}")
}

pub async fn media_server() -> ServerGuard {
    Server::new_async().await
}

/// Serve `body` at `path` exactly `hits` times.
pub async fn serve(
    server: &mut ServerGuard,
    path: &str,
    status: usize,
    body: &[u8],
    hits: usize,
) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_header("content-type", "application/octet-stream")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

/// Every record logged by the library, for the whole test binary.
pub struct CapturedLogs {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CapturedLogs {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("tadpole_spider")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGS: Lazy<&'static CapturedLogs> = Lazy::new(|| {
    let logs: &'static CapturedLogs = Box::leak(Box::new(CapturedLogs {
        records: Mutex::new(Vec::new()),
    }));
    log::set_logger(logs).unwrap();
    log::set_max_level(LevelFilter::Debug);
    logs
});

/// Start capturing. Tests share the logger, so filter on something unique to the test.
pub fn capture_logs() -> &'static CapturedLogs {
    *LOGS
}

impl CapturedLogs {
    pub fn matching(&self, level: Level, needle: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, message)| *l == level && message.contains(needle))
            .map(|(_, message)| message.clone())
            .collect()
    }
}
