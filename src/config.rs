// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::credentials::LoginKind;

pub const ROOT_URL: &str = "http://www.tadpoles.com/";
pub const HOME_URL: &str = "https://www.tadpoles.com/parents";
pub const ORIGIN: &str = "https://www.tadpoles.com";

/// Where the portal lives. Tests point these at a local server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    /// Landing page, used to pick up the cookie domain before login.
    pub root: String,
    /// The dashboard that carries the month tiles.
    pub home: String,
    /// Prefix for relative media urls.
    pub origin: String,
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self {
            root: ROOT_URL.to_string(),
            home: HOME_URL.to_string(),
            origin: ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "tadpole-spider",
    version,
    about = "Download every photo and video from your tadpoles.com feed"
)]
pub struct Args {
    /// WebDriver endpoint (geckodriver).
    #[arg(long, default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Spawn this geckodriver binary instead of connecting to a running one.
    #[arg(long)]
    pub geckodriver: Option<PathBuf>,

    /// Run Firefox headless. Also enabled by HEADLESS=true.
    #[arg(long)]
    pub headless: bool,

    /// Run Firefox on an Xvfb virtual display. Needs --geckodriver.
    #[arg(long, requires = "geckodriver")]
    pub xvfb: bool,

    /// X display number used with --xvfb.
    #[arg(long, default_value_t = 99)]
    pub display: u32,

    #[arg(long, default_value = "state/cookies.json")]
    pub cookie_file: PathBuf,

    /// Root of the downloaded image tree.
    #[arg(long, default_value = "img")]
    pub image_dir: PathBuf,

    /// JSON file with "username" and "password" (and optionally "login").
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Skip the login type prompt.
    #[arg(long, value_parser = parse_login_kind)]
    pub login: Option<LoginKind>,

    /// Lower bound of the random pause between actions, in seconds.
    #[arg(long, default_value_t = 1.0)]
    pub min_sleep: f64,

    /// Upper bound of the random pause between actions, in seconds.
    #[arg(long, default_value_t = 3.0)]
    pub max_sleep: f64,

    #[arg(long, default_value = "exiftool")]
    pub exiftool: PathBuf,

    /// Do not stamp capture dates on downloaded files.
    #[arg(long)]
    pub no_tag: bool,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_login_kind(value: &str) -> Result<LoginKind, String> {
    LoginKind::from_choice(value)
        .ok_or_else(|| format!("unknown login type {value:?}, expected google or email"))
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub webdriver_url: String,
    pub geckodriver: Option<PathBuf>,
    pub headless: bool,
    pub xvfb_display: Option<u32>,
    pub cookie_file: PathBuf,
    pub image_dir: PathBuf,
    pub credentials: Option<PathBuf>,
    pub login: Option<LoginKind>,
    pub min_sleep: Duration,
    pub max_sleep: Duration,
    pub exiftool: Option<PathBuf>,
    /// Ceiling for every element lookup.
    pub implicit_wait: Duration,
    pub site: SiteUrls,
}

impl Settings {
    /// Merge parsed arguments with the HEADLESS environment switch.
    pub fn from_args(args: Args) -> Self {
        let headless_env = std::env::var("HEADLESS")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        Self {
            webdriver_url: args.webdriver_url,
            geckodriver: args.geckodriver,
            headless: args.headless || headless_env,
            xvfb_display: args.xvfb.then_some(args.display),
            cookie_file: args.cookie_file,
            image_dir: args.image_dir,
            credentials: args.credentials,
            login: args.login,
            min_sleep: seconds(args.min_sleep),
            max_sleep: seconds(args.max_sleep),
            exiftool: (!args.no_tag).then_some(args.exiftool),
            implicit_wait: Duration::from_secs(10),
            site: SiteUrls::default(),
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
