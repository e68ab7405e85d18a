// src/credentials.rs
//! Where the login type, email and password come from.
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::info;
use serde::Deserialize;

use crate::error::{Result, SpiderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginKind {
    Google,
    Email,
}

impl LoginKind {
    pub fn from_choice(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "g" | "google" => Some(LoginKind::Google),
            "e" | "email" => Some(LoginKind::Email),
            _ => None,
        }
    }
}

pub trait CredentialProvider {
    fn login_kind(&mut self) -> Result<LoginKind>;
    fn email(&mut self) -> Result<String>;
    fn password(&mut self) -> Result<String>;
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for Box<P> {
    fn login_kind(&mut self) -> Result<LoginKind> {
        (**self).login_kind()
    }

    fn email(&mut self) -> Result<String> {
        (**self).email()
    }

    fn password(&mut self) -> Result<String> {
        (**self).password()
    }
}

/// Ask on the controlling terminal.
#[derive(Debug, Default)]
pub struct ConsolePrompt {
    preset: Option<LoginKind>,
}

impl ConsolePrompt {
    pub fn new(preset: Option<LoginKind>) -> Self {
        Self { preset }
    }
}

impl CredentialProvider for ConsolePrompt {
    fn login_kind(&mut self) -> Result<LoginKind> {
        if let Some(kind) = self.preset {
            return Ok(kind);
        }
        let stdin = io::stdin();
        Ok(prompt_login_kind(&mut stdin.lock(), &mut io::stdout())?)
    }

    fn email(&mut self) -> Result<String> {
        let stdin = io::stdin();
        Ok(read_line(&mut stdin.lock(), &mut io::stdout(), "Enter email: ")?)
    }

    fn password(&mut self) -> Result<String> {
        Ok(read_hidden("Enter password: ")?)
    }
}

/// Keep asking until the answer names a login type.
pub fn prompt_login_kind<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<LoginKind> {
    loop {
        let answer = read_line(input, output, "Login Type - [G]oogle or [E]mail/password: ")?;
        match LoginKind::from_choice(&answer) {
            Some(kind) => return Ok(kind),
            None => info!("-- Invalid choice entered - please choose 'G' or 'E'"),
        }
    }
}

fn read_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<String> {
    write!(output, "{prompt}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim().to_string())
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read a line without echoing it.
fn read_hidden(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut secret = String::new();
    {
        let _raw = RawMode::enable()?;
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => break,
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "password entry cancelled"));
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
    writeln!(stdout)?;
    Ok(secret)
}

#[derive(Deserialize)]
struct CredentialsJson {
    #[serde(default)]
    login: Option<LoginKind>,
    username: String,
    password: String,
}

/// Credentials read from a JSON file instead of the terminal.
#[derive(Clone)]
pub struct CredentialsFile {
    login: LoginKind,
    username: String,
    password: String,
}

impl CredentialsFile {
    /// `preset` wins over the file's `login` field; email login is the fallback.
    pub fn load(path: &Path, preset: Option<LoginKind>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SpiderError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        let creds: CredentialsJson = serde_json::from_str(&content).map_err(|e| {
            SpiderError::Credentials(format!(
                "{} is not valid JSON with fields 'username' and 'password': {e}",
                path.display()
            ))
        })?;
        Ok(Self {
            login: preset.or(creds.login).unwrap_or(LoginKind::Email),
            username: creds.username,
            password: creds.password,
        })
    }
}

impl CredentialProvider for CredentialsFile {
    fn login_kind(&mut self) -> Result<LoginKind> {
        Ok(self.login)
    }

    fn email(&mut self) -> Result<String> {
        Ok(self.username.clone())
    }

    fn password(&mut self) -> Result<String> {
        Ok(self.password.clone())
    }
}
