//! Stdio embedder
//!
//! A minimal terminal front end: output goes straight to stdout, input
//! is read line-at-a-time from stdin, and save files land next to the
//! story file.  Screen-splitting games want a smarter embedder, but
//! V3 games and the test suites run fine here.
extern crate log;

use std::env;
use std::fs::{self, File};
use std::io::{BufRead, Read, Write};
use std::panic;
use std::process::ExitCode;

use log::{debug, error, info};

use zvm::config::Config;
use zvm::error::{ErrorCode, RuntimeError};
use zvm::files;
use zvm::recoverable_error;
use zvm::zmachine::io::{Persistence, Screen, Sound};
use zvm::zmachine::{RunState, ZMachine};

struct StdioScreen {
    name: String,
    cursor: (u16, u16),
    transcript: Option<File>,
}

impl StdioScreen {
    fn new(name: &str) -> StdioScreen {
        StdioScreen {
            name: name.to_string(),
            cursor: (1, 1),
            transcript: None,
        }
    }

    fn write(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        let s: String = text
            .iter()
            .map(|c| if *c == 0x0d { '\n' } else { (*c as u8) as char })
            .collect();
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(s.as_bytes()).and_then(|_| stdout.flush()) {
            return recoverable_error!(ErrorCode::System, "{}", e);
        }
        Ok(())
    }
}

impl Screen for StdioScreen {
    fn rows(&self) -> u16 {
        24
    }

    fn columns(&self) -> u16 {
        80
    }

    fn print(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        self.write(text)
    }

    fn new_line(&mut self) -> Result<(), RuntimeError> {
        self.write(&[0x0d])
    }

    fn transcript(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        if self.transcript.is_none() {
            let filename = files::first_available(&self.name, "txt")?;
            match File::create(&filename) {
                Ok(f) => self.transcript = Some(f),
                Err(e) => {
                    error!("Error creating transcript file '{}': {}", filename, e);
                    return Ok(());
                }
            }
        }

        if let Some(f) = self.transcript.as_mut() {
            let t: Vec<u8> = text
                .iter()
                .map(|c| if *c as u8 == 0x0d { b'\n' } else { *c as u8 })
                .collect();
            if let Err(e) = f.write_all(&t) {
                error!("Error writing to transcript: {}", e)
            }
        }
        Ok(())
    }

    fn split_window(&mut self, lines: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::stream", "Ignoring window split to {} lines", lines);
        Ok(())
    }

    fn set_window(&mut self, window: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::stream", "Ignoring window selection {}", window);
        Ok(())
    }

    fn erase_window(&mut self, window: i16) -> Result<(), RuntimeError> {
        debug!(target: "app::stream", "Ignoring erase of window {}", window);
        Ok(())
    }

    fn erase_line(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn set_cursor(&mut self, row: u16, column: u16) -> Result<(), RuntimeError> {
        self.cursor = (row, column);
        Ok(())
    }

    fn cursor(&mut self) -> Result<(u16, u16), RuntimeError> {
        Ok(self.cursor)
    }

    fn set_text_style(&mut self, style: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::stream", "Ignoring text style {}", style);
        Ok(())
    }

    fn set_colour(&mut self, foreground: u16, background: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::stream", "Ignoring colours {}/{}", foreground, background);
        Ok(())
    }

    fn buffer_mode(&mut self, _mode: u16) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn set_font(&mut self, _font: u16) -> Result<u16, RuntimeError> {
        // Font 1 is the only font
        Ok(1)
    }

    fn status_line(&mut self, left: &[u16], right: &[u16]) -> Result<(), RuntimeError> {
        let l: String = left.iter().map(|c| (*c as u8) as char).collect();
        let r: String = right.iter().map(|c| (*c as u8) as char).collect();
        let pad = 80usize.saturating_sub(l.len() + r.len() + 2);
        let line = format!("[{}{}{}]\n", l, " ".repeat(pad), r);
        self.write(&line.chars().map(|c| c as u16).collect::<Vec<u16>>())
    }
}

struct StdioSound {}

impl Sound for StdioSound {
    fn play(
        &mut self,
        number: u16,
        effect: u16,
        _volume: u8,
        _repeats: u8,
    ) -> Result<(), RuntimeError> {
        debug!(target: "app::stream", "No sound device for effect {}/{}", number, effect);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn beep(&mut self) -> Result<(), RuntimeError> {
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(&[0x07]).and_then(|_| stdout.flush()) {
            return recoverable_error!(ErrorCode::System, "{}", e);
        }
        Ok(())
    }
}

struct FilePersistence {}

impl Persistence for FilePersistence {
    fn save(&mut self, name: &str, data: &[u8]) -> Result<(), RuntimeError> {
        let filename = files::first_available(name, "ifzs")?;
        info!(target: "app::state", "Saving to '{}'", filename);
        match fs::write(&filename, data) {
            Ok(_) => Ok(()),
            Err(e) => recoverable_error!(ErrorCode::Save, "Error writing '{}': {}", filename, e),
        }
    }

    fn restore(&mut self, name: &str) -> Result<Vec<u8>, RuntimeError> {
        let filename = files::last_existing(name, "ifzs")?;
        info!(target: "app::state", "Restoring from '{}'", filename);
        match fs::read(&filename) {
            Ok(data) => Ok(data),
            Err(e) => recoverable_error!(ErrorCode::Restore, "Error reading '{}': {}", filename, e),
        }
    }
}

fn read_line(
    length: usize,
    terminators: &[u16],
    preload: &[u16],
) -> Result<Vec<u16>, RuntimeError> {
    let mut line = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        return recoverable_error!(ErrorCode::System, "{}", e);
    }

    let mut input: Vec<u16> = preload.to_vec();
    for c in line.trim_end_matches(['\r', '\n']).chars() {
        if input.len() >= length {
            break;
        }
        // Printable ZSCII only
        if (0x20..0x7f).contains(&(c as u32)) {
            input.push(c as u16);
        }
    }

    // Stdin input is always terminated by return
    let terminator = if terminators.is_empty() { 0x0d } else { terminators[0] };
    input.push(terminator);
    Ok(input)
}

fn read_key() -> Result<u16, RuntimeError> {
    let mut line = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        return recoverable_error!(ErrorCode::System, "{}", e);
    }

    match line.chars().next() {
        Some(c) if !['\r', '\n'].contains(&c) => Ok(c as u16),
        _ => Ok(0x0d),
    }
}

fn run(zmachine: &mut ZMachine) -> Result<(), RuntimeError> {
    loop {
        match zmachine.run_state().clone() {
            RunState::Running => {
                log_mdc::insert(
                    "instruction_count",
                    format!("{:8x}", zmachine.instruction_count()),
                );
                zmachine.step()?;
            }
            RunState::AwaitingLine {
                length,
                terminators,
                preload,
                ..
            } => {
                let input = read_line(length, &terminators, &preload)?;
                zmachine.resume_with_input(&input)?;
            }
            RunState::AwaitingChar => {
                let key = read_key()?;
                zmachine.resume_with_char(key)?;
            }
            RunState::Stopped => return Ok(()),
        }
    }
}

fn initialize_config() -> Config {
    if let Some(filename) = files::config_file("config.yml") {
        match File::open(&filename) {
            Ok(f) => match Config::try_from(f) {
                Ok(config) => config,
                Err(e) => {
                    info!(target: "app::state", "Error parsing configuration from {}: {}", filename, e);
                    Config::default()
                }
            },
            Err(e) => {
                info!(target: "app::state", "Error reading configuration from {}: {}", filename, e);
                Config::default()
            }
        }
    } else {
        Config::default()
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: zvm <story-file>");
        return ExitCode::FAILURE;
    }

    let filename = &args[1];
    // full_name includes any path info; name is the bare story name
    let full_name = filename.split('.').collect::<Vec<&str>>()[0].to_string();
    let name = match full_name.split('/').last() {
        Some(n) => n.to_string(),
        None => full_name.clone(),
    };

    let config = initialize_config();
    if config.logging() {
        if let Some(filename) = files::config_file("log4rs.yml") {
            if log4rs::init_file(filename, Default::default()).is_ok() {
                log_mdc::insert("instruction_count", format!("{:8x}", 0));
            }

            info!(target: "app::instruction", "Start instruction log for '{}'", name);
            info!(target: "app::input", "Start input log for '{}'", name);
            info!(target: "app::memory", "Start memory log for '{}'", name);
            info!(target: "app::object", "Start object log for '{}'", name);
            info!(target: "app::state", "Start state log for '{}'", name);
            info!(target: "app::stream", "Start stream log for '{}'", name);
            info!(target: "app::text", "Start text log for '{}'", name);
            info!(target: "app::state", "Configuration: {:?}", config);
        }
    }

    let prev = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        debug!("{}", &info);
        prev(info);
    }));

    let mut zcode = Vec::new();
    match File::open(filename) {
        Ok(mut f) => {
            if let Err(e) = f.read_to_end(&mut zcode) {
                eprintln!("Error reading '{}': {}", filename, e);
                return ExitCode::FAILURE;
            }
        }
        Err(e) => {
            eprintln!("Error opening '{}': {}", filename, e);
            return ExitCode::FAILURE;
        }
    }

    let mut zmachine = match ZMachine::new(
        zcode,
        &config,
        &full_name,
        Box::new(StdioScreen::new(&full_name)),
        Box::new(StdioSound {}),
        Box::new(FilePersistence {}),
    ) {
        Ok(z) => z,
        Err(e) => {
            eprintln!("Error loading '{}': {}", filename, e);
            return ExitCode::FAILURE;
        }
    };

    match run(&mut zmachine) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("\n{}", e);
            ExitCode::FAILURE
        }
    }
}
