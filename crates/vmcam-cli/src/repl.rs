//! REPL – Read-Eval-Print Loop for the vmcam interactive shell.
//!
//! Supported slash-commands:
//!   /start              – bind the receiver and start driving the camera
//!   /stop               – stop the receiver and release the port
//!   /status             – session state, packet counters, camera transform
//!   /camera [name]      – show or change the target object
//!   /send x y z w qx qy qz – send one pose packet to the configured port
//!   /settings           – interactively edit `~/.vmcam/config.toml`
//!   /help               – show this list
//!   /quit | /exit       – stop everything and exit

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::warn;
use vmcam_hal::{LoopScheduler, SceneRegistry, SimScene, SimTarget};
use vmcam_middleware::PoseSender;
use vmcam_runtime::{Session, StartOutcome};
use vmcam_types::{POSE_COMPONENTS, PoseSample, VmcError};

use crate::config::{self, Config};

// ─────────────────────────────────────────────────────────────────────────────
// Command parsing
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Status,
    Camera(Option<String>),
    Send(PoseSample),
    Settings,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line.  `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let cmd = match head {
            "/start" => Command::Start,
            "/stop" => Command::Stop,
            "/status" => Command::Status,
            "/camera" => {
                let rest: Vec<&str> = words.collect();
                Command::Camera((!rest.is_empty()).then(|| rest.join(" ")))
            }
            "/send" => Command::Send(parse_pose(words)?),
            "/settings" => Command::Settings,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => return Err(format!("Unknown command: '{other}'")),
        };
        Ok(Some(cmd))
    }
}

fn parse_pose<'a>(words: impl Iterator<Item = &'a str>) -> Result<PoseSample, String> {
    let values = words
        .map(|w| w.parse::<f32>().map_err(|_| format!("'{w}' is not a number")))
        .collect::<Result<Vec<f32>, String>>()?;
    let components: [f32; POSE_COMPONENTS] = values.try_into().map_err(|v: Vec<f32>| {
        format!(
            "/send takes {POSE_COMPONENTS} numbers (x y z w qx qy qz), got {}",
            v.len()
        )
    })?;
    Ok(PoseSample::from_components(components))
}

// ─────────────────────────────────────────────────────────────────────────────
// Shell state
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the shell keeps between commands.
pub struct Shell {
    cfg: Config,
    scene: Arc<Mutex<SceneRegistry>>,
    session: Option<Session>,
    host: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl Shell {
    /// Build a shell whose simulated scene contains `cfg.camera_name`.
    pub fn new(cfg: Config, shutdown: Arc<AtomicBool>) -> Self {
        let scene = SimScene::new().with_camera(cfg.camera_name.clone()).build();
        Self {
            cfg,
            scene: Arc::new(Mutex::new(scene)),
            session: None,
            host: None,
            shutdown,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_running)
    }

    /// Start a session and a host thread that ticks it.
    pub fn start(&mut self) -> Result<StartOutcome, VmcError> {
        if self.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.join_host();
        if let Some(previous) = self.session.as_ref() {
            previous.wait_stopped();
        }

        let mut session = Session::new(self.cfg.to_session_config()?);
        let mut scheduler = LoopScheduler::new();
        let outcome = session.start(&mut scheduler, self.scene.clone())?;

        let shutdown = self.shutdown.clone();
        let host = thread::Builder::new()
            .name("vmcam-host".to_string())
            .spawn(move || scheduler.run(&shutdown))
            .map_err(|e| VmcError::Transport(format!("spawn host thread: {e}")))?;

        self.session = Some(session);
        self.host = Some(host);
        Ok(outcome)
    }

    /// Request a stop and wait until the socket is released.
    ///
    /// Returns `false` when nothing was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        if let Some(session) = self.session.as_ref() {
            session.request_stop();
        }
        self.join_host();
        if let Some(session) = self.session.as_ref() {
            session.wait_stopped();
        }
        was_running
    }

    fn join_host(&mut self) {
        if let Some(host) = self.host.take()
            && host.join().is_err()
        {
            warn!("host scheduler thread panicked");
        }
    }

    /// Change the target name for the running session and future ones.
    pub fn set_camera(&mut self, name: String) {
        if let Some(session) = self.session.as_mut() {
            session.set_camera_name(name.clone());
        }
        self.cfg.camera_name = name;
    }

    /// Address `/send` packets go to: the running session's port if there
    /// is one, otherwise the configured port.
    pub fn send_target(&self) -> Result<SocketAddr, VmcError> {
        let mut target = self.cfg.sender_target()?;
        if let Some(addr) = self.session.as_ref().and_then(Session::local_addr)
            && self.is_running()
        {
            target.set_port(addr.port());
        }
        Ok(target)
    }

    pub fn send(&self, sample: &PoseSample) -> Result<SocketAddr, VmcError> {
        let target = self.send_target()?;
        PoseSender::new(target)?.send(sample)?;
        Ok(target)
    }

    fn lock_scene(&self) -> std::sync::MutexGuard<'_, SceneRegistry> {
        self.scene.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(cfg: Config, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut shell = Shell::new(cfg, shutdown.clone());

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "vmcam>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = match Command::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                println!("{} Type {} for available commands.", e.red(), "/help".bold());
                continue;
            }
        };

        match cmd {
            Command::Start => cmd_start(&mut shell),
            Command::Stop => cmd_stop(&mut shell),
            Command::Status => cmd_status(&shell),
            Command::Camera(name) => cmd_camera(&mut shell, name),
            Command::Send(sample) => cmd_send(&shell, &sample),
            Command::Settings => cmd_settings(&mut shell),
            Command::Help => cmd_help(),
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        }
    }

    if shell.stop() {
        println!("{}", "  ✓ Receiver stopped.".green());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "vmcam Commands".bold().underline());
    println!("  {}                  – bind the receiver and drive the camera", "/start".bold().cyan());
    println!("  {}                   – stop the receiver and release the port", "/stop".bold().cyan());
    println!("  {}                 – session state and packet counters", "/status".bold().cyan());
    println!("  {}          – show or change the target object", "/camera [name]".bold().cyan());
    println!("  {} – send one pose packet", "/send x y z w qx qy qz".bold().cyan());
    println!("  {}               – edit ~/.vmcam/config.toml", "/settings".bold().cyan());
    println!("  {}            – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_start(shell: &mut Shell) {
    match shell.start() {
        Ok(StartOutcome::Started(addr)) => println!(
            "  {} Listening on {} → driving {}",
            "✓".green().bold(),
            addr.to_string().bold(),
            shell.cfg.camera_name.yellow()
        ),
        Ok(StartOutcome::AlreadyRunning) => {
            println!("  {}", "Receiver is already running.".yellow())
        }
        Err(e) => println!("  {} {}", "Failed to start:".red(), e),
    }
}

fn cmd_stop(shell: &mut Shell) {
    if shell.stop() {
        println!("  {} Receiver stopped; port released.", "✓".green().bold());
    } else {
        println!("  {}", "Receiver is not running.".dimmed());
    }
}

fn cmd_status(shell: &Shell) {
    println!("{}", "Status".bold().underline());
    let Some(session) = shell.session.as_ref() else {
        println!("  State    : {}", "idle (never started)".dimmed());
        println!("  Camera   : {}", shell.cfg.camera_name.yellow());
        return;
    };

    println!("  Session  : {}", session.id().to_string().dimmed());
    println!("  State    : {}", session.state().to_string().bold());
    if let Some(addr) = session.local_addr() {
        println!("  Address  : {}", addr);
    }
    println!("  Camera   : {}", shell.cfg.camera_name.yellow());
    if let Some(stats) = session.stats() {
        println!(
            "  Packets  : {} accepted, {} dropped",
            stats.packets_accepted.to_string().green(),
            stats.packets_dropped.to_string().yellow()
        );
        match stats.last_packet_at {
            Some(at) => println!("  Last     : {}", at.to_rfc3339()),
            None => println!("  Last     : {}", "no packets yet".dimmed()),
        }
    }
    let raw = session.latest_sample().to_components();
    println!("  Received : {:?}", raw);

    let scene = shell.lock_scene();
    match scene.get(&shell.cfg.camera_name) {
        Some(cam) => {
            let p = cam.position();
            let q = cam.orientation();
            println!("  Location : ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z);
            println!("  Rotation : ({:.3}, {:.3}, {:.3}, {:.3})", q.w, q.x, q.y, q.z);
        }
        None => println!("  {}", "Camera object not present in the scene.".yellow()),
    }
}

fn cmd_camera(shell: &mut Shell, name: Option<String>) {
    let Some(name) = name else {
        println!("  Target : {}", shell.cfg.camera_name.yellow());
        println!("  Scene  : {}", shell.lock_scene().names().join(", "));
        return;
    };

    {
        let mut scene = shell.lock_scene();
        if scene.get(&name).is_none() {
            scene.register_target(Box::new(SimTarget::new(name.clone())));
            println!("  Added {} to the scene.", name.bold());
        }
    }
    shell.set_camera(name.clone());
    println!("  {} Target set to {}", "✓".green().bold(), name.yellow());
}

fn cmd_send(shell: &Shell, sample: &PoseSample) {
    match shell.send(sample) {
        Ok(target) => println!("  {} Sent 28 bytes to {}", "✓".green().bold(), target),
        Err(e) => println!("  {} {}", "Send failed:".red(), e),
    }
}

fn cmd_settings(shell: &mut Shell) {
    let mut cfg = shell.cfg.clone();

    println!("{}", "Settings Editor".bold().underline());
    cfg.port = prompt_u16(&format!("  UDP port     [{}]: ", cfg.port), cfg.port);
    cfg.camera_name = prompt_str(&format!("  Camera name  [{}]: ", cfg.camera_name), &cfg.camera_name);
    cfg.bind_address = prompt_str(
        &format!("  Bind address [{}]: ", cfg.bind_address),
        &cfg.bind_address,
    );

    if let Err(e) = cfg.to_session_config() {
        println!("  {} {}", "Not saved:".red(), e);
        return;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "{} {}",
            "✓ Settings saved to".green(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    if shell.is_running() {
        println!("  {}", "Port and address changes apply on the next /start.".dimmed());
    }
    let camera = cfg.camera_name.clone();
    shell.cfg = cfg;
    if shell.lock_scene().get(&camera).is_none() {
        shell.lock_scene().register_target(Box::new(SimTarget::new(camera.clone())));
    }
    shell.set_camera(camera);
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Prompt for a u16 value.  Returns `default` when the user presses Enter.
fn prompt_u16(msg: &str, default: u16) -> u16 {
    let raw = prompt_str(msg, &default.to_string());
    match raw.parse::<u16>() {
        Ok(v) => v,
        Err(_) => {
            println!(
                "  {} '{}' is not a valid port number, keeping {}",
                "Warning:".yellow(),
                raw,
                default
            );
            default
        }
    }
}

/// Prompt for a string value.  Returns `default` when the user presses Enter.
pub(crate) fn prompt_str(msg: &str, default: &str) -> String {
    print!("{}", msg);
    io::stdout().flush().ok();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed
            }
        }
        Err(_) => default.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
