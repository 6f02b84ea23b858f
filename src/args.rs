use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Run,
    ListWindows,
    Screenshot,
}

#[derive(Debug, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub title: Option<String>,
    pub templates_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub debug_mode: bool,
    pub timeout_secs: Option<u64>,
}

impl Args {
    pub fn parse() -> Option<Self> {
        let args: Vec<String> = env::args().collect();
        Self::parse_from(args.iter().skip(1).map(String::as_str))
    }

    /// Parse flags (without the program name). `None` means the process
    /// should exit: help or version was printed, or a flag was rejected.
    pub fn parse_from<'a>(args: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut mode: Option<Mode> = None;
        let mut title: Option<String> = None;
        let mut templates_dir: Option<PathBuf> = None;
        let mut config_path: Option<PathBuf> = None;
        let mut debug_mode = false;
        let mut timeout_secs: Option<u64> = None;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("Maze Runner v{}", env!("CARGO_PKG_VERSION"));
                return None;
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--list-windows" {
                mode = Some(Mode::ListWindows);
            } else if arg == "--screenshot" || arg == "-s" {
                mode = Some(Mode::Screenshot);
            } else if let Some(val) = arg.strip_prefix("--title=") {
                title = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--templates=") {
                templates_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--config=") {
                config_path = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                match val.parse::<u64>() {
                    Ok(secs) => timeout_secs = Some(secs),
                    Err(_) => {
                        eprintln!("❌ Invalid timeout value: {}", val);
                        return None;
                    }
                }
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(Args {
            mode: mode.unwrap_or(Mode::Run),
            title,
            templates_dir,
            config_path,
            debug_mode,
            timeout_secs,
        })
    }
}

fn print_help() {
    println!("🤖 Maze Runner - maze auto-play bot");
    println!();
    println!("USAGE:");
    println!("    maze-runner [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)          Run the bot against the configured window");
    println!("    --title=<substr>    Window title substring to bind to");
    println!("    --templates=<dir>   Template image directory (default: ./templates)");
    println!("    --config=<file>     JSON config file (default: ~/.maze-runner/config.json)");
    println!("    --list-windows      Print visible window titles and exit");
    println!("    --screenshot, -s    Capture the bound window to maze-screenshot.png");
    println!("    --debug             Enable debug output for automation");
    println!("    --timeout=N         Auto-stop after N seconds");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    maze-runner --list-windows");
    println!("    maze-runner --title=\"Maze\" --templates=./templates --debug");
    println!("    maze-runner --title=\"Maze\" --screenshot");
}
