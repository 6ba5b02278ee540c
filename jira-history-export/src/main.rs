
extern crate jira_history_export_lib;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate ctrlc;
extern crate docopt;
extern crate env_logger;

use jira_history_export_lib::{
    prelude::*,
    error::*,
};

use std::{
    env,
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use docopt::Docopt;

/// Main function wrapper.
fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    if let Err(ref e) = run() {
        if let ErrorKind::Interrupted = *e.kind() {
            // orderly stop, durable state is already flushed
            return;
        }

        let stderr = &mut ::std::io::stderr();
        let errmsg = "Error writing to stderr";

        writeln!(stderr, "Error: {}", e).expect(errmsg);
        for e in e.iter().skip(1) {
            writeln!(stderr, "Caused by: {}", e).expect(errmsg);
        }

        ::std::process::exit(1);
    }
}

/// Main function meat.
fn run() -> Result<()> {
    let args = parse_args();

    let interrupt = InterruptFlag::new();
    {
        let flag = interrupt.clone();
        ctrlc::set_handler(move || flag.set())
            .chain_err(|| "could not install the interrupt handler")?;
    }

    let data_dir = PathBuf::from(&args.flag_data);
    let mut store = TicketStore::open(&data_dir, &args.arg_project)?;

    if args.cmd_collect {
        collect(&args, &mut store, &interrupt)?;
    }
    if args.cmd_convert {
        convert(&args, &store, &data_dir, &interrupt)?;
    }

    Ok(())
}

fn collect(
    args: &Args,
    store: &mut TicketStore,
    interrupt: &InterruptFlag,
) -> Result<()> {
    let url = args.flag_url.clone()
        .or_else(|| env::var("JIRA_URL").ok())
        .ok_or("missing tracker url: pass --url or set JIRA_URL")?;
    let login = args.flag_user.clone()
        .or_else(|| env::var("JIRA_USER").ok());
    let skip_dates = match args.flag_skip_dates {
        Some(ref raw) => SkipDates::parse(raw)?,
        None => SkipDates::none(),
    };
    let (min_key, max_key) = match (args.arg_min_key, args.arg_max_key) {
        (Some(min), Some(max)) => (min, max),
        _ => return Err("missing key range".into()),
    };

    let jira = Jira::new(&url)?;
    let credentials = PromptCredentials::new(login);
    let policy = RetryPolicy::fixed(Duration::from_secs(args.flag_delay));
    let client = TrackerClient::new(jira, credentials, policy, interrupt.clone());
    let mut collector = Collector::new(client, skip_dates, interrupt.clone());

    collector.collect(store, &args.arg_project, min_key..max_key)
}

fn convert(
    args: &Args,
    store: &TicketStore,
    data_dir: &Path,
    interrupt: &InterruptFlag,
) -> Result<()> {
    let mut names = NamesFile::load(&data_dir.join("names.txt"));
    let mut converter = HistoryConverter::new(store, interrupt.clone());

    if args.flag_out == "-" {
        let stdout = io::stdout();
        let mut sink = WriteSink::new(stdout.lock());
        converter.convert(&mut names, &mut sink)
    } else {
        let file = File::create(&args.flag_out)?;
        let mut sink = WriteSink::new(file);
        converter.convert(&mut names, &mut sink)
    }
}

/// CLI usage string.
const USAGE: &'static str = r#"
Convert an issue tracker's change history into a repository event log.

Usage:
  jira-history-export collect [options] <project> <min-key> <max-key>
  jira-history-export convert [options] <project>
  jira-history-export (-h | --help)
  jira-history-export --version

collect downloads issue records over the key range [min-key, max-key)
into the local data directory. convert merges every cached changelog
into one timestamp-ordered event log.

Environment variables:
  JIRA_URL          Base URL of the tracker, e.g. https://jira.example.com.
  JIRA_USER         Login for tracker authentication.

Options:
  -h --help               Show this screen.
  --version               Show version.
  --url=<url>             Tracker base URL, overrides JIRA_URL.
  --user=<login>          Tracker login, overrides JIRA_USER; the
                          password is always prompted.
  --data=<directory>      Data directory for downloaded tickets
                          [default: ./json_dump].
  --out=<file>            Event log destination, - for stdout
                          [default: -].
  --skip-dates=<dates>    Comma-separated calendar dates (2006-12-18)
                          whose changelog entries are excluded.
  --delay=<seconds>       Wait between retries of a request that
                          failed with a connection error [default: 5].
"#;

/// CLI arguments.
#[derive(Debug, Deserialize)]
struct Args {
    cmd_collect: bool,
    cmd_convert: bool,
    arg_project: String,
    arg_min_key: Option<u32>,
    arg_max_key: Option<u32>,
    flag_version: bool,
    flag_url: Option<String>,
    flag_user: Option<String>,
    flag_data: String,
    flag_out: String,
    flag_skip_dates: Option<String>,
    flag_delay: u64,
}

/// Parse CLI arguments.
fn parse_args() -> Args {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if args.flag_version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    args
}
