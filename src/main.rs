use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn, LevelFilter};
use structopt::StructOpt;

use mboxrd::{Format, Maildir, Mbox, Template};

#[derive(Debug, StructOpt)]
#[structopt(name = "mboxrd", about = "Read messages out of mboxrd mailboxes")]
struct Opt {
    #[structopt(short = "v", long = "verbose", help = "Print some more information")]
    verbose: bool,
    #[structopt(short = "d", long = "debug", help = "Print debug information")]
    debug: bool,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Extract messages from a mbox file to a maildir
    #[structopt(name = "extract")]
    Extract {
        #[structopt(parse(from_os_str), help = "The mbox file")]
        path: PathBuf,
        #[structopt(
            short = "o",
            long = "output",
            default_value = ".",
            parse(from_os_str),
            help = "The directory to extract messages to"
        )]
        output: PathBuf,
        #[structopt(short = "f", long = "format", default_value = "mboxrd")]
        format: Format,
    },
    /// List messages in a mbox file
    #[structopt(name = "list")]
    List {
        #[structopt(parse(from_os_str), help = "The mbox file")]
        path: PathBuf,
        #[structopt(
            short = "t",
            long = "template",
            help = "The template used for each message line [default: {id} {date} {subject}]"
        )]
        template: Option<Template>,
        #[structopt(short = "f", long = "format", default_value = "mboxrd")]
        format: Format,
    },
    /// Count messages in a mbox file
    #[structopt(name = "count")]
    Count {
        #[structopt(parse(from_os_str), help = "The mbox file")]
        path: PathBuf,
        #[structopt(short = "f", long = "format", default_value = "mboxrd")]
        format: Format,
    },
}

fn main() {
    let opt = Opt::from_args();

    let level = if opt.debug {
        LevelFilter::Debug
    } else if opt.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .init();

    let res = match opt.cmd {
        Command::Extract {
            path,
            output,
            format,
        } => extract(&path, &output, format),
        Command::List {
            path,
            template,
            format,
        } => list(&path, &template.unwrap_or_default(), format),
        Command::Count { path, format } => count(&path, format, opt.verbose),
    };

    if let Err(e) = res {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn extract(path: &Path, output: &Path, format: Format) -> Result<(), Box<dyn Error>> {
    let mut mbox = Mbox::open(path, format)
        .map_err(|e| format!("cannot open mbox {}: {}", path.display(), e))?;
    let maildir = Maildir::create(output)
        .map_err(|e| format!("cannot create {}: {}", output.display(), e))?;

    let size = fs::metadata(path)?.len();
    let pb = ProgressBar::new(size);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40} {bytes}/{total_bytes} {msg}"));

    let mut count = 0;
    while let Some(msg) = mbox
        .read()
        .map_err(|e| format!("cannot read message: {}", e))?
    {
        let dest = maildir
            .deliver(&msg)
            .map_err(|e| format!("cannot write message {}: {}", msg.id(), e))?;
        debug!("extracted {} to {}", msg.id(), dest.display());
        count += 1;
        pb.set_position(mbox.position());
    }
    pb.finish_and_clear();
    mbox.close();

    info!("extracted {} messages to {}", count, output.display());
    Ok(())
}

fn list(path: &Path, template: &Template, format: Format) -> Result<(), Box<dyn Error>> {
    let mbox = Mbox::open(path, format)
        .map_err(|e| format!("cannot open mbox {}: {}", path.display(), e))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for msg in mbox {
        let msg = msg.map_err(|e| format!("cannot read message: {}", e))?;
        let headers = match mailparse::parse_headers(msg.data()) {
            Ok((headers, _)) => headers,
            Err(e) => {
                warn!("cannot parse message {}: {}", msg.id(), e);
                continue;
            }
        };
        writeln!(out, "{}", template.render(&msg, &headers))?;
    }
    Ok(())
}

fn count(path: &Path, format: Format, verbose: bool) -> Result<(), Box<dyn Error>> {
    let mbox = Mbox::open(path, format)?;

    let mut count = 0;
    let mut bytes = 0;
    for msg in mbox {
        let msg = msg?;
        if verbose {
            println!("{:?}", msg);
        }
        count += 1;
        bytes += msg.len();
    }
    println!("Found {} E-mails ({} bytes) in mbox file", count, bytes);
    Ok(())
}
