use std::{ffi::OsString, path::PathBuf, process, time::Duration};

use cvs_svn_export_store::Scratch;
use structopt::StructOpt;

mod checkout;
mod context;
mod delegates;
mod encoding;
mod fill;
mod pass;
mod passes;
mod symbolings;

use context::Context;
use encoding::Encoding;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "cvs-svn-export",
    about = "Convert a CVS repository (a tree of ,v files) into a Subversion dumpfile."
)]
struct Opt {
    #[structopt(parse(from_os_str), help = "path to the CVS repository root")]
    cvsroot: PathBuf,

    #[structopt(
        short = "o",
        long,
        parse(from_os_str),
        help = "write the dumpfile to this path instead of into the scratch directory"
    )]
    dumpfile: Option<PathBuf>,

    #[structopt(
        short = "s",
        long,
        parse(from_os_str),
        help = "load the dump stream into this Subversion repository via svnadmin load"
    )]
    svnrepos: Option<PathBuf>,

    #[structopt(
        long,
        default_value = "svnadmin",
        parse(from_os_str),
        help = "path to the svnadmin command"
    )]
    svnadmin: OsString,

    #[structopt(
        long,
        default_value = "cvs-svn-export-tmp",
        parse(from_os_str),
        help = "scratch directory for intermediate artifacts"
    )]
    tmpdir: PathBuf,

    #[structopt(
        long,
        default_value = "300s",
        parse(try_from_str = parse_duration::parse::parse),
        help = "maximum time between file commits before they'll be considered different changesets"
    )]
    commit_threshold: Duration,

    #[structopt(long, default_value = "1", help = "first pass to run (1-8)")]
    start_pass: usize,

    #[structopt(long, default_value = "8", help = "last pass to run (1-8)")]
    end_pass: usize,

    #[structopt(long, default_value = "trunk", help = "base path for trunk")]
    trunk: String,

    #[structopt(long, default_value = "branches", help = "base path for branches")]
    branches: String,

    #[structopt(long, default_value = "tags", help = "base path for tags")]
    tags: String,

    #[structopt(
        long,
        help = "encoding to try when decoding metadata, paths, and symbol names; may be given more than once"
    )]
    encoding: Vec<String>,

    #[structopt(
        long,
        default_value = "cvs2svn",
        help = "author recorded on synthesized commits"
    )]
    username: String,

    #[structopt(
        long,
        help = "record each file revision's CVS revision number as a cvs2svn:cvs-rev property"
    )]
    cvs_revnums: bool,

    #[structopt(long, help = "treat this symbol as a branch everywhere")]
    force_branch: Vec<String>,

    #[structopt(long, help = "treat this symbol as a tag everywhere")]
    force_tag: Vec<String>,

    #[structopt(long, help = "convert only the trunk, ignoring all branches and tags")]
    trunk_only: bool,

    #[structopt(long, help = "do not remove directories emptied by file deletions")]
    no_prune: bool,

    #[structopt(long, help = "keep intermediate artifacts after their last consumer")]
    keep: bool,

    #[structopt(
        short,
        long,
        parse(from_occurrences),
        help = "increase logging verbosity; at -vv every repository action is reported"
    )]
    verbose: u8,

    #[structopt(short, long, help = "only log warnings and errors")]
    quiet: bool,
}

fn main() {
    match run(Opt::from_args()) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("cvs-svn-export: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(opt: Opt) -> anyhow::Result<()> {
    let spec = if opt.quiet {
        "warn"
    } else {
        match opt.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let _logger = flexi_logger::Logger::try_with_str(spec)?.start()?;

    let encodings = if opt.encoding.is_empty() {
        vec![Encoding::Utf8]
    } else {
        opt.encoding
            .iter()
            .map(|name| Encoding::parse(name))
            .collect::<anyhow::Result<Vec<Encoding>>>()?
    };

    let scratch = Scratch::new(&opt.tmpdir)?;
    let _lock = scratch.lock()?;

    let ctx = Context {
        cvsroot: opt.cvsroot,
        scratch,
        layout: cvs_svn_export_model::Layout {
            trunk: opt.trunk,
            branches: opt.branches,
            tags: opt.tags,
        },
        threshold: opt.commit_threshold.as_secs() as i64,
        trunk_only: opt.trunk_only,
        prune: !opt.no_prune,
        username: opt.username,
        cvs_revnums: opt.cvs_revnums,
        encodings,
        force_branch: opt.force_branch,
        force_tag: opt.force_tag,
        dumpfile: opt.dumpfile,
        svn_target: opt.svnrepos,
        svnadmin: opt.svnadmin,
        report_actions: opt.verbose >= 2,
        keep_artifacts: opt.keep,
        sort_run_lines: 500_000,
    };

    pass::run(&ctx, opt.start_pass, opt.end_pass)
}
