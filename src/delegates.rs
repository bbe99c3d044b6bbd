//! The mirror delegates: everything that consumes the emission stream.

use std::{
    fs::File,
    io::{BufWriter, Write},
    process::ChildStdin,
};

use svn_dump::{svn_date, CopyFrom, DumpWriter, PropList};
use svn_mirror::{Error, FileContent, MirrorDelegate, PathKind, RevProps};

/// The delegate kinds a run can attach: a dumpfile on disk, a pipe into
/// `svnadmin load`, and a human-readable action report on stdout.
pub enum Delegate {
    Dumpfile(DumpfileDelegate<BufWriter<File>>),
    Load(DumpfileDelegate<ChildStdin>),
    Stdout(StdoutDelegate),
}

impl MirrorDelegate for Delegate {
    fn start_commit(&mut self, revnum: u32, props: &RevProps) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.start_commit(revnum, props),
            Delegate::Load(d) => d.start_commit(revnum, props),
            Delegate::Stdout(d) => d.start_commit(revnum, props),
        }
    }

    fn end_commit(&mut self, revnum: u32) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.end_commit(revnum),
            Delegate::Load(d) => d.end_commit(revnum),
            Delegate::Stdout(d) => d.end_commit(revnum),
        }
    }

    fn initialize_project(&mut self, dirs: &[String]) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.initialize_project(dirs),
            Delegate::Load(d) => d.initialize_project(dirs),
            Delegate::Stdout(d) => d.initialize_project(dirs),
        }
    }

    fn initialize_lod(&mut self, path: &str) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.initialize_lod(path),
            Delegate::Load(d) => d.initialize_lod(path),
            Delegate::Stdout(d) => d.initialize_lod(path),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.mkdir(path),
            Delegate::Load(d) => d.mkdir(path),
            Delegate::Stdout(d) => d.mkdir(path),
        }
    }

    fn add_path(&mut self, content: &FileContent) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.add_path(content),
            Delegate::Load(d) => d.add_path(content),
            Delegate::Stdout(d) => d.add_path(content),
        }
    }

    fn change_path(&mut self, content: &FileContent) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.change_path(content),
            Delegate::Load(d) => d.change_path(content),
            Delegate::Stdout(d) => d.change_path(content),
        }
    }

    fn delete_lod(&mut self, path: &str) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.delete_lod(path),
            Delegate::Load(d) => d.delete_lod(path),
            Delegate::Stdout(d) => d.delete_lod(path),
        }
    }

    fn delete_path(&mut self, path: &str) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.delete_path(path),
            Delegate::Load(d) => d.delete_path(path),
            Delegate::Stdout(d) => d.delete_path(path),
        }
    }

    fn copy_lod(&mut self, src: &str, dest: &str, src_revnum: u32) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.copy_lod(src, dest, src_revnum),
            Delegate::Load(d) => d.copy_lod(src, dest, src_revnum),
            Delegate::Stdout(d) => d.copy_lod(src, dest, src_revnum),
        }
    }

    fn copy_path(
        &mut self,
        src: &str,
        dest: &str,
        src_revnum: u32,
        kind: PathKind,
    ) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.copy_path(src, dest, src_revnum, kind),
            Delegate::Load(d) => d.copy_path(src, dest, src_revnum, kind),
            Delegate::Stdout(d) => d.copy_path(src, dest, src_revnum, kind),
        }
    }

    fn finish(&mut self) -> Result<(), Error> {
        match self {
            Delegate::Dumpfile(d) => d.finish(),
            Delegate::Load(d) => d.finish(),
            Delegate::Stdout(d) => d.finish(),
        }
    }
}

/// Writes the dumpfile stream. The same delegate serves both the on-disk
/// dumpfile and the `svnadmin load` pipe; only the writer differs.
pub struct DumpfileDelegate<W>
where
    W: Write,
{
    writer: DumpWriter<W>,
}

impl<W> DumpfileDelegate<W>
where
    W: Write,
{
    pub fn new(out: W) -> Result<Self, Error> {
        Ok(Self {
            writer: DumpWriter::new(out).map_err(Error::delegate)?,
        })
    }

    fn file_props(content: &FileContent) -> Option<PropList> {
        let mut props = PropList::new();
        if content.executable {
            props.push("svn:executable", "*");
        }
        if let Some(revnum) = &content.cvs_revnum {
            props.push("cvs2svn:cvs-rev", revnum.as_str());
        }

        if props.is_empty() {
            None
        } else {
            Some(props)
        }
    }
}

impl<W> MirrorDelegate for DumpfileDelegate<W>
where
    W: Write,
{
    fn start_commit(&mut self, revnum: u32, props: &RevProps) -> Result<(), Error> {
        let mut revprops = PropList::new();
        revprops.push("svn:author", props.author.clone());
        revprops.push("svn:log", props.log.clone());
        revprops.push("svn:date", svn_date(props.date));

        self.writer
            .start_revision(revnum, &revprops)
            .map_err(Error::delegate)
    }

    fn end_commit(&mut self, _revnum: u32) -> Result<(), Error> {
        Ok(())
    }

    fn initialize_project(&mut self, dirs: &[String]) -> Result<(), Error> {
        for dir in dirs.iter() {
            self.writer.add_directory(dir, None).map_err(Error::delegate)?;
        }

        Ok(())
    }

    fn initialize_lod(&mut self, path: &str) -> Result<(), Error> {
        self.writer.add_directory(path, None).map_err(Error::delegate)
    }

    fn mkdir(&mut self, path: &str) -> Result<(), Error> {
        self.writer.add_directory(path, None).map_err(Error::delegate)
    }

    fn add_path(&mut self, content: &FileContent) -> Result<(), Error> {
        self.writer
            .add_file(content.path, Self::file_props(content).as_ref(), content.text)
            .map_err(Error::delegate)
    }

    fn change_path(&mut self, content: &FileContent) -> Result<(), Error> {
        self.writer
            .change_file(content.path, Self::file_props(content).as_ref(), content.text)
            .map_err(Error::delegate)
    }

    fn delete_lod(&mut self, path: &str) -> Result<(), Error> {
        self.writer.delete_path(path).map_err(Error::delegate)
    }

    fn delete_path(&mut self, path: &str) -> Result<(), Error> {
        self.writer.delete_path(path).map_err(Error::delegate)
    }

    fn copy_lod(&mut self, src: &str, dest: &str, src_revnum: u32) -> Result<(), Error> {
        self.writer
            .add_directory(
                dest,
                Some(CopyFrom {
                    revnum: src_revnum,
                    path: src,
                }),
            )
            .map_err(Error::delegate)
    }

    fn copy_path(
        &mut self,
        src: &str,
        dest: &str,
        src_revnum: u32,
        kind: PathKind,
    ) -> Result<(), Error> {
        let copy_from = CopyFrom {
            revnum: src_revnum,
            path: src,
        };

        match kind {
            PathKind::Directory => self.writer.add_directory(dest, Some(copy_from)),
            PathKind::File => self.writer.copy_file(dest, copy_from),
        }
        .map_err(Error::delegate)
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.writer.flush().map_err(Error::delegate)
    }
}

/// One line per action on stdout, for watching a conversion as it runs.
pub struct StdoutDelegate;

impl MirrorDelegate for StdoutDelegate {
    fn start_commit(&mut self, revnum: u32, props: &RevProps) -> Result<(), Error> {
        println!(
            "r{} [{}] {}",
            revnum,
            String::from_utf8_lossy(&props.author),
            String::from_utf8_lossy(&props.log).lines().next().unwrap_or("")
        );
        Ok(())
    }

    fn end_commit(&mut self, _revnum: u32) -> Result<(), Error> {
        Ok(())
    }

    fn initialize_project(&mut self, dirs: &[String]) -> Result<(), Error> {
        println!("  project dirs: {}", dirs.join(", "));
        Ok(())
    }

    fn initialize_lod(&mut self, path: &str) -> Result<(), Error> {
        println!("  new root {}", path);
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), Error> {
        println!("  mkdir {}", path);
        Ok(())
    }

    fn add_path(&mut self, content: &FileContent) -> Result<(), Error> {
        println!("  add {} ({} bytes)", content.path, content.text.len());
        Ok(())
    }

    fn change_path(&mut self, content: &FileContent) -> Result<(), Error> {
        println!("  change {} ({} bytes)", content.path, content.text.len());
        Ok(())
    }

    fn delete_lod(&mut self, path: &str) -> Result<(), Error> {
        println!("  delete root {}", path);
        Ok(())
    }

    fn delete_path(&mut self, path: &str) -> Result<(), Error> {
        println!("  delete {}", path);
        Ok(())
    }

    fn copy_lod(&mut self, src: &str, dest: &str, src_revnum: u32) -> Result<(), Error> {
        println!("  copy {}@{} -> {}", src, src_revnum, dest);
        Ok(())
    }

    fn copy_path(
        &mut self,
        src: &str,
        dest: &str,
        src_revnum: u32,
        _kind: PathKind,
    ) -> Result<(), Error> {
        println!("  copy {}@{} -> {}", src, src_revnum, dest);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
